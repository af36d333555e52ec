//! Consumables: household stock whose quantity drops over time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::category::require_name;
use crate::depletion::{project, Projection};
use crate::error::{HomestockError, Result};
use crate::types::{CategoryId, ConsumableId};

pub const DEFAULT_QUANTITY: f64 = 100.0;
pub const DEFAULT_ALERT_THRESHOLD: f64 = 20.0;

/// Unit label. Purely descriptive; no conversion happens between units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Count,
    Lbs,
    Oz,
    Kg,
    G,
    Ml,
    L,
    Percent,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Count => "count",
            Self::Lbs => "lbs",
            Self::Oz => "oz",
            Self::Kg => "kg",
            Self::G => "g",
            Self::Ml => "ml",
            Self::L => "l",
            Self::Percent => "percent",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "count" => Ok(Self::Count),
            "lbs" => Ok(Self::Lbs),
            "oz" => Ok(Self::Oz),
            "kg" => Ok(Self::Kg),
            "g" => Ok(Self::G),
            "ml" => Ok(Self::Ml),
            "l" => Ok(Self::L),
            "percent" => Ok(Self::Percent),
            other => Err(format!("unknown unit: {other}")),
        }
    }
}

/// Period over which `decrease_rate` is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecreaseInterval {
    #[default]
    Day,
    Week,
    Month,
}

impl DecreaseInterval {
    /// Fixed period length in days. Months are a flat 30 days, not calendar months.
    pub fn period_days(self) -> f64 {
        match self {
            Self::Day => 1.0,
            Self::Week => 7.0,
            Self::Month => 30.0,
        }
    }
}

impl std::fmt::Display for DecreaseInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

impl std::str::FromStr for DecreaseInterval {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown decrease interval: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumable {
    pub id: ConsumableId,
    pub name: String,
    pub category_id: CategoryId,
    /// Never negative.
    pub quantity: f64,
    pub unit: Unit,
    /// Amount consumed per `decrease_interval`; 0 means manual tracking only.
    pub decrease_rate: f64,
    pub decrease_interval: DecreaseInterval,
    pub alert_threshold: f64,
    /// Last manual mutation (decrease, refill, edit).
    pub last_updated: DateTime<Utc>,
    /// Last time the decay sweep applied at least one period.
    pub last_auto_decreased: DateTime<Utc>,
    pub image: Option<String>,
    pub notes: Option<String>,
    pub is_collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consumable {
    /// Manual decrease, clamped at zero.
    pub fn decrease(mut self, amount: f64, now: DateTime<Utc>) -> Self {
        self.quantity = (self.quantity - amount).max(0.0);
        self.last_updated = now;
        self.updated_at = now;
        self
    }

    /// Refill sets the level to `amount`; it does not add to the current stock.
    pub fn refill(mut self, amount: f64, now: DateTime<Utc>) -> Self {
        self.quantity = amount;
        self.last_updated = now;
        self.updated_at = now;
        self
    }

    pub fn apply_update(mut self, patch: ConsumableUpdate, now: DateTime<Utc>) -> Result<Self> {
        patch.validate()?;
        if let Some(name) = patch.name {
            self.name = require_name(&name)?;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(rate) = patch.decrease_rate {
            self.decrease_rate = rate;
        }
        if let Some(interval) = patch.decrease_interval {
            self.decrease_interval = interval;
        }
        if let Some(threshold) = patch.alert_threshold {
            self.alert_threshold = threshold;
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        if let Some(collapsed) = patch.is_collapsed {
            self.is_collapsed = collapsed;
        }
        self.last_updated = now;
        self.updated_at = now;
        Ok(self)
    }

    /// Depletion projection as of `today`.
    pub fn projection(&self, today: NaiveDate) -> Projection {
        project(
            self.quantity,
            self.decrease_rate,
            self.decrease_interval,
            self.alert_threshold,
            today,
        )
    }
}

/// Create request with the stock defaults for every optional field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsumable {
    pub name: String,
    pub category_id: CategoryId,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub decrease_rate: f64,
    #[serde(default)]
    pub decrease_interval: DecreaseInterval,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    pub image: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_collapsed: bool,
}

fn default_quantity() -> f64 {
    DEFAULT_QUANTITY
}
fn default_alert_threshold() -> f64 {
    DEFAULT_ALERT_THRESHOLD
}

impl NewConsumable {
    pub fn new(name: impl Into<String>, category_id: CategoryId) -> Self {
        Self {
            name: name.into(),
            category_id,
            quantity: DEFAULT_QUANTITY,
            unit: Unit::default(),
            decrease_rate: 0.0,
            decrease_interval: DecreaseInterval::default(),
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            image: None,
            notes: None,
            is_collapsed: false,
        }
    }

    /// Validate and materialise. The sweep clock starts at creation time.
    pub fn into_consumable(self, now: DateTime<Utc>) -> Result<Consumable> {
        let name = require_name(&self.name)?;
        non_negative("quantity", self.quantity)?;
        non_negative("decreaseRate", self.decrease_rate)?;
        non_negative("alertThreshold", self.alert_threshold)?;
        Ok(Consumable {
            id: ConsumableId::new(),
            name,
            category_id: self.category_id,
            quantity: self.quantity,
            unit: self.unit,
            decrease_rate: self.decrease_rate,
            decrease_interval: self.decrease_interval,
            alert_threshold: self.alert_threshold,
            last_updated: now,
            last_auto_decreased: now,
            image: self.image,
            notes: self.notes,
            is_collapsed: self.is_collapsed,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumableUpdate {
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    pub decrease_rate: Option<f64>,
    pub decrease_interval: Option<DecreaseInterval>,
    pub alert_threshold: Option<f64>,
    pub image: Option<String>,
    pub notes: Option<String>,
    pub is_collapsed: Option<bool>,
}

impl ConsumableUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(q) = self.quantity {
            non_negative("quantity", q)?;
        }
        if let Some(r) = self.decrease_rate {
            non_negative("decreaseRate", r)?;
        }
        if let Some(t) = self.alert_threshold {
            non_negative("alertThreshold", t)?;
        }
        Ok(())
    }
}

/// Manual decrease amount: finite and >= 0.
pub fn validate_decrease_amount(amount: f64) -> Result<()> {
    non_negative("amount", amount)
}

/// Refill amount: finite and strictly positive.
pub fn validate_refill_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(HomestockError::validation("Invalid refill amount"));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(HomestockError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}
