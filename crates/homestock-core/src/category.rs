//! Categories: labels that group consumables or tasks in the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HomestockError, Result};
use crate::types::CategoryId;

pub const DEFAULT_ICON: &str = "box";
pub const DEFAULT_COLOR: &str = "#3498db";

/// Which kind of item a category groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Consumable,
    Task,
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consumable => write!(f, "consumable"),
            Self::Task => write!(f, "task"),
        }
    }
}

impl std::str::FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "consumable" => Ok(Self::Consumable),
            "task" => Ok(Self::Task),
            other => Err(format!("unknown category type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub icon: String,
    pub color: String,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create request. Optional fields fall back to the stock icon/color/order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub order: Option<i64>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            icon: None,
            color: None,
            order: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_name(&self.name).map(|_| ())
    }

    /// Validate and materialise into a stored category.
    pub fn into_category(self, now: DateTime<Utc>) -> Result<Category> {
        let name = require_name(&self.name)?;
        Ok(Category {
            id: CategoryId::new(),
            name,
            kind: self.kind,
            icon: self.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            color: self.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            order: self.order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub order: Option<i64>,
}

impl Category {
    pub fn apply_update(mut self, patch: CategoryUpdate, now: DateTime<Utc>) -> Result<Self> {
        if let Some(name) = patch.name {
            self.name = require_name(&name)?;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        self.updated_at = now;
        Ok(self)
    }
}

/// The stock categories inserted into an empty database.
pub fn default_categories() -> Vec<NewCategory> {
    let stock = [
        ("Kitchen", "kitchen", CategoryKind::Consumable, "#4CAF50", 1),
        ("Bathroom", "bathroom", CategoryKind::Consumable, "#2196F3", 2),
        ("Cleaning", "cleaning", CategoryKind::Consumable, "#9C27B0", 3),
        ("Home", "home", CategoryKind::Task, "#FF9800", 1),
        ("Yard", "yard", CategoryKind::Task, "#4CAF50", 2),
        ("Maintenance", "build", CategoryKind::Task, "#607D8B", 3),
    ];
    stock
        .into_iter()
        .map(|(name, icon, kind, color, order)| NewCategory {
            name: name.to_string(),
            kind,
            icon: Some(icon.to_string()),
            color: Some(color.to_string()),
            order: Some(order),
        })
        .collect()
}

/// Trimmed, non-empty name or a validation error.
pub(crate) fn require_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HomestockError::validation("name is required"));
    }
    Ok(trimmed.to_string())
}
