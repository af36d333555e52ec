//! Depletion projection: when will a consumable run out, and is it low now?

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::consumable::DecreaseInterval;

/// Output of [`project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// Calendar date the stock is projected to hit zero. `None` when there is
    /// no decay configured or nothing left.
    pub empty_date: Option<NaiveDate>,
    pub is_low_stock: bool,
}

/// Project the empty date and low-stock flag for a consumable.
///
/// `empty_date = today + floor(quantity / (rate / period_days))` days. When
/// less than one day of stock remains this is `today` itself. Inputs are
/// assumed validated (non-negative, finite).
pub fn project(
    quantity: f64,
    decrease_rate: f64,
    decrease_interval: DecreaseInterval,
    alert_threshold: f64,
    today: NaiveDate,
) -> Projection {
    let is_low_stock = quantity <= alert_threshold;

    if decrease_rate == 0.0 || quantity <= 0.0 {
        return Projection {
            empty_date: None,
            is_low_stock,
        };
    }

    let units_per_day = decrease_rate / decrease_interval.period_days();
    let days_until_empty = (quantity / units_per_day).floor();

    // Absurd ratios (tiny rate, huge stock) fall off the calendar.
    let empty_date = if days_until_empty.is_finite() && days_until_empty < u32::MAX as f64 {
        today.checked_add_days(Days::new(days_until_empty as u64))
    } else {
        None
    };

    Projection {
        empty_date,
        is_low_stock,
    }
}
