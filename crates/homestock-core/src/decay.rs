//! Whole-period decay arithmetic applied by the sweep.

use chrono::{DateTime, Utc};

use crate::consumable::{Consumable, DecreaseInterval};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Result of applying one or more elapsed periods of decay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayOutcome {
    pub periods: u64,
    /// `rate * periods`, before clamping.
    pub amount: f64,
    /// New quantity, clamped at zero.
    pub quantity: f64,
    /// New sweep clock; equals the `now` passed in.
    pub last_auto_decreased: DateTime<Utc>,
}

/// Decay owed since `last_auto_decreased`, or `None` when no whole period
/// has elapsed (or the item has no rate). Partial periods are not consumed:
/// the caller keeps the old timestamp so they keep accumulating.
pub fn decay_step(
    quantity: f64,
    decrease_rate: f64,
    decrease_interval: DecreaseInterval,
    last_auto_decreased: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DecayOutcome> {
    if decrease_rate <= 0.0 {
        return None;
    }

    let elapsed_days = (now - last_auto_decreased).num_milliseconds() as f64 / MILLIS_PER_DAY;
    let periods = (elapsed_days / decrease_interval.period_days()).floor();
    if periods < 1.0 {
        return None;
    }

    let amount = decrease_rate * periods;
    Some(DecayOutcome {
        periods: periods as u64,
        amount,
        quantity: (quantity - amount).max(0.0),
        last_auto_decreased: now,
    })
}

impl Consumable {
    pub fn decay_due(&self, now: DateTime<Utc>) -> Option<DecayOutcome> {
        decay_step(
            self.quantity,
            self.decrease_rate,
            self.decrease_interval,
            self.last_auto_decreased,
            now,
        )
    }

    /// Record a sweep result: quantity and sweep clock move, `last_updated`
    /// (the manual-edit clock) does not.
    pub fn apply_decay(mut self, outcome: &DecayOutcome) -> Self {
        self.quantity = outcome.quantity;
        self.last_auto_decreased = outcome.last_auto_decreased;
        self.updated_at = outcome.last_auto_decreased;
        self
    }
}
