//! `homestock-scheduler`: the periodic decay sweep.
//!
//! # Overview
//!
//! [`sweep::run_sweep`] walks every consumable with a positive decay rate
//! and applies the whole periods that have elapsed since its last sweep.
//! It only talks to storage through the [`sweep::DecayStore`] trait, which
//! `homestock_store::ConsumableManager` implements.
//!
//! [`engine::SweepEngine`] drives it: one pass shortly after startup, then
//! one every `interval_secs` until the shutdown channel flips.

pub mod engine;
pub mod error;
pub mod sweep;

pub use engine::SweepEngine;
pub use error::{Result, SweepError};
pub use sweep::{run_sweep, DecayStore, SweepReport};
