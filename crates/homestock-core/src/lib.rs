//! `homestock-core`: data model and pure rules for household stock and chores.
//!
//! Nothing in here touches storage. The three rules that carry real logic:
//!
//! | Module        | Rule                                                        |
//! |---------------|-------------------------------------------------------------|
//! | [`depletion`] | projected empty date + low-stock flag for a consumable      |
//! | [`recurrence`]| next due date of a recurring task                           |
//! | [`decay`]     | whole periods of decay owed since the last sweep            |
//!
//! Entity transitions (`Consumable::decrease`, `Consumable::refill`,
//! `Task::toggle`, `apply_update`) take the entity by value and return the
//! new state, so the store can run them as load → transition → persist.

pub mod category;
pub mod config;
pub mod consumable;
pub mod decay;
pub mod depletion;
pub mod error;
pub mod recurrence;
pub mod task;
pub mod types;

pub use error::{HomestockError, Result};
