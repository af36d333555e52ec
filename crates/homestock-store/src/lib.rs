//! SQLite persistence for categories, consumables and tasks.
//!
//! Each manager owns its own `Mutex<Connection>`; open one connection per
//! manager with [`db::open`] against the same file.

pub mod categories;
pub mod consumables;
pub mod db;
pub mod error;
mod row;
pub mod tasks;

pub use categories::CategoryManager;
pub use consumables::ConsumableManager;
pub use error::{Result, StoreError};
pub use tasks::TaskManager;
