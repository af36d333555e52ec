pub mod categories;
pub mod consumables;
pub mod error;
pub mod health;
pub mod root;
pub mod tasks;
