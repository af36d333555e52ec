use homestock_store::StoreError;
use thiserror::Error;

/// Errors that abort a sweep pass.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The eligible consumables could not be listed.
    #[error("failed to list decaying consumables: {0}")]
    List(#[source] StoreError),
}

pub type Result<T> = std::result::Result<T, SweepError>;
