use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomestockError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before it reaches the rules; the message is user-facing.
    #[error("{0}")]
    Validation(String),
}

impl HomestockError {
    /// Short error code string included in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            HomestockError::Config(_) => "CONFIG_ERROR",
            HomestockError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        HomestockError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, HomestockError>;
