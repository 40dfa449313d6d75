//! Application-wide error types.
//!
//! Only startup can fail the process. Provider failures have their own type,
//! [`crate::llm::ProviderError`], and never escape a message handler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),
}
