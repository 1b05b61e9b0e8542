//! Error types for session persistence.

use cdp_driver::DriverError;
use inkpost_core_types::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<SessionStoreError> for EngineError {
    fn from(error: SessionStoreError) -> Self {
        match error {
            SessionStoreError::Driver(driver) => driver.into(),
            other => EngineError::Driver(other.to_string()),
        }
    }
}
