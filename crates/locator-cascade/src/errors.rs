//! Error types for the locator cascade.

use cdp_driver::DriverError;
use inkpost_core_types::EngineError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Every candidate strategy was exhausted without a unique match.
    #[error("control `{role}` not found after {tried} candidates")]
    NotFound { role: String, tried: usize },

    /// The page could not be queried at all.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<LocatorError> for EngineError {
    fn from(error: LocatorError) -> Self {
        match error {
            LocatorError::NotFound { role, tried } => EngineError::LocatorNotFound { role, tried },
            LocatorError::Driver(driver) => driver.into(),
        }
    }
}
