//! Error types for the authentication flow.

use cdp_driver::DriverError;
use inkpost_core_types::EngineError;
use locator_cascade::LocatorError;
use thiserror::Error;

/// Infrastructure failures during authentication. Credential rejection and
/// second-factor expiry are not errors; they surface as a `Failed` outcome
/// with a reason.
#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<AuthError> for EngineError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Locator(locator) => locator.into(),
            AuthError::Driver(driver) => driver.into(),
        }
    }
}
