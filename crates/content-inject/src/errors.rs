//! Error types for content injection.

use cdp_driver::DriverError;
use inkpost_core_types::EngineError;
use thiserror::Error;

use crate::model::InjectionAttempt;

#[derive(Debug, Error)]
pub enum InjectError {
    /// Refused outright: publishing an empty body is never intended.
    #[error("refusing to inject an empty body")]
    EmptyBody,

    /// Every strategy ran and none produced a verified match.
    #[error("no strategy produced a verified match ({} attempted)", attempts.len())]
    Exhausted { attempts: Vec<InjectionAttempt> },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<InjectError> for EngineError {
    fn from(error: InjectError) -> Self {
        match error {
            InjectError::Exhausted { attempts } => EngineError::InjectionFailed {
                attempts: attempts.len(),
            },
            InjectError::EmptyBody => EngineError::InvalidDraft("empty body".into()),
            InjectError::Driver(driver) => driver.into(),
        }
    }
}
