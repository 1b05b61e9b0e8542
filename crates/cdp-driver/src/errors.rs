//! Error types for the browser driver layer.

use inkpost_core_types::EngineError;
use thiserror::Error;

/// Driver error enumeration.
#[derive(Debug, Error, Clone)]
pub enum DriverError {
    /// The browser process could not be started or attached to.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Navigation did not complete.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Script evaluation failed or returned an unusable value.
    #[error("script evaluation failed: {0}")]
    Eval(String),

    /// An element handle no longer resolves on the page.
    #[error("unknown element: {0}")]
    UnknownElement(String),

    /// The requested frame does not exist on the current page.
    #[error("frame not found: {0}")]
    FrameNotFound(String),

    /// Transport-level CDP failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<DriverError> for EngineError {
    fn from(error: DriverError) -> Self {
        match error {
            DriverError::Launch(reason) => EngineError::ResourceAcquisitionFailed(reason),
            other => EngineError::Driver(other.to_string()),
        }
    }
}
