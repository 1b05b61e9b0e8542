//! The authentication state machine.
//!
//! One flow drives both direct-credential login and the federated identity
//! provider redirect, parameterized by the shared locator role table. The
//! second-factor step models an approval the operator performs on another
//! device; the engine can only observe its effect on the page, bounded by a
//! configurable maximum wait.

pub mod errors;
pub mod flow;
pub mod signals;

pub use errors::AuthError;
pub use flow::{AuthConfig, AuthFlow, AuthOutcome};
