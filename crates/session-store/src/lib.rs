//! Session persistence and liveness.
//!
//! Authentication artifacts (cookies plus local-storage entries) are written
//! to disk after a successful login and restored at the start of later runs.
//! Stored artifacts are never trusted blindly: a restored session must pass
//! the liveness probe before the engine skips authentication.

pub mod errors;
pub mod liveness;
pub mod store;

pub use errors::SessionStoreError;
pub use liveness::LivenessProbe;
pub use store::{capture, restore, SessionStore};
