//! Composer orchestration: fill the draft in, trigger publish, verify.
//!
//! Clicking the publish control proves nothing on its own; platforms
//! swallow the click, keep the post as a draft, or throw a confirmation
//! dialog first. The controller treats publish as unverified until the
//! page itself shows evidence, and reports a kept draft as its own
//! outcome rather than a failure.

pub mod controller;

pub use controller::{PublishConfig, PublishController};
