//! Browser lifecycle and the page driver port.
//!
//! This crate owns everything that touches a real browser: launching and
//! releasing the Chromium process, the `PageDriver` trait every higher layer
//! drives the page through, and the bounded polling primitive all waits in
//! the engine are built on. The `fixtures` feature adds a scripted in-memory
//! page so the rest of the workspace can test against DOM fixtures without a
//! browser.

pub mod config;
pub mod driver;
pub mod errors;
pub mod host;
pub mod wait;

mod chromium;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use chromium::{BrowserSession, CdpPage};
pub use config::DriverConfig;
pub use driver::{ElementId, PageDriver, Query};
pub use errors::DriverError;
pub use host::{BrowserHost, BrowserLease, ChromiumHost};
pub use wait::{poll_until, WaitTimeout};
