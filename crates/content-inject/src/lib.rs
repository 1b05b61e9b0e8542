//! Content injection into the platform composer.
//!
//! Rich-text composers differ in which surface is authoritative for what
//! the platform actually saves, and some keep several surfaces in sync via
//! listeners that only fire on certain events. No single write method is
//! reliable across editor versions, so injection is a cascade of strategies
//! tried in fixed order, each verified by reading the surface back. A write
//! that silently did nothing is detected by the length check and the
//! cascade moves on.

pub mod errors;
pub mod model;
pub mod runner;
pub mod strategies;

pub use errors::InjectError;
pub use model::{InjectionAttempt, StrategyKind};
pub use runner::ContentInjector;
pub use strategies::InjectStrategy;
