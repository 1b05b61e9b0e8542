//! inkpost: an automated publishing session engine.
//!
//! Publishes a post draft to a blog platform that has no write API by
//! driving a real browser: restore or establish an authenticated session,
//! fill the composer through a cascade of injection strategies, trigger
//! publish and verify the page shows evidence the post went live.

pub mod cli;
pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::PublishEngine;
