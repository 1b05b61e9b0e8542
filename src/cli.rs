//! Command-line interface.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inkpost_core_types::{EngineError, PostDraft, PublishOutcome};
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::engine::PublishEngine;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "inkpost", version, long_version = LONG_VERSION)]
#[command(about = "Automated publishing session engine for browser-driven blog platforms")]
pub struct Cli {
    /// Path to a YAML config file. Defaults to ./inkpost.yaml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Resolve the pipeline without launching a browser.
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a draft from a JSON file.
    Publish {
        /// Draft file: {"title": ..., "html_body": ..., "tags": [...]}
        #[arg(short, long)]
        draft: PathBuf,
    },
    /// Log in and persist the session without publishing.
    Auth,
    /// Report whether the stored session is still live.
    Session,
    /// Delete the stored session.
    Logout,
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// `inkpost session` reporting that no live session is stored. Kept out
/// of the failure-category range: it is a diagnostic answer, not an error.
const NO_LIVE_SESSION: i32 = 10;

/// Process exit codes, one per engine failure category so wrapping
/// schedulers can branch without parsing logs.
fn exit_code(error: &EngineError) -> i32 {
    match error {
        EngineError::AuthenticationFailed(_) => 2,
        EngineError::InjectionFailed { .. } => 3,
        EngineError::PublishVerificationFailed => 4,
        EngineError::ResourceAcquisitionFailed(_) => 5,
        EngineError::LocatorNotFound { .. } => 6,
        EngineError::Driver(_) | EngineError::InvalidDraft(_) => 1,
    }
}

pub async fn run(cli: Cli) -> Result<i32> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if cli.simulate {
        config.simulate = true;
    }
    config.validate()?;

    let engine = PublishEngine::new(config);
    match cli.command {
        Command::Publish { draft } => {
            let raw = std::fs::read_to_string(&draft)
                .with_context(|| format!("reading draft from {}", draft.display()))?;
            let draft: PostDraft = serde_json::from_str(&raw).context("parsing draft JSON")?;
            match engine.publish(&draft).await {
                PublishOutcome::Published => {
                    info!(title = %draft.title, "post published");
                    Ok(0)
                }
                PublishOutcome::SavedAsDraft => {
                    info!(title = %draft.title, "post kept as draft on the platform");
                    Ok(0)
                }
                PublishOutcome::Failed(err) => {
                    error!(category = err.category(), %err, "publish failed");
                    Ok(exit_code(&err))
                }
            }
        }
        Command::Auth => match engine.authenticate().await {
            Ok(state) => {
                info!(state = %state, "authentication complete, session persisted");
                Ok(0)
            }
            Err(err) => {
                error!(category = err.category(), %err, "authentication failed");
                Ok(exit_code(&err))
            }
        },
        Command::Session => match engine.has_valid_session().await {
            Ok(true) => {
                info!("stored session is live");
                Ok(0)
            }
            Ok(false) => {
                info!("no live session stored");
                Ok(NO_LIVE_SESSION)
            }
            Err(err) => {
                error!(category = err.category(), %err, "session check failed");
                Ok(exit_code(&err))
            }
        },
        Command::Logout => {
            engine.clear_session()?;
            info!("stored session removed");
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_failure_category_has_a_distinct_exit_code() {
        let errors = [
            EngineError::AuthenticationFailed("x".into()),
            EngineError::InjectionFailed { attempts: 4 },
            EngineError::PublishVerificationFailed,
            EngineError::ResourceAcquisitionFailed("x".into()),
            EngineError::LocatorNotFound {
                role: "publish-button".into(),
                tried: 3,
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
        // The session-status answer must not look like a failure category.
        assert!(!codes.contains(&NO_LIVE_SESSION));
        assert!(!codes.contains(&1));
    }

    #[test]
    fn publish_subcommand_parses() {
        let cli = Cli::parse_from(["inkpost", "-v", "publish", "--draft", "post.json"]);
        assert_eq!(cli.log_filter(), "debug");
        assert!(matches!(cli.command, Command::Publish { .. }));
    }
}
