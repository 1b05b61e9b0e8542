//! Shared types for the inkpost publishing engine.
//!
//! Everything that crosses a crate boundary lives here: the draft being
//! published, persisted session artifacts, the authentication state machine
//! states, publish outcomes and the engine-level error taxonomy.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rendered document ready for publication.
///
/// The HTML body is treated as an opaque payload. It may embed remote image
/// URLs and inline styling; the engine never inspects it beyond measuring
/// its length for injection verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub html_body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PostDraft {
    pub fn new(
        title: impl Into<String>,
        html_body: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            html_body: html_body.into(),
            tags,
        }
    }

    /// A draft with an empty title is rejected before any browser work.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.title.trim().is_empty() {
            return Err(EngineError::InvalidDraft("title must not be empty".into()));
        }
        Ok(())
    }
}

/// Account credentials, held in memory only for the duration of an
/// authentication run. Never serialized, never written to disk.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One browser cookie as captured from or restored into a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Seconds since the epoch. Absent for session cookies.
    pub expiry: Option<f64>,
}

/// One local-storage entry captured alongside the cookies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub key: String,
    pub value: String,
}

/// Authentication artifacts persisted between runs.
///
/// A stored session is never trusted blindly; it must pass an explicit
/// liveness check against the platform before it is considered valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub cookies: Vec<CookieRecord>,
    #[serde(default)]
    pub storage: Vec<StorageEntry>,
    pub captured_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(cookies: Vec<CookieRecord>, storage: Vec<StorageEntry>) -> Self {
        Self {
            cookies,
            storage,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.storage.is_empty()
    }
}

/// The URLs and URL signatures that describe one platform deployment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformUrls {
    pub base_url: String,
    pub login_url: String,
    pub composer_url: String,
    /// Navigated to by the session liveness check.
    pub probe_url: String,
    /// Substring identifying login and re-authentication URLs.
    pub login_marker: String,
    /// Substring identifying the second-factor verification page.
    pub second_factor_marker: String,
    /// Substring identifying the post composer.
    pub composer_marker: String,
}

impl Default for PlatformUrls {
    fn default() -> Self {
        Self {
            base_url: "https://blog.example.com".into(),
            login_url: "https://blog.example.com/login".into(),
            composer_url: "https://blog.example.com/compose".into(),
            probe_url: "https://blog.example.com/home".into(),
            login_marker: "/login".into(),
            second_factor_marker: "/verify".into(),
            composer_marker: "/compose".into(),
        }
    }
}

/// States of the authentication flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    NotStarted,
    CredentialsSubmitted,
    AwaitingSecondFactor,
    Authenticated,
    Failed,
}

impl AuthState {
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::NotStarted => "not-started",
            AuthState::CredentialsSubmitted => "credentials-submitted",
            AuthState::AwaitingSecondFactor => "awaiting-second-factor",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Failed)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one publish run.
#[derive(Clone, Debug)]
pub enum PublishOutcome {
    /// The platform showed a post-publish signature.
    Published,
    /// The platform kept the content as an unpublished draft.
    SavedAsDraft,
    Failed(EngineError),
}

impl PublishOutcome {
    /// Both `Published` and `SavedAsDraft` leave the content safe on the
    /// platform, which is the operational success criterion.
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Published | PublishOutcome::SavedAsDraft)
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Published => f.write_str("published"),
            PublishOutcome::SavedAsDraft => f.write_str("saved-as-draft"),
            PublishOutcome::Failed(error) => write!(f, "failed: {error}"),
        }
    }
}

/// Engine-level error taxonomy.
///
/// Every failure a caller can observe is one of these tagged variants; raw
/// driver or locator errors never escape the engine untyped.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// A required control never appeared on the page.
    #[error("control `{role}` not found after {tried} locator candidates")]
    LocatorNotFound { role: String, tried: usize },

    /// Credentials rejected, or the second factor was not approved in time.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No content strategy produced a verified match.
    #[error("content injection failed after {attempts} strategies")]
    InjectionFailed { attempts: usize },

    /// The publish control was invoked but no success signature appeared.
    #[error("publish was triggered but no success signature appeared")]
    PublishVerificationFailed,

    /// The browser process could not be started.
    #[error("browser could not be acquired: {0}")]
    ResourceAcquisitionFailed(String),

    /// Transport-level failure while driving the page.
    #[error("driver error: {0}")]
    Driver(String),

    /// The draft failed validation before any browser work.
    #[error("invalid draft: {0}")]
    InvalidDraft(String),
}

impl EngineError {
    /// Short category tag used in logs and structured output.
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::LocatorNotFound { .. } => "locator-not-found",
            EngineError::AuthenticationFailed(_) => "authentication-failed",
            EngineError::InjectionFailed { .. } => "injection-failed",
            EngineError::PublishVerificationFailed => "publish-verification-failed",
            EngineError::ResourceAcquisitionFailed(_) => "resource-acquisition-failed",
            EngineError::Driver(_) => "driver",
            EngineError::InvalidDraft(_) => "invalid-draft",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_the_secret() {
        let creds = Credentials::new("writer@example.com", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("writer@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn empty_title_is_rejected() {
        let draft = PostDraft::new("  ", "<p>body</p>", vec![]);
        assert!(matches!(
            draft.validate(),
            Err(EngineError::InvalidDraft(_))
        ));
    }

    #[test]
    fn stored_session_round_trips_through_json() {
        let session = StoredSession::new(
            vec![CookieRecord {
                name: "sid".into(),
                value: "abc".into(),
                domain: ".example.com".into(),
                path: "/".into(),
                secure: true,
                http_only: true,
                expiry: Some(1_900_000_000.0),
            }],
            vec![StorageEntry {
                key: "device".into(),
                value: "trusted".into(),
            }],
        );
        let json = serde_json::to_string(&session).unwrap();
        let back: StoredSession = serde_json::from_str(&json).unwrap();
        assert_eq!(session, back);
    }

    #[test]
    fn outcome_success_covers_draft_fallback() {
        assert!(PublishOutcome::Published.is_success());
        assert!(PublishOutcome::SavedAsDraft.is_success());
        assert!(!PublishOutcome::Failed(EngineError::PublishVerificationFailed).is_success());
    }
}
