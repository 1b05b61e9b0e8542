//! The engine facade.
//!
//! One publish run: acquire a browser, get the page authenticated (through
//! a restored session when it is still live, a full login otherwise), hand
//! the page to the publish controller, release the browser no matter how
//! the run went.

use std::sync::Arc;

use auth_flow::{AuthConfig, AuthFlow};
use cdp_driver::{BrowserHost, ChromiumHost, DriverConfig, PageDriver};
use inkpost_core_types::{AuthState, EngineError, PostDraft, PublishOutcome};
use publish_flow::{PublishConfig, PublishController};
use session_store::{capture, restore, LivenessProbe, SessionStore};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

pub struct PublishEngine {
    config: EngineConfig,
    host: Arc<dyn BrowserHost>,
    store: SessionStore,
}

impl PublishEngine {
    pub fn new(config: EngineConfig) -> Self {
        let driver = DriverConfig {
            headless: config.headless,
            executable: config.browser_executable.clone(),
            ..DriverConfig::default()
        };
        let host = Arc::new(ChromiumHost::new(driver));
        Self::with_host(config, host)
    }

    /// Construct against an arbitrary browser host. This is the seam the
    /// fixture-backed tests use.
    pub fn with_host(config: EngineConfig, host: Arc<dyn BrowserHost>) -> Self {
        let store = SessionStore::new(&config.session_file);
        Self {
            config,
            host,
            store,
        }
    }

    /// Publish the draft end to end. All failure modes fold into
    /// [`PublishOutcome::Failed`]; the browser is released on every path.
    pub async fn publish(&self, draft: &PostDraft) -> PublishOutcome {
        if let Err(error) = draft.validate() {
            return PublishOutcome::Failed(error);
        }
        if self.config.simulate {
            info!(title = %draft.title, "simulate mode, skipping browser work");
            return PublishOutcome::Published;
        }

        let lease = match self.host.acquire().await {
            Ok(lease) => lease,
            Err(error) => return PublishOutcome::Failed(error.into()),
        };
        let page = lease.page();

        let outcome = match self.ensure_authenticated(&page).await {
            Ok(()) => self.publish_controller().publish(&page, draft).await,
            Err(error) => PublishOutcome::Failed(error),
        };

        if let Err(error) = lease.release().await {
            warn!(%error, "browser release failed");
        }
        outcome
    }

    /// Authenticate and persist the session without publishing anything.
    pub async fn authenticate(&self) -> Result<AuthState, EngineError> {
        if self.config.simulate {
            return Ok(AuthState::Authenticated);
        }
        let lease = self.host.acquire().await.map_err(EngineError::from)?;
        let page = lease.page();
        let result = self.ensure_authenticated(&page).await;
        if let Err(error) = lease.release().await {
            warn!(%error, "browser release failed");
        }
        result.map(|()| AuthState::Authenticated)
    }

    /// Whether a stored session exists and still passes the liveness probe.
    /// Answers `false` without launching a browser when no session is
    /// stored at all.
    pub async fn has_valid_session(&self) -> Result<bool, EngineError> {
        if self.config.simulate {
            return Ok(true);
        }
        let Some(session) = self.store.load() else {
            return Ok(false);
        };
        let lease = self.host.acquire().await.map_err(EngineError::from)?;
        let page = lease.page();
        let live = self.check_restored(&page, &session).await;
        if let Err(error) = lease.release().await {
            warn!(%error, "browser release failed");
        }
        live
    }

    /// Remove the persisted session.
    pub fn clear_session(&self) -> Result<(), EngineError> {
        self.store.clear().map_err(EngineError::from)
    }

    /// Get the page into an authenticated state: restored session first,
    /// full login as the fallback. A fresh login that succeeds is captured
    /// and persisted; a capture failure is logged and swallowed, the
    /// authenticated run proceeds.
    async fn ensure_authenticated(&self, page: &Arc<dyn PageDriver>) -> Result<(), EngineError> {
        if let Some(session) = self.store.load() {
            if self.check_restored(page, &session).await? {
                info!("restored session is live, skipping login");
                return Ok(());
            }
            debug!("stored session is stale, authenticating from scratch");
        }

        let flow = AuthFlow::new(AuthConfig {
            urls: self.config.platform.clone(),
            second_factor_max_wait_secs: self.config.second_factor_max_wait_secs,
            poll_interval_ms: self.config.poll_interval_ms,
            ..AuthConfig::default()
        });
        let outcome = flow
            .run(page, &self.config.credentials())
            .await
            .map_err(EngineError::from)?;
        if outcome.state != AuthState::Authenticated {
            return Err(EngineError::AuthenticationFailed(
                outcome
                    .reason
                    .unwrap_or_else(|| "authentication did not complete".to_string()),
            ));
        }

        match capture(page).await {
            Ok(session) if session.is_empty() => {
                debug!("capture came back empty, nothing to persist");
            }
            Ok(session) => {
                if let Err(error) = self.store.save(&session) {
                    warn!(%error, "could not persist session");
                }
            }
            Err(error) => warn!(%error, "could not capture session"),
        }
        Ok(())
    }

    async fn check_restored(
        &self,
        page: &Arc<dyn PageDriver>,
        session: &inkpost_core_types::StoredSession,
    ) -> Result<bool, EngineError> {
        restore(page, session).await.map_err(EngineError::from)?;
        let probe = LivenessProbe::new(
            self.config.platform.clone(),
            self.config.liveness_wait_ms,
            self.config.poll_interval_ms,
        );
        probe.is_live(page).await.map_err(EngineError::from)
    }

    fn publish_controller(&self) -> PublishController {
        PublishController::new(PublishConfig {
            urls: self.config.platform.clone(),
            verify_max_wait_ms: self.config.publish_verify_wait_ms,
            poll_interval_ms: self.config.poll_interval_ms,
        })
    }
}
