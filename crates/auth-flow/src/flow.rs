//! Flow execution: credential entry, submission classification and the
//! second-factor wait.

use std::sync::Arc;
use std::time::Duration;

use cdp_driver::{poll_until, DriverError, PageDriver};
use inkpost_core_types::{AuthState, Credentials, PlatformUrls};
use locator_cascade::{spec_for, LocatorCascade, LocatorError, UiRole};
use tracing::{debug, info, warn};

use crate::errors::AuthError;
use crate::signals;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub urls: PlatformUrls,
    /// Upper bound on the out-of-band approval wait. Minutes, not seconds:
    /// a human has to pick up another device.
    pub second_factor_max_wait_secs: u64,
    pub second_factor_poll_interval_ms: u64,
    /// How long to watch the page after submit before giving up on
    /// classifying the result.
    pub classify_wait_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            urls: PlatformUrls::default(),
            second_factor_max_wait_secs: 180,
            second_factor_poll_interval_ms: 3000,
            classify_wait_ms: 10_000,
            poll_interval_ms: 250,
        }
    }
}

/// Terminal result of a flow run.
#[derive(Clone, Debug)]
pub struct AuthOutcome {
    pub state: AuthState,
    pub reason: Option<String>,
}

impl AuthOutcome {
    fn authenticated() -> Self {
        Self {
            state: AuthState::Authenticated,
            reason: None,
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: AuthState::Failed,
            reason: Some(reason.into()),
        }
    }
}

enum Classified {
    Authenticated,
    SecondFactor,
    Error(String),
}

/// Drives the login page to a terminal authentication state.
pub struct AuthFlow {
    config: AuthConfig,
    cascade: LocatorCascade,
}

impl AuthFlow {
    pub fn new(config: AuthConfig) -> Self {
        let cascade = LocatorCascade::new(Duration::from_millis(config.poll_interval_ms));
        Self { config, cascade }
    }

    /// Run the state machine to a terminal state.
    ///
    /// Locator and driver failures during credential entry are fatal for
    /// the run and surface as `Err`; they never corrupt a persisted
    /// session. Rejected credentials and an unapproved second factor are
    /// clean `Failed` outcomes.
    pub async fn run(
        &self,
        page: &Arc<dyn PageDriver>,
        credentials: &Credentials,
    ) -> Result<AuthOutcome, AuthError> {
        let mut state = AuthState::NotStarted;
        info!(state = %state, url = %self.config.urls.login_url, "starting authentication");
        page.navigate(&self.config.urls.login_url).await?;

        self.enter_credentials(page, credentials).await?;
        state = AuthState::CredentialsSubmitted;
        info!(state = %state, "credentials submitted");

        match self.classify_submission(page).await? {
            Classified::Authenticated => {
                state = AuthState::Authenticated;
                info!(state = %state, "authenticated without second factor");
                Ok(AuthOutcome::authenticated())
            }
            Classified::Error(reason) => {
                warn!(%reason, "login rejected");
                Ok(AuthOutcome::failed(reason))
            }
            Classified::SecondFactor => {
                state = AuthState::AwaitingSecondFactor;
                info!(
                    state = %state,
                    max_wait_secs = self.config.second_factor_max_wait_secs,
                    "waiting for out-of-band approval"
                );
                self.await_second_factor(page).await
            }
        }
    }

    /// Locate the login controls and submit the credentials, following the
    /// federated identity provider entry point when the direct form is not
    /// there.
    async fn enter_credentials(
        &self,
        page: &Arc<dyn PageDriver>,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let username_spec = spec_for(UiRole::UsernameField);
        let username = match self.cascade.locate(&username_spec, page).await {
            Ok(element) => element,
            Err(LocatorError::NotFound { .. }) => {
                debug!("no direct login form, trying the federated entry point");
                let federated = self
                    .cascade
                    .locate(&spec_for(UiRole::FederatedLogin), page)
                    .await?;
                page.click(&federated).await?;
                self.cascade.locate(&username_spec, page).await?
            }
            Err(other) => return Err(other.into()),
        };
        page.type_text(&username, &credentials.identifier).await?;

        let password = self
            .cascade
            .locate(&spec_for(UiRole::PasswordField), page)
            .await?;
        page.type_text(&password, &credentials.secret).await?;

        let submit = self
            .cascade
            .locate(&spec_for(UiRole::LoginSubmit), page)
            .await?;
        page.click(&submit).await?;
        Ok(())
    }

    /// Watch the page after submit until it resolves into one of the three
    /// recognizable shapes.
    async fn classify_submission(
        &self,
        page: &Arc<dyn PageDriver>,
    ) -> Result<Classified, AuthError> {
        let urls = self.config.urls.clone();
        let outcome = poll_until(
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_millis(self.config.classify_wait_ms),
            || {
                let page = Arc::clone(page);
                let urls = urls.clone();
                async move { classify_sample(&page, &urls).await }
            },
        )
        .await;
        match outcome {
            Ok(Ok(classified)) => Ok(classified),
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Ok(Classified::Error(
                "login page did not advance after submit".to_string(),
            )),
        }
    }

    /// Poll until the verification signature disappears or the bounded wait
    /// expires. Confirms the page actually landed logged-in afterwards; a
    /// bounce back to the login form is a failure, not success.
    async fn await_second_factor(
        &self,
        page: &Arc<dyn PageDriver>,
    ) -> Result<AuthOutcome, AuthError> {
        let urls = self.config.urls.clone();
        let outcome = poll_until(
            Duration::from_millis(self.config.second_factor_poll_interval_ms),
            Duration::from_secs(self.config.second_factor_max_wait_secs),
            || {
                let page = Arc::clone(page);
                let urls = urls.clone();
                async move {
                    match signals::second_factor_present(&page, &urls).await {
                        Ok(true) => None,
                        Ok(false) => Some(Ok(())),
                        Err(error) => Some(Err(error)),
                    }
                }
            },
        )
        .await;
        match outcome {
            Ok(Ok(())) => {
                let url = page.current_url().await.map_err(AuthError::from)?;
                if url.contains(&self.config.urls.login_marker) {
                    Ok(AuthOutcome::failed("returned to login after verification"))
                } else {
                    info!(state = %AuthState::Authenticated, "second factor approved");
                    Ok(AuthOutcome::authenticated())
                }
            }
            Ok(Err(error)) => Err(error.into()),
            Err(timeout) => Ok(AuthOutcome::failed(format!(
                "second factor not approved within {} s",
                timeout.waited_ms / 1000
            ))),
        }
    }
}

async fn classify_sample(
    page: &Arc<dyn PageDriver>,
    urls: &PlatformUrls,
) -> Option<Result<Classified, DriverError>> {
    match signals::login_error(page).await {
        Ok(Some(reason)) => return Some(Ok(Classified::Error(reason))),
        Ok(None) => {}
        Err(error) => return Some(Err(error)),
    }
    match signals::second_factor_present(page, urls).await {
        Ok(true) => return Some(Ok(Classified::SecondFactor)),
        Ok(false) => {}
        Err(error) => return Some(Err(error)),
    }
    match page.current_url().await {
        Ok(url) if !url.contains(&urls.login_marker) => Some(Ok(Classified::Authenticated)),
        Ok(_) => None,
        Err(error) => Some(Err(error)),
    }
}
