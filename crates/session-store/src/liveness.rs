//! The session liveness probe.
//!
//! Navigates to a stable logged-in page and watches which way the platform
//! resolves it: the logged-in marker means the restored artifacts still
//! grant access, a login redirect or a rendered login form means they are
//! stale. The probe is read-only apart from the navigation and can be run
//! repeatedly with the same result.

use std::sync::Arc;
use std::time::Duration;

use cdp_driver::{poll_until, DriverError, PageDriver};
use inkpost_core_types::PlatformUrls;
use locator_cascade::{probe_present, spec_for, UiRole};
use tracing::{debug, info};

use crate::errors::SessionStoreError;

#[derive(Clone, Debug)]
pub struct LivenessProbe {
    urls: PlatformUrls,
    max_wait: Duration,
    poll_interval: Duration,
}

impl LivenessProbe {
    pub fn new(urls: PlatformUrls, max_wait_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            urls,
            max_wait: Duration::from_millis(max_wait_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }

    /// Whether the artifacts currently loaded in the browser still grant
    /// access. An inconclusive page at the deadline counts as stale.
    pub async fn is_live(&self, page: &Arc<dyn PageDriver>) -> Result<bool, SessionStoreError> {
        page.navigate(&self.urls.probe_url).await?;
        let login_marker = self.urls.login_marker.clone();
        let outcome = poll_until(self.poll_interval, self.max_wait, || {
            let page = Arc::clone(page);
            let login_marker = login_marker.clone();
            async move { sample(&page, &login_marker).await }
        })
        .await;
        match outcome {
            Ok(Ok(live)) => {
                info!(live, "session liveness check resolved");
                Ok(live)
            }
            Ok(Err(error)) => Err(error.into()),
            Err(timeout) => {
                debug!(%timeout, "liveness probe inconclusive, treating session as stale");
                Ok(false)
            }
        }
    }
}

async fn sample(
    page: &Arc<dyn PageDriver>,
    login_marker: &str,
) -> Option<Result<bool, DriverError>> {
    let url = match page.current_url().await {
        Ok(url) => url,
        Err(error) => return Some(Err(error)),
    };
    if url.contains(login_marker) {
        return Some(Ok(false));
    }
    match probe_present(&spec_for(UiRole::LoggedInMarker), page).await {
        Ok(true) => Some(Ok(true)),
        Ok(false) => match probe_present(&spec_for(UiRole::UsernameField), page).await {
            // A rendered login form on a non-login URL still means stale.
            Ok(true) => Some(Ok(false)),
            Ok(false) => None,
            Err(error) => Some(Err(error)),
        },
        Err(error) => Some(Err(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_driver::fixture::{FixtureNode, FixturePage, PageEffect};

    fn urls() -> PlatformUrls {
        PlatformUrls::default()
    }

    fn probe() -> LivenessProbe {
        LivenessProbe::new(urls(), 1000, 100)
    }

    #[tokio::test(start_paused = true)]
    async fn logged_in_marker_means_live() {
        let page: Arc<dyn PageDriver> = Arc::new(
            FixturePage::new()
                .with_node(FixtureNode::new("menu").selector("[data-testid='user-menu']")),
        );
        assert!(probe().is_live(&page).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn login_redirect_means_stale_even_with_valid_looking_cookies() {
        let page: Arc<dyn PageDriver> = Arc::new(
            FixturePage::new().on_navigate(
                "/home",
                vec![PageEffect::SetUrl(
                    "https://blog.example.com/login?next=/home".into(),
                )],
            ),
        );
        assert!(!probe().is_live(&page).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn the_check_is_idempotent() {
        let page: Arc<dyn PageDriver> = Arc::new(FixturePage::new().on_navigate(
            "/home",
            vec![PageEffect::SetUrl("https://blog.example.com/login".into())],
        ));
        let probe = probe();
        assert!(!probe.is_live(&page).await.unwrap());
        assert!(!probe.is_live(&page).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn an_inconclusive_page_counts_as_stale_at_the_deadline() {
        let page: Arc<dyn PageDriver> = Arc::new(FixturePage::new());
        assert!(!probe().is_live(&page).await.unwrap());
    }
}
