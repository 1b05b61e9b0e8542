//! The publish controller.

use std::sync::Arc;
use std::time::Duration;

use cdp_driver::{poll_until, DriverError, PageDriver};
use content_inject::ContentInjector;
use inkpost_core_types::{EngineError, PlatformUrls, PostDraft, PublishOutcome};
use locator_cascade::{probe_present, probe_unique, spec_for, LocatorCascade, UiRole};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct PublishConfig {
    pub urls: PlatformUrls,
    /// Upper bound on waiting for post-publish evidence.
    pub verify_max_wait_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            urls: PlatformUrls::default(),
            verify_max_wait_ms: 20_000,
            poll_interval_ms: 500,
        }
    }
}

/// Drives an authenticated page from the composer to a verified outcome.
pub struct PublishController {
    config: PublishConfig,
    cascade: LocatorCascade,
    injector: ContentInjector,
}

impl PublishController {
    pub fn new(config: PublishConfig) -> Self {
        let cascade = LocatorCascade::new(Duration::from_millis(config.poll_interval_ms));
        Self {
            config,
            cascade,
            injector: ContentInjector::new(),
        }
    }

    /// Publish the draft. Never panics and never returns `Err`; every
    /// failure mode is folded into [`PublishOutcome::Failed`].
    pub async fn publish(&self, page: &Arc<dyn PageDriver>, draft: &PostDraft) -> PublishOutcome {
        match self.run(page, draft).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, "publish run failed");
                PublishOutcome::Failed(error)
            }
        }
    }

    async fn run(
        &self,
        page: &Arc<dyn PageDriver>,
        draft: &PostDraft,
    ) -> Result<PublishOutcome, EngineError> {
        draft.validate()?;
        info!(title = %draft.title, url = %self.config.urls.composer_url, "opening composer");
        page.navigate(&self.config.urls.composer_url)
            .await
            .map_err(EngineError::from)?;

        let title = self
            .cascade
            .locate(&spec_for(UiRole::TitleField), page)
            .await?;
        page.set_value_with_events(&title, &draft.title)
            .await
            .map_err(EngineError::from)?;

        let attempt = self.injector.inject(page, &draft.html_body).await?;
        info!(
            strategy = attempt.strategy.name(),
            verified_len = attempt.verified_len,
            "body injected"
        );

        self.enter_tags(page, draft).await?;
        self.trigger_publish(page).await?;
        self.verify(page).await
    }

    /// Type the tags when the composer has a tag input. Tag entry is best
    /// effort; a composer variant without one does not sink the publish.
    async fn enter_tags(
        &self,
        page: &Arc<dyn PageDriver>,
        draft: &PostDraft,
    ) -> Result<(), EngineError> {
        if draft.tags.is_empty() {
            return Ok(());
        }
        let Some(field) = probe_unique(&spec_for(UiRole::TagsField), page)
            .await
            .map_err(EngineError::from)?
        else {
            debug!("composer has no tag input, skipping tags");
            return Ok(());
        };
        for tag in &draft.tags {
            page.type_text(&field, tag).await.map_err(EngineError::from)?;
            // Comma commits the tag in chip-style inputs.
            page.type_text(&field, ",").await.map_err(EngineError::from)?;
        }
        Ok(())
    }

    async fn trigger_publish(&self, page: &Arc<dyn PageDriver>) -> Result<(), EngineError> {
        let publish = self
            .cascade
            .locate(&spec_for(UiRole::PublishButton), page)
            .await?;
        page.click(&publish).await.map_err(EngineError::from)?;

        // Some variants interpose a confirmation dialog.
        if let Some(confirm) = probe_unique(&spec_for(UiRole::PublishConfirm), page)
            .await
            .map_err(EngineError::from)?
        {
            debug!("confirming through the publish dialog");
            page.click(&confirm).await.map_err(EngineError::from)?;
        }
        Ok(())
    }

    /// Wait for evidence the post went live: navigation away from the
    /// composer or a post-publish signature. When the wait expires, a
    /// draft-saved marker downgrades the result to [`PublishOutcome::SavedAsDraft`];
    /// otherwise the publish is unverified and reported failed.
    async fn verify(&self, page: &Arc<dyn PageDriver>) -> Result<PublishOutcome, EngineError> {
        let marker = self.config.urls.composer_marker.clone();
        let outcome = poll_until(
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_millis(self.config.verify_max_wait_ms),
            || {
                let page = Arc::clone(page);
                let marker = marker.clone();
                async move { published_sample(&page, &marker).await }
            },
        )
        .await;
        match outcome {
            Ok(Ok(())) => {
                info!("publish verified");
                Ok(PublishOutcome::Published)
            }
            Ok(Err(error)) => Err(error.into()),
            Err(timeout) => {
                if probe_present(&spec_for(UiRole::DraftSavedMarker), page)
                    .await
                    .map_err(EngineError::from)?
                {
                    warn!(
                        waited_ms = timeout.waited_ms,
                        "publish not confirmed, content kept as draft"
                    );
                    Ok(PublishOutcome::SavedAsDraft)
                } else {
                    Err(EngineError::PublishVerificationFailed)
                }
            }
        }
    }
}

async fn published_sample(
    page: &Arc<dyn PageDriver>,
    composer_marker: &str,
) -> Option<Result<(), DriverError>> {
    match page.current_url().await {
        Ok(url) if !url.contains(composer_marker) => return Some(Ok(())),
        Ok(_) => {}
        Err(error) => return Some(Err(error)),
    }
    match probe_present(&spec_for(UiRole::PostPublishSignature), page).await {
        Ok(true) => Some(Ok(())),
        Ok(false) => None,
        Err(error) => Some(Err(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_driver::fixture::{FixtureNode, FixturePage, PageEffect};
    use tokio::time::Instant;

    const COMPOSER: &str = "https://blog.example.com/compose";

    fn draft() -> PostDraft {
        PostDraft::new(
            "Test Post",
            "<p>hello world, this is a post body</p>",
            vec!["rust".into(), "automation".into()],
        )
    }

    fn composer_page() -> FixturePage {
        FixturePage::new()
            .with_url(COMPOSER)
            .with_node(FixtureNode::new("title").selector("#post-title"))
            .with_node(FixtureNode::new("body").selector("textarea.post-body"))
            .with_node(FixtureNode::new("publish").selector("button.publish"))
    }

    fn controller() -> PublishController {
        PublishController::new(PublishConfig {
            verify_max_wait_ms: 5000,
            poll_interval_ms: 100,
            ..PublishConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn publish_is_verified_by_leaving_the_composer() {
        let fixture = Arc::new(composer_page().on_click(
            "publish",
            vec![PageEffect::SetUrl(
                "https://blog.example.com/p/test-post".into(),
            )],
        ));
        let page: Arc<dyn PageDriver> = fixture.clone();

        let outcome = controller().publish(&page, &draft()).await;
        assert!(matches!(outcome, PublishOutcome::Published));
        assert_eq!(fixture.node_value("title").as_deref(), Some("Test Post"));
        assert!(fixture.clicked().contains(&"publish".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn publish_is_verified_by_the_permalink_signature() {
        let fixture = Arc::new(composer_page().on_click(
            "publish",
            vec![PageEffect::AddNode(
                FixtureNode::new("permalink").selector(".post-permalink"),
            )],
        ));
        let page: Arc<dyn PageDriver> = fixture.clone();

        let outcome = controller().publish(&page, &draft()).await;
        assert!(matches!(outcome, PublishOutcome::Published));
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_dialog_is_clicked_through() {
        let fixture = Arc::new(
            composer_page()
                .on_click(
                    "publish",
                    vec![PageEffect::AddNode(
                        FixtureNode::new("confirm").selector(".publish-dialog button.confirm"),
                    )],
                )
                .on_click(
                    "confirm",
                    vec![PageEffect::SetUrl(
                        "https://blog.example.com/p/test-post".into(),
                    )],
                ),
        );
        let page: Arc<dyn PageDriver> = fixture.clone();

        let outcome = controller().publish(&page, &draft()).await;
        assert!(matches!(outcome, PublishOutcome::Published));
        assert_eq!(fixture.clicked(), vec!["publish", "confirm"]);
    }

    #[tokio::test(start_paused = true)]
    async fn tags_are_typed_comma_separated_when_the_input_exists() {
        let fixture = Arc::new(
            composer_page()
                .with_node(FixtureNode::new("tags").selector("input.tag-input"))
                .on_click(
                    "publish",
                    vec![PageEffect::SetUrl(
                        "https://blog.example.com/p/test-post".into(),
                    )],
                ),
        );
        let page: Arc<dyn PageDriver> = fixture.clone();

        let outcome = controller().publish(&page, &draft()).await;
        assert!(outcome.is_success());
        assert_eq!(
            fixture.node_value("tags").as_deref(),
            Some("rust,automation,")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_tag_input_does_not_sink_the_publish() {
        let fixture = Arc::new(composer_page().on_click(
            "publish",
            vec![PageEffect::SetUrl(
                "https://blog.example.com/p/test-post".into(),
            )],
        ));
        let page: Arc<dyn PageDriver> = fixture.clone();

        let outcome = controller().publish(&page, &draft()).await;
        assert!(matches!(outcome, PublishOutcome::Published));
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_publish_fails_after_the_bounded_wait() {
        let fixture = Arc::new(composer_page());
        let page: Arc<dyn PageDriver> = fixture.clone();
        let controller = controller();

        let started = Instant::now();
        let outcome = controller.publish(&page, &draft()).await;
        match outcome {
            PublishOutcome::Failed(EngineError::PublishVerificationFailed) => {}
            other => panic!("expected verification failure, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn draft_saved_marker_downgrades_the_timeout() {
        let fixture = Arc::new(composer_page().on_click(
            "publish",
            vec![PageEffect::AddNode(
                FixtureNode::new("autosave")
                    .selector(".autosave-status")
                    .text("Draft saved"),
            )],
        ));
        let page: Arc<dyn PageDriver> = fixture.clone();

        let outcome = controller().publish(&page, &draft()).await;
        assert!(matches!(outcome, PublishOutcome::SavedAsDraft));
        assert!(outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_title_is_rejected_before_any_navigation() {
        let fixture = Arc::new(composer_page());
        let page: Arc<dyn PageDriver> = fixture.clone();
        let bad = PostDraft::new("   ", "<p>body</p>", vec![]);

        let outcome = controller().publish(&page, &bad).await;
        assert!(matches!(
            outcome,
            PublishOutcome::Failed(EngineError::InvalidDraft(_))
        ));
        assert!(fixture.visited().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn injection_failure_leaves_the_publish_button_untouched() {
        let fixture = Arc::new(
            FixturePage::new()
                .with_url(COMPOSER)
                .with_node(FixtureNode::new("title").selector("#post-title"))
                .with_node(FixtureNode::new("publish").selector("button.publish")),
        );
        let page: Arc<dyn PageDriver> = fixture.clone();

        let outcome = controller().publish(&page, &draft()).await;
        assert!(matches!(
            outcome,
            PublishOutcome::Failed(EngineError::InjectionFailed { attempts: 4 })
        ));
        assert!(fixture.clicked().is_empty());
    }
}
