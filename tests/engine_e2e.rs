//! End-to-end engine runs against a scripted page.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cdp_driver::fixture::{FixtureNode, FixturePage, PageEffect};
use cdp_driver::{BrowserHost, BrowserLease, DriverError, PageDriver};
use inkpost_cli::{EngineConfig, PublishEngine};
use inkpost_core_types::{CookieRecord, EngineError, PostDraft, PublishOutcome, StoredSession};
use session_store::SessionStore;

struct FixtureHost {
    page: Arc<FixturePage>,
    acquired: AtomicUsize,
    released: Arc<AtomicBool>,
}

impl FixtureHost {
    fn new(page: FixturePage) -> Self {
        Self {
            page: Arc::new(page),
            acquired: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl BrowserHost for FixtureHost {
    async fn acquire(&self) -> Result<Box<dyn BrowserLease>, DriverError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureLease {
            page: self.page.clone(),
            released: self.released.clone(),
        }))
    }
}

struct FixtureLease {
    page: Arc<FixturePage>,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl BrowserLease for FixtureLease {
    fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    async fn release(self: Box<Self>) -> Result<(), DriverError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn draft() -> PostDraft {
    PostDraft::new("Test Post", "<p>hello</p>", vec!["t1".into()])
}

fn config(session_file: &std::path::Path) -> EngineConfig {
    EngineConfig {
        identifier: "writer@example.com".into(),
        secret: "correct horse".into(),
        session_file: session_file.to_path_buf(),
        poll_interval_ms: 100,
        liveness_wait_ms: 1000,
        publish_verify_wait_ms: 2000,
        ..EngineConfig::default()
    }
}

/// Login form plus a working composer, wired so submit leaves the login
/// page and publish leaves the composer.
fn happy_page() -> FixturePage {
    FixturePage::new()
        .with_node(FixtureNode::new("user").selector("#username"))
        .with_node(FixtureNode::new("pass").selector("#password"))
        .with_node(FixtureNode::new("submit").selector("button[type='submit']"))
        .on_click(
            "submit",
            vec![PageEffect::SetUrl("https://blog.example.com/home".into())],
        )
        .with_node(FixtureNode::new("title").selector("#post-title"))
        .with_node(FixtureNode::new("body").selector("textarea.post-body"))
        .with_node(FixtureNode::new("publish").selector("button.publish"))
        .on_click(
            "publish",
            vec![PageEffect::SetUrl(
                "https://blog.example.com/p/test-post".into(),
            )],
        )
}

#[tokio::test(start_paused = true)]
async fn fresh_login_then_publish_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    // Logging in leaves a session cookie behind for capture to pick up.
    let page = happy_page().with_cookies(vec![CookieRecord {
        name: "sid".into(),
        value: "fresh".into(),
        domain: "blog.example.com".into(),
        path: "/".into(),
        secure: true,
        http_only: true,
        expiry: None,
    }]);
    let host = Arc::new(FixtureHost::new(page));
    let engine = PublishEngine::with_host(config(&session_file), host.clone());

    let outcome = engine.publish(&draft()).await;
    assert!(matches!(outcome, PublishOutcome::Published));

    // The page was driven through login and the composer.
    assert_eq!(host.page.node_value("user").as_deref(), Some("writer@example.com"));
    assert_eq!(host.page.node_value("title").as_deref(), Some("Test Post"));
    assert_eq!(host.page.node_value("body").as_deref(), Some("<p>hello</p>"));

    // The fresh session was persisted and the browser released.
    assert!(session_file.exists());
    assert!(host.released.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn capture_without_session_artifacts_persists_nothing() {
    // The browser holds no cookies or logged storage after login, so
    // there is nothing worth writing to disk.
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    let host = Arc::new(FixtureHost::new(happy_page()));
    let engine = PublishEngine::with_host(config(&session_file), host.clone());

    let outcome = engine.publish(&draft()).await;
    assert!(matches!(outcome, PublishOutcome::Published));
    assert!(!session_file.exists());
}

#[tokio::test(start_paused = true)]
async fn stale_stored_session_falls_back_to_full_login() {
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    let stale = StoredSession::new(
        vec![CookieRecord {
            name: "sid".into(),
            value: "expired".into(),
            domain: "blog.example.com".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
            expiry: None,
        }],
        vec![],
    );
    SessionStore::new(&session_file).save(&stale).unwrap();

    // The liveness probe lands back on the login page.
    let page = happy_page().on_navigate(
        "/home",
        vec![PageEffect::SetUrl(
            "https://blog.example.com/login?next=home".into(),
        )],
    );
    let host = Arc::new(FixtureHost::new(page));
    let engine = PublishEngine::with_host(config(&session_file), host.clone());

    let outcome = engine.publish(&draft()).await;
    assert!(matches!(outcome, PublishOutcome::Published));

    // The stale cookies were restored for the probe, then a real login ran.
    assert_eq!(host.page.stored_cookies().len(), 1);
    let visited = host.page.visited();
    assert!(visited.iter().any(|u| u.contains("/login")));
    assert!(host.released.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn rejected_credentials_surface_as_authentication_failure() {
    let page = FixturePage::new()
        .with_node(FixtureNode::new("user").selector("#username"))
        .with_node(FixtureNode::new("pass").selector("#password"))
        .with_node(FixtureNode::new("submit").selector("button[type='submit']"))
        .on_click(
            "submit",
            vec![PageEffect::AddNode(
                FixtureNode::new("error")
                    .selector(".login-error")
                    .text("Wrong password"),
            )],
        );
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(FixtureHost::new(page));
    let engine = PublishEngine::with_host(config(&dir.path().join("session.json")), host.clone());

    let outcome = engine.publish(&draft()).await;
    match outcome {
        PublishOutcome::Failed(EngineError::AuthenticationFailed(reason)) => {
            assert!(reason.contains("Wrong password"));
        }
        other => panic!("expected authentication failure, got {other:?}"),
    }
    assert!(host.released.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn unverified_publish_fails_and_still_releases_the_browser() {
    // Publish click has no effect on the page at all.
    let page = FixturePage::new()
        .with_node(FixtureNode::new("user").selector("#username"))
        .with_node(FixtureNode::new("pass").selector("#password"))
        .with_node(FixtureNode::new("submit").selector("button[type='submit']"))
        .on_click(
            "submit",
            vec![PageEffect::SetUrl("https://blog.example.com/home".into())],
        )
        .with_node(FixtureNode::new("title").selector("#post-title"))
        .with_node(FixtureNode::new("body").selector("textarea.post-body"))
        .with_node(FixtureNode::new("publish").selector("button.publish"));
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(FixtureHost::new(page));
    let engine = PublishEngine::with_host(config(&dir.path().join("session.json")), host.clone());

    let outcome = engine.publish(&draft()).await;
    assert!(matches!(
        outcome,
        PublishOutcome::Failed(EngineError::PublishVerificationFailed)
    ));
    assert!(host.released.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn simulate_mode_never_acquires_a_browser() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir.path().join("session.json"));
    config.simulate = true;
    let host = Arc::new(FixtureHost::new(FixturePage::new()));
    let engine = PublishEngine::with_host(config, host.clone());

    let outcome = engine.publish(&draft()).await;
    assert!(matches!(outcome, PublishOutcome::Published));
    assert_eq!(host.acquired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn live_stored_session_skips_the_login_form() {
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    let session = StoredSession::new(
        vec![CookieRecord {
            name: "sid".into(),
            value: "live".into(),
            domain: "blog.example.com".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
            expiry: None,
        }],
        vec![],
    );
    SessionStore::new(&session_file).save(&session).unwrap();

    // Logged-in marker is present, so the probe passes without any login
    // controls ever being touched.
    let page = FixturePage::new()
        .with_node(FixtureNode::new("menu").selector("[data-testid='user-menu']"))
        .with_node(FixtureNode::new("title").selector("#post-title"))
        .with_node(FixtureNode::new("body").selector("textarea.post-body"))
        .with_node(FixtureNode::new("publish").selector("button.publish"))
        .on_click(
            "publish",
            vec![PageEffect::SetUrl(
                "https://blog.example.com/p/test-post".into(),
            )],
        );
    let host = Arc::new(FixtureHost::new(page));
    let engine = PublishEngine::with_host(config(&session_file), host.clone());

    let outcome = engine.publish(&draft()).await;
    assert!(matches!(outcome, PublishOutcome::Published));
    assert!(host.page.clicked().iter().all(|id| id.as_str() == "publish"));
}
