//! Browser acquisition port.
//!
//! The engine acquires the browser through this seam so release-on-every-
//! exit-path behavior stays testable without a real process.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::chromium::BrowserSession;
use crate::config::DriverConfig;
use crate::driver::PageDriver;
use crate::errors::DriverError;

/// A held browser resource. Must be released on every exit path.
#[async_trait]
pub trait BrowserLease: Send + Sync {
    fn page(&self) -> Arc<dyn PageDriver>;

    async fn release(self: Box<Self>) -> Result<(), DriverError>;
}

/// Acquires browser resources.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn BrowserLease>, DriverError>;
}

/// Production host launching a local Chromium process per lease.
pub struct ChromiumHost {
    config: DriverConfig,
}

impl ChromiumHost {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserHost for ChromiumHost {
    async fn acquire(&self) -> Result<Box<dyn BrowserLease>, DriverError> {
        info!(headless = self.config.headless, "launching browser");
        let session = BrowserSession::launch(&self.config).await?;
        Ok(Box::new(ChromiumLease { session }))
    }
}

struct ChromiumLease {
    session: BrowserSession,
}

#[async_trait]
impl BrowserLease for ChromiumLease {
    fn page(&self) -> Arc<dyn PageDriver> {
        self.session.page()
    }

    async fn release(self: Box<Self>) -> Result<(), DriverError> {
        info!("releasing browser");
        self.session.close().await
    }
}
