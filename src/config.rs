//! Engine configuration.
//!
//! Configuration comes from an optional YAML file with environment
//! overrides on top. The credential secret is never read from the file and
//! never serialized back out; it enters only through `INKPOST_SECRET`.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use inkpost_core_types::{Credentials, PlatformUrls};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_USER: &str = "INKPOST_USER";
pub const ENV_SECRET: &str = "INKPOST_SECRET";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// URLs and URL signatures of the target platform deployment.
    pub platform: PlatformUrls,
    /// Login identifier. `INKPOST_USER` overrides the file value.
    pub identifier: String,
    /// Credential secret. Environment only, never the file.
    #[serde(skip)]
    pub secret: String,
    pub headless: bool,
    pub browser_executable: Option<PathBuf>,
    /// Where authentication artifacts are persisted between runs.
    pub session_file: PathBuf,
    pub poll_interval_ms: u64,
    /// Bound on the restored-session liveness check.
    pub liveness_wait_ms: u64,
    pub second_factor_max_wait_secs: u64,
    pub publish_verify_wait_ms: u64,
    /// Dry-run mode: resolve the whole pipeline without a browser.
    pub simulate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: PlatformUrls::default(),
            identifier: String::new(),
            secret: String::new(),
            headless: true,
            browser_executable: None,
            session_file: PathBuf::from(".inkpost/session.json"),
            poll_interval_ms: 500,
            liveness_wait_ms: 8_000,
            second_factor_max_wait_secs: 180,
            publish_verify_wait_ms: 20_000,
            simulate: false,
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file when one is given or present at the default
    /// location, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => {
                let default = Path::new("inkpost.yaml");
                if default.exists() {
                    Self::from_file(default).context("loading config from inkpost.yaml")?
                } else {
                    debug!("no config file, using defaults");
                    Self::default()
                }
            }
        };
        if let Ok(user) = env::var(ENV_USER) {
            config.identifier = user;
        }
        if let Ok(secret) = env::var(ENV_SECRET) {
            config.secret = secret;
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// Credentials are required for everything except simulate mode.
    pub fn validate(&self) -> Result<()> {
        if self.simulate {
            return Ok(());
        }
        if self.identifier.trim().is_empty() {
            bail!("no login identifier configured; set {ENV_USER} or `identifier` in the config file");
        }
        if self.secret.is_empty() {
            bail!("no credential secret configured; set {ENV_SECRET}");
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.identifier.clone(), self.secret.clone())
    }
}
