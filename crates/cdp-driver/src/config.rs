//! Launch configuration for the browser process.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Browser launch configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverConfig {
    pub headless: bool,

    /// Explicit browser binary. When absent chromiumoxide probes the
    /// standard install locations.
    pub executable: Option<PathBuf>,

    /// Profile directory. A persistent profile keeps platform cookies
    /// between launches independently of the session file.
    pub user_data_dir: Option<PathBuf>,

    pub window_width: u32,
    pub window_height: u32,

    pub launch_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            window_width: 1280,
            window_height: 900,
            launch_timeout_ms: 20_000,
        }
    }
}
