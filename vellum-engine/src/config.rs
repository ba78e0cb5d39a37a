//! Engine launch and render configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for the styling-settle wait, matching the deployed limit of
/// the system this engine replaces.
pub const DEFAULT_QUIESCENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for engine startup, from process spawn to a usable
/// DevTools endpoint.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the shared rendering engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Browser binary to launch. `None` discovers a Chromium/Chrome
    /// installation on `PATH`.
    pub binary: Option<PathBuf>,
    /// Extra flags appended to the headless launch command line.
    pub extra_args: Vec<String>,
    /// Bound on engine startup.
    pub startup_timeout: Duration,
    /// Bound on the per-render quiescence wait.
    pub quiescence_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            binary: None,
            extra_args: Vec::new(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            quiescence_timeout: DEFAULT_QUIESCENCE_TIMEOUT,
        }
    }
}
