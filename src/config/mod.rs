// ABOUTME: Run configuration assembled once from the command line.
// ABOUTME: Passed by reference into the desired-state builder and the commands.

use crate::runtime::RuntimeConfig;
use crate::types::Origin;
use std::path::PathBuf;
use std::time::Duration;

/// Budget shared by every phase of a run.
pub const DEFAULT_RUN_DEADLINE: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Explicit manifest path; discovered in the working directory when unset.
    pub manifest: Option<PathBuf>,

    /// Images overriding the manifest when non-empty.
    pub images: Vec<String>,

    pub origin: Origin,

    pub deadline: Duration,

    pub runtime: RuntimeConfig,

    /// TLS verification for Podman pulls.
    pub tls_verify: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            images: Vec::new(),
            origin: Origin::default(),
            deadline: DEFAULT_RUN_DEADLINE,
            runtime: RuntimeConfig::default(),
            tls_verify: true,
        }
    }
}

impl SyncConfig {
    /// Whether the explicit image list replaces the manifest for this run.
    pub fn uses_image_override(&self) -> bool {
        !self.images.is_empty()
    }
}
