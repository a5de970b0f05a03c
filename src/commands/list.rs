// ABOUTME: List command implementation.
// ABOUTME: Prints the image references a manifest yields without contacting registries.

use super::load_manifest;
use sinker::config::SyncConfig;
use sinker::error::Result;
use sinker::output::Output;
use std::env;

/// Print every image the manifest yields for the configured origin.
pub fn list(config: &SyncConfig, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let manifest = load_manifest(config.manifest.as_deref(), &cwd)?;
    let entries = manifest.entries(config.origin)?;

    output.images(entries.iter().map(|entry| &entry.image));
    Ok(())
}
