// ABOUTME: Command module aggregator for the sinker CLI.
// ABOUTME: Re-exports pull and list command handlers.

mod list;
mod pull;
mod runtime_connection;

pub use list::list;
pub use pull::pull;

use sinker::manifest::{Manifest, ManifestError};
use std::path::Path;

/// Load the manifest named on the command line, or discover one in `cwd`.
fn load_manifest(explicit: Option<&Path>, cwd: &Path) -> Result<Manifest, ManifestError> {
    match explicit {
        Some(path) => Manifest::load(path),
        None => Manifest::discover(cwd),
    }
}
