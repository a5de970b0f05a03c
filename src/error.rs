// ABOUTME: Application-wide error types for sinker.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::manifest::ManifestError;
use crate::runtime::RuntimeError;
use crate::sync::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
