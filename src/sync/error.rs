// ABOUTME: Error taxonomy for reconciliation runs.
// ABOUTME: Fatal run errors use SNAFU; per-image transfer failures are soft.

use snafu::Snafu;
use std::fmt;
use std::time::Duration;

use crate::auth::AuthError;
use crate::manifest::ManifestError;
use crate::runtime::{ImageError, ImageErrorKind};
use crate::types::{ImageRef, ParseImageRefError};

/// Phase of a run, used to say where the deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Credential lookup while the desired state is built.
    Resolve,
    /// Runtime detection and ping.
    Connect,
    Filter,
    Validate,
    Transfer,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Resolve => write!(f, "credential resolution"),
            Phase::Connect => write!(f, "runtime connection"),
            Phase::Filter => write!(f, "local existence check"),
            Phase::Validate => write!(f, "remote validation"),
            Phase::Transfer => write!(f, "transfer"),
        }
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SyncError {
    #[snafu(display("get manifest: {source}"))]
    Manifest { source: ManifestError },

    #[snafu(display("parse image '{input}': {source}"))]
    InvalidImage {
        input: String,
        source: ParseImageRefError,
    },

    #[snafu(display("get auth for {host} ({image}): {source}"))]
    AuthResolution {
        image: String,
        host: String,
        source: AuthError,
    },

    #[snafu(display("image {image} is listed more than once with different credentials"))]
    ConflictingCredentials { image: ImageRef },

    #[snafu(display("image host existence for {image}: {source}"))]
    HostQuery { image: ImageRef, source: ImageError },

    #[snafu(display("validating remote image {image}: {source}"))]
    RemoteValidation { image: ImageRef, source: ImageError },

    #[snafu(display(
        "run deadline of {} exceeded during {phase}",
        humantime_serde::re::humantime::format_duration(*budget)
    ))]
    DeadlineExceeded { phase: Phase, budget: Duration },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Manifest missing or malformed.
    Manifest,
    /// An image reference could not be parsed or was listed inconsistently.
    InvalidInput,
    /// Credentials could not be resolved.
    AuthResolution,
    /// The local runtime could not be queried.
    HostQuery,
    /// The registry refused or does not serve an image.
    RemoteValidation,
    /// The run budget elapsed.
    DeadlineExceeded,
}

impl SyncError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Manifest { .. } => SyncErrorKind::Manifest,
            SyncError::InvalidImage { .. } | SyncError::ConflictingCredentials { .. } => {
                SyncErrorKind::InvalidInput
            }
            SyncError::AuthResolution { .. } => SyncErrorKind::AuthResolution,
            SyncError::HostQuery { .. } => SyncErrorKind::HostQuery,
            SyncError::RemoteValidation { .. } => SyncErrorKind::RemoteValidation,
            SyncError::DeadlineExceeded { .. } => SyncErrorKind::DeadlineExceeded,
        }
    }

    /// For remote validation failures, whether the image was missing,
    /// unauthorized, or the registry unreachable.
    pub fn remote_cause(&self) -> Option<ImageErrorKind> {
        match self {
            SyncError::RemoteValidation { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// A single image's failed transfer. Recorded in the outcome, never fatal.
#[derive(Debug, thiserror::Error)]
#[error("pull image and wait: {image}: {source}")]
pub struct TransferError {
    pub image: ImageRef,
    pub source: ImageError,
}
