// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Local existence, remote validation, and blocking pull of container images.

use crate::types::{EncodedAuth, ImageRef};
use async_trait::async_trait;

/// Image operations the reconciliation engine sequences.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Check if an image exists locally.
    ///
    /// An error means the runtime could not be queried, never that the image
    /// is absent.
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError>;

    /// Check that the registry serves the image to the given credentials.
    async fn inspect_remote(
        &self,
        reference: &ImageRef,
        auth: &EncodedAuth,
    ) -> Result<RemoteImage, ImageError>;

    /// Pull an image and wait until it is fully retrieved.
    async fn pull_image(&self, reference: &ImageRef, auth: &EncodedAuth)
    -> Result<(), ImageError>;
}

/// What the registry reported about an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteImage {
    /// Manifest digest.
    pub digest: Option<String>,
    /// Platforms the manifest covers, as `os/architecture`.
    pub platforms: Vec<String>,
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("authentication failed for registry: {0}")]
    AuthenticationFailed(String),

    #[error("invalid registry authorization: {0}")]
    InvalidAuth(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Why an image operation failed, for callers that branch on the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageErrorKind {
    NotFound,
    Unauthorized,
    Transport,
}

impl ImageError {
    pub fn kind(&self) -> ImageErrorKind {
        match self {
            ImageError::NotFound(_) => ImageErrorKind::NotFound,
            ImageError::AuthenticationFailed(_) | ImageError::InvalidAuth(_) => {
                ImageErrorKind::Unauthorized
            }
            ImageError::PullFailed(_) | ImageError::Runtime(_) => ImageErrorKind::Transport,
        }
    }
}
