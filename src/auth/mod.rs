// ABOUTME: Authorization providers resolving registry credentials by host.
// ABOUTME: Defines the AuthProvider trait and its Docker/Podman config implementation.

mod docker_config;
mod helper;

pub use docker_config::{DockerAuthEntry, DockerConfig, DockerConfigAuth};

use crate::types::EncodedAuth;
use std::path::PathBuf;
use thiserror::Error;

/// Resolves the encoded authorization for a registry host.
///
/// A host with no configured credentials resolves to anonymous access; an
/// error means the credential store itself could not be consulted.
pub trait AuthProvider {
    fn resolve(&self, host: &str) -> Result<EncodedAuth, AuthError>;
}

/// Errors from credential resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid auth entry for {host}: {reason}")]
    InvalidEntry { host: String, reason: String },

    #[error("credential helper {helper} failed for {host}: {reason}")]
    Helper {
        helper: String,
        host: String,
        reason: String,
    },

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("failed to encode credentials: {0}")]
    Encode(#[from] serde_json::Error),
}
