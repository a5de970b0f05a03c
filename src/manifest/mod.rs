// ABOUTME: Image manifest types and parsing for .images.yaml.
// ABOUTME: Selects image references and credentials for the source or target role.

mod env_value;

pub use env_value::EnvValue;

use crate::auth::AuthError;
use crate::types::{DEFAULT_REGISTRY, EncodedAuth, ImageRef, Origin, ParseImageRefError, RegistryAuth};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILENAME: &str = ".images.yaml";
pub const MANIFEST_FILENAME_ALT: &str = ".images.yml";
pub const MANIFEST_FILENAME_DIR: &str = ".sinker/images.yaml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found in {0}")]
    NotFound(PathBuf),

    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("manifest target host cannot be empty")]
    MissingTargetHost,

    #[error("source {index} has an empty repository")]
    EmptyRepository { index: usize },

    #[error("invalid {origin} image for source '{repository}': {source}")]
    InvalidImage {
        origin: Origin,
        repository: String,
        source: ParseImageRefError,
    },
}

/// Desired images, as mirrored from their sources to a single target registry.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub target: Target,

    #[serde(default)]
    pub sources: Vec<Source>,
}

/// The registry images are mirrored to.
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    pub host: String,

    /// Path prefix prepended to every source repository.
    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// An image to mirror.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub repository: String,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub tag: Option<String>,

    #[serde(default)]
    pub digest: Option<String>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// Inline registry credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: EnvValue,
    pub password: EnvValue,
}

impl AuthConfig {
    /// Resolve the values and encode them for `host`.
    pub fn resolve(&self, host: &str) -> Result<EncodedAuth, AuthError> {
        let auth = RegistryAuth {
            username: self.username.resolve()?,
            password: self.password.resolve()?,
            server: Some(host.to_string()),
            identity_token: None,
        };
        Ok(EncodedAuth::from_credentials(&auth)?)
    }
}

/// One image a manifest yields for a role, with the credential to use for it.
#[derive(Debug, Clone)]
pub struct ManifestEntry<'a> {
    pub image: ImageRef,
    /// Inline credentials; `None` defers to the authorization provider.
    pub auth: Option<&'a AuthConfig>,
}

impl Source {
    pub fn host(&self) -> &str {
        self.host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_REGISTRY)
    }

    /// The reference at the source registry.
    pub fn image(&self) -> Result<ImageRef, ParseImageRefError> {
        ImageRef::from_parts(
            self.host(),
            &self.repository,
            self.tag.as_deref(),
            self.digest.as_deref(),
        )
    }

    /// The reference at the target registry.
    pub fn target_image(&self, target: &Target) -> Result<ImageRef, ParseImageRefError> {
        let repository = match target.repository.as_deref().map(|r| r.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, self.repository),
            _ => self.repository.clone(),
        };
        ImageRef::from_parts(
            &target.host,
            &repository,
            self.tag.as_deref(),
            self.digest.as_deref(),
        )
    }
}

impl Manifest {
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Find the manifest file in `dir`.
    pub fn find(dir: &Path) -> Result<PathBuf, ManifestError> {
        let candidates = [
            dir.join(MANIFEST_FILENAME),
            dir.join(MANIFEST_FILENAME_ALT),
            dir.join(MANIFEST_FILENAME_DIR),
        ];

        candidates
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| ManifestError::NotFound(dir.to_path_buf()))
    }

    pub fn discover(dir: &Path) -> Result<Self, ManifestError> {
        Self::load(&Self::find(dir)?)
    }

    /// The images and credentials this manifest yields for `origin`.
    pub fn entries(&self, origin: Origin) -> Result<Vec<ManifestEntry<'_>>, ManifestError> {
        self.sources
            .iter()
            .map(|source| {
                let (image, auth) = match origin {
                    Origin::Source => (source.image(), source.auth.as_ref()),
                    Origin::Target => (source.target_image(&self.target), self.target.auth.as_ref()),
                };
                let image = image.map_err(|e| ManifestError::InvalidImage {
                    origin,
                    repository: source.repository.clone(),
                    source: e,
                })?;
                Ok(ManifestEntry { image, auth })
            })
            .collect()
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if self.target.host.trim().is_empty() {
            return Err(ManifestError::MissingTargetHost);
        }
        for (index, source) in self.sources.iter().enumerate() {
            if source.repository.trim().is_empty() {
                return Err(ManifestError::EmptyRepository { index });
            }
        }
        self.entries(Origin::Source)?;
        self.entries(Origin::Target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
target:
  host: mirror.example.com
  repository: mirrors
sources:
  - repository: coreos/prometheus-operator
    host: quay.io
    tag: v0.40.0
  - repository: library/nginx
    digest: sha256:abc123
"#;

    #[test]
    fn source_entries_use_source_hosts() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let images: Vec<String> = manifest
            .entries(Origin::Source)
            .unwrap()
            .into_iter()
            .map(|e| e.image.to_string())
            .collect();
        assert_eq!(
            images,
            vec![
                "quay.io/coreos/prometheus-operator:v0.40.0",
                "docker.io/library/nginx@sha256:abc123",
            ]
        );
    }

    #[test]
    fn target_entries_use_target_prefix() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let images: Vec<String> = manifest
            .entries(Origin::Target)
            .unwrap()
            .into_iter()
            .map(|e| e.image.to_string())
            .collect();
        assert_eq!(
            images,
            vec![
                "mirror.example.com/mirrors/coreos/prometheus-operator:v0.40.0",
                "mirror.example.com/mirrors/library/nginx@sha256:abc123",
            ]
        );
    }

    #[test]
    fn missing_tag_defaults_to_latest() {
        let source = Source {
            repository: "app".to_string(),
            host: Some("registry.example.com".to_string()),
            tag: None,
            digest: None,
            auth: None,
        };
        assert_eq!(source.image().unwrap().tag(), Some("latest"));
    }
}
