// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles formats like nginx, nginx:tag, registry/image:tag@digest.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Registry host used when a reference names no registry.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Hosts that serve Docker Hub under another name.
const DOCKER_HUB_ALIASES: [&str; 3] = [
    "index.docker.io",
    "registry-1.docker.io",
    "registry.hub.docker.com",
];

/// Map a Docker Hub alias to `docker.io`; other hosts pass through.
pub(crate) fn canonical_host(host: &str) -> &str {
    if DOCKER_HUB_ALIASES.contains(&host) {
        DEFAULT_REGISTRY
    } else {
        host
    }
}

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// A parsed image reference in canonical form.
///
/// The registry is always explicit and Docker Hub aliases collapse to
/// `docker.io`, where single-component names gain the `library/` prefix.
/// `nginx`, `docker.io/nginx` and `docker.io/library/nginx:latest` are
/// therefore one reference. Ordering follows the canonical components so
/// that maps keyed by references iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef {
    registry: String,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric()
                && c != '/'
                && c != ':'
                && c != '.'
                && c != '-'
                && c != '_'
                && c != '@'
            {
                return Err(ParseImageRefError::InvalidChar(c));
            }
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => {
                if after.is_empty() {
                    return Err(ParseImageRefError::InvalidFormat(input.to_string()));
                }
                (before, Some(after.to_string()))
            }
            None => (input, None),
        };

        let (without_tag, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) => {
                // A colon followed by a path is a registry port, not a tag
                if after.contains('/') {
                    (without_digest, None)
                } else if after.is_empty() {
                    return Err(ParseImageRefError::InvalidFormat(input.to_string()));
                } else {
                    (before, Some(after.to_string()))
                }
            }
            None => (without_digest, None),
        };

        let (registry, name) = Self::parse_registry_and_name(without_tag)?;
        let registry = canonical_host(registry.unwrap_or(DEFAULT_REGISTRY)).to_string();
        let name = if registry == DEFAULT_REGISTRY && !name.contains('/') {
            format!("library/{}", name)
        } else {
            name.to_string()
        };

        let tag = match (&tag, &digest) {
            (None, None) => Some("latest".to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    /// Build a reference from manifest components.
    ///
    /// `tag` defaults to `latest` when neither a tag nor a digest is given.
    pub fn from_parts(
        registry: &str,
        repository: &str,
        tag: Option<&str>,
        digest: Option<&str>,
    ) -> Result<Self, ParseImageRefError> {
        let mut reference = format!("{}/{}", registry.trim_end_matches('/'), repository);
        if let Some(tag) = tag {
            reference.push(':');
            reference.push_str(tag);
        }
        if let Some(digest) = digest {
            reference.push('@');
            reference.push_str(digest);
        }
        Self::parse(&reference)
    }

    fn parse_registry_and_name(
        input: &str,
    ) -> Result<(Option<&str>, &str), ParseImageRefError> {
        // A registry is present if the first component contains a dot or colon,
        // or is "localhost"
        let parts: Vec<&str> = input.splitn(2, '/').collect();

        match parts.as_slice() {
            [name] if !name.is_empty() => Ok((None, *name)),
            [first, rest] if !first.is_empty() && !rest.is_empty() => {
                if first.contains('.') || first.contains(':') || *first == "localhost" {
                    Ok((Some(*first), *rest))
                } else {
                    Ok((None, input))
                }
            }
            _ => Err(ParseImageRefError::InvalidFormat(input.to_string())),
        }
    }

    /// The registry host, which is also the scope of its credentials.
    pub fn host(&self) -> &str {
        &self.registry
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
