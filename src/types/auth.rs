// ABOUTME: Registry credentials and their opaque encoded form.
// ABOUTME: EncodedAuth matches the body Docker expects in X-Registry-Auth.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Registry authentication credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAuth {
    /// Username.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Password or token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Registry server (e.g., "ghcr.io").
    #[serde(
        rename = "serveraddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server: Option<String>,
    /// OAuth identity token, used instead of a password when present.
    #[serde(
        rename = "identitytoken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub identity_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum DecodeAuthError {
    #[error("authorization is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("authorization is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque credential scoped to one registry host.
///
/// An empty value means anonymous access. The engine never looks inside;
/// only the registry client decodes it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EncodedAuth(String);

impl EncodedAuth {
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// Wrap an already-encoded value.
    pub fn from_encoded(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_credentials(auth: &RegistryAuth) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(auth)?;
        Ok(Self(URL_SAFE.encode(json)))
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back into credentials. Anonymous values decode to `None`.
    pub fn decode(&self) -> Result<Option<RegistryAuth>, DecodeAuthError> {
        if self.is_anonymous() {
            return Ok(None);
        }
        let bytes = URL_SAFE
            .decode(&self.0)
            .or_else(|_| STANDARD.decode(&self.0))?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

impl fmt::Debug for EncodedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            f.write_str("EncodedAuth(anonymous)")
        } else {
            f.write_str("EncodedAuth(<redacted>)")
        }
    }
}
