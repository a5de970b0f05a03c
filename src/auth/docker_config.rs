// ABOUTME: Credential lookup in Docker config.json and Podman auth.json.
// ABOUTME: Supports auths entries, credsStore, and per-host credHelpers.

use super::{AuthError, AuthProvider, helper};
use crate::types::{DEFAULT_REGISTRY, EncodedAuth, RegistryAuth, canonical_host};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key Docker uses for Docker Hub credentials.
const DOCKER_HUB_KEY: &str = "https://index.docker.io/v1/";

/// Docker config.json structure (Podman's auth.json is a subset).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerConfig {
    /// Registry auths keyed by server.
    #[serde(default)]
    pub auths: BTreeMap<String, DockerAuthEntry>,

    /// Credential store (e.g., "osxkeychain", "secretservice").
    #[serde(rename = "credsStore", default)]
    pub creds_store: Option<String>,

    /// Per-registry credential helpers.
    #[serde(rename = "credHelpers", default)]
    pub cred_helpers: BTreeMap<String, String>,
}

/// A single `auths` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerAuthEntry {
    /// Base64-encoded "username:password".
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "identitytoken", default)]
    pub identity_token: Option<String>,
}

impl DockerConfig {
    pub fn from_json(json: &str, path: &Path) -> Result<Self, AuthError> {
        serde_json::from_str(json).map_err(|source| AuthError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge `other` into self; entries in `other` win.
    ///
    /// Keys are stored normalized, so `https://index.docker.io/v1/` in one
    /// file and `docker.io` in a later one name the same slot.
    fn merge(&mut self, other: DockerConfig) {
        for (key, entry) in other.auths {
            self.auths.insert(normalize_server(&key), entry);
        }
        for (key, helper) in other.cred_helpers {
            self.cred_helpers.insert(normalize_server(&key), helper);
        }
        if other.creds_store.is_some() {
            self.creds_store = other.creds_store;
        }
    }

    fn entry_for(&self, host: &str) -> Option<&DockerAuthEntry> {
        self.auths.get(host)
    }

    fn helper_for(&self, host: &str) -> Option<&str> {
        self.cred_helpers
            .get(host)
            .map(String::as_str)
            .or(self.creds_store.as_deref())
    }
}

/// Reduce a server key to a bare host; Docker Hub aliases collapse to `docker.io`.
fn normalize_server(server: &str) -> String {
    let without_scheme = server
        .strip_prefix("https://")
        .or_else(|| server.strip_prefix("http://"))
        .unwrap_or(server);
    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_ascii_lowercase();
    canonical_host(&host).to_string()
}

fn decode_entry(host: &str, entry: &DockerAuthEntry) -> Result<Option<RegistryAuth>, AuthError> {
    if let (Some(username), Some(password)) = (&entry.username, &entry.password) {
        return Ok(Some(RegistryAuth {
            username: username.clone(),
            password: password.clone(),
            server: Some(host.to_string()),
            identity_token: entry.identity_token.clone(),
        }));
    }

    let invalid = |reason: &str| AuthError::InvalidEntry {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    let (username, password) = match entry.auth.as_deref().filter(|a| !a.is_empty()) {
        Some(encoded) => {
            let decoded = STANDARD
                .decode(encoded)
                .map_err(|e| invalid(&format!("auth is not base64: {}", e)))?;
            let decoded =
                String::from_utf8(decoded).map_err(|_| invalid("auth is not UTF-8"))?;
            let (username, password) = decoded
                .split_once(':')
                .ok_or_else(|| invalid("auth is not in username:password form"))?;
            (username.to_string(), password.to_string())
        }
        None => (String::new(), String::new()),
    };

    if username.is_empty() && password.is_empty() && entry.identity_token.is_none() {
        return Ok(None);
    }

    Ok(Some(RegistryAuth {
        username,
        password,
        server: Some(host.to_string()),
        identity_token: entry.identity_token.clone(),
    }))
}

/// Resolves credentials from the Docker and Podman credential files.
///
/// Files are read on every lookup so a run sees edits made by `docker login`
/// between invocations of the provider.
#[derive(Debug, Clone)]
pub struct DockerConfigAuth {
    paths: Vec<PathBuf>,
}

impl DockerConfigAuth {
    /// Use the default locations: Docker's config.json, then Podman's auth.json.
    pub fn new() -> Self {
        Self::with_paths(default_paths())
    }

    /// Use explicit files; later files override earlier ones per host.
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn load(&self) -> Result<DockerConfig, AuthError> {
        let mut merged = DockerConfig::default();
        for path in &self.paths {
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(path).map_err(|source| AuthError::Read {
                path: path.clone(),
                source,
            })?;
            merged.merge(DockerConfig::from_json(&content, path)?);
        }
        Ok(merged)
    }

    fn lookup(&self, host: &str) -> Result<Option<RegistryAuth>, AuthError> {
        let host = normalize_server(host);
        let config = self.load()?;

        if let Some(helper_name) = config.helper_for(&host) {
            let server = if host == DEFAULT_REGISTRY {
                DOCKER_HUB_KEY
            } else {
                host.as_str()
            };
            tracing::debug!(host = %host, helper = helper_name, "querying credential helper");
            if let Some(auth) = helper::get(helper_name, server)? {
                return Ok(Some(auth));
            }
        }

        match config.entry_for(&host) {
            Some(entry) => {
                tracing::debug!(host = %host, "using stored credentials");
                decode_entry(&host, entry)
            }
            None => Ok(None),
        }
    }
}

impl Default for DockerConfigAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for DockerConfigAuth {
    fn resolve(&self, host: &str) -> Result<EncodedAuth, AuthError> {
        match self.lookup(host)? {
            Some(auth) => Ok(EncodedAuth::from_credentials(&auth)?),
            None => {
                tracing::debug!(host, "no stored credentials, using anonymous access");
                Ok(EncodedAuth::anonymous())
            }
        }
    }
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    match std::env::var_os("DOCKER_CONFIG") {
        Some(dir) => paths.push(PathBuf::from(dir).join("config.json")),
        None => {
            if let Some(home) = dirs::home_dir() {
                paths.push(home.join(".docker").join("config.json"));
            }
        }
    }

    match std::env::var_os("REGISTRY_AUTH_FILE") {
        Some(file) => paths.push(PathBuf::from(file)),
        None => {
            if let Some(runtime_dir) = dirs::runtime_dir() {
                paths.push(runtime_dir.join("containers").join("auth.json"));
            }
        }
    }

    paths
}
