// ABOUTME: Test support utilities.
// ABOUTME: Provides in-memory runtime and credential fakes for engine tests.

use async_trait::async_trait;
use sinker::auth::{AuthError, AuthProvider};
use sinker::runtime::{ImageError, ImageErrorKind, ImageOps, RemoteImage};
use sinker::types::{EncodedAuth, ImageRef};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, Once};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("sinker=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Canonical string form of an image reference.
#[allow(dead_code)]
pub fn canonical(image: &str) -> String {
    ImageRef::parse(image).unwrap().to_string()
}

/// One call the engine made against the fake runtime.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    Inspect { image: String, auth: String },
    Pull { image: String, auth: String },
}

/// In-memory `ImageOps` recording every call.
///
/// Pulled images become present, so a second run sees them locally.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeRuntime {
    local: Mutex<BTreeSet<String>>,
    unreachable: BTreeMap<String, ImageErrorKind>,
    failing_pulls: BTreeSet<String>,
    failing_exists: BTreeSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(self, image: &str) -> Self {
        self.local.lock().unwrap().insert(canonical(image));
        self
    }

    pub fn unreachable(mut self, image: &str, kind: ImageErrorKind) -> Self {
        self.unreachable.insert(canonical(image), kind);
        self
    }

    pub fn failing_pull(mut self, image: &str) -> Self {
        self.failing_pulls.insert(canonical(image));
        self
    }

    pub fn failing_exists(mut self, image: &str) -> Self {
        self.failing_exists.insert(canonical(image));
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn existence_checked(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Exists(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn inspected(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Inspect { image, .. } => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn pulled(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Pull { image, .. } => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn is_local(&self, image: &str) -> bool {
        self.local.lock().unwrap().contains(&canonical(image))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        let image = reference.to_string();
        self.record(Call::Exists(image.clone()));
        self.pause().await;
        if self.failing_exists.contains(&image) {
            return Err(ImageError::Runtime("daemon unavailable".to_string()));
        }
        Ok(self.local.lock().unwrap().contains(&image))
    }

    async fn inspect_remote(
        &self,
        reference: &ImageRef,
        auth: &EncodedAuth,
    ) -> Result<RemoteImage, ImageError> {
        let image = reference.to_string();
        self.record(Call::Inspect {
            image: image.clone(),
            auth: auth.as_str().to_string(),
        });
        self.pause().await;
        match self.unreachable.get(&image) {
            Some(ImageErrorKind::NotFound) => Err(ImageError::NotFound(image)),
            Some(ImageErrorKind::Unauthorized) => {
                Err(ImageError::AuthenticationFailed(reference.host().to_string()))
            }
            Some(ImageErrorKind::Transport) => {
                Err(ImageError::Runtime("registry unreachable".to_string()))
            }
            None => Ok(RemoteImage {
                digest: Some("sha256:0123456789abcdef".to_string()),
                platforms: vec!["linux/amd64".to_string()],
            }),
        }
    }

    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: &EncodedAuth,
    ) -> Result<(), ImageError> {
        let image = reference.to_string();
        self.record(Call::Pull {
            image: image.clone(),
            auth: auth.as_str().to_string(),
        });
        self.pause().await;
        if self.failing_pulls.contains(&image) {
            return Err(ImageError::PullFailed(format!("{image}: connection reset")));
        }
        self.local.lock().unwrap().insert(image);
        Ok(())
    }
}

/// Credential provider answering from a fixed per-host table.
///
/// Hosts without an entry resolve to anonymous access.
#[allow(dead_code)]
#[derive(Default)]
pub struct StaticAuth {
    entries: BTreeMap<String, EncodedAuth>,
    failing: BTreeSet<String>,
    lookups: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StaticAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, host: &str, auth: &str) -> Self {
        self.entries
            .insert(host.to_string(), EncodedAuth::from_encoded(auth));
        self
    }

    pub fn failing(mut self, host: &str) -> Self {
        self.failing.insert(host.to_string());
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl AuthProvider for StaticAuth {
    fn resolve(&self, host: &str) -> Result<EncodedAuth, AuthError> {
        self.lookups.lock().unwrap().push(host.to_string());
        if self.failing.contains(host) {
            return Err(AuthError::Helper {
                helper: "fake".to_string(),
                host: host.to_string(),
                reason: "store locked".to_string(),
            });
        }
        Ok(self.entries.get(host).cloned().unwrap_or_default())
    }
}
