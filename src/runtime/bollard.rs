// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::runtime::traits::{
    ImageError, ImageOps, RemoteImage, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::RuntimeType;
use crate::types::{EncodedAuth, ImageRef, RegistryAuth};
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::query_parameters::CreateImageOptions;
use futures::StreamExt;
use http_body_util::BodyExt;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_image_pull_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 401 | 403,
            ..
        } => ImageError::AuthenticationFailed(format!("{}: {}", image_name, e)),
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => ImageError::NotFound(image_name.to_string()),
        _ => ImageError::PullFailed(format!("{}: {}", image_name, e)),
    }
}

fn map_registry_inspect_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 401 | 403,
            message,
        } => ImageError::AuthenticationFailed(format!("{}: {}", image_name, message)),
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => ImageError::NotFound(image_name.to_string()),
        // Some daemons report registry auth failures as 500 with a message
        bollard::errors::Error::DockerResponseServerError { message, .. }
            if is_unauthorized_message(message) =>
        {
            ImageError::AuthenticationFailed(format!("{}: {}", image_name, message))
        }
        _ => ImageError::Runtime(format!("failed to inspect {} at remote: {}", image_name, e)),
    }
}

fn is_unauthorized_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("unauthorized")
        || message.contains("authentication required")
        || message.contains("denied")
}

fn docker_credentials(auth: &EncodedAuth) -> Result<Option<DockerCredentials>, ImageError> {
    let decoded = auth
        .decode()
        .map_err(|e| ImageError::InvalidAuth(e.to_string()))?;
    Ok(decoded.map(|a: RegistryAuth| DockerCredentials {
        username: Some(a.username).filter(|u| !u.is_empty()),
        password: Some(a.password).filter(|p| !p.is_empty()),
        serveraddress: a.server,
        identitytoken: a.identity_token,
        ..Default::default()
    }))
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via Docker-compatible API.
/// For Podman, pulls go through the native libpod API so TLS verification
/// can be configured per run.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: Option<String>,
    tls_verify: bool,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
            socket_path: None,
            tls_verify: true,
        }
    }

    /// Create a new BollardRuntime with socket path for libpod API access.
    pub fn new_with_socket(client: Docker, runtime_type: RuntimeType, socket_path: String) -> Self {
        Self {
            client,
            runtime_type,
            socket_path: Some(socket_path),
            tls_verify: true,
        }
    }

    /// Connect to a container runtime using detected runtime info.
    ///
    /// Use with `detect()` or `detect_local()` to find the socket.
    pub fn connect(info: &super::types::RuntimeInfo) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new_with_socket(
            client,
            info.runtime_type,
            info.socket_path.clone(),
        ))
    }

    /// Disable TLS verification for Podman pulls (insecure HTTP registries).
    pub fn with_tls_verify(mut self, tls_verify: bool) -> Self {
        self.tls_verify = tls_verify;
        self
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Pull image using Podman's native libpod API.
    ///
    /// The encoded authorization is forwarded verbatim in `X-Registry-Auth`.
    async fn pull_image_libpod(
        &self,
        image_name: &str,
        auth: &EncodedAuth,
    ) -> Result<(), ImageError> {
        let socket_path = self.socket_path.as_ref().ok_or_else(|| {
            ImageError::PullFailed("socket path not available for libpod API".to_string())
        })?;

        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| ImageError::Runtime(format!("failed to connect to socket: {}", e)))?;

        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ImageError::Runtime(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("libpod connection error: {}", e);
            }
        });

        let encoded_ref = urlencoding::encode(image_name);
        let uri = format!(
            "/v4.0.0/libpod/images/pull?reference={}&tlsVerify={}",
            encoded_ref, self.tls_verify
        );

        let mut builder = hyper::Request::builder()
            .method("POST")
            .uri(&uri)
            .header("Host", "localhost");
        if !auth.is_anonymous() {
            builder = builder.header("X-Registry-Auth", auth.as_str());
        }
        let req = builder
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| ImageError::PullFailed(format!("failed to build request: {}", e)))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ImageError::PullFailed(format!("request failed: {}", e)))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ImageError::PullFailed(format!("failed to read response: {}", e)))?;
        let body_bytes = body.to_bytes();
        let body_text = String::from_utf8_lossy(&body_bytes);

        if status == hyper::StatusCode::UNAUTHORIZED || status == hyper::StatusCode::FORBIDDEN {
            return Err(ImageError::AuthenticationFailed(format!(
                "{}: {}",
                image_name, body_text
            )));
        }

        if !status.is_success() {
            return Err(ImageError::PullFailed(format!(
                "{}: libpod API error: {}",
                image_name, body_text
            )));
        }

        // The progress stream reports failures inline
        if body_text.contains("\"error\"") && !body_text.contains("\"error\":null") {
            return Err(ImageError::PullFailed(format!(
                "{}: {}",
                image_name, body_text
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        let image_name = reference.to_string();

        match self.client.inspect_image(&image_name).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(ImageError::Runtime(format!(
                "failed to inspect {}: {}",
                image_name, e
            ))),
        }
    }

    async fn inspect_remote(
        &self,
        reference: &ImageRef,
        auth: &EncodedAuth,
    ) -> Result<RemoteImage, ImageError> {
        let image_name = reference.to_string();
        let credentials = docker_credentials(auth)?;

        let inspect = self
            .client
            .inspect_registry_image(&image_name, credentials)
            .await
            .map_err(|e| map_registry_inspect_error(e, &image_name))?;

        let platforms = inspect
            .platforms
            .iter()
            .map(|p| {
                format!(
                    "{}/{}",
                    p.os.as_deref().unwrap_or("unknown"),
                    p.architecture.as_deref().unwrap_or("unknown")
                )
            })
            .collect();

        Ok(RemoteImage {
            digest: inspect.descriptor.digest.clone(),
            platforms,
        })
    }

    async fn pull_image(&self, reference: &ImageRef, auth: &EncodedAuth) -> Result<(), ImageError> {
        let image_name = reference.to_string();

        if self.runtime_type == RuntimeType::Podman && self.socket_path.is_some() {
            return self.pull_image_libpod(&image_name, auth).await;
        }

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        let credentials = docker_credentials(auth)?;

        // Pull returns a stream of progress updates; the pull is only done
        // once the stream is drained
        let mut stream = self.client.create_image(Some(opts), None, credentials);
        while let Some(result) = stream.next().await {
            let progress = result.map_err(|e| map_image_pull_error(e, &image_name))?;
            if let Some(status) = progress.status.as_deref() {
                tracing::trace!(image = %image_name, "{}", status);
            }
        }

        Ok(())
    }
}
