// ABOUTME: Runtime detection logic for the local system.
// ABOUTME: Honors explicit overrides, then checks Podman sockets before Docker.

use super::types::{RuntimeConfig, RuntimeInfo, RuntimeType};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("{runtime} socket not found at {path}")]
    SocketNotFound { runtime: RuntimeType, path: String },
}

/// Detect the container runtime, preferring explicit configuration.
///
/// With `config.runtime` set, its socket (or the runtime's default socket)
/// must exist. A bare `config.socket` has its runtime inferred from the path.
pub fn detect(config: &RuntimeConfig) -> Result<RuntimeInfo, DetectionError> {
    match (config.runtime, config.socket.as_deref()) {
        (Some(runtime_type), socket) => {
            let socket_path = socket
                .map(str::to_string)
                .unwrap_or_else(|| default_socket_path(runtime_type));
            if !Path::new(&socket_path).exists() {
                return Err(DetectionError::SocketNotFound {
                    runtime: runtime_type,
                    path: socket_path,
                });
            }
            Ok(RuntimeInfo {
                runtime_type,
                socket_path,
            })
        }
        (None, Some(socket)) => {
            let runtime_type = if socket.contains("podman") {
                RuntimeType::Podman
            } else {
                RuntimeType::Docker
            };
            if !Path::new(socket).exists() {
                return Err(DetectionError::SocketNotFound {
                    runtime: runtime_type,
                    path: socket.to_string(),
                });
            }
            Ok(RuntimeInfo {
                runtime_type,
                socket_path: socket.to_string(),
            })
        }
        (None, None) => detect_local(),
    }
}

/// Detect container runtime on the local system.
///
/// Detection order:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_local() -> Result<RuntimeInfo, DetectionError> {
    // 1. Rootless Podman
    if let Some(uid) = get_uid() {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if Path::new(&rootless_socket).exists() {
            return Ok(RuntimeInfo {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    // 2. Rootful Podman
    if Path::new(ROOTFUL_PODMAN).exists() {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    // 3. Docker
    if Path::new(DOCKER_SOCKET).exists() {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}
