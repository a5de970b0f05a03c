// ABOUTME: Shared helper for connecting to the local container runtime.
// ABOUTME: Detects the socket, connects, and checks the daemon answers.

use sinker::config::SyncConfig;
use sinker::error::Result;
use sinker::output::Output;
use sinker::runtime::{BollardRuntime, RuntimeError, RuntimeInfoTrait, detect};

/// Connect to the container runtime named by `config`, or the first one found.
///
/// This handles the common pattern of:
/// 1. Detecting the runtime type and socket path
/// 2. Outputting progress messages
/// 3. Establishing the connection and pinging the daemon
pub async fn connect_to_runtime(config: &SyncConfig, output: &Output) -> Result<BollardRuntime> {
    output.progress("  → Detecting runtime...");
    let runtime_info = detect(&config.runtime).map_err(RuntimeError::from)?;

    output.progress(&format!(
        "  → Found {} at {}",
        runtime_info.runtime_type, runtime_info.socket_path
    ));

    let runtime = BollardRuntime::connect(&runtime_info)
        .map_err(RuntimeError::from)?
        .with_tls_verify(config.tls_verify);

    runtime.ping().await.map_err(RuntimeError::from)?;

    match runtime.info().await {
        Ok(meta) => tracing::debug!(
            runtime = %runtime.runtime_type(),
            name = %meta.name,
            version = %meta.version,
            api = %meta.api_version,
            "connected to runtime"
        ),
        Err(e) => tracing::debug!("runtime info unavailable: {}", e),
    }

    Ok(runtime)
}
