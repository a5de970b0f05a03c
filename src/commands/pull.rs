// ABOUTME: Pull command implementation.
// ABOUTME: Builds the desired state, connects to the runtime, and runs reconciliation.

use super::load_manifest;
use super::runtime_connection::connect_to_runtime;
use sinker::auth::DockerConfigAuth;
use sinker::config::SyncConfig;
use sinker::error::Result;
use sinker::output::Output;
use humantime_serde::re::humantime;
use sinker::sync::{DesiredState, Phase, RunDeadline, reconcile};
use std::env;

/// Make every desired image present locally.
///
/// Transfer failures are reported but do not fail the command; anything
/// fatal comes back as an error. The deadline covers the whole command,
/// from credential lookup to the last transfer.
pub async fn pull(config: SyncConfig, mut output: Output) -> Result<()> {
    output.start_timer();
    let deadline = RunDeadline::start(config.deadline);
    tracing::debug!(
        budget = %humantime::format_duration(deadline.budget()),
        "run deadline started"
    );
    let cwd = env::current_dir()?;

    // Credential helpers are child processes and block their thread
    let build_config = config.clone();
    let build = tokio::task::spawn_blocking(move || {
        let auth = DockerConfigAuth::new();
        DesiredState::build(&build_config, &auth, || {
            load_manifest(build_config.manifest.as_deref(), &cwd)
        })
    });
    let desired = deadline.guard(Phase::Resolve, build).await??;
    let desired = desired?;

    if desired.is_empty() {
        output.success("No images to pull");
        return Ok(());
    }

    output.progress(&format!(
        "Reconciling {} image(s) from {}",
        desired.len(),
        desired.source()
    ));

    let runtime = deadline
        .guard(Phase::Connect, connect_to_runtime(&config, &output))
        .await??;
    let outcome = reconcile(desired, &runtime, deadline).await?;

    output.report(&outcome);
    if outcome.has_failures() {
        output.warning(&format!(
            "{} image(s) failed to pull",
            outcome.failure_count()
        ));
    }

    Ok(())
}
