// ABOUTME: Reconciliation run parameterized by phase, with its state transitions.
// ABOUTME: Each transition consumes self, so phases run once and only in order.

use chrono::{DateTime, Utc};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::runtime::ImageOps;
use crate::types::ImageRef;

use super::deadline::RunDeadline;
use super::desired::{DesiredSource, DesiredState, WorkSet};
use super::error::{HostQuerySnafu, Phase, RemoteValidationSnafu, SyncError, TransferError};
use super::outcome::{RunOutcome, TransferResult, TransferStatus};
use super::state::{Built, Filtered, Transferred, Validated};

/// Facts about the run that every phase carries forward unchanged.
#[derive(Debug, Clone, Copy)]
struct RunContext {
    source: DesiredSource,
    deadline: RunDeadline,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// A reconciliation run in progress, parameterized by its current phase.
///
/// Transfers are only reachable from a validated run:
///
/// ```compile_fail
/// use sinker::runtime::ImageOps;
/// use sinker::sync::{Built, Reconciliation};
///
/// async fn skip_validation<R: ImageOps>(run: Reconciliation<Built>, runtime: &R) {
///     run.transfer(runtime).await;
/// }
/// ```
#[derive(Debug)]
pub struct Reconciliation<S> {
    context: RunContext,
    state: S,
}

impl<S> Reconciliation<S> {
    /// Where the desired state came from.
    pub fn source(&self) -> DesiredSource {
        self.context.source
    }
}

// =============================================================================
// Built -> Filtered
// =============================================================================

impl Reconciliation<Built> {
    /// Start a run. The deadline clock is already running.
    pub fn new(desired: DesiredState, deadline: RunDeadline) -> Self {
        Reconciliation {
            context: RunContext {
                source: desired.source(),
                deadline,
                started_at: Utc::now(),
                started: Instant::now(),
            },
            state: Built { desired },
        }
    }

    pub fn desired(&self) -> &DesiredState {
        &self.state.desired
    }

    /// Drop every image the local runtime already has.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::HostQuery` if any existence check fails, and
    /// `SyncError::DeadlineExceeded` if the budget runs out.
    #[must_use = "reconciliation state must be used"]
    pub async fn filter<R: ImageOps>(
        self,
        runtime: &R,
    ) -> Result<Reconciliation<Filtered>, SyncError> {
        let Reconciliation { context, state } = self;

        if state.desired.is_empty() {
            tracing::info!("No images to reconcile from {}", context.source);
        } else {
            tracing::info!(
                "Finding images that need to be pulled from {} ...",
                context.source
            );
        }

        let mut work = BTreeMap::new();
        let mut present = Vec::new();

        for (image, auth) in state.desired.into_entries() {
            let exists = context
                .deadline
                .guard(Phase::Filter, runtime.image_exists(&image))
                .await?
                .context(HostQuerySnafu {
                    image: image.clone(),
                })?;

            if exists {
                tracing::debug!(image = %image, "already present locally");
                present.push(image);
            } else {
                tracing::debug!(image = %image, "missing locally");
                work.insert(image, auth);
            }
        }

        tracing::info!(
            missing = work.len(),
            present = present.len(),
            "local existence check complete"
        );

        Ok(Reconciliation {
            context,
            state: Filtered {
                work: WorkSet::from_entries(work),
                present,
            },
        })
    }
}

// =============================================================================
// Filtered -> Validated
// =============================================================================

impl Reconciliation<Filtered> {
    pub fn work_set(&self) -> &WorkSet {
        &self.state.work
    }

    pub fn present(&self) -> &[ImageRef] {
        &self.state.present
    }

    /// Check every work-set image against its registry, with its credential, before any transfer.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RemoteValidation` for the first image the registry
    /// does not serve to its credential; no transfer is attempted for any image.
    #[must_use = "reconciliation state must be used"]
    pub async fn validate<R: ImageOps>(
        self,
        runtime: &R,
    ) -> Result<Reconciliation<Validated>, SyncError> {
        let Reconciliation { context, state } = self;

        for (image, auth) in state.work.iter() {
            let remote = context
                .deadline
                .guard(Phase::Validate, runtime.inspect_remote(image, auth))
                .await?
                .context(RemoteValidationSnafu {
                    image: image.clone(),
                })?;
            tracing::debug!(
                image = %image,
                digest = remote.digest.as_deref().unwrap_or("unknown"),
                platforms = remote.platforms.len(),
                "remote image validated"
            );
        }

        Ok(Reconciliation {
            context,
            state: Validated {
                work: state.work,
                present: state.present,
            },
        })
    }
}

// =============================================================================
// Validated -> Transferred
// =============================================================================

impl Reconciliation<Validated> {
    pub fn work_set(&self) -> &WorkSet {
        &self.state.work
    }

    /// Pull every work-set image. A failed pull is recorded and the run
    /// moves on to the next image.
    ///
    /// # Errors
    ///
    /// Only `SyncError::DeadlineExceeded`; per-image failures are soft.
    #[must_use = "reconciliation state must be used"]
    pub async fn transfer<R: ImageOps>(
        self,
        runtime: &R,
    ) -> Result<Reconciliation<Transferred>, SyncError> {
        let Reconciliation { context, state } = self;
        let mut transfers = Vec::with_capacity(state.work.len());

        for (image, auth) in state.work.iter() {
            tracing::info!("Pulling {}", image);

            let status = match context
                .deadline
                .guard(Phase::Transfer, runtime.pull_image(image, auth))
                .await?
            {
                Ok(()) => TransferStatus::Pulled,
                Err(source) => {
                    let err = TransferError {
                        image: image.clone(),
                        source,
                    };
                    tracing::error!("{}", err);
                    TransferStatus::Failed {
                        error: err.source.to_string(),
                    }
                }
            };

            transfers.push(TransferResult {
                image: image.clone(),
                status,
            });
        }

        Ok(Reconciliation {
            context,
            state: Transferred {
                present: state.present,
                transfers,
            },
        })
    }
}

// =============================================================================
// Transferred -> Reported
// =============================================================================

impl Reconciliation<Transferred> {
    pub fn transfers(&self) -> &[TransferResult] {
        &self.state.transfers
    }

    /// Close the run and hand back its outcome.
    pub fn finish(self) -> RunOutcome {
        let elapsed = self.context.started.elapsed();
        let outcome = RunOutcome {
            source: self.context.source,
            started_at: self.context.started_at,
            elapsed: Duration::from_millis(elapsed.as_millis() as u64),
            present: self.state.present,
            transfers: self.state.transfers,
        };
        tracing::info!(
            pulled = outcome.success_count(),
            failed = outcome.failure_count(),
            present = outcome.present.len(),
            "reconciliation finished"
        );
        outcome
    }
}
