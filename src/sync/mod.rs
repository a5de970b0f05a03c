// ABOUTME: Image reconciliation engine using the type state pattern.
// ABOUTME: Filters, validates, then transfers missing images under one deadline.

mod deadline;
mod desired;
mod error;
mod outcome;
mod reconciliation;
mod state;

pub use deadline::RunDeadline;
pub use desired::{DesiredSource, DesiredState, WorkSet};
pub use error::{Phase, SyncError, SyncErrorKind, TransferError};
pub use outcome::{RunOutcome, TransferResult, TransferStatus};
pub use reconciliation::Reconciliation;
pub use state::{Built, Filtered, Transferred, Validated};

use crate::runtime::ImageOps;

/// Run every phase against `runtime` and report the outcome.
///
/// Fatal errors stop the run before the next phase starts. Transfer
/// failures are soft and show up in the returned outcome.
pub async fn reconcile<R: ImageOps>(
    desired: DesiredState,
    runtime: &R,
    deadline: RunDeadline,
) -> Result<RunOutcome, SyncError> {
    let outcome = Reconciliation::new(desired, deadline)
        .filter(runtime)
        .await?
        .validate(runtime)
        .await?
        .transfer(runtime)
        .await?
        .finish();
    Ok(outcome)
}
