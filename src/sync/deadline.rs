// ABOUTME: Run-wide deadline shared by every phase.
// ABOUTME: Wraps runtime calls so expiry surfaces as a fatal DeadlineExceeded.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use super::error::{Phase, SyncError};

/// A single budget for the whole run. There is no per-image timeout.
#[derive(Debug, Clone, Copy)]
pub struct RunDeadline {
    budget: Duration,
    expires_at: Instant,
}

impl RunDeadline {
    /// Start the clock now.
    pub fn start(budget: Duration) -> Self {
        Self {
            budget,
            expires_at: Instant::now() + budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Run `fut`, failing with `DeadlineExceeded` if the budget runs out first.
    pub async fn guard<F: Future>(&self, phase: Phase, fut: F) -> Result<F::Output, SyncError> {
        tokio::time::timeout_at(self.expires_at, fut)
            .await
            .map_err(|_| SyncError::DeadlineExceeded {
                phase,
                budget: self.budget,
            })
    }
}
