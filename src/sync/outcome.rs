// ABOUTME: Structured result of a reconciliation run.
// ABOUTME: Lists per-image transfer results and images skipped as already present.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::desired::DesiredSource;
use crate::types::ImageRef;

/// Result of one image's transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TransferStatus {
    Pulled,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub image: ImageRef,
    #[serde(flatten)]
    pub status: TransferStatus,
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        self.status == TransferStatus::Pulled
    }
}

/// Everything a run did, for reporting. Fatal errors never produce one.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    #[serde(skip)]
    pub source: DesiredSource,
    pub started_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Images already present locally; never validated or transferred.
    pub present: Vec<ImageRef>,
    /// One entry per work-set image, in transfer order.
    pub transfers: Vec<TransferResult>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> impl Iterator<Item = &TransferResult> {
        self.transfers.iter().filter(|t| t.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TransferResult> {
        self.transfers.iter().filter(|t| !t.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Nothing needed transferring.
    pub fn is_noop(&self) -> bool {
        self.transfers.is_empty()
    }

    /// One-line summary for the final report.
    pub fn summary(&self) -> String {
        if self.is_noop() {
            return format!(
                "All images are already present ({} skipped)",
                self.present.len()
            );
        }
        if self.has_failures() {
            format!(
                "Pulled {} of {} image(s); {} failed, {} already present",
                self.success_count(),
                self.transfers.len(),
                self.failure_count(),
                self.present.len()
            )
        } else {
            format!(
                "All images have been pulled! ({} pulled, {} already present)",
                self.success_count(),
                self.present.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(image: &str, status: TransferStatus) -> TransferResult {
        TransferResult {
            image: ImageRef::parse(image).unwrap(),
            status,
        }
    }

    fn outcome(transfers: Vec<TransferResult>) -> RunOutcome {
        RunOutcome {
            source: DesiredSource::ImageList,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
            present: vec![ImageRef::parse("quay.io/org/present:v1").unwrap()],
            transfers,
        }
    }

    #[test]
    fn counts_successes_and_failures() {
        let outcome = outcome(vec![
            result("quay.io/org/a:v1", TransferStatus::Pulled),
            result(
                "quay.io/org/b:v1",
                TransferStatus::Failed {
                    error: "boom".to_string(),
                },
            ),
            result("quay.io/org/c:v1", TransferStatus::Pulled),
        ]);
        assert_eq!(outcome.success_count(), 2);
        assert_eq!(outcome.failure_count(), 1);
        assert!(outcome.summary().contains("1 failed"));
    }

    #[test]
    fn empty_outcome_is_noop() {
        let outcome = outcome(vec![]);
        assert!(outcome.is_noop());
        assert!(!outcome.has_failures());
        assert!(outcome.summary().contains("already present"));
    }

    #[test]
    fn serializes_flat_status() {
        let outcome = outcome(vec![result(
            "quay.io/org/b:v1",
            TransferStatus::Failed {
                error: "denied".to_string(),
            },
        )]);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["transfers"][0]["image"], "quay.io/org/b:v1");
        assert_eq!(json["transfers"][0]["status"], "failed");
        assert_eq!(json["transfers"][0]["error"], "denied");
        assert_eq!(json["elapsed"], "1s 500ms");
        assert_eq!(json["present"][0], "quay.io/org/present:v1");
    }
}
