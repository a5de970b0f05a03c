// ABOUTME: Reconciliation state types for the type state pattern.
// ABOUTME: Each state carries the data produced by the phase that reached it.

use crate::types::ImageRef;

use super::desired::{DesiredState, WorkSet};
use super::outcome::TransferResult;

/// Desired state built, nothing queried yet.
/// Available actions: `filter()`
#[derive(Debug)]
pub struct Built {
    pub(crate) desired: DesiredState,
}

/// Local existence known; present images dropped.
/// Available actions: `validate()`
#[derive(Debug)]
pub struct Filtered {
    pub(crate) work: WorkSet,
    pub(crate) present: Vec<ImageRef>,
}

/// Every work-set image confirmed reachable with its credential.
/// Available actions: `transfer()`
#[derive(Debug)]
pub struct Validated {
    pub(crate) work: WorkSet,
    pub(crate) present: Vec<ImageRef>,
}

/// Transfers attempted for the whole work set.
/// Available actions: `finish()`
#[derive(Debug)]
pub struct Transferred {
    pub(crate) present: Vec<ImageRef>,
    pub(crate) transfers: Vec<TransferResult>,
}
