//! Decision validation against ground truth.

use crate::compress::CandidateSet;
use spider_select_types::{ElementSnapshot, FailureReason, ParsedDecision, RawElement};

/// Resolve a decision to the original element.
///
/// The id must be one of the candidates shown to the model and must exist in
/// the unfiltered snapshot. The returned element carries exact geometry.
pub fn validate_decision<'a>(
    decision: &ParsedDecision,
    candidates: &CandidateSet,
    snapshot: &'a ElementSnapshot,
) -> Result<&'a RawElement, FailureReason> {
    if !candidates.contains(decision.id) {
        return Err(FailureReason::InvalidIdentifier(decision.id));
    }
    snapshot
        .get(decision.id)
        .ok_or(FailureReason::InvalidIdentifier(decision.id))
}
