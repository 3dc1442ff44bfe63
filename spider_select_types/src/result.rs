//! Selection outcomes and per-attempt diagnostics.

use crate::{ParsedDecision, RawElement, TokenUsage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far the filters have been loosened.
///
/// Ordered: each level includes the loosening of the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relaxation {
    /// All filters applied.
    #[default]
    Strict,
    /// Elements outside the viewport that can be scrolled into view are kept.
    AllowOffscreen,
    /// Off-screen elements are kept and text exclusions are skipped.
    DropTextExclusions,
}

impl Relaxation {
    /// The next looser level, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Relaxation::Strict => Some(Relaxation::AllowOffscreen),
            Relaxation::AllowOffscreen => Some(Relaxation::DropTextExclusions),
            Relaxation::DropTextExclusions => None,
        }
    }

    /// Whether off-screen elements are kept.
    pub fn allows_offscreen(self) -> bool {
        self >= Relaxation::AllowOffscreen
    }

    /// Whether text exclusions are applied.
    pub fn applies_text_exclusions(self) -> bool {
        self < Relaxation::DropTextExclusions
    }
}

/// Element counts after each filter stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Elements in the snapshot.
    pub original: usize,
    /// After the task filter.
    pub after_task: usize,
    /// After the visibility filter.
    pub after_visibility: usize,
    /// After the text exclusion filter.
    pub after_text: usize,
    /// Candidates kept by the ranker.
    pub candidates: usize,
}

impl FilterStats {
    /// Percentage of snapshot elements removed before prompting.
    pub fn reduction_percent(&self) -> f64 {
        if self.original == 0 {
            0.0
        } else {
            (1.0 - self.candidates as f64 / self.original as f64) * 100.0
        }
    }
}

/// Why a selection attempt did not produce an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The filters removed every element.
    EmptyCandidateSet,
    /// No structured decision could be extracted from the response.
    ParseFailure,
    /// The decision named an element that is not a current candidate.
    InvalidIdentifier(u64),
    /// The model call exceeded its time budget.
    Timeout,
    /// The model provider returned an error.
    ModelError(String),
    /// The retry budget was spent without success.
    Exhausted,
}

impl FailureReason {
    /// Whether the retry controller may try again after this failure.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FailureReason::Exhausted)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCandidateSet => write!(f, "no candidates left after filtering"),
            Self::ParseFailure => write!(f, "no decision found in model response"),
            Self::InvalidIdentifier(id) => write!(f, "element {} is not a candidate", id),
            Self::Timeout => write!(f, "model call timed out"),
            Self::ModelError(msg) => write!(f, "model error: {}", msg),
            Self::Exhausted => write!(f, "retry budget exhausted"),
        }
    }
}

/// Record of one attempt, kept for operator debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptDiagnostic {
    /// Attempt number, starting at 0.
    pub attempt: usize,
    /// Candidate limit used.
    pub k: usize,
    /// Filter relaxation used.
    pub relaxation: Relaxation,
    /// Filter stage counts.
    pub stats: FilterStats,
    /// Outcome of the attempt.
    pub reason: FailureReason,
    /// Raw model response, when the model was called.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl AttemptDiagnostic {
    /// Number of candidates shown to the model.
    pub fn candidate_count(&self) -> usize {
        self.stats.candidates
    }
}

/// A validated selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// The element from the original snapshot, with exact geometry.
    pub element: RawElement,
    /// The decision that named it.
    pub decision: ParsedDecision,
    /// Attempt that succeeded, starting at 0.
    pub attempt: usize,
    /// Filter stage counts of the successful attempt.
    pub stats: FilterStats,
    /// Tokens spent across all attempts.
    pub usage: TokenUsage,
}

/// A failed selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionFailure {
    /// Final reason.
    pub reason: FailureReason,
    /// Every attempt made, oldest first.
    pub attempts: Vec<AttemptDiagnostic>,
    /// Tokens spent across all attempts.
    pub usage: TokenUsage,
}

impl SelectionFailure {
    /// Diagnostic of the last attempt.
    pub fn last_attempt(&self) -> Option<&AttemptDiagnostic> {
        self.attempts.last()
    }
}

/// Output of the selection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectionResult {
    /// An element was chosen and validated.
    Success(Selection),
    /// No element could be chosen.
    Failure(SelectionFailure),
}

impl SelectionResult {
    /// Whether an element was selected.
    pub fn is_success(&self) -> bool {
        matches!(self, SelectionResult::Success(_))
    }

    /// The selected element, if any.
    pub fn element(&self) -> Option<&RawElement> {
        match self {
            SelectionResult::Success(s) => Some(&s.element),
            SelectionResult::Failure(_) => None,
        }
    }

    /// The failure reason, if any.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            SelectionResult::Success(_) => None,
            SelectionResult::Failure(f) => Some(&f.reason),
        }
    }

    /// Tokens spent.
    pub fn usage(&self) -> &TokenUsage {
        match self {
            SelectionResult::Success(s) => &s.usage,
            SelectionResult::Failure(f) => &f.usage,
        }
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<Selection, SelectionFailure> {
        match self {
            SelectionResult::Success(s) => Ok(s),
            SelectionResult::Failure(f) => Err(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxation_order() {
        assert_eq!(Relaxation::Strict.next(), Some(Relaxation::AllowOffscreen));
        assert_eq!(
            Relaxation::AllowOffscreen.next(),
            Some(Relaxation::DropTextExclusions)
        );
        assert_eq!(Relaxation::DropTextExclusions.next(), None);

        assert!(!Relaxation::Strict.allows_offscreen());
        assert!(Relaxation::DropTextExclusions.allows_offscreen());
        assert!(Relaxation::AllowOffscreen.applies_text_exclusions());
        assert!(!Relaxation::DropTextExclusions.applies_text_exclusions());
    }

    #[test]
    fn test_reduction_percent() {
        let stats = FilterStats {
            original: 200,
            after_task: 40,
            after_visibility: 30,
            after_text: 25,
            candidates: 10,
        };
        assert_eq!(stats.reduction_percent(), 95.0);
        assert_eq!(FilterStats::default().reduction_percent(), 0.0);
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            FailureReason::InvalidIdentifier(7).to_string(),
            "element 7 is not a candidate"
        );
        assert!(FailureReason::Timeout.is_recoverable());
        assert!(!FailureReason::Exhausted.is_recoverable());
    }

    #[test]
    fn test_failure_serde_shape() {
        let json = serde_json::to_value(FailureReason::InvalidIdentifier(3)).unwrap();
        assert_eq!(json["kind"], "invalid_identifier");
        assert_eq!(json["detail"], 3);
    }
}
