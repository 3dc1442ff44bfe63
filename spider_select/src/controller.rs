//! Retry and escalation state machine.
//!
//! ```text
//! Attempt(0) --success--> Success
//! Attempt(n) --failure, n < max_retries, escalated--> Attempt(n + 1)
//! Attempt(n) --failure, n == max_retries or nothing to escalate--> Exhausted
//! ```

use crate::compress::AttemptParams;
use crate::config::EscalationPolicy;
use spider_select_types::{FailureReason, FilterStats};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Attempt number `n`, starting at zero.
    Attempt(usize),
    /// A decision was validated.
    Success,
    /// The retry budget or the escalation ladder ran out.
    Exhausted,
}

impl ControllerState {
    /// Whether no further attempt will run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ControllerState::Attempt(_))
    }
}

/// How the search space changed between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// K was raised.
    Widen {
        /// Previous K.
        from: usize,
        /// New K.
        to: usize,
    },
    /// Filters were relaxed one level.
    Relax,
}

/// Drives attempts for one selection.
#[derive(Debug, Clone)]
pub struct RetryController {
    state: ControllerState,
    params: AttemptParams,
    policy: EscalationPolicy,
    k_cap: usize,
}

impl RetryController {
    /// Start at `Attempt(0)` with the given parameters.
    ///
    /// An initial K above the policy cap raises the cap to that K.
    pub fn new(initial: AttemptParams, policy: EscalationPolicy) -> Self {
        let k_cap = policy.k_cap.max(initial.k);
        Self {
            state: ControllerState::Attempt(0),
            params: initial,
            policy,
            k_cap,
        }
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Parameters for the current attempt.
    pub fn params(&self) -> AttemptParams {
        self.params
    }

    /// Current attempt number, if not terminal.
    pub fn attempt(&self) -> Option<usize> {
        match self.state {
            ControllerState::Attempt(n) => Some(n),
            _ => None,
        }
    }

    /// Record a validated decision.
    pub fn on_success(&mut self) {
        if let ControllerState::Attempt(_) = self.state {
            self.state = ControllerState::Success;
        }
    }

    /// Record a failed attempt and move to the next state.
    ///
    /// `stats` are the filter counts of the failed attempt. K is only widened
    /// when more elements survived the filters than were shown.
    pub fn on_failure(&mut self, reason: &FailureReason, stats: &FilterStats) -> ControllerState {
        let n = match self.state {
            ControllerState::Attempt(n) => n,
            terminal => return terminal,
        };

        if !reason.is_recoverable() || n >= self.policy.max_retries {
            self.state = ControllerState::Exhausted;
            return self.state;
        }

        let escalation = if matches!(reason, FailureReason::EmptyCandidateSet) {
            self.try_relax().or_else(|| self.try_widen(stats))
        } else {
            self.try_widen(stats).or_else(|| self.try_relax())
        };

        self.state = match escalation {
            Some(escalation) => {
                log::debug!(
                    "attempt {} failed ({}), escalating: {:?}",
                    n,
                    reason,
                    escalation
                );
                ControllerState::Attempt(n + 1)
            }
            None => {
                log::debug!("attempt {} failed ({}), nothing left to escalate", n, reason);
                ControllerState::Exhausted
            }
        };
        self.state
    }

    fn try_widen(&mut self, stats: &FilterStats) -> Option<Escalation> {
        let from = self.params.k;
        if stats.after_text <= from {
            return None;
        }
        let to = from.saturating_add(self.policy.k_step).min(self.k_cap);
        if to <= from {
            return None;
        }
        self.params.k = to;
        Some(Escalation::Widen { from, to })
    }

    fn try_relax(&mut self) -> Option<Escalation> {
        if !self.policy.relax_filters {
            return None;
        }
        self.params.relaxation = self.params.relaxation.next()?;
        Some(Escalation::Relax)
    }
}
