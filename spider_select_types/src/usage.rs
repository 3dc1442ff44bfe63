//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Token usage of one or more model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens used.
    pub prompt_tokens: u32,
    /// Completion tokens used.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Create new usage stats.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Accumulate usage from another instance.
    pub fn accumulate(&mut self, other: &Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self
            .completion_tokens
            .saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }

    /// Check if any tokens were used.
    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self.accumulate(&other);
        self
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.accumulate(&other);
    }
}

/// One labelled entry of a [`UsageLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    /// Step label, e.g. "find search box".
    pub label: String,
    /// Model that served the step.
    pub model: String,
    /// Tokens spent.
    pub usage: TokenUsage,
}

/// Per-run ledger of token spend, owned by the caller driving the steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLedger {
    entries: Vec<UsageEntry>,
    total: TokenUsage,
}

impl UsageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step.
    pub fn record(&mut self, label: impl Into<String>, model: impl Into<String>, usage: TokenUsage) {
        self.total.accumulate(&usage);
        self.entries.push(UsageEntry {
            label: label.into(),
            model: model.into(),
            usage,
        });
    }

    /// Recorded entries, oldest first.
    pub fn entries(&self) -> &[UsageEntry] {
        &self.entries
    }

    /// Summed usage.
    pub fn total(&self) -> TokenUsage {
        self.total
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mean total tokens per step.
    pub fn average_per_step(&self) -> f64 {
        if self.entries.is_empty() {
            0.0
        } else {
            self.total.total_tokens as f64 / self.entries.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulate() {
        let mut usage = TokenUsage::new(100, 20);
        usage += TokenUsage::new(50, 5);
        assert_eq!(usage, TokenUsage::new(150, 25));
        assert_eq!(usage.total_tokens, 175);
        assert!(!usage.is_empty());
        assert!(TokenUsage::default().is_empty());
    }

    #[test]
    fn test_ledger() {
        let mut ledger = UsageLedger::new();
        assert_eq!(ledger.average_per_step(), 0.0);

        ledger.record("find search box", "qwen2.5-3b", TokenUsage::new(300, 40));
        ledger.record("click first result", "qwen2.5-3b", TokenUsage::new(900, 60));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total().total_tokens, 1300);
        assert_eq!(ledger.average_per_step(), 650.0);
        assert_eq!(ledger.entries()[1].label, "click first result");
    }
}
