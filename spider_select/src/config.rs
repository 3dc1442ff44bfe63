//! Configuration types for spider_select.
//!
//! Every knob of the pipeline is an explicit value here. Nothing is read from
//! globals or the environment.

use crate::error::{SelectError, SelectResult};
use crate::llm::CompletionOptions;
use crate::parse::ParserOptions;
use crate::prompt::SystemPrompt;
use crate::rank::RankStrategy;
use serde::{Deserialize, Serialize};
use spider_select_types::{Role, TaskSpec, TaskType};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Role overrides for one task type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleRules {
    /// Roles to accept. Empty means the task type's own role set.
    pub include: Vec<Role>,
    /// Roles to reject even when included.
    pub exclude: Vec<Role>,
}

impl RoleRules {
    /// Create empty rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted roles.
    pub fn with_include<I: IntoIterator<Item = Role>>(mut self, roles: I) -> Self {
        self.include = roles.into_iter().collect();
        self
    }

    /// Add rejected roles.
    pub fn with_exclude<I: IntoIterator<Item = Role>>(mut self, roles: I) -> Self {
        self.exclude.extend(roles);
        self
    }

    /// Resolve against a task type into accept and reject sets.
    pub fn resolve(&self, task_type: TaskType) -> (BTreeSet<Role>, BTreeSet<Role>) {
        let include = if self.include.is_empty() {
            task_type.roles().iter().cloned().collect()
        } else {
            self.include.iter().cloned().collect()
        };
        let exclude = self.exclude.iter().cloned().collect();
        (include, exclude)
    }
}

/// How the retry controller widens the search after a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Candidates added per widening.
    pub k_step: usize,
    /// Upper bound on the candidate count.
    pub k_cap: usize,
    /// Whether filters may be relaxed once widening stops helping.
    pub relax_filters: bool,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            k_step: 5,
            k_cap: 100,
            relax_filters: true,
        }
    }
}

impl EscalationPolicy {
    /// Create a new policy.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// No retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            k_step: 0,
            k_cap: 100,
            relax_filters: false,
        }
    }

    /// Set the widening step.
    pub fn with_k_step(mut self, step: usize) -> Self {
        self.k_step = step;
        self
    }

    /// Set the candidate cap.
    pub fn with_k_cap(mut self, cap: usize) -> Self {
        self.k_cap = cap;
        self
    }

    /// Enable or disable filter relaxation.
    pub fn with_relax_filters(mut self, relax: bool) -> Self {
        self.relax_filters = relax;
        self
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Candidate count per task type, overriding the task type default.
    pub candidate_limits: BTreeMap<TaskType, usize>,
    /// Role overrides per task type.
    pub role_rules: BTreeMap<TaskType, RoleRules>,
    /// Classify role-less elements by their tag.
    pub infer_role_from_tag: bool,
    /// Exclusion patterns applied to every task, on top of the task's own.
    pub exclude_patterns: Vec<String>,
    /// Characters of element text kept per candidate.
    pub text_budget: usize,
    /// Candidate ordering.
    pub ranking: RankStrategy,
    /// Response parsing options.
    pub parser: ParserOptions,
    /// System prompt variant.
    pub system_prompt: SystemPrompt,
    /// Generation parameters.
    pub completion: CompletionOptions,
    /// Time budget per model call.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Retry and widening policy.
    pub escalation: EscalationPolicy,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            candidate_limits: BTreeMap::new(),
            role_rules: BTreeMap::new(),
            infer_role_from_tag: false,
            exclude_patterns: Vec::new(),
            text_budget: 100,
            ranking: RankStrategy::Importance,
            parser: ParserOptions::default(),
            system_prompt: SystemPrompt::Compact,
            completion: CompletionOptions::default(),
            timeout: Duration::from_secs(30),
            escalation: EscalationPolicy::default(),
        }
    }
}

impl SelectorConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the candidate count for a task type.
    pub fn with_candidate_limit(mut self, task_type: TaskType, k: usize) -> Self {
        self.candidate_limits.insert(task_type, k);
        self
    }

    /// Set role overrides for a task type.
    pub fn with_role_rules(mut self, task_type: TaskType, rules: RoleRules) -> Self {
        self.role_rules.insert(task_type, rules);
        self
    }

    /// Enable or disable tag-based role inference.
    pub fn with_infer_role_from_tag(mut self, enabled: bool) -> Self {
        self.infer_role_from_tag = enabled;
        self
    }

    /// Add global exclusion patterns.
    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Set the text budget.
    pub fn with_text_budget(mut self, chars: usize) -> Self {
        self.text_budget = chars;
        self
    }

    /// Set the ranking strategy.
    pub fn with_ranking(mut self, ranking: RankStrategy) -> Self {
        self.ranking = ranking;
        self
    }

    /// Set parser options.
    pub fn with_parser(mut self, parser: ParserOptions) -> Self {
        self.parser = parser;
        self
    }

    /// Set the system prompt variant.
    pub fn with_system_prompt(mut self, variant: SystemPrompt) -> Self {
        self.system_prompt = variant;
        self
    }

    /// Set generation parameters.
    pub fn with_completion(mut self, completion: CompletionOptions) -> Self {
        self.completion = completion;
        self
    }

    /// Set the model call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the escalation policy.
    pub fn with_escalation(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }

    /// Configured candidate count for a task type.
    pub fn candidate_limit(&self, task_type: TaskType) -> usize {
        self.candidate_limits
            .get(&task_type)
            .copied()
            .unwrap_or_else(|| task_type.default_candidates())
    }

    /// Candidate count for the first attempt of a task.
    pub fn initial_k(&self, task: &TaskSpec) -> usize {
        task.max_candidates
            .unwrap_or_else(|| self.candidate_limit(task.task_type))
            .max(1)
    }

    /// Accept and reject role sets for a task type.
    pub fn roles_for(&self, task_type: TaskType) -> (BTreeSet<Role>, BTreeSet<Role>) {
        self.role_rules
            .get(&task_type)
            .cloned()
            .unwrap_or_default()
            .resolve(task_type)
    }

    /// Exclusion patterns for a task: global ones followed by the task's own.
    pub fn exclusions_for(&self, task: &TaskSpec) -> Vec<String> {
        self.exclude_patterns
            .iter()
            .chain(task.exclude_patterns.iter())
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> SelectResult<()> {
        if self.text_budget == 0 {
            return Err(SelectError::Config("text_budget must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(SelectError::Config("timeout must be positive".into()));
        }
        if self.escalation.k_cap == 0 {
            return Err(SelectError::Config("k_cap must be positive".into()));
        }
        for (task_type, k) in &self.candidate_limits {
            if *k == 0 {
                return Err(SelectError::Config(format!(
                    "candidate limit for {} must be positive",
                    task_type
                )));
            }
            if *k > self.escalation.k_cap {
                return Err(SelectError::Config(format!(
                    "candidate limit for {} ({}) exceeds k_cap ({})",
                    task_type, k, self.escalation.k_cap
                )));
            }
        }
        for task_type in TaskType::ALL {
            let (include, exclude) = self.roles_for(task_type);
            if include.difference(&exclude).next().is_none() {
                return Err(SelectError::Config(format!(
                    "role rules for {} reject every role",
                    task_type
                )));
            }
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
