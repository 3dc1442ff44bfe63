//! The selection pipeline.

use crate::compress::{prepare_candidates, AttemptParams, CandidateSet};
use crate::config::SelectorConfig;
use crate::controller::{ControllerState, RetryController};
use crate::error::{SelectError, SelectResult};
use crate::llm::{CompletionResponse, Message, ModelProvider};
use crate::parse::DecisionExtractor;
use crate::prompt::{estimate_tokens, PromptBuilder};
use crate::snapshot::SnapshotProvider;
use crate::validate::validate_decision;
use spider_select_types::{
    AttemptDiagnostic, ElementSnapshot, FailureReason, ParsedDecision, RawElement, Selection,
    SelectionFailure, SelectionResult, TaskSpec, TokenUsage, UsageLedger,
};
use std::sync::Arc;

/// Picks exactly one element of a snapshot for a task.
///
/// Holds an injected model handle and a validated configuration. Each call
/// to [`select`](Self::select) is independent and strictly sequential.
/// Dropping its future abandons the in-flight model call and produces no
/// result.
///
/// # Example
///
/// ```rust,ignore
/// use spider_select::{ElementSelector, SelectorConfig, TaskSpec};
///
/// let selector = ElementSelector::new(model, SelectorConfig::default())?;
/// let result = selector
///     .select(&snapshot, &TaskSpec::find_input("search box"))
///     .await;
/// if let Some(element) = result.element() {
///     let (x, y) = element.center();
/// }
/// ```
#[derive(Clone)]
pub struct ElementSelector {
    model: Arc<dyn ModelProvider>,
    config: SelectorConfig,
    extractor: DecisionExtractor,
}

impl std::fmt::Debug for ElementSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementSelector")
            .field("model", &self.model.model_name())
            .field("config", &self.config)
            .finish()
    }
}

struct AttemptOutcome<'a> {
    result: Result<(&'a RawElement, ParsedDecision), FailureReason>,
    raw_response: Option<String>,
}

impl ElementSelector {
    /// Create a selector. Fails when the configuration is inconsistent.
    pub fn new(model: Arc<dyn ModelProvider>, config: SelectorConfig) -> SelectResult<Self> {
        config.validate()?;
        let extractor = DecisionExtractor::new(config.parser);
        Ok(Self {
            model,
            config,
            extractor,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// The injected model.
    pub fn model(&self) -> &Arc<dyn ModelProvider> {
        &self.model
    }

    /// Capture a snapshot from `provider` and select from it.
    ///
    /// Only a capture failure is returned as an error.
    pub async fn select_from(
        &self,
        provider: &dyn SnapshotProvider,
        task: &TaskSpec,
    ) -> SelectResult<SelectionResult> {
        let snapshot = provider.capture().await?;
        Ok(self.select(&snapshot, task).await)
    }

    /// Select and record the token usage in `ledger`, labelled by task type.
    pub async fn select_recorded(
        &self,
        snapshot: &ElementSnapshot,
        task: &TaskSpec,
        ledger: &mut UsageLedger,
    ) -> SelectionResult {
        let result = self.select(snapshot, task).await;
        ledger.record(task.task_type.as_str(), self.model.model_name(), *result.usage());
        result
    }

    /// Run the pipeline until a decision validates or the retry budget runs out.
    pub async fn select(&self, snapshot: &ElementSnapshot, task: &TaskSpec) -> SelectionResult {
        let initial = AttemptParams::new(self.config.initial_k(task));
        let mut controller = RetryController::new(initial, self.config.escalation.clone());
        let mut attempts: Vec<AttemptDiagnostic> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut last_prompt: Option<String> = None;

        log::debug!(
            "selecting for {} '{}' over {} elements from {}",
            task.task_type,
            task.context,
            snapshot.len(),
            snapshot.url
        );

        while let ControllerState::Attempt(n) = controller.state() {
            let params = controller.params();
            let candidates = prepare_candidates(snapshot, task, &self.config, params);

            let outcome = self
                .run_attempt(snapshot, task, params, &candidates, &mut last_prompt, &mut usage, &attempts)
                .await;

            match outcome.result {
                Ok((element, decision)) => {
                    controller.on_success();
                    log::info!(
                        "attempt {} selected element {} ({}) from {} candidates",
                        n,
                        element.id,
                        task.task_type,
                        candidates.len()
                    );
                    return SelectionResult::Success(Selection {
                        element: element.clone(),
                        decision,
                        attempt: n,
                        stats: candidates.stats,
                        usage,
                    });
                }
                Err(reason) => {
                    log::info!(
                        "attempt {} failed: {} (k={}, {:?}, {} candidates)",
                        n,
                        reason,
                        params.k,
                        params.relaxation,
                        candidates.len()
                    );
                    controller.on_failure(&reason, &candidates.stats);
                    attempts.push(AttemptDiagnostic {
                        attempt: n,
                        k: params.k,
                        relaxation: params.relaxation,
                        stats: candidates.stats,
                        reason,
                        raw_response: outcome.raw_response,
                    });
                }
            }
        }

        log::warn!(
            "selection exhausted for {} '{}' after {} attempts",
            task.task_type,
            task.context,
            attempts.len()
        );

        SelectionResult::Failure(SelectionFailure {
            reason: FailureReason::Exhausted,
            attempts,
            usage,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_attempt<'a>(
        &self,
        snapshot: &'a ElementSnapshot,
        task: &TaskSpec,
        params: AttemptParams,
        candidates: &CandidateSet,
        last_prompt: &mut Option<String>,
        usage: &mut TokenUsage,
        history: &[AttemptDiagnostic],
    ) -> AttemptOutcome<'a> {
        if candidates.is_empty() {
            return AttemptOutcome {
                result: Err(FailureReason::EmptyCandidateSet),
                raw_response: None,
            };
        }

        let (include, exclude) = self.config.roles_for(task.task_type);
        let exclusions = if params.relaxation.applies_text_exclusions() {
            self.config.exclusions_for(task)
        } else {
            Vec::new()
        };
        let prompt = PromptBuilder::new(task)
            .with_roles(include.difference(&exclude).cloned())
            .with_exclusions(exclusions)
            .build(&candidates.elements);

        // An identical call already failed; escalation did not change the prompt.
        if last_prompt.as_deref() == Some(prompt.as_str()) {
            if let Some(previous) = history.last() {
                log::debug!(
                    "prompt unchanged after escalation, skipping model call ({})",
                    previous.reason
                );
                return AttemptOutcome {
                    result: Err(previous.reason.clone()),
                    raw_response: None,
                };
            }
        }

        let system = self.config.system_prompt.text();
        let estimated = estimate_tokens(system) + estimate_tokens(&prompt);
        let window = self.model.context_window();
        if estimated * 10 >= window * 9 {
            log::warn!(
                "prompt of ~{} tokens is close to the {} token context window of {}",
                estimated,
                window,
                self.model.model_name()
            );
        }

        let messages = vec![Message::system(system), Message::user(prompt.as_str())];
        *last_prompt = Some(prompt);

        let response = match self.call_model(&messages).await {
            Ok(response) => response,
            Err(reason) => {
                return AttemptOutcome {
                    result: Err(reason),
                    raw_response: None,
                }
            }
        };
        usage.accumulate(&response.usage);

        let result = match self.extractor.extract(&response.content) {
            Some(decision) => validate_decision(&decision, candidates, snapshot)
                .map(|element| (element, decision)),
            None => {
                log::debug!(
                    "unparseable response from {}: {}",
                    self.model.model_name(),
                    preview(&response.content)
                );
                Err(FailureReason::ParseFailure)
            }
        };

        AttemptOutcome {
            result,
            raw_response: Some(response.content),
        }
    }

    async fn call_model(&self, messages: &[Message]) -> Result<CompletionResponse, FailureReason> {
        let call = self.model.complete(messages, &self.config.completion);
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(SelectError::Timeout)) | Err(_) => {
                log::warn!(
                    "{} did not answer within {:?}",
                    self.model.model_name(),
                    self.config.timeout
                );
                Err(FailureReason::Timeout)
            }
            Ok(Err(e)) => {
                log::warn!("{} failed: {}", self.model.model_name(), e);
                Err(FailureReason::ModelError(e.to_string()))
            }
        }
    }
}

fn preview(s: &str) -> &str {
    spider_select_types::truncate_chars(s, 200)
}
