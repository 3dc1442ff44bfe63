//! # Spider Select
//!
//! Semantic element selection for small-context language models.
//!
//! A page snapshot can hold thousands of elements. A small model can reason
//! about a few dozen. This crate narrows a snapshot to a handful of compact
//! candidates, asks the model to pick one, parses the unreliable reply and
//! validates the pick against the original snapshot before anything acts on it.
//!
//! ## Pipeline
//!
//! - **Task filter**: exact role membership per task type
//! - **Visibility filter**: in viewport, not occluded, non-zero area
//! - **Text exclusions**: case-insensitive substring patterns
//! - **Ranking**: stable top-K by importance
//! - **Compression**: truncated text, integer geometry
//! - **Prompt**: one line per candidate plus numbered rules and a JSON schema
//! - **Parsing**: whole reply, fenced block, then first balanced object
//! - **Validation**: the id must be a shown candidate present in the snapshot
//! - **Retries**: widen K or relax filters, never resend an unchanged prompt
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spider_select::{ElementSelector, SelectorConfig, TaskSpec};
//! use std::sync::Arc;
//!
//! let selector = ElementSelector::new(Arc::new(my_model), SelectorConfig::default())?;
//!
//! let task = TaskSpec::find_link("first result about Japan travel")
//!     .with_exclusions(["Ad", "Sponsored"]);
//!
//! match selector.select(&snapshot, &task).await.into_result() {
//!     Ok(selection) => browser.click(selection.element.center()).await?,
//!     Err(failure) => log::warn!("no element: {:?}", failure.last_attempt()),
//! }
//! ```

#![warn(missing_docs)]

mod compress;
mod config;
mod controller;
mod error;
mod filter;
mod llm;
mod prompt;
mod rank;
mod selector;
mod snapshot;
mod validate;

pub mod parse;

pub use compress::{prepare_candidates, AttemptParams, CandidateSet};
pub use config::{EscalationPolicy, RoleRules, SelectorConfig};
pub use controller::{ControllerState, Escalation, RetryController};
pub use error::{SelectError, SelectResult};
pub use filter::{is_visible, ExclusionMatcher, TaskFilter};
pub use llm::{CompletionOptions, CompletionResponse, Message, ModelProvider};
pub use parse::{DecisionExtractor, ParserOptions};
pub use prompt::{
    estimate_tokens, format_element, PromptBuilder, SystemPrompt, COMPACT_SYSTEM_PROMPT,
    DEFAULT_SYSTEM_PROMPT, JSON_SYSTEM_PROMPT,
};
pub use rank::{top_k, RankStrategy};
pub use selector::ElementSelector;
pub use snapshot::{SnapshotProvider, StaticSnapshot};
pub use validate::validate_decision;

pub use spider_select_types::{
    truncate_chars, AttemptDiagnostic, BoundingBox, CompactBox, CompressedElement,
    ElementSnapshot, FailureReason, FilterStats, MatchQuality, ParsedDecision, RawElement,
    Relaxation, Role, Selection, SelectionFailure, SelectionResult, TaskSpec, TaskType,
    TokenUsage, UsageEntry, UsageLedger, Viewport,
};
