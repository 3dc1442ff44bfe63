//! # Spider Select Types
//!
//! Pure data types for semantic element selection: roles, snapshots, tasks,
//! compressed candidates, decisions and selection results.
//!
//! Only depends on `serde` and `serde_json` so snapshot producers and action
//! executors can share these types without pulling in the pipeline.

#![warn(missing_docs)]

mod decision;
mod element;
mod result;
mod role;
mod task;
mod usage;

pub use decision::{truncate_chars, CompactBox, CompressedElement, MatchQuality, ParsedDecision};
pub use element::{BoundingBox, ElementSnapshot, RawElement, Viewport};
pub use result::{
    AttemptDiagnostic, FailureReason, FilterStats, Relaxation, Selection, SelectionFailure,
    SelectionResult,
};
pub use role::Role;
pub use task::{TaskSpec, TaskType};
pub use usage::{TokenUsage, UsageEntry, UsageLedger};
