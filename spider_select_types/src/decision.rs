//! Compressed candidates and parsed model decisions.

use crate::{RawElement, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Integer bounding box used in prompts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactBox {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width.
    pub w: i64,
    /// Height.
    pub h: i64,
}

/// Minimal fixed-shape record of a candidate, sized for a small model's context.
///
/// Lossy: never use it to act on the page, look the id up in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedElement {
    /// Identifier of the source element.
    pub id: u64,
    /// Role shown to the model.
    pub role: Role,
    /// Text truncated to the character budget.
    pub text: String,
    /// Rounded geometry.
    pub bbox: CompactBox,
    /// Accepts pointer interaction.
    pub clickable: bool,
    /// Visible at capture time.
    pub visible: bool,
    /// Importance in hundredths (0.95 is stored as 95).
    pub score_hundredths: i64,
}

impl CompressedElement {
    /// Compress an element, truncating its text to `text_budget` characters.
    ///
    /// `role` is the role the element was classified with.
    pub fn from_raw(element: &RawElement, role: Role, text_budget: usize) -> Self {
        Self {
            id: element.id,
            role,
            text: truncate_chars(&element.text, text_budget).to_string(),
            bbox: CompactBox {
                x: round_to_i64(element.bbox.x),
                y: round_to_i64(element.bbox.y),
                w: round_to_i64(element.bbox.width),
                h: round_to_i64(element.bbox.height),
            },
            clickable: element.is_clickable,
            visible: element.in_viewport && !element.is_occluded,
            score_hundredths: round_to_i64(element.importance * 100.0),
        }
    }

    /// Score rounded to two decimals.
    pub fn score(&self) -> f64 {
        self.score_hundredths as f64 / 100.0
    }
}

/// Cut `s` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn round_to_i64(v: f64) -> i64 {
    if v.is_finite() {
        v.round() as i64
    } else {
        0
    }
}

/// How closely the chosen element matches the requested text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    /// Text matches exactly.
    Exact,
    /// Text matches partially.
    Partial,
}

/// Structured decision recovered from a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDecision {
    /// Chosen candidate identifier.
    pub id: u64,
    /// Model's stated reasoning.
    #[serde(default)]
    pub reasoning: String,
    /// Match quality for list selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_quality: Option<MatchQuality>,
    /// Self-reported confidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Any other fields the model emitted.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ParsedDecision {
    /// Create a decision.
    pub fn new(id: u64, reasoning: impl Into<String>) -> Self {
        Self {
            id,
            reasoning: reasoning.into(),
            match_quality: None,
            confidence: None,
            extra: Map::new(),
        }
    }
}
