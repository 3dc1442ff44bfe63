//! Candidate ordering and top-K truncation.

use serde::{Deserialize, Serialize};
use spider_select_types::RawElement;
use std::cmp::Ordering;

/// How candidates are ordered before truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankStrategy {
    /// Highest importance first.
    #[default]
    Importance,
    /// Top of the page first, then left to right.
    Position,
}

impl RankStrategy {
    /// Compare two elements under this strategy.
    pub fn compare(&self, a: &RawElement, b: &RawElement) -> Ordering {
        match self {
            RankStrategy::Importance => descending_nan_last(a.importance, b.importance),
            RankStrategy::Position => ascending_nan_last(a.bbox.y, b.bbox.y)
                .then_with(|| ascending_nan_last(a.bbox.x, b.bbox.x)),
        }
    }
}

/// Sort `items` by `strategy` and keep the first `k`.
///
/// The sort is stable so ties keep their snapshot order.
pub fn top_k<T, F>(mut items: Vec<T>, k: usize, strategy: RankStrategy, element: F) -> Vec<T>
where
    F: Fn(&T) -> &RawElement,
{
    items.sort_by(|a, b| strategy.compare(element(a), element(b)));
    items.truncate(k);
    items
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn ascending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
