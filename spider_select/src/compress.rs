//! Candidate preparation: filter, rank and compress one snapshot.

use crate::config::SelectorConfig;
use crate::filter::{is_visible, ExclusionMatcher, TaskFilter};
use crate::rank::top_k;
use spider_select_types::{
    CompressedElement, ElementSnapshot, FilterStats, Relaxation, TaskSpec,
};

/// Search parameters for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptParams {
    /// Candidate count.
    pub k: usize,
    /// Filter relaxation level.
    pub relaxation: Relaxation,
}

impl AttemptParams {
    /// Strict parameters with the given candidate count.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            relaxation: Relaxation::Strict,
        }
    }
}

/// Candidates shown to the model in one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    /// Compressed candidates in ranked order.
    pub elements: Vec<CompressedElement>,
    /// Per-stage counts.
    pub stats: FilterStats,
}

impl CandidateSet {
    /// Whether no candidate survived.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether `id` is one of the candidates.
    pub fn contains(&self, id: u64) -> bool {
        self.elements.iter().any(|e| e.id == id)
    }
}

/// Run the task, visibility and text filters, rank, truncate to K and compress.
pub fn prepare_candidates(
    snapshot: &ElementSnapshot,
    task: &TaskSpec,
    config: &SelectorConfig,
    params: AttemptParams,
) -> CandidateSet {
    let (include, exclude) = config.roles_for(task.task_type);
    let task_filter =
        TaskFilter::new(include, exclude).with_infer_role_from_tag(config.infer_role_from_tag);

    let matcher = if params.relaxation.applies_text_exclusions() {
        ExclusionMatcher::new(config.exclusions_for(task))
    } else {
        ExclusionMatcher::empty()
    };

    let by_task = task_filter.apply(&snapshot.elements);
    let after_task = by_task.len();

    let visible: Vec<_> = by_task
        .into_iter()
        .filter(|(el, _)| is_visible(el, params.relaxation))
        .collect();
    let after_visibility = visible.len();

    let allowed: Vec<_> = visible
        .into_iter()
        .filter(|(el, _)| !matcher.is_excluded(&el.text))
        .collect();
    let after_text = allowed.len();

    let ranked = top_k(allowed, params.k, config.ranking, |(el, _)| *el);

    let elements: Vec<CompressedElement> = ranked
        .into_iter()
        .map(|(el, role)| CompressedElement::from_raw(el, role, config.text_budget))
        .collect();

    let stats = FilterStats {
        original: snapshot.len(),
        after_task,
        after_visibility,
        after_text,
        candidates: elements.len(),
    };

    log::debug!(
        "{} candidates: {} -> task {} -> visible {} -> text {} -> ranked {} ({:.1}% reduction, k={}, {:?})",
        task.task_type,
        stats.original,
        stats.after_task,
        stats.after_visibility,
        stats.after_text,
        stats.candidates,
        stats.reduction_percent(),
        params.k,
        params.relaxation,
    );

    CandidateSet { elements, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spider_select_types::{RawElement, Role, Viewport};

    fn snapshot(elements: Vec<RawElement>) -> ElementSnapshot {
        ElementSnapshot::new("https://example.com", Viewport::new(1280, 800), elements)
    }

    #[test]
    fn test_stage_counts() {
        let snap = snapshot(vec![
            RawElement::new(1, Role::Link, "Official guide").with_importance(0.8),
            RawElement::new(2, Role::Link, "Sponsored · Buy now").with_importance(0.9),
            RawElement::new(3, Role::Link, "Below fold")
                .with_in_viewport(false)
                .with_bbox(0.0, 1500.0, 100.0, 20.0),
            RawElement::new(4, Role::Button, "Search"),
        ]);
        let task = TaskSpec::find_link("guide").with_exclusions(["sponsored"]);
        let set = prepare_candidates(&snap, &task, &SelectorConfig::default(), AttemptParams::new(50));

        assert_eq!(
            set.stats,
            FilterStats {
                original: 4,
                after_task: 3,
                after_visibility: 2,
                after_text: 1,
                candidates: 1,
            }
        );
        assert!(set.contains(1));
        assert!(!set.contains(2));
    }

    #[test]
    fn test_relaxation_widens_the_pool() {
        let snap = snapshot(vec![
            RawElement::new(1, Role::Link, "Ad: cheap flights"),
            RawElement::new(2, Role::Link, "Later")
                .with_in_viewport(false)
                .with_bbox(0.0, 1200.0, 80.0, 20.0),
        ]);
        let task = TaskSpec::find_link("flights").with_exclusions(["ad:"]);
        let config = SelectorConfig::default();

        let strict = prepare_candidates(&snap, &task, &config, AttemptParams::new(10));
        assert!(strict.is_empty());

        let offscreen = prepare_candidates(
            &snap,
            &task,
            &config,
            AttemptParams {
                k: 10,
                relaxation: Relaxation::AllowOffscreen,
            },
        );
        assert_eq!(offscreen.len(), 1);

        let open = prepare_candidates(
            &snap,
            &task,
            &config,
            AttemptParams {
                k: 10,
                relaxation: Relaxation::DropTextExclusions,
            },
        );
        assert_eq!(open.len(), 2);
    }

    #[test]
    fn test_text_is_truncated_to_budget() {
        let snap = snapshot(vec![RawElement::new(1, Role::Button, "é".repeat(300))]);
        let config = SelectorConfig::default().with_text_budget(40);
        let set = prepare_candidates(&snap, &TaskSpec::find_button("x"), &config, AttemptParams::new(5));
        assert_eq!(set.elements[0].text.chars().count(), 40);
    }
}
