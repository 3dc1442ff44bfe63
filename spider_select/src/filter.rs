//! Candidate filters: task roles, visibility and text exclusions.
//!
//! Each filter only drops elements. Relative order is always preserved.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use spider_select_types::{RawElement, Relaxation, Role};
use std::collections::BTreeSet;

/// Keeps elements whose role is an exact member of the accepted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    include: BTreeSet<Role>,
    exclude: BTreeSet<Role>,
    infer_from_tag: bool,
}

impl TaskFilter {
    /// Create a filter from accept and reject sets.
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = Role>,
        E: IntoIterator<Item = Role>,
    {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
            infer_from_tag: false,
        }
    }

    /// Classify role-less elements by their tag.
    pub fn with_infer_role_from_tag(mut self, enabled: bool) -> Self {
        self.infer_from_tag = enabled;
        self
    }

    /// The accepted roles.
    pub fn include(&self) -> &BTreeSet<Role> {
        &self.include
    }

    /// Accepted role of an element, if any.
    pub fn accepted_role(&self, element: &RawElement) -> Option<Role> {
        let role = element.effective_role(self.infer_from_tag)?;
        if self.include.contains(&role) && !self.exclude.contains(&role) {
            Some(role)
        } else {
            None
        }
    }

    /// Filter elements, pairing each survivor with its accepted role.
    pub fn apply<'a, I>(&self, elements: I) -> Vec<(&'a RawElement, Role)>
    where
        I: IntoIterator<Item = &'a RawElement>,
    {
        elements
            .into_iter()
            .filter_map(|el| self.accepted_role(el).map(|role| (el, role)))
            .collect()
    }
}

/// Whether an element can be acted on at the given relaxation level.
///
/// Strictly, the element must be in the viewport. Relaxed, an element at
/// non-negative page coordinates is accepted since it can be scrolled into
/// view. Occluded and zero-area elements never pass.
pub fn is_visible(element: &RawElement, relaxation: Relaxation) -> bool {
    if element.is_occluded || !element.bbox.has_area() {
        return false;
    }
    element.in_viewport
        || (relaxation.allows_offscreen() && element.bbox.x >= 0.0 && element.bbox.y >= 0.0)
}

/// Case-insensitive substring matcher over exclusion patterns.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    inner: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Empty,
    Automaton(AhoCorasick),
    Scan(Vec<String>),
}

impl ExclusionMatcher {
    /// Build a matcher. Blank patterns are ignored.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.trim().is_empty())
            .collect();

        let inner = if patterns.is_empty() {
            Matcher::Empty
        } else {
            match AhoCorasickBuilder::new()
                .match_kind(MatchKind::LeftmostFirst)
                .build(&patterns)
            {
                Ok(ac) => Matcher::Automaton(ac),
                Err(e) => {
                    log::warn!("exclusion automaton unavailable, scanning instead: {}", e);
                    Matcher::Scan(patterns)
                }
            }
        };

        Self { inner }
    }

    /// Matcher that excludes nothing.
    pub fn empty() -> Self {
        Self {
            inner: Matcher::Empty,
        }
    }

    /// Whether no pattern is active.
    pub fn is_empty(&self) -> bool {
        matches!(self.inner, Matcher::Empty)
    }

    /// Whether `text` contains any pattern, ignoring case.
    pub fn is_excluded(&self, text: &str) -> bool {
        match &self.inner {
            Matcher::Empty => false,
            Matcher::Automaton(ac) => ac.is_match(&text.to_lowercase()),
            Matcher::Scan(patterns) => {
                let text = text.to_lowercase();
                patterns.iter().any(|p| text.contains(p.as_str()))
            }
        }
    }
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::empty()
    }
}
