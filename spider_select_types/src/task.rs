//! Task descriptions for a single selection step.

use crate::Role;

const INPUT_ROLES: &[Role] = &[Role::Textbox, Role::Searchbox, Role::Combobox];
const BUTTON_ROLES: &[Role] = &[Role::Button];
const LINK_ROLES: &[Role] = &[Role::Link];
const LIST_ROLES: &[Role] = &[Role::Link, Role::Button, Role::ListOption, Role::ListItem];
const TOGGLE_ROLES: &[Role] = &[Role::Checkbox, Role::Radio, Role::Switch];

/// Kind of element a step is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// A field the user can type into.
    FindInput,
    /// A button to press.
    FindButton,
    /// A link to follow.
    FindLink,
    /// One entry among many structurally similar entries.
    SelectFromList,
    /// A checkbox, radio button or switch.
    FindToggle,
}

impl TaskType {
    /// All task types.
    pub const ALL: [TaskType; 5] = [
        TaskType::FindInput,
        TaskType::FindButton,
        TaskType::FindLink,
        TaskType::SelectFromList,
        TaskType::FindToggle,
    ];

    /// Roles an element must have to be a candidate for this task.
    pub fn roles(&self) -> &'static [Role] {
        match self {
            TaskType::FindInput => INPUT_ROLES,
            TaskType::FindButton => BUTTON_ROLES,
            TaskType::FindLink => LINK_ROLES,
            TaskType::SelectFromList => LIST_ROLES,
            TaskType::FindToggle => TOGGLE_ROLES,
        }
    }

    /// Default candidate count.
    ///
    /// Single-field lookups stay small; result lists need room for many
    /// similar entries.
    pub fn default_candidates(&self) -> usize {
        match self {
            TaskType::FindInput => 15,
            TaskType::FindButton | TaskType::FindToggle => 20,
            TaskType::FindLink | TaskType::SelectFromList => 50,
        }
    }

    /// Canonical tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::FindInput => "find_input",
            TaskType::FindButton => "find_button",
            TaskType::FindLink => "find_link",
            TaskType::SelectFromList => "select_from_list",
            TaskType::FindToggle => "find_toggle",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to select in one automation step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskSpec {
    /// Kind of element wanted.
    pub task_type: TaskType,
    /// Free-text description of the target, e.g. "Sign in button".
    #[serde(default)]
    pub context: String,
    /// Case-insensitive substrings that disqualify an element's text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_patterns: Vec<String>,
    /// 1-based position among matching elements ("first", "second", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
    /// Overrides the configured candidate count for this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<usize>,
}

impl TaskSpec {
    /// Create a task with context.
    pub fn new(task_type: TaskType, context: impl Into<String>) -> Self {
        Self {
            task_type,
            context: context.into(),
            exclude_patterns: Vec::new(),
            ordinal: None,
            max_candidates: None,
        }
    }

    /// Find an input field.
    pub fn find_input(context: impl Into<String>) -> Self {
        Self::new(TaskType::FindInput, context)
    }

    /// Find a button.
    pub fn find_button(context: impl Into<String>) -> Self {
        Self::new(TaskType::FindButton, context)
    }

    /// Find a link.
    pub fn find_link(context: impl Into<String>) -> Self {
        Self::new(TaskType::FindLink, context)
    }

    /// Select an entry from a list.
    pub fn select_from_list(context: impl Into<String>) -> Self {
        Self::new(TaskType::SelectFromList, context)
    }

    /// Add exclusion patterns.
    pub fn with_exclusions<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Select the n-th match (1-based).
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal.max(1));
        self
    }

    /// Override the candidate count.
    pub fn with_max_candidates(mut self, k: usize) -> Self {
        self.max_candidates = Some(k);
        self
    }
}
