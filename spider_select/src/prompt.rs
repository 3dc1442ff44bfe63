//! Prompt construction for small-context models.
//!
//! Output is a pure function of the inputs: identical task, roles, exclusions
//! and candidates always render byte-identical prompts.

use crate::llm::Message;
use serde::{Deserialize, Serialize};
use spider_select_types::{CompressedElement, Role, TaskSpec, TaskType};
use std::fmt::Write;

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a web automation assistant. Respond ONLY with valid JSON. No explanations.";

/// Shorter system prompt for tight context windows.
pub const COMPACT_SYSTEM_PROMPT: &str = "Web automation agent. Output JSON only.";

/// Minimal system prompt.
pub const JSON_SYSTEM_PROMPT: &str = "Output valid JSON only.";

/// System prompt variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemPrompt {
    /// [`DEFAULT_SYSTEM_PROMPT`].
    Default,
    /// [`COMPACT_SYSTEM_PROMPT`].
    #[default]
    Compact,
    /// [`JSON_SYSTEM_PROMPT`].
    Json,
}

impl SystemPrompt {
    /// Prompt text.
    pub fn text(&self) -> &'static str {
        match self {
            SystemPrompt::Default => DEFAULT_SYSTEM_PROMPT,
            SystemPrompt::Compact => COMPACT_SYSTEM_PROMPT,
            SystemPrompt::Json => JSON_SYSTEM_PROMPT,
        }
    }
}

/// Rough token estimate at four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Renders the user prompt for one attempt.
#[derive(Debug, Clone)]
pub struct PromptBuilder<'a> {
    task: &'a TaskSpec,
    roles: Vec<Role>,
    exclusions: Vec<String>,
}

impl<'a> PromptBuilder<'a> {
    /// Builder for a task with the task type's own roles and exclusions.
    pub fn new(task: &'a TaskSpec) -> Self {
        Self {
            task,
            roles: task.task_type.roles().to_vec(),
            exclusions: task
                .exclude_patterns
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Replace the roles named in the rules.
    pub fn with_roles<I: IntoIterator<Item = Role>>(mut self, roles: I) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    /// Replace the exclusion patterns named in the rules.
    pub fn with_exclusions(mut self, exclusions: Vec<String>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// System and user messages for the given candidates.
    pub fn messages(&self, variant: SystemPrompt, candidates: &[CompressedElement]) -> Vec<Message> {
        vec![
            Message::system(variant.text()),
            Message::user(self.build(candidates)),
        ]
    }

    /// Render the user prompt.
    pub fn build(&self, candidates: &[CompressedElement]) -> String {
        let mut out = String::with_capacity(256 + candidates.len() * 64);

        let _ = writeln!(out, "Task: {}", self.statement());
        out.push('\n');
        out.push_str("Elements (format: [id] role 'text' (x,y,wxh) score):\n");
        for el in candidates {
            out.push_str(&format_element(el));
            out.push('\n');
        }
        out.push('\n');

        out.push_str("Rules:\n");
        for (i, rule) in self.rules().iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, rule);
        }
        out.push('\n');

        for line in self.contrast() {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');

        out.push_str("Output ONLY this JSON (id must be a number from the list):\n");
        out.push_str(self.schema());
        out.push('\n');
        out.push_str("Example:\n");
        out.push_str(self.example());
        out.push_str("\n\nYour response:");
        out
    }

    fn context_or(&self, fallback: &'static str) -> String {
        let context = single_line(&self.task.context);
        if context.is_empty() {
            fallback.to_string()
        } else {
            context
        }
    }

    fn statement(&self) -> String {
        match self.task.task_type {
            TaskType::FindInput => format!(
                "Find the {} where users can TYPE text.",
                self.context_or("input field")
            ),
            TaskType::FindButton => format!("Find the \"{}\" button.", self.context_or("submit")),
            TaskType::FindLink => self.context_or("Select the first result link."),
            TaskType::SelectFromList => {
                format!("Select \"{}\" from the list.", self.context_or("first item"))
            }
            TaskType::FindToggle => format!(
                "Find the \"{}\" checkbox, radio button or switch.",
                self.context_or("option")
            ),
        }
    }

    fn rules(&self) -> Vec<String> {
        let mut rules = Vec::with_capacity(8);

        rules.push(format!("ONLY select elements with {}.", role_clause(&self.roles)));

        match self.task.task_type {
            TaskType::FindInput => {
                rules.push("The element MUST accept typed text. Do NOT select links or buttons.".into());
            }
            TaskType::FindButton => {
                rules.push(format!(
                    "Match the text \"{}\" (case-insensitive, partial OK). Prefer exact over partial.",
                    self.context_or("submit")
                ));
            }
            TaskType::FindLink => {
                rules.push("Do NOT select search boxes or input fields.".into());
                rules.push(
                    "Prefer descriptive result links over navigation links like \"Images\" or \"Sign in\"."
                        .into(),
                );
            }
            TaskType::SelectFromList => {
                rules.push(format!(
                    "Match the text \"{}\" (partial OK). Prefer exact over partial.",
                    self.context_or("first item")
                ));
                rules.push("Set match_quality to \"exact\" or \"partial\".".into());
            }
            TaskType::FindToggle => {
                rules.push(format!(
                    "Match the label \"{}\" (case-insensitive, partial OK).",
                    self.context_or("option")
                ));
            }
        }

        if !self.exclusions.is_empty() {
            let quoted: Vec<String> = self
                .exclusions
                .iter()
                .map(|p| format!("\"{}\"", single_line(p)))
                .collect();
            rules.push(format!(
                "AVOID elements whose text contains {}.",
                quoted.join(", ")
            ));
        }

        if let Some(n) = self.task.ordinal {
            rules.push(format!(
                "Select the {} matching element, counting from the top of the list.",
                ordinal_word(n)
            ));
        }

        rules.push("Prefer higher score when several elements match.".into());
        rules
    }

    /// Worked right and wrong picks for the task type.
    fn contrast(&self) -> &'static [&'static str] {
        match self.task.task_type {
            TaskType::FindInput => &[
                "GOOD: [5] searchbox 'Search' (the searchbox, not a link)",
                "BAD: [9] link 'Search settings' (a link, nothing can be typed into it)",
            ],
            TaskType::FindButton => &[
                "GOOD: [12] button 'Submit' (a button with the requested text)",
                "BAD: [14] link 'Submit feedback' (a link, not a button)",
            ],
            TaskType::FindLink => &[
                "GOOD: [10] link 'Japan Travel Guide - Official Tourism' (a search result)",
                "BAD #1: [15] link 'Search for Images' (navigation, not a result)",
                "BAD #2: [5] searchbox 'Search' (the search box, not a result link)",
            ],
            TaskType::SelectFromList => &[
                "GOOD: [8] listitem 'Kyoto' (an item of the list)",
                "BAD: [6] list 'Destinations' (the list itself, not an item)",
            ],
            TaskType::FindToggle => &[
                "GOOD: [3] checkbox 'Remember me' (a toggle with the requested label)",
                "BAD: [11] button 'Settings' (a button, not a toggle)",
            ],
        }
    }

    fn schema(&self) -> &'static str {
        match self.task.task_type {
            TaskType::SelectFromList => {
                r#"{"id": <element_id>, "match_quality": "<exact|partial>", "reasoning": "<why>"}"#
            }
            _ => r#"{"id": <element_id>, "reasoning": "<why>"}"#,
        }
    }

    fn example(&self) -> &'static str {
        match self.task.task_type {
            TaskType::FindInput => r#"{"id": 5, "reasoning": "Element 5 is a searchbox where users can type"}"#,
            TaskType::FindButton => r#"{"id": 12, "reasoning": "Element 12 is the button with matching text"}"#,
            TaskType::FindLink => r#"{"id": 10, "reasoning": "Element 10 is the first result link"}"#,
            TaskType::SelectFromList => {
                r#"{"id": 8, "match_quality": "exact", "reasoning": "Element 8 has the requested text"}"#
            }
            TaskType::FindToggle => r#"{"id": 3, "reasoning": "Element 3 is the checkbox with the matching label"}"#,
        }
    }
}

/// Render one candidate as `[id] role 'text' (x,y,wxh) score=0.95`.
pub fn format_element(el: &CompressedElement) -> String {
    format!(
        "[{}] {} '{}' ({},{},{}x{}) score={}",
        el.id,
        el.role,
        single_line(&el.text),
        el.bbox.x,
        el.bbox.y,
        el.bbox.w,
        el.bbox.h,
        format_hundredths(el.score_hundredths),
    )
}

fn format_hundredths(h: i64) -> String {
    let sign = if h < 0 { "-" } else { "" };
    let abs = h.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn role_clause(roles: &[Role]) -> String {
    let names: Vec<String> = roles.iter().map(|r| format!("role=\"{}\"", r)).collect();
    match names.len() {
        0 => "a listed role".to_string(),
        1 => names[0].clone(),
        n => format!("{} OR {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

fn ordinal_word(n: usize) -> String {
    const WORDS: [&str; 10] = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth",
    ];
    if (1..=WORDS.len()).contains(&n) {
        return WORDS[n - 1].to_string();
    }
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
