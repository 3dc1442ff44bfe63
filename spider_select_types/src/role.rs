//! Element roles.
//!
//! A role is a closed-vocabulary tag describing how an element is interacted
//! with. Roles are compared as enum values, so `list` and `listitem` (or `li`
//! and `link`) can never match each other by accident.

use std::fmt;

/// Interaction role of a page element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Hyperlink.
    Link,
    /// Push button.
    Button,
    /// Single or multi line text input.
    Textbox,
    /// Text input dedicated to search.
    Searchbox,
    /// Editable or selectable drop-down.
    Combobox,
    /// Checkbox.
    Checkbox,
    /// Radio button.
    Radio,
    /// On/off switch.
    Switch,
    /// Option inside a listbox or select.
    ListOption,
    /// Container list.
    List,
    /// Item of a list.
    ListItem,
    /// Section heading.
    Heading,
    /// Tab in a tablist.
    Tab,
    /// Menu entry.
    MenuItem,
    /// Image.
    Image,
    /// Navigation landmark.
    Navigation,
    /// Any role outside the known vocabulary, stored lowercased.
    Other(String),
}

impl Role {
    /// Parse a role string using exact (case-insensitive) matching.
    ///
    /// Returns `None` for an empty or whitespace-only string.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();

        let role = match normalized.as_str() {
            "" => return None,
            "link" => Role::Link,
            "button" => Role::Button,
            "textbox" => Role::Textbox,
            "searchbox" => Role::Searchbox,
            "combobox" => Role::Combobox,
            "checkbox" => Role::Checkbox,
            "radio" => Role::Radio,
            "switch" => Role::Switch,
            "option" => Role::ListOption,
            "list" => Role::List,
            "listitem" | "list-item" => Role::ListItem,
            "heading" => Role::Heading,
            "tab" => Role::Tab,
            "menuitem" => Role::MenuItem,
            "img" | "image" => Role::Image,
            "navigation" => Role::Navigation,
            _ => Role::Other(normalized),
        };

        Some(role)
    }

    /// Map an HTML tag name to its implicit role.
    ///
    /// Only tags with an unambiguous implicit role are mapped.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let role = match tag.trim().to_ascii_lowercase().as_str() {
            "a" => Role::Link,
            "button" => Role::Button,
            "input" | "textarea" => Role::Textbox,
            "select" => Role::Combobox,
            "option" => Role::ListOption,
            "li" => Role::ListItem,
            "ul" | "ol" => Role::List,
            "img" => Role::Image,
            "nav" => Role::Navigation,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Role::Heading,
            _ => return None,
        };

        Some(role)
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Link => "link",
            Role::Button => "button",
            Role::Textbox => "textbox",
            Role::Searchbox => "searchbox",
            Role::Combobox => "combobox",
            Role::Checkbox => "checkbox",
            Role::Radio => "radio",
            Role::Switch => "switch",
            Role::ListOption => "option",
            Role::List => "list",
            Role::ListItem => "listitem",
            Role::Heading => "heading",
            Role::Tab => "tab",
            Role::MenuItem => "menuitem",
            Role::Image => "image",
            Role::Navigation => "navigation",
            Role::Other(s) => s.as_str(),
        }
    }

    /// Whether the role accepts typed text.
    pub fn is_text_entry(&self) -> bool {
        matches!(self, Role::Textbox | Role::Searchbox | Role::Combobox)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::parse(&raw).unwrap_or(Role::Other(String::new()))
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}
