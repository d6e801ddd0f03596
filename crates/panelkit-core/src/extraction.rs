//! Best-effort parsing of user story sentences
//!
//! Accepted templates (keywords case-insensitive, slots may be wrapped in `[ ]`):
//!
//! - `As a|an <Role>, I want to <action> a|an|the|all <object>`
//! - `As a|an <Role>, I can <action> a|an|the|all <object>`
//!
//! Anything else yields empty fields. Results are suggestions for the user to
//! confirm; nothing here writes model data.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static STORY_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*as\s+an?\s+\[?(?P<role>[^,\]]+?)\]?\s*,\s*i\s+(?:want\s+to|can)\s+\[?(?P<action>[a-z][a-z-]*)\]?\s+(?:(?:a|an|the|all)\s+)+\[?(?P<object>[^\]\.]+?)\]?\s*\.?\s*$",
    )
    .expect("valid regex")
});

/// Role, action and object pulled out of a story sentence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryParts {
    pub role: String,
    pub action: String,
    pub object: String,
}

impl StoryParts {
    pub fn is_empty(&self) -> bool {
        self.role.is_empty() && self.action.is_empty() && self.object.is_empty()
    }
}

pub fn extract_story_parts(text: &str) -> StoryParts {
    let Some(caps) = STORY_TEMPLATE.captures(text) else {
        return StoryParts::default();
    };
    let field = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };
    StoryParts {
        role: field("role"),
        action: field("action").to_lowercase(),
        object: field("object"),
    }
}

/// `{Object}{Action}` page name, e.g. `CustomerAdd`
///
/// Empty when either part is missing.
pub fn suggest_page_name(parts: &StoryParts) -> String {
    if parts.object.is_empty() || parts.action.is_empty() {
        return String::new();
    }
    format!(
        "{}{}",
        to_pascal_case(&parts.object),
        to_pascal_case(&parts.action)
    )
}

/// Upper-case first letter, then only ASCII letters and digits
pub fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// `order line item` / `order-line_item` -> `OrderLineItem`
pub fn to_pascal_case(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
