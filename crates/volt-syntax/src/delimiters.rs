//! Region markers recognized by the lexer.

use serde::{Deserialize, Serialize};

/// Opening and closing markers for the three template regions.
///
/// The defaults are the usual `{{ }}`, `{% %}` and `{# #}`. Custom markers
/// must be non-empty and the three opening markers must be distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    pub print_open: String,
    pub print_close: String,
    pub tag_open: String,
    pub tag_close: String,
    pub comment_open: String,
    pub comment_close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            print_open: "{{".to_string(),
            print_close: "}}".to_string(),
            tag_open: "{%".to_string(),
            tag_close: "%}".to_string(),
            comment_open: "{#".to_string(),
            comment_close: "#}".to_string(),
        }
    }
}

impl Delimiters {
    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> Option<String> {
        let all = [
            ("print_open", &self.print_open),
            ("print_close", &self.print_close),
            ("tag_open", &self.tag_open),
            ("tag_close", &self.tag_close),
            ("comment_open", &self.comment_open),
            ("comment_close", &self.comment_close),
        ];
        if let Some((name, _)) = all.iter().find(|(_, v)| v.is_empty()) {
            return Some(format!("delimiter '{}' must not be empty", name));
        }
        if self.print_open == self.tag_open
            || self.print_open == self.comment_open
            || self.tag_open == self.comment_open
        {
            return Some("opening delimiters must be distinct".to_string());
        }
        None
    }
}
