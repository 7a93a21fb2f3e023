//! Inline action directives embedded in markdown messages
//!
//! An agent can attach structured actions to a message with a fenced block:
//!
//! ````text
//! ```action
//! {"type": "vote", "option": "B"}
//! ```
//! ````

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static ACTION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```action[ \t]*\r?\n(.*?)```").expect("action block pattern is valid")
});

static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDirective {
    /// Value of the `type` field
    pub kind: String,
    /// Every other field of the JSON object
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedContent {
    /// Message text with recognised action blocks removed
    pub text: String,
    pub actions: Vec<ActionDirective>,
    /// Bodies of action blocks that could not be understood; they stay in `text`
    pub invalid: Vec<String>,
}

fn directive_from(body: &str) -> Option<ActionDirective> {
    let Value::Object(mut params) = serde_json::from_str::<Value>(body.trim()).ok()? else {
        return None;
    };
    let Value::String(kind) = params.remove("type")? else {
        return None;
    };
    Some(ActionDirective { kind, params })
}

/// Split message content into plain text and action directives (single pass)
pub fn parse_actions(content: &str) -> ParsedContent {
    let mut parsed = ParsedContent::default();
    let mut text = String::with_capacity(content.len());
    let mut last = 0;

    for caps in ACTION_BLOCK.captures_iter(content) {
        let (Some(block), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        match directive_from(body.as_str()) {
            Some(directive) => {
                text.push_str(&content[last..block.start()]);
                last = block.end();
                parsed.actions.push(directive);
            }
            None => parsed.invalid.push(body.as_str().trim().to_string()),
        }
    }
    text.push_str(&content[last..]);

    parsed.text = EXTRA_BLANK_LINES
        .replace_all(text.trim(), "\n\n")
        .into_owned();
    parsed
}
