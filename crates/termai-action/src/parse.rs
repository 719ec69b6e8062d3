//! Parsing of a backend response into an ordered action list.

use crate::error::ResponseError;
use crate::types::Action;

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse the backend's stdout into actions, preserving order.
///
/// Blank output is [`ResponseError::Empty`]; anything that is not a JSON
/// array is [`ResponseError::Malformed`]. An empty array is a valid,
/// empty plan.
pub fn parse_action_list(text: &str) -> Result<Vec<Action>, ResponseError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ResponseError::Empty);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ResponseError::Malformed(e.to_string()))?;

    match value {
        serde_json::Value::Array(items) => Ok(items.into_iter().map(Action::from_value).collect()),
        other => Err(ResponseError::Malformed(format!(
            "expected a JSON array of actions, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fence("  [2]  "), "[2]");
    }

    #[test]
    fn test_parse_preserves_order() {
        let text = r#"[
            {"type": "text", "content": "first"},
            {"type": "command", "command": "echo second"},
            {"type": "text", "content": "third"}
        ]"#;
        let actions = parse_action_list(text).unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(
            actions[0],
            Action::Text {
                content: "first".to_string()
            }
        );
        assert!(matches!(actions[1], Action::Command { .. }));
        assert_eq!(
            actions[2],
            Action::Text {
                content: "third".to_string()
            }
        );
    }

    #[test]
    fn test_parse_empty_array_is_valid() {
        assert!(parse_action_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_fenced_response() {
        let actions = parse_action_list("```json\n[{\"type\":\"text\",\"content\":\"ok\"}]\n```")
            .unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_parse_blank_is_empty_error() {
        assert!(matches!(parse_action_list(""), Err(ResponseError::Empty)));
        assert!(matches!(
            parse_action_list("  \n"),
            Err(ResponseError::Empty)
        ));
    }

    #[test]
    fn test_parse_non_array_is_malformed() {
        let err = parse_action_list(r#"{"type":"text"}"#).unwrap_err();
        match err {
            ResponseError::Malformed(msg) => assert!(msg.contains("an object")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            parse_action_list("Sure! Here is what I would do"),
            Err(ResponseError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_bad_elements_become_unknown() {
        let actions = parse_action_list(r#"[1, {"type":"nope"}, {"type":"text"}]"#).unwrap();
        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], Action::Unknown { .. }));
        assert!(matches!(actions[1], Action::Unknown { .. }));
        assert!(matches!(actions[2], Action::Text { .. }));
    }
}
