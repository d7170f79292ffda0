use serde_json::Value;

use crate::models::Payload;

const TEXT_KEYS: [&str; 7] = [
    "transcript",
    "content",
    "text",
    "input",
    "summary",
    "corrected_text",
    "response_body",
];

/// The primary text of a payload, whatever shape the upstream step left it in.
///
/// Checks the well-known text keys in order, then `email.body`, and finally
/// joins every top-level string value with newlines.
pub fn extract_text_content(payload: &Payload) -> String {
    for key in TEXT_KEYS {
        if let Some(text) = str_field(payload, key) {
            return text.to_string();
        }
    }

    if let Some(body) = payload
        .get("email")
        .and_then(|e| e.get("body"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
    {
        return body.to_string();
    }

    payload
        .values()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A non-blank string field.
pub fn str_field<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// String items of an array field, skipping anything else.
pub fn string_list(payload: &Payload, key: &str) -> Vec<String> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_key_priority() {
        let p = payload(json!({ "summary": "s", "content": "c", "transcript": "  " }));
        assert_eq!(extract_text_content(&p), "c");

        let p = payload(json!({ "email": { "body": "hello" }, "status": 1 }));
        assert_eq!(extract_text_content(&p), "hello");
    }

    #[test]
    fn test_joins_remaining_strings() {
        let p = payload(json!({ "error": "boom", "agent_id": 3, "note": "later" }));
        assert_eq!(extract_text_content(&p), "boom\nlater");
        assert_eq!(extract_text_content(&Payload::new()), "");
    }

    #[test]
    fn test_string_list_skips_non_strings() {
        let p = payload(json!({ "participants": ["Ann", 3, null, "Bo"] }));
        assert_eq!(string_list(&p, "participants"), vec!["Ann", "Bo"]);
        assert!(string_list(&p, "missing").is_empty());
    }
}
