//! Lenient parsing of free-form model replies.
//!
//! Models wrap JSON in prose or code fences often enough that every
//! structured reply goes through the same ladder: strip fences, cut the
//! outermost bracket span, parse, then fall back to a line heuristic.

use serde_json::Value;

/// Remove a surrounding ```` ```lang ```` fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Parse the outermost `[...]` span of a reply as a JSON array.
pub fn parse_json_array(text: &str) -> Option<Vec<Value>> {
    let text = strip_code_fences(text);
    let candidate = match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// A list of names from a reply: a JSON array of strings when the model
/// complied, otherwise one entry per meaningful line.
pub fn parse_string_list(text: &str) -> Vec<String> {
    if let Some(items) = parse_json_array(text) {
        return items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect();
    }

    let mut names: Vec<String> = Vec::new();
    for line in text.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let name = if line.contains(':') {
            line.split(':').next().unwrap_or_default().trim()
        } else if line.contains('-') {
            line.split('-').next().unwrap_or_default().trim()
        } else if !(line.starts_with("1.") || line.starts_with("2.") || line.starts_with('•')) {
            line
        } else {
            continue;
        };
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// An integer reply clamped to `[min, max]`. Only a bare integer counts.
pub fn parse_bounded_int(text: &str, min: i64, max: i64) -> Option<i64> {
    strip_code_fences(text)
        .parse::<i64>()
        .ok()
        .map(|n| n.clamp(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_parse_json_array_inside_prose() {
        let items = parse_json_array("Sure! Here you go: [\"a\", \"b\"] Hope it helps.").unwrap();
        assert_eq!(items, vec![json!("a"), json!("b")]);
        assert!(parse_json_array("no list here").is_none());
        assert!(parse_json_array("{\"a\": 1}").is_none());
    }

    #[test]
    fn test_parse_string_list_line_fallback() {
        assert_eq!(parse_string_list("```json\n[\"John\", \"Jane\"]\n```"), vec!["John", "Jane"]);

        let names = parse_string_list("John: host\nJane - notes\n1. skip me\n• bullet\nBob\nJohn");
        assert_eq!(names, vec!["John", "Jane", "Bob"]);
    }

    #[test]
    fn test_parse_bounded_int() {
        assert_eq!(parse_bounded_int(" 45 ", 1, 180), Some(45));
        assert_eq!(parse_bounded_int("500", 1, 180), Some(180));
        assert_eq!(parse_bounded_int("0", 1, 180), Some(1));
        assert_eq!(parse_bounded_int("about 30 minutes", 1, 180), None);
    }
}
