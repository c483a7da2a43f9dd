use serde_json::Value;

/// Default cut-off for tool output shown in the transcript
pub const DEFAULT_TRUNCATE: usize = 500;

/// Cut-off for partial tool output
pub const PARTIAL_TRUNCATE: usize = 200;

const ELLIPSIS: char = '…';

/// Cut `text` to at most `max` characters, appending `…` when anything was removed
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut truncated = String::with_capacity(cut + ELLIPSIS.len_utf8());
            truncated.push_str(&text[..cut]);
            truncated.push(ELLIPSIS);
            truncated
        }
    }
}

/// Format tool-call arguments for display.
///
/// Strings holding JSON are pretty-printed, other strings are shown verbatim,
/// objects are pretty-printed and everything else uses its plain JSON form.
pub fn format_tool_arguments(arguments: Option<&Value>) -> String {
    match arguments {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => pretty(&parsed).unwrap_or_else(|| text.clone()),
            Err(_) => text.clone(),
        },
        Some(value @ Value::Object(_)) => pretty(value).unwrap_or_else(|| value.to_string()),
        Some(other) => other.to_string(),
    }
}

fn pretty(value: &Value) -> Option<String> {
    serde_json::to_string_pretty(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("", 10), "");
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_cuts_on_characters() {
        assert_eq!(truncate("hello world", 5), "hello…");
        // Multi-byte characters count once each
        assert_eq!(truncate("ééééé", 2), "éé…");
        assert_eq!(truncate("abc", 0), "…");
    }

    #[test]
    fn test_truncate_is_idempotent_above_limit() {
        let long = "x".repeat(DEFAULT_TRUNCATE * 2);
        let once = truncate(&long, DEFAULT_TRUNCATE);
        assert_eq!(once.chars().count(), DEFAULT_TRUNCATE + 1);
        assert!(once.ends_with('…'));
        assert_eq!(truncate(&once, DEFAULT_TRUNCATE), once);
        assert_eq!(truncate(&once, DEFAULT_TRUNCATE + 1), once);
    }

    #[test]
    fn test_truncate_multibyte_is_idempotent() {
        let long = "é".repeat(501);
        let once = truncate(&long, 500);
        assert_eq!(once, format!("{}…", "é".repeat(500)));
        assert_eq!(truncate(&once, 500), once);
    }

    #[test]
    fn test_format_absent_arguments() {
        assert_eq!(format_tool_arguments(None), "");
        assert_eq!(format_tool_arguments(Some(&Value::Null)), "");
    }

    #[test]
    fn test_format_object_arguments() {
        let args = json!({"owner": "octocat", "repo": "hello-world"});
        let formatted = format_tool_arguments(Some(&args));
        assert!(formatted.contains('\n'));
        assert_eq!(serde_json::from_str::<Value>(&formatted).unwrap(), args);
    }

    #[test]
    fn test_format_json_string_arguments() {
        let args = Value::String(r#"{"query":"is:pr"}"#.to_string());
        let formatted = format_tool_arguments(Some(&args));
        assert_eq!(formatted, "{\n  \"query\": \"is:pr\"\n}");
    }

    #[test]
    fn test_format_plain_string_and_scalars() {
        let args = Value::String("not json {".to_string());
        assert_eq!(format_tool_arguments(Some(&args)), "not json {");
        assert_eq!(format_tool_arguments(Some(&json!(42))), "42");
        assert_eq!(format_tool_arguments(Some(&json!([1, 2]))), "[1,2]");
    }
}
