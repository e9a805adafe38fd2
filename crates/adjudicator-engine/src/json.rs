//! Best-effort JSON extraction from free-text LLM replies

/// Remove a surrounding markdown code fence, if any
///
/// ```
/// use adjudicator_engine::json::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
/// ```
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (```json) up to the end of the first line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Find the first balanced `{...}` object in `text`
///
/// Braces inside JSON string literals are ignored. An object that never
/// closes is skipped in favour of the earliest object inside it that does.
/// Runs in a single pass.
pub fn first_json_object(text: &str) -> Option<&str> {
    let mut open: Vec<usize> = Vec::new();
    let mut found: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            // Quotes in prose outside any object are not strings
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(offset),
            '}' => {
                let Some(start) = open.pop() else { continue };
                if found.map_or(true, |(earliest, _)| start < earliest) {
                    found = Some((start, offset));
                }
                if open.is_empty() {
                    break;
                }
            }
            _ => {}
        }
    }

    found.map(|(start, end)| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_variants() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```JSON\n{\"x\": 1}\n```\n"), "{\"x\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"x\": 1}"), "{\"x\": 1}");
        assert_eq!(strip_code_fence("```json{\"x\": 1}```"), "{\"x\": 1}");
        assert_eq!(strip_code_fence("plain"), "plain");
    }

    #[test]
    fn test_first_object_in_prose() {
        let reply = "Sure! Here is the decision:\n{\"decision\": \"Rejected\"}\nLet me know.";
        assert_eq!(first_json_object(reply), Some("{\"decision\": \"Rejected\"}"));
    }

    #[test]
    fn test_nested_objects() {
        let reply = "x {\"a\": {\"b\": 1}} y {\"c\": 2}";
        assert_eq!(first_json_object(reply), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let reply = r#"{"justification": "see clause {4.2} and \"}\" marks"} trailing }"#;
        assert_eq!(
            first_json_object(reply),
            Some(r#"{"justification": "see clause {4.2} and \"}\" marks"}"#)
        );
    }

    #[test]
    fn test_unbalanced_prefix_skipped() {
        let reply = "{ unfinished ... {\"ok\": true}";
        assert_eq!(first_json_object(reply), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_unclosed_object_prefers_first_inner() {
        let reply = "{ note {\"a\": 1} then {\"b\": 2}";
        assert_eq!(first_json_object(reply), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_quotes_in_prose_before_object() {
        let reply = "The \"final\" answer: {\"decision\": \"Approved\"}";
        assert_eq!(first_json_object(reply), Some("{\"decision\": \"Approved\"}"));
    }

    #[test]
    fn test_many_unclosed_braces() {
        let reply = format!("{}{{\"ok\": true}}", "{".repeat(200_000));
        assert_eq!(first_json_object(&reply), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_no_object() {
        assert_eq!(first_json_object("The claim should be approved."), None);
        assert_eq!(first_json_object("} {"), None);
    }
}
