//! JSON and Markdown extraction from model replies.
//!
//! Models wrap structured output in Markdown fences or surround it with
//! prose. Extraction tries, in order: the whole reply, each fenced block, and
//! finally every `{` as the start of a JSON value, letting `serde_json`'s
//! streaming deserializer find where the object ends.

use serde_json::{Deserializer, Map, Value};

/// Find the first JSON object in a model reply.
pub fn extract_json_object(reply: &str) -> Option<Map<String, Value>> {
    let trimmed = reply.trim();

    if let Some(object) = parse_object(trimmed) {
        return Some(object);
    }

    for block in fenced_blocks(trimmed) {
        if let Some(object) = parse_object(block.trim()) {
            return Some(object);
        }
    }

    trimmed
        .match_indices('{')
        .find_map(|(idx, _)| leading_object(&trimmed[idx..]))
}

/// Strip a single Markdown fence that wraps an entire reply.
///
/// Replies that merely contain fenced blocks are returned unchanged.
pub fn strip_outer_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    let Some((info, inner)) = body.split_once('\n') else {
        return trimmed;
    };

    let info = info.trim();
    let is_markdown_fence = info.is_empty() || info.eq_ignore_ascii_case("markdown") || info == "md";
    if is_markdown_fence && !inner.contains("\n```\n") {
        inner.trim()
    } else {
        trimmed
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parse a JSON object at the start of `text`, ignoring whatever follows it.
fn leading_object(text: &str) -> Option<Map<String, Value>> {
    let mut stream = Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(map))) => Some(map),
        _ => None,
    }
}

/// Bodies of ```-fenced blocks, without the info string line.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
        let body = &after_open[body_start..];
        let Some(close) = body.find("```") else {
            break;
        };
        blocks.push(&body[..close]);
        rest = &body[close + 3..];
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object() {
        let obj = extract_json_object(r#"{"summary": "ok"}"#).unwrap();
        assert_eq!(obj["summary"], "ok");
    }

    #[test]
    fn test_fenced_object() {
        let reply = "Here is the analysis:\n```json\n{\"summary\": \"fenced\"}\n```\nThanks!";
        assert_eq!(extract_json_object(reply).unwrap()["summary"], "fenced");
    }

    #[test]
    fn test_object_in_prose_with_braces_in_strings() {
        let reply = r#"Sure. {"summary": "use { and } carefully", "n": 1} Hope that helps {"#;
        let obj = extract_json_object(reply).unwrap();
        assert_eq!(obj["summary"], "use { and } carefully");
    }

    #[test]
    fn test_document_with_inner_fences_is_parsed_whole() {
        let reply = "{\"summary\": \"s\", \"document\": \"```rust\\nfn main() {}\\n```\"}";
        let obj = extract_json_object(reply).unwrap();
        assert_eq!(obj["document"], "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_arrays_are_not_objects() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("no json here").is_none());
    }

    #[test]
    fn test_strip_outer_fence() {
        assert_eq!(strip_outer_fence("```markdown\n# Home\n\nHi\n```"), "# Home\n\nHi");
        assert_eq!(strip_outer_fence("# Home\n```sh\nls\n```"), "# Home\n```sh\nls\n```");
        assert_eq!(strip_outer_fence("```rust\nfn x() {}\n```"), "```rust\nfn x() {}\n```");
    }
}
