//! Recovery of JSON payloads embedded in arbitrary script text.
//!
//! A naive `\{.+\}` regex breaks on nested objects and on braces inside
//! string literals, so the scanner tracks bracket depth and string state.

use serde_json::Value;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Str(char),
    Escaped(char),
    LineComment,
    BlockComment,
}

/// Returns every top-level `{...}` or `[...]` span in `text` whose brackets
/// balance. Quotes (`"` and `'`) open string literals; backslash escapes are
/// honoured inside them. `//` and `/* */` comments outside strings are
/// skipped. A mismatched closer discards the span in progress.
pub(crate) fn extract_json_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut start: Option<usize> = None;
    let mut mode = Mode::Code;
    let mut prev: Option<char> = None;

    for (idx, ch) in text.char_indices() {
        match mode {
            Mode::Escaped(quote) => {
                mode = Mode::Str(quote);
                continue;
            }
            Mode::Str(quote) => {
                if ch == '\\' {
                    mode = Mode::Escaped(quote);
                } else if ch == quote {
                    mode = Mode::Code;
                }
                continue;
            }
            Mode::LineComment => {
                if ch == '\n' {
                    mode = Mode::Code;
                }
                continue;
            }
            Mode::BlockComment => {
                if ch == '/' && prev == Some('*') {
                    mode = Mode::Code;
                    prev = None;
                } else {
                    prev = Some(ch);
                }
                continue;
            }
            Mode::Code => {}
        }

        if prev == Some('/') && (ch == '/' || ch == '*') {
            mode = if ch == '/' { Mode::LineComment } else { Mode::BlockComment };
            prev = None;
            continue;
        }
        prev = Some(ch);

        match ch {
            '"' | '\'' => mode = Mode::Str(ch),
            '{' | '[' => {
                if stack.is_empty() {
                    start = Some(idx);
                }
                stack.push(if ch == '{' { '}' } else { ']' });
            }
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                    if stack.is_empty() {
                        if let Some(s) = start.take() {
                            blocks.push(&text[s..=idx]);
                        }
                    }
                } else {
                    stack.clear();
                    start = None;
                }
            }
            _ => {}
        }
    }

    blocks
}

/// Parses the balanced blocks of `text`, keeping objects and arrays that
/// contain at least one object. Blocks that are not valid JSON (JavaScript
/// object literals, template fragments) are skipped.
pub(crate) fn parse_json_blocks(text: &str) -> Vec<Value> {
    extract_json_blocks(text)
        .into_iter()
        .filter_map(|block| {
            let trimmed = block.trim().trim_end_matches(';');
            serde_json::from_str::<Value>(trimmed).ok()
        })
        .filter(|value| match value {
            Value::Object(_) => true,
            Value::Array(items) => items.iter().any(Value::is_object),
            _ => false,
        })
        .collect()
}

/// Parses `text` as a whole JSON document, falling back to block scanning
/// for bodies with a JSONP wrapper or leading junk.
pub(crate) fn parse_json_document(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => vec![value],
        _ => parse_json_blocks(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apostrophe_in_line_comment_does_not_open_a_string() {
        let script = "// user's cart\nwindow.state = {\"price\": 100};";
        let values = parse_json_blocks(script);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["price"], 100);
    }

    #[test]
    fn block_comments_are_skipped() {
        let script = r#"/* don't { touch */ var s = {"price": 7}; /* } */"#;
        let blocks = extract_json_blocks(script);
        assert_eq!(blocks, vec![r#"{"price": 7}"#]);
    }

    #[test]
    fn slashes_inside_strings_are_not_comments() {
        let script = r#"x = {"url": "https://mk4s.ru/p/1", "price": 12}"#;
        let values = parse_json_blocks(script);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["url"], "https://mk4s.ru/p/1");
    }

    #[test]
    fn finds_assignment_payload() {
        let script = r#"window.__STATE__ = {"product":{"price":{"current":149}}};"#;
        let blocks = extract_json_blocks(script);
        assert_eq!(blocks, vec![r#"{"product":{"price":{"current":149}}}"#]);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_depth() {
        let script = r#"var a = {"name":"set {3} of }","price":10}; var b = [1,2];"#;
        let blocks = extract_json_blocks(script);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], r#"{"name":"set {3} of }","price":10}"#);
        assert_eq!(blocks[1], "[1,2]");
    }

    #[test]
    fn escaped_quotes_stay_inside_string() {
        let script = r#"x = {"title":"15\" board","price":99}"#;
        let values = parse_json_blocks(script);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["price"], 99);
    }

    #[test]
    fn mismatched_closer_resets_scan() {
        let script = r#"broken = {"a": [1, 2}; ok = {"price": 5}"#;
        let values = parse_json_blocks(script);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["price"], 5);
    }

    #[test]
    fn javascript_literals_are_skipped() {
        let script = "init({price: 10, label: 'x'}); data = {\"price\": 12}";
        let values = parse_json_blocks(script);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["price"], 12);
    }

    #[test]
    fn arrays_without_objects_are_dropped() {
        assert!(parse_json_blocks("var ids = [1, 2, 3];").is_empty());
        assert_eq!(parse_json_blocks(r#"var items = [{"price": 1}];"#).len(), 1);
    }

    #[test]
    fn document_falls_back_to_blocks_for_jsonp() {
        let values = parse_json_document(r#"callback({"price": 42});"#);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["price"], 42);

        let direct = parse_json_document(r#"  {"price": 7}  "#);
        assert_eq!(direct[0]["price"], 7);
    }
}
