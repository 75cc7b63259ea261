//! Embedded page-state extraction and defensive tree walking
//!
//! Server-rendered pages embed the data we need as a JS assignment inside
//! a script block (`window.__SOMETHING__ = {...}</script>`). The blob is
//! close to JSON but not guaranteed to be valid JSON: unquoted keys,
//! `undefined` literals and a trailing `;` all occur in the wild. The
//! lenient path parses it as YAML, which tolerates those quirks, into a
//! `serde_json::Value` tree.
//!
//! The tree is never typed out; it is walked with helpers that treat a
//! missing key as absence, not as a failure. A missing key is data.

use regex::Regex;
use serde_json::Value;

/// Capture the assignment payload for a `window.<var> = ...</script>`
/// pattern. Returns `None` when the pattern is absent or the capture is
/// empty, which callers treat as an anti-bot miss rather than an error.
pub fn capture_script_state<'a>(body: &'a str, pattern: &Regex) -> Option<&'a str> {
    let capture = pattern.captures(body)?.get(1)?;
    let blob = capture.as_str().trim();
    let blob = blob.trim_end_matches(';').trim_end();
    if blob.is_empty() {
        None
    } else {
        Some(blob)
    }
}

/// Strict JSON parse, for platforms that embed real JSON.
pub fn parse_strict(blob: &str) -> Option<Value> {
    serde_json::from_str(blob).ok()
}

/// Lenient parse for JS-object-literal-ish blobs. YAML is a superset
/// loose enough to accept unquoted keys and bareword scalars such as
/// `undefined` (which becomes the string "undefined").
pub fn parse_loose(blob: &str) -> Option<Value> {
    serde_yaml::from_str(blob).ok()
}

/// Walk nested mappings; absent or non-mapping intermediate levels yield
/// `None`.
pub fn value_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

pub fn str_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(root, path)?.as_str()
}

pub fn array_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    value_at(root, path)?.as_array()
}

pub fn object_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let v = value_at(root, path)?;
    v.is_object().then_some(v)
}

/// Up to `limit` top-level keys of a mapping, for mismatch diagnostics.
pub fn top_keys(root: &Value, limit: usize) -> Vec<String> {
    match root.as_object() {
        Some(map) => map.keys().take(limit).cloned().collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static STATE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?s)window\.__TEST_STATE__\s*=\s*(.*?)</script>").unwrap()
    });

    #[test]
    fn captures_blob_and_strips_trailing_semicolon() {
        let body = r#"<script>window.__TEST_STATE__ = {"a": 1};</script>"#;
        let blob = capture_script_state(body, &STATE_RE).unwrap();
        assert_eq!(blob, r#"{"a": 1}"#);
    }

    #[test]
    fn empty_capture_is_a_miss() {
        let body = "<script>window.__TEST_STATE__ =    </script>";
        assert!(capture_script_state(body, &STATE_RE).is_none());
        assert!(capture_script_state("<html></html>", &STATE_RE).is_none());
    }

    #[test]
    fn capture_spans_newlines() {
        let body = "<script>window.__TEST_STATE__ = {\n\"a\": {\n\"b\": 2}\n}</script>";
        let blob = capture_script_state(body, &STATE_RE).unwrap();
        let value = parse_strict(blob).unwrap();
        assert_eq!(value["a"]["b"], 2);
    }

    #[test]
    fn loose_parse_accepts_js_literal_quirks() {
        let value = parse_loose(r#"{note: {currentNoteId: undefined}}"#).unwrap();
        assert_eq!(str_at(&value, &["note", "currentNoteId"]), Some("undefined"));
    }

    #[test]
    fn missing_keys_are_absence_not_errors() {
        let value = parse_strict(r#"{"a": {"b": []}}"#).unwrap();
        assert!(value_at(&value, &["a", "b"]).is_some());
        assert!(value_at(&value, &["a", "c", "d"]).is_none());
        assert!(str_at(&value, &["a", "b"]).is_none());
        assert!(array_at(&value, &["a", "b"]).unwrap().is_empty());
    }

    #[test]
    fn top_keys_is_bounded() {
        let value = parse_strict(r#"{"a":1,"b":2,"c":3}"#).unwrap();
        assert_eq!(top_keys(&value, 2).len(), 2);
        assert!(top_keys(&Value::Null, 20).is_empty());
    }
}
