//! Dot-path parser
//!
//! Supports:
//! - a.b.c (mapping keys)
//! - items.0.name (numeric segments index into sequences)
//!
//! Does NOT support:
//! - Brackets: a[0]
//! - Wildcards or filters
//! - Escaping, so keys containing '.' are unreachable

use serde_json::Value;

use crate::error::PropsError;

/// A parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Mapping key access
    Key(String),
    /// Sequence index attempt; keeps the raw text so the segment can still
    /// act as a mapping key (e.g. `{"0": ...}`)
    Index { idx: usize, raw: String },
}

impl Segment {
    /// The segment as a mapping key
    pub fn key(&self) -> &str {
        match self {
            Segment::Key(key) => key,
            Segment::Index { raw, .. } => raw,
        }
    }

    /// The segment as a sequence index, if purely numeric
    pub fn index(&self) -> Option<usize> {
        match self {
            Segment::Key(_) => None,
            Segment::Index { idx, .. } => Some(*idx),
        }
    }
}

/// Parse a dot-separated path into segments
///
/// Examples:
/// - "user.name" → [Key("user"), Key("name")]
/// - "items.0" → [Key("items"), Index(0)]
///
/// Empty paths, whitespace-only paths, and empty segments ("a..b") are
/// rejected.
pub fn parse(path: &str) -> Result<Vec<Segment>, PropsError> {
    if path.trim().is_empty() {
        return Err(PropsError::InvalidPath {
            path: path.to_string(),
        });
    }

    let mut segments = Vec::new();

    for part in path.split('.') {
        if part.is_empty() {
            return Err(PropsError::InvalidPath {
                path: path.to_string(),
            });
        }

        match parse_index(part) {
            Some(idx) => segments.push(Segment::Index {
                idx,
                raw: part.to_string(),
            }),
            None => segments.push(Segment::Key(part.to_string())),
        }
    }

    Ok(segments)
}

/// Largest numeric segment treated as a sequence index. Bigger numerics act
/// as mapping keys, and `idx + 1` stays in `usize` range for sequence
/// padding on every target.
const MAX_INDEX: usize = (u32::MAX - 1) as usize;

/// Purely numeric segments become index attempts ("-1" and "1a" do not;
/// numerics past [`MAX_INDEX`] stay keys)
fn parse_index(part: &str) -> Option<usize> {
    if part.bytes().all(|b| b.is_ascii_digit()) {
        part.parse().ok().filter(|idx| *idx <= MAX_INDEX)
    } else {
        None
    }
}

/// Walk segments against a value, returning a reference to the target.
///
/// Strict: `None` means the chain broke (missing key, index out of range,
/// or a scalar mid-path). A present null is `Some(&Value::Null)`.
pub(crate) fn resolve<'v>(root: &'v Value, segments: &[Segment]) -> Option<&'v Value> {
    let mut current = root;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment.key())?,
            Value::Array(items) => items.get(segment.index()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Human-readable type name for error messages
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> Segment {
        Segment::Key(s.to_string())
    }

    fn index(idx: usize) -> Segment {
        Segment::Index {
            idx,
            raw: idx.to_string(),
        }
    }

    #[test]
    fn parse_simple_path() {
        let segments = parse("a.b.c").unwrap();
        assert_eq!(segments, vec![key("a"), key("b"), key("c")]);
    }

    #[test]
    fn parse_numeric_segment_as_index() {
        let segments = parse("items.0.name").unwrap();
        assert_eq!(segments, vec![key("items"), index(0), key("name")]);
    }

    #[test]
    fn parse_single_segment() {
        assert_eq!(parse("name").unwrap(), vec![key("name")]);
    }

    #[test]
    fn parse_rejects_empty_path() {
        assert!(matches!(parse(""), Err(PropsError::InvalidPath { .. })));
        assert!(matches!(parse("   "), Err(PropsError::InvalidPath { .. })));
    }

    #[test]
    fn parse_rejects_empty_segment() {
        assert!(parse("a..b").is_err());
        assert!(parse(".a").is_err());
        assert!(parse("a.").is_err());
    }

    #[test]
    fn negative_and_mixed_segments_are_keys() {
        assert_eq!(parse("-1").unwrap(), vec![key("-1")]);
        assert_eq!(parse("1a").unwrap(), vec![key("1a")]);
        assert_eq!(parse("+1").unwrap(), vec![key("+1")]);
    }

    #[test]
    fn oversized_numerics_are_keys() {
        assert_eq!(parse("4294967294").unwrap(), vec![index(4294967294)]);
        assert_eq!(parse("4294967295").unwrap(), vec![key("4294967295")]);
        assert_eq!(
            parse("18446744073709551615").unwrap(),
            vec![key("18446744073709551615")]
        );
    }

    #[test]
    fn index_segment_keeps_raw_text_for_key_use() {
        let segments = parse("a.0").unwrap();
        assert_eq!(segments[1].key(), "0");
        assert_eq!(segments[1].index(), Some(0));
    }

    #[test]
    fn resolve_simple() {
        let value = json!({"a": {"b": "value"}});
        let segments = parse("a.b").unwrap();
        assert_eq!(resolve(&value, &segments), Some(&json!("value")));
    }

    #[test]
    fn resolve_array_index() {
        let value = json!({"items": ["first", "second"]});
        let segments = parse("items.1").unwrap();
        assert_eq!(resolve(&value, &segments), Some(&json!("second")));
    }

    #[test]
    fn resolve_numeric_key_on_object() {
        // numeric segment falls back to key access on mappings
        let value = json!({"a": {"0": "zero"}});
        let segments = parse("a.0").unwrap();
        assert_eq!(resolve(&value, &segments), Some(&json!("zero")));
    }

    #[test]
    fn resolve_missing_is_none() {
        let value = json!({"a": 1});
        assert_eq!(resolve(&value, &parse("b").unwrap()), None);
        assert_eq!(resolve(&value, &parse("a.b").unwrap()), None);
    }

    #[test]
    fn resolve_index_out_of_range_is_none() {
        let value = json!({"items": ["only"]});
        assert_eq!(resolve(&value, &parse("items.5").unwrap()), None);
    }

    #[test]
    fn resolve_key_on_array_is_none() {
        let value = json!({"items": ["a", "b"]});
        assert_eq!(resolve(&value, &parse("items.name").unwrap()), None);
    }

    #[test]
    fn resolve_present_null_is_some() {
        let value = json!({"a": null});
        assert_eq!(resolve(&value, &parse("a").unwrap()), Some(&Value::Null));
    }

    #[test]
    fn value_kind_names() {
        assert_eq!(value_kind(&json!(null)), "null");
        assert_eq!(value_kind(&json!(true)), "boolean");
        assert_eq!(value_kind(&json!(1)), "number");
        assert_eq!(value_kind(&json!("s")), "string");
        assert_eq!(value_kind(&json!([])), "array");
        assert_eq!(value_kind(&json!({})), "object");
    }
}
