//! Field traversal for rows held as loosely-typed JSON.
//!
//! Paths use dot notation for nesting and a `[]` suffix for arrays, e.g.
//! `"content"`, `"profile.target_job"`, `"letters[].company_name"`. A path
//! that does not resolve, or resolves to a non-string or empty string, is a
//! no-op.

use serde_json::Value;

/// Segments of a dot-notation field path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// Parse a dot-notation path into a list of [`PathSegment`]s.
///
/// `"letters[].content"` → `[Key("letters"), ArrayItem, Key("content")]`.
fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_owned()));
            }
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part.to_owned()));
        }
    }
    segments
}

/// Recursively navigate `value` following `segments` and rewrite any
/// non-empty string leaf at the end of the path.
fn transform_at_path<E>(
    value: &mut Value,
    segments: &[PathSegment],
    f: &mut impl FnMut(&str) -> Result<String, E>,
) -> Result<(), E> {
    let Some((head, rest)) = segments.split_first() else {
        if let Value::String(s) = value {
            if !s.is_empty() {
                *s = f(s)?;
            }
        }
        return Ok(());
    };

    match head {
        PathSegment::Key(key) => {
            if let Value::Object(map) = value {
                if let Some(child) = map.get_mut(key) {
                    transform_at_path(child, rest, f)?;
                }
            }
        }
        PathSegment::ArrayItem => {
            if let Value::Array(items) = value {
                for item in items.iter_mut() {
                    transform_at_path(item, rest, f)?;
                }
            }
        }
    }
    Ok(())
}

/// Apply `f` to every non-empty string found at any of `paths` in `value`.
///
/// Stops at the first error; fields already rewritten stay rewritten, so
/// callers should work on a copy.
pub fn transform_fields<E>(
    value: &mut Value,
    paths: &[&str],
    mut f: impl FnMut(&str) -> Result<String, E>,
) -> Result<(), E> {
    for path in paths {
        let segments = parse_path(path);
        transform_at_path(value, &segments, &mut f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tag(s: &str) -> Result<String, ()> {
        Ok(format!("T:{s}"))
    }

    #[test]
    fn parse_path_flat() {
        assert_eq!(parse_path("content"), vec![PathSegment::Key("content".into())]);
    }

    #[test]
    fn parse_path_nested() {
        assert_eq!(parse_path("user.profile.target_job").len(), 3);
    }

    #[test]
    fn parse_path_array() {
        let segs = parse_path("letters[].content");
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[1], PathSegment::ArrayItem);
    }

    #[test]
    fn parse_path_top_level_array() {
        assert_eq!(
            parse_path("[].raw_text"),
            vec![PathSegment::ArrayItem, PathSegment::Key("raw_text".into())]
        );
    }

    #[test]
    fn flat_field_rewritten_others_untouched() {
        let mut val = json!({"title": "t", "content": "c", "other": 5});
        transform_fields(&mut val, &["content"], tag).unwrap();
        assert_eq!(val, json!({"title": "t", "content": "T:c", "other": 5}));
    }

    #[test]
    fn non_string_and_empty_untouched() {
        let mut val = json!({"a": 5, "b": "", "c": null, "d": {"x": 1}});
        transform_fields(&mut val, &["a", "b", "c", "d", "missing"], tag).unwrap();
        assert_eq!(val, json!({"a": 5, "b": "", "c": null, "d": {"x": 1}}));
    }

    #[test]
    fn array_fields_rewritten() {
        let mut val = json!({
            "letters": [
                {"company_name": "삼성전자"},
                {"company_name": null},
                {"company_name": "LG"}
            ]
        });
        transform_fields(&mut val, &["letters[].company_name"], tag).unwrap();
        assert_eq!(val["letters"][0]["company_name"], "T:삼성전자");
        assert!(val["letters"][1]["company_name"].is_null());
        assert_eq!(val["letters"][2]["company_name"], "T:LG");
    }

    #[test]
    fn error_stops_traversal() {
        let mut val = json!({"a": "x", "b": "y"});
        let result = transform_fields(&mut val, &["a", "b"], |_| Err::<String, _>("nope"));
        assert_eq!(result, Err("nope"));
    }
}
