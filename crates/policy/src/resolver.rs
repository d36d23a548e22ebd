//! Dotted-path lookup into tool call arguments.

use serde_json::Value;

/// Resolve `path` (e.g. `user.email`, `items.0.id`) against `arguments`.
///
/// Returns `None` as soon as a segment is missing. Numeric segments index
/// into arrays. An empty path or a path with empty segments never resolves.
pub fn resolve_argument<'a>(arguments: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(arguments, |current, segment| {
        if segment.is_empty() {
            return None;
        }
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn flat_and_nested_paths() {
        let args = json!({"email": "a@b.c", "user": {"email": "a@b.c"}});
        assert_eq!(resolve_argument(&args, "email"), Some(&json!("a@b.c")));
        assert_eq!(
            resolve_argument(&args, "user.email"),
            resolve_argument(&args, "email")
        );
    }

    #[test]
    fn missing_segments_are_absent() {
        let args = json!({"user": {"name": "x"}});
        assert_eq!(resolve_argument(&args, "user.email"), None);
        assert_eq!(resolve_argument(&args, "account.email"), None);
        assert_eq!(resolve_argument(&args, "user.name.first"), None);
    }

    #[test]
    fn array_indices() {
        let args = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(resolve_argument(&args, "items.1.id"), Some(&json!(2)));
        assert_eq!(resolve_argument(&args, "items.5.id"), None);
        assert_eq!(resolve_argument(&args, "items.first"), None);
    }

    #[test]
    fn null_is_present() {
        let args = json!({"cc": null});
        assert_eq!(resolve_argument(&args, "cc"), Some(&Value::Null));
    }

    #[test]
    fn degenerate_paths() {
        let args = json!({"a": {"": 1}});
        assert_eq!(resolve_argument(&args, ""), None);
        assert_eq!(resolve_argument(&args, "a."), None);
        assert_eq!(resolve_argument(&json!("scalar"), "a"), None);
    }
}
