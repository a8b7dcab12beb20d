//! Conversions between ancestor chains and canonical slash-joined tags
//!
//! A node's `ancestors` is the chain of segments from the virtual root down
//! to the node itself. Continuation segments produced by splitting a nested
//! tag carry [`SUBTREE_MARK`] so that `["root", "web", "→ css"]` reads back as
//! the tags `["root", "web/css"]`.

/// Prefix marking a continuation segment of a decomposed nested tag
pub const SUBTREE_MARK: &str = "→ ";

/// Tag of the always-present virtual root
pub const ROOT_TAG: &str = "root";

/// Separator between tag segments
pub const SEPARATOR: char = '/';

/// Case-fold a tag for comparison
pub fn fold(tag: &str) -> String {
    tag.to_lowercase()
}

/// Case-insensitive tag equality
pub fn eq_fold(a: &str, b: &str) -> bool {
    a == b || fold(a) == fold(b)
}

/// Whether `tag` is a continuation segment
pub fn is_subtree_marker(tag: &str) -> bool {
    tag.starts_with(SUBTREE_MARK)
}

/// Remove the continuation prefix, if present
pub fn strip_marker(tag: &str) -> &str {
    tag.strip_prefix(SUBTREE_MARK).unwrap_or(tag)
}

/// Prefix a segment as a continuation
pub fn mark_continuation(rest: &str) -> String {
    format!("{SUBTREE_MARK}{rest}")
}

/// Split a nested tag into its first segment and the remainder
///
/// Returns `None` when the tag has no separator.
pub fn split_head(tag: &str) -> Option<(&str, &str)> {
    tag.split_once(SEPARATOR)
}

/// Normalize a raw tag as written in a document (`#Tag/Sub` → `Tag/Sub`)
pub fn canonical_tag(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('#').unwrap_or(trimmed).trim_matches(SEPARATOR)
}

/// Join an ancestor chain into the key used by the expanded-folder set
pub fn tag_path_key<S: AsRef<str>>(ancestors: &[S]) -> String {
    let mut key = String::new();
    for (i, segment) in ancestors.iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        key.push_str(segment.as_ref());
    }
    key
}

/// Collapse continuation segments back into full tags
pub fn ancestors_to_tags<S: AsRef<str>>(ancestors: &[S]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(ancestors.len());
    for segment in ancestors {
        let segment = segment.as_ref();
        if is_subtree_marker(segment) {
            let rest = strip_marker(segment);
            match tags.pop() {
                Some(prev) => tags.push(format!("{prev}{SEPARATOR}{rest}")),
                None => tags.push(rest.to_string()),
            }
        } else {
            tags.push(segment.to_string());
        }
    }
    tags
}

/// Whether `prefix` is a segment-wise prefix of `path` (case-insensitive)
pub fn is_path_prefix(prefix: &str, path: &str) -> bool {
    let prefix = fold(prefix);
    let path = fold(path);
    path == prefix
        || (path.starts_with(&prefix) && path[prefix.len()..].starts_with(SEPARATOR))
}

/// De-duplicate case-insensitively, keeping the first spelling
pub fn unique_folded<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = ahash::AHashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.into();
        if seen.insert(fold(&tag)) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_to_tags_joins_continuations() {
        let tags = ancestors_to_tags(&["root", "web", "→ css", "→ grid"]);
        assert_eq!(tags, vec!["root", "web/css/grid"]);
    }

    #[test]
    fn test_ancestors_to_tags_plain_chain() {
        let tags = ancestors_to_tags(&["root", "a", "b"]);
        assert_eq!(tags, vec!["root", "a", "b"]);
    }

    #[test]
    fn test_ancestors_to_tags_reduced_parent() {
        // `web/html` folded under `web/css` keeps both tags distinct
        let tags = ancestors_to_tags(&["root", "web", "→ css", "web", "→ html"]);
        assert_eq!(tags, vec!["root", "web/css", "web/html"]);
    }

    #[test]
    fn test_canonical_tag() {
        assert_eq!(canonical_tag("#Project/Alpha"), "Project/Alpha");
        assert_eq!(canonical_tag("  plain "), "plain");
        assert_eq!(canonical_tag("#trailing/"), "trailing");
    }

    #[test]
    fn test_split_head() {
        assert_eq!(split_head("a/b/c"), Some(("a", "b/c")));
        assert_eq!(split_head("a"), None);
    }

    #[test]
    fn test_path_prefix_is_segment_wise() {
        assert!(is_path_prefix("root/food", "root/Food/sweet"));
        assert!(is_path_prefix("root/food", "root/food"));
        assert!(!is_path_prefix("root/foo", "root/food"));
    }

    #[test]
    fn test_unique_folded_keeps_first_spelling() {
        let tags = unique_folded(["Alpha", "alpha", "beta"]);
        assert_eq!(tags, vec!["Alpha", "beta"]);
    }

    #[test]
    fn test_eq_fold() {
        assert!(eq_fold("Web", "web"));
        assert!(!eq_fold("web", "webs"));
    }
}
