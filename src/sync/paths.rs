//! Path normalization helpers.
//!
//! Pure functions shared by the filter, scanner and watcher. This module is
//! a leaf: it depends on nothing else in the engine.

use std::path::Path;

/// Normalize path separators to forward slashes.
#[must_use]
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Compute the canonical forward-slash relative path of `path` under `root`.
///
/// Returns `None` when `path` is not under `root` (or is `root` itself with
/// no remaining components). Callers drop events for such paths rather than
/// propagating unresolvable ones.
#[must_use]
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let stripped = path.strip_prefix(root).ok()?;
    let rel = normalize_separators(&stripped.to_string_lossy());
    if rel.is_empty() {
        return None;
    }
    Some(rel)
}

/// Join a directory-relative pattern onto the directory's own relative path.
///
/// Used when presenting patterns discovered in nested ignore files: a
/// pattern `foo` found in `sub/.gitignore` is displayed as `sub/foo`.
#[must_use]
pub fn prefix_pattern(dir_rel: &str, pattern: &str) -> String {
    if dir_rel.is_empty() {
        return pattern.to_string();
    }
    // Negated patterns keep the `!` in front of the joined form.
    if let Some(negated) = pattern.strip_prefix('!') {
        format!("!{}/{}", dir_rel, negated.trim_start_matches('/'))
    } else {
        format!("{}/{}", dir_rel, pattern.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("src\\sync\\mod.rs"), "src/sync/mod.rs");
        assert_eq!(normalize_separators("src/sync/mod.rs"), "src/sync/mod.rs");
    }

    #[test]
    fn test_relative_to_inside_root() {
        let root = PathBuf::from("/home/user/project");
        let path = root.join("src").join("main.rs");
        assert_eq!(relative_to(&root, &path), Some("src/main.rs".to_string()));
    }

    #[test]
    fn test_relative_to_outside_root() {
        let root = PathBuf::from("/home/user/project");
        let path = PathBuf::from("/tmp/other.txt");
        assert_eq!(relative_to(&root, &path), None);
    }

    #[test]
    fn test_relative_to_root_itself() {
        let root = PathBuf::from("/home/user/project");
        assert_eq!(relative_to(&root, &root), None);
    }

    #[test]
    fn test_prefix_pattern_at_root() {
        assert_eq!(prefix_pattern("", "*.log"), "*.log");
    }

    #[test]
    fn test_prefix_pattern_nested() {
        assert_eq!(prefix_pattern("sub", "build/"), "sub/build/");
        assert_eq!(prefix_pattern("a/b", "/dist"), "a/b/dist");
    }

    #[test]
    fn test_prefix_pattern_negated() {
        assert_eq!(prefix_pattern("sub", "!keep.txt"), "!sub/keep.txt");
    }
}
