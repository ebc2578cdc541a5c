//! Ignore-pattern resolution.
//!
//! Builds, per root directory, a composed predicate deciding whether a path
//! is excluded. Three layers are unioned: built-in defaults, caller-supplied
//! patterns, and `.gitignore` files discovered recursively under the root.
//! A path is excluded if any layer excludes it, so no precedence logic is
//! needed across layers; within a layer normal gitignore semantics apply.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;

use super::paths;
use crate::{Error, Result};

/// Built-in exclusions applied to every root: version-control metadata,
/// dependency directories, build output, editor directories and OS
/// housekeeping files.
static DEFAULT_EXCLUDES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        ".git/",
        ".svn/",
        ".hg/",
        "node_modules/",
        "bower_components/",
        "vendor/",
        "__pycache__/",
        ".venv/",
        "venv/",
        "site-packages/",
        "target/",
        "build/",
        "dist/",
        "out/",
        "coverage/",
        "*.egg-info/",
        ".idea/",
        ".vscode/",
        ".DS_Store",
        "Thumbs.db",
        "desktop.ini",
    ]
});

/// Name of the directory-local exclusion files discovered under a root.
const IGNORE_FILE_NAME: &str = ".gitignore";

/// How directory-local exclusion files are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreMode {
    /// Merge discovered exclusion files with defaults and custom patterns.
    Automatic,
    /// Defaults plus caller-supplied patterns only; no recursive discovery.
    Global,
}

/// Caller-facing ignore configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreConfig {
    /// Discovery mode.
    pub mode: IgnoreMode,
    /// Caller-supplied exclusion patterns (gitignore syntax).
    pub custom_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            mode: IgnoreMode::Automatic,
            custom_patterns: Vec::new(),
        }
    }
}

/// The resolved pattern sets for one root, for display/audit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPatterns {
    /// Built-in default exclusions.
    pub default_patterns: Vec<String>,
    /// Caller-supplied patterns.
    pub custom_patterns: Vec<String>,
    /// Patterns found in discovered exclusion files, prefixed with the
    /// directory they were found in.
    pub discovered_patterns: Vec<String>,
}

/// Composed exclusion decision function for one root.
///
/// Immutable once built; shared between the scanner and the watch session so
/// both always apply the identical exclusion view.
pub struct IgnorePredicate {
    root: PathBuf,
    defaults: Gitignore,
    custom: Option<Gitignore>,
    discovered: Option<Gitignore>,
    patterns: ResolvedPatterns,
}

impl IgnorePredicate {
    /// Whether the given root-relative path is excluded by any layer.
    #[must_use]
    pub fn is_excluded(&self, relative_path: &str, is_dir: bool) -> bool {
        if layer_matches(&self.defaults, relative_path, is_dir) {
            return true;
        }
        if let Some(ref custom) = self.custom {
            if layer_matches(custom, relative_path, is_dir) {
                return true;
            }
        }
        if let Some(ref discovered) = self.discovered {
            if layer_matches(discovered, relative_path, is_dir) {
                return true;
            }
        }
        false
    }

    /// Whether the path matches the built-in default exclusions alone.
    #[must_use]
    pub fn matches_default(&self, relative_path: &str, is_dir: bool) -> bool {
        layer_matches(&self.defaults, relative_path, is_dir)
    }

    /// The root this predicate was built for.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The resolved pattern sets behind this predicate.
    #[must_use]
    pub fn patterns(&self) -> &ResolvedPatterns {
        &self.patterns
    }
}

impl std::fmt::Debug for IgnorePredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnorePredicate")
            .field("root", &self.root)
            .field("custom", &self.patterns.custom_patterns.len())
            .field("discovered", &self.patterns.discovered_patterns.len())
            .finish()
    }
}

/// Check one compiled layer. Parent directories are consulted so a file
/// inside an ignored directory is itself treated as ignored.
fn layer_matches(layer: &Gitignore, relative_path: &str, is_dir: bool) -> bool {
    layer
        .matched_path_or_any_parents(Path::new(relative_path), is_dir)
        .is_ignore()
}

/// Resolver with a per-root predicate cache.
///
/// The cache is keyed by canonicalized root path and must be invalidated
/// whenever the ignore configuration changes; the coordinator owns that
/// lifecycle.
pub struct IgnoreResolver {
    cache: Mutex<HashMap<PathBuf, Arc<IgnorePredicate>>>,
}

impl IgnoreResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the predicate for `root`, building it on first use.
    ///
    /// Discovery is synchronous: once this returns, the predicate reflects
    /// every readable exclusion file under the root. Repeated calls without
    /// invalidation return the cached predicate and therefore identical
    /// inclusion decisions.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be canonicalized or a custom
    /// pattern is invalid. Unreadable exclusion files are logged and skipped,
    /// never an error.
    pub fn resolve(&self, root: &Path, config: &IgnoreConfig) -> Result<Arc<IgnorePredicate>> {
        let key = canonical_root(root)?;

        if let Some(predicate) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(predicate));
        }

        let predicate = Arc::new(build_predicate(&key, config)?);
        self.cache
            .lock()
            .insert(key.clone(), Arc::clone(&predicate));

        tracing::debug!(
            root = %key.display(),
            custom = predicate.patterns.custom_patterns.len(),
            discovered = predicate.patterns.discovered_patterns.len(),
            "Resolved ignore predicate"
        );

        Ok(predicate)
    }

    /// Resolve the pattern sets for display without touching the cache.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`IgnoreResolver::resolve`].
    pub fn resolved_patterns(
        &self,
        root: &Path,
        config: &IgnoreConfig,
    ) -> Result<ResolvedPatterns> {
        let key = canonical_root(root)?;
        Ok(build_predicate(&key, config)?.patterns.clone())
    }

    /// Drop the cached predicate for one root. No-op if not cached.
    pub fn invalidate(&self, root: &Path) {
        if let Ok(key) = canonical_root(root) {
            self.cache.lock().remove(&key);
        }
    }

    /// Drop every cached predicate. No-op when the cache is already empty.
    pub fn invalidate_all(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached predicates.
    #[must_use]
    pub fn cached_roots(&self) -> usize {
        self.cache.lock().len()
    }
}

impl Default for IgnoreResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .map_err(|e| Error::config(format!("invalid root '{}': {e}", root.display())))
}

fn build_predicate(root: &Path, config: &IgnoreConfig) -> Result<IgnorePredicate> {
    let defaults = compile_patterns(root, DEFAULT_EXCLUDES.iter().copied())?;

    let custom = if config.custom_patterns.is_empty() {
        None
    } else {
        Some(compile_patterns(
            root,
            config.custom_patterns.iter().map(String::as_str),
        )?)
    };

    let (discovered, discovered_patterns) = match config.mode {
        IgnoreMode::Automatic => discover_ignore_files(root, &defaults, custom.as_ref()),
        IgnoreMode::Global => (None, Vec::new()),
    };

    let patterns = ResolvedPatterns {
        default_patterns: DEFAULT_EXCLUDES.iter().map(ToString::to_string).collect(),
        custom_patterns: config.custom_patterns.clone(),
        discovered_patterns,
    };

    Ok(IgnorePredicate {
        root: root.to_path_buf(),
        defaults,
        custom,
        discovered,
        patterns,
    })
}

fn compile_patterns<'a>(
    root: &Path,
    patterns: impl Iterator<Item = &'a str>,
) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| Error::config(format!("invalid pattern '{pattern}': {e}")))?;
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("failed to build ignore matcher: {e}")))
}

/// Recursively discover `.gitignore` files under `root`.
///
/// The walk is bounded by the ignore rules applied progressively: a subtree
/// excluded by defaults, custom patterns or any exclusion file discovered so
/// far is not descended into. Returns the compiled layer plus the normalized,
/// de-duplicated pattern list for audit.
fn discover_ignore_files(
    root: &Path,
    defaults: &Gitignore,
    custom: Option<&Gitignore>,
) -> (Option<Gitignore>, Vec<String>) {
    let mut builder = GitignoreBuilder::new(root);
    let mut compiled: Option<Gitignore> = None;
    let mut patterns = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let ignore_file = dir.join(IGNORE_FILE_NAME);
        if ignore_file.is_file() {
            match fs::read_to_string(&ignore_file) {
                Ok(content) => {
                    let dir_rel = paths::relative_to(root, &dir).unwrap_or_default();
                    for line in content.lines() {
                        let line = line.trim();
                        if line.is_empty() || line.starts_with('#') {
                            continue;
                        }
                        let display =
                            paths::prefix_pattern(&dir_rel, &paths::normalize_separators(line));
                        if seen.insert(display.clone()) {
                            patterns.push(display);
                        }
                    }
                    // `add` anchors the file's patterns to its own directory.
                    if let Some(e) = builder.add(&ignore_file) {
                        tracing::warn!(
                            path = %ignore_file.display(),
                            error = %e,
                            "Skipping malformed exclusion file"
                        );
                    } else {
                        compiled = builder.build().ok();
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %ignore_file.display(),
                        error = %e,
                        "Skipping unreadable exclusion file"
                    );
                }
            }
        }

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Cannot list directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let Some(rel) = paths::relative_to(root, &path) else {
                continue;
            };
            let excluded = layer_matches(defaults, &rel, true)
                || custom.is_some_and(|c| layer_matches(c, &rel, true))
                || compiled
                    .as_ref()
                    .is_some_and(|d| layer_matches(d, &rel, true));
            if !excluded {
                stack.push(path);
            }
        }
    }

    if patterns.is_empty() {
        (None, patterns)
    } else {
        (compiled, patterns)
    }
}
