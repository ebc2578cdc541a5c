//! File classification.
//!
//! Decides binary/text status, enforces the size ceiling, loads content for
//! eligible text files and computes a token-count estimate. Results are
//! memoized per absolute path; the watcher invalidates entries as files
//! change.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Extensions always treated as binary, without sampling content.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "pdf", "zip", "tar", "gz", "bz2",
    "xz", "7z", "rar", "exe", "dll", "so", "dylib", "a", "o", "class", "jar", "war", "wasm",
    "mp3", "mp4", "avi", "mov", "mkv", "flac", "ogg", "wav", "woff", "woff2", "ttf", "otf",
    "eot", "db", "sqlite", "bin", "dat",
];

/// Known text extensions and their language tags.
const FILE_TYPES: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("jsx", "javascript"),
    ("tsx", "typescript"),
    ("go", "go"),
    ("java", "java"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("h", "c"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("rb", "ruby"),
    ("php", "php"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("scala", "scala"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("sql", "sql"),
    ("md", "markdown"),
    ("txt", "text"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("json", "json"),
    ("toml", "toml"),
    ("xml", "xml"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("vue", "vue"),
    ("svelte", "svelte"),
];

/// Bytes sampled from the head of a file when the extension is inconclusive.
const SNIFF_LEN: usize = 8192;

/// Divisor for the character-based token estimate.
const CHARS_PER_TOKEN: u64 = 4;

/// Result of classifying one file.
///
/// `content` and `token_estimate` are only populated for non-binary,
/// non-skipped files within the size ceiling.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Classified {
    /// Size in bytes (0 when stat failed).
    pub size: u64,
    /// Binary verdict.
    pub is_binary: bool,
    /// Whether the file was skipped (oversized or unreadable).
    pub is_skipped: bool,
    /// Explanatory error for skipped files.
    pub error: Option<String>,
    /// Language tag derived from the extension.
    pub file_type: Option<String>,
    /// Full content for eligible text files.
    pub content: Option<String>,
    /// Approximate token count, `ceil(chars / 4)`.
    pub token_estimate: Option<u64>,
    /// blake3 hash of the content, used to recognize unchanged rewrites.
    #[serde(skip)]
    pub content_hash: Option<String>,
}

/// Classifier with a process-wide per-path cache.
///
/// Clones share the same cache; the coordinator owns clearing it when ignore
/// configuration changes.
#[derive(Clone)]
pub struct FileClassifier {
    max_file_size: u64,
    cache: Arc<Mutex<HashMap<PathBuf, Arc<Classified>>>>,
}

impl FileClassifier {
    /// Create a classifier with the given size ceiling.
    #[must_use]
    pub fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Classify a file, returning the cached result when available.
    pub fn classify(&self, path: &Path) -> Arc<Classified> {
        if let Some(hit) = self.cache.lock().get(path) {
            return Arc::clone(hit);
        }

        let fresh = Arc::new(classify_uncached(path, self.max_file_size));
        self.cache
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&fresh));
        fresh
    }

    /// Look up a cached entry without classifying.
    #[must_use]
    pub fn cached(&self, path: &Path) -> Option<Arc<Classified>> {
        self.cache.lock().get(path).map(Arc::clone)
    }

    /// Drop the cache entry for one path. No-op if absent.
    pub fn invalidate(&self, path: &Path) {
        self.cache.lock().remove(path);
    }

    /// Drop every cache entry. No-op when the cache is already empty.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.cache.lock().len()
    }
}

/// Get the language tag for a file based on extension.
#[must_use]
pub fn detect_file_type(path: &Path) -> Option<&'static str> {
    path.extension().and_then(|e| e.to_str()).and_then(|ext| {
        let ext = ext.to_lowercase();
        FILE_TYPES
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, tag)| *tag)
    })
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

fn classify_uncached(path: &Path, max_file_size: u64) -> Classified {
    let file_type = detect_file_type(path).map(ToString::to_string);
    let ext = extension_of(path);

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            return Classified {
                size: 0,
                is_binary: false,
                is_skipped: true,
                error: Some(format!("cannot stat file: {e}")),
                file_type,
                content: None,
                token_estimate: None,
                content_hash: None,
            };
        }
    };
    let size = metadata.len();

    // Extension verdict first: known binaries are never read.
    if ext
        .as_deref()
        .is_some_and(|e| BINARY_EXTENSIONS.contains(&e))
    {
        return Classified {
            size,
            is_binary: true,
            is_skipped: false,
            error: None,
            file_type,
            content: None,
            token_estimate: None,
            content_hash: None,
        };
    }

    // The size ceiling protects memory: oversized files are never read.
    if size > max_file_size {
        return Classified {
            size,
            is_binary: false,
            is_skipped: true,
            error: Some(format!(
                "file exceeds maximum size ({size} bytes > {max_file_size} bytes)"
            )),
            file_type,
            content: None,
            token_estimate: None,
            content_hash: None,
        };
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Classified {
                size,
                is_binary: false,
                is_skipped: true,
                error: Some(format!("cannot read file: {e}")),
                file_type,
                content: None,
                token_estimate: None,
                content_hash: None,
            };
        }
    };

    let known_text = ext
        .as_deref()
        .is_some_and(|e| FILE_TYPES.iter().any(|(known, _)| *known == e));
    let sniff = &bytes[..bytes.len().min(SNIFF_LEN)];
    if !known_text && sniff.contains(&0) {
        return Classified {
            size,
            is_binary: true,
            is_skipped: false,
            error: None,
            file_type,
            content: None,
            token_estimate: None,
            content_hash: None,
        };
    }

    // Undecodable content is binary regardless of extension.
    let Ok(content) = String::from_utf8(bytes) else {
        return Classified {
            size,
            is_binary: true,
            is_skipped: false,
            error: None,
            file_type,
            content: None,
            token_estimate: None,
            content_hash: None,
        };
    };

    #[allow(clippy::cast_possible_truncation)]
    let chars = content.chars().count() as u64;
    let content_hash = blake3::hash(content.as_bytes()).to_hex().to_string();

    Classified {
        size,
        is_binary: false,
        is_skipped: false,
        error: None,
        file_type,
        content: Some(content),
        token_estimate: Some(chars.div_ceil(CHARS_PER_TOKEN)),
        content_hash: Some(content_hash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_text_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.rs");
        fs::write(&path, "fn main() {}").unwrap();

        let classifier = FileClassifier::new(1024 * 1024);
        let result = classifier.classify(&path);

        assert!(!result.is_binary);
        assert!(!result.is_skipped);
        assert_eq!(result.size, 12);
        assert_eq!(result.file_type.as_deref(), Some("rust"));
        assert_eq!(result.content.as_deref(), Some("fn main() {}"));
        assert_eq!(result.token_estimate, Some(3));
        assert!(result.content_hash.is_some());
    }

    #[test]
    fn test_classify_binary_by_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        // Content is text, but the extension verdict wins without a read.
        fs::write(&path, "not really a png").unwrap();

        let classifier = FileClassifier::new(1024 * 1024);
        let result = classifier.classify(&path);

        assert!(result.is_binary);
        assert!(!result.is_skipped);
        assert!(result.content.is_none());
        assert!(result.token_estimate.is_none());
    }

    #[test]
    fn test_classify_binary_by_content_sniff() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blob");
        fs::write(&path, [0x7fu8, b'E', b'L', b'F', 0x00, 0x01]).unwrap();

        let classifier = FileClassifier::new(1024 * 1024);
        let result = classifier.classify(&path);

        assert!(result.is_binary);
        assert!(result.content.is_none());
    }

    #[test]
    fn test_classify_oversized_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.txt");
        fs::write(&path, "x".repeat(2048)).unwrap();

        let classifier = FileClassifier::new(1024);
        let result = classifier.classify(&path);

        assert!(result.is_skipped);
        assert!(!result.is_binary);
        let error = result.error.as_deref().unwrap();
        assert!(error.contains("maximum size"));
        assert!(result.content.is_none());
        assert!(result.token_estimate.is_none());
    }

    #[test]
    fn test_classify_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gone.rs");

        let classifier = FileClassifier::new(1024);
        let result = classifier.classify(&path);

        assert!(result.is_skipped);
        assert!(result.error.as_deref().unwrap().contains("cannot stat"));
        assert_eq!(result.size, 0);
    }

    #[test]
    fn test_classify_invalid_utf8_is_binary() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weird.txt");
        fs::write(&path, [b'h', b'i', 0xff, 0xfe]).unwrap();

        let classifier = FileClassifier::new(1024);
        let result = classifier.classify(&path);

        assert!(result.is_binary);
        assert!(result.content.is_none());
    }

    #[test]
    fn test_token_estimate_monotonic_for_same_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "hello world, this is content").unwrap();

        let classifier = FileClassifier::new(1024);
        let first = classifier.classify(&path);
        classifier.invalidate(&path);
        let second = classifier.classify(&path);

        assert_eq!(first.token_estimate, second.token_estimate);
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn test_cache_returns_stale_until_invalidated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "one").unwrap();

        let classifier = FileClassifier::new(1024);
        let first = classifier.classify(&path);
        assert_eq!(first.content.as_deref(), Some("one"));

        fs::write(&path, "two").unwrap();
        let stale = classifier.classify(&path);
        assert_eq!(stale.content.as_deref(), Some("one"));

        classifier.invalidate(&path);
        let fresh = classifier.classify(&path);
        assert_eq!(fresh.content.as_deref(), Some("two"));
    }

    #[test]
    fn test_clear_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "content").unwrap();

        let classifier = FileClassifier::new(1024);
        classifier.classify(&path);
        assert_eq!(classifier.cached_paths(), 1);

        classifier.clear();
        assert_eq!(classifier.cached_paths(), 0);

        // Clearing an empty cache is a no-op.
        classifier.clear();
        assert_eq!(classifier.cached_paths(), 0);
    }

    #[test]
    fn test_detect_file_type() {
        assert_eq!(detect_file_type(Path::new("main.rs")), Some("rust"));
        assert_eq!(detect_file_type(Path::new("notes.md")), Some("markdown"));
        assert_eq!(detect_file_type(Path::new("README.TXT")), Some("text"));
        assert_eq!(detect_file_type(Path::new("unknown.xyz")), None);
    }
}
