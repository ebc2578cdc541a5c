//! Performance benchmarks for treesync
//!
//! Measures the hot paths of the sync engine in isolation: ignore-predicate
//! matching, single-file classification, and full scans over synthetic trees.
//!
//! **Benchmarks Included:**
//! - `predicate_matching`: exclusion decisions against a three-layer predicate
//! - `classification`: text/binary classification of a single file
//! - `full_scan`: end-to-end scan at 100 and 1000 files
//!
//! **Run benchmarks:**
//! ```bash
//! cargo bench                        # Run all benchmarks
//! cargo bench -- predicate_matching  # Predicate matching only
//! cargo bench -- full_scan           # Full scan only
//! ```
//!
//! **Notes:**
//! - Trees are synthesized into TempDirs so the numbers isolate engine cost
//!   from repository layout effects
//! - Sample size is 10 (criterion minimum) for reasonable test duration

use std::fs;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use treesync::sync::scanner::scan_blocking;
use treesync::sync::{FileClassifier, IgnoreConfig, IgnoreMode, IgnoreResolver, ScanOptions};

/// Synthesize a tree of `files` markdown files spread over nested
/// directories, with an ignored subtree alongside.
fn create_tree(files: usize) -> TempDir {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let per_dir = 50;
    for (i, chunk) in (0..files).collect::<Vec<_>>().chunks(per_dir).enumerate() {
        let dir = tmp.path().join(format!("module_{i}"));
        fs::create_dir(&dir).expect("failed to create dir");
        for f in chunk {
            fs::write(
                dir.join(format!("file_{f}.md")),
                format!("# File {f}\n\nSome representative body text for file {f}.\n"),
            )
            .expect("failed to write file");
        }
    }
    // An excluded subtree the scanner must skip without reading.
    let skipped = tmp.path().join("node_modules");
    fs::create_dir(&skipped).expect("failed to create dir");
    for f in 0..per_dir {
        fs::write(skipped.join(format!("dep_{f}.js")), "module.exports = {};")
            .expect("failed to write file");
    }
    tmp
}

fn bench_options() -> ScanOptions {
    ScanOptions {
        threads: 4,
        timeout: Duration::from_secs(60),
        cancel: CancellationToken::new(),
        progress: None,
    }
}

/// Benchmark: exclusion decisions against a fully layered predicate.
fn bench_predicate_matching(c: &mut Criterion) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    fs::write(tmp.path().join(".gitignore"), "*.log\nbuild2/\n").expect("failed to write file");

    let resolver = IgnoreResolver::new();
    let config = IgnoreConfig {
        mode: IgnoreMode::Automatic,
        custom_patterns: vec!["*.bak".to_string(), "scratch/".to_string()],
    };
    let predicate = resolver
        .resolve(tmp.path(), &config)
        .expect("failed to resolve predicate");

    let mut group = c.benchmark_group("predicate_matching");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("included_path", |b| {
        b.iter(|| black_box(predicate.is_excluded(black_box("src/sync/scanner.rs"), false)));
    });

    group.bench_function("default_excluded_path", |b| {
        b.iter(|| black_box(predicate.is_excluded(black_box("node_modules/pkg/index.js"), false)));
    });

    group.bench_function("discovered_excluded_path", |b| {
        b.iter(|| black_box(predicate.is_excluded(black_box("logs/debug.log"), false)));
    });

    group.finish();
}

/// Benchmark: classification of a single file, cold cache per iteration.
fn bench_classification(c: &mut Criterion) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let text = tmp.path().join("source.rs");
    fs::write(&text, "fn main() {}\n".repeat(200)).expect("failed to write file");
    let binary = tmp.path().join("blob.bin");
    fs::write(&binary, vec![0u8; 4096]).expect("failed to write file");

    let mut group = c.benchmark_group("classification");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("text_file_cold", |b| {
        let classifier = FileClassifier::new(1024 * 1024);
        b.iter(|| {
            classifier.invalidate(&text);
            black_box(classifier.classify(&text));
        });
    });

    group.bench_function("text_file_cached", |b| {
        let classifier = FileClassifier::new(1024 * 1024);
        classifier.classify(&text);
        b.iter(|| black_box(classifier.classify(&text)));
    });

    group.bench_function("binary_by_extension", |b| {
        let classifier = FileClassifier::new(1024 * 1024);
        b.iter(|| {
            classifier.invalidate(&binary);
            black_box(classifier.classify(&binary));
        });
    });

    group.finish();
}

/// Benchmark: full scan over synthetic trees of increasing size.
fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_scan");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for count in &[100usize, 1000] {
        let tmp = create_tree(*count);
        let root = tmp
            .path()
            .canonicalize()
            .expect("failed to canonicalize root");
        let resolver = IgnoreResolver::new();
        let predicate = resolver
            .resolve(&root, &IgnoreConfig::default())
            .expect("failed to resolve predicate");

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                // Fresh classifier per iteration so every file is read.
                let classifier = FileClassifier::new(1024 * 1024);
                let outcome = scan_blocking(&root, &predicate, &classifier, &bench_options())
                    .expect("scan failed");
                assert_eq!(outcome.records.len(), count);
                black_box(outcome);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_predicate_matching,
    bench_classification,
    bench_full_scan,
);

criterion_main!(benches);
