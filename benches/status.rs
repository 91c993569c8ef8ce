//! Benchmarks for revalidation status queries.
//!
//! Run with: `cargo bench`
//!
//! Performance targets:
//! - backoff tier selection < 100ns
//! - cached `get_activity_status()` (within re-check threshold) < 5µs
//! - directory fingerprint of 200 small posts < 10ms

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use revalidator::{
    ActivityManager, BackoffPolicy, Config, ContentSource, DirectorySource, MemorySource,
};
use tempfile::tempdir;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Benchmark tier selection across the default policy.
fn bench_backoff_select(c: &mut Criterion) {
    let policy = BackoffPolicy::default();
    c.bench_function("backoff_interval_for", |b| {
        let mut elapsed = 0u64;
        b.iter(|| {
            elapsed = (elapsed + 97_000) % 14_400_000;
            black_box(policy.interval_for(Duration::from_millis(elapsed)))
        });
    });
}

/// Benchmark a status query answered from cached state.
fn bench_cached_status(c: &mut Criterion) {
    let rt = runtime();
    let source = Arc::new(MemorySource::new("bench", "v1"));
    let manager = ActivityManager::new(Config::default(), source).unwrap();
    rt.block_on(manager.get_activity_status()).unwrap();

    c.bench_function("cached_activity_status", |b| {
        b.iter(|| rt.block_on(manager.get_activity_status()).unwrap());
    });
}

/// Benchmark fingerprinting a directory of posts.
fn bench_directory_fingerprint(c: &mut Criterion) {
    let rt = runtime();
    let dir = tempdir().unwrap();
    for i in 0..200 {
        let body = format!("---\ntitle: Post {i}\n---\n\n{}", "lorem ipsum ".repeat(50));
        std::fs::write(dir.path().join(format!("post-{i:03}.md")), body).unwrap();
    }
    let source = DirectorySource::new(dir.path());

    c.bench_function("directory_fingerprint_200", |b| {
        b.iter(|| rt.block_on(source.fingerprint()).unwrap());
    });
}

criterion_group!(
    benches,
    bench_backoff_select,
    bench_cached_status,
    bench_directory_fingerprint
);
criterion_main!(benches);
