//! Benchmark tests for the scanner and duplicate detector

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rootsweep::duplicates::DuplicateDetector;
use rootsweep::guard::PathGuard;
use rootsweep::scanner::{ScanOptions, TreeScanner};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Create a site with `file_count` cache files spread over `dir_count` directories.
fn create_benchmark_site(file_count: usize, dir_count: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("wp-content/cache");

    let files_per_dir = file_count / dir_count.max(1);

    for d in 0..dir_count {
        let subdir = cache.join(format!("dir{}", d));
        fs::create_dir_all(&subdir).unwrap();

        for f in 0..files_per_dir {
            let mut file = File::create(subdir.join(format!("page{}.html", f))).unwrap();
            // every tenth file shares content with another
            let fill = if f % 10 == 0 { b'x' } else { b'a' + (f % 26) as u8 };
            file.write_all(&vec![fill; 1024 + f]).unwrap();
        }
    }

    dir
}

fn options() -> ScanOptions {
    ScanOptions::new()
        .with_roots(vec![PathBuf::from("wp-content/cache")])
        .with_min_age(Duration::from_secs(30 * 86_400))
}

fn benchmark_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");

    for size in [100, 500, 1000].iter() {
        let dir = create_benchmark_site(*size, 10);
        let guard = PathGuard::new(dir.path()).unwrap();

        group.bench_with_input(BenchmarkId::new("walk", size), size, |b, _| {
            b.iter(|| TreeScanner::new(black_box(&guard), options()).scan())
        });
    }

    group.finish();
}

fn benchmark_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("duplicates");

    for size in [100, 1000].iter() {
        let dir = create_benchmark_site(*size, 10);
        let guard = PathGuard::new(dir.path()).unwrap();
        let report = TreeScanner::new(&guard, options()).scan();
        let detector = DuplicateDetector::new(10 * 1024 * 1024);

        group.bench_with_input(BenchmarkId::new("detect", size), size, |b, _| {
            b.iter(|| detector.detect(black_box(&report)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_scan, benchmark_duplicates);
criterion_main!(benches);
