//! Benchmarks for read-pair discovery.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use genoflow::discovery::{FilePairMatcher, ReadConvention};
use std::path::PathBuf;

fn synthetic_listing(samples: usize) -> Vec<PathBuf> {
    let mut files = Vec::with_capacity(samples * 2 + samples / 10);
    for i in 0..samples {
        files.push(PathBuf::from(format!("/reads/S{i:05}_L001_R1_001.fastq.gz")));
        files.push(PathBuf::from(format!("/reads/S{i:05}_L001_R2_001.fastq.gz")));
        if i % 10 == 0 {
            files.push(PathBuf::from(format!("/reads/orphan{i:05}_1.fq")));
        }
    }
    files
}

fn discovery_benchmark(c: &mut Criterion) {
    let matcher = FilePairMatcher::new(ReadConvention::default()).unwrap();

    c.bench_function("classify", |b| {
        let convention = matcher.convention();
        b.iter(|| convention.classify(black_box("S00042_L001_R2_001.fastq.gz")));
    });

    for samples in [100, 10_000] {
        let files = synthetic_listing(samples);
        c.bench_function(&format!("pair_files_{samples}"), |b| {
            b.iter(|| matcher.pair_files(black_box(files.clone())));
        });
    }

    let dir = tempfile::tempdir().unwrap();
    for i in 0..500 {
        std::fs::write(dir.path().join(format!("S{i:03}_R1.fastq")), b"@r\nA\n+\nI\n").unwrap();
        std::fs::write(dir.path().join(format!("S{i:03}_R2.fastq")), b"@r\nA\n+\nI\n").unwrap();
    }
    c.bench_function("discover_dir_500", |b| {
        b.iter(|| matcher.discover(black_box(dir.path())).unwrap());
    });
}

criterion_group!(benches, discovery_benchmark);
criterion_main!(benches);
