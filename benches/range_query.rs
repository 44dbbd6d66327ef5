//! Benchmarks for range statement building and identifier validation.

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use sqlkv::RangeRequest;
use sqlkv::storage::{Dialect, RangeQuery, validate_identifier};

fn bench_range_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_build");
    group.measurement_time(Duration::from_secs(5));

    let unbounded = RangeRequest::new("users");
    let bounded = RangeRequest::new("users")
        .min("alice", true)
        .max("mallory", false)
        .limit(100)
        .descending();

    for dialect in [Dialect::Sqlite, Dialect::Postgres] {
        group.bench_with_input(
            BenchmarkId::new("unbounded", dialect.as_str()),
            &dialect,
            |b, &dialect| b.iter(|| RangeQuery::build(black_box(&unbounded), dialect)),
        );
        group.bench_with_input(
            BenchmarkId::new("bounded", dialect.as_str()),
            &dialect,
            |b, &dialect| b.iter(|| RangeQuery::build(black_box(&bounded), dialect)),
        );
    }

    group.finish();
}

fn bench_identifier_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("identifier_validation");

    for len in [8usize, 64, 255] {
        let name = "t".repeat(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &name, |b, name| {
            b.iter(|| validate_identifier(black_box(name)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_range_build, bench_identifier_validation);
criterion_main!(benches);
