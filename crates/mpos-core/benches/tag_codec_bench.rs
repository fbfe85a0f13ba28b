//! Criterion benchmarks for the tag mini-language codec.
//!
//! Tags are parsed once per submitted transaction and once per split-transfer
//! leg, and validated on every settings save.  These benchmarks keep an eye on
//! inputs far larger than anything typed by hand.
//!
//! Run with:
//! ```bash
//! cargo bench --package mpos-core --bench tag_codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mpos_core::codec::tags::{format_tags, parse_tags, validate_tags_format};

// ── Input builders ────────────────────────────────────────────────────────────

/// Builds `n` well-formed pairs: `key0:value0,key1:value1,...`.
fn well_formed(n: usize) -> String {
    (0..n)
        .map(|i| format!("key{i}:value{i}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds `n` pairs where every third pair is malformed.
fn mixed(n: usize) -> String {
    (0..n)
        .map(|i| {
            if i % 3 == 0 {
                format!("broken{i}")
            } else {
                format!("key{i}:value{i}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_tags");
    for n in [1usize, 10, 100] {
        let input = well_formed(n);
        group.bench_with_input(BenchmarkId::new("well_formed", n), &input, |b, input| {
            b.iter(|| parse_tags(black_box(input)))
        });
        let input = mixed(n);
        group.bench_with_input(BenchmarkId::new("mixed", n), &input, |b, input| {
            b.iter(|| parse_tags(black_box(input)))
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_tags_format");
    for n in [1usize, 10, 100] {
        let input = well_formed(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, input| {
            b.iter(|| validate_tags_format(black_box(input)))
        });
    }
    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let tags = parse_tags(&well_formed(100)).unwrap_or_default();
    c.bench_function("format_tags/100", |b| b.iter(|| format_tags(black_box(&tags))));
}

criterion_group!(benches, bench_parse, bench_validate, bench_format);
criterion_main!(benches);
