use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use pagecraft_core::content::{compress, extract};
use pagecraft_core::normalize_path;
use serde_json::{json, Value};

fn sample_content(blocks: usize) -> Value {
    let elements: Vec<Value> = (0..blocks)
        .map(|i| {
            json!({
                "type": "block",
                "id": format!("block-{i}"),
                "data": {"text": "The quick brown fox jumps over the lazy dog.", "align": "left"},
            })
        })
        .collect();
    json!({ "type": "document", "elements": elements })
}

fn bench_compress(c: &mut Criterion) {
    let content = sample_content(200);

    c.bench_function("content_compress_200_blocks", |b| {
        b.iter(|| black_box(compress(Some(black_box(&content)))))
    });
}

fn bench_extract(c: &mut Criterion) {
    let blob = compress(Some(&sample_content(200)));

    c.bench_function("content_extract_200_blocks", |b| {
        b.iter(|| black_box(extract(black_box(&blob)).unwrap()))
    });
}

fn bench_normalize_path(c: &mut Criterion) {
    c.bench_function("normalize_path", |b| {
        b.iter(|| black_box(normalize_path(black_box("  /blog//2024///spring-release/  "))))
    });
}

criterion_group!(benches, bench_compress, bench_extract, bench_normalize_path);
criterion_main!(benches);
