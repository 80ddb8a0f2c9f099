//! Performance benchmarks for the read path
//!
//! This benchmark suite measures:
//! - Dispatcher `get` on a warm cache vs. a cold cache
//! - Dispatcher `list` over a hundred live rows
//! - Envelope encode and decode for a product row
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use crud_kit::backend::InMemoryBackend;
use crud_kit::models::Product;
use crud_kit::repository::InMemoryStore;
use crud_kit::{CacheGateway, Dispatcher, Entity};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

// ============================================================================
// Benchmark Fixtures
// ============================================================================

/// Dispatcher over `rows` products, each with a description of `size` bytes.
fn seeded(rt: &tokio::runtime::Runtime, rows: usize, size: usize) -> Dispatcher<Product> {
    let dispatcher = Dispatcher::new(
        Arc::new(InMemoryStore::<Product>::new()),
        CacheGateway::new(Arc::new(InMemoryBackend::new())),
    );
    rt.block_on(async {
        for i in 0..rows {
            dispatcher
                .create(json!({
                    "name": format!("product {}", i),
                    "description": "x".repeat(size),
                    "price": 9.99,
                    "stock": 10,
                }))
                .await
                .expect("Failed to seed product");
        }
    });
    dispatcher
}

// ============================================================================
// Group 1: Dispatcher read path
// ============================================================================

fn dispatcher_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher_get");

    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in [100, 1_000, 10_000].iter() {
        // Warm cache: lookup + envelope decode
        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("cache_hit", size), size, |b, &size| {
                let dispatcher = seeded(&rt, 1, size);
                rt.block_on(async {
                    dispatcher.get("1").await.expect("Failed to warm cache");
                });

                b.to_async(&rt)
                    .iter(|| async { dispatcher.get(black_box("1")).await });
            });

        // Cold cache: lookup + store read + encode + populate
        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("cache_miss", size), size, |b, &size| {
                let dispatcher = seeded(&rt, 1, size);

                b.to_async(&rt).iter(|| async {
                    dispatcher.cache().invalidate("products:1").await;
                    dispatcher.get(black_box("1")).await
                });
            });
    }

    group.bench_function("list_100", |b| {
        let dispatcher = seeded(&rt, 100, 100);

        b.to_async(&rt)
            .iter(|| async { dispatcher.list(black_box(false)).await });
    });

    group.finish();
}

// ============================================================================
// Group 2: Envelope
// ============================================================================

fn serialization_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in [100, 1_000, 10_000].iter() {
        let dispatcher = seeded(&rt, 1, *size);
        let product = rt
            .block_on(dispatcher.get("1"))
            .expect("Failed to load product");

        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("serialize", size), &product, |b, product| {
                b.iter(|| product.serialize_for_cache());
            });

        let serialized = product.serialize_for_cache().unwrap();
        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(
                BenchmarkId::new("deserialize", size),
                &serialized,
                |b, serialized| {
                    b.iter(|| Product::deserialize_from_cache(black_box(serialized)));
                },
            );
    }

    group.finish();
}

// ============================================================================
// Benchmark Registration
// ============================================================================

criterion_group!(benches, dispatcher_benchmarks, serialization_benchmarks);
criterion_main!(benches);
