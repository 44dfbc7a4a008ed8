// ============================================================================
// Stock Ledger Benchmarks
// ============================================================================
//
// Benchmark Categories:
// 1. Single-product reserve/release and reserve/commit cycles
// 2. Contended traffic on one product vs. spread across products
// 3. Multi-product order confirmation (commit_all)
// ============================================================================

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use order_engine::prelude::*;
use std::sync::Arc;
use std::thread;

fn tracked_ledger(products: usize, on_hand: u32) -> (StockLedger, Vec<ProductId>) {
    let ledger = StockLedger::new();
    let ids: Vec<ProductId> = (0..products).map(|_| ProductId::new()).collect();
    for id in &ids {
        ledger.track(*id, on_hand);
    }
    (ledger, ids)
}

// ============================================================================
// Single-Product Cycles
// ============================================================================

fn benchmark_reserve_release(c: &mut Criterion) {
    let (ledger, ids) = tracked_ledger(1, u32::MAX);
    let product = ids[0];

    c.bench_function("reserve_release_cycle", |b| {
        b.iter(|| {
            ledger.reserve(black_box(product), Quantity::ONE).unwrap();
            ledger.release(black_box(product), Quantity::ONE).unwrap();
        });
    });
}

fn benchmark_reserve_commit(c: &mut Criterion) {
    c.bench_function("reserve_commit_cycle", |b| {
        b.iter_batched(
            || tracked_ledger(1, 1_000_000),
            |(ledger, ids)| {
                for _ in 0..1_000 {
                    ledger.reserve(ids[0], Quantity::ONE).unwrap();
                    ledger.commit(ids[0], Quantity::ONE).unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

// ============================================================================
// Contention: One Product vs. Many
// ============================================================================

fn benchmark_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    const THREADS: usize = 4;
    const OPS: usize = 2_000;

    for products in [1usize, THREADS] {
        group.bench_with_input(
            BenchmarkId::new("threads_4", products),
            &products,
            |b, &products| {
                b.iter_batched(
                    || {
                        let (ledger, ids) = tracked_ledger(products, u32::MAX);
                        (Arc::new(ledger), ids)
                    },
                    |(ledger, ids)| {
                        let handles: Vec<_> = (0..THREADS)
                            .map(|t| {
                                let ledger = Arc::clone(&ledger);
                                let product = ids[t % products];
                                thread::spawn(move || {
                                    for _ in 0..OPS {
                                        ledger.reserve(product, Quantity::ONE).unwrap();
                                        ledger.release(product, Quantity::ONE).unwrap();
                                    }
                                })
                            })
                            .collect();
                        for handle in handles {
                            handle.join().unwrap();
                        }
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

// ============================================================================
// Multi-Product Confirmation
// ============================================================================

fn benchmark_commit_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_all");

    for lines in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter_batched(
                || {
                    let (ledger, ids) = tracked_ledger(lines, 1_000);
                    let order: Vec<(ProductId, u32)> =
                        ids.iter().map(|id| (*id, 1u32)).collect();
                    for (id, _) in &order {
                        ledger.reserve(*id, Quantity::ONE).unwrap();
                    }
                    (ledger, order)
                },
                |(ledger, order)| {
                    ledger.commit_all(black_box(&order)).unwrap();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_reserve_release,
    benchmark_reserve_commit,
    benchmark_contention,
    benchmark_commit_all
);
criterion_main!(benches);
