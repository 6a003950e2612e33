//! Commit-path benchmarks for the page store.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use pagevault_store::PageStore;

const PAGE_SIZE: u32 = 4096;

/// Benchmark a commit rewriting a fixed working set of pages.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/commit");

    for pages in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(pages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), &pages, |b, &pages| {
            let tmp = TempDir::new().unwrap();
            let mut store = PageStore::create(tmp.path().join("bench.pgv"), PAGE_SIZE).unwrap();

            let mut ids = Vec::new();
            store
                .modify(|txn| {
                    for _ in 0..pages {
                        ids.push(txn.allocate()?);
                    }
                    Ok(())
                })
                .unwrap();

            let data = vec![0xA5u8; PAGE_SIZE as usize];
            b.iter(|| {
                store
                    .modify(|txn| {
                        for &id in &ids {
                            txn.write(id, &data)?;
                        }
                        Ok(())
                    })
                    .unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark the allocate/free reclamation cycle.
fn bench_allocate_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/allocate_free");

    group.bench_function("cycle", |b| {
        let tmp = TempDir::new().unwrap();
        let mut store = PageStore::create(tmp.path().join("cycle.pgv"), PAGE_SIZE).unwrap();
        let data = vec![0x5Au8; PAGE_SIZE as usize];

        b.iter(|| {
            let id = store
                .modify(|txn| {
                    let id = txn.allocate()?;
                    txn.write(id, &data)?;
                    Ok(id)
                })
                .unwrap();
            store.modify(|txn| txn.free(id)).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_commit, bench_allocate_free);
criterion_main!(benches);
