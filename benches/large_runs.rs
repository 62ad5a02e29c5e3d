//! Performance benchmarks for comparing large runs.
//!
//! Run with: cargo bench --bench large_runs
//!
//! Covers the identity hash-join, per-pair diffing and the full engine
//! with analysis over runs of increasing size.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;
use std::sync::Arc;
use surface_diff::analyzer::{Analyzer, load_rule_set};
use surface_diff::diff::{CompareEngine, diff_pairs, partition_identities, reconcile};
use surface_diff::model::{
    FileSystemObject, Observation, ObservationData, OpenPortObject, Platform, Run,
};
use surface_diff::storage::{MemoryStore, ObservationStore};

fn file(run: &str, i: usize, revision: usize) -> Observation {
    let mut permissions = BTreeMap::new();
    permissions.insert("owner".to_string(), "rwx".to_string());
    permissions.insert("group".to_string(), (if revision > 0 { "rw" } else { "r" }).to_string());
    Observation::new(
        run,
        ObservationData::File(FileSystemObject {
            path: format!("/srv/app/lib/module_{i}.so"),
            is_executable: i % 7 == 0,
            size: Some((i * 512) as u64),
            permissions,
            content_hash: Some(format!("{:016x}", i * 31 + revision)),
            characteristics: vec!["elf".to_string(), format!("class{}", i % 3)],
            ..Default::default()
        }),
    )
}

fn port(run: &str, i: usize, revision: usize) -> Observation {
    Observation::new(
        run,
        ObservationData::Port(OpenPortObject {
            address: "0.0.0.0".to_string(),
            port: (1024 + i % 60000) as u16,
            protocol: (if i % 2 == 0 { "TCP" } else { "UDP" }).to_string(),
            process_name: Some(format!("svc{}", i % 50 + revision)),
            ..Default::default()
        }),
    )
}

/// Two runs of `size` files and `size / 10` ports; `change_percent` of each
/// kind is modified, and as many again created and deleted.
fn generate_store(size: usize, change_percent: usize) -> Arc<MemoryStore> {
    let changes = size * change_percent / 100;
    let ports = size / 10;
    let port_changes = ports * change_percent / 100;

    let mut before = Vec::with_capacity(size + ports);
    let mut after = Vec::with_capacity(size + ports);
    for i in 0..size {
        before.push(file("before", i, 0));
        let revision = usize::from(i < changes);
        if i >= size - changes {
            continue;
        }
        after.push(file("after", i, revision));
    }
    for i in size..size + changes {
        after.push(file("after", i, 0));
    }
    for i in 0..ports {
        before.push(port("before", i, 0));
        after.push(port("after", i, usize::from(i < port_changes)));
    }

    let store = Arc::new(MemoryStore::new());
    for (id, observations) in [("before", before), ("after", after)] {
        store
            .insert_run(Run::new(id).with_platform(Platform::Linux), observations)
            .unwrap();
    }
    store
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_identities");

    for size in [1_000, 10_000, 100_000] {
        let first: Vec<(String, String)> = (0..size)
            .map(|i| (format!("id{i}"), format!("h{i}")))
            .collect();
        let second: Vec<(String, String)> = (size / 10..size + size / 10)
            .map(|i| (format!("id{i}"), format!("h{}", i + usize::from(i % 20 == 0))))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(partition_identities(black_box(&first), black_box(&second))));
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for size in [1_000, 10_000, 50_000] {
        let store = generate_store(size, 10);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let _ = black_box(reconcile(store.as_ref(), Some("before"), Some("after")));
            });
        });
    }

    group.finish();
}

fn bench_diff_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_pairs");

    for size in [100, 1_000, 10_000] {
        let pairs: Vec<(Observation, Observation)> = (0..size)
            .map(|i| (file("before", i, 0), file("after", i, 1)))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(diff_pairs(black_box(&pairs))));
        });
    }

    group.finish();
}

fn bench_compare_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare_runs");
    group.sample_size(20);

    let analyzer = Analyzer::new(Arc::new(load_rule_set(None)));
    for size in [1_000, 10_000, 50_000] {
        let store = generate_store(size, 10);
        let engine = CompareEngine::new(store)
            .with_analyzer(analyzer.clone())
            .force(true);

        group.bench_with_input(BenchmarkId::new("analyzed", size), &size, |b, _| {
            b.iter(|| {
                let _ = black_box(engine.compare_runs(Some("before"), Some("after"), true));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_partition,
    bench_reconcile,
    bench_diff_pairs,
    bench_compare_scaling,
);

criterion_main!(benches);
