//! Benchmarks for the diff generator and rule evaluator.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use surface_diff::analyzer::{load_rule_set, Analyzer};
use surface_diff::diff::{diff_observations, CompareResult};
use surface_diff::model::{Observation, ObservationData, Platform, UserAccountObject};

fn user(run: &str, groups: &[&str], shell: &str) -> Observation {
    Observation::new(
        run,
        ObservationData::User(UserAccountObject {
            name: "deploy".to_string(),
            uid: Some("1001".to_string()),
            shell: Some(shell.to_string()),
            groups: groups.iter().map(|g| (*g).to_string()).collect(),
            privileged: Some(groups.contains(&"wheel")),
            ..Default::default()
        }),
    )
}

fn benchmark_diff_generation(c: &mut Criterion) {
    let before = user("r1", &["deploy", "docker"], "/bin/bash");
    let after = user("r2", &["deploy", "docker", "wheel"], "/bin/sh");

    c.bench_function("diff_observations_user", |b| {
        b.iter(|| black_box(diff_observations(black_box(&before), black_box(&after))));
    });
}

fn benchmark_analysis(c: &mut Criterion) {
    let analyzer = Analyzer::new(Arc::new(load_rule_set(None)));
    let before = user("r1", &["deploy"], "/bin/bash");
    let after = user("r2", &["deploy", "wheel"], "/bin/bash");
    let diffs = diff_observations(&before, &after);
    let result = CompareResult::modified(before, after, diffs);

    c.bench_function("analyze_modified_user", |b| {
        b.iter(|| black_box(analyzer.analyze(black_box(&result), Platform::Linux)));
    });
}

criterion_group!(benches, benchmark_diff_generation, benchmark_analysis);
criterion_main!(benches);
