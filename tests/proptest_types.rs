//! Property-based tests for reconciliation, diffing and analysis.
//!
//! Random runs and observations check that the comparison invariants hold
//! for every input, not just the hand-written scenarios.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use surface_diff::{
    analyzer::{Analyzer, Clause, Operation, Rule, RuleDocument, RuleMeta, RuleSet},
    diff::{diff_observations, partition_identities, ChangeType, CompareEngine, CompareResult},
    model::{
        Observation, ObservationData, OpenPortObject, Platform, ResultType, Run, Severity,
        UserAccountObject,
    },
    storage::{MemoryStore, ObservationStore},
};

fn severity() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

fn identity_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-f]{1,2}", "[0-3]"), 0..40)
}

fn user() -> impl Strategy<Value = UserAccountObject> {
    (
        "[a-z]{1,8}",
        prop::option::of("/bin/(ba|z|fi)?sh"),
        prop::collection::btree_set("[a-z]{1,6}", 0..6),
        prop::collection::btree_map("[a-z]{1,4}", "[a-z0-9]{0,4}", 0..5),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(name, shell, groups, properties, privileged)| UserAccountObject {
            name,
            shell,
            groups: groups.into_iter().collect(),
            properties,
            privileged,
            ..Default::default()
        })
}

fn port() -> impl Strategy<Value = OpenPortObject> {
    (1u16..1024, prop::option::of("[a-z]{1,8}")).prop_map(|(port, process_name)| OpenPortObject {
        address: "0.0.0.0".to_string(),
        port,
        protocol: "TCP".to_string(),
        process_name,
        ..Default::default()
    })
}

fn analyzer(rules: Vec<Rule>, defaults: BTreeMap<ResultType, Severity>) -> Analyzer {
    let document = RuleDocument {
        rules,
        meta: RuleMeta {
            default_levels: defaults,
        },
    };
    Analyzer::new(Arc::new(RuleSet::new(document).unwrap()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn identity_partition_is_exact(first in identity_pairs(), second in identity_pairs()) {
        let partition = partition_identities(&first, &second);

        let union: BTreeSet<&str> = first
            .iter()
            .chain(&second)
            .map(|(id, _)| id.as_str())
            .collect();
        prop_assert_eq!(partition.total(), union.len());

        let mut seen = BTreeSet::new();
        for id in partition
            .only_in_first
            .iter()
            .chain(&partition.only_in_second)
            .chain(&partition.modified)
            .chain(&partition.unchanged)
        {
            prop_assert!(seen.insert(id.clone()), "{} in two buckets", id);
        }

        let second_ids: BTreeSet<&str> = second.iter().map(|(id, _)| id.as_str()).collect();
        for id in &partition.only_in_first {
            prop_assert!(!second_ids.contains(id.as_str()));
        }
    }

    #[test]
    fn diffs_mirror_when_swapped(a in user(), b in user()) {
        let a = Observation::new("r1", ObservationData::User(a));
        let b = Observation::new("r2", ObservationData::User(b));
        let forward = diff_observations(&a, &b);
        let backward = diff_observations(&b, &a);
        let mirrored: Vec<_> = forward.iter().map(|d| d.mirrored()).collect();
        prop_assert_eq!(mirrored, backward);
    }

    #[test]
    fn identical_copy_yields_nothing(users in prop::collection::vec(user(), 0..20),
                                     ports in prop::collection::vec(port(), 0..20)) {
        let data: Vec<ObservationData> = users
            .into_iter()
            .map(ObservationData::User)
            .chain(ports.into_iter().map(ObservationData::Port))
            .collect();
        let store = Arc::new(MemoryStore::new());
        for run_id in ["original", "copy"] {
            let observations = data
                .iter()
                .cloned()
                .map(|d| Observation::new(run_id, d))
                .collect();
            store.insert_run(Run::new(run_id), observations).unwrap();
        }

        let outcome = CompareEngine::new(store)
            .compare_runs(Some("original"), Some("copy"), false)
            .unwrap();
        prop_assert_eq!(outcome.total(), 0);
        prop_assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn analysis_is_deterministic(p in port(), flag in severity(), bound in 1i64..1024) {
        let datum = bound.to_string();
        let rule = Rule::new("low ports", ResultType::Port, flag)
            .with_clause(Clause::new("Port", Operation::Lt, &[datum.as_str()]));
        let a = analyzer(vec![rule], BTreeMap::new());
        let result = CompareResult::created(None, Observation::new("r", ObservationData::Port(p)));
        let first = a.analyze(&result, Platform::Linux);
        for _ in 0..3 {
            prop_assert_eq!(&a.analyze(&result, Platform::Linux), &first);
        }
    }

    #[test]
    fn types_without_rules_get_their_default(u in user(), default in severity(),
                                             port_flag in severity()) {
        let rules = vec![Rule::new("any port", ResultType::Port, port_flag)];
        let a = analyzer(rules, BTreeMap::from([(ResultType::User, default)]));

        let obs = Observation::new("r", ObservationData::User(u));
        for result in [
            CompareResult::created(None, obs.clone()),
            CompareResult::deleted(obs, None),
        ] {
            let verdict = a.analyze(&result, Platform::Windows);
            prop_assert_eq!(verdict.severity, default);
            prop_assert!(verdict.matched.is_empty());
        }
    }

    #[test]
    fn most_severe_match_wins(p in port(), s1 in severity(), s2 in severity()) {
        let rules = vec![
            Rule::new("first", ResultType::Port, s1),
            Rule::new("second", ResultType::Port, s2)
                .with_change_types(vec![ChangeType::Created]),
        ];
        let a = analyzer(rules, BTreeMap::new());
        let result = CompareResult::created(None, Observation::new("r", ObservationData::Port(p)));
        let verdict = a.analyze(&result, Platform::Macos);
        prop_assert_eq!(verdict.severity, s1.max(s2));
        prop_assert_eq!(verdict.matched.len(), 2);
    }

    #[test]
    fn severity_parse_is_case_insensitive(s in severity(), upper in any::<bool>()) {
        let text = if upper { s.as_str().to_uppercase() } else { s.as_str().to_lowercase() };
        prop_assert_eq!(text.parse::<Severity>().unwrap(), s);
    }
}
