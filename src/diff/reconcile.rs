//! Identity-based set reconciliation between two runs.
//!
//! Per [`ResultType`], both runs' `(identity, row key)` pairs are indexed and
//! joined on identity: identities on one side only are additions or
//! removals, identities on both sides with differing row keys are
//! modification candidates. Result types are reconciled in parallel.

use crate::error::{Result, SurfaceDiffError};
use crate::model::{Observation, ResultType};
use crate::storage::ObservationStore;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Identity-level partition of one result type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityPartition {
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
}

impl IdentityPartition {
    #[must_use]
    pub fn total(&self) -> usize {
        self.only_in_first.len() + self.only_in_second.len() + self.modified.len() + self.unchanged.len()
    }
}

/// Index `(identity, hash)` pairs; a repeated identity keeps its last hash.
fn index_pairs(pairs: &[(String, String)]) -> (IndexMap<&str, &str>, usize) {
    let mut index = IndexMap::with_capacity(pairs.len());
    let mut duplicates = 0;
    for (identity, hash) in pairs {
        if index.insert(identity.as_str(), hash.as_str()).is_some() {
            duplicates += 1;
        }
    }
    (index, duplicates)
}

/// Hash-join two identity sets.
///
/// Every distinct identity lands in exactly one of the four buckets.
#[must_use]
pub fn partition_identities(
    first: &[(String, String)],
    second: &[(String, String)],
) -> IdentityPartition {
    let (first_index, first_dupes) = index_pairs(first);
    let (second_index, second_dupes) = index_pairs(second);
    if first_dupes + second_dupes > 0 {
        tracing::debug!(
            first = first_dupes,
            second = second_dupes,
            "Duplicate identities within a run, keeping the last observation"
        );
    }

    let mut partition = IdentityPartition::default();
    for (identity, hash) in &first_index {
        match second_index.get(identity) {
            None => partition.only_in_first.push((*identity).to_string()),
            Some(other) if other != hash => partition.modified.push((*identity).to_string()),
            Some(_) => partition.unchanged.push((*identity).to_string()),
        }
    }
    partition.only_in_second = second_index
        .keys()
        .filter(|identity| !first_index.contains_key(*identity))
        .map(|identity| (*identity).to_string())
        .collect();
    partition
}

/// Observation-level reconciliation of one result type.
#[derive(Debug, Clone, Default)]
pub struct TypeReconciliation {
    pub only_in_first: Vec<Observation>,
    pub only_in_second: Vec<Observation>,
    pub modified_pairs: Vec<(Observation, Observation)>,
    pub unchanged: usize,
}

impl TypeReconciliation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.only_in_first.is_empty() && self.only_in_second.is_empty() && self.modified_pairs.is_empty()
    }
}

/// Reconciliation of two runs across all result types.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub by_type: Vec<(ResultType, TypeReconciliation)>,
    /// Result types whose storage queries failed
    pub failures: Vec<(ResultType, SurfaceDiffError)>,
}

impl Reconciliation {
    pub fn only_in_first(&self) -> impl Iterator<Item = &Observation> {
        self.by_type.iter().flat_map(|(_, t)| t.only_in_first.iter())
    }

    pub fn only_in_second(&self) -> impl Iterator<Item = &Observation> {
        self.by_type.iter().flat_map(|(_, t)| t.only_in_second.iter())
    }

    pub fn modified_pairs(&self) -> impl Iterator<Item = &(Observation, Observation)> {
        self.by_type.iter().flat_map(|(_, t)| t.modified_pairs.iter())
    }

    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.by_type.iter().map(|(_, t)| t.unchanged).sum()
    }
}

/// Reconcile two stored runs.
///
/// With `first` absent every observation of `second` is only-in-second; with
/// `second` absent every observation of `first` is only-in-first.
///
/// # Errors
///
/// Returns `InvalidArgument` when both run ids are absent and `RunNotFound`
/// when a named run does not exist. Per-type query failures are collected in
/// [`Reconciliation::failures`] instead.
pub fn reconcile(
    store: &dyn ObservationStore,
    first: Option<&str>,
    second: Option<&str>,
) -> Result<Reconciliation> {
    if first.is_none() && second.is_none() {
        return Err(SurfaceDiffError::invalid_argument(
            "at least one run id is required for reconciliation",
        ));
    }

    let mut types = BTreeSet::new();
    for run_id in [first, second].into_iter().flatten() {
        if !store.run_exists(run_id)? {
            return Err(SurfaceDiffError::run_not_found(run_id));
        }
        types.extend(store.result_types(run_id)?);
    }
    let types: Vec<ResultType> = types.into_iter().collect();

    tracing::debug!(
        first = first.unwrap_or("-"),
        second = second.unwrap_or("-"),
        types = types.len(),
        "Reconciling runs"
    );

    let outcomes: Vec<(ResultType, Result<TypeReconciliation>)> = types
        .par_iter()
        .map(|rt| (*rt, reconcile_type(store, first, second, *rt)))
        .collect();

    let mut reconciliation = Reconciliation::default();
    for (rt, outcome) in outcomes {
        match outcome {
            Ok(t) => reconciliation.by_type.push((rt, t)),
            Err(e) => {
                tracing::warn!(result_type = %rt, error = %e, "Skipping result type");
                reconciliation.failures.push((rt, e));
            }
        }
    }
    Ok(reconciliation)
}

fn identities(
    store: &dyn ObservationStore,
    run_id: Option<&str>,
    rt: ResultType,
) -> Result<Vec<(String, String)>> {
    match run_id {
        Some(id) => store.identities_and_hashes(id, rt),
        None => Ok(Vec::new()),
    }
}

fn reconcile_type(
    store: &dyn ObservationStore,
    first: Option<&str>,
    second: Option<&str>,
    rt: ResultType,
) -> Result<TypeReconciliation> {
    let first_pairs = identities(store, first, rt)?;
    let second_pairs = identities(store, second, rt)?;
    let partition = partition_identities(&first_pairs, &second_pairs);

    let mut out = TypeReconciliation {
        unchanged: partition.unchanged.len(),
        ..Default::default()
    };

    if let Some(first) = first {
        out.only_in_first = store.observations_by_identity(first, rt, &partition.only_in_first)?;
    }
    if let Some(second) = second {
        out.only_in_second =
            store.observations_by_identity(second, rt, &partition.only_in_second)?;
    }
    if let (Some(first), Some(second)) = (first, second)
        && !partition.modified.is_empty()
    {
        let before = store.observations_by_identity(first, rt, &partition.modified)?;
        let mut after: IndexMap<String, Observation> = store
            .observations_by_identity(second, rt, &partition.modified)?
            .into_iter()
            .map(|o| (o.identity.clone(), o))
            .collect();
        out.modified_pairs = before
            .into_iter()
            .filter_map(|b| after.swap_remove(&b.identity).map(|a| (b, a)))
            .collect();
    }
    Ok(out)
}
