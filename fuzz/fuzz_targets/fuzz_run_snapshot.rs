#![no_main]
use libfuzzer_sys::fuzz_target;

/// Fuzz run snapshot import.
///
/// Parsed snapshots are imported into a memory store and compared against
/// nothing, which exercises identity derivation, content hashing and the
/// single-run comparison path.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(snapshot) = surface_diff::storage::RunSnapshot::from_json(s) else {
        return;
    };

    let store = std::sync::Arc::new(surface_diff::storage::MemoryStore::new());
    let Ok((run_id, _)) = snapshot.import_into(store.as_ref()) else {
        return;
    };
    let engine = surface_diff::diff::CompareEngine::new(store);
    let _ = engine.compare_runs(None, Some(&run_id), false);
});
