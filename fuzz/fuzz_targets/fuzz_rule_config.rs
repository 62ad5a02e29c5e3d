#![no_main]
use libfuzzer_sys::fuzz_target;

/// Fuzz rule document parsing and compilation.
///
/// Arbitrary text goes through the strict loader, which parses the JSON
/// document and compiles every clause (regexes, integer bounds). Documents
/// that compile are then evaluated against a fixed result so operator code
/// paths see arbitrary clause data too.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(rules) = surface_diff::analyzer::load_rule_set_strict(s) else {
        return;
    };

    use surface_diff::diff::CompareResult;
    use surface_diff::model::{Observation, ObservationData, OpenPortObject, Platform};

    let observation = Observation::new(
        "fuzz",
        ObservationData::Port(OpenPortObject {
            address: "0.0.0.0".to_string(),
            port: 23,
            protocol: "TCP".to_string(),
            process_name: Some("telnetd".to_string()),
            ..Default::default()
        }),
    );
    let result = CompareResult::created(None, observation);
    let analyzer = surface_diff::analyzer::Analyzer::new(std::sync::Arc::new(rules));
    let _ = analyzer.analyze(&result, Platform::Linux);
});
