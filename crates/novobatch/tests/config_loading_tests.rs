//! Table-driven tests for configuration loading and validation.

use assert_fs::prelude::*;

use novobatch::config::{load_config, load_config_from_str, ConfigFormat};
use novobatch::engine::Engine;
use novobatch::error::ConfigError;
use novobatch::export::ExportKind;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal_pepnovo",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "pepnovo": { "folder": "/opt/pepnovo" }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r##"{
            "spectrum_inputs": ["/data/a.mgf", "/data/more"],
            "output_folder": "/out",
            "threads": 4,
            "pepnovo": {
                "folder": "/opt/pepnovo",
                "model": "LTQ_COMP",
                "correct_precursor_mass": true,
                "format": { "title_token_offset": 1, "no_solution_prefixes": ["# No"] }
            },
            "novor": { "folder": "/opt/novor", "java_options": ["-Xmx4G"] },
            "search": {
                "fragment_tolerance": { "value": 0.02, "unit": "da" },
                "precursor_tolerance": { "value": 10, "unit": "ppm" },
                "digest": "non_specific",
                "num_solutions": 5
            },
            "modifications": [
                { "name": "Oxidation of M", "short_name": "ox", "mass": 15.994915, "kind": "residue", "residues": ["M"] },
                { "name": "Acetylation of peptide N-term", "mass": 42.010565, "kind": "n_term" }
            ],
            "export": { "threshold": 20, "greater_than": false, "max_matches": 3, "kinds": ["blast"] },
            "failure_policy": "cancel_run",
            "logging": { "level": "novobatch=debug", "format": "json" }
        }"##,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "no_engine",
        config_json: r#"{ "spectrum_inputs": ["/data"], "output_folder": "/out" }"#,
        should_succeed: false,
        expected_error: Some("At least one engine"),
    },
    ConfigTestCase {
        name: "no_inputs",
        config_json: r#"{
            "spectrum_inputs": [],
            "output_folder": "/out",
            "novor": { "folder": "/opt/novor" }
        }"#,
        should_succeed: false,
        expected_error: Some("No spectrum inputs"),
    },
    ConfigTestCase {
        name: "zero_threads",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "threads": 0,
            "novor": { "folder": "/opt/novor" }
        }"#,
        should_succeed: false,
        expected_error: Some("threads"),
    },
    ConfigTestCase {
        name: "negative_tolerance",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "novor": { "folder": "/opt/novor" },
            "search": { "fragment_tolerance": { "value": -0.5, "unit": "da" } }
        }"#,
        should_succeed: false,
        expected_error: Some("Fragment tolerance"),
    },
    ConfigTestCase {
        name: "duplicate_modification",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "novor": { "folder": "/opt/novor" },
            "modifications": [
                { "name": "Ox", "mass": 16.0, "kind": "residue", "residues": ["M"] },
                { "name": "Ox", "mass": 16.0, "kind": "residue", "residues": ["W"] }
            ]
        }"#,
        should_succeed: false,
        expected_error: Some("Ox"),
    },
    ConfigTestCase {
        name: "unknown_residue",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "novor": { "folder": "/opt/novor" },
            "modifications": [{ "name": "Ox", "mass": 16.0, "kind": "residue", "residues": ["9"] }]
        }"#,
        should_succeed: false,
        expected_error: None,
    },
    ConfigTestCase {
        name: "zero_max_matches",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "novor": { "folder": "/opt/novor" },
            "export": { "max_matches": 0 }
        }"#,
        should_succeed: false,
        expected_error: Some("max_matches"),
    },
    ConfigTestCase {
        name: "empty_isotope_range",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "novor": { "folder": "/opt/novor" },
            "export": { "min_isotope": 2, "max_isotope": 1 }
        }"#,
        should_succeed: false,
        expected_error: Some("Isotope range"),
    },
    ConfigTestCase {
        name: "empty_sentinel",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "pepnovo": { "folder": "/opt/pepnovo", "format": { "no_solution_prefixes": [""] } }
        }"#,
        should_succeed: false,
        expected_error: Some("no-solution prefixes"),
    },
    ConfigTestCase {
        name: "unknown_failure_policy",
        config_json: r#"{
            "spectrum_inputs": ["/data"],
            "output_folder": "/out",
            "novor": { "folder": "/opt/novor" },
            "failure_policy": "retry"
        }"#,
        should_succeed: false,
        expected_error: None,
    },
];

#[test]
fn test_json_config_loading() {
    for case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(case.config_json, ConfigFormat::Json);

        if case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}' should succeed but failed: {:?}",
                case.name,
                result.err()
            );
        } else {
            assert!(result.is_err(), "Test '{}' should fail but succeeded", case.name);
            if let Some(expected) = case.expected_error {
                let message = result.unwrap_err().to_string();
                assert!(
                    message.contains(expected),
                    "Test '{}': error '{}' does not mention '{}'",
                    case.name,
                    message,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_full_config_values() {
    let case = JSON_CONFIG_TESTS
        .iter()
        .find(|c| c.name == "valid_full")
        .unwrap();
    let config = load_config_from_str(case.config_json, ConfigFormat::Json).unwrap();

    assert_eq!(config.engines(), vec![Engine::PepNovo, Engine::Novor]);
    assert_eq!(config.threads, 4);
    assert_eq!(config.fragment_tolerance_da(), 0.02);
    assert!((config.search.precursor_tolerance.in_daltons() - 0.01).abs() < 1e-12);

    let pepnovo = config.pepnovo.as_ref().unwrap();
    assert_eq!(pepnovo.executable, "PepNovo_bin");
    assert_eq!(pepnovo.format.title_token_offset, 1);
    assert_eq!(pepnovo.format.no_solution_prefixes, vec!["# No"]);

    let novor = config.novor.as_ref().unwrap();
    assert_eq!(novor.java, std::path::PathBuf::from("java"));
    assert_eq!(novor.fragmentation, "HCD");

    assert!(!config.export.greater_than);
    assert_eq!(config.export.max_matches, 3);
    assert_eq!(config.export.kinds, vec![ExportKind::Blast]);
    assert_eq!(config.logging.level, "novobatch=debug");
}

#[test]
fn test_config_files_by_extension() {
    let temp = assert_fs::TempDir::new().unwrap();

    let yaml = temp.child("run.yml");
    yaml.write_str(
        "spectrum_inputs: [/data]\noutput_folder: /out\nnovor:\n  folder: /opt/novor\nexport:\n  kinds: [tags]\n",
    )
    .unwrap();
    let config = load_config(yaml.path()).unwrap();
    assert_eq!(config.engines(), vec![Engine::Novor]);
    assert_eq!(config.export.kinds, vec![ExportKind::Tags]);

    let json = temp.child("run.JSON");
    json.write_str(JSON_CONFIG_TESTS[0].config_json).unwrap();
    assert!(load_config(json.path()).is_ok());

    let toml = temp.child("run.toml");
    toml.touch().unwrap();
    assert!(matches!(
        load_config(toml.path()),
        Err(ConfigError::UnsupportedFormat(_))
    ));

    let broken = temp.child("broken.yaml");
    broken.write_str("spectrum_inputs: [").unwrap();
    assert!(matches!(
        load_config(broken.path()),
        Err(ConfigError::ParseYaml(_))
    ));

    temp.close().unwrap();
}
