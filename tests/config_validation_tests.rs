//! Config Validation Tests
//!
//! Typo detection and range validation of the analysis config, exercised
//! independently from the rest of the pipeline.

use std::io::Write;

use fmi_washout::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use fmi_washout::config::{AnalysisConfig, ConfigError};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_threshold_warns_with_suggestion() {
    let toml_str = r#"
[processing]
default_treshold = 80
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("processing.default_threshold")
    );
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[processing]
downsample_stride = 5
smoothing_sigma = 1.5
sentinel_floor = -999.25
default_threshold = 120
default_aspect_ratio = 10

[channels]
recognized = ["DYN_HRUT", "STA_HRUT"]
depth_key = "TDEP"
session_extension = "npz"

[formation_tops]
expected_columns = 6
primary_label = "APPROVED"
secondary_label = "DRAFT"
open_end_offset = 5000.0
marker_value = 1.0
depth_step = 0.5

[logview]
default_curve_count = 4
features_to_log = ["RDEP", "RMED"]

[export]
table_dir = "csv"
mask_dir = "masks"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );

    let config = AnalysisConfig::from_toml_str(toml_str).expect("valid config");
    assert_eq!(config.channels.depth_key, "TDEP");
    assert_eq!(config.formation_tops.options().primary_label, "APPROVED");
    assert_eq!(config.processing.conditioning().stride, 5);
}

#[test]
fn multiple_typos_all_warned() {
    let toml_str = r#"
[chanels]
depth_key = "DEPT"

[export]
mask_dri = "masks"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.iter().any(|w| w.field == "chanels"));
    assert!(warnings.iter().any(|w| w.field == "export.mask_dri"));
}

#[test]
fn empty_toml_is_defaults() {
    assert!(validate_unknown_keys("").is_empty());
    let config = AnalysisConfig::from_toml_str("").expect("empty config");
    assert_eq!(config, AnalysisConfig::default());
}

#[test]
fn known_keys_set_is_complete() {
    let toml_str = AnalysisConfig::default()
        .to_toml()
        .expect("Default config should serialize");
    let warnings = validate_unknown_keys(&toml_str);
    assert!(
        warnings.is_empty(),
        "Default config serialization should produce 0 unknown-key warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    assert!(suggest_correction("zzz_completely_invalid_xyz_12345", &known).is_none());
}

#[test]
fn parse_reports_each_warning_once() {
    let toml_str = r#"
[processing]
default_treshold = 80
smoothing_sigma = 50.0
"#;
    let (config, warnings) = AnalysisConfig::parse_toml_str(toml_str).expect("warnings only");
    assert_eq!(config.processing.smoothing_sigma, 50.0);
    let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
    assert_eq!(
        fields,
        vec!["processing.default_treshold", "processing.smoothing_sigma"]
    );
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn zero_stride_fails_load() {
    let err = AnalysisConfig::from_toml_str("[processing]\ndownsample_stride = 0\n")
        .expect_err("zero stride must be rejected");
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("downsample_stride")));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn every_range_error_is_reported() {
    let mut config = AnalysisConfig::default();
    config.processing.smoothing_sigma = f64::NAN;
    config.formation_tops.depth_step = -1.0;
    config.formation_tops.marker_value = 0.0;
    let (errors, _) = validate_physical_ranges(&config);
    assert_eq!(errors.len(), 3, "got: {errors:?}");
}

#[test]
fn large_sigma_only_warns() {
    let mut config = AnalysisConfig::default();
    config.processing.smoothing_sigma = 50.0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings
        .iter()
        .any(|w| w.field == "processing.smoothing_sigma"));
}

#[test]
fn load_from_file_reports_path_on_parse_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[processing\ndownsample_stride = 3").expect("write");
    let err = AnalysisConfig::load_from_file(file.path()).expect_err("malformed toml");
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == file.path()));
}
