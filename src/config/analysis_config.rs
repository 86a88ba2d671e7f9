//! Analysis Configuration - operator-tunable processing constants
//!
//! Every constant governing segmentation, conditioning, tops normalization
//! and export is a field here. Each struct implements `Default` with the
//! stock values, so a missing config file changes nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::validation::ValidationWarning;
use crate::processing::ConditioningParams;
use crate::tables::TopsOptions;
use crate::types::{DEFAULT_DEPTH_KEY, DEFAULT_RECOGNIZED_CHANNELS, TOPS_SCHEMA};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FMI_WASHOUT_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "fmi_washout.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AnalysisConfig::load()` which searches:
/// 1. `$FMI_WASHOUT_CONFIG` env var
/// 2. `./fmi_washout.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Thresholding and display conditioning
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Session-file channel recognition
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Formation-tops normalization
    #[serde(default)]
    pub formation_tops: FormationTopsConfig,

    /// Multi-track log view
    #[serde(default)]
    pub logview: LogViewConfig,

    /// Result export layout
    #[serde(default)]
    pub export: ExportConfig,
}

impl AnalysisConfig {
    /// Load configuration using the standard search order:
    /// 1. `$FMI_WASHOUT_CONFIG` environment variable
    /// 2. `./fmi_washout.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded analysis config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded analysis config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys and range warnings are
    /// logged, never fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let (config, warnings) = Self::parse_toml_str(contents)?;
        for w in &warnings {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Parse and validate TOML text, returning the non-fatal warnings
    /// (unknown keys first, then physical ranges) instead of logging them.
    pub fn parse_toml_str(contents: &str) -> Result<(Self, Vec<ValidationWarning>), ConfigError> {
        let mut warnings = super::validation::validate_unknown_keys(contents);
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        warnings.extend(super::validation::validate_physical_ranges(&config).1);
        Ok((config, warnings))
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Every failing rule is collected; the error lists them all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let p = &self.processing;
        if p.downsample_stride == 0 {
            errors.push("processing.downsample_stride must be > 0".to_string());
        }
        if p.default_aspect_ratio == 0 {
            errors.push("processing.default_aspect_ratio must be > 0".to_string());
        }
        if p.default_threshold < 0 {
            errors.push(format!(
                "processing.default_threshold ({}) cannot be negative",
                p.default_threshold
            ));
        }

        let c = &self.channels;
        if c.recognized.is_empty() {
            errors.push("channels.recognized must list at least one channel".to_string());
        }
        if c.depth_key.trim().is_empty() {
            errors.push("channels.depth_key cannot be empty".to_string());
        }
        if c.session_extension.trim().is_empty() {
            errors.push("channels.session_extension cannot be empty".to_string());
        }

        let t = &self.formation_tops;
        if t.expected_columns < TOPS_SCHEMA.len() {
            errors.push(format!(
                "formation_tops.expected_columns ({}) must be at least {}",
                t.expected_columns,
                TOPS_SCHEMA.len()
            ));
        }
        if t.primary_label.trim().eq_ignore_ascii_case(t.secondary_label.trim()) {
            errors.push(format!(
                "formation_tops.primary_label and secondary_label must differ (both '{}')",
                t.primary_label
            ));
        }

        let e = &self.export;
        if e.table_dir == e.mask_dir {
            errors.push(format!(
                "export.table_dir and export.mask_dir must differ (both '{}')",
                e.table_dir
            ));
        }

        errors.extend(super::validation::validate_physical_ranges(self).0);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Processing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Keep every n-th row for display tracks
    #[serde(default = "default_downsample_stride")]
    pub downsample_stride: usize,

    /// Gaussian sigma in samples
    #[serde(default = "default_smoothing_sigma")]
    pub smoothing_sigma: f64,

    /// Samples strictly below this are "no data" (LAS null is -999.25)
    #[serde(default = "default_sentinel_floor")]
    pub sentinel_floor: f64,

    /// Threshold applied when a session starts
    #[serde(default = "default_threshold")]
    pub default_threshold: i64,

    /// Horizontal image stretch when a session starts
    #[serde(default = "default_aspect_ratio")]
    pub default_aspect_ratio: u32,
}

fn default_downsample_stride() -> usize { 10 }
fn default_smoothing_sigma() -> f64 { 2.0 }
fn default_sentinel_floor() -> f64 { -99.0 }
fn default_threshold() -> i64 { 100 }
fn default_aspect_ratio() -> u32 { 20 }

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            downsample_stride: default_downsample_stride(),
            smoothing_sigma: default_smoothing_sigma(),
            sentinel_floor: default_sentinel_floor(),
            default_threshold: default_threshold(),
            default_aspect_ratio: default_aspect_ratio(),
        }
    }
}

impl ProcessingConfig {
    pub fn conditioning(&self) -> ConditioningParams {
        ConditioningParams {
            sentinel_floor: self.sentinel_floor,
            stride: self.downsample_stride,
            sigma: self.smoothing_sigma,
        }
    }
}

// ============================================================================
// Channels
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channel names matched case-insensitively
    #[serde(default = "default_recognized")]
    pub recognized: Vec<String>,

    /// Archive entry holding the depth vector
    #[serde(default = "default_depth_key")]
    pub depth_key: String,

    /// Session files are the folder entries whose name contains this
    #[serde(default = "default_session_extension")]
    pub session_extension: String,
}

fn default_recognized() -> Vec<String> {
    DEFAULT_RECOGNIZED_CHANNELS.iter().map(|s| (*s).to_string()).collect()
}
fn default_depth_key() -> String { DEFAULT_DEPTH_KEY.to_string() }
fn default_session_extension() -> String { "npz".to_string() }

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            recognized: default_recognized(),
            depth_key: default_depth_key(),
            session_extension: default_session_extension(),
        }
    }
}

// ============================================================================
// Formation Tops
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationTopsConfig {
    /// Column count a tops sheet must have after filtering
    #[serde(default = "default_expected_columns")]
    pub expected_columns: usize,

    /// Rows tagged with this label win
    #[serde(default = "default_primary_label")]
    pub primary_label: String,

    /// Fallback tag when no primary rows exist
    #[serde(default = "default_secondary_label")]
    pub secondary_label: String,

    /// Extent of the deepest zone below its top
    #[serde(default = "default_open_end_offset")]
    pub open_end_offset: f64,

    /// Zone-indicator value inside a zone
    #[serde(default = "default_marker_value")]
    pub marker_value: f64,

    /// Zone grid resolution
    #[serde(default = "default_depth_step")]
    pub depth_step: f64,
}

fn default_expected_columns() -> usize { TOPS_SCHEMA.len() }
fn default_primary_label() -> String { "FINAL".to_string() }
fn default_secondary_label() -> String { "PRELIMINARY".to_string() }
fn default_open_end_offset() -> f64 { 20_000.0 }
fn default_marker_value() -> f64 { 100.0 }
fn default_depth_step() -> f64 { 1.0 }

impl Default for FormationTopsConfig {
    fn default() -> Self {
        Self {
            expected_columns: default_expected_columns(),
            primary_label: default_primary_label(),
            secondary_label: default_secondary_label(),
            open_end_offset: default_open_end_offset(),
            marker_value: default_marker_value(),
            depth_step: default_depth_step(),
        }
    }
}

impl FormationTopsConfig {
    pub fn options(&self) -> TopsOptions {
        TopsOptions {
            expected_columns: self.expected_columns,
            primary_label: self.primary_label.clone(),
            secondary_label: self.secondary_label.clone(),
            open_end_offset: self.open_end_offset,
            marker_value: self.marker_value,
            depth_step: self.depth_step,
        }
    }
}

// ============================================================================
// Log View
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogViewConfig {
    /// Features pre-selected for cross-plots
    #[serde(default = "default_curve_count")]
    pub default_curve_count: usize,

    /// Well-log features drawn on a logarithmic axis
    #[serde(default)]
    pub features_to_log: Vec<String>,
}

fn default_curve_count() -> usize { 3 }

impl Default for LogViewConfig {
    fn default() -> Self {
        Self {
            default_curve_count: default_curve_count(),
            features_to_log: Vec::new(),
        }
    }
}

// ============================================================================
// Export
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Subfolder of the results folder for washout tables
    #[serde(default = "default_table_dir")]
    pub table_dir: String,

    /// Subfolder of the results folder for mask images
    #[serde(default = "default_mask_dir")]
    pub mask_dir: String,
}

fn default_table_dir() -> String { "tables".to_string() }
fn default_mask_dir() -> String { "segmentation_results".to_string() }

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            table_dir: default_table_dir(),
            mask_dir: default_mask_dir(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
