//! Analysis Configuration Module
//!
//! Processing constants loaded from TOML, so thresholds, conditioning and
//! tops normalization can be tuned per deployment without a rebuild.
//!
//! ## Loading Order
//!
//! 1. `FMI_WASHOUT_CONFIG` environment variable (path to TOML file)
//! 2. `fmi_washout.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(AnalysisConfig::load());
//! let stride = config::get().processing.downsample_stride;
//! ```

mod analysis_config;
pub mod validation;

pub use analysis_config::*;

use std::sync::OnceLock;

/// Global analysis configuration, initialized once at startup.
static ANALYSIS_CONFIG: OnceLock<AnalysisConfig> = OnceLock::new();

/// Initialize the global configuration. Later calls are ignored with a warning.
pub fn init(config: AnalysisConfig) {
    if ANALYSIS_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Panics if `init()` has not been called: a missing config is a startup
/// bug, not a recoverable condition.
#[allow(clippy::expect_used)]
pub fn get() -> &'static AnalysisConfig {
    ANALYSIS_CONFIG
        .get()
        .expect("config::get() called before config::init(), this is a startup bug")
}

pub fn is_initialized() -> bool {
    ANALYSIS_CONFIG.get().is_some()
}
