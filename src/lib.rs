//! fmi-washout: FMI borehole image washout segmentation
//!
//! Thresholds formation micro-imager channels into washout masks, reduces
//! them to per-depth washout curves, and reconciles the result with well
//! logs, drilling data and formation tops on a common depth axis.
//!
//! ## Architecture
//!
//! - **Processing**: mask/curve engine and sanitize → downsample → smooth conditioning
//! - **Tables**: depth-aligned merge, formation-tops normalization, cross-plots
//! - **Acquisition**: session-file discovery, `.npz` channel archives, CSV tables
//! - **Session**: state controller, command handlers and result export
//! - **Log view**: ordered depth tracks for the multi-track display

pub mod acquisition;
pub mod config;
pub mod logview;
pub mod processing;
pub mod session;
pub mod tables;
pub mod types;

// Re-export configuration
pub use config::{AnalysisConfig, ConfigError};

// Re-export core types
pub use types::{ChannelSet, Column, DepthTable, FormationTop, FormationTops, RawTable, TableError};

// Re-export engines
pub use processing::{compute_mask, compute_washout_curve, ConditioningParams, ProcessingError, WashoutCurve};
pub use tables::{
    merge, merge_sources, normalize_tops, pivot_to_zone_grid, prepare_cross_plot, CrossPlot,
    CrossPlotRequest, CurveCatalog, CurveSource, MergeError, TopsError, TopsOptions,
};

// Re-export session components
pub use acquisition::{ChannelSource, LoadError, NpzChannelSource};
pub use session::{LogTables, LogsContext, SessionChange, SessionController, SessionPhase};
