//! Data acquisition: session-file discovery and loaders
//!
//! - `discovery`: enumerate session files in a folder
//! - `npz`: FMI channel containers stored as `.npz` archives
//! - `csv_tables`: CSV well-log, drilling and tops tables

mod csv_tables;
mod discovery;
mod npz;

pub use csv_tables::{read_depth_table, read_raw_table, write_depth_table};
pub use discovery::{list_session_files, session_stem};
pub use npz::NpzChannelSource;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{ChannelSet, TableError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("'{}' is not a folder", .0.display())]
    NotAFolder(PathBuf),

    #[error("Cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read session file '{}': {source}", path.display())]
    Npz {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpzError,
    },

    #[error("Entry '{entry}' in '{}' has an unexpected shape", path.display())]
    Shape { path: PathBuf, entry: String },

    #[error("Depth vector in '{}' is not finite and increasing at sample {index}", path.display())]
    DepthOrder { path: PathBuf, index: usize },

    #[error("Channel '{channel}' has {rows} rows but the depth vector has {depth}")]
    DepthMismatch {
        channel: String,
        rows: usize,
        depth: usize,
    },

    #[error("Cannot read table '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Table '{}': {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },
}

// ============================================================================
// Channel Source Trait
// ============================================================================

/// Deserializes one session file into its named channels and depth vector.
pub trait ChannelSource {
    fn load(&self, path: &Path) -> Result<ChannelSet, LoadError>;
}
