//! Result export and FMI-derived tables
//!
//! Per (file, threshold) the session writes a washout table
//! `{table_dir}/{stem}_{threshold}.csv` and the mask as an 8-bit PNG
//! `{mask_dir}/{stem}_{threshold}.png` (flagged pixels 255).

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::acquisition::write_depth_table;
use crate::config::ExportConfig;
use crate::processing::{downsample_slice, ProcessingError, WashoutCurve, MASK_OFF};
use crate::types::{Column, DepthTable, TableError};

/// Washout column of the exported table: flagged fraction of each row.
pub const WASHOUT_COLUMN: &str = "WASHOUT";

/// FMI porosity column: flagged percentage of each row.
pub const FMI_POROSITY_COLUMN: &str = "FMI_POROSITY";

const MASK_ON_GRAY: u8 = 255;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot create results folder '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write washout table '{}': {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Cannot write mask image '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Mask of {rows}x{cols} pixels is too large for an image")]
    MaskTooLarge { rows: usize, cols: usize },

    #[error("Depth vector has {depth} samples but the curve has {rows} rows")]
    DepthMismatch { depth: usize, rows: usize },

    #[error(transparent)]
    Build(#[from] TableError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

/// Files written by one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPaths {
    pub table: PathBuf,
    pub mask: PathBuf,
}

/// Output folders under a results folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    pub root: PathBuf,
    pub table_dir: PathBuf,
    pub mask_dir: PathBuf,
}

impl ExportLayout {
    /// Create the table and mask subfolders of `results`.
    pub fn prepare(results: &Path, config: &ExportConfig) -> Result<Self, ExportError> {
        let layout = Self {
            root: results.to_path_buf(),
            table_dir: results.join(&config.table_dir),
            mask_dir: results.join(&config.mask_dir),
        };
        for dir in [&layout.table_dir, &layout.mask_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(layout)
    }

    pub fn paths(&self, stem: &str, threshold: i64) -> ExportPaths {
        ExportPaths {
            table: self.table_dir.join(format!("{stem}_{threshold}.csv")),
            mask: self.mask_dir.join(format!("{stem}_{threshold}.png")),
        }
    }
}

/// `DEPTH` + `WASHOUT` (row count / mask width). Row indices stand in for
/// depth when the session file has no depth vector.
pub fn washout_table(depth: Option<&[f64]>, curve: &WashoutCurve) -> Result<DepthTable, ExportError> {
    let depth = resolve_depth(depth, curve)?;
    Ok(DepthTable::new(
        depth,
        vec![Column {
            name: WASHOUT_COLUMN.to_string(),
            values: curve.fractions(),
        }],
    )?)
}

/// Depth-sampled porosity-from-mask, `FMI_POROSITY = 100 × count / width`,
/// keeping every `stride`-th row like the other display tracks.
pub fn fmi_porosity_table(
    depth: Option<&[f64]>,
    curve: &WashoutCurve,
    stride: usize,
) -> Result<DepthTable, ExportError> {
    let depth = resolve_depth(depth, curve)?;
    Ok(DepthTable::new(
        downsample_slice(&depth, stride)?,
        vec![Column {
            name: FMI_POROSITY_COLUMN.to_string(),
            values: downsample_slice(&curve.percentages(), stride)?,
        }],
    )?)
}

fn resolve_depth(depth: Option<&[f64]>, curve: &WashoutCurve) -> Result<Vec<f64>, ExportError> {
    match depth {
        Some(d) if d.len() != curve.len() => Err(ExportError::DepthMismatch {
            depth: d.len(),
            rows: curve.len(),
        }),
        Some(d) => Ok(d.to_vec()),
        None => Ok((0..curve.len()).map(|r| r as f64).collect()),
    }
}

/// Mask as a grayscale image: flagged pixels 255, the rest 0.
pub fn mask_image(mask: ArrayView2<'_, u8>) -> Result<GrayImage, ExportError> {
    let (rows, cols) = mask.dim();
    let too_large = || ExportError::MaskTooLarge { rows, cols };
    let width = u32::try_from(cols).map_err(|_| too_large())?;
    let height = u32::try_from(rows).map_err(|_| too_large())?;
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let v = mask[[y as usize, x as usize]];
        Luma([if v == MASK_OFF { 0 } else { MASK_ON_GRAY }])
    }))
}

/// Write the washout table and mask image for one (file, threshold).
pub fn export_results(
    layout: &ExportLayout,
    stem: &str,
    threshold: i64,
    depth: Option<&[f64]>,
    curve: &WashoutCurve,
    mask: ArrayView2<'_, u8>,
) -> Result<ExportPaths, ExportError> {
    let paths = layout.paths(stem, threshold);

    let table = washout_table(depth, curve)?;
    let image = mask_image(mask)?;

    write_depth_table(&paths.table, &table).map_err(|source| ExportError::Table {
        path: paths.table.clone(),
        source,
    })?;
    image.save(&paths.mask).map_err(|source| ExportError::Image {
        path: paths.mask.clone(),
        source,
    })?;

    info!(
        table = %paths.table.display(),
        mask = %paths.mask.display(),
        threshold,
        "Exported segmentation results"
    );
    Ok(paths)
}
