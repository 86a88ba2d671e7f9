//! Formation-tops normalizer
//!
//! Tops spreadsheets come with inconsistent layouts: classification tags,
//! blank spacer columns, repeated header lines. Normalization:
//!
//! 1. Pick the row subset: rows tagged with the primary label, else rows
//!    tagged with the secondary label, else every row.
//! 2. Drop the tag column, then blank spacer columns if the layout is
//!    still too wide; exactly `expected_columns` must remain, mapped onto
//!    [`TOPS_SCHEMA`].
//! 3. Keep `TOP`/`FORMATION`, sort by `TOP`, derive `BOTTOM` from the next
//!    top. The deepest formation is open-ended: `BOTTOM = TOP + offset`.
//!
//! [`pivot_to_zone_grid`] then turns the intervals into one indicator
//! column per formation on a uniform depth grid.

use thiserror::Error;
use tracing::{debug, info};

use crate::types::{
    parse_number, Column, DepthTable, FormationTop, FormationTops, RawTable, TableError, TOPS_SCHEMA,
};

/// Column of `TOP` within [`TOPS_SCHEMA`].
const TOP_INDEX: usize = 0;
/// Column of `FORMATION` within [`TOPS_SCHEMA`].
const FORMATION_INDEX: usize = 2;
/// Upper bound on zone-grid rows.
pub const MAX_ZONE_GRID_ROWS: usize = 5_000_000;

/// Errors raised while normalizing a formation-tops file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopsError {
    #[error("Formation tops file must have {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Formation tops file has no rows with a numeric top depth")]
    NoRows,

    #[error("Zone grid depth step must be positive, got {0}")]
    InvalidStep(f64),

    #[error("Zone grid would need {rows} rows at depth step {step} (limit {limit})")]
    GridTooLarge { rows: f64, step: f64, limit: usize },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Normalization parameters, usually taken from the `[formation_tops]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct TopsOptions {
    pub expected_columns: usize,
    pub primary_label: String,
    pub secondary_label: String,
    pub open_end_offset: f64,
    pub marker_value: f64,
    pub depth_step: f64,
}

impl Default for TopsOptions {
    fn default() -> Self {
        Self {
            expected_columns: TOPS_SCHEMA.len(),
            primary_label: "FINAL".to_string(),
            secondary_label: "PRELIMINARY".to_string(),
            open_end_offset: 20_000.0,
            marker_value: 100.0,
            depth_step: 1.0,
        }
    }
}

fn is_label(cell: &str, label: &str) -> bool {
    !label.is_empty() && cell.trim().eq_ignore_ascii_case(label)
}

/// Row subset by classification label priority, and whether a label matched.
fn select_rows(raw: &RawTable, opts: &TopsOptions) -> (Vec<usize>, Option<String>) {
    for label in [&opts.primary_label, &opts.secondary_label] {
        let rows: Vec<usize> = raw
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.iter().any(|c| is_label(c, label)))
            .map(|(i, _)| i)
            .collect();
        if !rows.is_empty() {
            return (rows, Some(label.clone()));
        }
    }
    ((0..raw.rows.len()).collect(), None)
}

/// Parse a raw tops table into sorted intervals with derived bottoms.
///
/// A wrong column count is reported as [`TopsError::ColumnCount`]; no
/// attempt is made to guess which columns hold the data.
pub fn normalize_tops(raw: &RawTable, opts: &TopsOptions) -> Result<FormationTops, TopsError> {
    let (rows, label) = select_rows(raw, opts);

    let width = rows.iter().map(|&r| raw.rows[r].len()).max().unwrap_or(0);
    let column_cells = |c: usize| rows.iter().map(move |&r| raw.cell(r, c));
    let mut kept: Vec<usize> = (0..width)
        .filter(|&c| {
            !label
                .as_deref()
                .is_some_and(|l| column_cells(c).all(|cell| is_label(cell, l)))
        })
        .collect();
    if kept.len() > opts.expected_columns {
        kept.retain(|&c| column_cells(c).any(|cell| !cell.trim().is_empty()));
    }

    if kept.len() != opts.expected_columns {
        return Err(TopsError::ColumnCount {
            expected: opts.expected_columns,
            found: kept.len(),
        });
    }

    let (Some(&top_col), Some(&name_col)) = (kept.get(TOP_INDEX), kept.get(FORMATION_INDEX)) else {
        return Err(TopsError::ColumnCount {
            expected: TOPS_SCHEMA.len(),
            found: kept.len(),
        });
    };
    let mut records: Vec<(f64, String)> = Vec::new();
    for &r in &rows {
        let Some(top) = parse_number(raw.cell(r, top_col)) else {
            continue;
        };
        if !top.is_finite() {
            continue;
        }
        let record = (top, raw.cell(r, name_col).trim().to_string());
        if !records.contains(&record) {
            records.push(record);
        }
    }
    if records.is_empty() {
        return Err(TopsError::NoRows);
    }

    let tops = derive_bottoms(records, opts.open_end_offset);
    info!(
        formations = tops.len(),
        label = label.as_deref().unwrap_or("<none>"),
        "Normalized formation tops"
    );
    Ok(tops)
}

/// Sort `(top, formation)` records and derive each `BOTTOM` from the next
/// record's `TOP`; the last record is open-ended at `TOP + open_end_offset`.
pub fn derive_bottoms(mut records: Vec<(f64, String)>, open_end_offset: f64) -> FormationTops {
    records.sort_by(|a, b| a.0.total_cmp(&b.0));
    let next_tops: Vec<Option<f64>> = records
        .iter()
        .skip(1)
        .map(|(t, _)| Some(*t))
        .chain(std::iter::once(None))
        .collect();
    let intervals = records
        .into_iter()
        .zip(next_tops)
        .map(|((top, formation), next)| FormationTop {
            top,
            bottom: next.unwrap_or(top + open_end_offset),
            formation,
        })
        .collect();
    FormationTops { intervals }
}

/// Zone-indicator grid: one column per formation, `marker` inside the zone
/// and `0` outside, on a uniform depth grid from the shallowest to the
/// deepest top at `depth_step` increments.
///
/// Pivot rows sit at each top. Grid rows between tops copy the row above
/// them (forward fill), so a zone stays on until the next top.
pub fn pivot_to_zone_grid(
    tops: &FormationTops,
    depth_step: f64,
    marker: f64,
) -> Result<DepthTable, TopsError> {
    if !depth_step.is_finite() || depth_step <= 0.0 {
        return Err(TopsError::InvalidStep(depth_step));
    }
    if tops.is_empty() {
        return Ok(DepthTable::empty());
    }

    let names = tops.formation_names();

    // one pivot row per distinct top; several formations may share a top
    let mut pivot: Vec<(f64, Vec<f64>)> = Vec::new();
    for interval in &tops.intervals {
        let col = names
            .iter()
            .position(|n| *n == interval.formation)
            .unwrap_or_default();
        match pivot.iter_mut().find(|(d, _)| *d == interval.top) {
            Some((_, row)) => row[col] = marker,
            None => {
                let mut row = vec![0.0; names.len()];
                row[col] = marker;
                pivot.push((interval.top, row));
            }
        }
    }
    pivot.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (min, max) = (pivot[0].0, pivot[pivot.len() - 1].0);
    let mut depths: Vec<f64> = uniform_grid(min, max, depth_step)?;
    depths.extend(pivot.iter().map(|(d, _)| *d));
    depths.sort_by(f64::total_cmp);
    depths.dedup();

    let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(depths.len()); names.len()];
    let mut current = vec![0.0; names.len()];
    let mut next_pivot = 0;
    for &d in &depths {
        if next_pivot < pivot.len() && pivot[next_pivot].0 == d {
            current.clone_from(&pivot[next_pivot].1);
            next_pivot += 1;
        }
        for (col, v) in current.iter().enumerate() {
            values[col].push(*v);
        }
    }

    let columns = names
        .iter()
        .zip(values)
        .map(|(name, values)| Column {
            name: (*name).to_string(),
            values,
        })
        .collect();
    debug!(rows = depths.len(), zones = names.len(), "Built formation zone grid");
    Ok(DepthTable::new(depths, columns)?)
}

/// `min + k·step` for every `k` with a value strictly below `max`.
fn uniform_grid(min: f64, max: f64, step: f64) -> Result<Vec<f64>, TopsError> {
    let rows = ((max - min) / step).ceil();
    if !rows.is_finite() || rows > MAX_ZONE_GRID_ROWS as f64 {
        return Err(TopsError::GridTooLarge {
            rows,
            step,
            limit: MAX_ZONE_GRID_ROWS,
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = rows.max(0.0) as usize;
    Ok((0..n)
        .map(|k| (k as f64).mul_add(step, min))
        .filter(|&d| d < max)
        .collect())
}
