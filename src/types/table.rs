//! Depth-indexed tables
//!
//! Every tabular input (well logs, drilling curves, FMI-derived curves,
//! formation zone grids) is reduced to a [`DepthTable`]: one depth column
//! plus named numeric feature columns of equal length. Missing samples are
//! `NaN`. Raw files arrive first as a [`RawTable`] of strings so that the
//! formation-tops normalizer can work with mixed text/number layouts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical name of the depth column shared by every merged table.
pub const DEPTH_COLUMN: &str = "DEPTH";

/// Errors raised while building or reshaping tables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("No depth column found (looked for a header containing 'depth' without 'orig')")]
    DepthColumnNotFound,

    #[error("Depth column '{0}' contains no numeric values")]
    EmptyDepth(String),
}

/// One named numeric feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Rectangular table with a designated depth column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthTable {
    depth_name: String,
    depth: Vec<f64>,
    columns: Vec<Column>,
}

impl DepthTable {
    /// Build a table keyed by the canonical `DEPTH` column.
    pub fn new(depth: Vec<f64>, columns: Vec<Column>) -> Result<Self, TableError> {
        Self::with_depth_name(DEPTH_COLUMN, depth, columns)
    }

    /// Build a table whose depth column carries a source-specific name.
    pub fn with_depth_name(
        depth_name: impl Into<String>,
        depth: Vec<f64>,
        columns: Vec<Column>,
    ) -> Result<Self, TableError> {
        let depth_name = depth_name.into();
        let mut seen = std::collections::HashSet::new();
        seen.insert(depth_name.clone());
        for col in &columns {
            if col.values.len() != depth.len() {
                return Err(TableError::LengthMismatch {
                    column: col.name.clone(),
                    expected: depth.len(),
                    found: col.values.len(),
                });
            }
            if !seen.insert(col.name.clone()) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self {
            depth_name,
            depth,
            columns,
        })
    }

    /// A table with no rows and no features.
    pub fn empty() -> Self {
        Self {
            depth_name: DEPTH_COLUMN.to_string(),
            depth: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn depth_name(&self) -> &str {
        &self.depth_name
    }

    pub fn depth(&self) -> &[f64] {
        &self.depth
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    /// Feature column names in table order (depth column excluded).
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Whether the depth column already carries the canonical `DEPTH` name.
    pub fn is_canonical(&self) -> bool {
        self.depth_name == DEPTH_COLUMN
    }

    /// Rename the depth column to `DEPTH`.
    pub fn into_canonical(mut self) -> Self {
        self.depth_name = DEPTH_COLUMN.to_string();
        self
    }

    /// Keep only the named features, in the order given. Unknown names are skipped.
    pub fn select(&self, names: &[&str]) -> Self {
        let columns = names
            .iter()
            .filter_map(|n| self.columns.iter().find(|c| c.name == *n).cloned())
            .collect();
        Self {
            depth_name: self.depth_name.clone(),
            depth: self.depth.clone(),
            columns,
        }
    }

    /// Rows reordered by ascending depth. The sort is stable so rows sharing
    /// a depth keep their relative order.
    pub fn sorted_by_depth(&self) -> Self {
        let mut order: Vec<usize> = (0..self.depth.len()).collect();
        order.sort_by(|&a, &b| self.depth[a].total_cmp(&self.depth[b]));
        self.take_rows(&order)
    }

    /// Build a new table from the given row indices.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            depth_name: self.depth_name.clone(),
            depth: rows.iter().map(|&r| self.depth[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: rows.iter().map(|&r| c.values[r]).collect(),
                })
                .collect(),
        }
    }

    /// Column names, depth first.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.depth_name.clone())
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// Values of row `r`, depth first.
    pub fn row(&self, r: usize) -> Vec<f64> {
        std::iter::once(self.depth[r])
            .chain(self.columns.iter().map(|c| c.values[r]))
            .collect()
    }
}

/// Untyped table as read from disk: a header row and string cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Cell text, empty when the row is ragged.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }

    /// Index of the depth column: first header containing "depth"
    /// (case-insensitive) that does not also contain "orig".
    pub fn find_depth_column(&self) -> Option<usize> {
        self.headers.iter().position(|h| {
            let lower = h.to_lowercase();
            lower.contains("depth") && !lower.contains("orig")
        })
    }

    /// Convert into a canonical [`DepthTable`].
    ///
    /// The depth column is located with [`RawTable::find_depth_column`] and
    /// renamed to `DEPTH`. Rows without a numeric depth are dropped.
    /// Non-numeric cells become `NaN`; a column without a single numeric
    /// value (well names, comments) is dropped entirely.
    pub fn to_depth_table(&self) -> Result<DepthTable, TableError> {
        let depth_idx = self
            .find_depth_column()
            .ok_or(TableError::DepthColumnNotFound)?;

        let rows: Vec<&Vec<String>> = self
            .rows
            .iter()
            .filter(|r| r.get(depth_idx).and_then(|c| parse_number(c)).is_some())
            .collect();
        if rows.is_empty() {
            return Err(TableError::EmptyDepth(self.headers[depth_idx].clone()));
        }

        let depth: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.get(depth_idx).and_then(|c| parse_number(c)))
            .collect();

        let mut columns = Vec::new();
        for (idx, name) in self.headers.iter().enumerate() {
            if idx == depth_idx {
                continue;
            }
            let values: Vec<f64> = rows
                .iter()
                .map(|r| r.get(idx).and_then(|c| parse_number(c)).unwrap_or(f64::NAN))
                .collect();
            if values.iter().all(|v| v.is_nan()) {
                tracing::debug!(column = %name, "Dropping non-numeric column");
                continue;
            }
            columns.push(Column {
                name: name.trim().to_string(),
                values,
            });
        }

        DepthTable::new(depth, columns)
    }
}

/// Parse a numeric cell; blank and textual cells yield `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, values: &[f64]) -> Column {
        Column {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_new_rejects_ragged_column() {
        let err = DepthTable::new(vec![1.0, 2.0], vec![col("GR", &[1.0])]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_new_rejects_duplicate_feature() {
        let err = DepthTable::new(vec![1.0], vec![col("GR", &[1.0]), col("GR", &[2.0])]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("GR".to_string()));
    }

    #[test]
    fn test_sorted_by_depth_is_stable() {
        let t = DepthTable::new(
            vec![3.0, 1.0, 1.0],
            vec![col("GR", &[30.0, 10.0, 11.0])],
        )
        .unwrap();
        let s = t.sorted_by_depth();
        assert_eq!(s.depth(), &[1.0, 1.0, 3.0]);
        assert_eq!(s.column("GR").unwrap(), &[10.0, 11.0, 30.0]);
    }

    #[test]
    fn test_find_depth_column_skips_orig() {
        let raw = RawTable::new(
            vec!["Orig Depth".into(), "Measured Depth m".into(), "GR".into()],
            vec![],
        );
        assert_eq!(raw.find_depth_column(), Some(1));
    }

    #[test]
    fn test_to_depth_table_drops_text_columns() {
        let raw = RawTable::new(
            vec!["WELL".into(), "Depth".into(), "GR".into()],
            vec![
                vec!["15/9-F-9".into(), "1000.0".into(), "55".into()],
                vec!["15/9-F-9".into(), "1000.5".into(), "".into()],
                vec!["15/9-F-9".into(), "n/a".into(), "60".into()],
            ],
        );
        let t = raw.to_depth_table().unwrap();
        assert!(t.is_canonical());
        assert_eq!(t.depth(), &[1000.0, 1000.5]);
        assert_eq!(t.feature_names().collect::<Vec<_>>(), vec!["GR"]);
        let gr = t.column("GR").unwrap();
        assert_eq!(gr[0], 55.0);
        assert!(gr[1].is_nan());
    }

    #[test]
    fn test_to_depth_table_without_depth_header() {
        let raw = RawTable::new(vec!["MD".into(), "GR".into()], vec![]);
        assert_eq!(raw.to_depth_table(), Err(TableError::DepthColumnNotFound));
    }
}
