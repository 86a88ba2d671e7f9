//! Depth-aligned table merger
//!
//! Sequential full outer join of depth-indexed tables on `DEPTH`, followed
//! by an ascending depth sort. Missing samples stay `NaN`; nothing is
//! imputed. Empty tables are the identity element and are skipped.
//!
//! Feature names must be disjoint across the merged tables. A shared name
//! is rejected up front instead of letting one source overwrite the other.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{Column, DepthTable, TableError};

/// Errors raised while reconciling tables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("Table {index} is keyed by '{found}', expected 'DEPTH'")]
    NotCanonical { index: usize, found: String },

    #[error("Table {index} contains a non-finite depth value")]
    NonFiniteDepth { index: usize },

    #[error("Feature '{column}' appears in both table {first} and table {second}")]
    ColumnConflict {
        column: String,
        first: usize,
        second: usize,
    },

    #[error("Curve '{curve}' is provided by both {first} and {second} data")]
    DuplicateCurve {
        curve: String,
        first: CurveSource,
        second: CurveSource,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Origin of a selectable curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveSource {
    Logging,
    Drilling,
    FormationTops,
    Fmi,
}

impl std::fmt::Display for CurveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Logging => "well logging",
            Self::Drilling => "drilling",
            Self::FormationTops => "formation tops",
            Self::Fmi => "FMI",
        };
        f.write_str(name)
    }
}

/// Check that no feature name is shared by two non-empty tables.
///
/// Indices in the error refer to positions in `tables`.
pub fn ensure_disjoint_features(tables: &[&DepthTable]) -> Result<(), MergeError> {
    let mut owner: BTreeMap<&str, usize> = BTreeMap::new();
    for (index, table) in tables.iter().enumerate() {
        if table.is_empty() {
            continue;
        }
        for name in table.feature_names() {
            if let Some(&first) = owner.get(name) {
                return Err(MergeError::ColumnConflict {
                    column: name.to_string(),
                    first,
                    second: index,
                });
            }
            owner.insert(name, index);
        }
    }
    Ok(())
}

/// Full outer join of all non-empty tables on `DEPTH`, sorted ascending.
///
/// Every table must already be keyed by the canonical `DEPTH` column.
/// Rows sharing a depth within one table are kept; joining two groups of
/// equal depths yields every pairing of their rows.
pub fn merge(tables: &[&DepthTable]) -> Result<DepthTable, MergeError> {
    for (index, table) in tables.iter().enumerate() {
        if table.is_empty() {
            continue;
        }
        if !table.is_canonical() {
            return Err(MergeError::NotCanonical {
                index,
                found: table.depth_name().to_string(),
            });
        }
        if table.depth().iter().any(|d| !d.is_finite()) {
            return Err(MergeError::NonFiniteDepth { index });
        }
    }
    ensure_disjoint_features(tables)?;

    let mut non_empty = tables.iter().filter(|t| !t.is_empty());
    let Some(first) = non_empty.next() else {
        return Ok(DepthTable::empty());
    };

    let mut merged = first.sorted_by_depth();
    for table in non_empty {
        merged = outer_join(&merged, &table.sorted_by_depth())?;
    }
    debug!(
        tables = tables.len(),
        rows = merged.len(),
        features = merged.columns().len(),
        "Merged depth-indexed tables"
    );
    Ok(merged)
}

/// Sort-merge outer join of two depth-sorted tables.
fn outer_join(left: &DepthTable, right: &DepthTable) -> Result<DepthTable, TableError> {
    let (ld, rd) = (left.depth(), right.depth());
    let mut depth = Vec::with_capacity(ld.len() + rd.len());
    let mut left_rows: Vec<Option<usize>> = Vec::with_capacity(depth.capacity());
    let mut right_rows: Vec<Option<usize>> = Vec::with_capacity(depth.capacity());

    let (mut i, mut j) = (0, 0);
    while i < ld.len() || j < rd.len() {
        let ordering = match (ld.get(i), rd.get(j)) {
            (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };
        match ordering {
            Ordering::Less => {
                depth.push(ld[i]);
                left_rows.push(Some(i));
                right_rows.push(None);
                i += 1;
            }
            Ordering::Greater => {
                depth.push(rd[j]);
                left_rows.push(None);
                right_rows.push(Some(j));
                j += 1;
            }
            Ordering::Equal => {
                let key = ld[i];
                let i_end = i + ld[i..].iter().take_while(|&&d| d == key).count();
                let j_end = j + rd[j..].iter().take_while(|&&d| d == key).count();
                for a in i..i_end {
                    for b in j..j_end {
                        depth.push(key);
                        left_rows.push(Some(a));
                        right_rows.push(Some(b));
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }

    let gather = |table: &DepthTable, rows: &[Option<usize>]| -> Vec<Column> {
        table
            .columns()
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: rows
                    .iter()
                    .map(|r| r.map_or(f64::NAN, |r| c.values[r]))
                    .collect(),
            })
            .collect()
    };

    let mut columns = gather(left, &left_rows);
    columns.extend(gather(right, &right_rows));

    DepthTable::new(depth, columns)
}

/// Flat mapping of curve name → source table, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveCatalog {
    entries: Vec<(String, CurveSource)>,
}

impl CurveCatalog {
    pub fn source_of(&self, curve: &str) -> Option<CurveSource> {
        self.entries
            .iter()
            .find(|(n, _)| n == curve)
            .map(|(_, s)| *s)
    }

    pub fn curves(&self) -> impl Iterator<Item = (&str, CurveSource)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), *s))
    }

    /// Curve names from one source, in table order.
    pub fn curves_from(&self, source: CurveSource) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, s)| *s == source)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Two curves from different sources are sampled on different depth
    /// grids and need interpolation before they can be cross-plotted.
    pub fn needs_interpolation(&self, a: &str, b: &str) -> bool {
        match (self.source_of(a), self.source_of(b)) {
            (Some(sa), Some(sb)) => sa != sb,
            _ => false,
        }
    }
}

/// Record the source of every feature column across the named tables.
pub fn build_curve_catalog(
    tables_by_source: &[(CurveSource, &DepthTable)],
) -> Result<CurveCatalog, MergeError> {
    let mut catalog = CurveCatalog::default();
    for (source, table) in tables_by_source {
        for name in table.feature_names() {
            if let Some(first) = catalog.source_of(name) {
                return Err(MergeError::DuplicateCurve {
                    curve: name.to_string(),
                    first,
                    second: *source,
                });
            }
            catalog.entries.push((name.to_string(), *source));
        }
    }
    Ok(catalog)
}

/// Merge tables from named sources and catalog their curves in one step.
pub fn merge_sources(
    tables_by_source: &[(CurveSource, &DepthTable)],
) -> Result<(DepthTable, CurveCatalog), MergeError> {
    let catalog = build_curve_catalog(tables_by_source)?;
    let tables: Vec<&DepthTable> = tables_by_source.iter().map(|(_, t)| *t).collect();
    Ok((merge(&tables)?, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(depth: &[f64], cols: &[(&str, &[f64])]) -> DepthTable {
        DepthTable::new(
            depth.to_vec(),
            cols.iter()
                .map(|(n, v)| Column {
                    name: (*n).to_string(),
                    values: v.to_vec(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn same(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
    }

    #[test]
    fn test_logging_drilling_outer_join() {
        let logs = table(&[1.0, 2.0], &[("GR", &[10.0, 20.0])]);
        let drilling = table(&[2.0, 3.0], &[("ROP", &[5.0, 6.0])]);
        let merged = merge(&[&logs, &drilling]).unwrap();

        assert_eq!(merged.depth(), &[1.0, 2.0, 3.0]);
        assert!(same(merged.column("GR").unwrap(), &[10.0, 20.0, f64::NAN]));
        assert!(same(merged.column("ROP").unwrap(), &[f64::NAN, 5.0, 6.0]));
    }

    #[test]
    fn test_empty_tables_are_identity() {
        let logs = table(&[3.0, 1.0, 2.0], &[("GR", &[30.0, 10.0, 20.0])]);
        let empty = DepthTable::empty();
        let empty_with_cols = table(&[], &[("GR", &[])]);

        let merged = merge(&[&empty, &logs, &empty_with_cols]).unwrap();
        assert_eq!(merged, logs.sorted_by_depth());
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge(&[]).unwrap().is_empty());
        assert!(merge(&[&DepthTable::empty()]).unwrap().is_empty());
    }

    #[test]
    fn test_shared_feature_rejected() {
        let a = table(&[1.0], &[("GR", &[1.0])]);
        let b = table(&[2.0], &[("GR", &[2.0])]);
        assert_eq!(
            merge(&[&a, &b]),
            Err(MergeError::ColumnConflict {
                column: "GR".to_string(),
                first: 0,
                second: 1
            })
        );
    }

    #[test]
    fn test_non_canonical_rejected() {
        let a = DepthTable::with_depth_name("Depth m", vec![1.0], vec![]).unwrap();
        assert!(matches!(
            merge(&[&a]),
            Err(MergeError::NotCanonical { index: 0, .. })
        ));
        assert!(merge(&[&a.into_canonical()]).is_ok());
    }

    #[test]
    fn test_nan_depth_rejected() {
        let a = table(&[1.0, f64::NAN], &[]);
        assert_eq!(merge(&[&a]), Err(MergeError::NonFiniteDepth { index: 0 }));
    }

    #[test]
    fn test_three_way_merge_sorted() {
        let a = table(&[5.0, 1.0], &[("A", &[50.0, 10.0])]);
        let b = table(&[3.0], &[("B", &[30.0])]);
        let c = table(&[1.0, 4.0], &[("C", &[1.0, 4.0])]);
        let merged = merge(&[&a, &b, &c]).unwrap();
        assert_eq!(merged.depth(), &[1.0, 3.0, 4.0, 5.0]);
        assert!(same(merged.column("A").unwrap(), &[10.0, f64::NAN, f64::NAN, 50.0]));
        assert!(same(merged.column("B").unwrap(), &[f64::NAN, 30.0, f64::NAN, f64::NAN]));
        assert!(same(merged.column("C").unwrap(), &[1.0, f64::NAN, 4.0, f64::NAN]));
        assert_eq!(merged.header(), vec!["DEPTH", "A", "B", "C"]);
    }

    #[test]
    fn test_duplicate_depths_pair_up() {
        let a = table(&[2.0, 2.0], &[("A", &[1.0, 2.0])]);
        let b = table(&[2.0], &[("B", &[9.0])]);
        let merged = merge(&[&a, &b]).unwrap();
        assert_eq!(merged.depth(), &[2.0, 2.0]);
        assert_eq!(merged.column("A").unwrap(), &[1.0, 2.0]);
        assert_eq!(merged.column("B").unwrap(), &[9.0, 9.0]);
    }

    #[test]
    fn test_catalog_records_sources() {
        let logs = table(&[1.0], &[("GR", &[1.0]), ("RHOB", &[2.3])]);
        let drilling = table(&[1.0], &[("ROP", &[20.0])]);
        let catalog = build_curve_catalog(&[
            (CurveSource::Logging, &logs),
            (CurveSource::Drilling, &drilling),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.source_of("ROP"), Some(CurveSource::Drilling));
        assert_eq!(catalog.curves_from(CurveSource::Logging), vec!["GR", "RHOB"]);
        assert!(catalog.needs_interpolation("GR", "ROP"));
        assert!(!catalog.needs_interpolation("GR", "RHOB"));
        assert!(!catalog.needs_interpolation("GR", "MISSING"));
    }

    #[test]
    fn test_catalog_rejects_duplicate_curve() {
        let logs = table(&[1.0], &[("DEPTH_BIT", &[1.0])]);
        let drilling = table(&[1.0], &[("DEPTH_BIT", &[2.0])]);
        let err = build_curve_catalog(&[
            (CurveSource::Logging, &logs),
            (CurveSource::Drilling, &drilling),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("well logging"));
        assert!(err.to_string().contains("drilling"));
    }

    #[test]
    fn test_merge_is_repeatable() {
        let a = table(&[3.0, 1.0], &[("A", &[3.0, 1.0])]);
        let b = table(&[2.0], &[("B", &[2.0])]);
        let first = merge(&[&a, &b]).unwrap();
        let second = merge(&[&a, &b]).unwrap();
        assert_eq!(first.depth(), second.depth());
        for (x, y) in first.columns().iter().zip(second.columns()) {
            assert!(same(&x.values, &y.values));
        }
    }
}
