//! CSV tables
//!
//! Well-log and drilling files are read with a header row and canonicalized
//! into [`DepthTable`]s. Formation-tops sheets are read without headers:
//! their layout is sorted out by the tops normalizer.

use std::path::Path;

use tracing::info;

use super::LoadError;
use crate::types::{DepthTable, RawTable};

/// Read a CSV file into string cells. Ragged rows are allowed.
pub fn read_raw_table(path: &Path, has_headers: bool) -> Result<RawTable, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = if has_headers {
        reader.headers().map_err(csv_err)?.iter().map(String::from).collect()
    } else {
        Vec::new()
    };
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(String::from).collect());
    }

    info!(path = %path.display(), rows = rows.len(), "Read table");
    Ok(RawTable::new(headers, rows))
}

/// Read a headed CSV file as a canonical, depth-sorted [`DepthTable`].
pub fn read_depth_table(path: &Path) -> Result<DepthTable, LoadError> {
    let raw = read_raw_table(path, true)?;
    let table = raw.to_depth_table().map_err(|source| LoadError::Table {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(table.into_canonical().sorted_by_depth())
}

/// Write a table with its header row. Missing values are written as empty cells.
pub fn write_depth_table(path: &Path, table: &DepthTable) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.header())?;
    for r in 0..table.len() {
        writer.write_record(table.row(r).iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = table.len(), "Wrote table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, DEPTH_COLUMN};

    #[test]
    fn test_read_logs_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.csv");
        std::fs::write(
            &path,
            "WELL,Depth_MD,ORIG_DEPTH,GR\nW1,1002,1,40\nW1,1001,2,-999\nW1,abc,3,50\n",
        )
        .unwrap();

        let table = read_depth_table(&path).unwrap();
        assert_eq!(table.depth_name(), DEPTH_COLUMN);
        assert_eq!(table.depth(), &[1001.0, 1002.0]);
        assert_eq!(table.column("GR").unwrap(), &[-999.0, 40.0]);
        assert!(table.column("WELL").is_none());
        assert_eq!(table.column("ORIG_DEPTH").unwrap(), &[2.0, 1.0]);
    }

    #[test]
    fn test_missing_depth_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodepth.csv");
        std::fs::write(&path, "A,B\n1,2\n").unwrap();
        assert!(matches!(read_depth_table(&path), Err(LoadError::Table { .. })));
    }

    #[test]
    fn test_headerless_ragged_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tops.csv");
        std::fs::write(&path, "FINAL, 1000 ,A\nnote\n").unwrap();
        let raw = read_raw_table(&path, false).unwrap();
        assert!(raw.headers.is_empty());
        assert_eq!(raw.rows, vec![vec!["FINAL", "1000", "A"], vec!["note"]]);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = DepthTable::new(
            vec![1.0, 2.0],
            vec![Column {
                name: "ROP".into(),
                values: vec![f64::NAN, 6.5],
            }],
        )
        .unwrap();
        write_depth_table(&path, &table).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "DEPTH,ROP\n1,\n2,6.5\n");

        let back = read_depth_table(&path).unwrap();
        assert_eq!(back.depth(), table.depth());
        assert!(back.column("ROP").unwrap()[0].is_nan());
    }
}
