//! Well-log, drilling and formation-tops tables of one analysis

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::acquisition::{read_depth_table, read_raw_table, LoadError};
use crate::tables::{
    merge_sources, normalize_tops, pivot_to_zone_grid, CurveCatalog, CurveSource, MergeError,
    TopsError, TopsOptions,
};
use crate::types::{DepthTable, FormationTops};

#[derive(Error, Debug)]
pub enum LogTablesError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Tops(#[from] TopsError),
}

/// Depth-indexed inputs that accompany the FMI session.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTables {
    pub logging: DepthTable,
    pub drilling: Option<DepthTable>,
    pub tops: Option<FormationTops>,
    /// Zone-indicator grid built from `tops`.
    pub zones: Option<DepthTable>,
}

impl LogTables {
    /// Assemble from already parsed tables; tops are pivoted onto a zone grid.
    pub fn new(
        logging: DepthTable,
        drilling: Option<DepthTable>,
        tops: Option<FormationTops>,
        options: &TopsOptions,
    ) -> Result<Self, TopsError> {
        let zones = tops
            .as_ref()
            .map(|t| pivot_to_zone_grid(t, options.depth_step, options.marker_value))
            .transpose()?;
        Ok(Self {
            logging: logging.into_canonical().sorted_by_depth(),
            drilling: drilling.map(|d| d.into_canonical().sorted_by_depth()),
            tops,
            zones,
        })
    }

    /// Read the CSV inputs. Tops sheets are read without a header row.
    pub fn load(
        logging: &Path,
        drilling: Option<&Path>,
        tops: Option<&Path>,
        options: &TopsOptions,
    ) -> Result<Self, LogTablesError> {
        let logging = read_depth_table(logging)?;
        let drilling = drilling.map(read_depth_table).transpose()?;
        let tops = match tops {
            Some(path) => Some(normalize_tops(&read_raw_table(path, false)?, options)?),
            None => None,
        };
        let tables = Self::new(logging, drilling, tops, options)?;
        info!(
            logging_rows = tables.logging.len(),
            drilling_rows = tables.drilling.as_ref().map_or(0, DepthTable::len),
            formations = tables.tops.as_ref().map_or(0, FormationTops::len),
            "Loaded log tables"
        );
        Ok(tables)
    }

    /// Source-tagged tables in merge order, FMI-derived curves last.
    pub fn sources<'a>(&'a self, fmi: Option<&'a DepthTable>) -> Vec<(CurveSource, &'a DepthTable)> {
        let mut sources = vec![(CurveSource::Logging, &self.logging)];
        if let Some(d) = &self.drilling {
            sources.push((CurveSource::Drilling, d));
        }
        if let Some(z) = &self.zones {
            sources.push((CurveSource::FormationTops, z));
        }
        if let Some(f) = fmi {
            sources.push((CurveSource::Fmi, f));
        }
        sources
    }

    pub fn merge(&self, fmi: Option<&DepthTable>) -> Result<(DepthTable, CurveCatalog), MergeError> {
        merge_sources(&self.sources(fmi))
    }
}
