//! Log view assembly: ordered depth tracks for the multi-track display
//!
//! Track order, left to right:
//! 1. bit size (first drilling feature whose name contains `bit`)
//! 2. remaining drilling features
//! 3. selected well-log features (never `DEPTH` or `WELL`)
//! 4. FMI image, FMI segmentation, FMI porosity
//! 5. formation zones
//!
//! FMI-derived tracks are conditioned (sanitize → downsample → smooth) so
//! they sit at the same depth resolution as the log curves.

use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::processing::{condition, downsample_slice, ConditioningParams, ProcessingError};
use crate::session::{LogTables, LogsContext};
use crate::types::DepthTable;

/// Log features never drawn as tracks.
const EXCLUDED_LOG_FEATURES: [&str; 2] = ["DEPTH", "WELL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    BitSize,
    Drilling,
    Log,
    FmiImage,
    FmiSegmentation,
    FmiPorosity,
    FormationZones,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackData {
    Curve(Vec<f64>),
    Image(Array2<f64>),
    /// One indicator series per formation.
    Zones(Vec<(String, Vec<f64>)>),
}

/// One column of the log view.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub kind: TrackKind,
    pub log_axis: bool,
    pub depth: Vec<f64>,
    pub data: TrackData,
}

impl Track {
    fn curve(title: &str, kind: TrackKind, table: &DepthTable, log_axis: bool) -> Option<Self> {
        let values = table.column(title)?;
        Some(Self {
            title: title.to_string(),
            kind,
            log_axis,
            depth: table.depth().to_vec(),
            data: TrackData::Curve(values.to_vec()),
        })
    }
}

/// Ordered tracks plus the log features offered for selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogViewPlan {
    pub tracks: Vec<Track>,
    /// Every well-log feature that can be shown.
    pub log_features: Vec<String>,
    /// Features selected when the view first opens.
    pub preselected: Vec<String>,
}

impl LogViewPlan {
    pub fn titles(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.title.as_str()).collect()
    }

    pub fn kinds(&self) -> Vec<TrackKind> {
        self.tracks.iter().map(|t| t.kind).collect()
    }
}

/// Assemble the log view.
///
/// `selected` lists the well-log features to draw; `None` draws the first
/// `default_curve_count` features. Unknown names are ignored.
pub fn build_log_view(
    tables: &LogTables,
    fmi: Option<&dyn LogsContext>,
    selected: Option<&[String]>,
    config: &AnalysisConfig,
) -> Result<LogViewPlan, ProcessingError> {
    let mut tracks = Vec::new();

    if let Some(drilling) = &tables.drilling {
        let features: Vec<&str> = drilling.feature_names().collect();
        let (bits, rest): (Vec<&str>, Vec<&str>) = features
            .into_iter()
            .partition(|f| f.to_lowercase().contains("bit"));
        if let Some(bit) = bits.first() {
            tracks.extend(Track::curve(bit, TrackKind::BitSize, drilling, false));
        }
        for f in rest {
            tracks.extend(Track::curve(f, TrackKind::Drilling, drilling, false));
        }
    }

    let log_features: Vec<String> = tables
        .logging
        .feature_names()
        .filter(|f| !EXCLUDED_LOG_FEATURES.contains(f))
        .map(str::to_string)
        .collect();
    let preselected: Vec<String> = log_features
        .iter()
        .take(config.logview.default_curve_count)
        .cloned()
        .collect();
    let shown = selected.unwrap_or(preselected.as_slice());
    for f in log_features.iter().filter(|f| shown.contains(f)) {
        let log_axis = config.logview.features_to_log.contains(f);
        tracks.extend(Track::curve(f, TrackKind::Log, &tables.logging, log_axis));
    }

    if let Some(ctx) = fmi {
        tracks.extend(fmi_tracks(ctx, &config.processing.conditioning())?);
    }

    if let Some(zones) = &tables.zones {
        let series = zones
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.values.clone()))
            .collect();
        tracks.push(Track {
            title: "Formation tops".to_string(),
            kind: TrackKind::FormationZones,
            log_axis: false,
            depth: zones.depth().to_vec(),
            data: TrackData::Zones(series),
        });
    }

    debug!(tracks = tracks.len(), features = log_features.len(), "Built log view");
    Ok(LogViewPlan {
        tracks,
        log_features,
        preselected,
    })
}

/// Image, segmentation and porosity tracks of the current selection.
fn fmi_tracks(
    ctx: &dyn LogsContext,
    params: &ConditioningParams,
) -> Result<Vec<Track>, ProcessingError> {
    let Some(image) = ctx.current_image() else {
        return Ok(Vec::new());
    };
    let rows = image.nrows();
    let depth = match ctx.current_depth() {
        Some(d) if d.len() == rows => d.to_vec(),
        _ => (0..rows).map(|r| r as f64).collect(),
    };
    let depth = downsample_slice(&depth, params.stride)?;

    let mut tracks = vec![Track {
        title: "FMI Image".to_string(),
        kind: TrackKind::FmiImage,
        log_axis: false,
        depth: depth.clone(),
        data: TrackData::Image(condition(image, params)?),
    }];

    if let Some(mask) = ctx.current_mask() {
        let mask = mask.mapv(f64::from);
        tracks.push(Track {
            title: "FMI Segmentation".to_string(),
            kind: TrackKind::FmiSegmentation,
            log_axis: false,
            depth: depth.clone(),
            data: TrackData::Image(condition(mask.view(), params)?),
        });
    }

    if let Some(curve) = ctx.current_curve() {
        let porosity = Array1::from(curve.percentages());
        tracks.push(Track {
            title: "FMI Porosity".to_string(),
            kind: TrackKind::FmiPorosity,
            log_axis: false,
            depth,
            data: TrackData::Curve(condition(porosity.view(), params)?.to_vec()),
        });
    }
    Ok(tracks)
}
