//! Session State Controller
//!
//! Owns the current folder/file/channel/threshold selection and everything
//! derived from it. The presentation layer calls one `on_*` handler per
//! user action and redraws from the returned [`SessionChange`] list.
//!
//! Rules:
//! - Loading a folder or a file resets all derived state.
//! - Threshold and aspect-ratio changes recompute mask and curve only.
//! - Bad input yields a `Notification` and leaves the state untouched.
//! - Handlers whose preconditions are unmet return no changes.

use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1, ArrayView2};
use tracing::{debug, info, warn};

use super::export::{export_results, fmi_porosity_table, ExportLayout};
use super::logs::LogTables;
use super::state::{SessionChange, SessionPhase};
use super::LogsContext;
use crate::acquisition::{list_session_files, session_stem, ChannelSource, NpzChannelSource};
use crate::config::AnalysisConfig;
use crate::processing::{compute_mask, compute_washout_curve, flagged_total, WashoutCurve};
use crate::tables::{prepare_cross_plot, CrossPlot, CrossPlotError, CrossPlotRequest, CurveCatalog};
use crate::types::{ChannelSet, DepthTable};

pub struct SessionController<S: ChannelSource = NpzChannelSource> {
    config: AnalysisConfig,
    source: S,
    phase: SessionPhase,

    folder: Option<PathBuf>,
    files: Vec<PathBuf>,
    file_index: Option<usize>,

    channels: ChannelSet,
    relevant: Vec<String>,
    channel_index: Option<usize>,

    threshold: i64,
    threshold_max: i64,
    aspect_ratio: u32,

    mask: Option<Array2<u8>>,
    curve: Option<WashoutCurve>,

    export: Option<ExportLayout>,

    log_tables: Option<LogTables>,
    merged: Option<(DepthTable, CurveCatalog)>,
}

impl SessionController<NpzChannelSource> {
    /// Controller reading `.npz` session files.
    pub fn new(config: AnalysisConfig) -> Self {
        let source = NpzChannelSource::new(config.channels.depth_key.clone());
        Self::with_source(config, source)
    }
}

impl<S: ChannelSource> SessionController<S> {
    pub fn with_source(config: AnalysisConfig, source: S) -> Self {
        let threshold = config.processing.default_threshold;
        let aspect_ratio = config.processing.default_aspect_ratio;
        Self {
            config,
            source,
            phase: SessionPhase::NoFolder,
            folder: None,
            files: Vec::new(),
            file_index: None,
            channels: ChannelSet::new(),
            relevant: Vec::new(),
            channel_index: None,
            threshold,
            threshold_max: 0,
            aspect_ratio,
            mask: None,
            curve: None,
            export: None,
            log_tables: None,
            merged: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn file_index(&self) -> Option<usize> {
        self.file_index
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.file_index.and_then(|i| self.files.get(i)).map(PathBuf::as_path)
    }

    /// Recognized channels of the current file, in file order.
    pub fn relevant_channels(&self) -> &[String] {
        &self.relevant
    }

    pub fn channel_index(&self) -> Option<usize> {
        self.channel_index
    }

    pub fn current_channel(&self) -> Option<&str> {
        self.channel_index
            .and_then(|i| self.relevant.get(i))
            .map(String::as_str)
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Threshold slider range for the current channel.
    pub fn threshold_range(&self) -> (i64, i64) {
        (0, self.threshold_max)
    }

    pub fn aspect_ratio(&self) -> u32 {
        self.aspect_ratio
    }

    pub fn mask(&self) -> Option<&Array2<u8>> {
        self.mask.as_ref()
    }

    pub fn curve(&self) -> Option<&WashoutCurve> {
        self.curve.as_ref()
    }

    pub fn results_folder(&self) -> Option<&Path> {
        self.export.as_ref().map(|l| l.root.as_path())
    }

    /// Results folder configured, channel selected and a mask computed.
    pub fn export_enabled(&self) -> bool {
        self.export.is_some() && self.current_channel().is_some() && self.mask.is_some()
    }

    pub fn log_tables(&self) -> Option<&LogTables> {
        self.log_tables.as_ref()
    }

    pub fn merged_table(&self) -> Option<&DepthTable> {
        self.merged.as_ref().map(|(t, _)| t)
    }

    pub fn curve_catalog(&self) -> Option<&CurveCatalog> {
        self.merged.as_ref().map(|(_, c)| c)
    }

    // ========================================================================
    // Folder and file navigation
    // ========================================================================

    /// Enumerate session files and open the first one.
    pub fn on_folder_selected(&mut self, folder: &Path) -> Vec<SessionChange> {
        let files = match list_session_files(folder, &self.config.channels.session_extension) {
            Ok(files) => files,
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "Rejected session folder");
                return vec![SessionChange::notify(e.to_string())];
            }
        };

        self.folder = Some(folder.to_path_buf());
        self.files = files;
        self.file_index = None;
        self.channels = ChannelSet::new();
        self.relevant.clear();
        self.clear_derived();
        self.phase = SessionPhase::FolderLoaded;

        let mut changes = vec![
            SessionChange::FolderLoaded {
                folder: folder.to_path_buf(),
                files: self.files.iter().map(|p| file_name(p)).collect(),
            },
            SessionChange::Cleared,
        ];
        if self.files.is_empty() {
            changes.push(SessionChange::notify(format!(
                "No .{} files found in '{}'",
                self.config.channels.session_extension,
                folder.display()
            )));
            changes.push(self.export_availability());
            return changes;
        }
        changes.extend(self.on_file_selected(0));
        changes
    }

    /// Load file `index`, keep its recognized channels and select the first.
    pub fn on_file_selected(&mut self, index: usize) -> Vec<SessionChange> {
        let Some(path) = self.files.get(index).cloned() else {
            debug!(index, files = self.files.len(), "File index out of range");
            return Vec::new();
        };

        let set = match self.source.load(&path) {
            Ok(set) => set,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load session file");
                return vec![SessionChange::notify(e.to_string())];
            }
        };
        let relevant = set.relevant_channels(&self.config.channels.recognized);

        self.file_index = Some(index);
        self.channels = set;
        self.relevant = relevant;
        self.clear_derived();

        let file = file_name(&path);
        let mut changes = vec![SessionChange::FileLoaded {
            index,
            file: file.clone(),
            channels: self.relevant.clone(),
        }];

        if self.relevant.is_empty() {
            warn!(file = %file, "File has no recognized channels");
            self.phase = SessionPhase::NoRelevantChannel;
            changes.push(SessionChange::NoRelevantChannel { file });
            changes.push(SessionChange::Cleared);
            changes.push(SessionChange::notify("File does not have relevant channels!"));
            changes.push(self.export_availability());
            return changes;
        }

        changes.extend(self.select_channel(0));
        changes
    }

    pub fn on_next_file(&mut self) -> Vec<SessionChange> {
        match self.file_index {
            Some(i) if i + 1 < self.files.len() => self.on_file_selected(i + 1),
            _ => Vec::new(),
        }
    }

    pub fn on_previous_file(&mut self) -> Vec<SessionChange> {
        match self.file_index {
            Some(i) if i > 0 => self.on_file_selected(i - 1),
            _ => Vec::new(),
        }
    }

    // ========================================================================
    // Channel navigation
    // ========================================================================

    /// Select a channel by index, clamped to the recognized channels.
    pub fn on_channel_selected(&mut self, index: usize) -> Vec<SessionChange> {
        if self.relevant.is_empty() {
            return Vec::new();
        }
        self.select_channel(index.min(self.relevant.len() - 1))
    }

    pub fn on_next_channel(&mut self) -> Vec<SessionChange> {
        match self.channel_index {
            Some(i) if i + 1 < self.relevant.len() => self.select_channel(i + 1),
            _ => Vec::new(),
        }
    }

    pub fn on_previous_channel(&mut self) -> Vec<SessionChange> {
        match self.channel_index {
            Some(i) if i > 0 => self.select_channel(i - 1),
            _ => Vec::new(),
        }
    }

    // ========================================================================
    // Segmentation parameters
    // ========================================================================

    pub fn on_threshold_changed(&mut self, threshold: i64) -> Vec<SessionChange> {
        self.threshold = threshold;
        self.recompute().into_iter().collect()
    }

    pub fn on_aspect_ratio_changed(&mut self, aspect_ratio: u32) -> Vec<SessionChange> {
        if aspect_ratio == 0 {
            warn!("Rejected zero aspect ratio");
            return vec![SessionChange::notify("Aspect ratio must be at least 1")];
        }
        self.aspect_ratio = aspect_ratio;
        self.recompute().into_iter().collect()
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Create the export subfolders under `folder` and enable export.
    pub fn on_results_folder_selected(&mut self, folder: &Path) -> Vec<SessionChange> {
        match ExportLayout::prepare(folder, &self.config.export) {
            Ok(layout) => {
                info!(folder = %folder.display(), "Results folder set");
                self.export = Some(layout);
                vec![
                    SessionChange::ResultsFolderSet {
                        folder: folder.to_path_buf(),
                    },
                    self.export_availability(),
                ]
            }
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "Rejected results folder");
                vec![SessionChange::notify(e.to_string())]
            }
        }
    }

    /// Write the washout table and mask for the current file and threshold.
    pub fn on_export(&mut self) -> Vec<SessionChange> {
        if !self.export_enabled() {
            debug!("Export requested without a results folder or segmentation");
            return Vec::new();
        }
        let (Some(layout), Some(path), Some(curve), Some(mask)) = (
            self.export.as_ref(),
            self.current_file(),
            self.curve.as_ref(),
            self.mask.as_ref(),
        ) else {
            return Vec::new();
        };

        let stem = session_stem(path);
        let depth = self.channels.depth().and_then(|d| d.as_slice());
        match export_results(layout, &stem, self.threshold, depth, curve, mask.view()) {
            Ok(paths) => vec![
                SessionChange::Exported {
                    table: paths.table,
                    mask: paths.mask,
                },
                SessionChange::notify(format!("Results for {stem} were saved to .csv and .png files!")),
            ],
            Err(e) => {
                warn!(error = %e, "Export failed");
                vec![SessionChange::notify(e.to_string())]
            }
        }
    }

    // ========================================================================
    // Log tables
    // ========================================================================

    /// Merge log tables into the cross-plot table and curve catalog.
    pub fn on_tables_loaded(&mut self, tables: LogTables) -> Vec<SessionChange> {
        let merged = match tables.merge(None) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "Rejected log tables");
                return vec![SessionChange::notify(e.to_string())];
            }
        };

        let curves: Vec<String> = merged.1.curves().map(|(n, _)| n.to_string()).collect();
        let preselected = curves
            .iter()
            .take(self.config.logview.default_curve_count)
            .cloned()
            .collect();
        let change = SessionChange::TablesMerged {
            rows: merged.0.len(),
            curves,
            preselected,
        };
        info!(rows = merged.0.len(), curves = merged.1.len(), "Merged log tables");

        self.log_tables = Some(tables);
        self.merged = Some(merged);
        vec![change]
    }

    /// Cross-plot two curves of the merged log tables.
    pub fn cross_plot(&self, request: &CrossPlotRequest) -> Result<CrossPlot, CrossPlotError> {
        let (table, catalog) = self.merged.as_ref().ok_or(CrossPlotError::NoTables)?;
        let tops = self.log_tables.as_ref().and_then(|t| t.tops.as_ref());
        prepare_cross_plot(table, catalog, tops, request)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn select_channel(&mut self, index: usize) -> Vec<SessionChange> {
        let Some(name) = self.relevant.get(index).cloned() else {
            return Vec::new();
        };
        self.channel_index = Some(index);
        self.clear_derived();

        self.threshold_max = self
            .channels
            .get(&name)
            .map(|img| channel_max(img.view()))
            .unwrap_or(0);

        let mut changes = vec![
            SessionChange::ChannelSelected {
                index,
                channel: name,
                layer_name: self.layer_name().unwrap_or_default(),
            },
            SessionChange::ThresholdRange {
                min: 0,
                max: self.threshold_max,
                value: self.threshold,
            },
        ];
        changes.extend(self.recompute());
        changes.push(self.export_availability());
        changes
    }

    /// Mask and curve for the current channel and threshold.
    fn recompute(&mut self) -> Option<SessionChange> {
        let name = self.current_channel()?;
        let image = self.channels.get(name)?;

        let mask = compute_mask(image.view(), self.threshold);
        let curve = compute_washout_curve(mask.view());
        let flagged = flagged_total(mask.view());
        let rows = mask.nrows();
        debug!(
            channel = %name,
            threshold = self.threshold,
            aspect_ratio = self.aspect_ratio,
            flagged,
            "Recomputed washout mask"
        );

        self.mask = Some(mask);
        self.curve = Some(curve);
        self.phase = SessionPhase::Segmented;
        Some(SessionChange::Segmented {
            threshold: self.threshold,
            aspect_ratio: self.aspect_ratio,
            rows,
            flagged,
        })
    }

    fn clear_derived(&mut self) {
        self.mask = None;
        self.curve = None;
    }

    fn export_availability(&self) -> SessionChange {
        SessionChange::ExportAvailability {
            enabled: self.export_enabled(),
        }
    }
}

impl<S: ChannelSource> LogsContext for SessionController<S> {
    fn current_image(&self) -> Option<ArrayView2<'_, f64>> {
        self.current_channel()
            .and_then(|name| self.channels.get(name))
            .map(|img| img.view())
    }

    fn current_mask(&self) -> Option<ArrayView2<'_, u8>> {
        self.mask.as_ref().map(|m| m.view())
    }

    fn current_curve(&self) -> Option<&WashoutCurve> {
        self.curve.as_ref()
    }

    fn current_depth(&self) -> Option<ArrayView1<'_, f64>> {
        self.channels.depth().map(|d| d.view())
    }

    fn current_threshold(&self) -> i64 {
        self.threshold
    }

    fn image_scale(&self) -> u32 {
        self.aspect_ratio
    }

    fn layer_name(&self) -> Option<String> {
        let file = file_name(self.current_file()?);
        let channel = self.current_channel()?;
        Some(format!("{file}_{channel}"))
    }

    fn fmi_porosity(&self) -> Option<DepthTable> {
        let curve = self.curve.as_ref()?;
        let depth = self.channels.depth().and_then(|d| d.as_slice());
        match fmi_porosity_table(depth, curve, self.config.processing.downsample_stride) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(error = %e, "Cannot derive FMI porosity table");
                None
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Largest finite pixel value, truncated; `0` for an all-`NaN` channel.
fn channel_max(image: ArrayView2<'_, f64>) -> i64 {
    let max = image
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() {
        max as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::LoadError;
    use ndarray::array;
    use std::collections::HashMap;

    /// In-memory session files keyed by file name.
    struct FakeSource(HashMap<String, ChannelSet>);

    impl ChannelSource for FakeSource {
        fn load(&self, path: &Path) -> Result<ChannelSet, LoadError> {
            self.0.get(&file_name(path)).cloned().ok_or_else(|| LoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt"),
            })
        }
    }

    fn folder_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for n in names {
            std::fs::write(dir.path().join(n), b"").unwrap();
        }
        dir
    }

    fn controller(files: &[(&str, ChannelSet)]) -> SessionController<FakeSource> {
        let map = files
            .iter()
            .map(|(n, s)| ((*n).to_string(), s.clone()))
            .collect();
        SessionController::with_source(AnalysisConfig::default(), FakeSource(map))
    }

    fn two_channel_set() -> ChannelSet {
        ChannelSet::new()
            .with_channel("dyn_hrlt", array![[150.0, 50.0], [10.0, 200.0]])
            .with_channel("GR_IMG", array![[1.0]])
            .with_channel("STA_HRUT", array![[0.0, 0.0], [300.0, 300.0]])
            .with_depth(array![1000.0, 1000.5])
    }

    #[test]
    fn test_initial_state() {
        let c = controller(&[]);
        assert_eq!(c.phase(), SessionPhase::NoFolder);
        assert_eq!(c.threshold(), 100);
        assert_eq!(c.aspect_ratio(), 20);
        assert!(!c.export_enabled());
    }

    #[test]
    fn test_folder_load_selects_first_file_and_channel() {
        let dir = folder_with(&["a.npz", "b.npz"]);
        let mut c = controller(&[("a.npz", two_channel_set()), ("b.npz", two_channel_set())]);
        let changes = c.on_folder_selected(dir.path());

        assert_eq!(c.phase(), SessionPhase::Segmented);
        assert_eq!(c.file_index(), Some(0));
        assert_eq!(c.relevant_channels(), &["dyn_hrlt", "STA_HRUT"]);
        assert_eq!(c.current_channel(), Some("dyn_hrlt"));
        assert_eq!(c.mask().unwrap(), &array![[0u8, 1], [1, 0]]);
        assert_eq!(c.curve().unwrap().counts(), vec![1, 1]);
        assert_eq!(c.threshold_range(), (0, 200));
        assert_eq!(c.layer_name().as_deref(), Some("a.npz_dyn_hrlt"));
        assert!(changes.contains(&SessionChange::ExportAvailability { enabled: false }));
        assert!(matches!(changes[0], SessionChange::FolderLoaded { .. }));
    }

    #[test]
    fn test_empty_folder_has_no_file() {
        let dir = folder_with(&["readme.txt"]);
        let mut c = controller(&[]);
        let changes = c.on_folder_selected(dir.path());
        assert_eq!(c.phase(), SessionPhase::FolderLoaded);
        assert_eq!(c.file_index(), None);
        assert!(changes.iter().any(|ch| matches!(ch, SessionChange::Notification { .. })));
    }

    #[test]
    fn test_missing_folder_leaves_state() {
        let mut c = controller(&[]);
        let changes = c.on_folder_selected(Path::new("/definitely/not/here"));
        assert_eq!(c.phase(), SessionPhase::NoFolder);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_file_without_relevant_channels() {
        let dir = folder_with(&["a.npz", "b.npz"]);
        let other = ChannelSet::new().with_channel("OTHER", array![[1.0]]);
        let mut c = controller(&[("a.npz", two_channel_set()), ("b.npz", other)]);
        c.on_folder_selected(dir.path());

        let changes = c.on_next_file();
        assert_eq!(c.phase(), SessionPhase::NoRelevantChannel);
        assert!(c.mask().is_none());
        assert!(c.curve().is_none());
        assert!(changes.contains(&SessionChange::Cleared));
        assert!(changes.contains(&SessionChange::ExportAvailability { enabled: false }));
        assert!(c.on_next_channel().is_empty());
    }

    #[test]
    fn test_corrupt_file_keeps_previous_state() {
        let dir = folder_with(&["a.npz", "b.npz"]);
        let mut c = controller(&[("a.npz", two_channel_set())]);
        c.on_folder_selected(dir.path());
        let before = c.mask().cloned();

        let changes = c.on_next_file();
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], SessionChange::Notification { .. }));
        assert_eq!(c.file_index(), Some(0));
        assert_eq!(c.mask().cloned(), before);
    }

    #[test]
    fn test_file_navigation_clamped() {
        let dir = folder_with(&["a.npz", "b.npz"]);
        let mut c = controller(&[("a.npz", two_channel_set()), ("b.npz", two_channel_set())]);
        c.on_folder_selected(dir.path());
        assert!(c.on_previous_file().is_empty());
        assert!(!c.on_next_file().is_empty());
        assert_eq!(c.file_index(), Some(1));
        assert!(c.on_next_file().is_empty());
        assert!(c.on_file_selected(7).is_empty());
    }

    #[test]
    fn test_channel_navigation_recomputes() {
        let dir = folder_with(&["a.npz"]);
        let mut c = controller(&[("a.npz", two_channel_set())]);
        c.on_folder_selected(dir.path());

        c.on_next_channel();
        assert_eq!(c.current_channel(), Some("STA_HRUT"));
        assert_eq!(c.mask().unwrap(), &array![[1u8, 1], [0, 0]]);
        assert_eq!(c.threshold_range(), (0, 300));
        assert!(c.on_next_channel().is_empty());

        c.on_channel_selected(99);
        assert_eq!(c.channel_index(), Some(1));
        c.on_previous_channel();
        assert_eq!(c.current_channel(), Some("dyn_hrlt"));
    }

    #[test]
    fn test_threshold_change_recomputes_without_reload() {
        let dir = folder_with(&["a.npz"]);
        let mut c = controller(&[("a.npz", two_channel_set())]);
        c.on_folder_selected(dir.path());

        let changes = c.on_threshold_changed(0);
        assert_eq!(
            changes,
            vec![SessionChange::Segmented {
                threshold: 0,
                aspect_ratio: 20,
                rows: 2,
                flagged: 0
            }]
        );
        c.on_threshold_changed(1000);
        assert_eq!(flagged_total(c.mask().unwrap().view()), 4);
    }

    #[test]
    fn test_threshold_before_folder_is_stored() {
        let mut c = controller(&[]);
        assert!(c.on_threshold_changed(42).is_empty());
        assert_eq!(c.threshold(), 42);
    }

    #[test]
    fn test_aspect_ratio() {
        let dir = folder_with(&["a.npz"]);
        let mut c = controller(&[("a.npz", two_channel_set())]);
        c.on_folder_selected(dir.path());
        assert!(matches!(
            c.on_aspect_ratio_changed(0)[0],
            SessionChange::Notification { .. }
        ));
        assert_eq!(c.aspect_ratio(), 20);
        c.on_aspect_ratio_changed(5);
        assert_eq!(c.image_scale(), 5);
    }

    #[test]
    fn test_export_requires_results_folder() {
        let dir = folder_with(&["well.A.npz"]);
        let results = tempfile::tempdir().unwrap();
        let mut c = controller(&[("well.A.npz", two_channel_set())]);
        c.on_folder_selected(dir.path());
        assert!(c.on_export().is_empty());

        let changes = c.on_results_folder_selected(results.path());
        assert!(changes.contains(&SessionChange::ExportAvailability { enabled: true }));

        let changes = c.on_export();
        let SessionChange::Exported { table, mask } = &changes[0] else {
            panic!("expected export, got {changes:?}");
        };
        assert!(table.ends_with("tables/well_100.csv"));
        assert!(mask.ends_with("segmentation_results/well_100.png"));
        assert_eq!(
            std::fs::read_to_string(table).unwrap(),
            "DEPTH,WASHOUT\n1000,0.5\n1000.5,0.5\n"
        );
    }

    #[test]
    fn test_logs_context_porosity() {
        let dir = folder_with(&["a.npz"]);
        let mut c = controller(&[("a.npz", two_channel_set())]);
        c.on_folder_selected(dir.path());
        let table = c.fmi_porosity().unwrap();
        assert_eq!(table.depth(), &[1000.0]);
        assert_eq!(table.column("FMI_POROSITY").unwrap(), &[50.0]);
        assert_eq!(c.current_depth().unwrap().len(), 2);
    }

    #[test]
    fn test_channel_max_ignores_nan() {
        assert_eq!(channel_max(array![[f64::NAN, 12.7]].view()), 12);
        assert_eq!(channel_max(array![[f64::NAN]].view()), 0);
    }
}
