//! Session Export Integration Test
//!
//! Drives a segmentation session end-to-end over real files:
//! write `.npz` session files -> load folder -> navigate -> export CSV + PNG.

use std::fs::File;
use std::path::Path;

use fmi_washout::config::AnalysisConfig;
use fmi_washout::session::{LogsContext, SessionChange, SessionController, SessionPhase};
use ndarray::{array, Array1, Array2};
use ndarray_npy::NpzWriter;

fn write_session_file(path: &Path, channels: &[(&str, Array2<f64>)], depth: Option<Array1<f64>>) {
    let mut npz = NpzWriter::new(File::create(path).expect("create npz"));
    for (name, image) in channels {
        npz.add_array(*name, image).expect("add channel");
    }
    if let Some(d) = depth {
        npz.add_array("DEPT", &d).expect("add depth");
    }
    npz.finish().expect("finish npz");
}

/// Folder with two session files: one with FMI channels, one without.
fn session_folder() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_session_file(
        &dir.path().join("15_9-F-11.part1.npz"),
        &[
            ("DYN_HRUT", array![[10.0, 200.0, 30.0, 250.0], [300.0, 300.0, 5.0, 300.0]]),
            ("STA_HRLT", array![[1.0, 1.0, 1.0, 1.0], [500.0, 500.0, 500.0, 500.0]]),
        ],
        Some(array![2500.0, 2500.1]),
    );
    write_session_file(
        &dir.path().join("15_9-F-11.part2.npz"),
        &[("GR_IMAGE", array![[1.0, 2.0]])],
        None,
    );
    std::fs::write(dir.path().join("notes.txt"), "not a session file").expect("write notes");
    dir
}

#[test]
fn folder_load_segments_first_file() {
    let dir = session_folder();
    let mut session = SessionController::new(AnalysisConfig::default());
    let changes = session.on_folder_selected(dir.path());

    assert_eq!(session.files().len(), 2, "notes.txt must not be listed");
    assert_eq!(session.phase(), SessionPhase::Segmented);
    assert_eq!(session.relevant_channels(), &["DYN_HRUT", "STA_HRLT"]);
    assert_eq!(session.threshold_range(), (0, 300));
    assert_eq!(
        session.layer_name().as_deref(),
        Some("15_9-F-11.part1.npz_DYN_HRUT")
    );
    assert_eq!(session.curve().expect("curve").counts(), vec![2, 1]);
    assert!(changes
        .iter()
        .any(|c| matches!(c, SessionChange::ThresholdRange { max: 300, .. })));
}

#[test]
fn file_without_channels_clears_and_notifies() {
    let dir = session_folder();
    let mut session = SessionController::new(AnalysisConfig::default());
    session.on_folder_selected(dir.path());

    let changes = session.on_next_file();
    assert_eq!(session.phase(), SessionPhase::NoRelevantChannel);
    assert!(session.mask().is_none());
    assert!(changes.contains(&SessionChange::Notification {
        message: "File does not have relevant channels!".to_string()
    }));

    // previous brings the segmented file back
    session.on_previous_file();
    assert_eq!(session.phase(), SessionPhase::Segmented);
}

#[test]
fn export_writes_table_and_mask() {
    let dir = session_folder();
    let results = tempfile::tempdir().expect("tempdir");
    let mut session = SessionController::new(AnalysisConfig::default());
    session.on_folder_selected(dir.path());
    session.on_results_folder_selected(results.path());
    assert!(results.path().join("tables").is_dir());
    assert!(results.path().join("segmentation_results").is_dir());

    session.on_threshold_changed(250);
    let changes = session.on_export();
    let Some(SessionChange::Exported { table, mask }) = changes.first() else {
        panic!("export did not run: {changes:?}");
    };

    assert_eq!(table, &results.path().join("tables/15_9-F-11_250.csv"));
    assert_eq!(
        std::fs::read_to_string(table).expect("read table"),
        "DEPTH,WASHOUT\n2500,0.75\n2500.1,0.25\n"
    );

    let png = image::open(mask).expect("open mask").to_luma8();
    assert_eq!(png.dimensions(), (4, 2));
    assert_eq!(png.get_pixel(0, 0).0, [255]);
    assert_eq!(png.get_pixel(3, 0).0, [0]);
    assert_eq!(png.get_pixel(2, 1).0, [255]);
}

#[test]
fn export_without_results_folder_is_noop() {
    let dir = session_folder();
    let mut session = SessionController::new(AnalysisConfig::default());
    session.on_folder_selected(dir.path());
    assert!(!session.export_enabled());
    assert!(session.on_export().is_empty());
}

#[test]
fn channel_switch_changes_threshold_range() {
    let dir = session_folder();
    let mut session = SessionController::new(AnalysisConfig::default());
    session.on_folder_selected(dir.path());
    session.on_next_channel();

    assert_eq!(session.current_channel(), Some("STA_HRLT"));
    assert_eq!(session.threshold_range(), (0, 500));
    assert_eq!(session.threshold(), 100, "threshold is kept across channels");
    assert_eq!(session.curve().expect("curve").counts(), vec![4, 0]);
}
