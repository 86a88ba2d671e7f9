//! Table Merge Integration Test
//!
//! CSV logs + drilling data + formation tops sheet -> normalized tops ->
//! zone grid -> depth-aligned merge -> cross-plot with trend.

use std::path::{Path, PathBuf};

use fmi_washout::acquisition::{read_depth_table, write_depth_table};
use fmi_washout::config::AnalysisConfig;
use fmi_washout::logview::{build_log_view, TrackKind};
use fmi_washout::session::{LogTables, SessionChange, SessionController};
use fmi_washout::tables::{AxisScale, CrossPlotError, CrossPlotRequest, CurveSource};

struct Inputs {
    _dir: tempfile::TempDir,
    logs: PathBuf,
    drilling: PathBuf,
    tops: PathBuf,
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn inputs() -> Inputs {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write(
        dir.path(),
        "logs.csv",
        "WELL,DEPTH_MD,GR,NPHI,RHOB\n\
         F-11,1003,60,0.30,2.30\n\
         F-11,1001,40,0.10,2.50\n\
         F-11,1002,50,0.20,2.40\n\
         F-11,1004,70,0.40,2.20\n",
    );
    let drilling = write(
        dir.path(),
        "drilling.csv",
        "Depth,ROP,BIT_SIZE\n1001.5,12,8.5\n1003.5,14,8.5\n",
    );
    // trailing classification column; the PRELIMINARY row must be ignored
    let tops = write(
        dir.path(),
        "tops.csv",
        "1001,HUG,Hugin Fm,MAIN,1,2021-03-01,FINAL\n\
         1003,SLE,Sleipner Fm,MAIN,1,2021-03-01,FINAL\n\
         1002,SKA,Skagerrak Fm,MAIN,1,2021-03-01,PRELIMINARY\n",
    );
    Inputs {
        _dir: dir,
        logs,
        drilling,
        tops,
    }
}

fn load(inputs: &Inputs) -> LogTables {
    let config = AnalysisConfig::default();
    LogTables::load(
        &inputs.logs,
        Some(&inputs.drilling),
        Some(&inputs.tops),
        &config.formation_tops.options(),
    )
    .expect("load tables")
}

#[test]
fn tops_are_normalized_from_final_rows() {
    let tables = load(&inputs());
    let tops = tables.tops.as_ref().expect("tops");
    assert_eq!(tops.formation_names(), vec!["Hugin Fm", "Sleipner Fm"]);
    assert_eq!(tops.bottoms(), vec![1003.0, 21003.0]);

    let zones = tables.zones.as_ref().expect("zone grid");
    assert_eq!(zones.depth(), &[1001.0, 1002.0, 1003.0]);
    assert_eq!(zones.column("Hugin Fm").expect("hugin"), &[100.0, 100.0, 0.0]);
    assert_eq!(zones.column("Sleipner Fm").expect("sleipner"), &[0.0, 0.0, 100.0]);
}

#[test]
fn merge_is_outer_join_on_depth() {
    let tables = load(&inputs());
    let (merged, catalog) = tables.merge(None).expect("merge");

    assert_eq!(
        merged.depth(),
        &[1001.0, 1001.5, 1002.0, 1003.0, 1003.5, 1004.0]
    );
    assert_eq!(merged.column("WELL"), None, "text columns are dropped");
    let rop = merged.column("ROP").expect("rop");
    assert!(rop[0].is_nan());
    assert_eq!(rop[1], 12.0);
    assert_eq!(catalog.source_of("ROP"), Some(CurveSource::Drilling));
    assert_eq!(catalog.source_of("GR"), Some(CurveSource::Logging));
    assert_eq!(catalog.source_of("Hugin Fm"), Some(CurveSource::FormationTops));
}

#[test]
fn merged_table_round_trips_through_csv() {
    let inputs = inputs();
    let tables = load(&inputs);
    let (merged, _) = tables.merge(None).expect("merge");

    let out = inputs.logs.with_file_name("merged.csv");
    write_depth_table(&out, &merged).expect("write merged");
    let back = read_depth_table(&out).expect("read merged");
    assert_eq!(back.depth(), merged.depth());
    assert_eq!(back.header(), merged.header());
}

#[test]
fn cross_plot_after_tables_loaded() {
    let mut session = SessionController::new(AnalysisConfig::default());
    let request = CrossPlotRequest::new("NPHI", "RHOB");
    assert_eq!(session.cross_plot(&request), Err(CrossPlotError::NoTables));

    let changes = session.on_tables_loaded(load(&inputs()));
    let Some(SessionChange::TablesMerged { preselected, .. }) = changes.first() else {
        panic!("tables not merged: {changes:?}");
    };
    assert_eq!(preselected, &["GR", "NPHI", "RHOB"]);

    let plot = session.cross_plot(&request).expect("cross plot");
    assert_eq!(plot.points.len(), 4);
    assert_eq!(plot.interpolated, None);
    let trend = plot.trend.expect("trend");
    assert!((trend.slope + 1.0).abs() < 1e-9);
    assert!((trend.intercept - 2.6).abs() < 1e-9);
    assert!((trend.r_squared - 1.0).abs() < 1e-9);
    assert_eq!(plot.points[0].formation.as_deref(), Some("Hugin Fm"));
    assert_eq!(plot.points[3].formation.as_deref(), Some("Sleipner Fm"));
}

#[test]
fn cross_plot_across_sources_interpolates() {
    let mut session = SessionController::new(AnalysisConfig::default());
    session.on_tables_loaded(load(&inputs()));

    let request = CrossPlotRequest::new("GR", "ROP").with_scales(AxisScale::Log, AxisScale::Linear);
    let plot = session.cross_plot(&request).expect("cross plot");
    assert!(plot.interpolated.is_some());
    assert!(plot.points.iter().all(|p| p.x > 0.0 && p.y.is_finite()));
}

#[test]
fn log_view_orders_bit_track_first() {
    let tables = load(&inputs());
    let plan = build_log_view(&tables, None, None, &AnalysisConfig::default()).expect("log view");
    assert_eq!(plan.tracks[0].kind, TrackKind::BitSize);
    assert_eq!(plan.tracks[0].title, "BIT_SIZE");
    assert_eq!(plan.tracks.last().map(|t| t.kind), Some(TrackKind::FormationZones));
    assert!(!plan.log_features.contains(&"WELL".to_string()));
}
