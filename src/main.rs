//! fmi-washout - FMI washout segmentation CLI
//!
//! Headless driver for the segmentation session and the well-data tables.
//!
//! # Usage
//!
//! ```bash
//! # Segment every session file in a folder and export tables + masks
//! fmi-washout segment --folder ./fmi --results ./out --threshold 80
//!
//! # Merge logs, drilling data and formation tops onto one depth axis
//! fmi-washout merge --logs logs.csv --drilling drilling.csv --tops tops.csv --output merged.csv
//!
//! # Cross-plot two curves with a linear trend
//! fmi-washout crossplot --logs logs.csv --x NPHI --y RHOB --log-x
//!
//! # Validate a config file
//! fmi-washout check-config fmi_washout.toml
//! ```
//!
//! # Environment Variables
//!
//! - `FMI_WASHOUT_CONFIG`: Path to the analysis config (default: ./fmi_washout.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use fmi_washout::acquisition::write_depth_table;
use fmi_washout::config::{self, AnalysisConfig};
use fmi_washout::tables::{AxisScale, CrossPlotRequest};
use fmi_washout::{LogTables, SessionChange, SessionController, SessionPhase};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "fmi-washout")]
#[command(about = "FMI borehole image washout segmentation")]
#[command(version)]
struct CliArgs {
    /// Analysis config file (overrides FMI_WASHOUT_CONFIG and ./fmi_washout.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Segment every session file in a folder and export the results
    Segment {
        /// Folder with session files
        #[arg(long)]
        folder: PathBuf,
        /// Results folder; table and mask subfolders are created inside
        #[arg(long)]
        results: PathBuf,
        /// Pixel threshold (default from config)
        #[arg(long)]
        threshold: Option<i64>,
        /// Horizontal image stretch (default from config)
        #[arg(long)]
        aspect_ratio: Option<u32>,
        /// Channel to export (default: first recognized channel of each file)
        #[arg(long)]
        channel: Option<String>,
        /// Print every session update as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Merge log tables onto one depth axis and write them as CSV
    Merge {
        #[arg(long)]
        logs: PathBuf,
        #[arg(long)]
        drilling: Option<PathBuf>,
        /// Formation tops sheet (no header row)
        #[arg(long)]
        tops: Option<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },

    /// Cross-plot two merged curves and print the trend fit as JSON
    Crossplot {
        #[arg(long)]
        logs: PathBuf,
        #[arg(long)]
        drilling: Option<PathBuf>,
        #[arg(long)]
        tops: Option<PathBuf>,
        #[arg(long)]
        x: String,
        #[arg(long)]
        y: String,
        #[arg(long)]
        log_x: bool,
        #[arg(long)]
        log_y: bool,
    },

    /// Validate a config file and print warnings
    CheckConfig {
        path: PathBuf,
    },
}

// ============================================================================
// Session Updates
// ============================================================================

/// Prints session updates as JSON lines or logs the notable ones.
struct Reporter {
    json: bool,
}

impl Reporter {
    fn emit(&self, changes: Vec<SessionChange>) -> Result<()> {
        for change in changes {
            if self.json {
                println!("{}", serde_json::to_string(&change)?);
                continue;
            }
            match change {
                SessionChange::Notification { message } => info!("{}", message),
                SessionChange::Exported { table, mask } => {
                    println!("{}", table.display());
                    println!("{}", mask.display());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_segment(
    config: &AnalysisConfig,
    folder: &Path,
    results: &Path,
    threshold: Option<i64>,
    aspect_ratio: Option<u32>,
    channel: Option<&str>,
    json: bool,
) -> Result<()> {
    let out = Reporter { json };
    let mut session = SessionController::new(config.clone());

    out.emit(session.on_results_folder_selected(results))?;
    if session.results_folder().is_none() {
        bail!("Cannot use '{}' as results folder", results.display());
    }
    if let Some(t) = threshold {
        out.emit(session.on_threshold_changed(t))?;
    }
    if let Some(a) = aspect_ratio {
        out.emit(session.on_aspect_ratio_changed(a))?;
    }

    out.emit(session.on_folder_selected(folder))?;
    if session.folder().is_none() {
        bail!("Cannot open session folder '{}'", folder.display());
    }

    let mut exported = 0usize;
    for index in 0..session.files().len() {
        if index > 0 {
            out.emit(session.on_file_selected(index))?;
        }
        if session.file_index() != Some(index) || session.phase() != SessionPhase::Segmented {
            continue;
        }
        if let Some(name) = channel {
            let Some(ci) = session
                .relevant_channels()
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
            else {
                warn!(file = index, channel = name, "Channel not present, skipping file");
                continue;
            };
            out.emit(session.on_channel_selected(ci))?;
        }

        let changes = session.on_export();
        if changes
            .iter()
            .any(|c| matches!(c, SessionChange::Exported { .. }))
        {
            exported += 1;
        }
        out.emit(changes)?;
    }

    info!(
        files = session.files().len(),
        exported,
        threshold = session.threshold(),
        "Segmentation run complete"
    );
    Ok(())
}

fn load_tables(
    config: &AnalysisConfig,
    logs: &Path,
    drilling: Option<&Path>,
    tops: Option<&Path>,
) -> Result<LogTables> {
    LogTables::load(logs, drilling, tops, &config.formation_tops.options())
        .context("Failed to load log tables")
}

fn run_merge(
    config: &AnalysisConfig,
    logs: &Path,
    drilling: Option<&Path>,
    tops: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let tables = load_tables(config, logs, drilling, tops)?;
    let (merged, catalog) = tables.merge(None).context("Failed to merge log tables")?;
    write_depth_table(output, &merged)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    info!(
        rows = merged.len(),
        curves = catalog.len(),
        output = %output.display(),
        "Merged tables written"
    );
    Ok(())
}

fn run_crossplot(config: &AnalysisConfig, tables: LogTables, request: &CrossPlotRequest) -> Result<()> {
    let mut session = SessionController::new(config.clone());
    for change in session.on_tables_loaded(tables) {
        if let SessionChange::Notification { message } = change {
            bail!(message);
        }
    }
    let plot = session.cross_plot(request).context("Cross-plot failed")?;

    let summary = serde_json::json!({
        "x": plot.x_name,
        "y": plot.y_name,
        "points": plot.points.len(),
        "interpolated": plot.interpolated,
        "formations": plot.formations(),
        "trend": plot.trend.as_ref().map(|t| serde_json::json!({
            "intercept": t.intercept,
            "slope": t.slope,
            "r_squared": t.r_squared,
            "p_value": t.p_value,
            "equation": t.equation(),
        })),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_check_config(path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let (_, warnings) = AnalysisConfig::parse_toml_str(&raw)
        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
    for w in warnings {
        println!("warning: {w}");
    }
    println!("{} is valid", path.display());
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if let SubCommand::CheckConfig { path } = &args.command {
        return run_check_config(path);
    }

    let analysis_config = match &args.config {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => AnalysisConfig::load(),
    };
    config::init(analysis_config);
    let config = config::get();

    match args.command {
        SubCommand::Segment {
            folder,
            results,
            threshold,
            aspect_ratio,
            channel,
            json,
        } => run_segment(
            config,
            &folder,
            &results,
            threshold,
            aspect_ratio,
            channel.as_deref(),
            json,
        ),
        SubCommand::Merge {
            logs,
            drilling,
            tops,
            output,
        } => run_merge(config, &logs, drilling.as_deref(), tops.as_deref(), &output),
        SubCommand::Crossplot {
            logs,
            drilling,
            tops,
            x,
            y,
            log_x,
            log_y,
        } => {
            let tables = load_tables(config, &logs, drilling.as_deref(), tops.as_deref())?;
            let request = CrossPlotRequest::new(x, y)
                .with_scales(AxisScale::from_log_flag(log_x), AxisScale::from_log_flag(log_y));
            run_crossplot(config, tables, &request)
        }
        SubCommand::CheckConfig { .. } => Ok(()),
    }
}
