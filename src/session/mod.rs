//! Segmentation session: state controller, command handlers and export
//!
//! [`SessionController`] is the single owner of the current selection.
//! Components that only need to read the current image, mask or curve
//! (the log view, the CLI) go through [`LogsContext`].

mod controller;
mod export;
mod logs;
mod state;

pub use controller::SessionController;
pub use export::*;
pub use logs::{LogTables, LogTablesError};
pub use state::{SessionChange, SessionPhase};

use ndarray::{ArrayView1, ArrayView2};

use crate::processing::WashoutCurve;
use crate::types::DepthTable;

/// Read-only view of the current segmentation.
pub trait LogsContext {
    /// Image of the selected channel.
    fn current_image(&self) -> Option<ArrayView2<'_, f64>>;

    fn current_mask(&self) -> Option<ArrayView2<'_, u8>>;

    fn current_curve(&self) -> Option<&WashoutCurve>;

    /// Depth vector of the current session file, if it carries one.
    fn current_depth(&self) -> Option<ArrayView1<'_, f64>>;

    fn current_threshold(&self) -> i64;

    /// Horizontal stretch applied when drawing the image.
    fn image_scale(&self) -> u32;

    /// `{file}_{channel}` for the current selection.
    fn layer_name(&self) -> Option<String>;

    /// Downsampled `FMI_POROSITY` table of the current curve.
    fn fmi_porosity(&self) -> Option<DepthTable>;
}
