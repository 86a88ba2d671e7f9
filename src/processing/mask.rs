//! Mask/Curve engine
//!
//! Thresholds an FMI image into a binary washout mask and reduces the mask
//! to a per-row washout curve. Both steps are pure: the same image and
//! threshold always give bit-identical output.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Mask value for pixels below the threshold (washout / void).
pub const MASK_ON: u8 = 1;

/// Mask value for intact borehole wall.
pub const MASK_OFF: u8 = 0;

/// Binary mask: `1` where `image < threshold`, `0` elsewhere.
///
/// No clamping: a threshold below the image minimum yields an all-zero
/// mask, one above the maximum yields an all-one mask. `NaN` pixels never
/// compare below the threshold and stay `0`.
pub fn compute_mask(image: ArrayView2<'_, f64>, threshold: i64) -> Array2<u8> {
    let t = threshold as f64;
    image.mapv(|v| if v < t { MASK_ON } else { MASK_OFF })
}

/// One curve sample: image row index and count of flagged columns in that row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub row: usize,
    pub count: usize,
}

/// Per-row washout content derived from a mask.
///
/// Counts are kept raw so the curve can be drawn against the image at any
/// horizontal scale factor; [`WashoutCurve::fractions`] and
/// [`WashoutCurve::percentages`] normalize by the mask width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WashoutCurve {
    points: Vec<CurvePoint>,
    width: usize,
}

impl WashoutCurve {
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Column count of the mask the curve was derived from.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.count).collect()
    }

    /// Flagged fraction of each row in `[0, 1]`. A zero-width mask gives zeros.
    pub fn fractions(&self) -> Vec<f64> {
        if self.width == 0 {
            return vec![0.0; self.points.len()];
        }
        let w = self.width as f64;
        self.points.iter().map(|p| p.count as f64 / w).collect()
    }

    /// Flagged fraction of each row on a 0-100 scale.
    pub fn percentages(&self) -> Vec<f64> {
        self.fractions().into_iter().map(|f| f * 100.0).collect()
    }

    /// Curve as path vertices `(row, count × scale)` for drawing over an
    /// image stretched horizontally by `scale`.
    pub fn scaled_path(&self, scale: f64) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.row as f64, p.count as f64 * scale))
            .collect()
    }
}

/// Washout curve: `(r, sum(mask[r, :]))` for every row `r`.
///
/// Output length always equals the mask row count.
pub fn compute_washout_curve(mask: ArrayView2<'_, u8>) -> WashoutCurve {
    let points = mask
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(row, lane)| CurvePoint {
            row,
            count: lane.iter().filter(|&&v| v != MASK_OFF).count(),
        })
        .collect();
    WashoutCurve {
        points,
        width: mask.ncols(),
    }
}

/// Number of flagged pixels in the whole mask.
pub fn flagged_total(mask: ArrayView2<'_, u8>) -> usize {
    mask.iter().filter(|&&v| v != MASK_OFF).count()
}
