//! Cross-plot preparation
//!
//! Pairs two curves of a merged table, optionally fills the gaps of the
//! more densely sampled one, labels each point with its formation and fits
//! an ordinary-least-squares trend line `y = a + b·x`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;
use tracing::debug;

use super::CurveCatalog;
use crate::types::{DepthTable, FormationTops};

/// Number of evenly spaced samples along the trend line.
pub const TREND_SAMPLES: usize = 100;

/// Errors raised while preparing a cross-plot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrossPlotError {
    #[error("Curve '{0}' is not present in the merged table")]
    UnknownCurve(String),

    #[error("No log tables loaded")]
    NoTables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

impl AxisScale {
    pub fn from_log_flag(log: bool) -> Self {
        if log {
            Self::Log
        } else {
            Self::Linear
        }
    }

    /// Log axes cannot show non-positive values.
    fn accepts(self, v: f64) -> bool {
        match self {
            Self::Linear => true,
            Self::Log => v > 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossPlotRequest {
    pub x: String,
    pub y: String,
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
}

impl CrossPlotRequest {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            x_scale: AxisScale::Linear,
            y_scale: AxisScale::Linear,
        }
    }

    pub fn with_scales(mut self, x_scale: AxisScale, y_scale: AxisScale) -> Self {
        self.x_scale = x_scale;
        self.y_scale = y_scale;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossPlotPoint {
    pub depth: f64,
    pub x: f64,
    pub y: f64,
    pub formation: Option<String>,
}

/// OLS fit of `y` on `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
    /// Two-sided p-value of the slope (Student's t, `n - 2` dof).
    pub p_value: f64,
    /// `(x, y)` along the fitted line from `min(x)` to `max(x)`.
    pub samples: Vec<(f64, f64)>,
}

impl TrendLine {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }

    /// Hover label in the `y = a + bx` form used by the chart layer.
    pub fn equation(&self) -> String {
        format!(
            "y = {:.2} + {:.2}x, R² = {:.2}",
            self.intercept, self.slope, self.r_squared
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossPlot {
    pub x_name: String,
    pub y_name: String,
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
    /// Curve whose gaps were filled by depth interpolation, if any.
    pub interpolated: Option<String>,
    pub points: Vec<CrossPlotPoint>,
    /// `None` when fewer than two points remain or `x` is constant.
    pub trend: Option<TrendLine>,
}

impl CrossPlot {
    /// Distinct formation labels in point order.
    pub fn formations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.points.iter().filter_map(|p| p.formation.as_deref()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Build a cross-plot of two curves from a merged table.
///
/// Rows rejected by a log axis are dropped first. When the catalog says the
/// curves come from different sources, the one with the finer mean depth
/// step is linearly interpolated in depth across its interior gaps so it
/// lines up with the sparser one. Only rows where both values are present
/// become points.
pub fn prepare_cross_plot(
    merged: &DepthTable,
    catalog: &CurveCatalog,
    tops: Option<&FormationTops>,
    request: &CrossPlotRequest,
) -> Result<CrossPlot, CrossPlotError> {
    let xs = merged
        .column(&request.x)
        .ok_or_else(|| CrossPlotError::UnknownCurve(request.x.clone()))?;
    let ys = merged
        .column(&request.y)
        .ok_or_else(|| CrossPlotError::UnknownCurve(request.y.clone()))?;

    let mut depth = Vec::with_capacity(merged.len());
    let mut x = Vec::with_capacity(merged.len());
    let mut y = Vec::with_capacity(merged.len());
    for ((&d, &xv), &yv) in merged.depth().iter().zip(xs).zip(ys) {
        if request.x_scale.accepts(xv) && request.y_scale.accepts(yv) {
            depth.push(d);
            x.push(xv);
            y.push(yv);
        }
    }

    let mut interpolated = None;
    if catalog.needs_interpolation(&request.x, &request.y) {
        if mean_depth_step(&depth, &x) < mean_depth_step(&depth, &y) {
            interpolate_gaps(&depth, &mut x);
            interpolated = Some(request.x.clone());
        } else {
            interpolate_gaps(&depth, &mut y);
            interpolated = Some(request.y.clone());
        }
    }

    let points: Vec<CrossPlotPoint> = depth
        .iter()
        .zip(x.iter().zip(&y))
        .filter(|(_, (xv, yv))| !xv.is_nan() && !yv.is_nan())
        .map(|(&d, (&xv, &yv))| CrossPlotPoint {
            depth: d,
            x: xv,
            y: yv,
            formation: tops
                .and_then(|t| t.formation_at_depth(d))
                .map(|f| f.formation.clone()),
        })
        .collect();

    let px: Vec<f64> = points.iter().map(|p| p.x).collect();
    let py: Vec<f64> = points.iter().map(|p| p.y).collect();
    let trend = fit_trend(&px, &py);

    debug!(
        x = %request.x,
        y = %request.y,
        points = points.len(),
        interpolated = interpolated.as_deref().unwrap_or("-"),
        "Prepared cross-plot"
    );

    Ok(CrossPlot {
        x_name: request.x.clone(),
        y_name: request.y.clone(),
        x_scale: request.x_scale,
        y_scale: request.y_scale,
        interpolated,
        points,
        trend,
    })
}

/// Mean spacing between depths where `values` is present; infinite when
/// fewer than two samples exist.
fn mean_depth_step(depth: &[f64], values: &[f64]) -> f64 {
    let present: Vec<f64> = depth
        .iter()
        .zip(values)
        .filter(|(_, v)| !v.is_nan())
        .map(|(d, _)| *d)
        .collect();
    if present.len() < 2 {
        return f64::INFINITY;
    }
    let span = present[present.len() - 1] - present[0];
    span / (present.len() - 1) as f64
}

/// Fill `NaN` samples bracketed by present ones, linearly in depth.
/// Trailing gaps hold the last present value; leading gaps stay empty.
fn interpolate_gaps(depth: &[f64], values: &mut [f64]) {
    let mut prev: Option<usize> = None;
    let mut i = 0;
    while i < values.len() {
        if !values[i].is_nan() {
            prev = Some(i);
            i += 1;
            continue;
        }
        let Some(next) = (i..values.len()).find(|&j| !values[j].is_nan()) else {
            if let Some(p) = prev {
                let last = values[p];
                values[i..].fill(last);
            }
            break;
        };
        if let Some(p) = prev {
            let (d0, v0) = (depth[p], values[p]);
            let (d1, v1) = (depth[next], values[next]);
            for k in i..next {
                values[k] = if d1 == d0 {
                    v0
                } else {
                    v0 + (v1 - v0) * (depth[k] - d0) / (d1 - d0)
                };
            }
        }
        i = next;
    }
}

/// Ordinary least squares with intercept.
pub fn fit_trend(x: &[f64], y: &[f64]) -> Option<TrendLine> {
    use statrs::statistics::Statistics;

    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    let var_x = x.iter().variance();
    if var_x.is_nan() || var_x <= 0.0 {
        return None;
    }
    let slope = x.iter().covariance(y.iter()) / var_x;
    let intercept = y.iter().mean() - slope * x.iter().mean();

    let y_mean = y.iter().mean();
    let ss_tot: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xv, yv)| (yv - slope.mul_add(*xv, intercept)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

    let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = (hi - lo) / (TREND_SAMPLES - 1) as f64;
    let samples = (0..TREND_SAMPLES)
        .map(|k| {
            let xv = (k as f64).mul_add(step, lo);
            (xv, slope.mul_add(xv, intercept))
        })
        .collect();

    Some(TrendLine {
        intercept,
        slope,
        r_squared,
        p_value: slope_p_value(slope, ss_res, var_x, n),
        samples,
    })
}

/// Two-sided p-value for `H0: slope = 0`.
fn slope_p_value(slope: f64, ss_res: f64, var_x: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let dof = (n - 2) as f64;
    let sxx = var_x * (n - 1) as f64;
    let se = (ss_res / dof / sxx).sqrt();
    if se == 0.0 {
        return 0.0;
    }
    let t_stat = slope / se;
    match StudentsT::new(0.0, 1.0, dof) {
        Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}
