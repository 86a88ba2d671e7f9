//! Signal conditioning for co-plotted series
//!
//! Raw arrays destined for joint visualization go through
//! [`sanitize`] → [`downsample`] → [`smooth`], in that order. Sanitizing
//! first keeps `NaN` out of the smoothing window; smoothing last matches the
//! depth resolution of the other series on the same plot.
//!
//! Smoothing is a separable Gaussian with `reflect` boundaries
//! (`d c b a | a b c d | d c b a`), kernel radius `round(4 σ)`.

use ndarray::{Array, ArrayView, Axis, Dimension, Slice};

use super::ProcessingError;

/// Gaussian kernel truncation, in standard deviations.
const TRUNCATE_SIGMAS: f64 = 4.0;

/// Parameters of the sanitize → downsample → smooth pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditioningParams {
    /// Values strictly below this mark "no data".
    pub sentinel_floor: f64,
    /// Keep every `stride`-th row.
    pub stride: usize,
    /// Gaussian standard deviation in samples.
    pub sigma: f64,
}

impl Default for ConditioningParams {
    fn default() -> Self {
        Self {
            sentinel_floor: -99.0,
            stride: 10,
            sigma: 2.0,
        }
    }
}

/// Replace sentinel and non-finite samples with `0`.
///
/// Values strictly below `sentinel_floor` are treated as missing; missing,
/// `NaN` and `±inf` samples all become `0`. Shape-preserving and idempotent.
pub fn sanitize<D: Dimension>(data: ArrayView<'_, f64, D>, sentinel_floor: f64) -> Array<f64, D> {
    data.mapv(|v| sanitize_value(v, sentinel_floor))
}

/// [`sanitize`] for a plain table column.
pub fn sanitize_slice(data: &[f64], sentinel_floor: f64) -> Vec<f64> {
    data.iter().map(|&v| sanitize_value(v, sentinel_floor)).collect()
}

#[inline]
fn sanitize_value(v: f64, sentinel_floor: f64) -> f64 {
    if v < sentinel_floor || !v.is_finite() {
        0.0
    } else {
        v
    }
}

/// Keep every `stride`-th row starting at row 0, for 1D and 2D arrays alike.
///
/// Output row `i` is input row `i * stride`; output length is
/// `ceil(rows / stride)`.
pub fn downsample<A: Clone, D: Dimension>(
    data: ArrayView<'_, A, D>,
    stride: usize,
) -> Result<Array<A, D>, ProcessingError> {
    if stride == 0 {
        return Err(ProcessingError::ZeroStride);
    }
    if data.ndim() == 0 {
        return Ok(data.to_owned());
    }
    let step = isize::try_from(stride).map_err(|_| ProcessingError::ZeroStride)?;
    Ok(data.slice_axis(Axis(0), Slice::new(0, None, step)).to_owned())
}

/// [`downsample`] for a plain table column.
pub fn downsample_slice<T: Clone>(data: &[T], stride: usize) -> Result<Vec<T>, ProcessingError> {
    if stride == 0 {
        return Err(ProcessingError::ZeroStride);
    }
    Ok(data.iter().step_by(stride).cloned().collect())
}

/// Normalized Gaussian weights over `[-r, r]`, `r = round(4 σ)`.
pub fn gaussian_kernel(sigma: f64) -> Result<Vec<f64>, ProcessingError> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(ProcessingError::InvalidSigma(sigma));
    }
    if sigma == 0.0 {
        return Ok(vec![1.0]);
    }
    let radius = (TRUNCATE_SIGMAS * sigma + 0.5).floor() as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| {
            let x = x as f64;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / sum).collect())
}

/// Gaussian smoothing with standard deviation `sigma`.
///
/// `dims = 1` smooths a scalar curve, `dims = 2` smooths an image or mask
/// isotropically. `dims` must match the array rank. Shape is preserved.
pub fn smooth<D: Dimension>(
    data: ArrayView<'_, f64, D>,
    sigma: f64,
    dims: usize,
) -> Result<Array<f64, D>, ProcessingError> {
    if !(1..=2).contains(&dims) || data.ndim() != dims {
        return Err(ProcessingError::DimensionMismatch {
            expected: dims,
            found: data.ndim(),
        });
    }
    let kernel = gaussian_kernel(sigma)?;
    let mut out = data.to_owned();
    if kernel.len() == 1 {
        return Ok(out);
    }
    for axis in 0..dims {
        correlate_axis(&mut out, Axis(axis), &kernel);
    }
    Ok(out)
}

/// Full display pipeline: sanitize → downsample → smooth.
pub fn condition<D: Dimension>(
    data: ArrayView<'_, f64, D>,
    params: &ConditioningParams,
) -> Result<Array<f64, D>, ProcessingError> {
    let clean = sanitize(data, params.sentinel_floor);
    let sampled = downsample(clean.view(), params.stride)?;
    smooth(sampled.view(), params.sigma, sampled.ndim())
}

/// Apply a symmetric kernel along one axis with reflect boundaries.
fn correlate_axis<D: Dimension>(data: &mut Array<f64, D>, axis: Axis, kernel: &[f64]) {
    let radius = (kernel.len() / 2) as isize;
    let mut lane_buf: Vec<f64> = Vec::new();
    for mut lane in data.lanes_mut(axis) {
        lane_buf.clear();
        lane_buf.extend(lane.iter().copied());
        let n = lane_buf.len();
        for (i, out) in lane.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let pos = i as isize + k as isize - radius;
                acc += w * lane_buf[reflect_index(pos, n)];
            }
            *out = acc;
        }
    }
}

/// Map an out-of-range index into `[0, n)` by half-sample reflection.
/// Handles offsets wider than the lane by repeating the reflection.
fn reflect_index(pos: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = pos.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}
