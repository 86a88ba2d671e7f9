//! Image and signal processing - washout masks, curves, and conditioning

mod conditioning;
mod mask;

pub use conditioning::*;
pub use mask::*;

use thiserror::Error;

/// Errors in signal processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Downsample stride must be at least 1")]
    ZeroStride,

    #[error("Invalid smoothing sigma: {0}")]
    InvalidSigma(f64),

    #[error("Smoothing over {expected} dimension(s) requested for a {found}-dimensional array")]
    DimensionMismatch { expected: usize, found: usize },
}
