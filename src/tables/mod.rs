//! Depth-indexed table pipeline
//!
//! - `merge`: full outer join on `DEPTH` plus the curve → source catalog
//! - `formation_tops`: tops spreadsheet normalization and zone grids
//! - `crossplot`: two-curve cross-plots with an OLS trend line

mod crossplot;
mod formation_tops;
mod merge;

pub use crossplot::*;
pub use formation_tops::*;
pub use merge::*;
