//! Shared data structures for FMI washout analysis
//!
//! - Channel containers: named 2D image channels plus the depth vector
//! - Depth-indexed tables: logs, drilling curves, FMI-derived curves, zone grids
//! - Formation tops: normalized TOP/BOTTOM intervals

mod channels;
mod formation;
mod table;

pub use channels::*;
pub use formation::*;
pub use table::*;
