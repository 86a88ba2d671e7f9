//! Formation-tops types

use serde::{Deserialize, Serialize};

/// Canonical schema of a formation-tops file after normalization.
pub const TOPS_SCHEMA: [&str; 6] = ["TOP", "FORMATION_SHORT", "FORMATION", "LATERAL", "VERSION", "DATE"];

/// A single formation interval. `bottom` is the next interval's top, or
/// the open-ended sentinel for the deepest formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationTop {
    pub top: f64,
    pub bottom: f64,
    pub formation: String,
}

/// Normalized formation tops, sorted by `top`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormationTops {
    pub intervals: Vec<FormationTop>,
}

impl FormationTops {
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Look up the formation at a given depth: `top <= depth < bottom`.
    pub fn formation_at_depth(&self, depth: f64) -> Option<&FormationTop> {
        self.intervals
            .iter()
            .find(|f| depth >= f.top && depth < f.bottom)
    }

    /// Distinct formation names in order of first appearance.
    pub fn formation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for f in &self.intervals {
            if !names.contains(&f.formation.as_str()) {
                names.push(&f.formation);
            }
        }
        names
    }

    pub fn tops(&self) -> Vec<f64> {
        self.intervals.iter().map(|f| f.top).collect()
    }

    pub fn bottoms(&self) -> Vec<f64> {
        self.intervals.iter().map(|f| f.bottom).collect()
    }
}
