//! FMI channel containers
//!
//! A session file deserializes into named 2D image channels plus a depth
//! vector. Rows of every channel are depth samples (increasing downwards),
//! columns are azimuthal samples around the borehole wall.

use ndarray::{Array1, Array2};

/// Channel identifiers recognized by default: dynamic and static
/// high-resolution images at the upper and lower conductivity bands.
pub const DEFAULT_RECOGNIZED_CHANNELS: [&str; 4] = ["DYN_HRUT", "DYN_HRLT", "STA_HRLT", "STA_HRUT"];

/// Reserved key of the depth vector inside a session file.
pub const DEFAULT_DEPTH_KEY: &str = "DEPT";

/// Named image channels loaded from one session file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSet {
    channels: Vec<(String, Array2<f64>)>,
    depth: Option<Array1<f64>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a channel. Replacement keeps the original position.
    pub fn insert_channel(&mut self, name: impl Into<String>, image: Array2<f64>) {
        let name = name.into();
        if let Some(slot) = self.channels.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = image;
        } else {
            self.channels.push((name, image));
        }
    }

    pub fn set_depth(&mut self, depth: Array1<f64>) {
        self.depth = Some(depth);
    }

    pub fn with_depth(mut self, depth: Array1<f64>) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_channel(mut self, name: impl Into<String>, image: Array2<f64>) -> Self {
        self.insert_channel(name, image);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|(n, _)| n.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Array2<f64>> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, img)| img)
    }

    pub fn depth(&self) -> Option<&Array1<f64>> {
        self.depth.as_ref()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels whose upper-cased name is in `recognized`, in file order.
    pub fn relevant_channels<S: AsRef<str>>(&self, recognized: &[S]) -> Vec<String> {
        self.channels
            .iter()
            .map(|(n, _)| n)
            .filter(|n| {
                let upper = n.to_uppercase();
                recognized.iter().any(|r| r.as_ref().to_uppercase() == upper)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relevant_channels_case_insensitive_in_file_order() {
        let set = ChannelSet::new()
            .with_channel("sta_hrlt", array![[1.0]])
            .with_channel("CALIPER", array![[1.0]])
            .with_channel("Dyn_HRUT", array![[1.0]]);
        assert_eq!(
            set.relevant_channels(&DEFAULT_RECOGNIZED_CHANNELS),
            vec!["sta_hrlt".to_string(), "Dyn_HRUT".to_string()]
        );
    }

    #[test]
    fn test_relevant_channels_requires_exact_match() {
        let set = ChannelSet::new().with_channel("DYN_HRUT_RAW", array![[1.0]]);
        assert!(set.relevant_channels(&DEFAULT_RECOGNIZED_CHANNELS).is_empty());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut set = ChannelSet::new()
            .with_channel("A", array![[1.0]])
            .with_channel("B", array![[2.0]]);
        set.insert_channel("A", array![[9.0]]);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(set.get("A").unwrap()[[0, 0]], 9.0);
    }
}
