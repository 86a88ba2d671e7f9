//! `.npz` session files
//!
//! Each archive entry is one named array. 2D entries are image channels;
//! the entry named after the depth key is the depth vector. Numeric
//! element types are widened to `f64` on load.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use ndarray::{Array1, ArrayD, Ix2, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError};
use tracing::{debug, info};

use super::{ChannelSource, LoadError};
use crate::types::{ChannelSet, DEFAULT_DEPTH_KEY};

const NPY_SUFFIX: &str = ".npy";

/// Loads [`ChannelSet`]s from `.npz` archives.
#[derive(Debug, Clone)]
pub struct NpzChannelSource {
    depth_key: String,
}

impl Default for NpzChannelSource {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH_KEY)
    }
}

impl NpzChannelSource {
    pub fn new(depth_key: impl Into<String>) -> Self {
        Self {
            depth_key: depth_key.into(),
        }
    }

    pub fn depth_key(&self) -> &str {
        &self.depth_key
    }
}

impl ChannelSource for NpzChannelSource {
    fn load(&self, path: &Path) -> Result<ChannelSet, LoadError> {
        let npz_err = |source| LoadError::Npz {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut npz = NpzReader::new(file).map_err(npz_err)?;

        let mut set = ChannelSet::new();
        for raw_name in npz.names().map_err(npz_err)? {
            let name = raw_name.strip_suffix(NPY_SUFFIX).unwrap_or(&raw_name).to_string();
            let array = read_widened(&mut npz, &raw_name).map_err(npz_err)?;

            if name.eq_ignore_ascii_case(&self.depth_key) {
                // stored either flat or as a single column
                if array.len() != array.shape().first().copied().unwrap_or(0) {
                    return Err(LoadError::Shape {
                        path: path.to_path_buf(),
                        entry: name,
                    });
                }
                set.set_depth(Array1::from_iter(array.iter().copied()));
            } else if array.ndim() == 2 {
                let image = array.into_dimensionality::<Ix2>().map_err(|_| LoadError::Shape {
                    path: path.to_path_buf(),
                    entry: name.clone(),
                })?;
                set.insert_channel(name, image);
            } else {
                debug!(entry = %name, ndim = array.ndim(), "Skipping non-image entry");
            }
        }

        if let Some(depth) = set.depth() {
            if let Some(index) = first_unordered_sample(depth.as_slice().unwrap_or_default()) {
                return Err(LoadError::DepthOrder {
                    path: path.to_path_buf(),
                    index,
                });
            }
            for name in set.names() {
                let rows = set.get(name).map_or(0, |img| img.nrows());
                if rows != depth.len() {
                    return Err(LoadError::DepthMismatch {
                        channel: name.to_string(),
                        rows,
                        depth: depth.len(),
                    });
                }
            }
        }

        info!(
            path = %path.display(),
            channels = set.len(),
            has_depth = set.depth().is_some(),
            "Loaded session file"
        );
        Ok(set)
    }
}

/// First depth sample that is not finite or lies above its predecessor.
fn first_unordered_sample(depth: &[f64]) -> Option<usize> {
    depth
        .iter()
        .enumerate()
        .position(|(i, d)| !d.is_finite() || (i > 0 && *d < depth[i - 1]))
}

/// Read an entry as `f64`, widening `f32`, `i32`, `i16` and `u8` data.
fn read_widened<R: Read + Seek>(
    npz: &mut NpzReader<R>,
    name: &str,
) -> Result<ArrayD<f64>, ReadNpzError> {
    let first_err = match npz.by_name::<OwnedRepr<f64>, IxDyn>(name) {
        Ok(a) => return Ok(a),
        Err(e) => e,
    };
    if let Ok(a) = npz.by_name::<OwnedRepr<f32>, IxDyn>(name) {
        return Ok(a.mapv(f64::from));
    }
    if let Ok(a) = npz.by_name::<OwnedRepr<i32>, IxDyn>(name) {
        return Ok(a.mapv(f64::from));
    }
    if let Ok(a) = npz.by_name::<OwnedRepr<i16>, IxDyn>(name) {
        return Ok(a.mapv(f64::from));
    }
    if let Ok(a) = npz.by_name::<OwnedRepr<u8>, IxDyn>(name) {
        return Ok(a.mapv(f64::from));
    }
    Err(first_err)
}
