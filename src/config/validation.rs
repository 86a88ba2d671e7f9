//! Config validation: unknown-key detection and value range checks
//!
//! Unknown keys are found by walking the raw `toml::Value` tree before serde
//! sees it and comparing every dotted path with [`known_config_keys`].
//! Near misses get a "did you mean" suggestion. Unknown keys only warn.

use std::collections::HashSet;

/// Maximum edit distance for a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// A non-fatal config finding (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationWarning {
    fn unknown_key(key: &str, known: &HashSet<&str>) -> Self {
        Self {
            field: key.to_string(),
            message: format!("Unknown config key '{key}'"),
            suggestion: suggest_correction(key, known),
        }
    }

    fn range(field: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            message,
            suggestion: None,
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.suggestion {
            Some(s) => write!(f, "{} (did you mean '{s}'?)", self.message),
            None => f.write_str(&self.message),
        }
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `AnalysisConfig`, sections included.
///
/// Kept in step with analysis_config.rs by hand.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        "processing",
        "processing.downsample_stride",
        "processing.smoothing_sigma",
        "processing.sentinel_floor",
        "processing.default_threshold",
        "processing.default_aspect_ratio",
        "channels",
        "channels.recognized",
        "channels.depth_key",
        "channels.session_extension",
        "formation_tops",
        "formation_tops.expected_columns",
        "formation_tops.primary_label",
        "formation_tops.secondary_label",
        "formation_tops.open_end_offset",
        "formation_tops.marker_value",
        "formation_tops.depth_step",
        "logview",
        "logview.default_curve_count",
        "logview.features_to_log",
        "export",
        "export.table_dir",
        "export.mask_dir",
    ]
    .into_iter()
    .collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Dotted paths of every key in a TOML tree, parents before children.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };
    table
        .iter()
        .flat_map(|(key, child)| {
            let path = match prefix {
                "" => key.clone(),
                _ => format!("{prefix}.{key}"),
            };
            let nested = walk_toml_keys(child, &path);
            std::iter::once(path).chain(nested)
        })
        .collect()
}

// ============================================================================
// Suggestions
// ============================================================================

/// Levenshtein edit distance, single-row dynamic programming over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// Closest known key within edit distance 3. Ties go to the
/// lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(d, _)| *d <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every key of `raw_toml` that `AnalysisConfig` does not know.
///
/// Unparseable input yields no warnings; serde reports the syntax error.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };
    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning::unknown_key(key, &known))
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate value ranges on a parsed AnalysisConfig.
///
/// Returns (errors, warnings). Errors are values the pipeline cannot run
/// with; warnings are legal but unusual.
pub fn validate_physical_ranges(
    config: &super::AnalysisConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let p = &config.processing;
    if !p.smoothing_sigma.is_finite() || p.smoothing_sigma < 0.0 {
        errors.push(format!(
            "processing.smoothing_sigma = {} must be a finite value >= 0",
            p.smoothing_sigma
        ));
    } else if p.smoothing_sigma > 20.0 {
        warnings.push(ValidationWarning::range(
            "processing.smoothing_sigma",
            format!(
                "smoothing_sigma = {:.1} samples will flatten most curve detail",
                p.smoothing_sigma
            ),
        ));
    }
    if !p.sentinel_floor.is_finite() {
        errors.push(format!(
            "processing.sentinel_floor = {} must be finite",
            p.sentinel_floor
        ));
    } else if p.sentinel_floor >= 0.0 {
        warnings.push(ValidationWarning::range(
            "processing.sentinel_floor",
            format!(
                "sentinel_floor = {:.1} is not negative; valid zero samples may be discarded",
                p.sentinel_floor
            ),
        ));
    }
    if p.downsample_stride > 1000 {
        warnings.push(ValidationWarning::range(
            "processing.downsample_stride",
            format!(
                "downsample_stride = {} keeps very few display rows",
                p.downsample_stride
            ),
        ));
    }

    let t = &config.formation_tops;
    if !t.depth_step.is_finite() || t.depth_step <= 0.0 {
        errors.push(format!(
            "formation_tops.depth_step = {} must be > 0",
            t.depth_step
        ));
    }
    if !t.open_end_offset.is_finite() || t.open_end_offset <= 0.0 {
        errors.push(format!(
            "formation_tops.open_end_offset = {} must be > 0",
            t.open_end_offset
        ));
    }
    if !t.marker_value.is_finite() || t.marker_value == 0.0 {
        errors.push(format!(
            "formation_tops.marker_value = {} must be finite and non-zero",
            t.marker_value
        ));
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
