//! Engine Configuration Module
//! Tunable constants for header detection, slope fitting and saturation windows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable defaults for one analysis run.
///
/// Every field has a default matching the instrument's export conventions, so
/// an override file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Encoding labels tried in order; the first that decodes wins.
    pub encodings: Vec<String>,
    /// Maximum number of lines searched for the column header.
    pub header_scan_lines: usize,
    /// Row used when no header line is found.
    pub default_header_row: usize,
    /// Number of leading lines searched for `key=,value` preamble entries.
    pub metadata_scan_lines: usize,
    pub field_marker: String,
    pub moment_marker: String,
    /// Fraction of sorted samples used for each tail in automatic slope mode.
    pub segment_ratio: f64,
    pub min_segment_points: usize,
    /// Tails fitting worse than this are reported as low linearity.
    pub min_r_squared: f64,
    /// Manual windows with fewer points than this are fitted with a warning.
    pub low_confidence_points: usize,
    /// Samples beyond this fraction of the extreme field count as saturated.
    pub saturation_fraction: f64,
    /// Share of a visible field window used for each saturation edge.
    pub window_edge_fraction: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            encodings: vec!["Shift_JIS".to_string(), "UTF-8".to_string()],
            header_scan_lines: 100,
            default_header_row: 40,
            metadata_scan_lines: 41,
            field_marker: "H(Oe)".to_string(),
            moment_marker: "M(emu)".to_string(),
            segment_ratio: 0.15,
            min_segment_points: 5,
            min_r_squared: 0.99,
            low_confidence_points: 5,
            saturation_fraction: 0.9,
            window_edge_fraction: 0.1,
        }
    }
}

impl AnalysisConfig {
    /// Parse a JSON override; absent keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing analysis config JSON")
    }

    /// Load a JSON override file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json_str(&text)
    }
}
