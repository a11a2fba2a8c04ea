//! Header Locator & Metadata Extractor
//! Finds the column-header row and parses `key=,value,...` preamble lines.

use std::path::Path;

use super::encoding::{decode_attempts, read_bytes};
use super::model::MeasurementMetadata;
use crate::config::AnalysisConfig;

/// Result of a header search. `detected == false` means `row` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocation {
    pub row: usize,
    pub detected: bool,
}

/// Locates the data header among the preamble lines.
pub struct HeaderLocator;

impl HeaderLocator {
    /// Find the 0-indexed header row of an instrument file.
    ///
    /// Unreadable files and files without a marker line within the scan
    /// limit both fall back to `config.default_header_row`.
    pub fn locate_header_row(path: &Path, config: &AnalysisConfig) -> HeaderLocation {
        match read_bytes(path) {
            Ok(bytes) => Self::locate_in_bytes(&bytes, config),
            Err(err) => {
                tracing::warn!(
                    file = %path.display(),
                    error = %err,
                    "cannot read file for header search"
                );
                Self::fallback(config)
            }
        }
    }

    pub fn locate_in_bytes(bytes: &[u8], config: &AnalysisConfig) -> HeaderLocation {
        for decoded in decode_attempts(bytes, &config.encodings) {
            if let Some(row) = Self::find_in_text(&decoded.text, config) {
                tracing::debug!(row = row + 1, encoding = decoded.encoding, "header detected");
                return HeaderLocation {
                    row,
                    detected: true,
                };
            }
        }
        Self::fallback(config)
    }

    /// First line within the scan limit carrying both column markers.
    pub fn find_in_text(text: &str, config: &AnalysisConfig) -> Option<usize> {
        text.lines()
            .take(config.header_scan_lines)
            .position(|line| {
                line.contains(&config.field_marker) && line.contains(&config.moment_marker)
            })
    }

    fn fallback(config: &AnalysisConfig) -> HeaderLocation {
        HeaderLocation {
            row: config.default_header_row,
            detected: false,
        }
    }
}

/// Parses the free-form measurement preamble.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract preamble entries; any failure yields an empty mapping.
    pub fn extract_metadata(path: &Path, config: &AnalysisConfig) -> MeasurementMetadata {
        match read_bytes(path) {
            Ok(bytes) => Self::extract_from_bytes(&bytes, config),
            Err(err) => {
                tracing::warn!(
                    file = %path.display(),
                    error = %err,
                    "cannot read file for metadata"
                );
                MeasurementMetadata::new()
            }
        }
    }

    /// The first encoding producing at least one entry wins.
    pub fn extract_from_bytes(bytes: &[u8], config: &AnalysisConfig) -> MeasurementMetadata {
        decode_attempts(bytes, &config.encodings)
            .map(|decoded| Self::extract_from_text(&decoded.text, config))
            .find(|meta| !meta.is_empty())
            .unwrap_or_default()
    }

    pub fn extract_from_text(text: &str, config: &AnalysisConfig) -> MeasurementMetadata {
        let mut metadata = MeasurementMetadata::new();
        for (key, value) in text
            .lines()
            .take(config.metadata_scan_lines)
            .filter_map(Self::parse_line)
        {
            metadata.insert(key, value);
        }
        metadata
    }

    /// `Sample Name=,Foo-1,unit` → `("Sample Name", "Foo-1")`.
    ///
    /// The text after `=` must start with a comma; the value is the token
    /// after that comma. Anything else is not a preamble entry.
    pub fn parse_line(line: &str) -> Option<(String, String)> {
        let (key, rest) = line.trim().split_once('=')?;
        let key = key.trim();
        let value = rest.strip_prefix(',')?.split(',').next()?.trim();
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some((key.to_string(), value.to_string()))
    }
}
