//! Measurement Data Model
//! Raw instrument samples and the free-form preamble metadata.

use serde::Serialize;
use std::collections::BTreeMap;

use super::units::{SampleGeometry, OE_TO_TESLA};

// ---------------------------------------------------------------------------
// RawSample – field/moment pairs as exported by the instrument
// ---------------------------------------------------------------------------

/// Field/moment pairs in instrument-native units (Oe, emu), in sweep order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSample {
    pub field_oe: Vec<f64>,
    pub moment_emu: Vec<f64>,
}

impl RawSample {
    pub fn len(&self) -> usize {
        self.field_oe.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_oe.is_empty()
    }

    /// Convert to (field [T], moment [kA/m]) for the given sample geometry.
    pub fn to_si(&self, geometry: &SampleGeometry) -> (Vec<f64>, Vec<f64>) {
        let volume = geometry.volume_cm3();
        let field = self.field_oe.iter().map(|h| h * OE_TO_TESLA).collect();
        let moment = self.moment_emu.iter().map(|m| m / volume).collect();
        (field, moment)
    }
}

// ---------------------------------------------------------------------------
// MeasurementMetadata – free-form preamble entries
// ---------------------------------------------------------------------------

/// Preamble keys shown in the measurement-info view, with display labels.
pub const DISPLAY_KEYS: [(&str, &str); 11] = [
    ("date", "Date"),
    ("sample name", "Sample name"),
    ("comment", "Comment"),
    ("lock-in amp. sensitivity", "Sensitivity (mV)"),
    ("lock-in amp. time constant", "Time constant (msec)"),
    ("measuring points", "Measuring points"),
    ("max magnetic field", "Max field (Oe)"),
    ("max magnetization", "Max magnetization (emu)"),
    ("lock-in amp. phase", "Phase (deg)"),
    ("pole piece gap", "Pole piece gap (mm)"),
    ("calibration value", "Calibration value"),
];

/// Placeholder for keys absent from a file.
pub const MISSING_VALUE: &str = "---";

/// String key/value pairs from the file preamble. No key is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeasurementMetadata {
    entries: BTreeMap<String, String>,
}

impl MeasurementMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Lookup ignoring ASCII case; instruments differ in key capitalisation.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Label/value pairs for the known instrument keys, `---` when absent.
    pub fn display_fields(&self) -> Vec<(&'static str, String)> {
        DISPLAY_KEYS
            .iter()
            .map(|(key, label)| {
                let value = self.get_ignore_case(key).unwrap_or(MISSING_VALUE);
                (*label, value.to_string())
            })
            .collect()
    }
}
