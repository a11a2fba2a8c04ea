//! Analysis Warnings
//! Non-fatal conditions collected alongside results instead of aborting.

use serde::Serialize;
use std::fmt;

/// Which half of the field axis a fit or window belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Positive,
    Negative,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Positive => write!(f, "positive"),
            Side::Negative => write!(f, "negative"),
        }
    }
}

/// Calculation a field window was used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Slope,
    Saturation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Slope => write!(f, "slope"),
            Stage::Saturation => write!(f, "saturation"),
        }
    }
}

/// Derived property that can fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Property {
    Remanence,
    Coercivity,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Remanence => write!(f, "remanence"),
            Property::Coercivity => write!(f, "coercivity"),
        }
    }
}

/// A recoverable condition met while analysing one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AnalysisWarning {
    /// No header line matched; the default row was used.
    HeaderNotFound { default_row: usize },
    /// No encoding yielded any preamble entries.
    MetadataUnavailable,
    /// Too few samples for automatic tail fitting; slope left at zero.
    InsufficientData { points: usize, required: usize },
    /// Least squares failed on degenerate data; that side's slope is zero.
    RegressionFailed { side: Side, reason: String },
    /// Tail fit accepted but below the linearity threshold.
    LowLinearity { side: Side, r_squared: f64 },
    /// Manual window holds too few samples; that side contributes zero.
    InsufficientRange { side: Side, stage: Stage, points: usize },
    /// Manual slope window fitted with only a handful of samples.
    FewPointsInRange { side: Side, points: usize },
    /// Only one side produced a non-zero slope.
    SingleSideSlope { side: Side },
    /// A saturation set was empty; that side's estimate is zero.
    EmptySaturationSide { side: Side },
    /// Interpolation at zero crossing failed; the property is null.
    InterpolationFailed { property: Property, reason: String },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::HeaderNotFound { default_row } => write!(
                f,
                "header row not detected, using default row {}",
                default_row + 1
            ),
            AnalysisWarning::MetadataUnavailable => write!(f, "no measurement metadata found"),
            AnalysisWarning::InsufficientData { points, required } => write!(
                f,
                "only {points} points (need {required}), automatic slope detection skipped"
            ),
            AnalysisWarning::RegressionFailed { side, reason } => {
                write!(f, "{side} side fit failed: {reason}")
            }
            AnalysisWarning::LowLinearity { side, r_squared } => {
                write!(f, "{side} side linearity is low (R^2 = {r_squared:.4})")
            }
            AnalysisWarning::InsufficientRange {
                side,
                stage,
                points,
            } => write!(f, "{side} {stage} window has only {points} point(s)"),
            AnalysisWarning::FewPointsInRange { side, points } => {
                write!(f, "{side} slope window has few points ({points})")
            }
            AnalysisWarning::SingleSideSlope { side } => {
                write!(f, "only the {side} side slope is used")
            }
            AnalysisWarning::EmptySaturationSide { side } => {
                write!(f, "no {side} saturation samples")
            }
            AnalysisWarning::InterpolationFailed { property, reason } => {
                write!(f, "{property} could not be interpolated: {reason}")
            }
        }
    }
}

/// Ordered sink for warnings; each entry is also logged.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Warnings(Vec<AnalysisWarning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: AnalysisWarning) {
        tracing::warn!(%warning, "analysis warning");
        self.0.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisWarning> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }

    pub fn into_vec(self) -> Vec<AnalysisWarning> {
        self.0
    }
}
