//! Statistics module - background fitting, corrections and loop properties

mod calculator;
mod corrector;
mod regression;
mod slope;

pub use calculator::{
    interpolate, saturation_means, Coercivity, InterpolationError, MsRangePolicy,
    PropertyCalculator, Saturation,
};
pub use corrector::{Correction, MagnetizationCorrector};
pub use regression::{fit_line, LinearFit, RegressionError};
pub use slope::{CorrectionParameters, FieldRange, SlopeEstimate, SlopeEstimator, SlopeMode};
