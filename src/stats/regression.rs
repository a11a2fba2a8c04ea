//! Linear Regression Module
//! Ordinary least squares of moment on field, with R².

use statrs::statistics::Statistics;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegressionError {
    #[error("need at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("x and y lengths differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },
    #[error("all x values are identical")]
    DegenerateX,
    #[error("non-finite values in input")]
    NonFinite,
}

/// Result of a straight-line fit `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub points: usize,
}

/// Fit `y` against `x` by ordinary least squares.
///
/// R² is reported as 0 when `y` has no variance, matching the usual
/// convention for a correlation coefficient that is undefined.
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LinearFit, RegressionError> {
    if x.len() != y.len() {
        return Err(RegressionError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(RegressionError::TooFewPoints(n));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(RegressionError::NonFinite);
    }

    let var_x = x.iter().variance();
    if var_x <= 0.0 {
        return Err(RegressionError::DegenerateX);
    }
    let var_y = y.iter().variance();
    let cov_xy = x.iter().covariance(y.iter());

    let slope = cov_xy / var_x;
    let intercept = y.iter().mean() - slope * x.iter().mean();
    let r_squared = if var_y > 0.0 {
        let r = (cov_xy / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
        r * r
    } else {
        0.0
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        points: n,
    })
}
