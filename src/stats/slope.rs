//! Diamagnetic Slope Estimator
//! Fits the linear, non-hysteretic background on the high-field tails of a loop.

use serde::{Deserialize, Serialize};

use super::regression::{fit_line, LinearFit};
use crate::config::AnalysisConfig;
use crate::warning::{AnalysisWarning, Side, Stage, Warnings};

/// Inclusive field window in tesla.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldRange {
    pub lo: f64,
    pub hi: f64,
}

impl FieldRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, h: f64) -> bool {
        h >= self.lo && h <= self.hi
    }

    /// Negative-side window linked to a positive one: `[-hi, -lo]`.
    pub fn mirrored(&self) -> Self {
        Self {
            lo: -self.hi,
            hi: -self.lo,
        }
    }
}

/// How the background slope is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlopeMode {
    /// Fit the outermost fraction of samples on each side.
    #[default]
    Auto,
    /// Fit caller-supplied field windows.
    Manual,
}

/// Per-invocation background-correction settings, owned by the caller.
///
/// The default enables automatic detection and carries the customary
/// manual windows (0.5–1.2 T and its mirror) for when the mode is switched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionParameters {
    pub enabled: bool,
    pub mode: SlopeMode,
    pub positive_range: Option<FieldRange>,
    pub negative_range: Option<FieldRange>,
}

impl Default for CorrectionParameters {
    fn default() -> Self {
        let positive = FieldRange::new(0.5, 1.2);
        Self {
            enabled: true,
            mode: SlopeMode::Auto,
            positive_range: Some(positive),
            negative_range: Some(positive.mirrored()),
        }
    }
}

impl CorrectionParameters {
    /// Correction switched on with automatic tail detection.
    pub fn auto() -> Self {
        Self::default()
    }

    /// Correction switched on with explicit windows.
    pub fn manual(positive: FieldRange, negative: FieldRange) -> Self {
        Self {
            enabled: true,
            mode: SlopeMode::Manual,
            positive_range: Some(positive),
            negative_range: Some(negative),
        }
    }

    /// No background subtraction.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Background slope and per-side fit quality.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SlopeEstimate {
    pub slope: f64,
    pub slope_positive: f64,
    pub slope_negative: f64,
    pub r2_positive: f64,
    pub r2_negative: f64,
}

/// Estimates the diamagnetic/paramagnetic background slope.
pub struct SlopeEstimator;

impl SlopeEstimator {
    /// Estimate the slope in the requested mode.
    ///
    /// Manual mode without both windows yields zero plus a warning per
    /// missing side. R² of each side is always reported, 0 where no fit exists.
    pub fn estimate(
        field: &[f64],
        moment: &[f64],
        mode: SlopeMode,
        positive_range: Option<FieldRange>,
        negative_range: Option<FieldRange>,
        config: &AnalysisConfig,
        warnings: &mut Warnings,
    ) -> SlopeEstimate {
        let (pos, neg) = match mode {
            SlopeMode::Auto => match Self::auto_tails(field, moment, config, warnings) {
                Some(tails) => tails,
                None => return SlopeEstimate::default(),
            },
            SlopeMode::Manual => (
                Self::manual_side(field, moment, positive_range, Side::Positive, config, warnings),
                Self::manual_side(field, moment, negative_range, Side::Negative, config, warnings),
            ),
        };

        let slope_positive = pos.map_or(0.0, |fit| fit.slope);
        let slope_negative = neg.map_or(0.0, |fit| fit.slope);
        let slope = combine_sides(slope_positive, slope_negative, warnings);
        let estimate = SlopeEstimate {
            slope,
            slope_positive,
            slope_negative,
            r2_positive: pos.map_or(0.0, |fit| fit.r_squared),
            r2_negative: neg.map_or(0.0, |fit| fit.r_squared),
        };
        tracing::debug!(
            ?mode,
            slope = estimate.slope,
            r2_pos = estimate.r2_positive,
            r2_neg = estimate.r2_negative,
            "background slope estimated"
        );
        estimate
    }

    /// Fit both ends of the field-sorted samples.
    ///
    /// Returns `None` when there are fewer than two segments' worth of points.
    fn auto_tails(
        field: &[f64],
        moment: &[f64],
        config: &AnalysisConfig,
        warnings: &mut Warnings,
    ) -> Option<(Option<LinearFit>, Option<LinearFit>)> {
        let n = field.len().min(moment.len());
        let segment = config
            .min_segment_points
            .max((n as f64 * config.segment_ratio) as usize);
        if n < segment * 2 {
            warnings.push(AnalysisWarning::InsufficientData {
                points: n,
                required: segment * 2,
            });
            return None;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| field[a].total_cmp(&field[b]));
        let take = |indices: &[usize]| -> (Vec<f64>, Vec<f64>) {
            indices.iter().map(|&i| (field[i], moment[i])).unzip()
        };

        let (h_neg, m_neg) = take(&order[..segment]);
        let (h_pos, m_pos) = take(&order[n - segment..]);
        let pos = Self::fit_side(&h_pos, &m_pos, Side::Positive, warnings);
        let neg = Self::fit_side(&h_neg, &m_neg, Side::Negative, warnings);

        for (fit, side) in [(pos, Side::Positive), (neg, Side::Negative)] {
            if let Some(fit) = fit {
                if fit.r_squared < config.min_r_squared {
                    warnings.push(AnalysisWarning::LowLinearity {
                        side,
                        r_squared: fit.r_squared,
                    });
                }
            }
        }
        Some((pos, neg))
    }

    /// Fit the samples inside one manual window.
    fn manual_side(
        field: &[f64],
        moment: &[f64],
        range: Option<FieldRange>,
        side: Side,
        config: &AnalysisConfig,
        warnings: &mut Warnings,
    ) -> Option<LinearFit> {
        let Some(range) = range else {
            warnings.push(AnalysisWarning::InsufficientRange {
                side,
                stage: Stage::Slope,
                points: 0,
            });
            return None;
        };
        let (h, m): (Vec<f64>, Vec<f64>) = field
            .iter()
            .zip(moment)
            .filter(|(h, _)| range.contains(**h))
            .map(|(h, m)| (*h, *m))
            .unzip();

        tracing::debug!(
            %side,
            lo = range.lo,
            hi = range.hi,
            points = h.len(),
            "manual slope window"
        );
        if h.len() < 2 {
            warnings.push(AnalysisWarning::InsufficientRange {
                side,
                stage: Stage::Slope,
                points: h.len(),
            });
            return None;
        }
        if h.len() < config.low_confidence_points {
            warnings.push(AnalysisWarning::FewPointsInRange {
                side,
                points: h.len(),
            });
        }
        Self::fit_side(&h, &m, side, warnings)
    }

    fn fit_side(h: &[f64], m: &[f64], side: Side, warnings: &mut Warnings) -> Option<LinearFit> {
        match fit_line(h, m) {
            Ok(fit) => Some(fit),
            Err(err) => {
                warnings.push(AnalysisWarning::RegressionFailed {
                    side,
                    reason: err.to_string(),
                });
                None
            }
        }
    }
}

/// Average of both sides when both are non-zero, else the non-zero one.
fn combine_sides(positive: f64, negative: f64, warnings: &mut Warnings) -> f64 {
    match (positive != 0.0, negative != 0.0) {
        (true, true) => (positive + negative) / 2.0,
        (true, false) => {
            warnings.push(AnalysisWarning::SingleSideSlope {
                side: Side::Positive,
            });
            positive
        }
        (false, true) => {
            warnings.push(AnalysisWarning::SingleSideSlope {
                side: Side::Negative,
            });
            negative
        }
        (false, false) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Square loop with saturation 20, plus `slope·H`, swept 2 → -2 → 2.
    fn loop_with_background(n_half: usize, slope: f64) -> (Vec<f64>, Vec<f64>) {
        let mut field = Vec::new();
        let mut moment = Vec::new();
        for i in 0..=n_half {
            let h = 2.0 - 4.0 * i as f64 / n_half as f64;
            field.push(h);
            moment.push((20.0 * (h + 0.5)).clamp(-20.0, 20.0) + slope * h);
        }
        for i in 1..=n_half {
            let h = -2.0 + 4.0 * i as f64 / n_half as f64;
            field.push(h);
            moment.push((20.0 * (h - 0.5)).clamp(-20.0, 20.0) + slope * h);
        }
        (field, moment)
    }

    #[test]
    fn auto_recovers_injected_slope() {
        let (h, m) = loop_with_background(100, 0.1);
        let mut warnings = Warnings::new();
        let est = SlopeEstimator::estimate(
            &h,
            &m,
            SlopeMode::Auto,
            None,
            None,
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert!((est.slope - 0.1).abs() < 0.005, "slope = {}", est.slope);
        assert!(est.r2_positive > 0.99 && est.r2_negative > 0.99);
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn auto_skips_short_input() {
        let h = [1.0, 0.0, -1.0, 0.0, 1.0];
        let m = [1.0, 0.0, -1.0, 0.0, 1.0];
        let mut warnings = Warnings::new();
        let est = SlopeEstimator::estimate(
            &h,
            &m,
            SlopeMode::Auto,
            None,
            None,
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert_eq!(est, SlopeEstimate::default());
        assert_eq!(
            warnings.into_vec(),
            vec![AnalysisWarning::InsufficientData {
                points: 5,
                required: 10
            }]
        );
    }

    #[test]
    fn auto_degenerate_side_only_affects_that_side() {
        // negative tail has one repeated field value
        let mut h = vec![-2.0; 6];
        let mut m = vec![-20.0, -20.1, -19.9, -20.0, -20.2, -19.8];
        for i in 0..6 {
            h.push(1.5 + 0.1 * i as f64);
            m.push(20.0 + 0.3 * (1.5 + 0.1 * i as f64));
        }
        let mut warnings = Warnings::new();
        let est = SlopeEstimator::estimate(
            &h,
            &m,
            SlopeMode::Auto,
            None,
            None,
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert!((est.slope - 0.3).abs() < 1e-9);
        assert_eq!(est.slope_negative, 0.0);
        assert!(warnings.iter().any(|w| matches!(
            w,
            AnalysisWarning::RegressionFailed {
                side: Side::Negative,
                ..
            }
        )));
        assert!(warnings
            .iter()
            .any(|w| *w == AnalysisWarning::SingleSideSlope { side: Side::Positive }));
    }

    #[test]
    fn manual_windows_fit_only_their_samples() {
        let (h, m) = loop_with_background(100, -0.2);
        let mut warnings = Warnings::new();
        let est = SlopeEstimator::estimate(
            &h,
            &m,
            SlopeMode::Manual,
            Some(FieldRange::new(1.5, 2.0)),
            Some(FieldRange::new(1.5, 2.0).mirrored()),
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert!((est.slope + 0.2).abs() < 1e-9);
        assert!((est.r2_positive - 1.0).abs() < 1e-9);
        assert!(warnings.is_empty());
    }

    #[test]
    fn manual_empty_window_is_not_fatal() {
        let (h, m) = loop_with_background(100, 0.1);
        let mut warnings = Warnings::new();
        let est = SlopeEstimator::estimate(
            &h,
            &m,
            SlopeMode::Manual,
            Some(FieldRange::new(5.0, 6.0)),
            Some(FieldRange::new(-2.0, -1.5)),
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert!((est.slope - 0.1).abs() < 1e-9);
        assert_eq!(est.slope_positive, 0.0);
        assert!(warnings.iter().any(|w| *w
            == AnalysisWarning::InsufficientRange {
                side: Side::Positive,
                stage: Stage::Slope,
                points: 0
            }));
    }

    #[test]
    fn manual_few_points_warns_but_fits() {
        let h = [2.0, 1.9, 1.8, -1.8, -1.9, -2.0];
        let m = [20.2, 20.19, 20.18, -20.18, -20.19, -20.2];
        let mut warnings = Warnings::new();
        let est = SlopeEstimator::estimate(
            &h,
            &m,
            SlopeMode::Manual,
            Some(FieldRange::new(1.75, 2.0)),
            Some(FieldRange::new(-2.0, -1.75)),
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert!((est.slope - 0.1).abs() < 1e-6);
        assert_eq!(
            warnings
                .iter()
                .filter(|w| matches!(w, AnalysisWarning::FewPointsInRange { points: 3, .. }))
                .count(),
            2
        );
    }

    #[test]
    fn mirrored_range() {
        assert_eq!(
            FieldRange::new(1.5, 2.0).mirrored(),
            FieldRange::new(-2.0, -1.5)
        );
    }
}
