//! Magnetic Property Calculator Module
//! Saturation magnetization, remanence, coercivity and squareness of a corrected loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::slope::FieldRange;
use crate::config::AnalysisConfig;
use crate::data::{LoopBranch, TESLA_TO_OE};
use crate::warning::{AnalysisWarning, Side, Stage, Warnings};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("branch is empty")]
    Empty,
    #[error("abscissa and ordinate lengths differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },
    #[error("branch contains non-finite values")]
    NonFinite,
}

/// How the saturation windows are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MsRangePolicy {
    /// Samples beyond `saturation_fraction` of the extreme field on each side.
    #[default]
    Automatic,
    /// Caller-supplied inclusive windows.
    Manual {
        positive: FieldRange,
        negative: FieldRange,
    },
    /// Outer edges of a visible field window; automatic when the window is
    /// not usable.
    FieldWindow { min: f64, max: f64 },
}

impl MsRangePolicy {
    /// Turn a field window into concrete manual windows where possible.
    pub fn resolve(self, config: &AnalysisConfig) -> MsRangePolicy {
        match self {
            MsRangePolicy::FieldWindow { min, max } if max > 0.0 && min < max => {
                let edge = (max - min) * config.window_edge_fraction;
                MsRangePolicy::Manual {
                    positive: FieldRange::new(max - edge, max),
                    negative: FieldRange::new(min, min + edge),
                }
            }
            MsRangePolicy::FieldWindow { .. } => MsRangePolicy::Automatic,
            other => other,
        }
    }
}

/// Saturation estimate per side and combined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Saturation {
    /// Combined Ms; `None` only when the inputs were not finite.
    pub ms: Option<f64>,
    pub ms_positive: f64,
    pub ms_negative: f64,
    /// Policy actually applied after resolving field windows.
    pub policy: MsRangePolicy,
}

/// Coercivity in tesla and oersted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coercivity {
    pub tesla: f64,
    pub oersted: f64,
}

/// Signed mean moments of the automatic saturation sets:
/// `H > fraction·max(H)` and `H < fraction·min(H)`.
pub fn saturation_means(
    field: &[f64],
    moment: &[f64],
    fraction: f64,
) -> (Option<f64>, Option<f64>) {
    if field.is_empty() {
        return (None, None);
    }
    let h_max = field.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let h_min = field.iter().copied().fold(f64::INFINITY, f64::min);
    let pos = mean_where(field, moment, |h| h > h_max * fraction);
    let neg = mean_where(field, moment, |h| h < h_min * fraction);
    (pos, neg)
}

fn mean_where(field: &[f64], moment: &[f64], keep: impl Fn(f64) -> bool) -> Option<f64> {
    let (sum, count) = field
        .iter()
        .zip(moment)
        .filter(|(h, _)| keep(**h))
        .fold((0.0, 0usize), |(sum, count), (_, m)| (sum + m, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Linear interpolation of `fp(xp)` at `x`.
///
/// Uses the first adjacent pair of `xp` that brackets `x`, so plateaus and
/// non-monotonic branches still resolve at their first crossing. Outside the
/// sampled range the nearest end value is returned.
pub fn interpolate(x: f64, xp: &[f64], fp: &[f64]) -> Result<f64, InterpolationError> {
    if xp.len() != fp.len() {
        return Err(InterpolationError::LengthMismatch {
            x: xp.len(),
            y: fp.len(),
        });
    }
    if xp.is_empty() {
        return Err(InterpolationError::Empty);
    }
    if xp.iter().chain(fp).any(|v| !v.is_finite()) || !x.is_finite() {
        return Err(InterpolationError::NonFinite);
    }

    for i in 0..xp.len() - 1 {
        let (x0, x1) = (xp[i], xp[i + 1]);
        if x < x0.min(x1) || x > x0.max(x1) {
            continue;
        }
        if x0 == x1 {
            return Ok(fp[i]);
        }
        let t = (x - x0) / (x1 - x0);
        return Ok(fp[i] + t * (fp[i + 1] - fp[i]));
    }

    let last = xp.len() - 1;
    if x <= xp[0] {
        Ok(fp[0])
    } else {
        Ok(fp[last])
    }
}

/// Derives magnetic properties from corrected branches.
pub struct PropertyCalculator;

impl PropertyCalculator {
    /// Mr: mean absolute moment of both branches at zero field.
    pub fn remanence(
        descending: &LoopBranch,
        ascending: &LoopBranch,
    ) -> Result<f64, InterpolationError> {
        let down = descending.reversed();
        let mr_down = interpolate(0.0, &down.field, &down.moment)?;
        let mr_up = interpolate(0.0, &ascending.field, &ascending.moment)?;
        Ok((mr_down.abs() + mr_up.abs()) / 2.0)
    }

    /// Hc: mean absolute field of both branches at zero moment.
    pub fn coercivity(
        descending: &LoopBranch,
        ascending: &LoopBranch,
    ) -> Result<Coercivity, InterpolationError> {
        let down = descending.reversed();
        let hc_down = interpolate(0.0, &down.moment, &down.field)?;
        let hc_up = interpolate(0.0, &ascending.moment, &ascending.field)?;
        let tesla = (hc_down.abs() + hc_up.abs()) / 2.0;
        Ok(Coercivity {
            tesla,
            oersted: tesla * TESLA_TO_OE,
        })
    }

    /// Ms over the whole corrected loop under the given window policy.
    pub fn saturation(
        field: &[f64],
        moment: &[f64],
        policy: MsRangePolicy,
        config: &AnalysisConfig,
        warnings: &mut Warnings,
    ) -> Saturation {
        let policy = policy.resolve(config);
        let (ms_positive, ms_negative) = match policy {
            MsRangePolicy::Manual { positive, negative } => (
                Self::window_mean(field, moment, positive, Side::Positive, warnings),
                Self::window_mean(field, moment, negative, Side::Negative, warnings),
            ),
            _ => {
                let (pos, _) = saturation_means(field, moment, config.saturation_fraction);
                let abs_moment: Vec<f64> = moment.iter().map(|m| m.abs()).collect();
                let (_, neg) = saturation_means(field, &abs_moment, config.saturation_fraction);
                for (value, side) in [(pos, Side::Positive), (neg, Side::Negative)] {
                    if value.is_none() {
                        warnings.push(AnalysisWarning::EmptySaturationSide { side });
                    }
                }
                (pos.unwrap_or(0.0), neg.unwrap_or(0.0))
            }
        };

        let combined = match (ms_positive != 0.0, ms_negative != 0.0) {
            (true, true) => (ms_positive + ms_negative) / 2.0,
            (true, false) => ms_positive,
            _ => ms_negative,
        };
        tracing::debug!(ms = combined, ms_positive, ms_negative, "saturation magnetization");
        Saturation {
            ms: combined.is_finite().then_some(combined),
            ms_positive,
            ms_negative,
            policy,
        }
    }

    /// Mean moment (absolute on the negative side) inside a manual window.
    /// Fewer than 2 samples give 0 and a warning.
    fn window_mean(
        field: &[f64],
        moment: &[f64],
        range: FieldRange,
        side: Side,
        warnings: &mut Warnings,
    ) -> f64 {
        let values: Vec<f64> = field
            .iter()
            .zip(moment)
            .filter(|(h, _)| range.contains(**h))
            .map(|(_, m)| match side {
                Side::Positive => *m,
                Side::Negative => m.abs(),
            })
            .collect();
        if values.len() < 2 {
            warnings.push(AnalysisWarning::InsufficientRange {
                side,
                stage: Stage::Saturation,
                points: values.len(),
            });
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// S = Mr / Ms, defined only for a known, strictly positive Ms.
    pub fn squareness(mr: Option<f64>, ms: Option<f64>) -> Option<f64> {
        match (mr, ms) {
            (Some(mr), Some(ms)) if ms > 0.0 => Some(mr / ms),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(field: &[f64], moment: &[f64]) -> LoopBranch {
        LoopBranch {
            field: field.to_vec(),
            moment: moment.to_vec(),
        }
    }

    #[test]
    fn interpolate_matches_linear_and_clamps() {
        let xp = [-1.0, 0.0, 2.0];
        let fp = [10.0, 20.0, 40.0];
        assert_eq!(interpolate(1.0, &xp, &fp), Ok(30.0));
        assert_eq!(interpolate(-5.0, &xp, &fp), Ok(10.0));
        assert_eq!(interpolate(5.0, &xp, &fp), Ok(40.0));
        assert_eq!(interpolate(0.0, &[3.0], &[7.0]), Ok(7.0));
    }

    #[test]
    fn interpolate_rejects_degenerate_branches() {
        assert_eq!(interpolate(0.0, &[], &[]), Err(InterpolationError::Empty));
        assert!(matches!(
            interpolate(0.0, &[1.0], &[]),
            Err(InterpolationError::LengthMismatch { .. })
        ));
        assert_eq!(
            interpolate(0.0, &[f64::NAN, 1.0], &[0.0, 1.0]),
            Err(InterpolationError::NonFinite)
        );
    }

    #[test]
    fn interpolate_handles_plateaus() {
        // moment as abscissa: saturated plateau, then a crossing
        let xp = [-20.0, -20.0, -10.0, 10.0, 20.0, 20.0];
        let fp = [-2.0, -1.5, -1.0, 0.0, 0.5, 2.0];
        assert_eq!(interpolate(0.0, &xp, &fp), Ok(-0.5));
    }

    #[test]
    fn remanence_and_coercivity_of_symmetric_loop() {
        let down = branch(&[2.0, 1.0, 0.0, -1.0, -2.0], &[20.0, 15.0, 10.0, -20.0, -20.0]);
        let up = branch(&[-2.0, -1.0, 0.0, 1.0, 2.0], &[-20.0, -15.0, -10.0, 20.0, 20.0]);
        let mr = PropertyCalculator::remanence(&down, &up).unwrap();
        assert!((mr - 10.0).abs() < 1e-12);
        let hc = PropertyCalculator::coercivity(&down, &up).unwrap();
        assert!((hc.tesla - 1.0 / 3.0).abs() < 1e-12);
        assert!((hc.oersted - 10_000.0 / 3.0).abs() < 1e-8);
    }

    #[test]
    fn empty_branch_fails_only_that_property() {
        let up = branch(&[-1.0, 1.0], &[-1.0, 1.0]);
        assert!(PropertyCalculator::remanence(&LoopBranch::default(), &up).is_err());
    }

    #[test]
    fn automatic_saturation_uses_outer_ten_percent() {
        let field = [2.0, 1.9, 1.0, 0.0, -1.0, -1.9, -2.0];
        let moment = [20.0, 22.0, 5.0, 0.0, -5.0, -18.0, -20.0];
        let mut warnings = Warnings::new();
        let sat = PropertyCalculator::saturation(
            &field,
            &moment,
            MsRangePolicy::Automatic,
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert_eq!(sat.ms_positive, 21.0);
        assert_eq!(sat.ms_negative, 19.0);
        assert_eq!(sat.ms, Some(20.0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn manual_window_with_no_points_warns() {
        let field = [2.0, 1.9, 0.0, -1.9, -2.0];
        let moment = [20.0, 20.0, 0.0, -20.0, -20.0];
        let mut warnings = Warnings::new();
        let sat = PropertyCalculator::saturation(
            &field,
            &moment,
            MsRangePolicy::Manual {
                positive: FieldRange::new(3.0, 4.0),
                negative: FieldRange::new(-2.0, -1.8),
            },
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert_eq!(sat.ms_positive, 0.0);
        assert_eq!(sat.ms, Some(20.0));
        assert_eq!(
            warnings.into_vec(),
            vec![AnalysisWarning::InsufficientRange {
                side: Side::Positive,
                stage: Stage::Saturation,
                points: 0
            }]
        );
    }

    #[test]
    fn manual_window_with_one_point_is_zero() {
        let field = [2.0, 0.0, -2.0];
        let moment = [20.0, 0.0, -20.0];
        let mut warnings = Warnings::new();
        let sat = PropertyCalculator::saturation(
            &field,
            &moment,
            MsRangePolicy::Manual {
                positive: FieldRange::new(1.5, 2.0),
                negative: FieldRange::new(-2.0, -1.5),
            },
            &AnalysisConfig::default(),
            &mut warnings,
        );
        assert_eq!(sat.ms, Some(0.0));
        assert_eq!(warnings.len(), 2);
        assert_eq!(PropertyCalculator::squareness(Some(5.0), sat.ms), None);
    }

    #[test]
    fn field_window_resolves_to_edges() {
        let config = AnalysisConfig::default();
        let resolved = MsRangePolicy::FieldWindow { min: -2.0, max: 2.0 }.resolve(&config);
        match resolved {
            MsRangePolicy::Manual { positive, negative } => {
                assert!((positive.lo - 1.6).abs() < 1e-12 && positive.hi == 2.0);
                assert!(negative.lo == -2.0 && (negative.hi + 1.6).abs() < 1e-12);
            }
            other => panic!("unexpected policy {other:?}"),
        }
        assert_eq!(
            MsRangePolicy::FieldWindow { min: -2.0, max: -1.0 }.resolve(&config),
            MsRangePolicy::Automatic
        );
    }

    #[test]
    fn squareness_requires_positive_ms() {
        assert_eq!(PropertyCalculator::squareness(Some(10.0), Some(20.0)), Some(0.5));
        assert_eq!(PropertyCalculator::squareness(Some(10.0), Some(0.0)), None);
        assert_eq!(PropertyCalculator::squareness(Some(10.0), Some(-3.0)), None);
        assert_eq!(PropertyCalculator::squareness(Some(10.0), None), None);
        assert_eq!(PropertyCalculator::squareness(None, Some(20.0)), None);
    }
}
