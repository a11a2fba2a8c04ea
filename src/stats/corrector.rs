//! Magnetization Corrector Module
//! Background-slope subtraction, then optional constant offset removal.

use super::calculator::saturation_means;
use crate::config::AnalysisConfig;

/// Corrected moments and the offset that was removed (0 when disabled).
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub moment: Vec<f64>,
    pub offset: f64,
}

/// Applies slope and offset corrections pointwise.
pub struct MagnetizationCorrector;

impl MagnetizationCorrector {
    /// `M - H·slope` for every sample.
    pub fn subtract_background(field: &[f64], moment: &[f64], slope: f64) -> Vec<f64> {
        field
            .iter()
            .zip(moment)
            .map(|(h, m)| m - h * slope)
            .collect()
    }

    /// Vertical offset of a loop: mean of the signed positive and negative
    /// saturation levels. An empty side counts as 0.
    pub fn saturation_offset(field: &[f64], moment: &[f64], fraction: f64) -> f64 {
        let (pos, neg) = saturation_means(field, moment, fraction);
        (pos.unwrap_or(0.0) + neg.unwrap_or(0.0)) / 2.0
    }

    /// Slope subtraction first; the offset is estimated on the
    /// slope-corrected values.
    pub fn correct(
        field: &[f64],
        moment: &[f64],
        slope: f64,
        offset_enabled: bool,
        config: &AnalysisConfig,
    ) -> Correction {
        let corrected = Self::subtract_background(field, moment, slope);
        if !offset_enabled {
            return Correction {
                moment: corrected,
                offset: 0.0,
            };
        }
        let offset = Self::saturation_offset(field, &corrected, config.saturation_fraction);
        tracing::debug!(offset, "magnetization offset removed");
        Correction {
            moment: corrected.into_iter().map(|m| m - offset).collect(),
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_subtracted_pointwise() {
        let corrected = MagnetizationCorrector::subtract_background(&[1.0, -2.0], &[5.0, 3.0], 0.5);
        assert_eq!(corrected, vec![4.5, 4.0]);
    }

    #[test]
    fn offset_uses_slope_corrected_values() {
        // saturated at +10/-10 shifted by +3, with a background slope of 2
        let field = [2.0, 1.9, 0.0, -1.9, -2.0];
        let moment: Vec<f64> = [13.0, 13.0, 3.0, -7.0, -7.0]
            .iter()
            .zip(&field)
            .map(|(m, h)| m + 2.0 * h)
            .collect();
        let config = AnalysisConfig::default();
        let result = MagnetizationCorrector::correct(&field, &moment, 2.0, true, &config);
        assert!((result.offset - 3.0).abs() < 1e-12);
        assert!((result.moment[0] - 10.0).abs() < 1e-12);
        assert!((result.moment[4] + 10.0).abs() < 1e-12);
    }

    #[test]
    fn disabled_offset_leaves_values() {
        let field = [2.0, 0.0, -2.0];
        let moment = [11.0, 1.0, -9.0];
        let config = AnalysisConfig::default();
        let result = MagnetizationCorrector::correct(&field, &moment, 0.0, false, &config);
        assert_eq!(result.offset, 0.0);
        assert_eq!(result.moment, moment.to_vec());
    }
}
