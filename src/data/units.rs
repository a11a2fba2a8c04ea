//! Unit Conversion Module
//! Fixed constants between instrument units and SI, plus sample geometry.

use serde::{Deserialize, Serialize};

/// 1 Oe of applied field expressed as μ0H in tesla.
pub const OE_TO_TESLA: f64 = 1e-4;
/// Alternate coercivity unit: tesla → oersted.
pub const TESLA_TO_OE: f64 = 1e4;
/// cm² × nm → cm³.
const NM_TO_CM: f64 = 1e-7;

/// Film geometry used to turn total moment into magnetization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleGeometry {
    pub area_cm2: f64,
    pub thickness_nm: f64,
}

impl Default for SampleGeometry {
    fn default() -> Self {
        Self {
            area_cm2: 1.0,
            thickness_nm: 100.0,
        }
    }
}

impl SampleGeometry {
    pub fn volume_cm3(&self) -> f64 {
        self.area_cm2 * self.thickness_nm * NM_TO_CM
    }

    /// Volume must be finite and strictly positive to divide by it.
    pub fn is_valid(&self) -> bool {
        let v = self.volume_cm3();
        v.is_finite() && v > 0.0
    }
}
