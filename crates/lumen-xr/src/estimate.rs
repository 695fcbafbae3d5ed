//! Per-frame light estimate reported by the platform.

use lumen_lighting::{SH_COEFFICIENT_COUNT, SphericalHarmonics3};

/// Real-world lighting sample for one frame. Produced fresh each frame and
/// never stored beyond its application.
#[derive(Clone, Debug, PartialEq)]
pub struct LightEstimate {
    /// Ambient SH coefficients as `[r0, g0, b0, r1, ...]`.
    pub spherical_harmonics_coefficients: [f32; SH_COEFFICIENT_COUNT * 3],
    /// Direction toward the dominant light source.
    pub primary_light_direction: glam::Vec3,
    /// RGB intensity of the dominant light. Unbounded.
    pub primary_light_intensity: glam::Vec3,
}

impl LightEstimate {
    /// Coefficients as a typed SH value.
    pub fn spherical_harmonics(&self) -> SphericalHarmonics3 {
        SphericalHarmonics3::from_array(&self.spherical_harmonics_coefficients)
    }

    /// Estimate with only a constant ambient term and a single primary light.
    ///
    /// Useful for simulated platforms: the band-0 coefficient is set so the
    /// cosine-convolved irradiance equals `ambient` in every direction.
    pub fn from_ambient(
        ambient: glam::Vec3,
        primary_light_direction: glam::Vec3,
        primary_light_intensity: glam::Vec3,
    ) -> Self {
        let mut coefficients = [0.0; SH_COEFFICIENT_COUNT * 3];
        let band0 = ambient / 0.886_227;
        coefficients[..3].copy_from_slice(&band0.to_array());
        Self {
            spherical_harmonics_coefficients: coefficients,
            primary_light_direction,
            primary_light_intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_from_ambient_reproduces_irradiance() {
        let estimate = LightEstimate::from_ambient(Vec3::new(0.2, 0.3, 0.4), Vec3::Y, Vec3::ONE);
        let sh = estimate.spherical_harmonics();
        for normal in [Vec3::X, Vec3::NEG_Y, Vec3::Z] {
            let e = sh.irradiance_at(normal);
            assert!((e - Vec3::new(0.2, 0.3, 0.4)).length() < 1e-5);
        }
        assert!(estimate.spherical_harmonics_coefficients[3..].iter().all(|c| *c == 0.0));
    }
}
