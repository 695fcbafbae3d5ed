//! Synthetic outdoor lighting for the simulated AR session.

use glam::Vec3;
use lumen_xr::LightEstimate;

/// Seconds for the sun to complete one orbit.
const DAY_LENGTH_SECS: f32 = 2.0;

/// Noon sun brightness. Above 1.0 so the color/intensity split kicks in.
const NOON_INTENSITY: Vec3 = Vec3::new(2.4, 2.2, 1.8);

/// Estimate for a sun orbiting overhead at `seconds` into the run.
///
/// The sun rises in +X, peaks at +Y, and sets in -X. Below the horizon the
/// primary light fades to zero and only sky ambient remains.
pub fn estimate_at(seconds: f32) -> LightEstimate {
    let angle = seconds / DAY_LENGTH_SECS * std::f32::consts::TAU;
    let direction = Vec3::new(angle.cos(), angle.sin(), 0.3).normalize();
    let elevation = direction.y.max(0.0);

    let intensity = NOON_INTENSITY * elevation;
    let ambient = Vec3::new(0.05, 0.07, 0.1) + Vec3::new(0.2, 0.25, 0.35) * elevation;
    LightEstimate::from_ambient(ambient, direction, intensity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noon_is_brightest() {
        let noon = estimate_at(DAY_LENGTH_SECS / 4.0);
        let dusk = estimate_at(DAY_LENGTH_SECS / 2.0);
        assert!(noon.primary_light_intensity.x > dusk.primary_light_intensity.x);
        assert!(noon.primary_light_direction.y > 0.9);
    }

    #[test]
    fn test_night_has_no_primary_light() {
        let midnight = estimate_at(DAY_LENGTH_SECS * 0.75);
        assert_eq!(midnight.primary_light_intensity, Vec3::ZERO);
        assert!(midnight.spherical_harmonics_coefficients[0] > 0.0);
    }
}
