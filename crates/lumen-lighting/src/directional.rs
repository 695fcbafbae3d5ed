//! Directional light driven by the estimated primary light source.
//!
//! The [`DirectionalLight`] struct describes the CPU-side light properties,
//! while [`DirectionalLightUniform`] is the GPU-side representation written
//! to a uniform buffer each frame.

use bytemuck::{Pod, Zeroable};

/// CPU-side directional light description.
///
/// Like a scene-graph directional light, the light shines from `position`
/// toward the origin: `position` is a direction source, not a location.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Direction source. Copied verbatim from the estimate, not normalized.
    pub position: glam::Vec3,
    /// Linear RGB color of the light (not premultiplied by intensity).
    pub color: glam::Vec3,
    /// Scalar intensity multiplier. Never below 1.0 when estimated.
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            // Straight overhead, matching a freshly constructed scene light.
            position: glam::Vec3::Y,
            color: glam::Vec3::ONE,
            intensity: 1.0,
        }
    }
}

/// Split an unbounded RGB primary-light intensity into a displayable color
/// and a scalar intensity.
///
/// The scalar is `max(1.0, max(r, g, b))`. The color is the input divided by
/// the scalar, so inputs with every channel at or below 1.0 pass through
/// unchanged with intensity 1.0, and brighter inputs come back with their
/// largest channel at exactly 1.0.
pub fn primary_light_color_intensity(intensity: glam::Vec3) -> (glam::Vec3, f32) {
    let scalar = intensity.max_element().max(1.0);
    (intensity / scalar, scalar)
}

impl DirectionalLight {
    /// Apply an estimated primary light: direction source and RGB intensity.
    pub fn apply_primary_light(&mut self, direction: glam::Vec3, intensity: glam::Vec3) {
        let (color, scalar) = primary_light_color_intensity(intensity);
        self.color = color;
        self.intensity = scalar;
        self.position = direction;
    }

    /// Normalized direction the light travels (from `position` toward the origin).
    ///
    /// Returns `None` when `position` is degenerate.
    pub fn travel_direction(&self) -> Option<glam::Vec3> {
        (-self.position).try_normalize()
    }

    /// Build the GPU-side uniform from this light's properties.
    pub fn to_uniform(&self) -> DirectionalLightUniform {
        let dir = self.travel_direction().unwrap_or(glam::Vec3::NEG_Y);
        DirectionalLightUniform {
            direction_intensity: [dir.x, dir.y, dir.z, self.intensity],
            color_padding: [self.color.x, self.color.y, self.color.z, 0.0],
        }
    }
}

/// GPU-side representation, 32 bytes, std140-compatible.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    /// xyz = travel direction (normalized), w = intensity.
    pub direction_intensity: [f32; 4],
    /// xyz = color (linear RGB), w = padding.
    pub color_padding: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_dim_light_passes_through() {
        let (color, intensity) = primary_light_color_intensity(Vec3::new(0.5, 0.3, 0.2));
        assert_eq!(intensity, 1.0);
        assert_eq!(color, Vec3::new(0.5, 0.3, 0.2));
    }

    #[test]
    fn test_bright_light_is_normalized() {
        let (color, intensity) = primary_light_color_intensity(Vec3::new(2.0, 1.0, 0.5));
        assert_eq!(intensity, 2.0);
        assert_eq!(color, Vec3::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn test_brightest_channel_is_exactly_one() {
        for input in [
            Vec3::new(1.5, 0.2, 0.9),
            Vec3::new(0.1, 7.25, 3.0),
            Vec3::new(0.0, 0.0, 12.0),
        ] {
            let (color, intensity) = primary_light_color_intensity(input);
            assert_eq!(intensity, input.max_element());
            assert_eq!(color.max_element(), 1.0, "input {input:?}");
            assert!(color.min_element() >= 0.0);
        }
    }

    #[test]
    fn test_unit_channel_is_boundary() {
        let (color, intensity) = primary_light_color_intensity(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(intensity, 1.0);
        assert_eq!(color, Vec3::ONE);
    }

    #[test]
    fn test_apply_primary_light_copies_direction_verbatim() {
        let mut light = DirectionalLight::default();
        let dir = Vec3::new(3.0, 4.0, -12.0);
        light.apply_primary_light(dir, Vec3::new(4.0, 2.0, 1.0));
        assert_eq!(light.position, dir);
        assert_eq!(light.intensity, 4.0);
        assert_eq!(light.color, Vec3::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn test_zero_position_has_no_direction() {
        let light = DirectionalLight {
            position: Vec3::ZERO,
            ..Default::default()
        };
        assert!(light.travel_direction().is_none());
        // Uniform falls back to straight down.
        let u = light.to_uniform();
        assert_eq!(u.direction_intensity[1], -1.0);
    }

    #[test]
    fn test_uniform_buffer_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<DirectionalLightUniform>(), 32);
        assert_eq!(
            std::mem::offset_of!(DirectionalLightUniform, direction_intensity),
            0
        );
        assert_eq!(
            std::mem::offset_of!(DirectionalLightUniform, color_padding),
            16
        );
    }

    #[test]
    fn test_to_uniform_packs_correctly() {
        let light = DirectionalLight {
            position: Vec3::new(0.0, 2.0, 0.0),
            color: Vec3::new(1.0, 0.5, 0.25),
            intensity: 2.0,
        };
        let u = light.to_uniform();
        assert!((u.direction_intensity[1] - (-1.0)).abs() < 1e-6);
        assert!((u.direction_intensity[3] - 2.0).abs() < 1e-6);
        assert!((u.color_padding[0] - 1.0).abs() < 1e-6);
        assert!((u.color_padding[1] - 0.5).abs() < 1e-6);
        assert!((u.color_padding[2] - 0.25).abs() < 1e-6);
        assert!((u.color_padding[3] - 0.0).abs() < 1e-6);
    }
}
