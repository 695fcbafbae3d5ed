//! Hemisphere light: the static sky/ground fill used when no estimate is available.

use bytemuck::{Pod, Zeroable};

/// Ground color of the default studio hemisphere, `#448844`.
const DEFAULT_GROUND: glam::Vec3 = glam::Vec3::new(
    0x44 as f32 / 255.0,
    0x88 as f32 / 255.0,
    0x44 as f32 / 255.0,
);

/// Sky/ground gradient light.
///
/// Surfaces facing up receive `sky_color`, surfaces facing down receive
/// `ground_color`, with a linear blend on the cosine to the up axis.
#[derive(Clone, Debug, PartialEq)]
pub struct HemisphereLight {
    /// Linear RGB color from above.
    pub sky_color: glam::Vec3,
    /// Linear RGB color from below.
    pub ground_color: glam::Vec3,
    /// Scalar intensity multiplier.
    pub intensity: f32,
}

impl Default for HemisphereLight {
    fn default() -> Self {
        Self {
            sky_color: glam::Vec3::ONE,
            ground_color: DEFAULT_GROUND,
            intensity: 1.0,
        }
    }
}

impl HemisphereLight {
    /// Create a hemisphere light from sky and ground colors.
    pub fn new(sky_color: glam::Vec3, ground_color: glam::Vec3, intensity: f32) -> Self {
        Self {
            sky_color,
            ground_color,
            intensity,
        }
    }

    /// Irradiance received by a surface with the given unit normal.
    pub fn irradiance(&self, normal: glam::Vec3) -> glam::Vec3 {
        let weight = 0.5 * normal.y + 0.5;
        self.ground_color.lerp(self.sky_color, weight) * self.intensity
    }

    /// Build the GPU-side uniform from this light's properties.
    pub fn to_uniform(&self) -> HemisphereLightUniform {
        HemisphereLightUniform {
            sky_intensity: [
                self.sky_color.x,
                self.sky_color.y,
                self.sky_color.z,
                self.intensity,
            ],
            ground_padding: [self.ground_color.x, self.ground_color.y, self.ground_color.z, 0.0],
        }
    }
}

/// GPU-side representation, 32 bytes, std140-compatible.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct HemisphereLightUniform {
    /// xyz = sky color, w = intensity.
    pub sky_intensity: [f32; 4],
    /// xyz = ground color, w = padding.
    pub ground_padding: [f32; 4],
}
