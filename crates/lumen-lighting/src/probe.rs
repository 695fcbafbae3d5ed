//! Ambient light probe: third-order (9 coefficient) spherical harmonics.
//!
//! [`SphericalHarmonics3`] holds the RGB coefficients exactly as the
//! estimation platform reports them, and [`AmbientProbeLight`] wraps them
//! with an intensity for the lighting group.

use bytemuck::{Pod, Zeroable};

/// Number of RGB coefficients in an order-3 SH basis.
pub const SH_COEFFICIENT_COUNT: usize = 9;

/// Order-3 spherical harmonics with one RGB coefficient per basis function.
///
/// Coefficients are stored in the usual `l, m` order:
/// `(0,0) (1,-1) (1,0) (1,1) (2,-2) (2,-1) (2,0) (2,1) (2,2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphericalHarmonics3 {
    /// RGB coefficient per basis function.
    pub coefficients: [glam::Vec3; SH_COEFFICIENT_COUNT],
}

impl Default for SphericalHarmonics3 {
    fn default() -> Self {
        Self {
            coefficients: [glam::Vec3::ZERO; SH_COEFFICIENT_COUNT],
        }
    }
}

impl SphericalHarmonics3 {
    /// Build from a flat `[r0, g0, b0, r1, g1, b1, ...]` array.
    pub fn from_array(values: &[f32; SH_COEFFICIENT_COUNT * 3]) -> Self {
        let mut sh = Self::default();
        sh.copy_from_array(values);
        sh
    }

    /// Overwrite every coefficient from a flat RGB array, bit for bit.
    pub fn copy_from_array(&mut self, values: &[f32; SH_COEFFICIENT_COUNT * 3]) {
        for (coefficient, rgb) in self.coefficients.iter_mut().zip(values.chunks_exact(3)) {
            *coefficient = glam::Vec3::new(rgb[0], rgb[1], rgb[2]);
        }
    }

    /// Flatten back into `[r0, g0, b0, ...]` order.
    pub fn to_array(&self) -> [f32; SH_COEFFICIENT_COUNT * 3] {
        let mut out = [0.0; SH_COEFFICIENT_COUNT * 3];
        for (rgb, coefficient) in out.chunks_exact_mut(3).zip(self.coefficients.iter()) {
            rgb.copy_from_slice(&coefficient.to_array());
        }
        out
    }

    /// Cosine-convolved irradiance for a surface with the given unit normal.
    pub fn irradiance_at(&self, normal: glam::Vec3) -> glam::Vec3 {
        let (x, y, z) = (normal.x, normal.y, normal.z);
        let c = &self.coefficients;

        // Band 0: pi * Y00.
        let mut result = c[0] * 0.886_227;

        // Band 1: (2 pi / 3) * Y1m.
        result += c[1] * (2.0 * 0.511_664 * y);
        result += c[2] * (2.0 * 0.511_664 * z);
        result += c[3] * (2.0 * 0.511_664 * x);

        // Band 2: (pi / 4) * Y2m.
        result += c[4] * (2.0 * 0.429_043 * x * y);
        result += c[5] * (2.0 * 0.429_043 * y * z);
        result += c[6] * (0.743_125 * z * z - 0.247_708);
        result += c[7] * (2.0 * 0.429_043 * x * z);
        result += c[8] * (0.429_043 * (x * x - y * y));

        result
    }
}

/// Ambient light described by spherical harmonics.
#[derive(Clone, Debug, PartialEq)]
pub struct AmbientProbeLight {
    /// SH coefficients, replaced wholesale by each estimate.
    pub sh: SphericalHarmonics3,
    /// Scalar intensity multiplier.
    pub intensity: f32,
}

impl Default for AmbientProbeLight {
    fn default() -> Self {
        Self {
            sh: SphericalHarmonics3::default(),
            intensity: 1.0,
        }
    }
}

impl AmbientProbeLight {
    /// Irradiance for a surface normal, scaled by intensity.
    pub fn irradiance(&self, normal: glam::Vec3) -> glam::Vec3 {
        self.sh.irradiance_at(normal) * self.intensity
    }

    /// Build the GPU-side uniform, premultiplying intensity into each coefficient.
    pub fn to_uniform(&self) -> AmbientProbeUniform {
        let mut coefficients = [[0.0; 4]; SH_COEFFICIENT_COUNT];
        for (slot, c) in coefficients.iter_mut().zip(self.sh.coefficients.iter()) {
            let scaled = *c * self.intensity;
            *slot = [scaled.x, scaled.y, scaled.z, 0.0];
        }
        AmbientProbeUniform { coefficients }
    }
}

/// GPU-side SH probe, 144 bytes (nine `vec4<f32>`), std140-compatible.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct AmbientProbeUniform {
    /// xyz = intensity-scaled RGB coefficient, w = padding.
    pub coefficients: [[f32; 4]; SH_COEFFICIENT_COUNT],
}
