//! Light value types for adaptive scene lighting: the static hemisphere light,
//! the spherical-harmonics ambient probe light, and the estimated directional
//! light, each with a GPU uniform layout.

mod directional;
mod hemisphere;
pub mod probe;

pub use directional::{DirectionalLight, DirectionalLightUniform, primary_light_color_intensity};
pub use hemisphere::{HemisphereLight, HemisphereLightUniform};
pub use probe::{AmbientProbeLight, AmbientProbeUniform, SH_COEFFICIENT_COUNT, SphericalHarmonics3};
