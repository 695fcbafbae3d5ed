//! Environment maps and the render backend that owns their GPU resources.
//!
//! An [`EnvironmentMap`] is a lightweight handle; the texture memory behind it
//! lives in the [`RenderBackend`]. The controller never touches GPU objects
//! directly, it asks the backend to bake, allocate, swap, and dispose.

use crate::panorama::EquirectImage;

/// Backend-assigned identity of a texture object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Raw GPU texture handle, as handed out by a graphics API or platform binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuTextureHandle(pub u64);

/// What an environment map was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvironmentKind {
    /// Roughness-prefiltered reflection map baked from an equirectangular panorama.
    Prefiltered {
        /// Edge length of the base cube face.
        face_size: u32,
    },
    /// Cube render target whose contents are supplied by the platform.
    Cube {
        /// Edge length of each face.
        size: u32,
    },
    /// Platform cubemap wrapped as a standalone texture object.
    External,
}

/// Handle to an environment map texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvironmentMap {
    id: TextureId,
    kind: EnvironmentKind,
}

impl EnvironmentMap {
    /// Create a handle. Called by backends when they allocate a texture.
    pub fn new(id: TextureId, kind: EnvironmentKind) -> Self {
        Self { id, kind }
    }

    /// Backend texture identity.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// How the map was produced.
    pub fn kind(&self) -> EnvironmentKind {
        self.kind
    }
}

/// Renderer-internal state tracked for each resident texture object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureProperties {
    /// GPU texture currently sampled for this object.
    pub gpu_texture: Option<GpuTextureHandle>,
}

/// Result of splicing a platform texture into an existing texture object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The texture object now samples the new GPU texture.
    Swapped,
    /// The texture object has not been uploaded yet; nothing to swap into.
    NotResident,
    /// The backend cannot swap GPU textures behind a live texture object.
    Unsupported,
}

/// Errors raised by a render backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The source image has no pixels.
    #[error("cannot bake an environment map from an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
}

/// GPU-side collaborator of the lighting controller.
pub trait RenderBackend {
    /// Warm up the equirectangular prefilter shader before the first bake.
    fn compile_equirect_shader(&mut self) {}

    /// Warm up the cubemap prefilter shader once estimation starts.
    fn compile_cubemap_shader(&mut self) {}

    /// Prefilter an equirectangular image into a reflection environment map.
    fn bake_equirect(&mut self, image: &EquirectImage) -> Result<EnvironmentMap, BackendError>;

    /// Allocate a cube render target of the given edge length.
    fn create_cube_render_target(&mut self, size: u32) -> EnvironmentMap;

    /// Wrap a platform cubemap as a fresh texture object.
    fn wrap_external_cube_map(&mut self, handle: GpuTextureHandle) -> EnvironmentMap;

    /// Make `map` sample `handle` without changing the texture object's identity.
    fn swap_gpu_texture(&mut self, map: &EnvironmentMap, handle: GpuTextureHandle) -> SwapOutcome;

    /// Release the GPU resources behind `map`.
    fn dispose(&mut self, map: &EnvironmentMap);
}
