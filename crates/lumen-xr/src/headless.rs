//! Bookkeeping-only render backend.
//!
//! [`HeadlessBackend`] allocates texture identities and tracks their
//! renderer-side properties without a GPU. The demo runs on it, and tests use
//! it to observe allocations, swaps, and disposals.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::environment::{
    BackendError, EnvironmentKind, EnvironmentMap, GpuTextureHandle, RenderBackend, SwapOutcome,
    TextureId, TextureProperties,
};
use crate::panorama::EquirectImage;

/// Render backend that records texture lifecycles in memory.
pub struct HeadlessBackend {
    next_texture: u64,
    next_gpu_handle: u64,
    resident: HashMap<TextureId, TextureProperties>,
    live: HashMap<TextureId, EnvironmentKind>,
    dispose_counts: HashMap<TextureId, usize>,
    in_place_swap: bool,
    equirect_shader_ready: bool,
    cubemap_shader_ready: bool,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Backend that supports in-place GPU texture swaps.
    pub fn new() -> Self {
        Self {
            next_texture: 1,
            next_gpu_handle: 1000,
            resident: HashMap::new(),
            live: HashMap::new(),
            dispose_counts: HashMap::new(),
            in_place_swap: true,
            equirect_shader_ready: false,
            cubemap_shader_ready: false,
        }
    }

    /// Toggle support for in-place swaps, to exercise the replacement path.
    pub fn with_in_place_swap(mut self, enabled: bool) -> Self {
        self.in_place_swap = enabled;
        self
    }

    fn allocate(&mut self, kind: EnvironmentKind, gpu: Option<GpuTextureHandle>) -> EnvironmentMap {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        let gpu_texture = gpu.or_else(|| {
            let handle = GpuTextureHandle(self.next_gpu_handle);
            self.next_gpu_handle += 1;
            Some(handle)
        });
        self.resident.insert(id, TextureProperties { gpu_texture });
        self.live.insert(id, kind);
        EnvironmentMap::new(id, kind)
    }

    /// Drop the renderer-side state of a texture as if it was never uploaded.
    pub fn evict(&mut self, id: TextureId) {
        self.resident.remove(&id);
    }

    /// Renderer-side properties for a resident texture.
    pub fn properties(&self, id: TextureId) -> Option<&TextureProperties> {
        self.resident.get(&id)
    }

    /// Whether a texture has been allocated and not yet disposed.
    pub fn is_live(&self, id: TextureId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of textures allocated and not yet disposed.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Disposals across all textures, including repeated ones.
    pub fn total_disposals(&self) -> usize {
        self.dispose_counts.values().sum()
    }

    /// How many times `id` was disposed.
    pub fn dispose_count(&self, id: TextureId) -> usize {
        self.dispose_counts.get(&id).copied().unwrap_or(0)
    }

    /// Whether the equirect prefilter shader has been warmed.
    pub fn equirect_shader_ready(&self) -> bool {
        self.equirect_shader_ready
    }

    /// Whether the cubemap prefilter shader has been warmed.
    pub fn cubemap_shader_ready(&self) -> bool {
        self.cubemap_shader_ready
    }
}

impl RenderBackend for HeadlessBackend {
    fn compile_equirect_shader(&mut self) {
        self.equirect_shader_ready = true;
    }

    fn compile_cubemap_shader(&mut self) {
        self.cubemap_shader_ready = true;
    }

    fn bake_equirect(&mut self, image: &EquirectImage) -> Result<EnvironmentMap, BackendError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(BackendError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        let face_size = (image.height() / 2).max(1);
        let map = self.allocate(EnvironmentKind::Prefiltered { face_size }, None);
        debug!(
            texture = map.id().0,
            face_size,
            mean_radiance = ?image.mean_radiance(),
            "baked equirect environment map"
        );
        Ok(map)
    }

    fn create_cube_render_target(&mut self, size: u32) -> EnvironmentMap {
        self.allocate(EnvironmentKind::Cube { size }, None)
    }

    fn wrap_external_cube_map(&mut self, handle: GpuTextureHandle) -> EnvironmentMap {
        self.allocate(EnvironmentKind::External, Some(handle))
    }

    fn swap_gpu_texture(&mut self, map: &EnvironmentMap, handle: GpuTextureHandle) -> SwapOutcome {
        if !self.in_place_swap {
            return SwapOutcome::Unsupported;
        }
        match self.resident.get_mut(&map.id()) {
            Some(properties) => {
                properties.gpu_texture = Some(handle);
                SwapOutcome::Swapped
            }
            None => SwapOutcome::NotResident,
        }
    }

    fn dispose(&mut self, map: &EnvironmentMap) {
        if self.live.remove(&map.id()).is_none() {
            warn!(texture = map.id().0, "dispose of a texture that is not live");
        }
        self.resident.remove(&map.id());
        *self.dispose_counts.entry(map.id()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bake_rejects_empty_image() {
        let mut backend = HeadlessBackend::new();
        let image = EquirectImage::new(0, 0, Vec::new());
        assert!(matches!(
            backend.bake_equirect(&image),
            Err(BackendError::EmptyImage { .. })
        ));
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_bake_sizes_face_from_height() {
        let mut backend = HeadlessBackend::new();
        let image = EquirectImage::new(8, 4, vec![glam::Vec3::ONE; 32]);
        let map = backend.bake_equirect(&image).unwrap();
        assert_eq!(map.kind(), EnvironmentKind::Prefiltered { face_size: 2 });
        assert!(backend.is_live(map.id()));
    }

    #[test]
    fn test_swap_in_place_keeps_identity() {
        let mut backend = HeadlessBackend::new();
        let map = backend.create_cube_render_target(16);
        let outcome = backend.swap_gpu_texture(&map, GpuTextureHandle(7));
        assert_eq!(outcome, SwapOutcome::Swapped);
        assert_eq!(
            backend.properties(map.id()).unwrap().gpu_texture,
            Some(GpuTextureHandle(7))
        );
        assert_eq!(backend.live_count(), 1);
    }

    #[test]
    fn test_swap_outcomes() {
        let mut backend = HeadlessBackend::new();
        let map = backend.create_cube_render_target(16);
        backend.evict(map.id());
        assert_eq!(
            backend.swap_gpu_texture(&map, GpuTextureHandle(7)),
            SwapOutcome::NotResident
        );

        let mut fixed = HeadlessBackend::new().with_in_place_swap(false);
        let map = fixed.create_cube_render_target(16);
        assert_eq!(
            fixed.swap_gpu_texture(&map, GpuTextureHandle(7)),
            SwapOutcome::Unsupported
        );
    }

    #[test]
    fn test_dispose_is_recorded() {
        let mut backend = HeadlessBackend::new();
        let map = backend.create_cube_render_target(16);
        backend.dispose(&map);
        backend.dispose(&map);
        assert!(!backend.is_live(map.id()));
        assert_eq!(backend.dispose_count(map.id()), 2);
        assert_eq!(backend.dispose_count(TextureId(999)), 0);
        assert_eq!(backend.total_disposals(), 2);
    }

    #[test]
    fn test_dispose_bookkeeping_is_per_texture() {
        let mut backend = HeadlessBackend::new();
        let first = backend.create_cube_render_target(16);
        for _ in 0..50 {
            let map = backend.wrap_external_cube_map(GpuTextureHandle(1));
            backend.dispose(&map);
        }
        backend.dispose(&first);
        assert_eq!(backend.dispose_counts.len(), 51);
        assert_eq!(backend.dispose_count(first.id()), 1);
        assert_eq!(backend.total_disposals(), 51);
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_wrapped_cube_map_uses_platform_handle() {
        let mut backend = HeadlessBackend::new();
        let map = backend.wrap_external_cube_map(GpuTextureHandle(42));
        assert_eq!(map.kind(), EnvironmentKind::External);
        assert_eq!(
            backend.properties(map.id()).unwrap().gpu_texture,
            Some(GpuTextureHandle(42))
        );
    }
}
