// src/backend.rs
// Narrow renderer interface the pipeline drives once per frame
// RELEVANT FILES: src/pipeline.rs, src/wgpu_backend.rs, tests/pipeline.rs

use glam::Mat4;

use crate::error::ShadowResult;
use crate::geometry::GeometryList;
use crate::material::Material;

/// Opaque handle to a depth render target owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub usize);

/// Opaque handle to a sampleable texture, usable as a material parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Sampling state for a shadow map target.
///
/// `bilinear` is only ever combined with `compare`: hardware depth
/// comparison is what makes linear filtering of a depth texture
/// meaningful. Software compare paths sample nearest and filter in the
/// shader instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingState {
    pub bilinear: bool,
    pub compare: bool,
}

/// Capability surface the pipeline consumes from the embedding renderer:
/// allocate and reconfigure depth targets, and run the three pass kinds.
/// One method call corresponds to one complete render pass.
pub trait RenderBackend {
    /// Allocate a square depth-format off-screen target.
    fn create_depth_target(&mut self, size: u32, label: &str) -> ShadowResult<TargetId>;

    /// Release a target. Handles for it become dangling.
    fn destroy_target(&mut self, target: TargetId) -> ShadowResult<()>;

    /// Texture handle for binding a target's depth map in materials.
    fn texture_handle(&self, target: TargetId) -> ShadowResult<TextureHandle>;

    /// Reconfigure sampling on a target without reallocating it.
    fn set_sampling(&mut self, target: TargetId, state: SamplingState) -> ShadowResult<()>;

    /// Bind `target`, clear depth, and draw the selected occluders with a
    /// forced depth-only technique under `light_view_proj`.
    fn render_depth_pass(
        &mut self,
        target: TargetId,
        light_view_proj: Mat4,
        occluders: &GeometryList,
        selection: &[usize],
    ) -> ShadowResult<()>;

    /// Draw the receiver queue into the main output with `technique`
    /// forced on every geometry; `forced_material` overrides per-geometry
    /// materials when present.
    fn render_receiver_pass(
        &mut self,
        receivers: &GeometryList,
        technique: &str,
        forced_material: Option<&Material>,
    ) -> ShadowResult<()>;

    /// Draw the given depth maps as small screen-space quads.
    fn render_debug_overlay(&mut self, maps: &[TextureHandle]) -> ShadowResult<()>;
}
