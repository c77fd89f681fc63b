// tests/common/mod.rs
// Recording backend and scene helpers shared by the integration tests
// RELEVANT FILES: tests/pipeline.rs, src/backend.rs

use glam::{Mat4, Vec3};

use pssm::{
    Aabb, Geometry, GeometryList, Material, RenderBackend, SamplingState, ShadowMode,
    ShadowResult, TargetId, TextureHandle, ViewCamera, POST_SHADOW_TECHNIQUE,
};

#[derive(Debug, Clone)]
pub struct CreatedTarget {
    pub size: u32,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct DepthPass {
    pub target: TargetId,
    pub view_proj: Mat4,
    pub selection: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct ReceiverPass {
    pub technique: String,
    pub forced: Option<String>,
    pub receiver_count: usize,
}

/// Records every backend call so tests can assert on the pass sequence
/// without a GPU.
#[derive(Default)]
pub struct RecordingBackend {
    pub created: Vec<CreatedTarget>,
    pub destroyed: Vec<TargetId>,
    pub sampling_calls: Vec<(TargetId, SamplingState)>,
    pub depth_passes: Vec<DepthPass>,
    pub receiver_passes: Vec<ReceiverPass>,
    pub overlay_calls: Vec<Vec<TextureHandle>>,
}

impl RenderBackend for RecordingBackend {
    fn create_depth_target(&mut self, size: u32, label: &str) -> ShadowResult<TargetId> {
        self.created.push(CreatedTarget {
            size,
            label: label.to_string(),
        });
        Ok(TargetId(self.created.len() - 1))
    }

    fn destroy_target(&mut self, target: TargetId) -> ShadowResult<()> {
        self.destroyed.push(target);
        Ok(())
    }

    fn texture_handle(&self, target: TargetId) -> ShadowResult<TextureHandle> {
        Ok(TextureHandle(target.0 as u32))
    }

    fn set_sampling(&mut self, target: TargetId, state: SamplingState) -> ShadowResult<()> {
        self.sampling_calls.push((target, state));
        Ok(())
    }

    fn render_depth_pass(
        &mut self,
        target: TargetId,
        light_view_proj: Mat4,
        _occluders: &GeometryList,
        selection: &[usize],
    ) -> ShadowResult<()> {
        self.depth_passes.push(DepthPass {
            target,
            view_proj: light_view_proj,
            selection: selection.to_vec(),
        });
        Ok(())
    }

    fn render_receiver_pass(
        &mut self,
        receivers: &GeometryList,
        technique: &str,
        forced_material: Option<&Material>,
    ) -> ShadowResult<()> {
        self.receiver_passes.push(ReceiverPass {
            technique: technique.to_string(),
            forced: forced_material.map(|m| m.name().to_string()),
            receiver_count: receivers.len(),
        });
        Ok(())
    }

    fn render_debug_overlay(&mut self, maps: &[TextureHandle]) -> ShadowResult<()> {
        self.overlay_calls.push(maps.to_vec());
        Ok(())
    }
}

pub fn test_camera() -> ViewCamera {
    ViewCamera::perspective(
        Vec3::new(0.0, 5.0, 20.0),
        Vec3::NEG_Z,
        Vec3::Y,
        60f32.to_radians(),
        16.0 / 9.0,
        1.0,
        1000.0,
    )
}

pub fn caster(name: &str) -> Geometry {
    Geometry::new(
        name,
        Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
        Material::new("lambert"),
        ShadowMode::Cast,
    )
}

/// Ground plane receiver whose material supports the shadowed technique.
pub fn receiver(name: &str) -> Geometry {
    Geometry::new(
        name,
        Aabb::new(Vec3::new(-50.0, -0.5, -50.0), Vec3::new(50.0, 0.0, 50.0)),
        Material::new("lambert").with_technique(POST_SHADOW_TECHNIQUE),
        ShadowMode::Receive,
    )
}

/// Receiver whose material lacks the shadowed technique, forcing the
/// shared fallback material.
pub fn plain_receiver(name: &str) -> Geometry {
    Geometry::new(
        name,
        Aabb::new(Vec3::new(-50.0, -0.5, -50.0), Vec3::new(50.0, 0.0, 50.0)),
        Material::new("unshaded"),
        ShadowMode::Receive,
    )
}
