// src/pipeline.rs
// Parallel-split shadow map pipeline: per-frame multi-pass orchestrator
// RELEVANT FILES: src/fitter.rs, src/split_math.rs, src/backend.rs, tests/pipeline.rs

use glam::{Mat4, Vec3, Vec4};
use log::{debug, trace};

use crate::backend::{RenderBackend, SamplingState, TargetId, TextureHandle};
use crate::camera::ViewCamera;
use crate::config::{CompareMode, FilterMode, PssmConfig, MAX_SPLIT_COUNT, MIN_SPLIT_COUNT};
use crate::error::{ShadowError, ShadowResult};
use crate::fitter;
use crate::geometry::RenderQueue;
use crate::material::Material;
use crate::split_math;

/// Depth-only technique forced during the pre-shadow passes.
pub const PRE_SHADOW_TECHNIQUE: &str = "PreShadow";
/// Shadow-receiving technique forced during the post-shadow pass.
pub const POST_SHADOW_TECHNIQUE: &str = "PostShadow";

/// Parallel-split shadow map renderer.
///
/// Splits the view frustum along depth, renders occluders into one depth
/// map per split, and injects the resulting matrices, split distances and
/// textures into receiver materials. Invoked in lock-step with the render
/// loop, once per frame:
///
/// 1. `post_queue` after the frame's queues are built (pre-shadow passes),
/// 2. `post_frame` after the main pass (post-shadow pass).
///
/// Single-threaded by design; scratch buffers are reused across frames.
pub struct PssmShadowRenderer {
    config: PssmConfig,
    filter_mode: FilterMode,
    compare_mode: CompareMode,
    /// PCF kernel scale in [0.1, 1.0].
    edges_thickness: f32,
    direction: Vec3,

    boundaries: Vec<f32>,
    split_factors: Vec4,
    light_view_projections: Vec<Mat4>,

    targets: Vec<TargetId>,
    map_handles: Vec<TextureHandle>,
    post_material: Material,

    corners: [Vec3; 8],
    split_occluders: Vec<usize>,

    needs_fallback: bool,
    frame_ready: bool,
    initialized: bool,
}

impl PssmShadowRenderer {
    /// Build the pipeline state. Resources are not allocated until
    /// [`initialize`](Self::initialize) runs against a backend.
    pub fn new(mut config: PssmConfig) -> ShadowResult<Self> {
        config.split_count = config.split_count.clamp(MIN_SPLIT_COUNT, MAX_SPLIT_COUNT);
        config.validate()?;

        let count = config.split_count as usize;
        let mut post_material =
            Material::new("PostShadowPSSM").with_technique(POST_SHADOW_TECHNIQUE);
        post_material.set_float("ShadowMapSize", config.map_size as f32);
        post_material.set_float("ShadowIntensity", config.shadow_intensity);

        Ok(Self {
            config,
            filter_mode: FilterMode::Bilinear,
            compare_mode: CompareMode::Hardware,
            edges_thickness: 1.0,
            direction: Vec3::NEG_Y,
            boundaries: vec![0.0; count + 1],
            split_factors: Vec4::ZERO,
            light_view_projections: vec![Mat4::IDENTITY; count],
            targets: Vec::with_capacity(count),
            map_handles: Vec::with_capacity(count),
            post_material,
            corners: [Vec3::ZERO; 8],
            split_occluders: Vec::new(),
            needs_fallback: false,
            frame_ready: false,
            initialized: false,
        })
    }

    /// Allocate one depth target per split and push the initial filter
    /// and compare state to the backend.
    pub fn initialize(&mut self, backend: &mut dyn RenderBackend) -> ShadowResult<()> {
        if self.initialized {
            return Err(ShadowError::render("pipeline already initialized"));
        }

        for i in 0..self.config.split_count as usize {
            let target =
                backend.create_depth_target(self.config.map_size, &format!("pssm.shadow-map.{i}"))?;
            let handle = backend.texture_handle(target)?;
            self.post_material.set_texture(format!("ShadowMap{i}"), handle);
            self.targets.push(target);
            self.map_handles.push(handle);
        }

        self.apply_sampling(backend)?;
        self.post_material
            .set_int("FilterMode", self.filter_mode.as_u32() as i32);
        self.post_material.set_float("PCFEdge", self.edges_thickness);
        self.post_material
            .set_bool("HardwareShadows", self.compare_mode == CompareMode::Hardware);

        self.initialized = true;
        debug!(
            "pssm initialized: {} splits at {}x{}",
            self.config.split_count, self.config.map_size, self.config.map_size
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Release the shadow map targets. The pipeline can be re-initialized
    /// against the same or another backend afterwards.
    pub fn cleanup(&mut self, backend: &mut dyn RenderBackend) -> ShadowResult<()> {
        for target in self.targets.drain(..) {
            backend.destroy_target(target)?;
        }
        self.map_handles.clear();
        self.frame_ready = false;
        self.initialized = false;
        Ok(())
    }

    /// Per-frame hook before queue construction. No work to do here.
    pub fn pre_frame(&mut self, _time_per_frame: f32) {}

    /// Render the pre-shadow passes: recompute split boundaries, fit one
    /// light camera per split and rasterize that split's occluders into
    /// its depth target.
    ///
    /// A frame with no occluders or no receivers skips shadowing entirely;
    /// the depth targets keep last frame's content and no parameters are
    /// pushed. That is the normal no-shadow condition, not an error.
    pub fn post_queue(
        &mut self,
        backend: &mut dyn RenderBackend,
        queue: &mut RenderQueue,
        camera: &ViewCamera,
    ) -> ShadowResult<()> {
        self.frame_ready = false;
        if !self.initialized {
            return Err(ShadowError::render("post_queue called before initialize"));
        }

        if queue.casters.is_empty() || queue.receivers.is_empty() {
            trace!("no occluders or receivers queued, skipping shadow passes");
            return Ok(());
        }

        let zfar = self.config.zfar_override.unwrap_or(camera.far);
        let near = camera.near.max(split_math::MIN_FRUSTUM_NEAR);
        split_math::update_boundaries(&mut self.boundaries, near, zfar, self.config.lambda);
        self.split_factors = split_math::pack_boundaries(&self.boundaries);

        for i in 0..self.config.split_count as usize {
            camera.slice_corners(self.boundaries[i], self.boundaries[i + 1], &mut self.corners);

            let view_projection = fitter::fit_shadow_camera(
                &self.corners,
                self.direction,
                &queue.casters,
                &queue.receivers,
                &mut self.split_occluders,
            );
            self.light_view_projections[i] = view_projection;

            backend.render_depth_pass(
                self.targets[i],
                view_projection,
                &queue.casters,
                &self.split_occluders,
            )?;
        }

        if self.config.flush_queues {
            queue.casters.clear();
        }
        self.frame_ready = true;
        Ok(())
    }

    /// Render the post-shadow pass: push shader parameters to every
    /// receiver that supports the shadow technique and draw the receiver
    /// queue. Receivers without the technique are covered by the shared
    /// fallback material, which does not blend transparency correctly --
    /// a deliberate approximation.
    pub fn post_frame(
        &mut self,
        backend: &mut dyn RenderBackend,
        queue: &mut RenderQueue,
    ) -> ShadowResult<()> {
        if self.frame_ready {
            self.push_receiver_params(queue);

            let forced = if self.needs_fallback {
                Some(&self.post_material)
            } else {
                None
            };
            backend.render_receiver_pass(&queue.receivers, POST_SHADOW_TECHNIQUE, forced)?;

            if self.config.flush_queues {
                queue.receivers.clear();
            }
            self.frame_ready = false;
        }

        if self.config.debug_display {
            backend.render_debug_overlay(&self.map_handles)?;
        }
        Ok(())
    }

    fn push_receiver_params(&mut self, queue: &mut RenderQueue) {
        let count = self.config.split_count as usize;

        for geometry in queue.receivers.iter_mut() {
            let material = &mut geometry.material;
            if !material.supports_technique(POST_SHADOW_TECHNIQUE) {
                self.needs_fallback = true;
                continue;
            }

            material.set_vec4("Splits", self.split_factors);
            for j in 0..count {
                material.set_mat4(
                    format!("LightViewProjectionMatrix{j}"),
                    self.light_view_projections[j],
                );
                material.set_texture(format!("ShadowMap{j}"), self.map_handles[j]);
            }
            material.set_bool("HardwareShadows", self.compare_mode == CompareMode::Hardware);
            material.set_int("FilterMode", self.filter_mode.as_u32() as i32);
            material.set_float("PCFEdge", self.edges_thickness);
            material.set_float("ShadowIntensity", self.config.shadow_intensity);
            if material.param("ShadowMapSize").is_none() {
                material.set_float("ShadowMapSize", self.config.map_size as f32);
            }
        }

        if self.needs_fallback {
            self.post_material.set_vec4("Splits", self.split_factors);
            for j in 0..count {
                self.post_material.set_mat4(
                    format!("LightViewProjectionMatrix{j}"),
                    self.light_view_projections[j],
                );
            }
        }
    }

    fn apply_sampling(&self, backend: &mut dyn RenderBackend) -> ShadowResult<()> {
        let state = self.sampling_state();
        for target in &self.targets {
            backend.set_sampling(*target, state)?;
        }
        Ok(())
    }

    /// Sampling state implied by the current filter and compare modes.
    /// Bilinear sampling of a depth texture is only meaningful together
    /// with hardware comparison; every other combination samples nearest.
    pub fn sampling_state(&self) -> SamplingState {
        let hardware = self.compare_mode == CompareMode::Hardware;
        SamplingState {
            bilinear: hardware && self.filter_mode == FilterMode::Bilinear,
            compare: hardware,
        }
    }

    /// Change the edge filter mode. Idempotent: repeating the current
    /// mode touches neither materials nor sampler state.
    pub fn set_filter_mode(
        &mut self,
        backend: &mut dyn RenderBackend,
        mode: FilterMode,
    ) -> ShadowResult<()> {
        if self.filter_mode == mode {
            return Ok(());
        }
        self.filter_mode = mode;

        self.post_material.set_int("FilterMode", mode.as_u32() as i32);
        self.post_material.set_float("PCFEdge", self.edges_thickness);
        if self.compare_mode == CompareMode::Hardware {
            self.apply_sampling(backend)?;
        }
        Ok(())
    }

    /// Change the depth compare mode. Idempotent like
    /// [`set_filter_mode`](Self::set_filter_mode).
    pub fn set_compare_mode(
        &mut self,
        backend: &mut dyn RenderBackend,
        mode: CompareMode,
    ) -> ShadowResult<()> {
        if self.compare_mode == mode {
            return Ok(());
        }
        self.compare_mode = mode;

        self.apply_sampling(backend)?;
        self.post_material
            .set_bool("HardwareShadows", mode == CompareMode::Hardware);
        Ok(())
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn compare_mode(&self) -> CompareMode {
        self.compare_mode
    }

    /// Light direction used to compute shadows.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        let normalized = direction.normalize_or_zero();
        self.direction = if normalized == Vec3::ZERO {
            Vec3::NEG_Y
        } else {
            normalized
        };
    }

    pub fn lambda(&self) -> f32 {
        self.config.lambda
    }

    /// Adjust the split repartition: low values spread quality evenly
    /// over the shadow extent, high values concentrate resolution near
    /// the camera. Default 0.65.
    pub fn set_lambda(&mut self, lambda: f32) {
        self.config.lambda = lambda.clamp(0.0, 1.0);
    }

    pub fn shadow_intensity(&self) -> f32 {
        self.config.shadow_intensity
    }

    /// Shadow darkness: 0 is invisible, 1 is pitch black. Default 0.7.
    pub fn set_shadow_intensity(&mut self, intensity: f32) {
        self.config.shadow_intensity = intensity.clamp(0.0, 1.0);
        self.post_material
            .set_float("ShadowIntensity", self.config.shadow_intensity);
    }

    /// Edge thickness on the 1..=10 scale exposed to applications.
    pub fn edges_thickness(&self) -> u32 {
        (self.edges_thickness * 10.0).round() as u32
    }

    /// Set edge thickness (1..=10, clamped), stored as a 0.1..=1.0 PCF
    /// kernel scale. Lower values reduce jagged shadow edges.
    pub fn set_edges_thickness(&mut self, thickness: u32) {
        self.edges_thickness = thickness.clamp(1, 10) as f32 * 0.1;
        self.post_material.set_float("PCFEdge", self.edges_thickness);
    }

    pub fn shadow_z_extend(&self) -> Option<f32> {
        self.config.zfar_override
    }

    /// Fix the distance up to which shadows are rendered; `None` tracks
    /// the view camera's far plane.
    pub fn set_shadow_z_extend(&mut self, zfar: Option<f32>) {
        self.config.zfar_override = zfar;
    }

    pub fn is_flush_queues(&self) -> bool {
        self.config.flush_queues
    }

    /// Disable on all but the last pipeline when chaining several over
    /// one frame, so earlier pipelines leave the queues intact.
    pub fn set_flush_queues(&mut self, flush: bool) {
        self.config.flush_queues = flush;
    }

    /// Toggle on-screen display of the raw depth maps.
    pub fn display_debug(&mut self, enabled: bool) {
        self.config.debug_display = enabled;
    }

    pub fn split_count(&self) -> u32 {
        self.config.split_count
    }

    pub fn map_size(&self) -> u32 {
        self.config.map_size
    }

    /// Shadow map resolution is fixed at construction; the targets are
    /// allocated once and never resized.
    pub fn set_map_size(&mut self, _size: u32) -> ShadowResult<()> {
        Err(ShadowError::config(
            "shadow map size is fixed at construction",
        ))
    }

    /// Split boundaries from the last rendered frame.
    pub fn boundaries(&self) -> &[f32] {
        &self.boundaries
    }

    /// Light view-projection matrix of a split from the last rendered
    /// frame.
    pub fn light_view_projection(&self, split: usize) -> Option<&Mat4> {
        self.light_view_projections.get(split)
    }
}
