// src/wgpu_backend.rs
// Reference RenderBackend over wgpu: depth targets, samplers, passes
// RELEVANT FILES: src/backend.rs, src/gpu.rs, shaders/overlay.wgsl, tests/wgpu_backend.rs

use std::mem;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use log::{debug, trace};

use crate::backend::{RenderBackend, SamplingState, TargetId, TextureHandle};
use crate::error::{ShadowError, ShadowResult};
use crate::geometry::GeometryList;
use crate::material::Material;

const OVERLAY_QUAD_SIZE: f32 = 128.0;
const OVERLAY_MARGIN: f32 = 10.0;

/// Issues the actual draw calls inside a pass the backend has opened.
/// Mesh buffers and pipelines belong to the embedding renderer, so the
/// backend hands it the open pass together with the queue contents.
pub trait DrawDelegate {
    /// Called inside a pre-shadow pass: render `selection` (indices into
    /// `occluders`) depth-only under `light_view_proj`.
    fn draw_depth(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        occluders: &GeometryList,
        selection: &[usize],
        light_view_proj: Mat4,
    );

    /// Called inside the post-shadow pass: render the receivers with
    /// `technique` forced, overriding materials with `forced_material`
    /// when present.
    fn draw_receivers(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        receivers: &GeometryList,
        technique: &str,
        forced_material: Option<&Material>,
    );
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct LightMatrixUniform {
    view_proj: [f32; 16],
}

struct DepthTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    sampling: SamplingState,
    size: u32,
}

struct OverlayPipeline {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

struct FrameState {
    encoder: wgpu::CommandEncoder,
    color_view: wgpu::TextureView,
    depth_view: Option<wgpu::TextureView>,
}

/// wgpu implementation of [`RenderBackend`].
///
/// Owns the depth-format shadow map textures, their samplers and the
/// light matrix uniform buffer. A frame is bracketed by
/// [`begin_frame`](Self::begin_frame) / [`end_frame`](Self::end_frame);
/// pass methods record into the frame's command encoder.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    targets: Vec<Option<DepthTarget>>,
    light_matrix_buffer: wgpu::Buffer,
    overlay: OverlayPipeline,
    delegate: Option<Box<dyn DrawDelegate>>,
    frame: Option<FrameState>,
}

impl WgpuBackend {
    /// `color_format` is the format of the frame views later passed to
    /// `begin_frame`; the debug overlay pipeline is built against it.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let light_matrix_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pssm.light-matrix"),
            size: mem::size_of::<LightMatrixUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let overlay = OverlayPipeline::build(&device, color_format);

        Self {
            device,
            queue,
            targets: Vec::new(),
            light_matrix_buffer,
            overlay,
            delegate: None,
            frame: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Box<dyn DrawDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Open a frame targeting `color_view` (and `depth_view` for the
    /// receiver pass depth test). Pass methods fail outside a frame.
    pub fn begin_frame(
        &mut self,
        color_view: wgpu::TextureView,
        depth_view: Option<wgpu::TextureView>,
    ) -> ShadowResult<()> {
        if self.frame.is_some() {
            return Err(ShadowError::render("frame already open"));
        }
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("pssm.frame"),
            });
        self.frame = Some(FrameState {
            encoder,
            color_view,
            depth_view,
        });
        Ok(())
    }

    /// Submit everything recorded since `begin_frame`.
    pub fn end_frame(&mut self) -> ShadowResult<()> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| ShadowError::render("end_frame without begin_frame"))?;
        self.queue.submit(Some(frame.encoder.finish()));
        Ok(())
    }

    /// Depth texture view of a target, for embedder bind groups.
    pub fn texture_view(&self, target: TargetId) -> ShadowResult<&wgpu::TextureView> {
        Ok(&self.target(target)?.view)
    }

    /// Sampler currently configured on a target.
    pub fn sampler(&self, target: TargetId) -> ShadowResult<&wgpu::Sampler> {
        Ok(&self.target(target)?.sampler)
    }

    /// Uniform buffer holding the light view-projection matrix of the
    /// pass currently being recorded.
    pub fn light_matrix_buffer(&self) -> &wgpu::Buffer {
        &self.light_matrix_buffer
    }

    /// Total GPU memory consumed by the live depth targets.
    pub fn total_memory_bytes(&self) -> u64 {
        self.targets
            .iter()
            .flatten()
            .map(|t| (t.size as u64) * (t.size as u64) * 4)
            .sum()
    }

    fn target(&self, id: TargetId) -> ShadowResult<&DepthTarget> {
        self.targets
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| ShadowError::render(format!("unknown depth target {}", id.0)))
    }

    fn create_sampler(device: &wgpu::Device, state: SamplingState) -> wgpu::Sampler {
        let filter = if state.bilinear {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pssm.shadow-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: state.compare.then_some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        })
    }
}

impl RenderBackend for WgpuBackend {
    fn create_depth_target(&mut self, size: u32, label: &str) -> ShadowResult<TargetId> {
        if size == 0 {
            return Err(ShadowError::config("depth target size must be positive"));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampling = SamplingState {
            bilinear: false,
            compare: true,
        };
        let sampler = Self::create_sampler(&self.device, sampling);

        self.targets.push(Some(DepthTarget {
            _texture: texture,
            view,
            sampler,
            sampling,
            size,
        }));
        debug!("created depth target '{label}' ({size}x{size})");
        Ok(TargetId(self.targets.len() - 1))
    }

    fn destroy_target(&mut self, target: TargetId) -> ShadowResult<()> {
        let slot = self
            .targets
            .get_mut(target.0)
            .ok_or_else(|| ShadowError::render(format!("unknown depth target {}", target.0)))?;
        *slot = None;
        Ok(())
    }

    fn texture_handle(&self, target: TargetId) -> ShadowResult<TextureHandle> {
        self.target(target)?;
        Ok(TextureHandle(target.0 as u32))
    }

    fn set_sampling(&mut self, target: TargetId, state: SamplingState) -> ShadowResult<()> {
        let slot = self
            .targets
            .get_mut(target.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| ShadowError::render(format!("unknown depth target {}", target.0)))?;
        if slot.sampling == state {
            trace!("sampling unchanged on target {}", target.0);
            return Ok(());
        }
        slot.sampler = Self::create_sampler(&self.device, state);
        slot.sampling = state;
        Ok(())
    }

    fn render_depth_pass(
        &mut self,
        target: TargetId,
        light_view_proj: Mat4,
        occluders: &GeometryList,
        selection: &[usize],
    ) -> ShadowResult<()> {
        let depth_target = self
            .targets
            .get(target.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| ShadowError::render(format!("unknown depth target {}", target.0)))?;

        self.queue.write_buffer(
            &self.light_matrix_buffer,
            0,
            bytemuck::bytes_of(&LightMatrixUniform {
                view_proj: light_view_proj.to_cols_array(),
            }),
        );

        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| ShadowError::render("render_depth_pass outside a frame"))?;

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pssm.pre-shadow"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_target.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(delegate) = self.delegate.as_mut() {
            delegate.draw_depth(&mut pass, occluders, selection, light_view_proj);
        }
        Ok(())
    }

    fn render_receiver_pass(
        &mut self,
        receivers: &GeometryList,
        technique: &str,
        forced_material: Option<&Material>,
    ) -> ShadowResult<()> {
        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| ShadowError::render("render_receiver_pass outside a frame"))?;

        let depth_attachment =
            frame
                .depth_view
                .as_ref()
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pssm.post-shadow"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: depth_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(delegate) = self.delegate.as_mut() {
            delegate.draw_receivers(&mut pass, receivers, technique, forced_material);
        }
        Ok(())
    }

    fn render_debug_overlay(&mut self, maps: &[TextureHandle]) -> ShadowResult<()> {
        let mut bind_groups = Vec::with_capacity(maps.len());
        for handle in maps {
            let depth_target = self
                .targets
                .get(handle.0 as usize)
                .and_then(Option::as_ref)
                .ok_or_else(|| {
                    ShadowError::render(format!("unknown depth target {}", handle.0))
                })?;
            bind_groups.push(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("pssm.overlay.bind-group"),
                layout: &self.overlay.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&depth_target.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.overlay.sampler),
                    },
                ],
            }));
        }

        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| ShadowError::render("render_debug_overlay outside a frame"))?;

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pssm.debug-overlay"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.overlay.pipeline);
        for (i, group) in bind_groups.iter().enumerate() {
            let x = OVERLAY_MARGIN + i as f32 * (OVERLAY_QUAD_SIZE + OVERLAY_MARGIN);
            pass.set_viewport(x, OVERLAY_MARGIN, OVERLAY_QUAD_SIZE, OVERLAY_QUAD_SIZE, 0.0, 1.0);
            pass.set_bind_group(0, group, &[]);
            pass.draw(0..3, 0..1);
        }
        Ok(())
    }
}

impl OverlayPipeline {
    fn build(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pssm.overlay.shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/overlay.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pssm.overlay.bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pssm.overlay.pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pssm.overlay.pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pssm.overlay.sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            pipeline,
            layout,
            sampler,
        }
    }
}
