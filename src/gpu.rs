// src/gpu.rs
// Shared wgpu device/queue bring-up for the reference backend and tests
// RELEVANT FILES: src/wgpu_backend.rs, tests/wgpu_backend.rs

use std::sync::Arc;

use once_cell::sync::OnceCell;

pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter: wgpu::Adapter,
}

static CTX: OnceCell<Option<GpuContext>> = OnceCell::new();

/// Lazily acquire the process-wide GPU context.
///
/// Returns `None` when no suitable adapter exists (headless CI); callers
/// such as tests are expected to skip GPU work in that case.
pub fn ctx() -> Option<&'static GpuContext> {
    CTX.get_or_init(|| {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                label: Some("pssm-device"),
            },
            None,
        ))
        .ok()?;

        Some(GpuContext {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter,
        })
    })
    .as_ref()
}
