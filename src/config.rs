// src/config.rs
// Pipeline configuration and the filter/compare mode enums
// RELEVANT FILES: src/pipeline.rs, src/backend.rs

use crate::error::{ShadowError, ShadowResult};

pub const MIN_SPLIT_COUNT: u32 = 1;
pub const MAX_SPLIT_COUNT: u32 = 4;
pub const MIN_MAP_SIZE: u32 = 512;
pub const MAX_MAP_SIZE: u32 = 8192;

/// How shadow map samples are filtered at receiver edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Nearest sample only; blocky shadows.
    Nearest,
    /// Bilinear filtering; hardware accelerated under hardware compare.
    Bilinear,
    /// Dither-based sampling; cheap but noisy at low resolutions.
    Dither,
    /// 4x4 percentage-closer filtering.
    Pcf4,
    /// Poisson-disc percentage-closer filtering.
    PcfPoisson,
    /// 8x8 percentage-closer filtering.
    Pcf8,
}

impl FilterMode {
    /// Stable ordinal pushed to shaders as an integer parameter.
    pub fn as_u32(self) -> u32 {
        match self {
            FilterMode::Nearest => 0,
            FilterMode::Bilinear => 1,
            FilterMode::Dither => 2,
            FilterMode::Pcf4 => 3,
            FilterMode::PcfPoisson => 4,
            FilterMode::Pcf8 => 5,
        }
    }
}

/// Where the shadow depth comparison happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Comparison in shader code; shadow maps sample nearest.
    Software,
    /// Comparison through the GPU's dedicated shadow sampling path.
    Hardware,
}

/// Construction-time configuration. Split count and map size are fixed
/// once the pipeline allocates its targets; the remaining fields seed
/// runtime-adjustable state.
#[derive(Debug, Clone)]
pub struct PssmConfig {
    /// Number of splits, clamped to 1..=4 at construction.
    pub split_count: u32,
    /// Shadow map resolution (square), fixed after construction.
    pub map_size: u32,
    /// Blend between uniform (0.0) and logarithmic (1.0) splits.
    pub lambda: f32,
    /// Shadow darkness in [0, 1].
    pub shadow_intensity: f32,
    /// Fixed shadow extent; `None` tracks the camera far plane.
    pub zfar_override: Option<f32>,
    /// Clear the shadow queues after rendering. Set false on every
    /// pipeline but the last when several share one frame.
    pub flush_queues: bool,
    /// Render the depth maps as screen-space quads each frame.
    pub debug_display: bool,
}

impl Default for PssmConfig {
    fn default() -> Self {
        Self {
            split_count: 3,
            map_size: 1024,
            lambda: 0.65,
            shadow_intensity: 0.7,
            zfar_override: None,
            flush_queues: true,
            debug_display: false,
        }
    }
}

impl PssmConfig {
    pub fn validate(&self) -> ShadowResult<()> {
        if self.map_size < MIN_MAP_SIZE || self.map_size > MAX_MAP_SIZE {
            return Err(ShadowError::config(format!(
                "map_size must be between {} and {}",
                MIN_MAP_SIZE, MAX_MAP_SIZE
            )));
        }

        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(ShadowError::config("lambda must be within [0, 1]"));
        }

        if !(0.0..=1.0).contains(&self.shadow_intensity) {
            return Err(ShadowError::config("shadow_intensity must be within [0, 1]"));
        }

        if let Some(zfar) = self.zfar_override {
            if zfar <= 0.0 {
                return Err(ShadowError::config("zfar_override must be positive"));
            }
        }

        Ok(())
    }
}
