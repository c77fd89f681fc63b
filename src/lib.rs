// src/lib.rs
// Parallel-split shadow mapping for directional lights over wgpu
// RELEVANT FILES: src/pipeline.rs, src/fitter.rs, src/backend.rs, src/wgpu_backend.rs

//! Parallel-split shadow maps (PSSM) for directional lights.
//!
//! The view frustum is divided into depth slices, each rendered into its
//! own depth map from the light's point of view. Receiver materials get
//! the split distances, light matrices and map textures injected before
//! the shadowed pass.
//!
//! [`PssmShadowRenderer`] drives the per-frame work against a
//! [`RenderBackend`]; [`WgpuBackend`] is the bundled wgpu implementation,
//! but any backend (including a test double) can stand in.

pub mod backend;
pub mod camera;
pub mod config;
pub mod error;
pub mod fitter;
pub mod geometry;
pub mod gpu;
pub mod material;
pub mod pipeline;
pub mod split_math;
pub mod wgpu_backend;

pub use backend::{RenderBackend, SamplingState, TargetId, TextureHandle};
pub use camera::{Projection, ViewCamera};
pub use config::{CompareMode, FilterMode, PssmConfig};
pub use error::{ShadowError, ShadowResult};
pub use geometry::{Aabb, Geometry, GeometryList, RenderQueue, ShadowMode};
pub use material::{MatParam, Material};
pub use pipeline::{PssmShadowRenderer, POST_SHADOW_TECHNIQUE, PRE_SHADOW_TECHNIQUE};
pub use wgpu_backend::{DrawDelegate, WgpuBackend};
