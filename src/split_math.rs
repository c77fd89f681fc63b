// src/split_math.rs
// Split boundary math for the parallel-split scheme
// RELEVANT FILES: src/pipeline.rs, tests/split_math.rs

use glam::Vec4;

/// Near plane floor applied before the logarithmic term; a zeroed or
/// negative near clip would otherwise poison the split distances.
pub const MIN_FRUSTUM_NEAR: f32 = 0.001;

/// Fill `out` with `out.len() - 1` split boundaries over [near, far].
///
/// Each interior boundary blends a logarithmic and a uniform split by
/// `lambda` (0 = uniform, 1 = logarithmic):
///
///   log_i     = near * (far/near)^(i/N)
///   uniform_i = near + (far - near) * (i/N)
///   out[i]    = lambda * log_i + (1 - lambda) * uniform_i
///
/// Deterministic; `out[0]` is the clamped near plane and `out[N]` is `far`.
pub fn update_boundaries(out: &mut [f32], near: f32, far: f32, lambda: f32) {
    debug_assert!(out.len() >= 2);
    let count = out.len() - 1;
    let near = near.max(MIN_FRUSTUM_NEAR);
    let ratio = far / near;
    let range = far - near;

    for i in 1..count {
        let t = i as f32 / count as f32;
        let log_split = near * ratio.powf(t);
        let uniform_split = near + range * t;
        out[i] = lambda * log_split + (1.0 - lambda) * uniform_split;
    }

    out[0] = near;
    out[count] = far;
}

/// Pack the far edge of each split into a vec4 shader parameter.
/// Lanes beyond the split count stay zero.
pub fn pack_boundaries(boundaries: &[f32]) -> Vec4 {
    let count = boundaries.len() - 1;
    let mut packed = Vec4::ZERO;
    if count >= 1 {
        packed.x = boundaries[1];
    }
    if count >= 2 {
        packed.y = boundaries[2];
    }
    if count >= 3 {
        packed.z = boundaries[3];
    }
    if count >= 4 {
        packed.w = boundaries[4];
    }
    packed
}
