// src/fitter.rs
// Light-space orthographic fitting for one frustum slice
// RELEVANT FILES: src/split_math.rs, src/geometry.rs, src/pipeline.rs

use glam::{Mat4, Vec3};

use crate::geometry::{Aabb, GeometryList};

/// Padding applied to the split volume so razor-thin slices and boxes
/// touching the crop edge still rasterize.
const EXTENT_PAD: f32 = 0.01;

/// Light view matrix looking along `direction` from the origin. Falls
/// back to an X up-axis when the light is near vertical, where the
/// default Y up would be degenerate.
pub fn light_view(direction: Vec3) -> Mat4 {
    let dir = direction.normalize_or_zero();
    let dir = if dir == Vec3::ZERO { Vec3::NEG_Y } else { dir };
    let up = if dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
    Mat4::look_to_rh(Vec3::ZERO, dir, up)
}

/// Fit an orthographic shadow camera around one frustum slice.
///
/// The slice corners bound the volume in light space; receivers
/// overlapping the slice crop the X/Y extents so shadow map resolution is
/// not wasted on empty area, and casters reaching the volume extend the
/// near plane so occluders behind the slice still project into it.
///
/// `split_occluders` is a shared scratch list, cleared and refilled with
/// the indices of `casters` entries that overlap the fitted volume.
/// Returns the light view-projection matrix.
pub fn fit_shadow_camera(
    corners: &[Vec3; 8],
    direction: Vec3,
    casters: &GeometryList,
    receivers: &GeometryList,
    split_occluders: &mut Vec<usize>,
) -> Mat4 {
    let view = light_view(direction);

    let mut split_bb = Aabb::empty();
    for corner in corners {
        split_bb.grow(view.transform_point3(*corner));
    }
    split_bb.pad(EXTENT_PAD);

    // Receivers overlapping the slice crop the orthographic footprint.
    let mut receiver_bb = Aabb::empty();
    for geometry in receivers.iter() {
        let bb = geometry.bounds.transformed(view);
        if bb.overlaps_xy(&split_bb) {
            receiver_bb.union(&bb);
        }
    }

    let mut crop = split_bb;
    if receiver_bb.is_valid() {
        crop.min.x = crop.min.x.max(receiver_bb.min.x);
        crop.min.y = crop.min.y.max(receiver_bb.min.y);
        crop.max.x = crop.max.x.min(receiver_bb.max.x);
        crop.max.y = crop.max.y.min(receiver_bb.max.y);
        // A receiver set disjoint from the slice leaves the crop inverted;
        // fall back to the raw slice volume.
        if !crop.is_valid() {
            crop = split_bb;
        }
        crop.pad(EXTENT_PAD);
    }

    // In light view space the camera looks down -Z, so larger Z is closer
    // to the light. Casters between the light and the slice must extend
    // the near plane or their shadows vanish.
    let mut near_z = crop.max.z;
    split_occluders.clear();
    for (index, geometry) in casters.iter().enumerate() {
        let bb = geometry.bounds.transformed(view);
        if bb.overlaps_xy(&crop) && bb.max.z >= crop.min.z {
            split_occluders.push(index);
            near_z = near_z.max(bb.max.z);
        }
    }

    let projection = Mat4::orthographic_rh(
        crop.min.x,
        crop.max.x,
        crop.min.y,
        crop.max.y,
        -near_z - EXTENT_PAD,
        -crop.min.z + EXTENT_PAD,
    );

    projection * view
}
