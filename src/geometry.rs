// src/geometry.rs
// Shadow-tagged geometry descriptors and per-frame render queues
// RELEVANT FILES: src/fitter.rs, src/pipeline.rs

use glam::{Mat4, Vec3};

use crate::material::Material;

/// Axis-aligned bounding box used for light-space fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any `grow` call will snap to a point.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Expand symmetrically on all axes.
    pub fn pad(&mut self, amount: f32) {
        self.min -= Vec3::splat(amount);
        self.max += Vec3::splat(amount);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Bounding box of this box's eight corners under `matrix`.
    pub fn transformed(&self, matrix: Mat4) -> Aabb {
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.grow(matrix.transform_point3(corner));
        }
        out
    }

    /// Overlap test restricted to the X/Y plane (light-space crop test).
    pub fn overlaps_xy(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// How a geometry participates in shadowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMode {
    Off,
    Cast,
    Receive,
    CastAndReceive,
}

/// A renderable the pipeline only needs bounds and a material from; mesh
/// data stays with the embedding renderer.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub name: String,
    pub bounds: Aabb,
    pub material: Material,
    pub shadow_mode: ShadowMode,
}

impl Geometry {
    pub fn new(name: impl Into<String>, bounds: Aabb, material: Material, mode: ShadowMode) -> Self {
        Self {
            name: name.into(),
            bounds,
            material,
            shadow_mode: mode,
        }
    }
}

/// Flat geometry list with clear-and-refill semantics.
#[derive(Debug, Clone, Default)]
pub struct GeometryList {
    items: Vec<Geometry>,
}

impl GeometryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, geometry: Geometry) {
        self.items.push(geometry);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keeps the allocation for refill on the next frame.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Geometry> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Geometry> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Geometry> {
        self.items.iter_mut()
    }
}

/// Per-frame queues of shadow casters and receivers.
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    pub casters: GeometryList,
    pub receivers: GeometryList,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a geometry into the cast/receive lists by its shadow mode.
    pub fn add(&mut self, geometry: Geometry) {
        match geometry.shadow_mode {
            ShadowMode::Off => {}
            ShadowMode::Cast => self.casters.push(geometry),
            ShadowMode::Receive => self.receivers.push(geometry),
            ShadowMode::CastAndReceive => {
                self.receivers.push(geometry.clone());
                self.casters.push(geometry);
            }
        }
    }

    pub fn clear(&mut self) {
        self.casters.clear();
        self.receivers.clear();
    }
}
