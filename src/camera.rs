// src/camera.rs
// View camera description and frustum slice corner extraction
// RELEVANT FILES: src/fitter.rs, src/pipeline.rs

use glam::{Mat4, Vec3};

/// Projection parameters of the view camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective { fov_y: f32, aspect: f32 },
    Parallel { half_width: f32, half_height: f32 },
}

/// Minimal camera state the pipeline reads each frame.
#[derive(Debug, Clone, Copy)]
pub struct ViewCamera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub near: f32,
    pub far: f32,
    pub projection: Projection,
}

impl ViewCamera {
    pub fn perspective(
        position: Vec3,
        direction: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            up: up.normalize(),
            near,
            far,
            projection: Projection::Perspective { fov_y, aspect },
        }
    }

    pub fn parallel(
        position: Vec3,
        direction: Vec3,
        up: Vec3,
        half_width: f32,
        half_height: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            up: up.normalize(),
            near,
            far,
            projection: Projection::Parallel {
                half_width,
                half_height,
            },
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y, aspect } => {
                Mat4::perspective_rh(fov_y, aspect, self.near, self.far)
            }
            Projection::Parallel {
                half_width,
                half_height,
            } => Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                self.near,
                self.far,
            ),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Write the 8 world-space corners of the frustum slice [near, far]
    /// into `out`: 4 near-plane corners first, then 4 far-plane corners,
    /// counter-clockwise from bottom-left. The scratch buffer is caller
    /// owned so per-frame extraction allocates nothing.
    pub fn slice_corners(&self, near: f32, far: f32, out: &mut [Vec3; 8]) {
        let dir = self.direction.normalize();
        let right = dir.cross(self.up).normalize();
        let up = right.cross(dir);

        for (plane, depth) in [near, far].into_iter().enumerate() {
            let (half_w, half_h) = match self.projection {
                Projection::Perspective { fov_y, aspect } => {
                    let hh = (fov_y * 0.5).tan() * depth;
                    (hh * aspect, hh)
                }
                Projection::Parallel {
                    half_width,
                    half_height,
                } => (half_width, half_height),
            };

            let center = self.position + dir * depth;
            let base = plane * 4;
            out[base] = center - right * half_w - up * half_h;
            out[base + 1] = center + right * half_w - up * half_h;
            out[base + 2] = center + right * half_w + up * half_h;
            out[base + 3] = center - right * half_w + up * half_h;
        }
    }
}
