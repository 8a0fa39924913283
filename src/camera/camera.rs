/// Camera — low-level passive data container.
///
/// The Camera computes nothing beyond matrix products. The caller is
/// responsible for computing and setting the view and projection matrices
/// (from position/orientation, FOV, aspect, etc.). The engine consumes the
/// camera once per frame to derive frustum planes and per-object depth.

use glam::{Mat4, Vec3};

/// Low-level camera. A passive data container.
///
/// The caller computes and sets all fields. Near/far planes are carried
/// for diagnostics and depth-range queries; the frustum itself is derived
/// from the combined view-projection matrix.
#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    projection_matrix: Mat4,
    near: f32,
    far: f32,
}

impl Camera {
    /// Create a new camera with the given matrices and depth range.
    pub fn new(view: Mat4, projection: Mat4, near: f32, far: f32) -> Self {
        Self {
            view_matrix: view,
            projection_matrix: projection,
            near,
            far,
        }
    }

    // ===== GETTERS =====

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix (perspective or orthographic).
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// Near clip distance.
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clip distance.
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Camera-space depth of a world-space point.
    ///
    /// Positive in front of the camera (view space looks down -Z).
    /// Used for render-list depth sorting.
    pub fn depth_of(&self, world_point: Vec3) -> f32 {
        -self.view_matrix.transform_point3(world_point).z
    }

    // ===== SETTERS =====

    /// Set the view matrix.
    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view_matrix = view;
    }

    /// Set the projection matrix.
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection_matrix = projection;
    }

    /// Set the near/far depth range.
    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, 0.1, 1000.0)
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
