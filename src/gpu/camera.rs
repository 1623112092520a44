//! Fixed orbit camera framing the tree.

use glam::{Mat4, Vec3};

/// Orbit camera looking at the tree.
///
/// Yaw and pitch are fixed for the lifetime of the viewer; orbit controls are
/// left to the host application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    /// Must reach past the outer star shell.
    pub far: f32,
}

impl Camera {
    /// Camera framing a scene of the default proportions.
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.12,
            distance: 32.0,
            target: Vec3::new(0.0, -0.5, 0.0),
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 300.0,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Combined projection and view for a viewport of the given aspect ratio.
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far) * self.view_matrix()
    }

    /// World-space right and up vectors, used to face billboards at the camera.
    pub fn billboard_axes(&self) -> (Vec3, Vec3) {
        let forward = (self.target - self.position()).normalize_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward);
        (right, up)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billboard_axes_orthonormal() {
        let camera = Camera::new();
        let (right, up) = camera.billboard_axes();
        let forward = (camera.target - camera.position()).normalize();
        assert!((right.length() - 1.0).abs() < 1e-5);
        assert!((up.length() - 1.0).abs() < 1e-5);
        assert!(right.dot(up).abs() < 1e-5);
        assert!(right.dot(forward).abs() < 1e-5);
        assert!(up.y > 0.0);
    }

    #[test]
    fn test_target_projects_to_center() {
        let camera = Camera::new();
        let clip = camera.view_proj(16.0 / 9.0) * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
    }

    #[test]
    fn test_far_plane_contains_stars() {
        let camera = Camera::new();
        let star = Vec3::new(0.0, 0.0, -100.0);
        let clip = camera.view_proj(1.0) * star.extend(1.0);
        assert!(clip.z / clip.w <= 1.0);
    }
}
