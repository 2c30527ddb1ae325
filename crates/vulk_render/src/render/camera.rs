//! Yaw/pitch camera

use crate::foundation::math::{look_at, Mat3, Mat4, Vec3};

/// Free camera described by an eye point plus yaw and pitch in radians.
///
/// The basis comes from `Rx(pitch) * Ry(yaw)`: column 0 is right, column 1
/// up, column 2 forward.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Eye position in world space
    pub eye: Vec3,
    /// Rotation about the Y axis, radians
    pub yaw: f32,
    /// Rotation about the X axis, radians
    pub pitch: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::zeros(),
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl Camera {
    /// Place the eye and aim at `target`
    pub fn look_at(&mut self, eye: Vec3, target: Vec3) {
        self.eye = eye;
        let dir = (target - eye).normalize();
        self.pitch = dir.y.asin();
        self.yaw = dir.x.atan2(dir.z);
    }

    /// The camera's rotation matrix
    pub fn rotation(&self) -> Mat3 {
        let rx = nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), self.pitch);
        let ry = nalgebra::Rotation3::from_axis_angle(&Vec3::y_axis(), self.yaw);
        (rx * ry).into_inner()
    }

    /// World-space forward vector
    pub fn forward(&self) -> Vec3 {
        self.rotation().column(2).into()
    }

    /// World-space right vector
    pub fn right(&self) -> Vec3 {
        self.rotation().column(0).into()
    }

    /// World-space up vector
    pub fn up(&self) -> Vec3 {
        self.rotation().column(1).into()
    }

    /// View matrix looking along the camera's forward vector
    pub fn view_matrix(&self) -> Mat4 {
        look_at(self.eye, self.eye + self.forward(), self.up())
    }

    /// Move the eye along the camera basis
    pub fn translate(&mut self, right: f32, up: f32, forward: f32) {
        self.eye += self.right() * right + self.up() * up + self.forward() * forward;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn look_at_recovers_planar_direction() {
        let mut camera = Camera::default();
        let eye = Vec3::new(0.0, 1.0, -3.0);
        let target = Vec3::new(2.0, 1.0, 0.0);
        camera.look_at(eye, target);

        let dir = (target - eye).normalize();
        assert_relative_eq!(camera.forward(), dir, epsilon = EPSILON);
        assert_relative_eq!(camera.pitch, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(0.9, 1.0, 1.3), Vec3::new(0.5, 0.0, 0.0));

        assert_relative_eq!(camera.forward().norm(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(camera.right().dot(&camera.up()), 0.0, epsilon = EPSILON);
        assert_relative_eq!(camera.right().dot(&camera.forward()), 0.0, epsilon = EPSILON);
    }

    #[test]
    fn default_camera_faces_positive_z() {
        let camera = Camera::default();
        assert_relative_eq!(camera.forward(), Vec3::z(), epsilon = EPSILON);
        assert_relative_eq!(camera.up(), Vec3::y(), epsilon = EPSILON);
    }

    #[test]
    fn translate_moves_along_the_basis() {
        let mut camera = Camera::default();
        camera.translate(1.0, 2.0, 3.0);
        assert_relative_eq!(camera.eye, Vec3::new(1.0, 2.0, 3.0), epsilon = EPSILON);
    }
}
