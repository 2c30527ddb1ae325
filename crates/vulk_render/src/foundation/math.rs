//! Math utilities and types
//!
//! Provides fundamental math types for 3D rendering plus the analytic
//! matrices the multi-pass techniques rely on (planar reflection, planar
//! shadow projection, Vulkan-clip perspective).

pub use nalgebra::{Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Reflection across the plane through `point` with unit normal `normal`.
///
/// Maps a point x to `x - 2 * dot(x - point, normal) * normal`, which is the
/// same transform the mirrored-world vertex stage applies from its plane UBO.
pub fn reflect_across_plane(normal: Vec3, point: Vec3) -> Mat4 {
    let n = normal.normalize();
    let d = -n.dot(&point);

    let mut m = Mat4::identity();
    for i in 0..3 {
        for j in 0..3 {
            m[(i, j)] -= 2.0 * n[i] * n[j];
        }
        m[(i, 3)] = -2.0 * n[i] * d;
    }
    m
}

/// Projects geometry onto the plane `dot(normal, x) + d == 0` as seen from a
/// point light at `light_pos`. Used for planar shadow rendering.
pub fn shadow_onto_plane(normal: Vec3, d: f32, light_pos: Vec3) -> Mat4 {
    let n = normal.normalize();
    let plane = Vec4::new(n.x, n.y, n.z, d);
    let light = Vec4::new(light_pos.x, light_pos.y, light_pos.z, 1.0);
    let n_dot_l = plane.dot(&light);

    let mut m = Mat4::zeros();
    for i in 0..4 {
        for j in 0..4 {
            m[(i, j)] = -light[i] * plane[j];
            if i == j {
                m[(i, j)] += n_dot_l;
            }
        }
    }
    m
}

/// Right-handed perspective projection with the Y flip Vulkan's clip space
/// requires.
pub fn perspective_vk(fovy_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::new_perspective(aspect, fovy_radians, near, far);
    proj[(1, 1)] *= -1.0;
    proj
}

/// Right-handed look-at view matrix.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
}

/// Which side of the plane `dot(normal, x) + d` a point lies on.
/// Positive means the normal side.
pub fn plane_side(normal: Vec3, d: f32, point: Vec3) -> f32 {
    normal.dot(&point) + d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn transform(m: &Mat4, p: Vec3) -> Vec3 {
        let v = m * Vec4::new(p.x, p.y, p.z, 1.0);
        Vec3::new(v.x / v.w, v.y / v.w, v.z / v.w)
    }

    #[test]
    fn reflection_is_an_involution() {
        let m = reflect_across_plane(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 2.0));
        let twice = m * m;
        assert_relative_eq!(twice, Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn reflection_fixes_points_on_the_plane() {
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let point = Vec3::new(0.0, -1.0, 0.0);
        let m = reflect_across_plane(normal, point);

        let on_plane = Vec3::new(3.0, -1.0, -7.0);
        assert_relative_eq!(transform(&m, on_plane), on_plane, epsilon = EPSILON);
    }

    #[test]
    fn reflection_mirrors_across_offset_plane() {
        // Plane z = 2, normal +Z: a point at z = 5 lands at z = -1.
        let m = reflect_across_plane(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 2.0));
        let reflected = transform(&m, Vec3::new(1.0, 4.0, 5.0));
        assert_relative_eq!(reflected, Vec3::new(1.0, 4.0, -1.0), epsilon = EPSILON);
    }

    #[test]
    fn reflection_flips_plane_side() {
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let point = Vec3::new(0.0, 0.0, 2.0);
        let d = -normal.dot(&point);
        let m = reflect_across_plane(normal, point);

        let p = Vec3::new(-2.0, 1.0, 6.5);
        let before = plane_side(normal, d, p);
        let after = plane_side(normal, d, transform(&m, p));
        assert_relative_eq!(after, -before, epsilon = EPSILON);
    }

    #[test]
    fn shadow_lands_on_the_plane() {
        // Floor plane y = 0, light above the scene.
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let m = shadow_onto_plane(normal, 0.0, Vec3::new(0.0, 5.0, 0.0));

        let projected = transform(&m, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(projected.y, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn shadow_projects_along_light_ray() {
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let light = Vec3::new(0.0, 4.0, 0.0);
        let m = shadow_onto_plane(normal, 0.0, light);

        // Point at (1, 2, 0): the ray from the light through it hits y = 0
        // at (2, 0, 0).
        let projected = transform(&m, Vec3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(projected, Vec3::new(2.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn perspective_flips_y() {
        let gl = Mat4::new_perspective(16.0 / 9.0, 45_f32.to_radians(), 0.01, 10.0);
        let vk = perspective_vk(45_f32.to_radians(), 16.0 / 9.0, 0.01, 10.0);
        assert_relative_eq!(vk[(1, 1)], -gl[(1, 1)], epsilon = EPSILON);
        assert_relative_eq!(vk[(0, 0)], gl[(0, 0)], epsilon = EPSILON);
    }

    #[test]
    fn look_at_moves_eye_to_origin() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let view = look_at(eye, Vec3::zeros(), Vec3::y());
        assert_relative_eq!(transform(&view, eye), Vec3::zeros(), epsilon = EPSILON);
    }
}
