//! Procedural geometry generators
//!
//! Each generator returns a fresh [`Mesh`] in the shared vertex layout.
//! Subdivision counts are capped at 6 to bound the output size.

use std::f32::consts::PI;

use crate::foundation::math::{Mat4, Vec2, Vec3};
use crate::render::mesh::{Mesh, Vertex};

const MAX_SUBDIVISIONS: u32 = 6;

/// Split every triangle into four by adding edge midpoints.
fn subdivide_tris(mesh: &mut Mesh) {
    let vertices = std::mem::take(&mut mesh.vertices);
    let indices = std::mem::take(&mut mesh.indices);
    mesh.vertices.reserve(vertices.len() * 2);
    mesh.indices.reserve(indices.len() * 4);

    for tri in indices.chunks_exact(3) {
        let v0 = vertices[tri[0] as usize];
        let v1 = vertices[tri[1] as usize];
        let v2 = vertices[tri[2] as usize];

        let midpoint = |a: &Vertex, b: &Vertex| Vertex {
            pos: 0.5 * (a.pos + b.pos),
            normal: Vec3::zeros(),
            tangent: Vec3::zeros(),
            tex_coord: 0.5 * (a.tex_coord + b.tex_coord),
        };
        let m0 = midpoint(&v0, &v1);
        let m1 = midpoint(&v1, &v2);
        let m2 = midpoint(&v0, &v2);

        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend_from_slice(&[v0, m0, v1, m1, v2, m2]);

        mesh.indices.extend_from_slice(&[
            base,
            base + 1,
            base + 5,
            base + 1,
            base + 2,
            base + 3,
            base + 1,
            base + 3,
            base + 5,
            base + 3,
            base + 4,
            base + 5,
        ]);
    }
}

/// Equilateral triangle in the XY plane with its base on the X axis
pub fn make_equilateral_triangle(side: f32, num_subdivisions: u32) -> Mesh {
    let mut mesh = Mesh::new("EquilateralTriangle");

    let p0 = Vec3::zeros();
    let p1 = Vec3::new(side, 0.0, 0.0);
    let p2 = Vec3::new(side / 2.0, side * 3.0_f32.sqrt() / 2.0, 0.0);
    let normal = Vec3::z();

    let mut v0 = Vertex::new(p0, normal, Vec2::new(0.5, 0.0));
    let mut v1 = Vertex::new(p1, normal, Vec2::new(1.0, 1.0));
    let mut v2 = Vertex::new(p2, normal, Vec2::new(0.0, 1.0));
    v0.tangent = Vec3::x();
    v1.tangent = (p2 - p1).normalize();
    v2.tangent = (p0 - p2).normalize();

    mesh.vertices = vec![v0, v1, v2];
    mesh.indices = vec![0, 1, 2];

    for _ in 0..num_subdivisions.min(MAX_SUBDIVISIONS) {
        subdivide_tris(&mut mesh);
    }
    // Subdivision drops normals; the triangle is planar, restore them
    for v in &mut mesh.vertices {
        v.normal = normal;
    }
    mesh
}

/// Quad in the XY plane at `depth`, corner at `(x, y)`
pub fn make_quad_at(x: f32, y: f32, w: f32, h: f32, depth: f32, num_subdivisions: u32) -> Mesh {
    let mut mesh = Mesh::new("Quad");
    let normal = Vec3::z();

    mesh.vertices = vec![
        Vertex::new(Vec3::new(x, y, depth), normal, Vec2::new(0.0, 0.0)),
        Vertex::new(Vec3::new(x + w, y, depth), normal, Vec2::new(1.0, 0.0)),
        Vertex::new(Vec3::new(x + w, y + h, depth), normal, Vec2::new(1.0, 1.0)),
        Vertex::new(Vec3::new(x, y + h, depth), normal, Vec2::new(0.0, 1.0)),
    ];
    mesh.indices = vec![0, 1, 2, 0, 2, 3];

    for _ in 0..num_subdivisions.min(MAX_SUBDIVISIONS) {
        subdivide_tris(&mut mesh);
    }
    for v in &mut mesh.vertices {
        v.normal = normal;
    }
    mesh
}

/// Quad centered at the origin in the XY plane
pub fn make_quad(w: f32, h: f32, num_subdivisions: u32) -> Mesh {
    make_quad_at(-w / 2.0, -h / 2.0, w, h, 0.0, num_subdivisions)
}

/// Cylinder centered at the origin along Y, with caps.
///
/// Stacks are vertical subdivisions, slices run around the circumference.
pub fn make_cylinder(
    height: f32,
    bottom_radius: f32,
    top_radius: f32,
    num_stacks: u32,
    num_slices: u32,
) -> Mesh {
    let mut mesh = Mesh::new("Cylinder");

    let stack_height = height / num_stacks as f32;
    let radius_step = (top_radius - bottom_radius) / num_stacks as f32;
    let d_theta = 2.0 * PI / num_slices as f32;

    // side rings
    for i in 0..=num_stacks {
        let y = -0.5 * height + i as f32 * stack_height;
        let r = bottom_radius + i as f32 * radius_step;
        for j in 0..=num_slices {
            let c = (j as f32 * d_theta).cos();
            let s = (j as f32 * d_theta).sin();
            mesh.vertices.push(Vertex {
                pos: Vec3::new(r * c, y, r * s),
                normal: Vec3::new(c, 0.0, s),
                tangent: Vec3::new(-s, 0.0, c),
                tex_coord: Vec2::new(
                    j as f32 / num_slices as f32,
                    1.0 - i as f32 / num_stacks as f32,
                ),
            });
        }
    }

    let ring_vertex_count = num_slices + 1;
    for i in 0..num_stacks {
        for j in 0..num_slices {
            mesh.indices.extend_from_slice(&[
                i * ring_vertex_count + j,
                (i + 1) * ring_vertex_count + j,
                (i + 1) * ring_vertex_count + j + 1,
                i * ring_vertex_count + j,
                (i + 1) * ring_vertex_count + j + 1,
                i * ring_vertex_count + j + 1,
            ]);
        }
    }

    // top cap
    let mut base = mesh.vertices.len() as u32;
    for i in 0..=num_slices {
        let c = (i as f32 * d_theta).cos();
        let s = (i as f32 * d_theta).sin();
        let x = top_radius * c;
        let z = top_radius * s;
        mesh.vertices.push(Vertex {
            pos: Vec3::new(x, 0.5 * height, z),
            normal: Vec3::y(),
            tangent: Vec3::new(-s, 0.0, c),
            tex_coord: Vec2::new(x / height + 0.5, z / height + 0.5),
        });
    }
    mesh.vertices.push(Vertex {
        pos: Vec3::new(0.0, 0.5 * height, 0.0),
        normal: Vec3::y(),
        tangent: Vec3::x(),
        tex_coord: Vec2::new(0.5, 0.5),
    });
    let mut center = mesh.vertices.len() as u32 - 1;
    for i in 0..num_slices {
        mesh.indices
            .extend_from_slice(&[base + i + 1, base + i, center]);
    }

    // bottom cap
    base = mesh.vertices.len() as u32;
    for i in 0..=num_slices {
        let c = (i as f32 * d_theta).cos();
        let s = (i as f32 * d_theta).sin();
        let x = bottom_radius * c;
        let z = bottom_radius * s;
        mesh.vertices.push(Vertex {
            pos: Vec3::new(x, -0.5 * height, z),
            normal: -Vec3::y(),
            tangent: Vec3::new(-s, 0.0, c),
            tex_coord: Vec2::new(x / height + 0.5, z / height + 0.5),
        });
    }
    mesh.vertices.push(Vertex {
        pos: Vec3::new(0.0, -0.5 * height, 0.0),
        normal: -Vec3::y(),
        tangent: Vec3::x(),
        tex_coord: Vec2::new(0.5, 0.5),
    });
    center = mesh.vertices.len() as u32 - 1;
    for i in 0..num_slices {
        mesh.indices
            .extend_from_slice(&[base + i, base + i + 1, center]);
    }

    mesh
}

/// Geodesic sphere built by subdividing an icosahedron and projecting onto
/// the sphere of `radius`.
pub fn make_geo_sphere(radius: f32, num_subdivisions: u32) -> Mesh {
    let mut mesh = Mesh::new("GeoSphere");

    const X: f32 = 0.525731;
    const Z: f32 = 0.850651;

    let positions = [
        Vec3::new(-X, 0.0, Z),
        Vec3::new(X, 0.0, Z),
        Vec3::new(-X, 0.0, -Z),
        Vec3::new(X, 0.0, -Z),
        Vec3::new(0.0, Z, X),
        Vec3::new(0.0, Z, -X),
        Vec3::new(0.0, -Z, X),
        Vec3::new(0.0, -Z, -X),
        Vec3::new(Z, X, 0.0),
        Vec3::new(-Z, X, 0.0),
        Vec3::new(Z, -X, 0.0),
        Vec3::new(-Z, -X, 0.0),
    ];

    #[rustfmt::skip]
    let icosahedron_indices: [u32; 60] = [
        1, 4, 0, 4, 9, 0, 4, 5, 9, 8, 5, 4,
        1, 8, 4, 1, 10, 8, 10, 3, 8, 8, 3, 5,
        3, 2, 5, 3, 7, 2, 3, 10, 7, 10, 6, 7,
        6, 11, 7, 6, 0, 11, 6, 1, 0, 10, 1, 6,
        11, 0, 9, 2, 11, 9, 5, 2, 9, 11, 2, 7,
    ];

    mesh.vertices = positions
        .iter()
        .map(|&p| Vertex::new(p, Vec3::zeros(), Vec2::zeros()))
        .collect();
    mesh.indices = icosahedron_indices.to_vec();

    for _ in 0..num_subdivisions.min(MAX_SUBDIVISIONS) {
        subdivide_tris(&mut mesh);
    }

    for v in &mut mesh.vertices {
        let n = v.pos.normalize();
        v.pos = radius * n;
        v.normal = n;
        v.tex_coord = Vec2::new(
            n.z.atan2(n.x) / (2.0 * PI) + 0.5,
            n.y.asin() / PI + 0.5,
        );
        v.tangent = Vec3::x();
    }

    mesh
}

/// Flat grid in the XZ plane centered at the origin, normals up.
///
/// `m` rows run along depth, `n` columns along width; texture coordinates
/// repeat `repeat_u` / `repeat_v` times across the grid.
pub fn make_grid(width: f32, depth: f32, m: u32, n: u32, repeat_u: f32, repeat_v: f32) -> Mesh {
    let mut mesh = Mesh::new("Grid");

    let half_width = 0.5 * width;
    let half_depth = 0.5 * depth;
    let dx = width / (n - 1) as f32;
    let dz = depth / (m - 1) as f32;
    let du = repeat_u / (n - 1) as f32;
    let dv = repeat_v / (m - 1) as f32;

    for i in 0..m {
        let z = half_depth - i as f32 * dz;
        for j in 0..n {
            let x = -half_width + j as f32 * dx;
            mesh.vertices.push(Vertex {
                pos: Vec3::new(x, 0.0, z),
                normal: Vec3::y(),
                tangent: Vec3::x(),
                tex_coord: Vec2::new(j as f32 * du, i as f32 * dv),
            });
        }
    }

    for i in 0..m - 1 {
        for j in 0..n - 1 {
            mesh.indices.extend_from_slice(&[
                i * n + j,
                i * n + j + 1,
                (i + 1) * n + j,
                (i + 1) * n + j,
                i * n + j + 1,
                (i + 1) * n + j + 1,
            ]);
        }
    }

    mesh
}

/// Three thin cylinders along the X, Y and Z axes
pub fn make_axes(length: f32) -> Mesh {
    let mut mesh = Mesh::new("Axes");

    let mut x_axis = make_cylinder(length, 0.01, 0.01, 10, 10);
    let rot_x = nalgebra::Rotation3::from_axis_angle(&Vec3::z_axis(), PI / 2.0).to_homogeneous();
    let xform_x = Mat4::new_translation(&Vec3::new(length / 2.0, 0.0, 0.0)) * rot_x;
    x_axis.transform(&xform_x);

    let mut y_axis = make_cylinder(length, 0.01, 0.01, 10, 10);
    y_axis.transform(&Mat4::new_translation(&Vec3::new(0.0, length / 2.0, 0.0)));

    let mut z_axis = make_cylinder(length, 0.01, 0.01, 10, 10);
    let rot_z = nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), PI / 2.0).to_homogeneous();
    let xform_z = Mat4::new_translation(&Vec3::new(0.0, 0.0, length / 2.0)) * rot_z;
    z_axis.transform(&xform_z);

    mesh.append(&x_axis);
    mesh.append(&y_axis);
    mesh.append(&z_axis);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn indices_in_bounds(mesh: &Mesh) -> bool {
        let count = mesh.vertices.len() as u32;
        mesh.indices.iter().all(|&i| i < count)
    }

    #[test]
    fn quad_has_two_triangles() {
        let quad = make_quad(2.0, 2.0, 0);
        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.indices.len(), 6);
        assert!(indices_in_bounds(&quad));
    }

    #[test]
    fn subdivision_quadruples_triangle_count() {
        let quad = make_quad(2.0, 2.0, 1);
        assert_eq!(quad.indices.len(), 24);
        assert!(indices_in_bounds(&quad));
    }

    #[test]
    fn grid_counts_match_dimensions() {
        let m = 5;
        let n = 7;
        let grid = make_grid(10.0, 8.0, m, n, 1.0, 1.0);
        assert_eq!(grid.vertices.len(), (m * n) as usize);
        assert_eq!(grid.indices.len(), ((m - 1) * (n - 1) * 6) as usize);
        assert!(indices_in_bounds(&grid));
    }

    #[test]
    fn grid_spans_its_extents_with_up_normals() {
        let grid = make_grid(10.0, 8.0, 3, 3, 1.0, 1.0);
        assert_relative_eq!(grid.vertices[0].pos.x, -5.0, epsilon = EPSILON);
        assert_relative_eq!(grid.vertices[0].pos.z, 4.0, epsilon = EPSILON);
        let last = grid.vertices.last().unwrap();
        assert_relative_eq!(last.pos.x, 5.0, epsilon = EPSILON);
        assert_relative_eq!(last.pos.z, -4.0, epsilon = EPSILON);
        assert!(grid.vertices.iter().all(|v| v.normal == Vec3::y()));
    }

    #[test]
    fn geo_sphere_vertices_lie_on_the_sphere() {
        let radius = 2.5;
        let sphere = make_geo_sphere(radius, 2);
        assert!(indices_in_bounds(&sphere));
        for v in &sphere.vertices {
            assert_relative_eq!(v.pos.norm(), radius, epsilon = 1e-4);
            assert_relative_eq!(v.normal.norm(), 1.0, epsilon = EPSILON);
            // normal points radially outward
            assert_relative_eq!(v.normal, v.pos / radius, epsilon = 1e-4);
        }
    }

    #[test]
    fn geo_sphere_starts_from_an_icosahedron() {
        let sphere = make_geo_sphere(1.0, 0);
        assert_eq!(sphere.vertices.len(), 12);
        assert_eq!(sphere.indices.len(), 60);
    }

    #[test]
    fn cylinder_counts_cover_sides_and_caps() {
        let stacks = 4;
        let slices = 8;
        let cyl = make_cylinder(2.0, 1.0, 1.0, stacks, slices);
        // rings + two cap rings + two centers
        let expected_vertices = (stacks + 1) * (slices + 1) + 2 * (slices + 1) + 2;
        assert_eq!(cyl.vertices.len(), expected_vertices as usize);
        // side quads + two cap fans
        let expected_indices = stacks * slices * 6 + 2 * slices * 3;
        assert_eq!(cyl.indices.len(), expected_indices as usize);
        assert!(indices_in_bounds(&cyl));
    }

    #[test]
    fn cylinder_side_normals_are_radial() {
        let cyl = make_cylinder(2.0, 1.0, 1.0, 1, 6);
        let v = &cyl.vertices[0];
        assert_relative_eq!(v.normal.y, 0.0, epsilon = EPSILON);
        assert_relative_eq!(v.normal.norm(), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn axes_combine_three_cylinders() {
        let one = make_cylinder(1.0, 0.01, 0.01, 10, 10);
        let axes = make_axes(1.0);
        assert_eq!(axes.vertices.len(), 3 * one.vertices.len());
        assert_eq!(axes.indices.len(), 3 * one.indices.len());
        assert!(indices_in_bounds(&axes));
    }

    #[test]
    fn equilateral_triangle_is_equilateral() {
        let tri = make_equilateral_triangle(2.0, 0);
        let a = tri.vertices[0].pos;
        let b = tri.vertices[1].pos;
        let c = tri.vertices[2].pos;
        assert_relative_eq!((b - a).norm(), 2.0, epsilon = EPSILON);
        assert_relative_eq!((c - b).norm(), 2.0, epsilon = EPSILON);
        assert_relative_eq!((a - c).norm(), 2.0, epsilon = EPSILON);
    }
}
