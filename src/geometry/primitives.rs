//! Primitive shape generators.
//!
//! Parameters and vertex layout follow the usual three.js conventions so that literal
//! scene dimensions carry over unchanged. Texture coordinates use a top-left origin.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use super::{Geometry, Vertex};

/// A flat grid centered at the origin, lying in the XY plane and facing +Z.
pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let mut geometry = Geometry::new("Plane");

    push_grid(
        &mut geometry,
        Vec3::ZERO,
        Vec3::X,
        Vec3::Y,
        Vec2::new(width, height),
        (width_segments.max(1), height_segments.max(1)),
    );

    geometry
}

/// An axis-aligned box centered at the origin with one quad per face.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    let mut geometry = Geometry::new("Box");
    let size = Vec3::new(width, height, depth);

    // (normal, right, up) with right x up == normal so every face winds CCW from outside
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    for (normal, right, up) in faces {
        let center = normal * extent_along(size, normal) * 0.5;
        let face_size = Vec2::new(extent_along(size, right), extent_along(size, up));
        push_grid(&mut geometry, center, right, up, face_size, (1, 1));
    }

    geometry
}

/// A closed cone with its apex at `+height / 2` and its base cap at `-height / 2`.
pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Geometry {
    let mut geometry = Geometry::new("Cone");
    let radial_segments = radial_segments.max(3);
    let half_height = height * 0.5;
    let slope = radius / height;

    // Torso: row 0 is the apex ring (zero radius), row 1 the base ring
    for row in 0..=1u32 {
        let v = row as f32;
        let ring_radius = v * radius;

        for segment in 0..=radial_segments {
            let u = segment as f32 / radial_segments as f32;
            let theta = u * TAU;
            let (sin, cos) = theta.sin_cos();

            let position = Vec3::new(ring_radius * sin, half_height - v * height, ring_radius * cos);
            let normal = Vec3::new(sin, slope, cos).normalize();

            geometry
                .vertices
                .push(Vertex::new(position, normal, Vec2::new(u, v)));
        }
    }

    let ring = radial_segments + 1;
    for segment in 0..radial_segments {
        let top = segment;
        let bottom = segment + ring;
        // The apex row collapses to a point, so only one triangle per segment
        geometry
            .indices
            .extend_from_slice(&[bottom, bottom + 1, top + 1]);
    }

    // Base cap, one center vertex per segment so UVs stay seamless
    let center_start = geometry.vertices.len() as u32;
    for _ in 0..radial_segments {
        geometry.vertices.push(Vertex::new(
            Vec3::new(0.0, -half_height, 0.0),
            Vec3::NEG_Y,
            Vec2::new(0.5, 0.5),
        ));
    }

    let rim_start = geometry.vertices.len() as u32;
    for segment in 0..=radial_segments {
        let theta = segment as f32 / radial_segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();

        geometry.vertices.push(Vertex::new(
            Vec3::new(radius * sin, -half_height, radius * cos),
            Vec3::NEG_Y,
            Vec2::new(cos * 0.5 + 0.5, sin * 0.5 + 0.5),
        ));
    }

    for segment in 0..radial_segments {
        let center = center_start + segment;
        let rim = rim_start + segment;
        geometry.indices.extend_from_slice(&[center, rim + 1, rim]);
    }

    geometry
}

/// A UV sphere centered at the origin.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let mut geometry = Geometry::new("Sphere");
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    for row in 0..=height_segments {
        let v = row as f32 / height_segments as f32;

        // Shift the pole UVs half a segment so each pole triangle gets its own texel
        let u_offset = if row == 0 {
            0.5 / width_segments as f32
        } else if row == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };

        for column in 0..=width_segments {
            let u = column as f32 / width_segments as f32;
            let (sin_phi, cos_phi) = (u * TAU).sin_cos();
            let (sin_theta, cos_theta) = (v * PI).sin_cos();

            let normal = Vec3::new(-cos_phi * sin_theta, cos_theta, sin_phi * sin_theta);

            geometry.vertices.push(Vertex::new(
                normal * radius,
                normal,
                Vec2::new(u + u_offset, v),
            ));
        }
    }

    let stride = width_segments + 1;
    for row in 0..height_segments {
        for column in 0..width_segments {
            let a = row * stride + column + 1;
            let b = row * stride + column;
            let c = (row + 1) * stride + column;
            let d = (row + 1) * stride + column + 1;

            if row != 0 {
                geometry.indices.extend_from_slice(&[a, b, d]);
            }
            if row != height_segments - 1 {
                geometry.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    geometry
}

fn extent_along(size: Vec3, axis: Vec3) -> f32 {
    (size * axis.abs()).element_sum()
}

/// Pushes a subdivided quad. `right` maps to +u and `up` to -v.
fn push_grid(
    geometry: &mut Geometry,
    center: Vec3,
    right: Vec3,
    up: Vec3,
    size: Vec2,
    (columns, rows): (u32, u32),
) {
    let normal = right.cross(up);
    let first = geometry.vertices.len() as u32;

    for row in 0..=rows {
        let v = row as f32 / rows as f32;

        for column in 0..=columns {
            let u = column as f32 / columns as f32;
            let position = center + right * (u - 0.5) * size.x + up * (0.5 - v) * size.y;

            geometry
                .vertices
                .push(Vertex::new(position, normal, Vec2::new(u, v)));
        }
    }

    let stride = columns + 1;
    for row in 0..rows {
        for column in 0..columns {
            let top_left = first + row * stride + column;
            let bottom_left = top_left + stride;
            let bottom_right = bottom_left + 1;
            let top_right = top_left + 1;

            geometry.indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                bottom_left,
                bottom_right,
                top_right,
            ]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every triangle's winding must agree with the vertex normals it carries.
    fn assert_outward_winding(geometry: &Geometry) {
        for triangle in geometry.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| geometry.vertices[triangle[i] as usize]);
            let face_normal = (b.position - a.position).cross(c.position - a.position);

            if face_normal.length_squared() < 1e-12 {
                continue;
            }

            let vertex_normal = a.normal + b.normal + c.normal;
            assert!(
                face_normal.dot(vertex_normal) > 0.0,
                "{} has an inward facing triangle {:?}",
                geometry.name,
                triangle
            );
        }
    }

    fn bounds(geometry: &Geometry) -> (Vec3, Vec3) {
        geometry.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), vertex| (min.min(vertex.position), max.max(vertex.position)),
        )
    }

    #[test]
    fn plane_vertex_and_index_counts() {
        let geometry = plane(20.0, 20.0, 50, 50);
        assert_eq!(geometry.vertices.len(), 51 * 51);
        assert_eq!(geometry.triangle_count(), 50 * 50 * 2);
    }

    #[test]
    fn plane_faces_positive_z() {
        let geometry = plane(2.2, 2.2, 1, 1);
        assert!(geometry.vertices.iter().all(|v| v.normal == Vec3::Z));
        assert_outward_winding(&geometry);

        let (min, max) = bounds(&geometry);
        assert!(min.abs_diff_eq(Vec3::new(-1.1, -1.1, 0.0), 1e-5));
        assert!(max.abs_diff_eq(Vec3::new(1.1, 1.1, 0.0), 1e-5));
    }

    #[test]
    fn plane_uvs_have_top_left_origin() {
        let geometry = plane(1.0, 1.0, 1, 1);
        let top_left = geometry.vertices[0];
        assert_eq!(top_left.tex_coords, Vec2::ZERO);
        assert!(top_left.position.x < 0.0 && top_left.position.y > 0.0);
    }

    #[test]
    fn cuboid_has_requested_extents() {
        let geometry = cuboid(4.0, 2.5, 4.0);
        assert_eq!(geometry.vertices.len(), 24);
        assert_eq!(geometry.triangle_count(), 12);

        let (min, max) = bounds(&geometry);
        assert!(min.abs_diff_eq(Vec3::new(-2.0, -1.25, -2.0), 1e-5));
        assert!(max.abs_diff_eq(Vec3::new(2.0, 1.25, 2.0), 1e-5));
        assert_outward_winding(&geometry);
    }

    #[test]
    fn cuboid_normals_point_away_from_center() {
        let geometry = cuboid(0.6, 0.8, 0.2);
        for vertex in &geometry.vertices {
            assert!(vertex.position.dot(vertex.normal) > 0.0);
        }
    }

    #[test]
    fn cone_apex_and_base() {
        let geometry = cone(3.5, 1.0, 4);
        let (min, max) = bounds(&geometry);

        assert!((max.y - 0.5).abs() < 1e-5);
        assert!((min.y + 0.5).abs() < 1e-5);
        assert!((max.x - 3.5).abs() < 1e-5);
        assert!((max.z - 3.5).abs() < 1e-5);
        // 4 side triangles + 4 cap triangles
        assert_eq!(geometry.triangle_count(), 8);
        assert_outward_winding(&geometry);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let geometry = sphere(1.0, 16, 16);
        assert_eq!(geometry.vertices.len(), 17 * 17);
        // Pole rows contribute a single triangle per segment
        assert_eq!(geometry.triangle_count(), 16 * 14 * 2 + 16 * 2);

        for vertex in &geometry.vertices {
            assert!((vertex.position.length() - 1.0).abs() < 1e-5);
        }
        assert_outward_winding(&geometry);
    }

    #[test]
    fn indices_stay_in_bounds() {
        for geometry in [
            plane(1.0, 1.0, 3, 2),
            cuboid(1.0, 1.0, 1.0),
            cone(1.0, 1.0, 7),
            sphere(1.0, 5, 4),
        ] {
            let vertex_count = geometry.vertices.len() as u32;
            assert!(geometry.indices.iter().all(|&i| i < vertex_count));
            assert_eq!(geometry.indices.len() % 3, 0);
        }
    }
}
