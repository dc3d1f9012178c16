// The generators only produce normals and UVs; the floor's normal map needs tangents.

use anyhow::bail;
use bevy_mikktspace::{generate_tangents, Geometry as MikkGeometry};
use glam::Vec4;

use super::Geometry;

impl MikkGeometry for Geometry {
    fn num_faces(&self) -> usize {
        self.triangle_count()
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        3
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).position.to_array()
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).normal.to_array()
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.vertex_by_triangle_index(face, vert)
            .tex_coords
            .to_array()
    }

    fn set_tangent(
        &mut self,
        tangent: [f32; 3],
        _bi_tangent: [f32; 3],
        _f_mag_s: f32,
        _f_mag_t: f32,
        bi_tangent_preserves_orientation: bool,
        face: usize,
        vert: usize,
    ) {
        let sign = if bi_tangent_preserves_orientation {
            1.0
        } else {
            -1.0
        };

        // Shared vertices get the value of whichever face is written last. The
        // generators never share a vertex across faces with diverging UVs.
        let vertex = self.vertex_by_triangle_index_mut(face, vert);
        vertex.tangent = Vec4::new(tangent[0], tangent[1], tangent[2], sign);
    }
}

impl Geometry {
    /// Generate tangents for this geometry using the mikktspace algorithm
    pub fn generate_tangents(&mut self) -> anyhow::Result<()> {
        let success = generate_tangents(self);

        if !success {
            bail!("Failed to generate tangents for {}", self.name)
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::geometry::plane;

    #[test]
    fn plane_tangents_follow_u_axis() {
        let mut geometry = plane(2.0, 2.0, 2, 2);
        geometry.generate_tangents().unwrap();

        for vertex in &geometry.vertices {
            let tangent = vertex.tangent.truncate();
            assert!(tangent.abs_diff_eq(Vec3::X, 1e-4), "{tangent:?}");
            assert_eq!(vertex.tangent.w.abs(), 1.0);
        }
    }

    #[test]
    fn tangents_are_perpendicular_to_normals() {
        let mut geometry = crate::geometry::sphere(1.0, 16, 16);
        geometry.generate_tangents().unwrap();

        for vertex in &geometry.vertices {
            let tangent = vertex.tangent.truncate();
            if tangent.length_squared() < 1e-6 {
                continue;
            }
            assert!(tangent.normalize().dot(vertex.normal).abs() < 1e-2);
        }
    }
}
