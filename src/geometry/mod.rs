mod primitives;
mod tangents;

pub use primitives::{cone, cuboid, plane, sphere};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};
use id_arena::Id;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    /// xyz is the tangent, w the bitangent sign
    pub tangent: Vec4,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coords,
            tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
        }
    }
}

pub type GeometryId = Id<Geometry>;

/// Indexed triangle list. Front faces wind counter-clockwise.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn vertex_by_triangle_index(&self, face: usize, vert: usize) -> &Vertex {
        &self.vertices[self.indices[face * 3 + vert] as usize]
    }

    fn vertex_by_triangle_index_mut(&mut self, face: usize, vert: usize) -> &mut Vertex {
        let index = self.indices[face * 3 + vert] as usize;
        &mut self.vertices[index]
    }
}
