use crate::{
    geometry::GeometryId, material::MaterialId, scene_graph::scene::Scene,
    scene_graph::transform::Transform,
};

use id_arena::Id;

pub type ObjectId = Id<Object3D>;

/// A drawable pairing of shared geometry and material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mesh {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub visible: bool,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
}

impl Object3D {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::new(name)
        }
    }

    pub fn children<'a, 'b>(&'a self, scene: &'b Scene) -> impl Iterator<Item = &'b Object3D> + 'b
    where
        'a: 'b,
    {
        self.child_ids
            .iter()
            .filter_map(move |id| scene.get_object(*id))
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            mesh: None,
            visible: true,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
