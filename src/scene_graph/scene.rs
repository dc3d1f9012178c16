use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;

use crate::geometry::{Geometry, GeometryId};
use crate::material::MaterialId;
use crate::scene_graph::object3d::{Mesh, Object3D, ObjectId};
use crate::scene_graph::transform::Transform;

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub geometries: Arena<Geometry>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            geometries: Arena::new(),
        }
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.alloc(geometry)
    }

    pub fn add_object(&mut self, object: Object3D, parent: Option<ObjectId>) -> ObjectId {
        let object_id = self.objects.alloc(object);

        if parent.is_some() {
            self.set_object_parent(object_id, parent);
        }

        object_id
    }

    /// Adds an empty object used only to transform its children together.
    pub fn add_group(&mut self, name: &str, parent: Option<ObjectId>) -> ObjectId {
        self.add_object(Object3D::new(name), parent)
    }

    pub fn add_mesh(
        &mut self,
        name: &str,
        geometry: GeometryId,
        material: MaterialId,
        transform: Transform,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        let mut object = Object3D::with_mesh(name, Mesh { geometry, material });
        object.transform = transform;
        self.add_object(object, parent)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    /// Updates all object transforms in hierarchical order
    fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        let Some(object) = self.objects.get(object_id) else {
            return;
        };

        // Refreshing the local matrix first may mark the world matrix dirty
        let local_matrix = *object.transform.get_local_matrix();
        let changed = parent_changed || object.transform.is_world_dirty();

        if changed {
            object
                .transform
                .set_world_matrix(parent_world_matrix * local_matrix);
        }

        let world_matrix = *object.transform.get_world_matrix();
        for &child_id in &object.child_ids {
            self.update_object_transform_recursive(child_id, world_matrix, changed);
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|c| c.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;
        }

        if let Some(new_parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
            new_parent.child_ids.push(child_id);
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn set_object_translation(&mut self, object_id: ObjectId, translation: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_translation(translation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_rotation(&mut self, object_id: ObjectId, rotation: Quat) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_rotation(rotation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_scale(&mut self, object_id: ObjectId, scale: f32) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_scale(scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        translation: Vec3,
        rotation: Quat,
        scale: f32,
    ) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_transform(translation, rotation, scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_visible(&mut self, object_id: ObjectId, visible: bool) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.visible = visible;
        }
    }

    /// World matrix and mesh of every mesh whose ancestors are all visible.
    /// Only valid after [`Scene::late_update`] has run for the frame.
    pub fn visible_meshes(&self) -> Vec<(Mat4, Mesh)> {
        let mut meshes = Vec::new();

        for (id, object) in self.objects.iter() {
            if object.parent_id.is_none() {
                self.collect_visible_meshes(id, &mut meshes);
            }
        }

        meshes
    }

    fn collect_visible_meshes(&self, object_id: ObjectId, meshes: &mut Vec<(Mat4, Mesh)>) {
        let Some(object) = self.objects.get(object_id) else {
            return;
        };

        if !object.visible {
            return;
        }

        if let Some(mesh) = object.mesh {
            meshes.push((*object.transform.get_world_matrix(), mesh));
        }

        for &child_id in &object.child_ids {
            self.collect_visible_meshes(child_id, meshes);
        }
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

#[cfg(test)]
mod tests {
    use id_arena::Arena;

    use super::*;
    use crate::{geometry::cuboid, material::StandardMaterial};

    fn test_mesh(scene: &mut Scene) -> (GeometryId, MaterialId) {
        let geometry = scene.add_geometry(cuboid(1.0, 1.0, 1.0));
        let mut materials = Arena::<StandardMaterial>::new();
        let material = materials.alloc(StandardMaterial::default());
        (geometry, material)
    }

    #[test]
    fn child_world_matrix_includes_parent() {
        let mut scene = Scene::new();
        let (geometry, material) = test_mesh(&mut scene);

        let group = scene.add_group("group", None);
        scene.set_object_translation(group, Vec3::new(0.0, 1.0, 0.0));
        let child = scene.add_mesh(
            "child",
            geometry,
            material,
            Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)),
            Some(group),
        );

        scene.late_update();

        let world = *scene.get_object(child).unwrap().transform.get_world_matrix();
        assert!(world
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn moving_parent_updates_children_next_frame() {
        let mut scene = Scene::new();
        let (geometry, material) = test_mesh(&mut scene);

        let group = scene.add_group("group", None);
        let child = scene.add_mesh("child", geometry, material, Transform::default(), Some(group));
        scene.late_update();

        scene.set_object_translation(group, Vec3::new(0.0, 0.0, -3.0));
        scene.late_update();

        let transform = &scene.get_object(child).unwrap().transform;
        assert_eq!(
            transform.get_world_matrix().w_axis.truncate(),
            Vec3::new(0.0, 0.0, -3.0)
        );
    }

    fn world_position(scene: &Scene, id: ObjectId) -> Vec3 {
        scene
            .get_object(id)
            .unwrap()
            .transform
            .get_world_matrix()
            .w_axis
            .truncate()
    }

    #[test]
    fn rotating_parent_swings_children() {
        let mut scene = Scene::new();
        let group = scene.add_group("group", None);
        let child = scene.add_object(
            Object3D {
                transform: Transform::from_translation(Vec3::X),
                ..Object3D::new("child")
            },
            Some(group),
        );
        scene.late_update();

        scene.set_object_rotation(group, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        scene.late_update();

        assert!(world_position(&scene, child).abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn scaling_parent_spreads_children() {
        let mut scene = Scene::new();
        let group = scene.add_group("group", None);
        scene.set_object_translation(group, Vec3::Y);
        let child = scene.add_object(
            Object3D {
                transform: Transform::from_translation(Vec3::X),
                ..Object3D::new("child")
            },
            Some(group),
        );
        scene.late_update();

        scene.set_object_scale(group, 2.0);
        scene.late_update();

        assert!(world_position(&scene, child).abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn reparenting_moves_child_between_lists() {
        let mut scene = Scene::new();
        let a = scene.add_group("a", None);
        let b = scene.add_group("b", None);
        let child = scene.add_group("child", Some(a));

        scene.set_object_parent(child, Some(b));

        assert!(scene.get_object(a).unwrap().child_ids.is_empty());
        assert_eq!(scene.get_object(b).unwrap().child_ids, vec![child]);

        assert_eq!(scene.get_object(child).unwrap().parent_id, Some(b));

        let names: Vec<_> = scene
            .get_object(b)
            .unwrap()
            .children(&scene)
            .map(|object| object.name.as_str())
            .collect();
        assert_eq!(names, vec!["child"]);
    }

    #[test]
    fn hidden_groups_hide_descendants() {
        let mut scene = Scene::new();
        let (geometry, material) = test_mesh(&mut scene);

        let group = scene.add_group("group", None);
        scene.add_mesh("inside", geometry, material, Transform::default(), Some(group));
        scene.add_mesh("outside", geometry, material, Transform::default(), None);
        scene.late_update();

        assert_eq!(scene.visible_meshes().len(), 2);

        scene.set_object_visible(group, false);
        assert_eq!(scene.visible_meshes().len(), 1);
    }

    #[test]
    fn finds_objects_by_name() {
        let mut scene = Scene::new();
        let house = scene.add_group("House", None);

        assert_eq!(scene.get_object_by_name("House"), Some(house));
        assert_eq!(scene.get_object_by_name("Barn"), None);
    }
}
