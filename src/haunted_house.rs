use std::{
    f32::consts::{FRAC_PI_2, FRAC_PI_4},
    path::Path,
};

use glam::{Quat, Vec2, Vec3};
use rand::{rngs::StdRng, SeedableRng};
use winit::dpi::PhysicalSize;

use crate::{
    camera::Camera,
    color::Color,
    controls::OrbitControls,
    geometry::{cone, cuboid, plane, sphere, Geometry, GeometryId},
    graveyard::place_graves,
    lights::Lights,
    material::{MaterialId, MaterialManager, StandardMaterial},
    scene_graph::{object3d::ObjectId, scene::Scene, transform::Transform},
    texture::{ColorSpace, TextureAsset, TextureLoader},
    timer::Timer,
};

const FLOOR_TEXTURES: [&str; 5] = [
    "floor/alpha.jpg",
    "floor/coast_sand_rocks_02_1k/coast_sand_rocks_02_diff_1k.webp",
    "floor/coast_sand_rocks_02_1k/coast_sand_rocks_02_arm_1k.webp",
    "floor/coast_sand_rocks_02_1k/coast_sand_rocks_02_nor_gl_1k.webp",
    "floor/coast_sand_rocks_02_1k/coast_sand_rocks_02_disp_1k.webp",
];

const FLOOR_TEXTURE_REPEAT: Vec2 = Vec2::splat(8.0);

/// (position, scale)
const BUSHES: [(Vec3, f32); 4] = [
    (Vec3::new(0.8, 0.2, 2.2), 0.5),
    (Vec3::new(1.4, 0.1, 2.1), 0.25),
    (Vec3::new(-0.8, 0.1, 2.2), 0.4),
    (Vec3::new(-1.0, 0.03, 2.6), 0.25),
];

pub struct HauntedHouse {
    pub scene: Scene,
    pub materials: MaterialManager,
    pub lights: Lights,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub timer: Timer,

    pub floor_material: MaterialId,
    graves_group: ObjectId,
    graves: Vec<ObjectId>,
    seed: u64,
}

impl HauntedHouse {
    /// Builds the whole scene. Textures are read from `assets`; missing files are replaced
    /// with placeholders so the scene still renders.
    pub fn new(assets: &Path, seed: Option<u64>, grave_count: usize) -> anyhow::Result<Self> {
        let seed = seed.unwrap_or_else(rand::random);
        log::info!("Graveyard seed: {}", seed);

        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();

        let floor_material = create_floor_material(&mut materials, &TextureLoader::new(assets))?;
        let floor_geometry = add_geometry(&mut scene, plane(20.0, 20.0, 50, 50))?;
        scene.add_mesh(
            "Floor",
            floor_geometry,
            floor_material,
            Transform::new(Vec3::ZERO, Quat::from_rotation_x(-FRAC_PI_2), 1.0),
            None,
        );

        build_house(&mut scene, &mut materials)?;

        let grave_geometry = add_geometry(&mut scene, cuboid(0.6, 0.8, 0.2))?;
        let grave_material = materials.add_material(StandardMaterial::with_color(
            "Grave",
            Color::from_hex("#b2b6b1")?,
        ));

        let graves_group = scene.add_group("Graves", None);
        let mut rng = StdRng::seed_from_u64(seed);
        let graves = place_graves(&mut rng, grave_count)
            .into_iter()
            .enumerate()
            .map(|(index, placement)| {
                scene.add_mesh(
                    &format!("Grave {}", index),
                    grave_geometry,
                    grave_material,
                    placement.transform(),
                    Some(graves_group),
                )
            })
            .collect();

        let mut camera = Camera::perspective(75.0, 1.0, 0.1, 100.0);
        camera.eye = Vec3::new(4.0, 2.0, 5.0);
        camera.target = Vec3::ZERO;

        let mut controls = OrbitControls::new(camera.target, Vec2::ONE);
        controls.enable_damping = true;

        let mut house = Self {
            scene,
            materials,
            lights: Lights::default(),
            camera,
            controls,
            timer: Timer::new(),
            floor_material,
            graves_group,
            graves,
            seed,
        };

        // World matrices are valid before the first frame
        house.scene.late_update();

        Ok(house)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn grave_count(&self) -> usize {
        self.graves.len()
    }

    pub fn graves_visible(&self) -> bool {
        self.scene
            .get_object(self.graves_group)
            .is_some_and(|group| group.visible)
    }

    /// Hides or shows the whole graveyard through its group.
    pub fn set_graves_visible(&mut self, visible: bool) {
        self.scene.set_object_visible(self.graves_group, visible);
    }

    /// Re-rolls every grave's placement from `seed`, keeping the same objects.
    pub fn regenerate_graves(&mut self, seed: u64) {
        self.seed = seed;

        let mut rng = StdRng::seed_from_u64(seed);
        let placements = place_graves(&mut rng, self.graves.len());

        for (&grave, placement) in self.graves.iter().zip(placements) {
            self.scene
                .set_object_transform(grave, placement.position, placement.quat(), 1.0);
        }

        log::info!("Graveyard regenerated with seed {}", seed);
    }

    /// Follows the window size. The camera only needs the aspect ratio, the controls
    /// measure drags in logical pixels.
    pub fn resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        self.camera.set_aspect(size.width, size.height);

        self.controls
            .set_viewport(size.to_logical(scale_factor), scale_factor);
    }
}

fn add_geometry(scene: &mut Scene, mut geometry: Geometry) -> anyhow::Result<GeometryId> {
    geometry.generate_tangents()?;
    Ok(scene.add_geometry(geometry))
}

fn create_floor_material(
    materials: &mut MaterialManager,
    loader: &TextureLoader,
) -> anyhow::Result<MaterialId> {
    let textures: [TextureAsset; 5] = loader
        .load_all(&FLOOR_TEXTURES)
        .try_into()
        .map_err(|_| anyhow::anyhow!("Texture loader returned the wrong number of textures"))?;
    let [alpha, mut color, mut arm, mut normal, mut displacement] = textures;

    color.color_space = ColorSpace::Srgb;
    for texture in [&mut color, &mut arm, &mut normal, &mut displacement] {
        texture.set_repeat_wrapping(FLOOR_TEXTURE_REPEAT);
    }

    let alpha = materials.add_texture(alpha);
    let color = materials.add_texture(color);
    let arm = materials.add_texture(arm);
    let normal = materials.add_texture(normal);
    let displacement = materials.add_texture(displacement);

    Ok(materials.add_material(StandardMaterial {
        name: String::from("Floor"),
        transparent: true,
        map: Some(color),
        alpha_map: Some(alpha),
        ao_map: Some(arm),
        roughness_map: Some(arm),
        metalness_map: Some(arm),
        normal_map: Some(normal),
        displacement_map: Some(displacement),
        displacement_scale: 0.3,
        displacement_bias: -0.2,
        ..Default::default()
    }))
}

fn build_house(scene: &mut Scene, materials: &mut MaterialManager) -> anyhow::Result<()> {
    let house = scene.add_group("House", None);

    let walls_material = materials.add_material(StandardMaterial {
        name: String::from("Walls"),
        ..Default::default()
    });
    let walls_geometry = add_geometry(scene, cuboid(4.0, 2.5, 4.0))?;
    scene.add_mesh(
        "Walls",
        walls_geometry,
        walls_material,
        Transform::from_translation(Vec3::new(0.0, 1.25, 0.0)),
        Some(house),
    );

    let roof_material = materials.add_material(StandardMaterial {
        name: String::from("Roof"),
        ..Default::default()
    });
    let roof_geometry = add_geometry(scene, cone(3.5, 1.0, 4))?;
    scene.add_mesh(
        "Roof",
        roof_geometry,
        roof_material,
        Transform::new(
            Vec3::new(0.0, 3.0, 0.0),
            Quat::from_rotation_y(FRAC_PI_4),
            1.0,
        ),
        Some(house),
    );

    let door_material = materials.add_material(StandardMaterial::with_color(
        "Door",
        Color::from_hex("#a15500")?,
    ));
    let door_geometry = add_geometry(scene, plane(2.2, 2.2, 1, 1))?;
    scene.add_mesh(
        "Door",
        door_geometry,
        door_material,
        Transform::from_translation(Vec3::new(0.0, 1.0, 2.01)),
        Some(house),
    );

    let bush_material = materials.add_material(StandardMaterial::with_color(
        "Bush",
        Color::from_hex("#89c854")?,
    ));
    let bush_geometry = add_geometry(scene, sphere(1.0, 16, 16))?;
    for (index, (position, scale)) in BUSHES.into_iter().enumerate() {
        scene.add_mesh(
            &format!("Bush {}", index + 1),
            bush_geometry,
            bush_material,
            Transform::new(position, Quat::IDENTITY, scale),
            Some(house),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::material::TextureSlot;

    // No textures on disk, so every floor texture is a placeholder
    fn test_house(seed: u64) -> HauntedHouse {
        HauntedHouse::new(&PathBuf::from("missing-assets"), Some(seed), 30).unwrap()
    }

    fn world_position(house: &HauntedHouse, name: &str) -> Vec3 {
        let id = house.scene.get_object_by_name(name).unwrap();
        let transform = &house.scene.get_object(id).unwrap().transform;
        transform.get_world_matrix().w_axis.truncate()
    }

    #[test]
    fn house_parts_are_placed() {
        let house = test_house(1);

        assert_eq!(world_position(&house, "Walls"), Vec3::new(0.0, 1.25, 0.0));
        assert_eq!(world_position(&house, "Roof"), Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(world_position(&house, "Door"), Vec3::new(0.0, 1.0, 2.01));
        assert_eq!(world_position(&house, "Bush 4"), Vec3::new(-1.0, 0.03, 2.6));
    }

    #[test]
    fn house_parts_share_a_group() {
        let house = test_house(1);
        let group = house.scene.get_object_by_name("House").unwrap();
        let group = house.scene.get_object(group).unwrap();

        let names: Vec<_> = group
            .children(&house.scene)
            .map(|child| child.name.as_str())
            .collect();
        assert_eq!(
            names,
            ["Walls", "Roof", "Door", "Bush 1", "Bush 2", "Bush 3", "Bush 4"]
        );
    }

    #[test]
    fn bushes_share_geometry_and_material() {
        let house = test_house(1);
        let meshes: Vec<_> = (1..=4)
            .map(|index| {
                let id = house
                    .scene
                    .get_object_by_name(&format!("Bush {}", index))
                    .unwrap();
                house.scene.get_object(id).unwrap().mesh.unwrap()
            })
            .collect();

        assert!(meshes.iter().all(|mesh| *mesh == meshes[0]));
    }

    #[test]
    fn graveyard_has_requested_graves() {
        let house = test_house(1);
        assert_eq!(house.grave_count(), 30);

        let group = house.scene.get_object_by_name("Graves").unwrap();
        assert_eq!(house.scene.get_object(group).unwrap().child_ids.len(), 30);

        // Floor, 7 house parts and the graves
        assert_eq!(house.scene.visible_meshes().len(), 1 + 7 + 30);
    }

    #[test]
    fn same_seed_gives_same_graveyard() {
        let a = test_house(42);
        let b = test_house(42);
        assert_eq!(world_position(&a, "Grave 0"), world_position(&b, "Grave 0"));
        assert_eq!(world_position(&a, "Grave 29"), world_position(&b, "Grave 29"));
    }

    #[test]
    fn regenerating_graves_moves_them() {
        let mut house = test_house(42);
        let before = world_position(&house, "Grave 0");

        house.regenerate_graves(43);
        house.scene.late_update();

        assert_eq!(house.seed(), 43);
        assert_eq!(house.grave_count(), 30);
        assert_ne!(world_position(&house, "Grave 0"), before);
        assert_eq!(world_position(&house, "Grave 0"), world_position(&test_house(43), "Grave 0"));
    }

    #[test]
    fn floor_textures_repeat_except_alpha() {
        let house = test_house(1);
        let floor = house.materials.material(house.floor_material).unwrap();

        assert!(floor.transparent);
        assert_eq!(floor.displacement_scale, 0.3);
        assert_eq!(floor.displacement_bias, -0.2);

        let repeat = |slot| house.materials.uv_repeat(floor, slot);
        assert_eq!(repeat(TextureSlot::Color), Vec2::splat(8.0));
        assert_eq!(repeat(TextureSlot::Roughness), Vec2::splat(8.0));
        assert_eq!(repeat(TextureSlot::Displacement), Vec2::splat(8.0));
        assert_eq!(repeat(TextureSlot::Alpha), Vec2::ONE);

        let color = house.materials.texture(floor.map.unwrap()).unwrap();
        assert_eq!(color.color_space, ColorSpace::Srgb);
        let normal = house.materials.texture(floor.normal_map.unwrap()).unwrap();
        assert_eq!(normal.color_space, ColorSpace::Linear);
    }

    #[test]
    fn missing_textures_become_placeholders() {
        let house = test_house(1);
        assert_eq!(house.materials.textures().count(), 5);
        assert!(house
            .materials
            .textures()
            .all(|(_, texture)| texture.size() == (1, 1)));
    }

    #[test]
    fn hiding_graves_keeps_house_visible() {
        let mut house = test_house(1);
        assert!(house.graves_visible());

        house.set_graves_visible(false);
        assert!(!house.graves_visible());
        assert_eq!(house.scene.visible_meshes().len(), 1 + 7);

        house.set_graves_visible(true);
        assert_eq!(house.scene.visible_meshes().len(), 1 + 7 + 30);
    }

    #[test]
    fn resize_updates_camera_aspect() {
        let mut house = test_house(1);
        house.resize(PhysicalSize::new(1600, 800), 2.0);
        assert_eq!(house.camera.aspect, 2.0);
    }

    fn drag_horizontally(house: &mut HauntedHouse, physical_pixels: f64) {
        use winit::{
            dpi::PhysicalPosition,
            event::{DeviceId, ElementState, MouseButton, WindowEvent},
        };

        let events = [
            WindowEvent::MouseInput {
                device_id: DeviceId::dummy(),
                state: ElementState::Pressed,
                button: MouseButton::Left,
            },
            WindowEvent::CursorMoved {
                device_id: DeviceId::dummy(),
                position: PhysicalPosition::new(100.0, 300.0),
            },
            WindowEvent::CursorMoved {
                device_id: DeviceId::dummy(),
                position: PhysicalPosition::new(100.0 + physical_pixels, 300.0),
            },
        ];
        for event in &events {
            house.controls.handle_window_event(event, &house.camera);
        }
        house.controls.update(&mut house.camera, 0.0);
    }

    #[test]
    fn hidpi_drag_turns_like_a_logical_one() {
        let mut house = test_house(1);
        house.controls.enable_damping = false;
        house.resize(PhysicalSize::new(1600, 1200), 2.0);

        drag_horizontally(&mut house, 600.0);

        // Half the window height is half a turn around the house
        assert!(house.camera.eye.abs_diff_eq(Vec3::new(-4.0, 2.0, -5.0), 1e-3));
    }

    #[test]
    fn scale_factor_change_alone_updates_drag_rate() {
        let mut house = test_house(1);
        house.controls.enable_damping = false;
        house.resize(PhysicalSize::new(1600, 1200), 1.0);
        house.resize(PhysicalSize::new(1600, 1200), 2.0);

        drag_horizontally(&mut house, 600.0);

        assert!(house.camera.eye.abs_diff_eq(Vec3::new(-4.0, 2.0, -5.0), 1e-3));
    }
}
