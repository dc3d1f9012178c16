use crate::{debug_gui::DebugGui, haunted_house::HauntedHouse};

/// Advances the scene by one frame. Transforms changed by the GUI or the controls are
/// propagated before returning, so the house is ready to render.
pub fn update(house: &mut HauntedHouse, gui: Option<(&mut DebugGui, &imgui::Ui)>) {
    house.timer.update();

    if let Some((debug_gui, ui)) = gui {
        debug_gui.draw(ui, house);
    }

    let delta = house.timer.delta();
    house.controls.update(&mut house.camera, delta);

    house.scene.late_update();
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use glam::Vec3;

    use super::*;

    #[test]
    fn update_propagates_regenerated_graves() {
        let mut house = HauntedHouse::new(&PathBuf::from("missing-assets"), Some(5), 3).unwrap();
        house.regenerate_graves(6);

        update(&mut house, None);

        let grave = house.scene.get_object_by_name("Grave 0").unwrap();
        let transform = &house.scene.get_object(grave).unwrap().transform;
        let world = transform.get_world_matrix().w_axis.truncate();
        assert_eq!(world, transform.translation());
        assert_ne!(world, Vec3::ZERO);
    }

    #[test]
    fn camera_keeps_looking_at_target() {
        let mut house = HauntedHouse::new(&PathBuf::from("missing-assets"), Some(5), 0).unwrap();
        let distance = house.controls.distance(&house.camera);

        update(&mut house, None);

        assert_eq!(house.camera.target, house.controls.target);
        assert!((house.controls.distance(&house.camera) - distance).abs() < 1e-4);
    }
}
