use imgui::{Condition, Drag, TreeNodeFlags};

use crate::haunted_house::HauntedHouse;

/// Tweak panel for lights, floor and controls.
pub struct DebugGui {
    pub visible: bool,
}

impl DebugGui {
    pub fn new() -> Self {
        Self { visible: true }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("Debug GUI visible: {}", self.visible);
    }

    pub fn draw(&mut self, ui: &imgui::Ui, house: &mut HauntedHouse) {
        if !self.visible {
            return;
        }

        ui.window("Haunted house")
            .size([320.0, 460.0], Condition::FirstUseEver)
            .position([10.0, 10.0], Condition::FirstUseEver)
            .build(|| {
                let framerate = ui.io().framerate;
                ui.text(format!(
                    "{:.1} fps ({:.2} ms)",
                    framerate,
                    1000.0 / framerate.max(f32::EPSILON)
                ));
                ui.text_disabled("H toggles this panel");

                if ui.collapsing_header("Time", TreeNodeFlags::empty()) {
                    ui.text(format!(
                        "Elapsed {:.1} s, uptime {:.1} s",
                        house.timer.elapsed(),
                        house.timer.uptime().as_secs_f32()
                    ));
                    ui.slider("Time scale", 0.0, 4.0, &mut house.timer.time_scale);
                    if ui.button("Reset clock") {
                        house.timer.reset();
                    }
                }

                if ui.collapsing_header("Lights", TreeNodeFlags::DEFAULT_OPEN) {
                    ui.slider(
                        "Ambient intensity",
                        0.0,
                        3.0,
                        &mut house.lights.ambient.intensity,
                    );
                    ui.slider(
                        "Directional intensity",
                        0.0,
                        3.0,
                        &mut house.lights.directional.intensity,
                    );

                    let mut position = house.lights.directional.position.to_array();
                    if Drag::new("Directional position")
                        .range(-10.0, 10.0)
                        .speed(0.05)
                        .build_array(ui, &mut position)
                    {
                        house.lights.directional.position = position.into();
                    }
                }

                if ui.collapsing_header("Floor", TreeNodeFlags::DEFAULT_OPEN) {
                    let floor = house.floor_material;
                    if let Some(material) = house.materials.material_mut(floor) {
                        ui.slider(
                            "Displacement scale",
                            0.0,
                            1.0,
                            &mut material.displacement_scale,
                        );
                        ui.slider(
                            "Displacement bias",
                            -1.0,
                            1.0,
                            &mut material.displacement_bias,
                        );
                    }
                }

                if ui.collapsing_header("Controls", TreeNodeFlags::DEFAULT_OPEN) {
                    ui.checkbox("Damping", &mut house.controls.enable_damping);
                    ui.checkbox("Auto rotate", &mut house.controls.auto_rotate);
                    ui.slider(
                        "Auto rotate speed",
                        -10.0,
                        10.0,
                        &mut house.controls.auto_rotate_speed,
                    );
                }

                if ui.collapsing_header("Graveyard", TreeNodeFlags::DEFAULT_OPEN) {
                    ui.text(format!(
                        "{} graves, seed {}",
                        house.grave_count(),
                        house.seed()
                    ));
                    let mut show_graves = house.graves_visible();
                    if ui.checkbox("Show graves", &mut show_graves) {
                        house.set_graves_visible(show_graves);
                    }
                    if ui.button("Re-roll graves") {
                        house.regenerate_graves(rand::random());
                    }
                }

                if ui.collapsing_header("Assets", TreeNodeFlags::empty()) {
                    house.materials.draw_ui(ui);
                }
            });
    }
}
