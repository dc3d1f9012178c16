//! Orbit camera controls.
//!
//! Left drag orbits around the target, right or middle drag pans, the wheel dollies
//! and the arrow keys pan. Input only accumulates deltas; [`OrbitControls::update`]
//! applies them once per frame, which is where damping happens.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use winit::{
    dpi::{LogicalPosition, LogicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::camera::Camera;

const EPSILON: f32 = 1e-6;
/// Dolly steps per logical pixel of trackpad scroll
const PIXEL_DELTA_STEPS: f32 = 0.01;

/// Spherical coordinates around the Y axis. `phi` is the polar angle from +Y and
/// `theta` the azimuth measured from +Z towards +X.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();

        if radius < EPSILON {
            return Self::default();
        }

        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;

        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keeps phi off the poles, where the azimuth is undefined.
    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPSILON, PI - EPSILON);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragState {
    None,
    Rotate,
    Pan,
}

pub struct OrbitControls {
    pub target: Vec3,
    pub enabled: bool,

    pub enable_damping: bool,
    pub damping_factor: f32,

    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Pixels panned per arrow key press
    pub key_pan_speed: f32,

    pub auto_rotate: bool,
    /// 2.0 is one orbit every 30 seconds
    pub auto_rotate_speed: f32,

    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,

    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vec3,

    drag: DragState,
    /// Last cursor position in logical pixels
    cursor: Option<Vec2>,
    /// Logical size of the input surface; rotation is relative to its height
    viewport: Vec2,
    /// Converts the physical positions winit reports into logical pixels
    scale_factor: f64,
}

impl OrbitControls {
    pub fn new(target: Vec3, viewport: Vec2) -> Self {
        Self {
            target,
            enabled: true,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            key_pan_speed: 7.0,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            drag: DragState::None,
            cursor: None,
            viewport,
            scale_factor: 1.0,
        }
    }

    /// Takes the logical size of the surface and the scale factor cursor events are
    /// reported with.
    pub fn set_viewport(&mut self, size: LogicalSize<f32>, scale_factor: f64) {
        self.viewport = Vec2::new(size.width.max(1.0), size.height.max(1.0));
        self.scale_factor = scale_factor.max(f64::EPSILON);
        // The previous position was measured at the old scale
        self.cursor = None;
    }

    pub fn distance(&self, camera: &Camera) -> f32 {
        (camera.eye - self.target).length()
    }

    /// Turns a pixel drag into an orbit. Dragging across the full viewport height
    /// is one full turn.
    pub fn rotate_by_pixels(&mut self, delta: Vec2) {
        let delta = delta * self.rotate_speed;
        self.rotate_left(TAU * delta.x / self.viewport.y);
        self.rotate_up(TAU * delta.y / self.viewport.y);
    }

    /// Moves the target so the point under the cursor follows the drag.
    pub fn pan_by_pixels(&mut self, delta: Vec2, camera: &Camera) {
        let delta = delta * self.pan_speed;

        let offset = camera.eye - self.target;
        let target_distance = offset.length() * (camera.fov_y.to_radians() * 0.5).tan();

        let camera_matrix = camera.view_matrix().inverse();
        let right = camera_matrix.x_axis.truncate();
        let up = camera_matrix.y_axis.truncate();

        self.pan_offset -= right * (2.0 * delta.x * target_distance / self.viewport.y);
        self.pan_offset += up * (2.0 * delta.y * target_distance / self.viewport.y);
    }

    /// Positive steps move towards the target, negative away from it.
    pub fn dolly(&mut self, steps: f32) {
        let zoom_scale = 0.95f32.powf(self.zoom_speed);
        self.scale *= zoom_scale.powf(steps);
    }

    fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Applies accumulated input to the camera.
    pub fn update(&mut self, camera: &mut Camera, delta_seconds: f32) {
        let offset = camera.eye - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.auto_rotate && self.drag == DragState::None {
            self.rotate_left(TAU / 60.0 * self.auto_rotate_speed * delta_seconds);
        }

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        spherical.theta += self.spherical_delta.theta * factor;
        spherical.phi += self.spherical_delta.phi * factor;

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle);
        spherical.make_safe();

        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * factor;

        camera.eye = self.target + spherical.to_offset();
        camera.target = self.target;

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }

        self.scale = 1.0;
    }

    /// Feeds a window event to the controls. Returns true if the event was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent, camera: &Camera) -> bool {
        if !self.enabled {
            self.drag = DragState::None;
            return false;
        }

        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => DragState::Rotate,
                    (ElementState::Pressed, MouseButton::Right | MouseButton::Middle) => {
                        DragState::Pan
                    }
                    _ => DragState::None,
                };
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position: LogicalPosition<f32> = position.to_logical(self.scale_factor);
                let position = Vec2::new(position.x, position.y);
                let previous = self.cursor.replace(position);

                let Some(previous) = previous else {
                    return false;
                };

                let delta = position - previous;
                match self.drag {
                    DragState::Rotate => self.rotate_by_pixels(delta),
                    DragState::Pan => self.pan_by_pixels(delta, camera),
                    DragState::None => return false,
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => {
                        let position: LogicalPosition<f32> =
                            position.to_logical(self.scale_factor);
                        position.y * PIXEL_DELTA_STEPS
                    }
                };
                if steps == 0.0 {
                    return false;
                }
                self.dolly(steps);
                true
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                let pan = match code {
                    KeyCode::ArrowUp => Vec2::new(0.0, self.key_pan_speed),
                    KeyCode::ArrowDown => Vec2::new(0.0, -self.key_pan_speed),
                    KeyCode::ArrowLeft => Vec2::new(self.key_pan_speed, 0.0),
                    KeyCode::ArrowRight => Vec2::new(-self.key_pan_speed, 0.0),
                    _ => return false,
                };
                self.pan_by_pixels(pan / self.pan_speed.max(EPSILON), camera);
                true
            }
            _ => false,
        }
    }

    /// Drops any drag in progress, e.g. when the GUI grabs the mouse.
    pub fn cancel_drag(&mut self) {
        self.drag = DragState::None;
    }
}
