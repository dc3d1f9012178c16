use glam::{EulerRot, Mat4, Quat, Vec3};
use std::cell::{Cell, Ref, RefCell};

#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: f32,

    local_matrix: RefCell<Mat4>,
    world_matrix: RefCell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY, 1.0)
    }

    pub fn new(translation: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            translation,
            rotation,
            scale,
            local_matrix: RefCell::new(Mat4::IDENTITY),
            world_matrix: RefCell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
            world_dirty: Cell::new(true),
        }
    }

    /// Rotation given as intrinsic X, then Y, then Z angles in radians.
    pub fn euler(x: f32, y: f32, z: f32) -> Quat {
        Quat::from_euler(EulerRot::XYZ, x, y, z)
    }

    pub fn get_local_matrix(&self) -> Ref<Mat4> {
        if self.local_dirty.get() {
            let matrix = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.scale),
                self.rotation,
                self.translation,
            );

            self.local_matrix.replace(matrix);
            self.local_dirty.set(false);
            self.invalidate_world();
        }

        self.local_matrix.borrow()
    }

    pub fn get_world_matrix(&self) -> Ref<Mat4> {
        self.world_matrix.borrow()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.replace(world_matrix);
        self.world_dirty.set(false);
    }

    pub fn invalidate_local(&self) {
        self.local_dirty.set(true);
        self.world_dirty.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.invalidate_local();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.invalidate_local();
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.invalidate_local();
    }

    pub fn set_transform(&mut self, translation: Vec3, rotation: Quat, scale: f32) {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self.invalidate_local();
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn local_matrix_applies_scale_rotation_translation() {
        let transform = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(FRAC_PI_2),
            2.0,
        );

        let point = transform.get_local_matrix().transform_point3(Vec3::X);
        // X scaled to 2, rotated a quarter turn about Y to -Z, then translated
        assert!(point.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5));
    }

    #[test]
    fn setters_mark_transform_dirty() {
        let mut transform = Transform::default();
        let _ = transform.get_local_matrix();
        transform.set_world_matrix(Mat4::IDENTITY);

        assert!(!transform.is_world_dirty());

        transform.set_translation(Vec3::Y);

        assert!(transform.is_world_dirty());
        assert_eq!(
            transform.get_local_matrix().w_axis.truncate(),
            Vec3::Y
        );
    }

    #[test]
    fn rotation_and_scale_rebuild_local_matrix() {
        let mut transform = Transform::from_translation(Vec3::Y);
        let _ = transform.get_local_matrix();
        transform.set_world_matrix(Mat4::IDENTITY);

        transform.set_rotation(Quat::from_rotation_z(FRAC_PI_2));
        assert!(transform.is_world_dirty());
        transform.set_scale(3.0);

        let point = transform.get_local_matrix().transform_point3(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-5));
    }

    #[test]
    fn euler_rotation_order_is_xyz() {
        let rotation = Transform::euler(0.3, -0.2, 0.1);
        let expected =
            Quat::from_rotation_x(0.3) * Quat::from_rotation_y(-0.2) * Quat::from_rotation_z(0.1);
        assert!(rotation.abs_diff_eq(expected, 1e-6));
    }
}
