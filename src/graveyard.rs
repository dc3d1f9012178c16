use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;

use crate::scene_graph::transform::Transform;

pub const DEFAULT_GRAVE_COUNT: usize = 30;

const INNER_RADIUS: f32 = 3.0;
const RING_WIDTH: f32 = 4.0;
const GRAVE_HEIGHT: f32 = 0.4;
/// Each axis tilts within +-half of this
const MAX_TILT: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravePlacement {
    pub position: Vec3,
    /// XYZ Euler angles in radians
    pub rotation: Vec3,
}

impl GravePlacement {
    pub fn random(rng: &mut impl Rng) -> Self {
        let angle = rng.gen::<f32>() * TAU;
        let radius = INNER_RADIUS + rng.gen::<f32>() * RING_WIDTH;

        let position = Vec3::new(angle.sin() * radius, GRAVE_HEIGHT, angle.cos() * radius);
        let rotation = Vec3::new(
            (rng.gen::<f32>() - 0.5) * MAX_TILT,
            (rng.gen::<f32>() - 0.5) * MAX_TILT,
            (rng.gen::<f32>() - 0.5) * MAX_TILT,
        );

        Self { position, rotation }
    }

    pub fn quat(&self) -> Quat {
        Transform::euler(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.quat(), 1.0)
    }
}

/// Scatters graves in a ring around the house.
pub fn place_graves(rng: &mut impl Rng, count: usize) -> Vec<GravePlacement> {
    (0..count).map(|_| GravePlacement::random(rng)).collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn graves_stay_inside_ring() {
        let mut rng = StdRng::seed_from_u64(7);
        let graves = place_graves(&mut rng, 500);
        assert_eq!(graves.len(), 500);

        for grave in graves {
            let radius = Vec3::new(grave.position.x, 0.0, grave.position.z).length();
            assert!((3.0 - 1e-4..7.0 + 1e-4).contains(&radius), "radius {}", radius);
            assert_eq!(grave.position.y, 0.4);
        }
    }

    #[test]
    fn tilt_is_bounded() {
        let mut rng = StdRng::seed_from_u64(3);

        for grave in place_graves(&mut rng, 500) {
            let max = grave.rotation.abs().max_element();
            assert!(max <= 0.2, "tilt {}", max);
        }
    }

    #[test]
    fn same_seed_gives_same_graveyard() {
        let a = place_graves(&mut StdRng::seed_from_u64(42), DEFAULT_GRAVE_COUNT);
        let b = place_graves(&mut StdRng::seed_from_u64(42), DEFAULT_GRAVE_COUNT);
        let c = place_graves(&mut StdRng::seed_from_u64(43), DEFAULT_GRAVE_COUNT);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zero_graves() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(place_graves(&mut rng, 0).is_empty());
    }
}
