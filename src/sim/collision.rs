//! Collision detection between rotated rectangles
//!
//! Everything that moves is a rectangle rotated to its heading. Overlap is a
//! separating-axis test over the four edge normals of the two rectangles.

use glam::DVec2;

use super::species::{Species, group_rotation_offset};
use super::state::NpcGroup;
use crate::heading;
use crate::tuning::Tuning;

/// A rectangle rotated about its center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    pub center: DVec2,
    pub width: f64,
    pub height: f64,
    /// Radians, counter-clockwise
    pub rotation: f64,
}

impl OrientedRect {
    pub fn new(center: DVec2, width: f64, height: f64, rotation: f64) -> Self {
        Self {
            center,
            width,
            height,
            rotation,
        }
    }

    /// Local x and y axes in world space
    fn axes(&self) -> [DVec2; 2] {
        let (sin, cos) = self.rotation.sin_cos();
        [DVec2::new(cos, sin), DVec2::new(-sin, cos)]
    }

    fn corners(&self) -> [DVec2; 4] {
        let [ax, ay] = self.axes();
        let hx = ax * (self.width / 2.0);
        let hy = ay * (self.height / 2.0);
        [
            self.center + hx + hy,
            self.center + hx - hy,
            self.center - hx - hy,
            self.center - hx + hy,
        ]
    }

    /// Projection interval onto `axis`
    fn project(&self, axis: DVec2) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for corner in self.corners() {
            let d = corner.dot(axis);
            min = min.min(d);
            max = max.max(d);
        }
        (min, max)
    }

    /// Same rectangle scaled about its center
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
            ..self
        }
    }
}

/// Separating-axis overlap test; touching edges count as overlap
///
/// Symmetric: both rectangles contribute their axes and each axis test is
/// symmetric in its operands.
pub fn collides(a: &OrientedRect, b: &OrientedRect) -> bool {
    let [a0, a1] = a.axes();
    let [b0, b1] = b.axes();
    [a0, a1, b0, b1].into_iter().all(|axis| {
        let (min_a, max_a) = a.project(axis);
        let (min_b, max_b) = b.project(axis);
        max_a >= min_b && max_b >= min_a
    })
}

/// Flat-argument form of [`collides`]
#[allow(clippy::too_many_arguments)]
pub fn rects_collide(
    center_a: DVec2,
    width_a: f64,
    height_a: f64,
    rotation_a: f64,
    center_b: DVec2,
    width_b: f64,
    height_b: f64,
    rotation_b: f64,
) -> bool {
    collides(
        &OrientedRect::new(center_a, width_a, height_a, rotation_a),
        &OrientedRect::new(center_b, width_b, height_b, rotation_b),
    )
}

/// Full-size hit-box of an avatar
pub fn avatar_hitbox(position: DVec2, direction: DVec2, species: Species, tuning: &Tuning) -> OrientedRect {
    OrientedRect::new(
        position,
        tuning.avatar_width,
        tuning.avatar_height,
        heading(direction) + species.orientation().rotation_offset,
    )
}

/// Shrunk avatar hit-box used for capture checks
pub fn capture_hitbox(position: DVec2, direction: DVec2, species: Species, tuning: &Tuning) -> OrientedRect {
    avatar_hitbox(position, direction, species, tuning).scaled(tuning.capture_hitbox_scale)
}

/// Hit-box of a group at its current position
pub fn group_hitbox(group: &NpcGroup, tuning: &Tuning) -> OrientedRect {
    OrientedRect::new(
        group.position,
        tuning.group_width,
        tuning.group_height,
        heading(group.direction) + group_rotation_offset(&group.file_names),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GroupPhase;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_axis_aligned_overlap() {
        let a = OrientedRect::new(DVec2::ZERO, 2.0, 2.0, 0.0);
        let b = OrientedRect::new(DVec2::new(1.5, 0.0), 2.0, 2.0, 0.0);
        assert!(collides(&a, &b));
        let c = OrientedRect::new(DVec2::new(2.5, 0.0), 2.0, 2.0, 0.0);
        assert!(!collides(&a, &c));
    }

    #[test]
    fn test_rotation_matters() {
        // A long thin bar misses when aligned along y, hits when rotated onto x
        let target = OrientedRect::new(DVec2::new(2.0, 0.0), 0.5, 0.5, 0.0);
        let along_y = OrientedRect::new(DVec2::ZERO, 0.2, 4.0, 0.0);
        let along_x = OrientedRect::new(DVec2::ZERO, 4.0, 0.2, 0.0);
        assert!(!collides(&along_y, &target));
        assert!(collides(&along_x, &target));
    }

    #[test]
    fn test_diamond_corner_gap() {
        // Rotated square whose corner points at a box just out of reach
        let diamond = OrientedRect::new(DVec2::ZERO, 2.0, 2.0, FRAC_PI_4);
        let reach = 2f64.sqrt();
        let near = OrientedRect::new(DVec2::new(reach + 0.4, reach + 0.4), 1.0, 1.0, 0.0);
        assert!(!collides(&diamond, &near));
    }

    #[test]
    fn test_flat_form_matches() {
        assert!(rects_collide(DVec2::ZERO, 1.0, 1.0, 0.3, DVec2::new(0.5, 0.5), 1.0, 1.0, 1.1));
    }

    #[test]
    fn test_capture_hitbox_is_shrunk() {
        let tuning = Tuning::default();
        let full = avatar_hitbox(DVec2::ZERO, DVec2::X, Species::Other, &tuning);
        let shrunk = capture_hitbox(DVec2::ZERO, DVec2::X, Species::Other, &tuning);
        assert!((shrunk.width - full.width * 0.6).abs() < 1e-12);
        assert!((shrunk.height - full.height * 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_group_hitbox_uses_face_species() {
        let tuning = Tuning::default();
        let group = NpcGroup::new("g", vec!["dog_1.png".into()], GroupPhase::Idle);
        let hitbox = group_hitbox(&group, &tuning);
        assert!((hitbox.rotation - std::f64::consts::PI).abs() < 1e-12);
    }

    fn arb_rect() -> impl Strategy<Value = OrientedRect> {
        (-5.0f64..5.0, -5.0f64..5.0, 0.1f64..4.0, 0.1f64..4.0, -4.0f64..4.0)
            .prop_map(|(x, y, w, h, r)| OrientedRect::new(DVec2::new(x, y), w, h, r))
    }

    proptest! {
        #[test]
        fn prop_collides_is_symmetric(a in arb_rect(), b in arb_rect()) {
            prop_assert_eq!(collides(&a, &b), collides(&b, &a));
        }

        #[test]
        fn prop_rect_collides_with_itself(a in arb_rect()) {
            prop_assert!(collides(&a, &a));
        }
    }
}
