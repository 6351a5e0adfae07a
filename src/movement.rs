use clap::ValueEnum;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::traits::controller::{Button, Controller};

/// World units per second
pub const MOVEMENT_SPEED: f32 = 200.0;

/// Held directional keys for one frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MovementState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementState {
    /// Sample held keys once (W/S/A/D)
    pub fn from_controller(controller: &dyn Controller) -> Self {
        Self {
            forward: controller.is_down(Button::KeyW),
            backward: controller.is_down(Button::KeyS),
            left: controller.is_down(Button::KeyA),
            right: controller.is_down(Button::KeyD),
        }
    }

    const fn to_direction(positive: bool, negative: bool) -> f32 {
        match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }

    /// Unit axes before scaling: x = right - left, y = forward - back.
    /// Diagonals are not normalized.
    pub const fn axes(&self) -> Vec2 {
        Vec2::new(
            Self::to_direction(self.right, self.left),
            Self::to_direction(self.forward, self.backward),
        )
    }
}

/// Horizontal direction the character sprite faces
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Which horizontal movement decides facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FacingReference {
    /// Sign of the world-space x displacement
    #[default]
    World,
    /// Sign of the screen-space (pre-rotation) x displacement
    Camera,
}

/// Displacement produced for a single frame
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Step {
    /// Camera-frame displacement before rotation
    pub raw: Vec2,
    /// World-space displacement
    pub world: Vec2,
}

/// Translate held keys into a displacement, rotated by `-yaw` so that
/// forward always points away from the camera.
pub fn translate(movement: MovementState, speed: f32, delta_time: f32, yaw_degrees: f32) -> Step {
    let raw = movement.axes() * speed * delta_time;

    let (sin, cos) = (-yaw_degrees.to_radians()).sin_cos();
    let world = Vec2::new(raw.x * cos - raw.y * sin, raw.x * sin + raw.y * cos);

    Step { raw, world }
}

/// The single controllable entity, on the ground plane
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Character {
    pub position: Vec2,
    pub facing: Facing,
}

impl Character {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            facing: Facing::default(),
        }
    }

    /// Move by `step` and update facing; a zero x component keeps the previous facing
    pub fn apply(&mut self, step: Step, reference: FacingReference) {
        let horizontal = match reference {
            FacingReference::World => step.world.x,
            FacingReference::Camera => step.raw.x,
        };

        if horizontal < 0.0 {
            self.facing = Facing::Left;
        } else if horizontal > 0.0 {
            self.facing = Facing::Right;
        }

        self.position += step.world;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn held(forward: bool, backward: bool, left: bool, right: bool) -> MovementState {
        MovementState {
            forward,
            backward,
            left,
            right,
        }
    }

    #[test]
    fn axes_follow_held_keys() {
        assert_eq!(held(true, false, false, false).axes(), Vec2::new(0.0, 1.0));
        assert_eq!(held(false, true, false, false).axes(), Vec2::new(0.0, -1.0));
        assert_eq!(held(false, false, true, false).axes(), Vec2::new(-1.0, 0.0));
        assert_eq!(held(false, false, false, true).axes(), Vec2::new(1.0, 0.0));
        assert_eq!(held(true, false, false, true).axes(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn opposing_keys_cancel() {
        assert_eq!(held(true, true, true, true).axes(), Vec2::ZERO);
    }

    #[test]
    fn quarter_turn_rotates_forward_onto_x() {
        // Yaw 90° puts the camera on the negative-x side, so forward is +x
        let step = translate(held(true, false, false, false), 100.0, 1.0, 90.0);

        assert!((step.world.x - 100.0).abs() < EPSILON, "{:?}", step.world);
        assert!(step.world.y.abs() < EPSILON, "{:?}", step.world);
        assert_eq!(step.raw, Vec2::new(0.0, 100.0));
    }

    #[test]
    fn zero_x_movement_keeps_facing() {
        let mut character = Character::default();
        character.apply(translate(held(false, false, true, false), 10.0, 0.1, 0.0), FacingReference::World);
        assert_eq!(character.facing, Facing::Left);

        character.apply(translate(held(true, false, false, false), 10.0, 0.1, 0.0), FacingReference::World);
        assert_eq!(character.facing, Facing::Left);
    }

    #[test]
    fn camera_reference_ignores_rotation() {
        // Yaw 180°: moving right on screen means moving towards -x in the world
        let step = translate(held(false, false, false, true), 10.0, 1.0, 180.0);
        assert!(step.world.x < 0.0);

        let mut world = Character::default();
        world.apply(step, FacingReference::World);
        assert_eq!(world.facing, Facing::Left);

        let mut camera = Character::default();
        camera.apply(step, FacingReference::Camera);
        assert_eq!(camera.facing, Facing::Right);
    }
}
