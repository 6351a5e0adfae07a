use clap::ValueEnum;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::types::CameraUniform;

/// Degrees added to or removed from yaw per orbit key press
pub const CAMERA_ROTATION_STEP: f32 = 45.0;
/// Degrees added to or removed from pitch per tilt key press
pub const CAMERA_TILT_STEP: f32 = 15.0;

pub const MIN_PITCH: f32 = 0.0;
pub const MAX_PITCH: f32 = 60.0;

pub const SIDE_VIEW_PITCH: f32 = 0.0;
pub const ISOMETRIC_PITCH: f32 = 30.0;

pub const DEFAULT_YAW: f32 = 0.0;
pub const DEFAULT_PITCH: f32 = ISOMETRIC_PITCH;
pub const DEFAULT_DISTANCE: f32 = 500.0;

pub const FOV_Y_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 2000.0;
/// Half of the visible world height for the orthographic projection
pub const ORTHO_HALF_HEIGHT: f32 = 300.0;

/// How the scene is projected onto the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Whether the player may flip between side view and isometric view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    /// Pitch only changes through the tilt steps
    #[default]
    FixedIsometric,
    /// Space toggles between side view and isometric view
    Toggle,
}

/// Orbit camera following a target on the ground plane.
///
/// Yaw and pitch are stored in degrees. `position` is always derived from
/// `target`, `yaw`, `pitch` and `distance`; there is no way to set it directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl Camera {
    /// Create a camera looking at the origin. Pitch is clamped to the valid range.
    pub fn new(yaw: f32, pitch: f32, distance: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            yaw,
            pitch: pitch.clamp(MIN_PITCH, MAX_PITCH),
            distance,
        };
        camera.update_position();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Recompute the eye position on the sphere of radius `distance` around `target`.
    /// Yaw 0 looks from the negative-y side.
    pub fn update_position(&mut self) {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();

        self.position = Vec3::new(
            self.target.x - self.distance * yaw.sin() * pitch.cos(),
            self.target.y - self.distance * yaw.cos() * pitch.cos(),
            self.target.z + self.distance * pitch.sin(),
        );
    }

    /// Re-center the orbit on `target`
    pub fn follow(&mut self, target: Vec3) {
        self.target = target;
        self.update_position();
    }

    /// Orbit counter-clockwise by one step
    pub fn rotate_left(&mut self) {
        self.yaw += CAMERA_ROTATION_STEP;
        self.update_position();
    }

    /// Orbit clockwise by one step
    pub fn rotate_right(&mut self) {
        self.yaw -= CAMERA_ROTATION_STEP;
        self.update_position();
    }

    /// Raise the eye by one step, up to `MAX_PITCH`
    pub fn tilt_up(&mut self) {
        self.set_pitch(self.pitch + CAMERA_TILT_STEP);
    }

    /// Lower the eye by one step, down to `MIN_PITCH`
    pub fn tilt_down(&mut self) {
        self.set_pitch(self.pitch - CAMERA_TILT_STEP);
    }

    /// Flip between the side view and the isometric view
    pub fn toggle_view(&mut self) {
        if self.pitch > SIDE_VIEW_PITCH {
            self.set_pitch(SIDE_VIEW_PITCH);
        } else {
            self.set_pitch(ISOMETRIC_PITCH);
        }
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(MIN_PITCH, MAX_PITCH);
        self.update_position();
    }

    /// Right-handed look-at matrix with +Z up
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Z)
    }

    pub fn projection_matrix(&self, projection: Projection, aspect: f32) -> Mat4 {
        match projection {
            Projection::Perspective => {
                Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
            }
            Projection::Orthographic => {
                let half_width = ORTHO_HALF_HEIGHT * aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -ORTHO_HALF_HEIGHT,
                    ORTHO_HALF_HEIGHT,
                    NEAR_PLANE,
                    FAR_PLANE,
                )
            }
        }
    }

    pub fn to_uniform(&self, projection: Projection, aspect: f32) -> CameraUniform {
        CameraUniform::new(self.projection_matrix(projection, aspect) * self.view_matrix())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_YAW, DEFAULT_PITCH, DEFAULT_DISTANCE)
    }
}
