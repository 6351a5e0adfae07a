//! Billboard orientation and quad geometry for the character sprite.

use clap::ValueEnum;
use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::movement::Facing;
use crate::types::Vertex;

/// Edge length of the square sprite quad in world units
pub const SPRITE_SIZE: f32 = 64.0;
/// Height of the quad anchor above the ground plane
pub const SPRITE_LIFT: f32 = 48.0;

/// Strategy used to keep the sprite turned towards the camera.
/// One policy is used for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BillboardPolicy {
    /// Undo the camera's yaw and pitch
    #[default]
    CounterRotate,
    /// Turn towards the camera's position on the ground plane, then undo pitch
    LookAt,
}

impl BillboardPolicy {
    /// Rotation applied to the quad before it is translated to `position`
    pub fn orientation(self, camera: &Camera, position: Vec2) -> Quat {
        let yaw = match self {
            BillboardPolicy::CounterRotate => -camera.yaw().to_radians(),
            BillboardPolicy::LookAt => {
                let eye = camera.position();
                let heading = (position.y - eye.y).atan2(position.x - eye.x);
                // The unrotated quad faces along +Y
                heading - std::f32::consts::FRAC_PI_2
            }
        };

        Quat::from_rotation_z(yaw) * Quat::from_rotation_x(-camera.pitch().to_radians())
    }

    pub fn model_matrix(self, camera: &Camera, position: Vec2) -> Mat4 {
        Mat4::from_rotation_translation(
            self.orientation(camera, position),
            Vec3::new(position.x, position.y, SPRITE_LIFT),
        )
    }
}

/// Corners of the quad in local space with their texture coordinates,
/// counter-clockwise from bottom-left. The quad hangs below its anchor
/// in the XZ plane.
fn corners(facing: Facing) -> [([f32; 3], [f32; 2]); 4] {
    let half = SPRITE_SIZE / 2.0;
    let (left_u, right_u) = match facing {
        Facing::Right => (0.0, 1.0),
        Facing::Left => (1.0, 0.0),
    };

    [
        ([-half, 0.0, -SPRITE_SIZE], [left_u, 1.0]),
        ([half, 0.0, -SPRITE_SIZE], [right_u, 1.0]),
        ([half, 0.0, 0.0], [right_u, 0.0]),
        ([-half, 0.0, 0.0], [left_u, 0.0]),
    ]
}

/// World-space triangles for the sprite quad
pub fn sprite_vertices(model: Mat4, facing: Facing) -> [Vertex; 6] {
    let quad = corners(facing).map(|(position, uv)| {
        let world = model.transform_point3(Vec3::from_array(position));
        Vertex::textured(world.to_array(), uv)
    });

    [quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]
}
