pub mod camera;
pub mod cli;
pub mod config;
pub mod core;
pub mod game;
pub mod ground;
pub mod movement;
pub mod renderer;
pub mod sprite;
pub mod texture;
pub mod traits;
pub mod types;

pub use camera::{Camera, Projection, ViewMode};
pub use config::Config;
pub use game::{Game, GameState, InputEvent, LoopState};
pub use movement::{Character, Facing, FacingReference, MovementState};
pub use sprite::BillboardPolicy;
