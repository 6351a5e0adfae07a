// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::camera::{Projection, ViewMode};
use crate::movement::FacingReference;
use crate::sprite::BillboardPolicy;

/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "open-range")]
#[command(about = "Camera-follow sprite demo", long_about = None)]
pub struct Cli {
    /// JSON file with default settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scene projection
    #[arg(long, value_enum)]
    pub projection: Option<Projection>,

    /// Allow Space to toggle between side and isometric view
    #[arg(long = "view-mode", value_enum)]
    pub view_mode: Option<ViewMode>,

    /// How the sprite is turned towards the camera
    #[arg(long, value_enum)]
    pub billboard: Option<BillboardPolicy>,

    /// Whether sprite facing follows world or screen movement
    #[arg(long, value_enum)]
    pub facing: Option<FacingReference>,

    /// Character speed in world units per second
    #[arg(long)]
    pub speed: Option<f32>,

    /// Sprite image path
    #[arg(long)]
    pub asset: Option<PathBuf>,
}
