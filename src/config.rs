use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::camera::{Projection, ViewMode};
use crate::cli::Cli;
use crate::movement::{FacingReference, MOVEMENT_SPEED};
use crate::sprite::BillboardPolicy;
use crate::texture::DEFAULT_SPRITE_PATH;

/// Session settings, resolved once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub projection: Projection,
    pub view_mode: ViewMode,
    pub billboard: BillboardPolicy,
    pub facing: FacingReference,
    pub speed: f32,
    pub asset: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            view_mode: ViewMode::default(),
            billboard: BillboardPolicy::default(),
            facing: FacingReference::default(),
            speed: MOVEMENT_SPEED,
            asset: PathBuf::from(DEFAULT_SPRITE_PATH),
        }
    }
}

impl Config {
    /// Defaults, overlaid by the optional config file, overlaid by CLI flags
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(projection) = cli.projection {
            self.projection = projection;
        }
        if let Some(view_mode) = cli.view_mode {
            self.view_mode = view_mode;
        }
        if let Some(billboard) = cli.billboard {
            self.billboard = billboard;
        }
        if let Some(facing) = cli.facing {
            self.facing = facing;
        }
        if let Some(speed) = cli.speed {
            self.speed = speed;
        }
        if let Some(asset) = &cli.asset {
            self.asset = asset.clone();
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.speed.is_finite() || self.speed < 0.0 {
            bail!("speed must be a non-negative number, got {}", self.speed);
        }
        Ok(())
    }
}
