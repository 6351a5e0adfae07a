use glam::Mat4;

use crate::renderer::RenderError;
use crate::texture::SpriteImage;
use crate::types::Vertex;

/// How a draw call is composited onto the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    /// Overwrite the destination
    #[default]
    Replace,
    /// Straight alpha-over: `src * a + dst * (1 - a)`
    AlphaOver,
}

/// Vertex interpretation for a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Lines,
}

/// Per-frame view configuration, reset at the start of every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSetup {
    pub clear_color: [f32; 4],
    pub view: Mat4,
    pub projection: Mat4,
}

/// Rendering backend consumed by the game loop.
///
/// A frame is `begin_frame`, any number of `draw` calls, then `present`.
/// Blend state persists across calls until changed, like a fixed-function
/// pipeline toggle.
/// Clear and vertex colours are display (sRGB) values; the backend converts
/// them for its render target.
pub trait RenderBackend {
    /// GPU-resident texture, released when dropped
    type Texture;

    /// Upload a decoded image
    fn upload_texture(&mut self, image: &SpriteImage) -> Result<Self::Texture, RenderError>;

    /// Clear the frame and load the view/projection transforms
    fn begin_frame(&mut self, setup: &FrameSetup) -> Result<(), RenderError>;

    fn set_blend(&mut self, blend: Blend);

    /// Submit world-space vertices, optionally textured
    fn draw(&mut self, primitive: Primitive, vertices: &[Vertex], texture: Option<&Self::Texture>);

    /// Finish the frame and hand it to the display
    fn present(&mut self) -> Result<(), RenderError>;

    /// Width over height of the drawing surface
    fn aspect_ratio(&self) -> f32;
}
