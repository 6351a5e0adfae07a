use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use open_range::config::Config;
use open_range::game::{Game, InputEvent, LoopState, CLEAR_COLOR};
use open_range::movement::Facing;
use open_range::renderer::RenderError;
use open_range::texture::{SpriteImage, TextureError};
use open_range::traits::controller::{Button, Controller};
use open_range::traits::renderer::{Blend, FrameSetup, Primitive, RenderBackend};
use open_range::types::Vertex;

/// Texture handle that tracks how many are alive
struct CountedTexture {
    live: Rc<Cell<usize>>,
}

impl Drop for CountedTexture {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Begin([f32; 4]),
    Draw {
        primitive: Primitive,
        vertices: usize,
        textured: bool,
        blend: Blend,
    },
    Present,
}

#[derive(Default)]
struct RecordingBackend {
    live_textures: Rc<Cell<usize>>,
    uploads: usize,
    blend: Blend,
    calls: Vec<Call>,
    fail_begin: bool,
    reject_uploads: bool,
}

impl RenderBackend for RecordingBackend {
    type Texture = CountedTexture;

    fn upload_texture(&mut self, image: &SpriteImage) -> Result<CountedTexture, RenderError> {
        if self.reject_uploads {
            return Err(RenderError::Validation(format!(
                "{}x{} exceeds the texture limit",
                image.width(),
                image.height()
            )));
        }
        self.uploads += 1;
        self.live_textures.set(self.live_textures.get() + 1);
        Ok(CountedTexture {
            live: self.live_textures.clone(),
        })
    }

    fn begin_frame(&mut self, setup: &FrameSetup) -> Result<(), RenderError> {
        if self.fail_begin {
            return Err(RenderError::NoFrame);
        }
        self.calls.push(Call::Begin(setup.clear_color));
        Ok(())
    }

    fn set_blend(&mut self, blend: Blend) {
        self.blend = blend;
    }

    fn draw(&mut self, primitive: Primitive, vertices: &[Vertex], texture: Option<&CountedTexture>) {
        self.calls.push(Call::Draw {
            primitive,
            vertices: vertices.len(),
            textured: texture.is_some(),
            blend: self.blend,
        });
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.calls.push(Call::Present);
        Ok(())
    }

    fn aspect_ratio(&self) -> f32 {
        800.0 / 600.0
    }
}

#[derive(Default)]
struct HeldKeys(Vec<Button>);

impl Controller for HeldKeys {
    fn is_down(&self, button: Button) -> bool {
        self.0.contains(&button)
    }
}

fn sprite_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("open-range-{}-{}.png", name, std::process::id()));
    image::RgbaImage::from_pixel(4, 8, image::Rgba([200, 100, 50, 255]))
        .save(&path)
        .expect("write sprite");
    path
}

fn start_game(name: &str) -> (Game<RecordingBackend>, Rc<Cell<usize>>, PathBuf) {
    let path = sprite_file(name);
    let backend = RecordingBackend::default();
    let live = backend.live_textures.clone();
    let game = Game::start(
        backend,
        Config {
            asset: path.clone(),
            ..Config::default()
        },
    )
    .expect("start game");
    (game, live, path)
}

#[cfg(test)]
mod game_loop_tests {
    use super::*;

    const EPSILON: f32 = 1e-2;

    #[test]
    fn test_missing_asset_leaves_no_textures() {
        let backend = RecordingBackend::default();
        let live = backend.live_textures.clone();

        let result = Game::start(
            backend,
            Config {
                asset: PathBuf::from("assets/definitely-missing.png"),
                ..Config::default()
            },
        );

        assert!(matches!(result, Err(TextureError::Io { .. })));
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_rejected_upload_fails_startup_without_textures() {
        let path = sprite_file("rejected");
        let backend = RecordingBackend {
            reject_uploads: true,
            ..RecordingBackend::default()
        };
        let live = backend.live_textures.clone();

        let result = Game::start(
            backend,
            Config {
                asset: path.clone(),
                ..Config::default()
            },
        );
        std::fs::remove_file(&path).ok();

        match result {
            Err(TextureError::Upload(RenderError::Validation(message))) => {
                assert!(message.contains("4x8"), "{}", message);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("startup should fail"),
        }
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_texture_released_when_game_drops() {
        let (game, live, path) = start_game("release");
        assert_eq!(game.backend().uploads, 1);
        assert_eq!(live.get(), 1);

        drop(game);
        std::fs::remove_file(&path).ok();
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_holding_forward_for_one_second() {
        let (mut game, _live, path) = start_game("forward");
        let keys = HeldKeys(vec![Button::KeyW]);

        let state = game.frame(1.0, &keys).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(state, LoopState::Running);

        let character = game.state().character;
        assert!((character.position - Vec2::new(0.0, 200.0)).length() < EPSILON);

        let camera = &game.state().camera;
        assert_eq!(camera.target(), Vec3::new(character.position.x, character.position.y, 0.0));
        assert_eq!((camera.yaw(), camera.pitch(), camera.distance()), (0.0, 30.0, 500.0));

        let pitch = 30f32.to_radians();
        let expected = Vec3::new(0.0, 200.0 - 500.0 * pitch.cos(), 500.0 * pitch.sin());
        assert!((camera.position() - expected).length() < EPSILON);
    }

    #[test]
    fn test_frame_draws_ground_then_blended_sprite() {
        let (mut game, _live, path) = start_game("draw-order");
        game.frame(0.016, &HeldKeys::default()).unwrap();
        std::fs::remove_file(&path).ok();

        let calls = &game.backend().calls;
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], Call::Begin(CLEAR_COLOR));
        assert_eq!(
            calls[1],
            Call::Draw {
                primitive: Primitive::Triangles,
                vertices: 6,
                textured: false,
                blend: Blend::Replace,
            }
        );
        assert!(matches!(
            calls[2],
            Call::Draw {
                primitive: Primitive::Lines,
                textured: false,
                blend: Blend::Replace,
                ..
            }
        ));
        assert_eq!(
            calls[3],
            Call::Draw {
                primitive: Primitive::Triangles,
                vertices: 6,
                textured: true,
                blend: Blend::AlphaOver,
            }
        );
        assert_eq!(calls[4], Call::Present);

        // Blending does not leak into the next frame
        assert_eq!(game.backend().blend, Blend::Replace);
    }

    #[test]
    fn test_quit_still_applies_remaining_events() {
        let (mut game, _live, path) = start_game("quit");
        game.push_event(InputEvent::Quit);
        game.push_event(InputEvent::KeyDown(Button::ArrowLeft));
        game.push_event(InputEvent::KeyDown(Button::ArrowUp));

        let state = game.frame(0.016, &HeldKeys::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(state, LoopState::Terminating);
        assert_eq!(game.loop_state(), LoopState::Terminating);
        assert_eq!(game.state().camera.yaw(), 45.0);
        assert_eq!(game.state().camera.pitch(), 45.0);
    }

    #[test]
    fn test_events_are_applied_before_movement() {
        let (mut game, _live, path) = start_game("event-order");
        game.push_event(InputEvent::KeyDown(Button::ArrowLeft));
        game.push_event(InputEvent::KeyDown(Button::ArrowLeft));

        // With yaw at 90 forward points along +x
        game.frame(0.5, &HeldKeys(vec![Button::KeyW])).unwrap();
        std::fs::remove_file(&path).ok();

        let position = game.state().character.position;
        assert!((position - Vec2::new(100.0, 0.0)).length() < EPSILON, "{:?}", position);
        assert_eq!(game.state().character.facing, Facing::Right);
    }

    #[test]
    fn test_negative_delta_is_treated_as_zero() {
        let (mut game, _live, path) = start_game("negative");
        game.frame(-1.0, &HeldKeys(vec![Button::KeyD])).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(game.state().character.position, Vec2::ZERO);
    }

    #[test]
    fn test_render_failure_keeps_simulation_state() {
        let (mut game, _live, path) = start_game("render-failure");
        game.backend_mut().fail_begin = true;

        let result = game.frame(0.5, &HeldKeys(vec![Button::KeyD]));
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(RenderError::NoFrame)));
        assert!((game.state().character.position - Vec2::new(100.0, 0.0)).length() < EPSILON);
        assert!(game.backend().calls.is_empty());
    }
}
