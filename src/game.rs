//! Simulation state and the per-frame loop body.
//!
//! The platform layer (winit in `main.rs`) owns the window and the clock and
//! calls [`Game::frame`] once per redraw. Everything in here is independent
//! of the windowing system so it can run against any [`RenderBackend`].

use std::collections::VecDeque;

use glam::Vec2;

use crate::camera::{Camera, ViewMode};
use crate::config::Config;
use crate::ground::GroundMesh;
use crate::movement::{translate, Character, MovementState};
use crate::renderer::RenderError;
use crate::sprite::sprite_vertices;
use crate::texture::{load_sprite_texture, TextureError};
use crate::traits::controller::{Button, Controller};
use crate::traits::renderer::{Blend, FrameSetup, Primitive, RenderBackend};
use crate::types::Vertex;

/// Sky blue
pub const CLEAR_COLOR: [f32; 4] = [0.529, 0.808, 0.922, 1.0];

/// Discrete input delivered through the event queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Close request
    Quit,
    /// Key went down (repeats excluded)
    KeyDown(Button),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Running,
    Terminating,
}

/// Everything the simulation mutates, owned by the loop
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub camera: Camera,
    pub character: Character,
    pub config: Config,
}

impl GameState {
    pub fn new(config: Config) -> Self {
        let character = Character::new(Vec2::ZERO);
        let mut camera = Camera::default();
        camera.follow(character.position.extend(0.0));

        Self {
            camera,
            character,
            config,
        }
    }

    /// Apply one discrete event. Unmapped keys are ignored.
    pub fn handle_event(&mut self, event: InputEvent) -> LoopState {
        match event {
            InputEvent::Quit | InputEvent::KeyDown(Button::Escape) => return LoopState::Terminating,
            InputEvent::KeyDown(Button::ArrowLeft) => self.camera.rotate_left(),
            InputEvent::KeyDown(Button::ArrowRight) => self.camera.rotate_right(),
            InputEvent::KeyDown(Button::ArrowUp) => self.camera.tilt_up(),
            InputEvent::KeyDown(Button::ArrowDown) => self.camera.tilt_down(),
            InputEvent::KeyDown(Button::Space) if self.config.view_mode == ViewMode::Toggle => {
                self.camera.toggle_view();
                log::debug!("View toggled, pitch {}°", self.camera.pitch());
            }
            InputEvent::KeyDown(_) => {}
        }

        LoopState::Running
    }

    /// Move the character, then re-center the camera on it
    pub fn update(&mut self, movement: MovementState, delta_time: f32) {
        let step = translate(movement, self.config.speed, delta_time, self.camera.yaw());
        self.character.apply(step, self.config.facing);
        self.camera.follow(self.character.position.extend(0.0));
    }

    pub fn frame_setup(&self, aspect: f32) -> FrameSetup {
        FrameSetup {
            clear_color: CLEAR_COLOR,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(self.config.projection, aspect),
        }
    }

    pub fn sprite_vertices(&self) -> [Vertex; 6] {
        let model = self
            .config
            .billboard
            .model_matrix(&self.camera, self.character.position);
        sprite_vertices(model, self.character.facing)
    }
}

/// A running session: simulation state plus the resources it draws with.
///
/// The sprite texture is declared before the backend so it is released
/// before the device that owns it.
pub struct Game<B: RenderBackend> {
    sprite_texture: B::Texture,
    backend: B,
    state: GameState,
    ground: GroundMesh,
    events: VecDeque<InputEvent>,
    loop_state: LoopState,
}

impl<B: RenderBackend> Game<B> {
    /// Load the sprite and build the initial state. Any failure here is fatal.
    pub fn start(mut backend: B, config: Config) -> Result<Self, TextureError> {
        let sprite_texture = load_sprite_texture(&mut backend, &config.asset)?;

        Ok(Self {
            sprite_texture,
            backend,
            state: GameState::new(config),
            ground: GroundMesh::new(),
            events: VecDeque::new(),
            loop_state: LoopState::Running,
        })
    }

    /// Queue an event for the next frame
    pub fn push_event(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    /// Run one loop iteration: events, movement, follow, draw, present.
    ///
    /// A quit event does not stop the remaining queued events from being
    /// applied; the returned state tells the caller whether to shut down.
    pub fn frame(&mut self, delta_time: f32, controller: &dyn Controller) -> Result<LoopState, RenderError> {
        let delta_time = delta_time.max(0.0);

        while let Some(event) = self.events.pop_front() {
            if self.state.handle_event(event) == LoopState::Terminating {
                self.loop_state = LoopState::Terminating;
            }
        }

        self.state
            .update(MovementState::from_controller(controller), delta_time);

        self.render()?;
        Ok(self.loop_state)
    }

    fn render(&mut self) -> Result<(), RenderError> {
        let setup = self.state.frame_setup(self.backend.aspect_ratio());
        self.backend.begin_frame(&setup)?;

        self.backend
            .draw(Primitive::Triangles, &self.ground.plane, None);
        self.backend.draw(Primitive::Lines, &self.ground.lines, None);

        let sprite = self.state.sprite_vertices();
        self.backend.set_blend(Blend::AlphaOver);
        self.backend
            .draw(Primitive::Triangles, &sprite, Some(&self.sprite_texture));
        self.backend.set_blend(Blend::Replace);

        self.backend.present()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
