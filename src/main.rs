use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use open_range::cli::Cli;
use open_range::config::Config;
use open_range::core::{Clock, FpsCounter, WinitController};
use open_range::game::{Game, LoopState};
use open_range::renderer::WgpuRenderer;

// === Constants ===

const WINDOW_TITLE: &str = "openRange";
const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;
const FPS_UPDATE_INTERVAL: f32 = 1.0;

// === Application ===

struct App {
    // Dropped before the window it renders into
    game: Option<Game<WgpuRenderer>>,
    window: Option<Arc<Window>>,
    config: Config,
    controller: WinitController,
    clock: Clock,
    fps: FpsCounter,
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            game: None,
            window: None,
            config,
            controller: WinitController::new(),
            clock: Clock::new(),
            fps: FpsCounter::new(FPS_UPDATE_INTERVAL),
            startup_error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(WINDOW_TITLE)
                    .with_inner_size(winit::dpi::LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
                    .with_resizable(false),
            )
            .context("failed to create window")?;
        let window = Arc::new(window);

        let renderer = pollster::block_on(WgpuRenderer::new(window.clone()))
            .context("failed to initialize renderer")?;

        // On failure the renderer is dropped here, before the window
        let game = Game::start(renderer, self.config.clone())
            .with_context(|| format!("failed to load sprite {}", self.config.asset.display()))?;

        self.game = Some(game);
        self.window = Some(window);
        self.clock.reset();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(game) = self.game.as_mut() else {
            return;
        };

        let delta = self.clock.tick();
        match game.frame(delta, &self.controller) {
            Ok(LoopState::Running) => {}
            Ok(LoopState::Terminating) => {
                log::info!("Quit requested");
                event_loop.exit();
            }
            Err(e) => log::warn!("Frame skipped: {}", e),
        }

        if let Some(fps) = self.fps.tick(delta) {
            log::debug!("FPS: {:.1}", fps);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.game.is_some() || self.startup_error.is_some() {
            return;
        }

        if let Err(e) = self.start(event_loop) {
            log::error!("{:#}", e);
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(input) = self.controller.process_event(&event) {
            if let Some(game) = self.game.as_mut() {
                game.push_event(input);
            }
        }

        match event {
            WindowEvent::Resized(size) => {
                if let Some(game) = self.game.as_mut() {
                    game.backend_mut().resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Texture, then device and surface, then the window
        self.game = None;
        self.window = None;
        log::info!("Shut down");
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::resolve(&cli)?;
    log::debug!("{:?}", config);

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);

    log::info!("openRange - Controls: WASD move, arrows orbit/tilt, Escape to quit");
    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
