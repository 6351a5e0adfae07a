use std::collections::HashSet;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::game::InputEvent;
use crate::traits::controller::{Button, Controller};

/// Adapter that bridges Winit events to the Controller trait
/// and to the game's discrete event queue
#[derive(Debug, Clone, Default)]
pub struct WinitController {
    /// Currently pressed buttons
    pressed_keys: HashSet<Button>,
}

impl WinitController {
    /// Create a new WinitController with no pressed keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Update held-key state from a Winit WindowEvent.
    /// Returns the discrete event to queue, if any.
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CloseRequested => Some(InputEvent::Quit),
            WindowEvent::KeyboardInput { event, .. } => self.process_key(event),
            // Releases are not delivered while unfocused
            WindowEvent::Focused(false) => {
                self.release_all();
                None
            }
            _ => None,
        }
    }

    fn process_key(&mut self, event: &KeyEvent) -> Option<InputEvent> {
        let PhysicalKey::Code(keycode) = event.physical_key else {
            return None;
        };
        let button = Self::keycode_to_button(keycode)?;

        match event.state {
            ElementState::Pressed => {
                self.press(button);
                (!event.repeat).then_some(InputEvent::KeyDown(button))
            }
            ElementState::Released => {
                self.release(button);
                None
            }
        }
    }

    pub fn press(&mut self, button: Button) {
        self.pressed_keys.insert(button);
    }

    pub fn release(&mut self, button: Button) {
        self.pressed_keys.remove(&button);
    }

    pub fn release_all(&mut self) {
        self.pressed_keys.clear();
    }

    /// Map Winit KeyCode to Button
    fn keycode_to_button(keycode: KeyCode) -> Option<Button> {
        match keycode {
            KeyCode::KeyW => Some(Button::KeyW),
            KeyCode::KeyA => Some(Button::KeyA),
            KeyCode::KeyS => Some(Button::KeyS),
            KeyCode::KeyD => Some(Button::KeyD),
            KeyCode::ArrowUp => Some(Button::ArrowUp),
            KeyCode::ArrowDown => Some(Button::ArrowDown),
            KeyCode::ArrowLeft => Some(Button::ArrowLeft),
            KeyCode::ArrowRight => Some(Button::ArrowRight),
            KeyCode::Space => Some(Button::Space),
            KeyCode::Escape => Some(Button::Escape),
            _ => None,
        }
    }
}

impl Controller for WinitController {
    fn is_down(&self, button: Button) -> bool {
        self.pressed_keys.contains(&button)
    }
}
