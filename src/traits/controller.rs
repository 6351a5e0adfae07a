/// Input button identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    KeyW,
    KeyA,
    KeyS,
    KeyD,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    Escape,
}

/// Controller - answers held-key queries
pub trait Controller {
    /// Check if button is currently down
    fn is_down(&self, button: Button) -> bool;
}
