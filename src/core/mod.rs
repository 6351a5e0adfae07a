pub mod clock;
pub mod input_adapter;

pub use clock::{Clock, FpsCounter};
pub use input_adapter::WinitController;
