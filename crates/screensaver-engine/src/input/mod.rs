//! Input subsystem.
//!
//! Keyboard and focus only; the control panel is keyboard driven.
//! Public API does not expose winit types. The runtime translates platform
//! events into `InputEvent`s.

mod frame;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{InputEvent, Key, KeyState};
