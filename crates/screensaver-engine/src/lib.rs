//! Screensaver engine crate.
//!
//! Owns the platform + GPU runtime, the textured box drawable and the bounce
//! integrator. The interaction layer lives in `screensaver-ui`.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod paint;
pub mod render;
pub mod motion;

/// Math types used across the public API.
pub use glam;
