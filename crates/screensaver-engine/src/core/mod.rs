//! Contracts between the window runtime and the application.
//!
//! The runtime owns the window, surface and input plumbing; the application
//! only sees [`App`] callbacks and a per-frame [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
