//! Time subsystem.
//!
//! Frame timing without coupling to the runtime:
//! - one `FrameClock` per render loop
//! - call `tick()` once per presented frame to obtain `FrameTime`
//!
//! The motion integrator consumes `FrameTime::dt` as its elapsed frame seconds.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
