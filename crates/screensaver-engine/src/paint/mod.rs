//! Paint primitives.

mod color;

pub use color::{Channel, Color};
