//! GPU rendering subsystem.
//!
//! Everything needed to put the box on screen: its geometry buffers, the
//! shader program, the optional texture and the drawable that ties them
//! together.
//!
//! Convention:
//! - Geometry is authored directly in normalized device coordinates (+Y up).
//! - The vertex shader applies the box's model matrix, nothing else.

mod ctx;
mod uniforms;

pub mod buffers;
pub mod drawable;
pub mod image;
pub mod shader;
pub mod texture;

pub use ctx::{RenderCtx, RenderTarget};
pub use uniforms::{UniformBlock, UniformField, UniformKind, UniformLayout};
pub use wgpu::TextureFormat;
