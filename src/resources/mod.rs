//! GPU resource wrappers
//!
//! Each wrapper owns exactly one native object. The handle is created on
//! construction and deleted on drop.

mod buffer;
mod sampler;
mod shader;
mod texture;
mod vao;

pub use buffer::*;
pub use sampler::*;
pub use shader::*;
pub use texture::*;
pub use vao::*;
