//! Glitter - thin RAII wrappers over OpenGL objects
//!
//! Every wrapper owns one native object, creates it on construction and
//! deletes it on drop:
//! - [`Buffer`]: vertex or index data with its element layout
//! - [`Vao`]: vertex array with a fixed number of vertex buffer slots and an index buffer
//! - [`Shader`] and [`Program`]: compiled stages and a linked program with uniforms set by name
//! - [`Texture`] and [`Sampler`]: image data and the sampling state of a texture unit
//!
//! All native calls go through the [`GraphicsBackend`] trait. [`GlowBackend`]
//! drives a real OpenGL context, [`DummyBackend`] records calls for headless tests.
//!
//! [`Buffer`]: resources::Buffer
//! [`Vao`]: resources::Vao
//! [`Shader`]: resources::Shader
//! [`Program`]: resources::Program
//! [`Texture`]: resources::Texture
//! [`Sampler`]: resources::Sampler
//! [`GraphicsBackend`]: backend::GraphicsBackend
//! [`GlowBackend`]: backend::GlowBackend
//! [`DummyBackend`]: backend::DummyBackend

use std::path::PathBuf;

pub mod app;
pub mod backend;
pub mod resources;
pub mod window;

pub use app::{Application, CubeApplication, Usage};
pub use backend::{BackendError, BackendResult, GraphicsBackend};
pub use window::Window;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the demo window and application
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Directory holding the GLSL sources
    pub shader_dir: PathBuf,
    /// Texture image to put on the cube, a checkerboard when unset
    pub texture: Option<PathBuf>,
    /// Color the framebuffer is cleared to
    pub clear_color: [f32; 4],
    /// Exit after rendering this many frames
    pub max_frames: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Glitter".to_string(),
            width: 1024,
            height: 768,
            vsync: true,
            shader_dir: PathBuf::from("shaders"),
            texture: None,
            clear_color: [1.0, 1.0, 1.0, 1.0],
            max_frames: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (1024, 768));
        assert!(config.vsync);
        assert_eq!(config.shader_dir, PathBuf::from("shaders"));
        assert!(config.texture.is_none());
        assert_eq!(config.clear_color, [1.0; 4]);
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
