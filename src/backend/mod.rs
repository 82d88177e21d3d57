//! Backend abstraction layer
//!
//! Provides the trait and types that both the OpenGL and the dummy backend implement.

pub mod dummy;
pub mod glow_backend;
pub mod traits;
pub mod types;

pub use dummy::{Call, DummyBackend, ObjectKind};
pub use glow_backend::GlowBackend;
pub use traits::*;
pub use types::*;
