//! Core backend abstraction traits
//!
//! Every native graphics call made by the resource wrappers goes through
//! [`GraphicsBackend`]. Both the OpenGL backend and the headless dummy backend
//! implement it.

use crate::backend::types::*;
use std::num::NonZeroU32;
use std::path::PathBuf;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create {kind}: {reason}")]
    ResourceCreationFailed { kind: &'static str, reason: String },
    #[error("Failed to compile {stage} shader '{label}':\n{log}")]
    ShaderCompilationFailed {
        stage: ShaderStage,
        label: String,
        log: String,
    },
    #[error("Failed to link program:\n{0}")]
    ProgramLinkFailed(String),
    #[error("Program must be bound before setting uniform '{0}'")]
    ProgramNotBound(String),
    #[error("Requested {requested} vertex attributes but the device supports {max}")]
    TooManyAttributes { requested: u32, max: u32 },
    #[error("Attribute slot {index} is out of range (vertex array has {count} slots)")]
    InvalidAttributeSlot { index: u32, count: u32 },
    #[error("Empty buffer: {0}")]
    EmptyBuffer(String),
    #[error("Unsupported image channel count: {0}")]
    UnsupportedChannelCount(u32),
    #[error("Image data has {actual} bytes, expected {expected}")]
    ImageSizeMismatch { expected: usize, actual: usize },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub(crate) NonZeroU32);

            impl $name {
                /// Raw non-zero object name
                pub fn raw(&self) -> u32 {
                    self.0.get()
                }
            }
        )*
    };
}

define_handle! {
    /// Handle to a GPU buffer
    BufferHandle,
    /// Handle to a vertex array object
    VertexArrayHandle,
    /// Handle to a shader object
    ShaderHandle,
    /// Handle to a linked program
    ProgramHandle,
    /// Handle to a GPU texture
    TextureHandle,
    /// Handle to a sampler object
    SamplerHandle,
}

/// Location of an active uniform inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u32);

/// Main graphics backend trait
///
/// Methods mirror single native calls. None of them implicitly restores bind
/// state; that is the responsibility of the resource wrappers.
pub trait GraphicsBackend {
    /// Get the backend name
    fn name(&self) -> &'static str;

    // Buffers

    fn create_buffer(&self) -> BackendResult<BufferHandle>;
    fn delete_buffer(&self, buffer: BufferHandle);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>);
    /// Replace the data store of the buffer bound to `target`
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    // Vertex arrays

    fn create_vertex_array(&self) -> BackendResult<VertexArrayHandle>;
    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle);
    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>);
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Describe attribute `index` as tightly packed data from the bound array buffer
    fn vertex_attrib_pointer(&self, index: u32, size: u32, scalar: ScalarType, normalized: bool);
    fn draw_elements(&self, topology: PrimitiveTopology, count: u32, index_type: ScalarType);
    fn max_vertex_attribs(&self) -> u32;

    // Shaders and programs

    fn create_shader(&self, stage: ShaderStage) -> BackendResult<ShaderHandle>;
    fn delete_shader(&self, shader: ShaderHandle);
    fn shader_source(&self, shader: ShaderHandle, source: &str);
    fn compile_shader(&self, shader: ShaderHandle);
    fn shader_compile_status(&self, shader: ShaderHandle) -> bool;
    fn shader_info_log(&self, shader: ShaderHandle) -> String;

    fn create_program(&self) -> BackendResult<ProgramHandle>;
    fn delete_program(&self, program: ProgramHandle);
    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    fn link_program(&self, program: ProgramHandle);
    fn program_link_status(&self, program: ProgramHandle) -> bool;
    fn program_info_log(&self, program: ProgramHandle) -> String;
    fn use_program(&self, program: Option<ProgramHandle>);
    fn current_program(&self) -> Option<ProgramHandle>;
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    /// Assign a uniform of the program currently in use
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);

    // Textures

    fn create_texture(&self) -> BackendResult<TextureHandle>;
    fn delete_texture(&self, texture: TextureHandle);
    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>);
    /// Select the texture unit that subsequent texture binds apply to
    fn active_texture(&self, unit: u32);
    /// Upload level 0 of the texture bound to `target`
    fn tex_image(
        &self,
        target: TextureTarget,
        extent: ImageExtent,
        format: PixelFormat,
        pixels: &[u8],
    );
    fn generate_mipmap(&self, target: TextureTarget);

    // Samplers

    fn create_sampler(&self) -> BackendResult<SamplerHandle>;
    fn delete_sampler(&self, sampler: SamplerHandle);
    fn bind_sampler(&self, unit: u32, sampler: Option<SamplerHandle>);
    fn sampler_parameter(&self, sampler: SamplerHandle, parameter: SamplerParameter);
    /// Largest supported anisotropy, or `None` without anisotropic filtering
    fn max_anisotropy(&self) -> Option<f32>;

    // Framebuffer state

    fn clear_color(&self, color: [f32; 4]);
    fn clear(&self, flags: ClearFlags);
    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
    fn enable(&self, capability: Capability);
}
