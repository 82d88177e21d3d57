//! OpenGL backend implemented with glow
//!
//! Thin forwarding layer: every trait method is one (occasionally two) GL calls.
//! The context must be current on the calling thread for the whole lifetime of
//! the backend, which [`crate::window`] guarantees.

use crate::backend::traits::*;
use crate::backend::types::*;
use glow::HasContext;
use std::num::NonZeroU32;

// From GL_EXT_texture_filter_anisotropic / GL 4.6 core.
const TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;
const MAX_TEXTURE_MAX_ANISOTROPY: u32 = 0x84FF;

/// OpenGL backend over a current glow context
pub struct GlowBackend {
    gl: glow::Context,
    anisotropic_filtering: bool,
}

impl GlowBackend {
    /// Wrap a glow context that is current on this thread
    pub fn new(gl: glow::Context) -> Self {
        let version = gl.version();
        let extensions = gl.supported_extensions();
        let anisotropic_filtering = (version.major, version.minor) >= (4, 6)
            || extensions.contains("GL_EXT_texture_filter_anisotropic")
            || extensions.contains("GL_ARB_texture_filter_anisotropic");

        log::info!(
            "OpenGL {}.{} ({}), anisotropic filtering: {}",
            version.major,
            version.minor,
            version.vendor_info,
            anisotropic_filtering
        );

        Self {
            gl,
            anisotropic_filtering,
        }
    }

    /// Access the underlying glow context
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

fn creation_failed(kind: &'static str) -> impl FnOnce(String) -> BackendError {
    move |reason| BackendError::ResourceCreationFailed { kind, reason }
}

impl GraphicsBackend for GlowBackend {
    fn name(&self) -> &'static str {
        "OpenGL (glow)"
    }

    fn create_buffer(&self) -> BackendResult<BufferHandle> {
        let buffer = unsafe { self.gl.create_buffer() }.map_err(creation_failed("buffer"))?;
        Ok(BufferHandle(buffer.0))
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer.0)) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        unsafe {
            self.gl
                .bind_buffer(buffer_target(target), buffer.map(|b| glow::NativeBuffer(b.0)))
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, buffer_usage(usage))
        }
    }

    fn create_vertex_array(&self) -> BackendResult<VertexArrayHandle> {
        let vertex_array = unsafe { self.gl.create_vertex_array() }
            .map_err(creation_failed("vertex array"))?;
        Ok(VertexArrayHandle(vertex_array.0))
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        unsafe {
            self.gl
                .delete_vertex_array(glow::NativeVertexArray(vertex_array.0))
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>) {
        unsafe {
            self.gl
                .bind_vertex_array(vertex_array.map(|v| glow::NativeVertexArray(v.0)))
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer(&self, index: u32, size: u32, scalar: ScalarType, normalized: bool) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                index,
                size as i32,
                scalar_type(scalar),
                normalized,
                0,
                0,
            )
        }
    }

    fn draw_elements(&self, topology: PrimitiveTopology, count: u32, index_type: ScalarType) {
        unsafe {
            self.gl.draw_elements(
                primitive_topology(topology),
                count as i32,
                scalar_type(index_type),
                0,
            )
        }
    }

    fn max_vertex_attribs(&self) -> u32 {
        let max = unsafe { self.gl.get_parameter_i32(glow::MAX_VERTEX_ATTRIBS) };
        max.max(0) as u32
    }

    fn create_shader(&self, stage: ShaderStage) -> BackendResult<ShaderHandle> {
        let shader = unsafe { self.gl.create_shader(shader_stage(stage)) }
            .map_err(creation_failed("shader"))?;
        Ok(ShaderHandle(shader.0))
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        unsafe { self.gl.delete_shader(glow::NativeShader(shader.0)) }
    }

    fn shader_source(&self, shader: ShaderHandle, source: &str) {
        unsafe { self.gl.shader_source(glow::NativeShader(shader.0), source) }
    }

    fn compile_shader(&self, shader: ShaderHandle) {
        unsafe { self.gl.compile_shader(glow::NativeShader(shader.0)) }
    }

    fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
        unsafe { self.gl.get_shader_compile_status(glow::NativeShader(shader.0)) }
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        unsafe { self.gl.get_shader_info_log(glow::NativeShader(shader.0)) }
    }

    fn create_program(&self) -> BackendResult<ProgramHandle> {
        let program = unsafe { self.gl.create_program() }.map_err(creation_failed("program"))?;
        Ok(ProgramHandle(program.0))
    }

    fn delete_program(&self, program: ProgramHandle) {
        unsafe { self.gl.delete_program(glow::NativeProgram(program.0)) }
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        unsafe {
            self.gl
                .attach_shader(glow::NativeProgram(program.0), glow::NativeShader(shader.0))
        }
    }

    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        unsafe {
            self.gl
                .detach_shader(glow::NativeProgram(program.0), glow::NativeShader(shader.0))
        }
    }

    fn link_program(&self, program: ProgramHandle) {
        unsafe { self.gl.link_program(glow::NativeProgram(program.0)) }
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        unsafe { self.gl.get_program_link_status(glow::NativeProgram(program.0)) }
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        unsafe { self.gl.get_program_info_log(glow::NativeProgram(program.0)) }
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        unsafe { self.gl.use_program(program.map(|p| glow::NativeProgram(p.0))) }
    }

    fn current_program(&self) -> Option<ProgramHandle> {
        let current = unsafe { self.gl.get_parameter_i32(glow::CURRENT_PROGRAM) };
        NonZeroU32::new(current as u32).map(ProgramHandle)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(glow::NativeProgram(program.0), name)
                .map(|location| UniformLocation(location.0))
        }
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let location = glow::NativeUniformLocation(location.0);
        let location = Some(&location);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(location, *v),
                UniformValue::Uint(v) => self.gl.uniform_1_u32(location, *v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(location, *v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(location, v.x, v.y),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(location, v.x, v.y, v.z, v.w),
                UniformValue::Mat2(m) => {
                    self.gl
                        .uniform_matrix_2_f32_slice(location, false, &m.to_cols_array())
                }
                UniformValue::Mat3(m) => {
                    self.gl
                        .uniform_matrix_3_f32_slice(location, false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(location, false, &m.to_cols_array())
                }
            }
        }
    }

    fn create_texture(&self) -> BackendResult<TextureHandle> {
        let texture = unsafe { self.gl.create_texture() }.map_err(creation_failed("texture"))?;
        Ok(TextureHandle(texture.0))
    }

    fn delete_texture(&self, texture: TextureHandle) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture.0)) }
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>) {
        unsafe {
            self.gl
                .bind_texture(texture_target(target), texture.map(|t| glow::NativeTexture(t.0)))
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn tex_image(
        &self,
        target: TextureTarget,
        extent: ImageExtent,
        format: PixelFormat,
        pixels: &[u8],
    ) {
        let (internal_format, format) = pixel_format(format);
        unsafe {
            // Rows of 1 and 3 channel images are not 4-byte aligned
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            match target {
                TextureTarget::Texture2d => self.gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    internal_format as i32,
                    extent.width as i32,
                    extent.height as i32,
                    0,
                    format,
                    glow::UNSIGNED_BYTE,
                    Some(pixels),
                ),
                TextureTarget::Texture3d => self.gl.tex_image_3d(
                    glow::TEXTURE_3D,
                    0,
                    internal_format as i32,
                    extent.width as i32,
                    extent.height as i32,
                    extent.depth as i32,
                    0,
                    format,
                    glow::UNSIGNED_BYTE,
                    Some(pixels),
                ),
            }
        }
    }

    fn generate_mipmap(&self, target: TextureTarget) {
        unsafe { self.gl.generate_mipmap(texture_target(target)) }
    }

    fn create_sampler(&self) -> BackendResult<SamplerHandle> {
        let sampler = unsafe { self.gl.create_sampler() }.map_err(creation_failed("sampler"))?;
        Ok(SamplerHandle(sampler.0))
    }

    fn delete_sampler(&self, sampler: SamplerHandle) {
        unsafe { self.gl.delete_sampler(glow::NativeSampler(sampler.0)) }
    }

    fn bind_sampler(&self, unit: u32, sampler: Option<SamplerHandle>) {
        unsafe {
            self.gl
                .bind_sampler(unit, sampler.map(|s| glow::NativeSampler(s.0)))
        }
    }

    fn sampler_parameter(&self, sampler: SamplerHandle, parameter: SamplerParameter) {
        let sampler = glow::NativeSampler(sampler.0);
        unsafe {
            match parameter {
                SamplerParameter::MinFilter { filter, mipmap } => self.gl.sampler_parameter_i32(
                    sampler,
                    glow::TEXTURE_MIN_FILTER,
                    min_filter(filter, mipmap) as i32,
                ),
                SamplerParameter::MagFilter(filter) => self.gl.sampler_parameter_i32(
                    sampler,
                    glow::TEXTURE_MAG_FILTER,
                    min_filter(filter, None) as i32,
                ),
                SamplerParameter::WrapS(mode) => self.gl.sampler_parameter_i32(
                    sampler,
                    glow::TEXTURE_WRAP_S,
                    address_mode(mode) as i32,
                ),
                SamplerParameter::WrapT(mode) => self.gl.sampler_parameter_i32(
                    sampler,
                    glow::TEXTURE_WRAP_T,
                    address_mode(mode) as i32,
                ),
                SamplerParameter::WrapR(mode) => self.gl.sampler_parameter_i32(
                    sampler,
                    glow::TEXTURE_WRAP_R,
                    address_mode(mode) as i32,
                ),
                SamplerParameter::MinLod(lod) => {
                    self.gl
                        .sampler_parameter_f32(sampler, glow::TEXTURE_MIN_LOD, lod)
                }
                SamplerParameter::MaxLod(lod) => {
                    self.gl
                        .sampler_parameter_f32(sampler, glow::TEXTURE_MAX_LOD, lod)
                }
                SamplerParameter::MaxAnisotropy(value) => {
                    if self.anisotropic_filtering {
                        self.gl
                            .sampler_parameter_f32(sampler, TEXTURE_MAX_ANISOTROPY, value)
                    } else {
                        log::warn!("Anisotropic filtering is not supported, ignoring");
                    }
                }
            }
        }
    }

    fn max_anisotropy(&self) -> Option<f32> {
        if !self.anisotropic_filtering {
            return None;
        }
        Some(unsafe { self.gl.get_parameter_f32(MAX_TEXTURE_MAX_ANISOTROPY) })
    }

    fn clear_color(&self, color: [f32; 4]) {
        unsafe { self.gl.clear_color(color[0], color[1], color[2], color[3]) }
    }

    fn clear(&self, flags: ClearFlags) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(mask) }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, width as i32, height as i32) }
    }

    fn enable(&self, capability: Capability) {
        let capability = match capability {
            Capability::DepthTest => glow::DEPTH_TEST,
            Capability::CullFace => glow::CULL_FACE,
        };
        unsafe { self.gl.enable(capability) }
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::Uniform => glow::UNIFORM_BUFFER,
    }
}

fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

fn scalar_type(scalar: ScalarType) -> u32 {
    match scalar {
        ScalarType::Byte => glow::BYTE,
        ScalarType::UnsignedByte => glow::UNSIGNED_BYTE,
        ScalarType::Short => glow::SHORT,
        ScalarType::UnsignedShort => glow::UNSIGNED_SHORT,
        ScalarType::Int => glow::INT,
        ScalarType::UnsignedInt => glow::UNSIGNED_INT,
        ScalarType::Float => glow::FLOAT,
    }
}

fn primitive_topology(topology: PrimitiveTopology) -> u32 {
    match topology {
        PrimitiveTopology::PointList => glow::POINTS,
        PrimitiveTopology::LineList => glow::LINES,
        PrimitiveTopology::LineStrip => glow::LINE_STRIP,
        PrimitiveTopology::TriangleList => glow::TRIANGLES,
        PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveTopology::TriangleFan => glow::TRIANGLE_FAN,
    }
}

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2d => glow::TEXTURE_2D,
        TextureTarget::Texture3d => glow::TEXTURE_3D,
    }
}

/// (internal format, pixel format)
fn pixel_format(format: PixelFormat) -> (u32, u32) {
    match format {
        PixelFormat::R8 => (glow::R8, glow::RED),
        PixelFormat::Rg8 => (glow::RG8, glow::RG),
        PixelFormat::Rgb8 => (glow::RGB8, glow::RGB),
        PixelFormat::Rgba8 => (glow::RGBA8, glow::RGBA),
    }
}

fn min_filter(filter: FilterMode, mipmap: Option<FilterMode>) -> u32 {
    match (filter, mipmap) {
        (FilterMode::Nearest, None) => glow::NEAREST,
        (FilterMode::Linear, None) => glow::LINEAR,
        (FilterMode::Nearest, Some(FilterMode::Nearest)) => glow::NEAREST_MIPMAP_NEAREST,
        (FilterMode::Linear, Some(FilterMode::Nearest)) => glow::LINEAR_MIPMAP_NEAREST,
        (FilterMode::Nearest, Some(FilterMode::Linear)) => glow::NEAREST_MIPMAP_LINEAR,
        (FilterMode::Linear, Some(FilterMode::Linear)) => glow::LINEAR_MIPMAP_LINEAR,
    }
}

fn address_mode(mode: AddressMode) -> u32 {
    match mode {
        AddressMode::ClampToEdge => glow::CLAMP_TO_EDGE,
        AddressMode::Repeat => glow::REPEAT,
        AddressMode::MirrorRepeat => glow::MIRRORED_REPEAT,
    }
}
