//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It hands out object names the way a GL
//! driver does, keeps the bind state a GL context would keep, and records the
//! commands that produce visible output so tests can inspect them.

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;

use crate::backend::traits::*;
use crate::backend::types::*;

const MAX_VERTEX_ATTRIBS: u32 = 16;
const MAX_ANISOTROPY: f32 = 16.0;

/// Kind of a live object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    VertexArray,
    Shader,
    Program,
    Texture,
    Sampler,
}

/// A recorded state-changing command
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BufferData {
        buffer: Option<BufferHandle>,
        target: BufferTarget,
        len: usize,
    },
    VertexAttribPointer {
        vertex_array: Option<VertexArrayHandle>,
        buffer: Option<BufferHandle>,
        index: u32,
        size: u32,
        scalar: ScalarType,
    },
    DrawElements {
        vertex_array: Option<VertexArrayHandle>,
        element_buffer: Option<BufferHandle>,
        program: Option<ProgramHandle>,
        topology: PrimitiveTopology,
        count: u32,
        index_type: ScalarType,
    },
    SetUniform {
        program: Option<ProgramHandle>,
        name: String,
        value: UniformValue,
    },
    TexImage {
        texture: Option<TextureHandle>,
        target: TextureTarget,
        extent: ImageExtent,
        format: PixelFormat,
        len: usize,
    },
    GenerateMipmap {
        texture: Option<TextureHandle>,
    },
    SamplerParameter {
        sampler: SamplerHandle,
        parameter: SamplerParameter,
    },
    Clear {
        color: [f32; 4],
        flags: ClearFlags,
    },
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    info_log: String,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<ShaderHandle>,
    linked: bool,
    info_log: String,
    uniforms: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    next_name: u32,
    live: HashMap<u32, ObjectKind>,
    deleted: HashSet<u32>,
    bound_buffers: HashMap<BufferTarget, BufferHandle>,
    buffer_contents: HashMap<BufferHandle, Vec<u8>>,
    bound_vertex_array: Option<VertexArrayHandle>,
    element_buffers: HashMap<VertexArrayHandle, BufferHandle>,
    enabled_attributes: HashMap<VertexArrayHandle, HashSet<u32>>,
    shaders: HashMap<ShaderHandle, ShaderRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    current_program: Option<ProgramHandle>,
    active_texture_unit: u32,
    bound_textures: HashMap<(u32, TextureTarget), TextureHandle>,
    bound_samplers: HashMap<u32, SamplerHandle>,
    clear_color: [f32; 4],
    capabilities: HashSet<Capability>,
    calls: Vec<Call>,
}

impl State {
    fn allocate(&mut self, kind: ObjectKind) -> NonZeroU32 {
        self.next_name += 1;
        let name = NonZeroU32::MIN.saturating_add(self.next_name - 1);
        self.live.insert(name.get(), kind);
        log::trace!("DummyBackend: created {:?} {}", kind, name);
        name
    }

    fn release(&mut self, name: NonZeroU32, kind: ObjectKind) {
        match self.live.remove(&name.get()) {
            Some(live_kind) => {
                debug_assert_eq!(live_kind, kind, "object {name} deleted as the wrong kind");
                self.deleted.insert(name.get());
                log::trace!("DummyBackend: deleted {:?} {}", kind, name);
            }
            None => {
                log::warn!("DummyBackend: {:?} {} deleted twice or never created", kind, name);
            }
        }
    }
}

/// Headless backend that models GL object and bind state in memory.
#[derive(Debug, Default)]
pub struct DummyBackend {
    state: RefCell<State>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Number of live objects of one kind.
    pub fn live_objects_of(&self, kind: ObjectKind) -> usize {
        self.state
            .borrow()
            .live
            .values()
            .filter(|k| **k == kind)
            .count()
    }

    /// Whether the raw object name is currently allocated.
    pub fn is_live(&self, raw: u32) -> bool {
        self.state.borrow().live.contains_key(&raw)
    }

    /// Whether the raw object name was allocated and later deleted.
    pub fn was_deleted(&self, raw: u32) -> bool {
        self.state.borrow().deleted.contains(&raw)
    }

    /// Recorded commands, oldest first.
    pub fn calls(&self) -> Ref<'_, Vec<Call>> {
        Ref::map(self.state.borrow(), |state| &state.calls)
    }

    /// Forget all recorded commands.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Draw commands recorded so far.
    pub fn draw_calls(&self) -> Vec<Call> {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::DrawElements { .. }))
            .cloned()
            .collect()
    }

    pub fn bound_buffer(&self, target: BufferTarget) -> Option<BufferHandle> {
        self.state.borrow().bound_buffers.get(&target).copied()
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayHandle> {
        self.state.borrow().bound_vertex_array
    }

    /// Index buffer attached to a vertex array.
    pub fn element_buffer_of(&self, vertex_array: VertexArrayHandle) -> Option<BufferHandle> {
        self.state.borrow().element_buffers.get(&vertex_array).copied()
    }

    /// Whether attribute `index` is enabled on a vertex array.
    pub fn attribute_enabled(&self, vertex_array: VertexArrayHandle, index: u32) -> bool {
        self.state
            .borrow()
            .enabled_attributes
            .get(&vertex_array)
            .is_some_and(|enabled| enabled.contains(&index))
    }

    pub fn bound_texture(&self, unit: u32, target: TextureTarget) -> Option<TextureHandle> {
        self.state.borrow().bound_textures.get(&(unit, target)).copied()
    }

    pub fn bound_sampler(&self, unit: u32) -> Option<SamplerHandle> {
        self.state.borrow().bound_samplers.get(&unit).copied()
    }

    pub fn active_texture_unit(&self) -> u32 {
        self.state.borrow().active_texture_unit
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.state.borrow().capabilities.contains(&capability)
    }

    /// Bytes last uploaded to a buffer.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.borrow().buffer_contents.get(&buffer).cloned()
    }

    /// True when no buffer, vertex array, program, texture or sampler is bound.
    pub fn is_unbound(&self) -> bool {
        let state = self.state.borrow();
        state.bound_buffers.is_empty()
            && state.bound_vertex_array.is_none()
            && state.current_program.is_none()
            && state.bound_textures.is_empty()
            && state.bound_samplers.is_empty()
    }

    fn uniform_name(&self, program: ProgramHandle, location: UniformLocation) -> Option<String> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|record| record.uniforms.get(location.0 as usize).cloned())
    }
}

/// Names declared as `uniform <type> <name>;`, in declaration order.
fn declared_uniforms(source: &str) -> impl Iterator<Item = String> + '_ {
    declarations(source, "uniform")
}

/// Names declared as `<qualifier> <type> <name>;`. A leading `layout(...)` is skipped.
fn declarations<'a>(source: &'a str, qualifier: &'a str) -> impl Iterator<Item = String> + 'a {
    source.lines().filter_map(move |line| {
        let mut line = line.trim();
        if line.starts_with("layout") {
            line = line.split_once(')')?.1.trim_start();
        }
        let declaration = line.strip_prefix(qualifier)?.strip_prefix(' ')?;
        let declaration = declaration.split(';').next()?;
        let name = declaration.split_whitespace().last()?;
        let name = name.split('[').next()?;
        Some(name.to_string())
    })
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_buffer(&self) -> BackendResult<BufferHandle> {
        Ok(BufferHandle(self.state.borrow_mut().allocate(ObjectKind::Buffer)))
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.borrow_mut();
        state.release(buffer.0, ObjectKind::Buffer);
        state.buffer_contents.remove(&buffer);
        state.bound_buffers.retain(|_, bound| *bound != buffer);
        state.element_buffers.retain(|_, bound| *bound != buffer);
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        let mut state = self.state.borrow_mut();
        if target == BufferTarget::ElementArray {
            if let Some(vertex_array) = state.bound_vertex_array {
                match buffer {
                    Some(buffer) => state.element_buffers.insert(vertex_array, buffer),
                    None => state.element_buffers.remove(&vertex_array),
                };
            }
        }
        match buffer {
            Some(buffer) => state.bound_buffers.insert(target, buffer),
            None => state.bound_buffers.remove(&target),
        };
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        let buffer = state.bound_buffers.get(&target).copied();
        log::trace!(
            "DummyBackend: buffer_data {:?} into {:?} len={}",
            target,
            buffer,
            data.len()
        );
        if let Some(buffer) = buffer {
            state.buffer_contents.insert(buffer, data.to_vec());
        }
        state.calls.push(Call::BufferData {
            buffer,
            target,
            len: data.len(),
        });
    }

    fn create_vertex_array(&self) -> BackendResult<VertexArrayHandle> {
        Ok(VertexArrayHandle(
            self.state.borrow_mut().allocate(ObjectKind::VertexArray),
        ))
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        let mut state = self.state.borrow_mut();
        state.release(vertex_array.0, ObjectKind::VertexArray);
        state.element_buffers.remove(&vertex_array);
        state.enabled_attributes.remove(&vertex_array);
        if state.bound_vertex_array == Some(vertex_array) {
            state.bound_vertex_array = None;
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>) {
        let mut state = self.state.borrow_mut();
        state.bound_vertex_array = vertex_array;
        // The element array binding follows the vertex array
        let element_buffer = vertex_array.and_then(|v| state.element_buffers.get(&v).copied());
        match element_buffer {
            Some(buffer) => state.bound_buffers.insert(BufferTarget::ElementArray, buffer),
            None => state.bound_buffers.remove(&BufferTarget::ElementArray),
        };
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(vertex_array) = state.bound_vertex_array {
            state
                .enabled_attributes
                .entry(vertex_array)
                .or_default()
                .insert(index);
        }
    }

    fn vertex_attrib_pointer(&self, index: u32, size: u32, scalar: ScalarType, _normalized: bool) {
        let mut state = self.state.borrow_mut();
        let call = Call::VertexAttribPointer {
            vertex_array: state.bound_vertex_array,
            buffer: state.bound_buffers.get(&BufferTarget::Array).copied(),
            index,
            size,
            scalar,
        };
        state.calls.push(call);
    }

    fn draw_elements(&self, topology: PrimitiveTopology, count: u32, index_type: ScalarType) {
        let mut state = self.state.borrow_mut();
        let call = Call::DrawElements {
            vertex_array: state.bound_vertex_array,
            element_buffer: state
                .bound_vertex_array
                .and_then(|v| state.element_buffers.get(&v).copied()),
            program: state.current_program,
            topology,
            count,
            index_type,
        };
        state.calls.push(call);
    }

    fn max_vertex_attribs(&self) -> u32 {
        MAX_VERTEX_ATTRIBS
    }

    fn create_shader(&self, stage: ShaderStage) -> BackendResult<ShaderHandle> {
        let mut state = self.state.borrow_mut();
        let shader = ShaderHandle(state.allocate(ObjectKind::Shader));
        state.shaders.insert(
            shader,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: false,
                info_log: String::new(),
            },
        );
        Ok(shader)
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        state.release(shader.0, ObjectKind::Shader);
        state.shaders.remove(&shader);
    }

    fn shader_source(&self, shader: ShaderHandle, source: &str) {
        if let Some(record) = self.state.borrow_mut().shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.shaders.get_mut(&shader) else {
            return;
        };
        if record.source.trim().is_empty() {
            record.compiled = false;
            record.info_log = "0:1(1): error: syntax error, unexpected end of file".to_string();
        } else if let Some(line) = record
            .source
            .lines()
            .position(|line| line.trim_start().starts_with("#error"))
        {
            record.compiled = false;
            record.info_log = format!("0:{}(1): error: #error directive", line + 1);
        } else {
            record.compiled = true;
            record.info_log.clear();
        }
    }

    fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|record| record.compiled)
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|record| record.info_log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> BackendResult<ProgramHandle> {
        let mut state = self.state.borrow_mut();
        let program = ProgramHandle(state.allocate(ObjectKind::Program));
        state.programs.insert(program, ProgramRecord::default());
        Ok(program)
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        state.release(program.0, ObjectKind::Program);
        state.programs.remove(&program);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(record) = self.state.borrow_mut().programs.get_mut(&program) {
            record.attached.push(shader);
        }
    }

    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(record) = self.state.borrow_mut().programs.get_mut(&program) {
            record.attached.retain(|attached| *attached != shader);
        }
    }

    fn link_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        let Some(attached) = state.programs.get(&program).map(|r| r.attached.clone()) else {
            return;
        };

        let mut compiled: Vec<(ShaderStage, String)> = Vec::new();
        let mut uniforms: Vec<String> = Vec::new();
        let mut problems = Vec::new();
        for shader in &attached {
            match state.shaders.get(shader) {
                Some(record) if record.compiled => {
                    compiled.push((record.stage, record.source.clone()));
                    for name in declared_uniforms(&record.source) {
                        if !uniforms.contains(&name) {
                            uniforms.push(name);
                        }
                    }
                }
                Some(record) => problems.push(format!("{} shader is not compiled", record.stage)),
                None => problems.push("attached shader does not exist".to_string()),
            }
        }
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let count = compiled.iter().filter(|(s, _)| *s == stage).count();
            if count != 1 {
                problems.push(format!("expected one {stage} shader, found {count}"));
            }
        }
        for (stage, source) in &compiled {
            if !source.contains("void main") {
                problems.push(format!("{stage} shader has no main function"));
            }
        }
        let vertex_outputs: Vec<String> = compiled
            .iter()
            .filter(|(stage, _)| *stage == ShaderStage::Vertex)
            .flat_map(|(_, source)| declarations(source, "out").collect::<Vec<_>>())
            .collect();
        for (_, source) in compiled
            .iter()
            .filter(|(stage, _)| *stage == ShaderStage::Fragment)
        {
            for input in declarations(source, "in") {
                if !vertex_outputs.contains(&input) {
                    problems.push(format!(
                        "fragment input '{input}' is not written by the vertex shader"
                    ));
                }
            }
        }

        if let Some(record) = state.programs.get_mut(&program) {
            record.linked = problems.is_empty();
            record.info_log = problems.join("\n");
            record.uniforms = if record.linked { uniforms } else { Vec::new() };
        }
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|record| record.linked)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|record| record.info_log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        self.state.borrow_mut().current_program = program;
    }

    fn current_program(&self) -> Option<ProgramHandle> {
        self.state.borrow().current_program
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|record| record.uniforms.iter().position(|u| u == name))
            .map(|index| UniformLocation(index as u32))
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let program = self.current_program();
        let name = program
            .and_then(|program| self.uniform_name(program, location))
            .unwrap_or_else(|| format!("<location {}>", location.0));
        self.state.borrow_mut().calls.push(Call::SetUniform {
            program,
            name,
            value: *value,
        });
    }

    fn create_texture(&self) -> BackendResult<TextureHandle> {
        Ok(TextureHandle(self.state.borrow_mut().allocate(ObjectKind::Texture)))
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.borrow_mut();
        state.release(texture.0, ObjectKind::Texture);
        state.bound_textures.retain(|_, bound| *bound != texture);
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_texture_unit;
        match texture {
            Some(texture) => state.bound_textures.insert((unit, target), texture),
            None => state.bound_textures.remove(&(unit, target)),
        };
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_texture_unit = unit;
    }

    fn tex_image(
        &self,
        target: TextureTarget,
        extent: ImageExtent,
        format: PixelFormat,
        pixels: &[u8],
    ) {
        let mut state = self.state.borrow_mut();
        let texture = state
            .bound_textures
            .get(&(state.active_texture_unit, target))
            .copied();
        state.calls.push(Call::TexImage {
            texture,
            target,
            extent,
            format,
            len: pixels.len(),
        });
    }

    fn generate_mipmap(&self, target: TextureTarget) {
        let mut state = self.state.borrow_mut();
        let texture = state
            .bound_textures
            .get(&(state.active_texture_unit, target))
            .copied();
        state.calls.push(Call::GenerateMipmap { texture });
    }

    fn create_sampler(&self) -> BackendResult<SamplerHandle> {
        Ok(SamplerHandle(self.state.borrow_mut().allocate(ObjectKind::Sampler)))
    }

    fn delete_sampler(&self, sampler: SamplerHandle) {
        let mut state = self.state.borrow_mut();
        state.release(sampler.0, ObjectKind::Sampler);
        state.bound_samplers.retain(|_, bound| *bound != sampler);
    }

    fn bind_sampler(&self, unit: u32, sampler: Option<SamplerHandle>) {
        let mut state = self.state.borrow_mut();
        match sampler {
            Some(sampler) => state.bound_samplers.insert(unit, sampler),
            None => state.bound_samplers.remove(&unit),
        };
    }

    fn sampler_parameter(&self, sampler: SamplerHandle, parameter: SamplerParameter) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::SamplerParameter { sampler, parameter });
    }

    fn max_anisotropy(&self) -> Option<f32> {
        Some(MAX_ANISOTROPY)
    }

    fn clear_color(&self, color: [f32; 4]) {
        self.state.borrow_mut().clear_color = color;
    }

    fn clear(&self, flags: ClearFlags) {
        let mut state = self.state.borrow_mut();
        let color = state.clear_color;
        state.calls.push(Call::Clear { color, flags });
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.state.borrow_mut().calls.push(Call::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn enable(&self, capability: Capability) {
        self.state.borrow_mut().capabilities.insert(capability);
    }
}
