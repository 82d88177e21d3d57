//! Shader and program objects.

use std::path::Path;
use std::rc::Rc;

use crate::backend::{
    BackendError, BackendResult, GraphicsBackend, ProgramHandle, ShaderHandle, ShaderStage,
    Uniform, UniformLocation,
};

/// Read a text file, attaching the path to any I/O error.
pub(crate) fn file_content(path: &Path) -> BackendResult<String> {
    std::fs::read_to_string(path).map_err(|source| BackendError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A compiled shader stage. Immutable once constructed.
pub struct Shader<B: GraphicsBackend> {
    backend: Rc<B>,
    handle: ShaderHandle,
    stage: ShaderStage,
}

impl<B: GraphicsBackend> Shader<B> {
    /// Compile a shader from a GLSL file.
    pub fn from_file(
        backend: Rc<B>,
        stage: ShaderStage,
        path: impl AsRef<Path>,
    ) -> BackendResult<Self> {
        let path = path.as_ref();
        let source = file_content(path)?;
        Self::from_source(backend, stage, &source, &path.display().to_string())
    }

    /// Compile a shader from GLSL source. `label` names it in error messages.
    pub fn from_source(
        backend: Rc<B>,
        stage: ShaderStage,
        source: &str,
        label: &str,
    ) -> BackendResult<Self> {
        let handle = backend.create_shader(stage)?;
        // Owning the handle first guarantees deletion on the error path
        let shader = Self {
            backend,
            handle,
            stage,
        };

        shader.backend.shader_source(handle, source);
        shader.backend.compile_shader(handle);
        if !shader.backend.shader_compile_status(handle) {
            let log = shader.backend.shader_info_log(handle);
            log::error!("Failed to compile {} shader '{}':\n{}", stage, label, log);
            return Err(BackendError::ShaderCompilationFailed {
                stage,
                label: label.to_string(),
                log,
            });
        }

        log::debug!("Compiled {} shader '{}'", stage, label);
        Ok(shader)
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }
}

impl<B: GraphicsBackend> Drop for Shader<B> {
    fn drop(&mut self) {
        self.backend.delete_shader(self.handle);
    }
}

/// A linked vertex + fragment program.
///
/// Uniforms are looked up by name on every set call, so a program can be
/// fed from any number of places without caching locations.
pub struct Program<B: GraphicsBackend> {
    backend: Rc<B>,
    handle: ProgramHandle,
    vertex: Shader<B>,
    fragment: Shader<B>,
}

impl<B: GraphicsBackend> Program<B> {
    /// Compile and link a program from a vertex and a fragment shader file.
    pub fn new(
        backend: Rc<B>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> BackendResult<Self> {
        let vertex = Shader::from_file(backend.clone(), ShaderStage::Vertex, vertex_path)?;
        let fragment = Shader::from_file(backend.clone(), ShaderStage::Fragment, fragment_path)?;
        Self::link(backend, vertex, fragment)
    }

    /// Compile and link a program from in-memory sources.
    pub fn from_sources(
        backend: Rc<B>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> BackendResult<Self> {
        let vertex = Shader::from_source(
            backend.clone(),
            ShaderStage::Vertex,
            vertex_source,
            "<vertex source>",
        )?;
        let fragment = Shader::from_source(
            backend.clone(),
            ShaderStage::Fragment,
            fragment_source,
            "<fragment source>",
        )?;
        Self::link(backend, vertex, fragment)
    }

    fn link(backend: Rc<B>, vertex: Shader<B>, fragment: Shader<B>) -> BackendResult<Self> {
        let handle = backend.create_program()?;
        let program = Self {
            backend,
            handle,
            vertex,
            fragment,
        };

        let gl = &program.backend;
        gl.attach_shader(handle, program.vertex.handle());
        gl.attach_shader(handle, program.fragment.handle());
        gl.link_program(handle);
        // Detached shaders can be deleted independently of the program
        gl.detach_shader(handle, program.vertex.handle());
        gl.detach_shader(handle, program.fragment.handle());

        if !gl.program_link_status(handle) {
            let log = gl.program_info_log(handle);
            log::error!("Failed to link program {}:\n{}", handle.raw(), log);
            return Err(BackendError::ProgramLinkFailed(log));
        }

        log::debug!("Linked program {}", handle.raw());
        Ok(program)
    }

    pub fn bind(&self) {
        self.backend.use_program(Some(self.handle));
    }

    pub fn unbind(&self) {
        self.backend.use_program(None);
    }

    /// Whether this program is the one currently in use.
    pub fn bound(&self) -> bool {
        self.backend.current_program() == Some(self.handle)
    }

    /// Location of an active uniform.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.backend.uniform_location(self.handle, name)
    }

    /// Assign the uniform `name`. The program must be bound.
    ///
    /// Returns `Ok(false)` when `name` is not an active uniform, which includes
    /// uniforms the compiler optimized away.
    pub fn set_uniform<U: Uniform>(&self, name: &str, value: U) -> BackendResult<bool> {
        if !self.bound() {
            return Err(BackendError::ProgramNotBound(name.to_string()));
        }
        match self.uniform_location(name) {
            Some(location) => {
                self.backend.set_uniform(location, &value.to_uniform());
                Ok(true)
            }
            None => {
                log::warn!(
                    "Uniform '{}' is not active in program {}",
                    name,
                    self.handle.raw()
                );
                Ok(false)
            }
        }
    }

    pub fn vertex_shader(&self) -> &Shader<B> {
        &self.vertex
    }

    pub fn fragment_shader(&self) -> &Shader<B> {
        &self.fragment
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }
}

impl<B: GraphicsBackend> Drop for Program<B> {
    fn drop(&mut self) {
        self.backend.delete_program(self.handle);
    }
}
