//! GPU sampler object.

use std::rc::Rc;

use crate::backend::{
    BackendResult, GraphicsBackend, SamplerDescriptor, SamplerHandle, SamplerParameter,
};
use crate::resources::{Program, Texture};

/// Whether [`Sampler::attach_to_program`] binds the program itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindOption {
    /// Bind the program before setting the uniform and unbind it after.
    #[default]
    BindUnbind,
    /// The caller already bound the program.
    DoNotBind,
}

/// A sampler object associated with one texture unit.
///
/// # Example
///
/// ```ignore
/// let sampler = Sampler::from_descriptor(backend.clone(), 0, &SamplerDescriptor::linear_repeat())?;
/// sampler.attach_to_program(&program, "colorTexture", BindOption::BindUnbind)?;
/// sampler.bind();
/// sampler.attach_texture(&texture);
/// ```
pub struct Sampler<B: GraphicsBackend> {
    backend: Rc<B>,
    handle: SamplerHandle,
    texture_unit: u32,
}

impl<B: GraphicsBackend> Sampler<B> {
    pub fn new(backend: Rc<B>, texture_unit: u32) -> BackendResult<Self> {
        let handle = backend.create_sampler()?;
        log::trace!(
            "Created sampler {} for texture unit {}",
            handle.raw(),
            texture_unit
        );
        Ok(Self {
            backend,
            handle,
            texture_unit,
        })
    }

    /// Create a sampler and apply every parameter of `descriptor`.
    pub fn from_descriptor(
        backend: Rc<B>,
        texture_unit: u32,
        descriptor: &SamplerDescriptor,
    ) -> BackendResult<Self> {
        let sampler = Self::new(backend, texture_unit)?;
        for parameter in descriptor.parameters() {
            sampler.set_parameter(parameter);
        }
        if let Some(label) = &descriptor.label {
            log::debug!("Configured sampler '{}' ({})", label, sampler.handle.raw());
        }
        Ok(sampler)
    }

    /// Bind to this sampler's texture unit
    pub fn bind(&self) {
        self.backend.bind_sampler(self.texture_unit, Some(self.handle));
    }

    pub fn unbind(&self) {
        self.backend.bind_sampler(self.texture_unit, None);
    }

    pub fn set_parameter(&self, parameter: SamplerParameter) {
        self.backend.sampler_parameter(self.handle, parameter);
    }

    /// Point the sampler uniform `name` of `program` at this sampler's texture unit.
    ///
    /// Returns whether the uniform is active in the program.
    pub fn attach_to_program(
        &self,
        program: &Program<B>,
        name: &str,
        bind_option: BindOption,
    ) -> BackendResult<bool> {
        match bind_option {
            BindOption::BindUnbind => {
                program.bind();
                let result = program.set_uniform(name, self.texture_unit as i32);
                program.unbind();
                result
            }
            BindOption::DoNotBind => program.set_uniform(name, self.texture_unit as i32),
        }
    }

    /// Bind `texture` on this sampler's texture unit. The texture stays bound.
    pub fn attach_texture(&self, texture: &Texture<B>) {
        self.backend.active_texture(self.texture_unit);
        texture.bind();
    }

    /// Use the highest anisotropy level the device supports.
    pub fn enable_anisotropic_filtering(&self) {
        match self.backend.max_anisotropy() {
            Some(max) => self.set_parameter(SamplerParameter::MaxAnisotropy(max)),
            None => log::warn!("Anisotropic filtering is not available"),
        }
    }

    pub fn texture_unit(&self) -> u32 {
        self.texture_unit
    }

    pub fn handle(&self) -> SamplerHandle {
        self.handle
    }
}

impl<B: GraphicsBackend> Drop for Sampler<B> {
    fn drop(&mut self) {
        self.backend.delete_sampler(self.handle);
    }
}

impl<B: GraphicsBackend> std::fmt::Debug for Sampler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("handle", &self.handle.raw())
            .field("texture_unit", &self.texture_unit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AddressMode, Call, DummyBackend, FilterMode, TextureTarget, UniformValue,
    };

    const VERTEX: &str = "#version 330 core\nvoid main() { gl_Position = vec4(0.0); }\n";
    const FRAGMENT: &str = "#version 330 core\nuniform sampler2D colorTexture;\nout vec4 color;\nvoid main() { color = texture(colorTexture, vec2(0.5)); }\n";

    #[test]
    fn test_descriptor_parameters_applied() {
        let backend = Rc::new(DummyBackend::new());
        let sampler =
            Sampler::from_descriptor(backend.clone(), 0, &SamplerDescriptor::linear_repeat())
                .unwrap();

        let parameters: Vec<_> = backend
            .calls()
            .iter()
            .filter_map(|call| match call {
                Call::SamplerParameter { sampler: s, parameter } if *s == sampler.handle() => {
                    Some(*parameter)
                }
                _ => None,
            })
            .collect();
        assert_eq!(parameters.len(), 5);
        assert!(parameters.contains(&SamplerParameter::WrapT(AddressMode::Repeat)));
        assert!(parameters.contains(&SamplerParameter::MagFilter(FilterMode::Linear)));
    }

    #[test]
    fn test_bind_on_unit() {
        let backend = Rc::new(DummyBackend::new());
        let sampler = Sampler::new(backend.clone(), 3).unwrap();
        sampler.bind();
        assert_eq!(backend.bound_sampler(3), Some(sampler.handle()));
        sampler.unbind();
        assert_eq!(backend.bound_sampler(3), None);
    }

    #[test]
    fn test_attach_to_program_sets_unit() {
        let backend = Rc::new(DummyBackend::new());
        let program = Program::from_sources(backend.clone(), VERTEX, FRAGMENT).unwrap();
        let sampler = Sampler::new(backend.clone(), 2).unwrap();

        assert!(sampler
            .attach_to_program(&program, "colorTexture", BindOption::BindUnbind)
            .unwrap());
        assert!(!program.bound());
        assert!(backend.calls().contains(&Call::SetUniform {
            program: Some(program.handle()),
            name: "colorTexture".to_string(),
            value: UniformValue::Int(2),
        }));
    }

    #[test]
    fn test_attach_without_binding_needs_bound_program() {
        let backend = Rc::new(DummyBackend::new());
        let program = Program::from_sources(backend.clone(), VERTEX, FRAGMENT).unwrap();
        let sampler = Sampler::new(backend.clone(), 0).unwrap();

        assert!(sampler
            .attach_to_program(&program, "colorTexture", BindOption::DoNotBind)
            .is_err());

        program.bind();
        assert!(sampler
            .attach_to_program(&program, "colorTexture", BindOption::DoNotBind)
            .unwrap());
        assert!(program.bound());
    }

    #[test]
    fn test_attach_texture_uses_sampler_unit() {
        let backend = Rc::new(DummyBackend::new());
        let sampler = Sampler::new(backend.clone(), 1).unwrap();
        let texture = Texture::new(backend.clone(), TextureTarget::Texture2d).unwrap();

        sampler.attach_texture(&texture);
        assert_eq!(backend.active_texture_unit(), 1);
        assert_eq!(
            backend.bound_texture(1, TextureTarget::Texture2d),
            Some(texture.handle())
        );
        assert_eq!(backend.bound_texture(0, TextureTarget::Texture2d), None);
    }

    #[test]
    fn test_anisotropic_filtering() {
        let backend = Rc::new(DummyBackend::new());
        let sampler = Sampler::new(backend.clone(), 0).unwrap();
        sampler.enable_anisotropic_filtering();
        assert_eq!(
            backend.calls().last(),
            Some(&Call::SamplerParameter {
                sampler: sampler.handle(),
                parameter: SamplerParameter::MaxAnisotropy(16.0),
            })
        );
    }
}
