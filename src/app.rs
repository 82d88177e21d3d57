//! Demo application: a rotating, textured cube drawn twice per frame

use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3};

use crate::backend::{
    BackendResult, Capability, ClearFlags, GraphicsBackend, PrimitiveTopology, SamplerDescriptor,
    TextureTarget,
};
use crate::resources::{BindOption, Image, Program, Sampler, Texture, Vao};
use crate::AppConfig;

pub const VERTEX_SHADER: &str = "simple3d.v.glsl";
pub const FRAGMENT_SHADER: &str = "simple3d.f.glsl";

/// Texture unit the cube texture is sampled from
const TEXTURE_UNIT: u32 = 0;

/// Help text of an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub short_description: String,
    pub synopsis: String,
    pub description: String,
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.short_description)?;
        writeln!(f)?;
        writeln!(f, "Usage: {}", self.synopsis)?;
        writeln!(f)?;
        write!(f, "{}", self.description)
    }
}

/// Per-frame callbacks driven by the window loop
pub trait Application {
    /// Advance to `time` seconds since start-up
    fn update(&mut self, time: f32) -> BackendResult<()>;

    /// Draw one frame into the current framebuffer
    fn render_frame(&mut self) -> BackendResult<()>;

    /// The framebuffer was resized
    fn resize(&mut self, width: u32, height: u32);

    fn usage() -> Usage
    where
        Self: Sized;
}

/// Cube geometry, four vertices per face so every face gets its own color and UVs
pub struct CubeMesh {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl CubeMesh {
    /// Unit cube centered at origin
    pub fn new() -> Self {
        let corners = [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        // Corner indices and color of each face
        let faces = [
            ([0, 1, 2, 3], Vec3::new(1.0, 1.0, 0.0)), // back, yellow
            ([4, 5, 6, 7], Vec3::new(1.0, 0.0, 1.0)), // front, magenta
            ([1, 2, 6, 5], Vec3::new(0.0, 0.0, 1.0)), // right, blue
            ([0, 3, 7, 4], Vec3::new(1.0, 0.0, 0.0)), // left, red
            ([2, 3, 7, 6], Vec3::new(0.0, 1.0, 1.0)), // top, cyan
            ([0, 1, 5, 4], Vec3::new(0.0, 1.0, 0.0)), // bottom, green
        ];
        let face_uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];

        let mut mesh = Self {
            positions: Vec::with_capacity(24),
            colors: Vec::with_capacity(24),
            uvs: Vec::with_capacity(24),
            indices: Vec::with_capacity(36),
        };
        for (face, (corner_indices, color)) in faces.iter().enumerate() {
            for (corner, uv) in corner_indices.iter().zip(face_uvs) {
                mesh.positions.push(corners[*corner]);
                mesh.colors.push(*color);
                mesh.uvs.push(uv);
            }
            let base = face as u32 * 4;
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

impl Default for CubeMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Model-view-projection matrices of the two cube instances at `time`
pub fn instance_transforms(time: f32) -> [Mat4; 2] {
    let axis = Vec3::new(1.0, 1.0, 0.0).normalize();
    let first = Mat4::from_axis_angle(axis, time)
        * Mat4::from_scale(Vec3::splat(0.2))
        * Mat4::from_axis_angle(axis, 0.45);
    let second = first * Mat4::from_translation(Vec3::splat(0.75));
    [first, second]
}

/// Renders two instances of a rotating textured cube
pub struct CubeApplication<B: GraphicsBackend> {
    backend: Rc<B>,
    vao: Vao<B>,
    program: Program<B>,
    texture: Texture<B>,
    sampler: Sampler<B>,
    clear_color: [f32; 4],
    current_time: f32,
}

impl<B: GraphicsBackend> CubeApplication<B> {
    pub fn new(backend: Rc<B>, config: &AppConfig) -> BackendResult<Self> {
        let program = Program::new(
            backend.clone(),
            config.shader_dir.join(VERTEX_SHADER),
            config.shader_dir.join(FRAGMENT_SHADER),
        )?;

        let mesh = CubeMesh::new();
        let mut vao = Vao::new(backend.clone(), 3)?;
        vao.set_vbo(0, &mesh.positions)?;
        vao.set_vbo(1, &mesh.colors)?;
        vao.set_vbo(2, &mesh.uvs)?;
        vao.set_ibo(&mesh.indices);

        let image = match &config.texture {
            Some(path) => Image::from_file(path)?,
            None => Image::checkerboard(64, [255, 255, 255, 255], [96, 96, 96, 255]),
        };
        let mut texture = Texture::new(backend.clone(), TextureTarget::Texture2d)?;
        texture.set_data(&image, true)?;

        let sampler = Sampler::from_descriptor(
            backend.clone(),
            TEXTURE_UNIT,
            &SamplerDescriptor::linear_repeat().with_label("cube"),
        )?;
        sampler.enable_anisotropic_filtering();
        sampler.attach_to_program(&program, "colorTexture", BindOption::BindUnbind)?;

        backend.enable(Capability::DepthTest);
        log::info!(
            "Cube application ready on {} ({} indices)",
            backend.name(),
            mesh.indices.len()
        );

        Ok(Self {
            backend,
            vao,
            program,
            texture,
            sampler,
            clear_color: config.clear_color,
            current_time: 0.0,
        })
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    fn draw_instances(&self) -> BackendResult<()> {
        for mvp in instance_transforms(self.current_time) {
            self.program.set_uniform("mvp", mvp)?;
            self.vao.draw(PrimitiveTopology::TriangleList)?;
        }
        Ok(())
    }
}

impl<B: GraphicsBackend> Application for CubeApplication<B> {
    fn update(&mut self, time: f32) -> BackendResult<()> {
        self.current_time = time;
        self.program.bind();
        let result = self.program.set_uniform("time", time);
        self.program.unbind();
        result.map(|_| ())
    }

    fn render_frame(&mut self) -> BackendResult<()> {
        self.backend.clear_color(self.clear_color);
        self.backend.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        self.program.bind();
        self.sampler.bind();
        self.sampler.attach_texture(&self.texture);

        let result = self.draw_instances();

        self.texture.unbind();
        self.sampler.unbind();
        self.program.unbind();
        result
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Viewport resized to {}x{}", width, height);
        self.backend.viewport(0, 0, width, height);
    }

    fn usage() -> Usage {
        Usage {
            short_description: "Rotating textured cube".to_string(),
            synopsis: "rotating_cube [--width <W>] [--height <H>] [--shaders <DIR>] [--texture <PATH>] [--no-vsync]".to_string(),
            description: "  An application on GLSL uniform variables and true 3D meshes.\n  Two textured cube instances rotate around the (1, 1, 0) axis.\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, Call, DummyBackend, UniformValue};
    use std::path::PathBuf;

    fn test_config() -> AppConfig {
        AppConfig {
            shader_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_cube_mesh() {
        let mesh = CubeMesh::new();
        assert_eq!(mesh.positions.len(), 24);
        assert_eq!(mesh.colors.len(), 24);
        assert_eq!(mesh.uvs.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|i| (*i as usize) < mesh.positions.len()));
        // Every vertex lies on the unit cube surface
        assert!(mesh
            .positions
            .iter()
            .all(|p| p.abs().max_element() == 0.5));
        // Each face is flat: its four vertices share one coordinate
        for face in mesh.positions.chunks(4) {
            let shared = (0..3).any(|axis| face.iter().all(|p| p[axis] == face[0][axis]));
            assert!(shared);
        }
    }

    #[test]
    fn test_instance_transforms() {
        let [first, second] = instance_transforms(0.0);
        // The first instance is scaled to 0.2 around the origin
        let origin = first.transform_point3(Vec3::ZERO);
        assert!(origin.length() < 1e-6);
        let unit = first.transform_vector3(Vec3::X);
        assert!((unit.length() - 0.2).abs() < 1e-5);
        // The second one is offset along the rotated diagonal
        let offset = second.transform_point3(Vec3::ZERO);
        assert!((offset.length() - 0.2 * 0.75 * 3f32.sqrt()).abs() < 1e-5);

        let [rotated, _] = instance_transforms(1.0);
        assert!(!rotated.abs_diff_eq(first, 1e-4));
    }

    #[test]
    fn test_frame_draws_two_instances() {
        let backend = Rc::new(DummyBackend::new());
        let mut app = CubeApplication::new(backend.clone(), &test_config()).unwrap();
        assert!(backend.is_enabled(Capability::DepthTest));
        assert!(backend.is_unbound());

        app.update(0.5).unwrap();
        backend.clear_calls();
        app.render_frame().unwrap();

        let calls = backend.calls().clone();
        assert_eq!(
            calls[0],
            Call::Clear {
                color: [1.0, 1.0, 1.0, 1.0],
                flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            }
        );
        let expected = instance_transforms(0.5);
        let mvps: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                Call::SetUniform {
                    name,
                    value: UniformValue::Mat4(m),
                    ..
                } if name == "mvp" => Some(*m),
                _ => None,
            })
            .collect();
        assert_eq!(mvps, expected.to_vec());

        let draws = backend.draw_calls();
        assert_eq!(draws.len(), 2);
        for draw in draws {
            match draw {
                Call::DrawElements {
                    count,
                    program,
                    topology,
                    ..
                } => {
                    assert_eq!(count, 36);
                    assert_eq!(program, Some(app.program.handle()));
                    assert_eq!(topology, PrimitiveTopology::TriangleList);
                }
                other => panic!("unexpected call {other:?}"),
            }
        }
        assert!(backend.is_unbound());
    }

    #[test]
    fn test_update_pushes_time() {
        let backend = Rc::new(DummyBackend::new());
        let mut app = CubeApplication::new(backend.clone(), &test_config()).unwrap();
        backend.clear_calls();

        app.update(2.0).unwrap();
        assert_eq!(app.current_time(), 2.0);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::SetUniform {
                program: Some(app.program.handle()),
                name: "time".to_string(),
                value: UniformValue::Float(2.0),
            })
        );
        assert!(!app.program.bound());
    }

    #[test]
    fn test_resize_sets_viewport() {
        let backend = Rc::new(DummyBackend::new());
        let mut app = CubeApplication::new(backend.clone(), &test_config()).unwrap();
        app.resize(800, 600);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::Viewport {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn test_missing_shaders_release_everything() {
        let backend = Rc::new(DummyBackend::new());
        let config = AppConfig {
            shader_dir: PathBuf::from("does/not/exist"),
            ..AppConfig::default()
        };
        let result = CubeApplication::new(backend.clone(), &config);
        assert!(matches!(result, Err(BackendError::Io { .. })));
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_missing_texture_release_everything() {
        let backend = Rc::new(DummyBackend::new());
        let config = AppConfig {
            texture: Some(PathBuf::from("does/not/exist.png")),
            ..test_config()
        };
        assert!(CubeApplication::new(backend.clone(), &config).is_err());
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_drop_releases_all_handles() {
        let backend = Rc::new(DummyBackend::new());
        let app = CubeApplication::new(backend.clone(), &test_config()).unwrap();
        // Program + 2 shaders, vertex array + 3 vertex buffers + index buffer, texture, sampler
        assert_eq!(backend.live_objects(), 10);
        drop(app);
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_usage_text() {
        let usage = CubeApplication::<DummyBackend>::usage().to_string();
        assert!(usage.starts_with("Rotating textured cube"));
        assert!(usage.contains("Usage: rotating_cube"));
    }
}
