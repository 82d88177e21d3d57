//! Resource lifecycle tests against the dummy backend

use std::path::PathBuf;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use glitter::backend::{
    BufferTarget, Call, DummyBackend, ObjectKind, PrimitiveTopology, SamplerDescriptor,
    ScalarType, TextureTarget,
};
use glitter::resources::{BindOption, Buffer, Image, Program, Sampler, Texture, Vao};
use glitter::{AppConfig, Application, CubeApplication};

fn shader_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders")
}

fn textured_program(backend: &Rc<DummyBackend>) -> Program<DummyBackend> {
    let dir = shader_dir();
    Program::new(
        backend.clone(),
        dir.join("simple3d.v.glsl"),
        dir.join("simple3d.f.glsl"),
    )
    .unwrap()
}

#[test]
fn test_full_pipeline_leaves_nothing_behind() {
    let backend = Rc::new(DummyBackend::new());
    {
        let program = textured_program(&backend);

        let mut vao = Vao::new(backend.clone(), 3).unwrap();
        vao.set_vbo(0, &[Vec3::ZERO, Vec3::X, Vec3::Y]).unwrap();
        vao.set_vbo(1, &[Vec3::ONE; 3]).unwrap();
        vao.set_vbo(2, &[Vec2::ZERO, Vec2::X, Vec2::Y]).unwrap();
        vao.set_ibo(&[0u16, 1, 2]);

        let mut texture = Texture::new(backend.clone(), TextureTarget::Texture2d).unwrap();
        texture
            .set_data(&Image::checkerboard(16, [255; 4], [0, 0, 0, 255]), true)
            .unwrap();

        let sampler =
            Sampler::from_descriptor(backend.clone(), 0, &SamplerDescriptor::default()).unwrap();
        assert!(sampler
            .attach_to_program(&program, "colorTexture", BindOption::BindUnbind)
            .unwrap());
        assert!(backend.is_unbound());

        program.bind();
        sampler.bind();
        sampler.attach_texture(&texture);
        vao.draw(PrimitiveTopology::TriangleList).unwrap();
        texture.unbind();
        sampler.unbind();
        program.unbind();

        assert!(backend.is_unbound());
        assert_eq!(
            backend.draw_calls(),
            vec![Call::DrawElements {
                vertex_array: Some(vao.handle()),
                element_buffer: Some(vao.ibo().handle()),
                program: Some(program.handle()),
                topology: PrimitiveTopology::TriangleList,
                count: 3,
                index_type: ScalarType::UnsignedShort,
            }]
        );
    }
    assert_eq!(backend.live_objects(), 0);
}

#[test]
fn test_shared_buffer_outlives_first_vao() {
    let backend = Rc::new(DummyBackend::new());
    let mut positions = Buffer::new(backend.clone(), BufferTarget::Array).unwrap();
    positions.set_data(&[[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let positions = Rc::new(positions);
    let raw = positions.handle().raw();

    let mut master = Vao::new(backend.clone(), 1).unwrap();
    master.set_shared_vbo(0, positions.clone()).unwrap();
    let slave = master.make_slave_vao().unwrap();
    drop(positions);
    drop(master);

    assert!(backend.is_live(raw));
    assert!(backend.attribute_enabled(slave.handle(), 0));
    assert_eq!(backend.live_objects_of(ObjectKind::VertexArray), 1);

    drop(slave);
    assert!(backend.was_deleted(raw));
    assert_eq!(backend.live_objects(), 0);
}

#[test]
fn test_cube_application_frames() {
    let backend = Rc::new(DummyBackend::new());
    let config = AppConfig {
        shader_dir: shader_dir(),
        ..AppConfig::default()
    };
    let mut app = CubeApplication::new(backend.clone(), &config).unwrap();
    app.resize(640, 480);

    for frame in 0..3 {
        app.update(frame as f32 * 0.016).unwrap();
        app.render_frame().unwrap();
    }
    assert_eq!(backend.draw_calls().len(), 6);
    assert!(backend.is_unbound());

    drop(app);
    assert_eq!(backend.live_objects(), 0);
}
