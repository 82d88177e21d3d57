//! Rotating textured cube
//!
//! Run with:
//!   cargo run --example rotating_cube
//!   cargo run --example rotating_cube -- --texture path/to/image.png
//!
//! Controls:
//!   Escape   - Exit

use std::path::PathBuf;

use clap::Parser;
use glitter::{AppConfig, Application, CubeApplication};

/// Rotating textured cube rendered through the glitter wrappers.
#[derive(Parser, Debug)]
#[command(name = "rotating_cube", version)]
struct Args {
    /// Initial window width in pixels.
    #[arg(long, default_value = "1024")]
    width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "768")]
    height: u32,

    /// Directory containing simple3d.v.glsl and simple3d.f.glsl.
    #[arg(long, default_value = "shaders")]
    shaders: PathBuf,

    /// Image to texture the cube with (PNG or JPEG). A checkerboard is used when omitted.
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Disable vertical sync (may cause tearing).
    #[arg(long)]
    no_vsync: bool,

    /// Exit after rendering N frames (useful for testing).
    #[arg(long)]
    max_frames: Option<u64>,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        let usage = CubeApplication::<glitter::backend::GlowBackend>::usage();
        Self {
            title: usage.short_description,
            width: args.width,
            height: args.height,
            vsync: !args.no_vsync,
            shader_dir: args.shaders,
            texture: args.texture,
            max_frames: args.max_frames,
            ..AppConfig::default()
        }
    }
}

fn main() {
    env_logger::init();

    let usage = CubeApplication::<glitter::backend::GlowBackend>::usage();
    let args = Args::parse_from_args_with_usage(&usage.to_string());
    let config = AppConfig::from(args);
    log::info!("Starting glitter {} with {:?}", glitter::VERSION, config);

    if let Err(err) = glitter::window::run(config, |backend, config| {
        CubeApplication::new(backend, config)
    }) {
        log::error!("{}", err);
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

impl Args {
    /// Parse the command line, showing `usage` as the long help text
    fn parse_from_args_with_usage(usage: &str) -> Self {
        use clap::{CommandFactory, FromArgMatches};

        let matches = Self::command()
            .long_about(usage.to_string())
            .get_matches();
        match Self::from_arg_matches(&matches) {
            Ok(args) => args,
            Err(err) => err.exit(),
        }
    }
}
