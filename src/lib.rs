//! Headless avatar portrait renderer.
//!
//! Rasterizes a textured humanoid model offscreen and hands back raw
//! pixels or a PNG. The pipeline specializes in dual-layer skin textures:
//! a 64x64 (or legacy 64x32) atlas whose opaque base layer is drawn
//! first, followed by an alpha-blended overlay layer on inflated
//! duplicate geometry (hat, jacket, sleeves).
//!
//! ```no_run
//! use skin_portrait::{render_to_buffer, RendererConfig, TextureSource};
//!
//! let source = TextureSource::from("https://example.com/skins/player.png");
//! let pixels = render_to_buffer(&source, &RendererConfig::default())?;
//! assert_eq!(pixels.len(), 300 * 600 * 3);
//! # Ok::<(), skin_portrait::Error>(())
//! ```
//!
//! The whole pipeline blocks the calling thread and is single-threaded
//! by design: each call builds and tears down its own GPU session, and
//! callers in a concurrent environment serialize renders externally.

pub mod builtin;
pub mod config;
pub mod error;
pub mod import;
pub mod mesh;
pub mod overlay;
mod session;
pub mod texture;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use config::{ModelSource, OverlayConfig, RendererConfig};
pub use error::{Error, Result};
pub use overlay::{JoinState, Scene, SceneBuilder};
pub use texture::{TextureImage, TextureSource};

use mesh::GpuMesh;
use session::RenderSession;

/// Render a portrait and return tightly packed RGB pixels,
/// `width * height * 3` bytes, rows top to bottom.
pub fn render_to_buffer(texture: &TextureSource, config: &RendererConfig) -> Result<Vec<u8>> {
    let scene = load_scene(texture, config)?;
    render_scene(&scene, config)
}

/// Render a portrait and write it to `output` as a PNG.
pub fn render_to_file(
    texture: &TextureSource,
    output: &Path,
    config: &RendererConfig,
) -> Result<()> {
    let pixels = render_to_buffer(texture, config)?;

    let file = File::create(output)?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, config.width, config.height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&pixels)?;
    png_writer.finish()?;

    tracing::info!("Portrait saved: {}", output.display());
    Ok(())
}

/// Load both pipeline inputs and assemble the scene. The texture loads
/// first, so an unreachable URL fails before any model or GPU work.
fn load_scene(texture: &TextureSource, config: &RendererConfig) -> Result<Scene> {
    let mut builder = SceneBuilder::new(config.overlay);

    builder.texture_arrived(TextureImage::load(texture)?);

    let raw_meshes = match &config.model {
        ModelSource::Builtin => builtin::default_avatar(),
        ModelSource::Path(path) => import::import_model(path)?,
    };
    let meshes = raw_meshes
        .into_iter()
        .map(mesh::process)
        .collect::<Result<Vec<_>>>()?;
    builder.meshes_arrived(meshes);

    builder.assemble()
}

/// Run one full render session over an assembled scene.
fn render_scene(scene: &Scene, config: &RendererConfig) -> Result<Vec<u8>> {
    let session = RenderSession::new(config.width, config.height)?;

    let skin = session.upload_texture(&scene.texture);
    let base: Vec<GpuMesh> = scene
        .base
        .iter()
        .map(|m| GpuMesh::upload(session.device(), m))
        .collect();
    let overlays: Vec<GpuMesh> = scene
        .overlays
        .iter()
        .map(|m| GpuMesh::upload(session.device(), m))
        .collect();

    session.render(config, &skin, &base, &overlays);
    session.read_pixels()
    // Session, meshes and texture drop here, releasing every GPU handle.
}
