//! Error taxonomy for the portrait pipeline.
//!
//! Every failure class a caller can observe lives here: texture
//! fetch/decode, model import, graphics initialization, and readback.
//! Teardown never surfaces an error - native resources are released by
//! `Drop` on all exit paths.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the portrait rendering pipeline.
///
/// No variant is retried internally; the calling application decides
/// whether to fall back to a non-rendered response.
#[derive(Error, Debug)]
pub enum Error {
    /// The texture URL could not be reached or the transfer failed.
    #[error("texture fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The texture server answered with a non-success status.
    #[error("texture fetch returned HTTP {status} for {url}")]
    FetchStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The texture bytes were not a decodable raster image.
    #[error("texture decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// No attempted model codec could parse the asset. Carries the
    /// per-codec diagnostics in attempt order.
    #[error("model import failed for {path}: {diagnostics}")]
    Import { path: PathBuf, diagnostics: String },

    /// A mesh violated the vertex/index consistency invariant.
    #[error("invalid mesh '{name}': {reason}")]
    InvalidMesh { name: String, reason: String },

    /// Scene assembly was attempted before both loader inputs arrived.
    #[error("scene assembly requires both texture and meshes; join state is {state}")]
    JoinIncomplete { state: String },

    /// No suitable GPU adapter was found.
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    /// The GPU device could not be created.
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// Shader validation failed; carries the compiler log.
    #[error("shader compilation failed: {log}")]
    ShaderCompile { log: String },

    /// Render pipeline creation failed; carries the validation log.
    #[error("pipeline creation failed: {log}")]
    Pipeline { log: String },

    /// The offscreen color or depth/stencil target could not be allocated.
    #[error("render target allocation failed: {log}")]
    RenderTarget { log: String },

    /// Reading the rendered pixels back from the GPU failed.
    #[error("pixel readback failed: {reason}")]
    Readback { reason: String },

    /// Filesystem failure while reading a model or writing the output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encoding of the rendered portrait failed.
    #[error("png encode failed: {0}")]
    PngEncode(#[from] png::EncodingError),
}

pub type Result<T> = std::result::Result<T, Error>;
