//! Renderer configuration value objects.
//!
//! A [`RendererConfig`] is constructed by the caller and consumed once per
//! render. Camera placement and light color are fixed constants of the
//! pipeline and intentionally not part of the configuration surface.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the model geometry comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSource {
    /// The built-in procedural humanoid avatar.
    Builtin,
    /// A model file on disk; format inferred from the extension with
    /// fallback probing across the supported codecs.
    Path(PathBuf),
}

/// Per-class outward displacement distances for overlay meshes, in model
/// units along the vertex normal.
///
/// All distances default to zero: the overlay initially sits directly on
/// the base geometry. Tuning these is an explicit extension point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub head: f32,
    pub body: f32,
    pub limb: f32,
}

/// Configuration for one portrait render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Model geometry source.
    pub model: ModelSource,
    /// Background clear color, each channel in [0, 1].
    pub background: [f32; 3],
    /// World-space light position.
    pub light_position: [f32; 3],
    /// Uniform model scale.
    pub scale: f32,
    /// Model rotation around the Y axis, in degrees.
    pub rotation_y: f32,
    /// Model translation applied after rotation and scale.
    pub translation: [f32; 3],
    /// Overlay inflation distances.
    pub overlay: OverlayConfig,
    /// Reserved diagnostic flag; currently unused by the pipeline.
    pub debug: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 600,
            model: ModelSource::Builtin,
            background: [0.16, 0.17, 0.20],
            light_position: [24.0, 36.0, 48.0],
            scale: 1.0,
            rotation_y: 0.0,
            translation: [0.0, 0.0, 0.0],
            overlay: OverlayConfig::default(),
            debug: false,
        }
    }
}
