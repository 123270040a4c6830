//! Overlay mesh generation for dual-layer skin textures.
//!
//! A skin texture carries a second, semi-transparent layer (hat, jacket,
//! sleeves) in the right half of its atlas. For each base mesh, an
//! overlay mesh is derived by displacing vertices outward along their
//! normals and shifting left-half U coordinates into the overlay region.
//!
//! Texture and model loading are independent inputs that may complete in
//! either order, so assembly goes through an explicit two-input join
//! ([`SceneBuilder`]) instead of having whichever loader finishes second
//! trigger generation.

use glam::Vec3;

use crate::config::OverlayConfig;
use crate::error::{Error, Result};
use crate::mesh::MeshData;
use crate::texture::TextureImage;

/// Half of the atlas U range; left-half coordinates shift by this much
/// into the overlay region.
///
/// This is an approximation of the per-body-part atlas mapping, not an
/// exact one; the true region layout differs per limb.
const OVERLAY_U_SHIFT: f32 = 0.5;

/// Per-axis tolerance, in model units, when matching a mesh's bounding
/// box against the known body-part dimensions.
const CLASSIFY_TOLERANCE: f32 = 0.6;

/// Body-part class of a base mesh, derived from its bounding-box size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    /// ~8x8x8 units.
    Head,
    /// ~8x12x4 units.
    Body,
    /// Everything else (arms, legs).
    Limb,
}

impl BodyPart {
    /// Inflation distance for this class under the given config.
    pub fn inflation(self, config: &OverlayConfig) -> f32 {
        match self {
            BodyPart::Head => config.head,
            BodyPart::Body => config.body,
            BodyPart::Limb => config.limb,
        }
    }
}

/// Classify a mesh by its axis-aligned bounding-box extents.
pub fn classify(mesh: &MeshData) -> BodyPart {
    let (min, max) = mesh.aabb();
    let size = max - min;

    let matches = |target: Vec3| (size - target).abs().max_element() <= CLASSIFY_TOLERANCE;

    if matches(Vec3::new(8.0, 8.0, 8.0)) {
        BodyPart::Head
    } else if matches(Vec3::new(8.0, 12.0, 4.0)) {
        BodyPart::Body
    } else {
        BodyPart::Limb
    }
}

/// Derive the overlay mesh for one base mesh: positions inflated along
/// the normals by the class distance, left-half U coordinates shifted
/// into the overlay region, topology unchanged.
pub fn overlay_mesh(base: &MeshData, config: &OverlayConfig) -> MeshData {
    let part = classify(base);
    let distance = part.inflation(config);

    let positions = base
        .positions
        .iter()
        .zip(&base.normals)
        .map(|(p, n)| (Vec3::from(*p) + Vec3::from(*n) * distance).to_array())
        .collect();

    let texcoords = base
        .texcoords
        .iter()
        .map(|&[u, v]| {
            if (0.0..=OVERLAY_U_SHIFT).contains(&u) {
                [u + OVERLAY_U_SHIFT, v]
            } else {
                [u, v]
            }
        })
        .collect();

    tracing::debug!(
        "Overlay for '{}': class {:?}, inflation {}",
        base.name,
        part,
        distance
    );

    MeshData {
        name: format!("{}.overlay", base.name),
        positions,
        normals: base.normals.clone(),
        texcoords,
        indices: base.indices.clone(),
    }
}

/// Observable state of the texture/model join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    /// Neither input has arrived.
    Empty,
    /// Only the texture has arrived.
    TextureOnly,
    /// Only the mesh list has arrived.
    ModelOnly,
    /// Both inputs present; overlays not yet derived.
    Pending,
}

/// A fully assembled scene, ready for a render session.
#[derive(Debug, Clone)]
pub struct Scene {
    pub texture: TextureImage,
    pub base: Vec<MeshData>,
    /// Parallel to `base` when the texture is skin-classified; empty
    /// otherwise.
    pub overlays: Vec<MeshData>,
}

impl Scene {
    /// Total meshes drawn: base plus overlays.
    pub fn draw_count(&self) -> usize {
        self.base.len() + self.overlays.len()
    }
}

/// Two-input join for texture and model loading.
///
/// Inputs may arrive in either order; [`SceneBuilder::assemble`] performs
/// the overlay-generation step once both are present.
#[derive(Debug)]
pub struct SceneBuilder {
    texture: Option<TextureImage>,
    meshes: Option<Vec<MeshData>>,
    overlay: OverlayConfig,
}

impl SceneBuilder {
    pub fn new(overlay: OverlayConfig) -> Self {
        Self {
            texture: None,
            meshes: None,
            overlay,
        }
    }

    pub fn state(&self) -> JoinState {
        match (&self.texture, &self.meshes) {
            (None, None) => JoinState::Empty,
            (Some(_), None) => JoinState::TextureOnly,
            (None, Some(_)) => JoinState::ModelOnly,
            (Some(_), Some(_)) => JoinState::Pending,
        }
    }

    pub fn texture_arrived(&mut self, texture: TextureImage) {
        self.texture = Some(texture);
    }

    pub fn meshes_arrived(&mut self, meshes: Vec<MeshData>) {
        self.meshes = Some(meshes);
    }

    /// Assemble the scene, generating overlay meshes when the texture is
    /// skin-classified and the mesh list is non-empty. Errors unless both
    /// inputs have arrived.
    pub fn assemble(self) -> Result<Scene> {
        let state = self.state();
        let (Some(texture), Some(base)) = (self.texture, self.meshes) else {
            return Err(Error::JoinIncomplete {
                state: format!("{state:?}"),
            });
        };

        let overlays = if texture.is_skin() && !base.is_empty() {
            base.iter().map(|m| overlay_mesh(m, &self.overlay)).collect()
        } else {
            Vec::new()
        };

        tracing::info!(
            "Scene assembled: {} base mesh(es), {} overlay(s)",
            base.len(),
            overlays.len()
        );

        Ok(Scene {
            texture,
            base,
            overlays,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::RawMesh;
    use crate::mesh::process;

    /// A triangulated box of the given size centered on the origin, run
    /// through the normal mesh processing path.
    fn test_box(size: [f32; 3]) -> MeshData {
        let [hx, hy, hz] = [size[0] / 2.0, size[1] / 2.0, size[2] / 2.0];
        let mut positions = Vec::new();
        for &x in &[-hx, hx] {
            for &y in &[-hy, hy] {
                for &z in &[-hz, hz] {
                    positions.push([x, y, z]);
                }
            }
        }
        // Two faces are enough to exercise classification and inflation.
        let indices = vec![0, 1, 2, 1, 3, 2, 4, 6, 5, 5, 6, 7];
        process(RawMesh {
            name: "box".to_string(),
            positions,
            normals: vec![],
            texcoords: vec![],
            indices,
        })
        .unwrap()
    }

    #[test]
    fn classification_by_bounding_box() {
        assert_eq!(classify(&test_box([8.0, 8.0, 8.0])), BodyPart::Head);
        assert_eq!(classify(&test_box([8.0, 12.0, 4.0])), BodyPart::Body);
        assert_eq!(classify(&test_box([4.0, 12.0, 4.0])), BodyPart::Limb);
        // Near-miss within tolerance still classifies.
        assert_eq!(classify(&test_box([8.4, 8.4, 7.6])), BodyPart::Head);
    }

    #[test]
    fn overlay_shares_topology_with_base() {
        let base = test_box([8.0, 8.0, 8.0]);
        let overlay = overlay_mesh(&base, &OverlayConfig::default());
        assert_eq!(overlay.indices, base.indices);
        assert_eq!(overlay.vertex_count(), base.vertex_count());
    }

    #[test]
    fn zero_inflation_keeps_positions() {
        let base = test_box([8.0, 12.0, 4.0]);
        let overlay = overlay_mesh(&base, &OverlayConfig::default());
        assert_eq!(overlay.positions, base.positions);
    }

    #[test]
    fn inflation_displaces_along_normals() {
        let base = test_box([8.0, 8.0, 8.0]);
        let config = OverlayConfig {
            head: 0.5,
            ..Default::default()
        };
        let overlay = overlay_mesh(&base, &config);
        for ((b, o), n) in base
            .positions
            .iter()
            .zip(&overlay.positions)
            .zip(&base.normals)
        {
            let expected = Vec3::from(*b) + Vec3::from(*n) * 0.5;
            assert!((Vec3::from(*o) - expected).length() < 1e-6);
        }
    }

    #[test]
    fn left_half_u_shifts_into_overlay_region() {
        let mut base = test_box([8.0, 8.0, 8.0]);
        base.texcoords = vec![[0.0, 0.3]; base.vertex_count()];
        base.texcoords[0] = [0.25, 0.1];
        base.texcoords[1] = [0.5, 0.9];
        base.texcoords[2] = [0.75, 0.2];

        let overlay = overlay_mesh(&base, &OverlayConfig::default());
        assert_eq!(overlay.texcoords[0], [0.75, 0.1]);
        assert_eq!(overlay.texcoords[1], [1.0, 0.9]);
        // Right-half coordinates are untouched.
        assert_eq!(overlay.texcoords[2], [0.75, 0.2]);
    }

    #[test]
    fn join_accepts_inputs_in_either_order() {
        let texture = TextureImage::solid(64, 64, [255; 4]);
        let meshes = vec![test_box([8.0, 8.0, 8.0])];

        let mut first = SceneBuilder::new(OverlayConfig::default());
        assert_eq!(first.state(), JoinState::Empty);
        first.texture_arrived(texture.clone());
        assert_eq!(first.state(), JoinState::TextureOnly);
        first.meshes_arrived(meshes.clone());
        assert_eq!(first.state(), JoinState::Pending);

        let mut second = SceneBuilder::new(OverlayConfig::default());
        second.meshes_arrived(meshes);
        assert_eq!(second.state(), JoinState::ModelOnly);
        second.texture_arrived(texture);
        assert_eq!(second.state(), JoinState::Pending);

        let a = first.assemble().unwrap();
        let b = second.assemble().unwrap();
        assert_eq!(a.overlays.len(), b.overlays.len());
    }

    #[test]
    fn skin_texture_yields_one_overlay_per_base_mesh() {
        let mut builder = SceneBuilder::new(OverlayConfig::default());
        builder.texture_arrived(TextureImage::solid(64, 64, [255; 4]));
        builder.meshes_arrived(vec![
            test_box([8.0, 8.0, 8.0]),
            test_box([8.0, 12.0, 4.0]),
            test_box([4.0, 12.0, 4.0]),
        ]);
        let scene = builder.assemble().unwrap();
        assert_eq!(scene.overlays.len(), scene.base.len());
        for (base, overlay) in scene.base.iter().zip(&scene.overlays) {
            assert_eq!(base.indices.len(), overlay.indices.len());
        }
        assert_eq!(scene.draw_count(), 6);
    }

    #[test]
    fn non_skin_texture_never_triggers_overlays() {
        for (w, h) in [(32, 32), (128, 128), (65, 64), (300, 600)] {
            let mut builder = SceneBuilder::new(OverlayConfig::default());
            builder.texture_arrived(TextureImage::solid(w, h, [255; 4]));
            builder.meshes_arrived(vec![test_box([8.0, 8.0, 8.0])]);
            let scene = builder.assemble().unwrap();
            assert!(scene.overlays.is_empty(), "{w}x{h} must not classify");
            assert_eq!(scene.draw_count(), 1);
        }
    }

    #[test]
    fn half_height_skin_triggers_overlays() {
        let mut builder = SceneBuilder::new(OverlayConfig::default());
        builder.texture_arrived(TextureImage::solid(64, 32, [255; 4]));
        builder.meshes_arrived(vec![test_box([8.0, 8.0, 8.0])]);
        assert_eq!(builder.assemble().unwrap().overlays.len(), 1);
    }

    #[test]
    fn assembly_without_both_inputs_fails() {
        let builder = SceneBuilder::new(OverlayConfig::default());
        assert!(builder.assemble().is_err());

        let mut builder = SceneBuilder::new(OverlayConfig::default());
        builder.texture_arrived(TextureImage::solid(64, 64, [255; 4]));
        assert!(builder.assemble().is_err());
    }
}
