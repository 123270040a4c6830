//! Model import: codec detection, fallback parsing, scene flattening.
//!
//! The asset path's extension picks the first codec to try, but every
//! codec is gated by a cheap byte probe before a full parse is committed.
//! When the hinted codec fails, the remaining codecs are tried in a fixed
//! order; only when every attempt has failed does import surface an error,
//! carrying each codec's diagnostic.

mod gltf;
mod obj;

use std::path::Path;

use crate::error::{Error, Result};

/// One mesh as it came out of a codec: transforms baked to world space,
/// triangulated, but with normals and texture coordinates possibly absent.
#[derive(Debug, Clone, Default)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Empty when the source carries no normals.
    pub normals: Vec<[f32; 3]>,
    /// Empty when the source carries no texture coordinates.
    pub texcoords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Supported model codecs, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Obj,
    Gltf,
    Glb,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 3] = [ModelFormat::Obj, ModelFormat::Gltf, ModelFormat::Glb];

    pub fn name(self) -> &'static str {
        match self {
            ModelFormat::Obj => "obj",
            ModelFormat::Gltf => "gltf",
            ModelFormat::Glb => "glb",
        }
    }

    /// Codec hinted by the file extension, if any.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "obj" => Some(ModelFormat::Obj),
            "gltf" => Some(ModelFormat::Gltf),
            "glb" => Some(ModelFormat::Glb),
            _ => None,
        }
    }

    /// Cheap capability probe: can this codec plausibly parse these
    /// bytes? Probing never allocates or builds a scene; the committed
    /// parse happens at most once per codec.
    pub fn probe(self, bytes: &[u8]) -> bool {
        match self {
            ModelFormat::Glb => bytes.starts_with(b"glTF"),
            ModelFormat::Gltf => {
                // JSON document; the asset key is mandatory in glTF.
                let Ok(head) = std::str::from_utf8(&bytes[..bytes.len().min(512)]) else {
                    return false;
                };
                head.trim_start().starts_with('{') && head.contains("\"asset\"")
            }
            ModelFormat::Obj => {
                let Ok(head) = std::str::from_utf8(&bytes[..bytes.len().min(4096)]) else {
                    return false;
                };
                head.lines().any(|line| {
                    let line = line.trim_start();
                    line.starts_with("v ") || line.starts_with("f ") || line.starts_with("o ")
                })
            }
        }
    }

    fn parse(self, bytes: &[u8], path: &Path) -> std::result::Result<Vec<RawMesh>, String> {
        match self {
            ModelFormat::Obj => {
                let text = std::str::from_utf8(bytes).map_err(|e| format!("not utf-8: {e}"))?;
                obj::parse(text)
            }
            // The gltf crate sniffs binary vs. JSON itself and resolves
            // external buffers relative to the path.
            ModelFormat::Gltf | ModelFormat::Glb => gltf::import(path),
        }
    }
}

/// Import a model file into a flat, ordered mesh list.
///
/// Scene-graph traversal is depth-first, parent before children, siblings
/// in declared order; the resulting list order is preserved as draw order.
pub fn import_model(path: &Path) -> Result<Vec<RawMesh>> {
    let bytes = std::fs::read(path)?;

    let hinted = ModelFormat::from_extension(path);
    let candidates = hinted
        .into_iter()
        .chain(ModelFormat::ALL.into_iter().filter(|f| Some(*f) != hinted));

    let mut diagnostics = Vec::new();
    for format in candidates {
        if !format.probe(&bytes) {
            diagnostics.push(format!("{}: probe rejected", format.name()));
            continue;
        }
        match format.parse(&bytes, path) {
            Ok(meshes) if !meshes.is_empty() => {
                tracing::info!(
                    "Imported {} as {}: {} mesh(es), {} vertices",
                    path.display(),
                    format.name(),
                    meshes.len(),
                    meshes.iter().map(|m| m.positions.len()).sum::<usize>()
                );
                return Ok(meshes);
            }
            Ok(_) => diagnostics.push(format!("{}: no meshes in scene", format.name())),
            Err(e) => diagnostics.push(format!("{}: {}", format.name(), e)),
        }
    }

    Err(Error::Import {
        path: path.to_path_buf(),
        diagnostics: diagnostics.join("; "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_hints() {
        assert_eq!(
            ModelFormat::from_extension(Path::new("avatar.OBJ")),
            Some(ModelFormat::Obj)
        );
        assert_eq!(
            ModelFormat::from_extension(Path::new("avatar.gltf")),
            Some(ModelFormat::Gltf)
        );
        assert_eq!(
            ModelFormat::from_extension(Path::new("avatar.glb")),
            Some(ModelFormat::Glb)
        );
        assert_eq!(ModelFormat::from_extension(Path::new("avatar.fbx")), None);
    }

    #[test]
    fn probes_discriminate_by_content() {
        let obj = b"# comment\nv 0 0 0\nf 1 1 1\n";
        let gltf = br#"{ "asset": { "version": "2.0" } }"#;
        let glb = b"glTF\x02\x00\x00\x00";

        assert!(ModelFormat::Obj.probe(obj));
        assert!(!ModelFormat::Obj.probe(gltf));
        assert!(ModelFormat::Gltf.probe(gltf));
        assert!(!ModelFormat::Gltf.probe(obj));
        assert!(ModelFormat::Glb.probe(glb));
        assert!(!ModelFormat::Glb.probe(obj));
    }

    #[test]
    fn corrupt_bytes_report_every_codec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.obj");
        std::fs::write(&path, b"\xff\xfe\x00garbage").unwrap();

        let err = import_model(&path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("obj"));
        assert!(message.contains("gltf"));
        assert!(message.contains("glb"));
    }
}
