//! Wavefront OBJ codec.
//!
//! Faces are fan-triangulated and corner references deduplicated, so the
//! output is an indexed triangle list with no repeated vertices. `o` and
//! `g` statements delimit meshes; files without either yield one mesh.

use std::collections::HashMap;

use super::RawMesh;

/// One mesh under construction, with a corner-reference dedup map.
#[derive(Default)]
struct MeshBuilder {
    name: String,
    mesh: RawMesh,
    corner_indices: HashMap<(usize, Option<usize>, Option<usize>), u32>,
}

impl MeshBuilder {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn corner(
        &mut self,
        key: (usize, Option<usize>, Option<usize>),
        positions: &[[f32; 3]],
        texcoords: &[[f32; 2]],
        normals: &[[f32; 3]],
    ) -> Result<u32, String> {
        if let Some(&index) = self.corner_indices.get(&key) {
            return Ok(index);
        }

        let (vi, vti, vni) = key;
        let position = *positions
            .get(vi)
            .ok_or_else(|| format!("face references missing vertex {}", vi + 1))?;

        let index = self.mesh.positions.len() as u32;
        self.mesh.positions.push(position);
        if let Some(ti) = vti {
            self.mesh
                .texcoords
                .push(texcoords.get(ti).copied().unwrap_or([0.0; 2]));
        }
        if let Some(ni) = vni {
            self.mesh
                .normals
                .push(normals.get(ni).copied().unwrap_or([0.0, 1.0, 0.0]));
        }
        self.corner_indices.insert(key, index);
        Ok(index)
    }

    fn finish(mut self) -> Option<RawMesh> {
        if self.mesh.positions.is_empty() {
            return None;
        }
        // Partial attribute coverage cannot satisfy the per-vertex
        // invariant; drop the attribute rather than misalign it.
        if self.mesh.texcoords.len() != self.mesh.positions.len() {
            self.mesh.texcoords.clear();
        }
        if self.mesh.normals.len() != self.mesh.positions.len() {
            self.mesh.normals.clear();
        }
        self.mesh.name = if self.name.is_empty() {
            "default".to_string()
        } else {
            self.name
        };
        Some(self.mesh)
    }
}

pub(super) fn parse(text: &str) -> Result<Vec<RawMesh>, String> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut meshes: Vec<RawMesh> = Vec::new();
    let mut builder = MeshBuilder::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" if parts.len() >= 4 => {
                positions.push(parse_vec3(&parts[1..4]));
            }
            "vt" if parts.len() >= 3 => {
                let u: f32 = parts[1].parse().unwrap_or(0.0);
                let v: f32 = parts[2].parse().unwrap_or(0.0);
                texcoords.push([u, v]);
            }
            "vn" if parts.len() >= 4 => {
                normals.push(parse_vec3(&parts[1..4]));
            }
            "o" | "g" => {
                if let Some(mesh) = std::mem::take(&mut builder).finish() {
                    meshes.push(mesh);
                }
                builder = MeshBuilder::named(parts.get(1).copied().unwrap_or(""));
            }
            "f" if parts.len() >= 4 => {
                let corners: Vec<(usize, Option<usize>, Option<usize>)> = parts[1..]
                    .iter()
                    .filter_map(|c| parse_corner(c))
                    .collect();
                if corners.len() < 3 {
                    continue;
                }

                // Fan triangulation for convex polygons.
                for i in 1..corners.len() - 1 {
                    for &c in &[0, i, i + 1] {
                        let index =
                            builder.corner(corners[c], &positions, &texcoords, &normals)?;
                        builder.mesh.indices.push(index);
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(mesh) = builder.finish() {
        meshes.push(mesh);
    }

    if meshes.is_empty() {
        return Err("no geometry found".to_string());
    }
    Ok(meshes)
}

fn parse_vec3(parts: &[&str]) -> [f32; 3] {
    [
        parts[0].parse().unwrap_or(0.0),
        parts[1].parse().unwrap_or(0.0),
        parts[2].parse().unwrap_or(0.0),
    ]
}

/// Parse an OBJ corner reference: "v", "v/vt", "v/vt/vn", or "v//vn".
/// OBJ indices are 1-based.
fn parse_corner(s: &str) -> Option<(usize, Option<usize>, Option<usize>)> {
    let parts: Vec<&str> = s.split('/').collect();

    let vi = parts.first()?.parse::<usize>().ok()?.checked_sub(1)?;

    let vti = parts
        .get(1)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));

    let vni = parts
        .get(2)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));

    Some((vi, vti, vni))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_fan_triangulates_with_dedup() {
        let meshes = parse(QUAD).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.name, "quad");
        // Four unique corners, two triangles.
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.texcoords.len(), 4);
        assert_eq!(mesh.normals.len(), 4);
    }

    #[test]
    fn objects_split_into_meshes_in_file_order() {
        let text = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 2 0 0
v 3 0 0
v 2 1 0
f 4 5 6
";
        let meshes = parse(text).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].name, "first");
        assert_eq!(meshes[1].name, "second");
        assert_eq!(meshes[1].positions[0], [2.0, 0.0, 0.0]);
    }

    #[test]
    fn position_only_faces_leave_attributes_empty() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let meshes = parse(text).unwrap();
        assert!(meshes[0].normals.is_empty());
        assert!(meshes[0].texcoords.is_empty());
        assert_eq!(meshes[0].indices.len(), 3);
    }

    #[test]
    fn out_of_range_vertex_reference_is_an_error() {
        let text = "v 0 0 0\nf 1 2 3\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn empty_file_is_an_error() {
        assert!(parse("# nothing here\n").is_err());
    }
}
