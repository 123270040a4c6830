//! glTF 2.0 codec (JSON and binary containers).
//!
//! Walks the scene graph depth-first, parent before children, siblings in
//! declared order, baking each node's transform chain into world space.
//! Non-triangle primitives are skipped; the rest of the pipeline assumes
//! triangulated input.

use std::path::Path;

use glam::{Mat3, Mat4, Vec3};

use super::RawMesh;

pub(super) fn import(path: &Path) -> Result<Vec<RawMesh>, String> {
    let (document, buffers, _images) =
        gltf::import(path).map_err(|e| format!("parse failed: {e}"))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| "no scene in document".to_string())?;

    let mut meshes = Vec::new();
    for node in scene.nodes() {
        visit_node(&node, Mat4::IDENTITY, &buffers, &mut meshes)?;
    }
    Ok(meshes)
}

fn visit_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<RawMesh>,
) -> Result<(), String> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for (prim_index, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::warn!(
                    "Skipping non-triangle primitive {:?} in mesh {:?}",
                    primitive.mode(),
                    mesh.name()
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| "primitive has no positions".to_string())?
                .map(|p| world.transform_point3(Vec3::from(p)).to_array())
                .collect();

            // Normals go through the inverse-transpose so non-uniform node
            // scales keep them perpendicular.
            let normal_matrix = Mat3::from_mat4(world.inverse().transpose());
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| {
                    iter.map(|n| {
                        (normal_matrix * Vec3::from(n))
                            .normalize_or_zero()
                            .to_array()
                    })
                    .collect()
                })
                .unwrap_or_default();

            let texcoords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_default();

            // Unindexed primitives get a sequential index list.
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let name = mesh
                .name()
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("mesh{}", mesh.index()));
            let name = if prim_index == 0 {
                name
            } else {
                format!("{name}.{prim_index}")
            };

            out.push(RawMesh {
                name,
                positions,
                normals,
                texcoords,
                indices,
            });
        }
    }

    for child in node.children() {
        visit_node(&child, world, buffers, out)?;
    }
    Ok(())
}
