//! Generated test assets: solid PNG textures, an OBJ cube, and a
//! programmatically assembled GLB triangle.
#![allow(dead_code)]

use std::path::Path;

/// Write a solid-color PNG texture.
pub fn write_solid_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    img.save(path).expect("Failed to write PNG fixture");
}

/// A unit cube with positions only; normals and UVs are left for the
/// mesh processor to synthesize.
pub fn write_cube_obj(path: &Path) {
    let obj = "\
o cube
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
f 1 2 3 4
f 6 5 8 7
f 5 1 4 8
f 2 6 7 3
f 4 3 7 8
f 5 6 2 1
";
    std::fs::write(path, obj).expect("Failed to write OBJ fixture");
}

/// Assemble a minimal GLB: one triangle, indexed, under a node with a
/// +10 Y translation (exercises transform baking).
pub fn write_triangle_glb(path: &Path) {
    // Binary payload: 3 positions (f32x3) then 3 u16 indices.
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];

    let mut bin: Vec<u8> = Vec::new();
    for v in positions {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    let index_offset = bin.len();
    for i in indices {
        bin.extend_from_slice(&i.to_le_bytes());
    }

    let root = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "translation": [0.0, 10.0, 0.0] }],
        "meshes": [{
            "name": "triangle",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }]
        }],
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": index_offset, "target": 34962 },
            { "buffer": 0, "byteOffset": index_offset, "byteLength": 6, "target": 34963 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [4.0, 4.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    });

    std::fs::write(path, assemble_glb(&root.to_string(), &bin))
        .expect("Failed to write GLB fixture");
}

/// GLB container: 12-byte header, 4-byte-aligned JSON chunk (space
/// padded), 4-byte-aligned BIN chunk (zero padded).
fn assemble_glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let json_bytes = json.as_bytes();
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;

    let bin_padding = (4 - (bin.len() % 4)) % 4;
    let bin_chunk_length = bin.len() + bin_padding;

    let total_length = 12 + 8 + json_chunk_length + 8 + bin_chunk_length;

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding));

    glb.extend_from_slice(&(bin_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
    glb.extend_from_slice(bin);
    glb.extend(std::iter::repeat_n(0u8, bin_padding));

    glb
}
