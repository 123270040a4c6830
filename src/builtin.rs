//! Built-in procedural avatar model.
//!
//! A blocky humanoid assembled from six cuboids - head, body, two arms,
//! two legs - with texture coordinates laid out on the standard 64x64
//! skin atlas. One model unit corresponds to one atlas pixel, so the
//! classic part dimensions (8x8x8 head, 8x12x4 body, 4x12x4 limbs) map
//! directly onto their atlas regions. The model stands 32 units tall,
//! centered on the origin.

use glam::Vec3;

use crate::import::RawMesh;

const ATLAS_SIZE: f32 = 64.0;

/// The default humanoid avatar as raw meshes, in draw order.
pub fn default_avatar() -> Vec<RawMesh> {
    vec![
        cuboid("head", Vec3::new(0.0, 12.0, 0.0), Vec3::new(8.0, 8.0, 8.0), [0.0, 0.0]),
        cuboid("body", Vec3::new(0.0, 2.0, 0.0), Vec3::new(8.0, 12.0, 4.0), [16.0, 16.0]),
        cuboid("right_arm", Vec3::new(-6.0, 2.0, 0.0), Vec3::new(4.0, 12.0, 4.0), [40.0, 16.0]),
        cuboid("left_arm", Vec3::new(6.0, 2.0, 0.0), Vec3::new(4.0, 12.0, 4.0), [32.0, 48.0]),
        cuboid("right_leg", Vec3::new(-2.0, -10.0, 0.0), Vec3::new(4.0, 12.0, 4.0), [0.0, 16.0]),
        cuboid("left_leg", Vec3::new(2.0, -10.0, 0.0), Vec3::new(4.0, 12.0, 4.0), [16.0, 48.0]),
    ]
}

/// One textured cuboid with per-face normals and skin-atlas UVs.
///
/// The atlas region follows the standard box unwrap: top and bottom
/// above, then right / front / left / back side by side, with the box's
/// depth and width (in pixels == units) setting the rect sizes.
fn cuboid(name: &str, center: Vec3, size: Vec3, atlas_origin: [f32; 2]) -> RawMesh {
    let h = size / 2.0;
    let (w, ht, d) = (size.x, size.y, size.z);
    let [ox, oy] = atlas_origin;

    // Texture rect per face: (u0, v0, u1, v1) in atlas pixels.
    let top = (ox + d, oy, ox + d + w, oy + d);
    let bottom = (ox + d + w, oy, ox + d + w + w, oy + d);
    let right = (ox, oy + d, ox + d, oy + d + ht);
    let front = (ox + d, oy + d, ox + d + w, oy + d + ht);
    let left = (ox + d + w, oy + d, ox + d + w + d, oy + d + ht);
    let back = (ox + d + w + d, oy + d, ox + d + w + d + w, oy + d + ht);

    // Corners listed top-left, top-right, bottom-right, bottom-left as
    // seen from outside the face.
    #[rustfmt::skip]
    let faces: [(Vec3, [Vec3; 4], (f32, f32, f32, f32)); 6] = [
        (Vec3::Z, [
            Vec3::new(-h.x, h.y, h.z), Vec3::new(h.x, h.y, h.z),
            Vec3::new(h.x, -h.y, h.z), Vec3::new(-h.x, -h.y, h.z),
        ], front),
        (Vec3::NEG_Z, [
            Vec3::new(h.x, h.y, -h.z), Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, -h.z), Vec3::new(h.x, -h.y, -h.z),
        ], back),
        (Vec3::X, [
            Vec3::new(h.x, h.y, h.z), Vec3::new(h.x, h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z), Vec3::new(h.x, -h.y, h.z),
        ], left),
        (Vec3::NEG_X, [
            Vec3::new(-h.x, h.y, -h.z), Vec3::new(-h.x, h.y, h.z),
            Vec3::new(-h.x, -h.y, h.z), Vec3::new(-h.x, -h.y, -h.z),
        ], right),
        (Vec3::Y, [
            Vec3::new(-h.x, h.y, -h.z), Vec3::new(h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, h.z), Vec3::new(-h.x, h.y, h.z),
        ], top),
        (Vec3::NEG_Y, [
            Vec3::new(-h.x, -h.y, h.z), Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, -h.z), Vec3::new(-h.x, -h.y, -h.z),
        ], bottom),
    ];

    let mut mesh = RawMesh {
        name: name.to_string(),
        ..Default::default()
    };

    for (normal, corners, (u0, v0, u1, v1)) in faces {
        let base = mesh.positions.len() as u32;
        let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];
        for (corner, uv) in corners.into_iter().zip(uvs) {
            mesh.positions.push((center + corner).to_array());
            mesh.normals.push(normal.to_array());
            mesh.texcoords
                .push([uv[0] / ATLAS_SIZE, uv[1] / ATLAS_SIZE]);
        }
        // Counter-clockwise from outside: TL-BL-BR, TL-BR-TR.
        mesh.indices
            .extend_from_slice(&[base, base + 3, base + 2, base, base + 2, base + 1]);
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayConfig;
    use crate::mesh::process;
    use crate::overlay::{BodyPart, classify, overlay_mesh};

    #[test]
    fn avatar_has_six_parts() {
        let parts = default_avatar();
        assert_eq!(parts.len(), 6);
        for part in &parts {
            assert_eq!(part.positions.len(), 24);
            assert_eq!(part.indices.len(), 36);
            assert_eq!(part.normals.len(), 24);
            assert_eq!(part.texcoords.len(), 24);
        }
    }

    #[test]
    fn parts_process_and_classify() {
        let mut classes = Vec::new();
        for raw in default_avatar() {
            let mesh = process(raw).unwrap();
            classes.push(classify(&mesh));
        }
        assert_eq!(
            classes,
            vec![
                BodyPart::Head,
                BodyPart::Body,
                BodyPart::Limb,
                BodyPart::Limb,
                BodyPart::Limb,
                BodyPart::Limb,
            ]
        );
    }

    #[test]
    fn uvs_stay_inside_the_atlas() {
        for raw in default_avatar() {
            for [u, v] in &raw.texcoords {
                assert!((0.0..=1.0).contains(u), "{}: u={u}", raw.name);
                assert!((0.0..=1.0).contains(v), "{}: v={v}", raw.name);
            }
        }
    }

    #[test]
    fn avatar_spans_thirty_two_units_centered() {
        let meshes: Vec<_> = default_avatar().into_iter().map(|r| process(r).unwrap()).collect();
        let min_y = meshes
            .iter()
            .map(|m| m.aabb().0.y)
            .fold(f32::INFINITY, f32::min);
        let max_y = meshes
            .iter()
            .map(|m| m.aabb().1.y)
            .fold(f32::NEG_INFINITY, f32::max);
        assert_eq!((min_y, max_y), (-16.0, 16.0));
    }

    #[test]
    fn head_overlay_inflates_outward() {
        let head = process(default_avatar().remove(0)).unwrap();
        let config = OverlayConfig {
            head: 0.25,
            ..Default::default()
        };
        let overlay = overlay_mesh(&head, &config);
        let (base_min, base_max) = head.aabb();
        let (over_min, over_max) = overlay.aabb();
        assert!(over_max.x > base_max.x);
        assert!(over_min.y < base_min.y);
    }
}
