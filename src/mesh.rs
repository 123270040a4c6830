//! Mesh processing: attribute completion, validation, GPU upload.
//!
//! A [`RawMesh`] from the importer may lack normals or texture
//! coordinates. Processing fills both in - area-weighted smooth normals,
//! and dominant-axis projected UVs - then validates the per-vertex
//! invariant. CPU-side arrays are retained after GPU upload because
//! overlay generation reads them back.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::import::RawMesh;

/// Tile size, in model units, for synthesized texture coordinates. One
/// tile spans 16 local units, approximating a box UV layout for sources
/// without explicit UVs.
const UV_TILE_SIZE: f32 = 16.0;

/// A processed mesh: positions, normals and texture coordinates always
/// present and consistent, indices triangulated. Immutable after
/// creation.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Axis-aligned bounding box as (min, max). Zero extents for empty
    /// meshes.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in &self.positions {
            min = min.min(Vec3::from(*p));
            max = max.max(Vec3::from(*p));
        }
        if self.positions.is_empty() {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            (min, max)
        }
    }

    fn validate(&self) -> Result<()> {
        let count = self.positions.len();
        if self.normals.len() != count || self.texcoords.len() != count {
            return Err(Error::InvalidMesh {
                name: self.name.clone(),
                reason: format!(
                    "attribute counts diverge: {} positions, {} normals, {} texcoords",
                    count,
                    self.normals.len(),
                    self.texcoords.len()
                ),
            });
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(Error::InvalidMesh {
                name: self.name.clone(),
                reason: format!("index {bad} out of range for {count} vertices"),
            });
        }
        Ok(())
    }
}

/// Complete a raw mesh's attributes and validate it.
pub fn process(raw: RawMesh) -> Result<MeshData> {
    let normals = if raw.normals.len() == raw.positions.len() {
        raw.normals
    } else {
        tracing::debug!("Computing smooth normals for mesh '{}'", raw.name);
        compute_smooth_normals(&raw.positions, &raw.indices)
    };

    let texcoords = if raw.texcoords.len() == raw.positions.len() {
        raw.texcoords
    } else {
        tracing::debug!("Synthesizing texture coordinates for mesh '{}'", raw.name);
        raw.positions
            .iter()
            .zip(&normals)
            .map(|(p, n)| project_dominant_axis(*p, *n))
            .collect()
    };

    let mesh = MeshData {
        name: raw.name,
        positions: raw.positions,
        normals,
        texcoords,
        indices: raw.indices,
    };
    mesh.validate()?;
    Ok(mesh)
}

/// Area-weighted smooth normals: each face normal (cross product, length
/// proportional to face area) is accumulated into its three vertices and
/// the sums normalized.
pub fn compute_smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let p0 = Vec3::from(positions[i0]);
        let p1 = Vec3::from(positions[i1]);
        let p2 = Vec3::from(positions[i2]);
        let face = (p1 - p0).cross(p2 - p0);
        sums[i0] += face;
        sums[i1] += face;
        sums[i2] += face;
    }

    sums.into_iter()
        .map(|n| {
            if n.length_squared() > 0.0 {
                n.normalize().to_array()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

/// Synthesize one (u, v) by dominant-axis projection: the vertex position
/// is projected onto the plane perpendicular to the normal's
/// largest-magnitude axis, then divided by the tile size. Pure function
/// of (position, normal).
pub fn project_dominant_axis(position: [f32; 3], normal: [f32; 3]) -> [f32; 2] {
    let [px, py, pz] = position;
    let [nx, ny, nz] = [normal[0].abs(), normal[1].abs(), normal[2].abs()];

    let (u, v) = if nx >= ny && nx >= nz {
        (pz, py)
    } else if ny >= nx && ny >= nz {
        (px, pz)
    } else {
        (px, py)
    };
    [u / UV_TILE_SIZE, v / UV_TILE_SIZE]
}

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// GPU half of a mesh: vertex and index buffers. Dropped with the render
/// session that uploaded it.
pub(crate) struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .zip(&mesh.texcoords)
            .map(|((p, n), t)| Vertex {
                position: *p,
                normal: *n,
                uv: *t,
            })
            .collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertices '{}'", mesh.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Indices '{}'", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        tracing::debug!(
            "Uploaded mesh '{}': {} vertices, {} indices",
            mesh.name,
            vertices.len(),
            mesh.indices.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}
