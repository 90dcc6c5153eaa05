//! CPU-side surface geometry and its GPU buffers
//!
//! A surface stores one array per vertex attribute. Only the attributes a
//! shader's [`VertexFlags`] name are validated and uploaded, one GPU buffer
//! per stream plus an index buffer.

use bytemuck::cast_slice;

use crate::foundation::math::{Mat3, Vec2, Vec3};
use crate::render::api::{BufferHandle, BufferUsage, GpuDevice};
use crate::render::{RenderError, RenderResult};
use crate::resources::{MaterialId, VertexFlags};
use crate::scene::bounds::Aabb;
use crate::scene::EntityId;

/// One uploaded vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexStream {
    /// Attribute held by the buffer
    pub attribute: VertexFlags,
    /// Device buffer
    pub buffer: BufferHandle,
    /// Bytes per vertex
    pub stride: u32,
}

/// GPU buffers of an uploaded surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceGpuBuffer {
    /// Vertex streams in attribute order
    pub streams: Vec<VertexStream>,
    /// Triangle index buffer
    pub index_buffer: BufferHandle,
    /// Number of indices to draw
    pub index_count: u32,
    /// Number of vertices per stream
    pub vertex_count: u32,
}

impl SurfaceGpuBuffer {
    /// Stream holding `attribute`
    pub fn stream(&self, attribute: VertexFlags) -> Option<&VertexStream> {
        self.streams.iter().find(|s| s.attribute == attribute)
    }

    /// Vertex layout that was uploaded
    pub fn uploaded_flags(&self) -> VertexFlags {
        self.streams
            .iter()
            .fold(VertexFlags::empty(), |flags, s| flags | s.attribute)
    }

    /// Free every buffer
    pub fn release(self, device: &mut dyn GpuDevice) {
        for stream in self.streams {
            device.release_buffer(stream.buffer);
        }
        device.release_buffer(self.index_buffer);
    }
}

/// Overwrite `index` when it exists, append otherwise
fn write_at<T>(values: &mut Vec<T>, index: usize, value: T) {
    if let Some(slot) = values.get_mut(index) {
        *slot = value;
    } else {
        values.push(value);
    }
}

/// # Surface
///
/// A single draw's worth of indexed triangle geometry.
///
/// Surfaces are owned by the object registry. The owning mesh link and the
/// mesh's surface list are kept consistent by the registry, which is the
/// only place that attaches or detaches them.
#[derive(Debug, Clone)]
pub struct Surface {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 4]>,
    uv0: Vec<[f32; 2]>,
    uv1: Vec<[f32; 2]>,
    tangents: Vec<[f32; 4]>,
    bone_indices: Vec<[u32; 4]>,
    bone_weights: Vec<[f32; 4]>,
    indices: Vec<u32>,
    gpu: Option<SurfaceGpuBuffer>,
    active: bool,
    pub(crate) owner: Option<EntityId>,
    pub(crate) material: Option<MaterialId>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    /// Create an empty, active surface
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            colors: Vec::new(),
            uv0: Vec::new(),
            uv1: Vec::new(),
            tangents: Vec::new(),
            bone_indices: Vec::new(),
            bone_weights: Vec::new(),
            indices: Vec::new(),
            gpu: None,
            active: true,
            owner: None,
            material: None,
        }
    }

    // Vertex writers

    /// Append a vertex position and return its index
    pub fn add_vertex(&mut self, x: f32, y: f32, z: f32) -> u32 {
        self.positions.push([x, y, z]);
        u32::try_from(self.positions.len() - 1).unwrap_or(u32::MAX)
    }

    /// Write a position at `index`, appending when past the end
    pub fn set_vertex(&mut self, index: usize, x: f32, y: f32, z: f32) {
        write_at(&mut self.positions, index, [x, y, z]);
    }

    /// Write a normal at `index`, appending when past the end
    pub fn set_vertex_normal(&mut self, index: usize, x: f32, y: f32, z: f32) {
        write_at(&mut self.normals, index, [x, y, z]);
    }

    /// Write an RGBA color at `index`, appending when past the end
    pub fn set_vertex_color(&mut self, index: usize, color: [f32; 4]) {
        write_at(&mut self.colors, index, color);
    }

    /// Write first-channel UVs at `index`, appending when past the end
    pub fn set_vertex_tex_coords(&mut self, index: usize, u: f32, v: f32) {
        write_at(&mut self.uv0, index, [u, v]);
    }

    /// Write second-channel UVs at `index`, appending when past the end
    pub fn set_vertex_tex_coords2(&mut self, index: usize, u: f32, v: f32) {
        write_at(&mut self.uv1, index, [u, v]);
    }

    /// Write four bone influences at `index`, appending when past the end
    pub fn set_vertex_bone_data(&mut self, index: usize, bones: [u32; 4], weights: [f32; 4]) {
        write_at(&mut self.bone_indices, index, bones);
        write_at(&mut self.bone_weights, index, weights);
    }

    /// Append one index
    pub fn add_index(&mut self, index: u32) {
        self.indices.push(index);
    }

    /// Append a triangle
    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    // Accessors

    /// Number of positions
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Positions
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Normals
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Tangents with handedness in w
    pub fn tangents(&self) -> &[[f32; 4]] {
        &self.tangents
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Owning mesh
    pub const fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    /// Per-surface material override
    pub const fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Uploaded GPU buffers
    pub const fn gpu(&self) -> Option<&SurfaceGpuBuffer> {
        self.gpu.as_ref()
    }

    /// Whether the surface is drawn
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Include or exclude the surface from drawing
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Bounds of the positions after applying `rotation`
    pub fn aabb(&self, rotation: Option<&Mat3>) -> Option<Aabb> {
        let points = self.positions.iter().map(|p| {
            let point = Vec3::new(p[0], p[1], p[2]);
            rotation.map_or(point, |r| r * point)
        });
        Aabb::from_points(points)
    }

    /// Compute per-vertex tangents from positions, normals, UV0 and indices
    ///
    /// Tangents are accumulated per triangle from the UV derivatives,
    /// orthonormalized against the normal, and carry the bitangent
    /// handedness in w.
    pub fn compute_tangents(&mut self) -> RenderResult<()> {
        let vertex_count = self.positions.len();
        if vertex_count == 0 || self.indices.len() < 3 || self.indices.len() % 3 != 0 {
            return Err(RenderError::InvalidGeometry(
                "tangents need at least one complete triangle".to_string(),
            ));
        }
        if self.normals.len() != vertex_count || self.uv0.len() != vertex_count {
            return Err(RenderError::InvalidGeometry(format!(
                "tangents need one normal and one UV per vertex ({} positions, {} normals, {} uvs)",
                vertex_count,
                self.normals.len(),
                self.uv0.len()
            )));
        }
        self.check_indices()?;

        let mut tan1 = vec![Vec3::zeros(); vertex_count];
        let mut tan2 = vec![Vec3::zeros(); vertex_count];

        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];

            let p0 = Vec3::from(self.positions[i0]);
            let e1 = Vec3::from(self.positions[i1]) - p0;
            let e2 = Vec3::from(self.positions[i2]) - p0;

            let w0 = Vec2::from(self.uv0[i0]);
            let d1 = Vec2::from(self.uv0[i1]) - w0;
            let d2 = Vec2::from(self.uv0[i2]) - w0;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() <= f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let sdir = (e1 * d2.y - e2 * d1.y) * r;
            let tdir = (e2 * d1.x - e1 * d2.x) * r;

            for i in [i0, i1, i2] {
                tan1[i] += sdir;
                tan2[i] += tdir;
            }
        }

        self.tangents = (0..vertex_count)
            .map(|i| {
                let n = Vec3::from(self.normals[i]);
                let t = tan1[i];
                let ortho = t - n * n.dot(&t);
                let tangent = if ortho.norm_squared() > f32::EPSILON {
                    ortho.normalize()
                } else {
                    any_perpendicular(&n)
                };
                let w = if n.cross(&t).dot(&tan2[i]) < 0.0 { -1.0 } else { 1.0 };
                [tangent.x, tangent.y, tangent.z, w]
            })
            .collect();

        Ok(())
    }

    fn check_indices(&self) -> RenderResult<()> {
        let vertex_count = self.positions.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(RenderError::InvalidGeometry(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }
        Ok(())
    }

    /// Check that every stream in `flags` is present with one entry per vertex
    pub fn validate(&self, flags: VertexFlags) -> RenderResult<()> {
        let vertex_count = self.positions.len();
        if vertex_count == 0 {
            return Err(RenderError::InvalidGeometry("surface has no vertices".to_string()));
        }
        if self.indices.is_empty() {
            return Err(RenderError::InvalidGeometry("surface has no indices".to_string()));
        }
        self.check_indices()?;

        for (attribute, len) in self.stream_lengths() {
            if flags.contains(attribute) && len != vertex_count {
                return Err(RenderError::InvalidGeometry(format!(
                    "{attribute:?} stream has {len} entries for {vertex_count} vertices"
                )));
            }
        }
        Ok(())
    }

    fn stream_lengths(&self) -> [(VertexFlags, usize); 8] {
        [
            (VertexFlags::POSITION, self.positions.len()),
            (VertexFlags::NORMAL, self.normals.len()),
            (VertexFlags::COLOR, self.colors.len()),
            (VertexFlags::TEX0, self.uv0.len()),
            (VertexFlags::TEX1, self.uv1.len()),
            (VertexFlags::TANGENT, self.tangents.len()),
            (VertexFlags::BONE_INDICES, self.bone_indices.len()),
            (VertexFlags::BONE_WEIGHTS, self.bone_weights.len()),
        ]
    }

    fn stream_bytes(&self, attribute: VertexFlags) -> (&[u8], u32) {
        let streams: [(VertexFlags, &[u8], u32); 8] = [
            (VertexFlags::POSITION, cast_slice(&self.positions), 12),
            (VertexFlags::NORMAL, cast_slice(&self.normals), 12),
            (VertexFlags::COLOR, cast_slice(&self.colors), 16),
            (VertexFlags::TEX0, cast_slice(&self.uv0), 8),
            (VertexFlags::TEX1, cast_slice(&self.uv1), 8),
            (VertexFlags::TANGENT, cast_slice(&self.tangents), 16),
            (VertexFlags::BONE_INDICES, cast_slice(&self.bone_indices), 16),
            (VertexFlags::BONE_WEIGHTS, cast_slice(&self.bone_weights), 16),
        ];
        streams
            .into_iter()
            .find(|(flag, _, _)| *flag == attribute)
            .map_or((cast_slice(&self.positions), 12), |(_, bytes, stride)| (bytes, stride))
    }

    /// Upload the streams named by `flags` and the indices
    ///
    /// Tangents are computed first when requested and missing. Previously
    /// uploaded buffers are released. On failure nothing stays allocated.
    pub fn upload(&mut self, device: &mut dyn GpuDevice, flags: VertexFlags) -> RenderResult<()> {
        if flags.contains(VertexFlags::TANGENT) && self.tangents.len() != self.positions.len() {
            self.compute_tangents()?;
        }
        self.validate(flags)?;

        if let Some(previous) = self.gpu.take() {
            previous.release(device);
        }

        let vertex_count = u32::try_from(self.positions.len())
            .map_err(|_| RenderError::InvalidGeometry("too many vertices".to_string()))?;
        let index_count = u32::try_from(self.indices.len())
            .map_err(|_| RenderError::InvalidGeometry("too many indices".to_string()))?;

        let mut streams: Vec<VertexStream> = Vec::new();
        let attributes = self
            .stream_lengths()
            .map(|(attribute, _)| attribute)
            .into_iter()
            .filter(|a| *a == VertexFlags::POSITION || flags.contains(*a));
        for attribute in attributes {
            let (bytes, stride) = self.stream_bytes(attribute);
            match device.create_buffer(bytes, stride, vertex_count, BufferUsage::VERTEX) {
                Ok(buffer) => streams.push(VertexStream { attribute, buffer, stride }),
                Err(err) => {
                    log::error!("Failed to create {:?} vertex buffer: {}", attribute, err);
                    for stream in streams {
                        device.release_buffer(stream.buffer);
                    }
                    return Err(err);
                }
            }
        }

        let index_buffer = match device.create_buffer(cast_slice(&self.indices), 4, index_count, BufferUsage::INDEX) {
            Ok(buffer) => buffer,
            Err(err) => {
                log::error!("Failed to create index buffer: {}", err);
                for stream in streams {
                    device.release_buffer(stream.buffer);
                }
                return Err(err);
            }
        };

        log::debug!(
            "Uploaded surface: {} vertices, {} indices, layout {:?}",
            vertex_count,
            index_count,
            flags
        );

        self.gpu = Some(SurfaceGpuBuffer {
            streams,
            index_buffer,
            index_count,
            vertex_count,
        });
        Ok(())
    }

    /// Free the GPU buffers, keeping the CPU data
    pub fn release(&mut self, device: &mut dyn GpuDevice) {
        if let Some(gpu) = self.gpu.take() {
            gpu.release(device);
        }
    }
}

fn any_perpendicular(n: &Vec3) -> Vec3 {
    let axis = if n.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    (axis - n * n.dot(&axis)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit quad in the XY plane facing -Z with UVs matching XY
    fn quad() -> Surface {
        let mut surface = Surface::new();
        for (i, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].into_iter().enumerate() {
            surface.add_vertex(x, y, 0.0);
            surface.set_vertex_normal(i, 0.0, 0.0, -1.0);
            surface.set_vertex_tex_coords(i, x, y);
        }
        surface.add_triangle(0, 1, 2);
        surface.add_triangle(0, 2, 3);
        surface
    }

    #[test]
    fn test_writers_overwrite_or_append() {
        let mut surface = Surface::new();
        surface.set_vertex(0, 1.0, 2.0, 3.0);
        surface.set_vertex(5, 4.0, 5.0, 6.0);
        assert_eq!(surface.positions(), &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);

        surface.set_vertex(0, 7.0, 8.0, 9.0);
        assert_eq!(surface.positions()[0], [7.0, 8.0, 9.0]);
        assert_eq!(surface.vertex_count(), 2);
    }

    #[test]
    fn test_compute_tangents_follows_u_direction() {
        let mut surface = quad();
        surface.compute_tangents().unwrap();
        assert_eq!(surface.tangents().len(), 4);
        for t in surface.tangents() {
            assert_relative_eq!(t[0], 1.0, epsilon = 1e-5);
            assert_relative_eq!(t[1], 0.0, epsilon = 1e-5);
            assert_relative_eq!(t[2], 0.0, epsilon = 1e-5);
            assert_relative_eq!(t[3].abs(), 1.0);
        }
    }

    #[test]
    fn test_compute_tangents_requires_uvs() {
        let mut surface = Surface::new();
        surface.add_vertex(0.0, 0.0, 0.0);
        surface.add_vertex(1.0, 0.0, 0.0);
        surface.add_vertex(0.0, 1.0, 0.0);
        surface.add_triangle(0, 1, 2);
        assert!(matches!(surface.compute_tangents(), Err(RenderError::InvalidGeometry(_))));
    }

    #[test]
    fn test_validate_checks_requested_streams_only() {
        let surface = quad();
        assert!(surface.validate(VertexFlags::POSITION | VertexFlags::NORMAL | VertexFlags::TEX0).is_ok());
        assert!(surface.validate(VertexFlags::POSITION | VertexFlags::COLOR).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let mut surface = quad();
        surface.add_triangle(0, 1, 9);
        let err = surface.validate(VertexFlags::POSITION).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_aabb_under_rotation() {
        let surface = quad();
        let aabb = surface.aabb(None).unwrap();
        assert_relative_eq!(aabb.min, Vec3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(aabb.max, Vec3::new(1.0, 1.0, 0.0));

        let half_turn = Mat3::from_diagonal(&Vec3::new(-1.0, -1.0, 1.0));
        let rotated = surface.aabb(Some(&half_turn)).unwrap();
        assert_relative_eq!(rotated.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_relative_eq!(rotated.max, Vec3::new(0.0, 0.0, 0.0));
    }
}
