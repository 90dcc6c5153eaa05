//! # Render Commands
//!
//! A render command is one surface of one mesh, drawn with one shader and
//! one material at one world transform. Commands are plain values built
//! fresh every frame; the backend is handed to [`RenderCommand::execute`]
//! by whoever owns it rather than stored inside the command.

use crate::foundation::math::Mat4;
use crate::render::api::{RenderBackend, ShaderHandle};
use crate::render::FrameStats;
use crate::resources::{MaterialId, ShaderId, SurfaceId, VertexFlags};
use crate::scene::{EntityId, ObjectRegistry};

/// Shader identity a command is sorted and bound by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderRef {
    /// Registry id
    pub id: ShaderId,
    /// Backend program
    pub handle: ShaderHandle,
    /// Creation-order serial
    pub sort_id: u32,
}

/// Material identity a command is sorted and bound by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialRef {
    /// Registry id
    pub id: MaterialId,
    /// Creation-order serial
    pub sort_id: u32,
}

/// Which list of the queue a command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    /// Grouped by shader then material
    Opaque,
    /// Drawn back-to-front after the opaque list
    Transparent,
}

/// Individual render command containing all data needed to draw a surface
#[derive(Debug, Clone)]
pub struct RenderCommand {
    /// Mesh the surface belongs to
    pub mesh: EntityId,
    /// Surface to draw
    pub surface: SurfaceId,
    /// Mesh world matrix at queue build time
    pub world: Mat4,
    /// Shader to draw with
    pub shader: ShaderRef,
    /// Material to draw with
    pub material: MaterialRef,
    /// Vertex streams the shader reads
    pub vertex_flags: VertexFlags,
    /// List the command is sorted in
    pub command_type: CommandType,
    /// Distance from the camera, used by the transparent list
    pub depth_key: f32,
}

impl RenderCommand {
    /// Create a new opaque render command
    pub fn opaque(
        shader: ShaderRef,
        vertex_flags: VertexFlags,
        material: MaterialRef,
        mesh: EntityId,
        surface: SurfaceId,
        world: Mat4,
    ) -> Self {
        Self {
            mesh,
            surface,
            world,
            shader,
            material,
            vertex_flags,
            command_type: CommandType::Opaque,
            depth_key: 0.0,
        }
    }

    /// Create a new transparent render command at `depth_key` from the camera
    pub fn transparent(
        shader: ShaderRef,
        vertex_flags: VertexFlags,
        material: MaterialRef,
        mesh: EntityId,
        surface: SurfaceId,
        world: Mat4,
        depth_key: f32,
    ) -> Self {
        Self {
            command_type: CommandType::Transparent,
            depth_key,
            ..Self::opaque(shader, vertex_flags, material, mesh, surface, world)
        }
    }

    /// Opaque ordering key: shader serial in the high half, material serial in the low half
    pub const fn sort_key(&self) -> u64 {
        ((self.shader.sort_id as u64) << 32) | self.material.sort_id as u64
    }

    /// Upload or rebind the mesh constants, bind skinning, and draw
    ///
    /// The first command of a mesh in a frame uploads its constants and
    /// marks the mesh; later commands of the same mesh only rebind them.
    /// Returns `false` when the mesh or the surface's GPU buffers are gone.
    pub fn execute(
        &self,
        registry: &mut ObjectRegistry,
        backend: &mut dyn RenderBackend,
        stats: &mut FrameStats,
    ) -> bool {
        if registry.surface(self.surface).and_then(|s| s.gpu()).is_none() {
            log::warn!("Surface {:?} has no GPU buffers; draw skipped", self.surface);
            return false;
        }

        let Some(entity) = registry.entity_mut(self.mesh) else {
            log::warn!("Mesh {:?} no longer exists; draw skipped", self.mesh);
            return false;
        };
        let constants = entity.matrices().to_constants();
        let Some(mesh) = entity.as_mesh_mut() else {
            log::warn!("Entity {:?} is not a mesh; draw skipped", self.mesh);
            return false;
        };

        if mesh.is_updated_this_frame() {
            backend.bind_entity_constants(self.mesh);
            stats.transform_rebinds += 1;
        } else {
            backend.upload_entity_constants(self.mesh, &constants);
            mesh.mark_updated();
            stats.transform_uploads += 1;
        }

        if mesh.has_skinning() {
            backend.bind_bone_buffer(self.mesh, mesh.bones());
        }

        if let Some(geometry) = registry.surface(self.surface).and_then(|s| s.gpu()) {
            log::trace!("Draw {:?} of {:?} ({} indices)", self.surface, self.mesh, geometry.index_count);
            backend.draw_surface(geometry, self.vertex_flags);
            stats.draws += 1;
        }
        true
    }
}
