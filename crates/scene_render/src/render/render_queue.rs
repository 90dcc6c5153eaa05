//! # Render Queue System
//!
//! Collects the frame's render commands and orders them for submission.
//!
//! ## Architecture
//!
//! - **Opaque list**: stable-sorted by [`RenderCommand::sort_key`] so draws
//!   sharing a shader, and within it a material, end up adjacent and the
//!   flush changes bindings as rarely as possible. This is not a depth sort.
//! - **Transparent list**: sorted back-to-front by distance from the camera
//!   and flushed after the opaque list.

use crate::foundation::math::Mat4;
use crate::render::command::{CommandType, MaterialRef, RenderCommand, ShaderRef};
use crate::resources::{SurfaceId, VertexFlags};
use crate::scene::EntityId;

/// Collection of render commands organized for efficient GPU submission
#[derive(Debug, Clone)]
pub struct RenderQueue {
    /// Opaque commands grouped by shader then material
    opaque_commands: Vec<RenderCommand>,

    /// Transparent commands sorted back-to-front (far to near)
    transparent_commands: Vec<RenderCommand>,
}

impl RenderQueue {
    /// Create a new empty render queue
    pub fn new() -> Self {
        Self {
            opaque_commands: Vec::new(),
            transparent_commands: Vec::new(),
        }
    }

    /// Create a render queue with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            opaque_commands: Vec::with_capacity(capacity),
            transparent_commands: Vec::with_capacity(capacity / 4),
        }
    }

    /// Append one opaque draw
    pub fn submit(
        &mut self,
        shader: ShaderRef,
        vertex_flags: VertexFlags,
        material: MaterialRef,
        mesh: EntityId,
        surface: SurfaceId,
        world: Mat4,
    ) {
        self.add_command(RenderCommand::opaque(shader, vertex_flags, material, mesh, surface, world))
    }

    /// Add a render command to the list matching its type
    pub fn add_command(&mut self, command: RenderCommand) {
        match command.command_type {
            CommandType::Opaque => self.opaque_commands.push(command),
            CommandType::Transparent => self.transparent_commands.push(command),
        }
    }

    /// Sort both lists for submission
    ///
    /// Both sorts are stable, so equal keys keep their submission order and
    /// sorting the same input twice gives the same result.
    pub fn sort(&mut self) {
        self.opaque_commands.sort_by_key(RenderCommand::sort_key);
        self.transparent_commands
            .sort_by(|a, b| b.depth_key.total_cmp(&a.depth_key));
    }

    /// Opaque commands in sorted order
    pub fn opaque_commands(&self) -> &[RenderCommand] {
        &self.opaque_commands
    }

    /// Transparent commands in sorted order
    pub fn transparent_commands(&self) -> &[RenderCommand] {
        &self.transparent_commands
    }

    /// Every command in flush order: opaque first, then transparent
    pub fn iter(&self) -> impl Iterator<Item = &RenderCommand> {
        self.opaque_commands.iter().chain(self.transparent_commands.iter())
    }

    /// Number of distinct shaders in the opaque list
    pub fn distinct_shader_count(&self) -> usize {
        let mut shaders: Vec<u32> = self.opaque_commands.iter().map(|c| c.shader.sort_id).collect();
        shaders.sort_unstable();
        shaders.dedup();
        shaders.len()
    }

    /// Get total number of commands
    pub fn command_count(&self) -> usize {
        self.opaque_commands.len() + self.transparent_commands.len()
    }

    /// Clear all commands for next frame
    pub fn clear(&mut self) {
        self.opaque_commands.clear();
        self.transparent_commands.clear();
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.opaque_commands.is_empty() && self.transparent_commands.is_empty()
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}
