//! Backend abstraction traits for the rendering system
//!
//! This module defines the traits that rendering backends must implement
//! to provide a consistent interface for the render manager. The manager
//! only ever calls through these traits, so swapping the graphics API means
//! writing a new implementation, not touching orchestration.

use bitflags::bitflags;

use crate::foundation::math::Mat4;
use crate::render::lighting::LightArrayBuffer;
use crate::render::{RenderResult, RenderTarget, Viewport};
use crate::resources::{MaterialData, MaterialId, ShaderSource, SurfaceGpuBuffer, TextureSlots, VertexFlags};
use crate::scene::{BoneMatrix, EntityConstants, EntityId};

/// Result type for backend operations
pub type BackendResult<T> = RenderResult<T>;

/// Handle to a GPU buffer owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a compiled shader program (vertex + pixel stage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u64);

/// Handle to a texture view owned by the host's texture loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

impl TextureHandle {
    /// The invalid handle; texture pools map it to their white fallback
    pub const NULL: Self = Self(0);

    /// Whether the handle refers to a texture at all
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Handle to an offscreen color target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(pub u64);

bitflags! {
    /// How a buffer will be bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex stream
        const VERTEX = 1 << 0;
        /// Triangle indices
        const INDEX = 1 << 1;
        /// Shader constants
        const CONSTANT = 1 << 2;
    }
}

/// Which stages of a shader program to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderBindMode {
    /// Vertex and pixel stage
    Full,
    /// Vertex stage only, pixel stage unbound (depth-only rendering)
    VertexOnly,
}

/// GPU resource provider
///
/// Creation calls report failure as [`RenderError::ResourceCreationFailed`]
/// so the creating operation can hand back an invalid handle instead of
/// aborting.
///
/// [`RenderError::ResourceCreationFailed`]: crate::render::RenderError::ResourceCreationFailed
pub trait GpuDevice {
    /// Create a buffer holding `count` elements of `element_size` bytes
    fn create_buffer(
        &mut self,
        data: &[u8],
        element_size: u32,
        count: u32,
        usage: BufferUsage,
    ) -> BackendResult<BufferHandle>;

    /// Overwrite the contents of an existing buffer
    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()>;

    /// Free a buffer; unknown handles are ignored
    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Compile a shader program from its two stage sources
    fn compile_shader(&mut self, source: &ShaderSource) -> BackendResult<ShaderHandle>;
}

/// Main rendering backend trait
///
/// Pass entry points must be called in matched pairs and never nest:
/// shadow pass, then main pass or render-to-texture pass. Calls that fail
/// inside the backend are logged there; the frame keeps going.
pub trait RenderBackend {
    /// Whether the device and its per-frame resources exist
    fn is_ready(&self) -> bool;

    /// Bind and clear the shadow depth target, switch to front-face culling
    /// and unbind the shadow map from its sampling slot
    fn begin_shadow_pass(&mut self);

    /// Restore the default target, viewport and rasterization state
    fn end_shadow_pass(&mut self);

    /// Bind and clear the default framebuffer
    fn begin_main_pass(&mut self, viewport: &Viewport);

    /// Finish the default framebuffer pass
    fn end_main_pass(&mut self);

    /// Bind and clear an offscreen color target
    fn begin_rtt_pass(&mut self, target: &RenderTarget);

    /// Finish the offscreen pass and restore the default framebuffer
    fn end_rtt_pass(&mut self);

    /// Write the light view and projection into the shadow matrix buffer
    fn update_shadow_matrix_buffer(&mut self, view: &Mat4, projection: &Mat4);

    /// Bind the shadow matrix buffer to the vertex stage
    fn bind_shadow_matrix_constant_buffer_vs(&mut self);

    /// Bind the shadow map and its comparison sampler to the pixel stage
    fn bind_shadow_resources_ps(&mut self);

    /// Upload an entity's world/view/projection block and bind it
    fn upload_entity_constants(&mut self, entity: EntityId, constants: &EntityConstants);

    /// Bind the entity's previously uploaded constants without re-uploading
    fn bind_entity_constants(&mut self, entity: EntityId);

    /// Upload and bind a skinning palette
    fn bind_bone_buffer(&mut self, entity: EntityId, bones: &[BoneMatrix]);

    /// Bind a shader program
    fn bind_shader(&mut self, shader: ShaderHandle, mode: ShaderBindMode);

    /// Upload a material's constants and bind its textures
    fn bind_material(&mut self, material: MaterialId, data: &MaterialData, textures: &TextureSlots);

    /// Upload the per-frame light array and bind it to both stages
    fn upload_light_array(&mut self, lights: &LightArrayBuffer);

    /// Bind the streams the shader consumes and issue an indexed draw
    fn draw_surface(&mut self, geometry: &SurfaceGpuBuffer, vertex_flags: VertexFlags);

    /// Downcast to concrete backend type for inspection
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to mutable concrete backend type
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
