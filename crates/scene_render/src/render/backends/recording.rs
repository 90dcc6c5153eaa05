//! # Recording Backend
//!
//! A headless [`RenderBackend`] and [`GpuDevice`] that keeps buffers in host
//! memory and appends every call it receives to a log of [`BackendCall`]s.
//! Hosts without a window use it to drive the pipeline; tests use it to
//! assert exactly which calls a frame produced and in what order.
//!
//! Binding slots come from [`RendererConfig`], so the log shows where each
//! resource would land on a real device.

use std::any::Any;
use std::collections::HashMap;

use bytemuck::bytes_of;

use crate::config::RendererConfig;
use crate::foundation::math::Mat4;
use crate::render::api::{
    BackendResult, BufferHandle, BufferUsage, GpuDevice, RenderBackend, RenderTargetHandle,
    ShaderBindMode, ShaderHandle, TextureHandle,
};
use crate::render::lighting::{LightArrayBuffer, ShadowMatrices};
use crate::render::{RenderError, RenderTarget, Viewport};
use crate::resources::{
    MaterialData, MaterialId, ShaderSource, SurfaceGpuBuffer, TextureIndexPool, TexturePool,
    TextureSlots, VertexFlags,
};
use crate::scene::{BoneMatrix, EntityConstants, EntityId};

/// Rasterizer state selected by the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterState {
    /// Back-face culling
    #[default]
    Default,
    /// Front-face culling used while rendering the shadow map
    FrontFaceCull,
}

/// One call received by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// A buffer was created
    CreateBuffer {
        /// New handle
        buffer: BufferHandle,
        /// Bind target
        usage: BufferUsage,
        /// Size in bytes
        size: usize,
    },
    /// A buffer's contents were replaced
    UpdateBuffer(BufferHandle),
    /// A buffer was freed
    ReleaseBuffer(BufferHandle),
    /// A shader program was compiled
    CompileShader(ShaderHandle),
    /// Shadow depth target bound and cleared
    BeginShadowPass {
        /// Edge of the square depth target
        size: u32,
    },
    /// Default target restored after the shadow pass
    EndShadowPass,
    /// Default framebuffer bound and cleared
    BeginMainPass(Viewport),
    /// Default framebuffer pass finished
    EndMainPass,
    /// Offscreen target bound and cleared
    BeginRttPass(RenderTargetHandle),
    /// Offscreen pass finished
    EndRttPass,
    /// Light matrices written to the shadow matrix buffer
    UpdateShadowMatrices,
    /// Shadow matrix buffer bound to the vertex stage
    BindShadowMatricesVs {
        /// Constant slot
        slot: u32,
    },
    /// Shadow map and comparison sampler bound to the pixel stage
    BindShadowResourcesPs {
        /// Sampling slot
        slot: u32,
    },
    /// Entity constants uploaded and bound
    UploadEntityConstants(EntityId),
    /// Previously uploaded entity constants bound again
    BindEntityConstants(EntityId),
    /// Skinning palette uploaded and bound
    BindBones {
        /// Skinned mesh
        entity: EntityId,
        /// Number of bone matrices
        count: usize,
    },
    /// Shader program bound
    BindShader {
        /// Program
        shader: ShaderHandle,
        /// Stages bound
        mode: ShaderBindMode,
    },
    /// Material constants uploaded and textures bound
    BindMaterial {
        /// Material
        material: MaterialId,
        /// Albedo, normal, ORM and decal textures resolved through the pool
        textures: [TextureHandle; 4],
    },
    /// Light array uploaded and bound to both stages
    UploadLights {
        /// Number of valid lights
        count: u32,
    },
    /// Indexed draw
    Draw {
        /// Indices drawn
        index_count: u32,
        /// Streams bound
        vertex_flags: VertexFlags,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Shadow,
    Main,
    Rtt,
}

/// Headless backend recording every call
#[derive(Debug)]
pub struct RecordingBackend {
    config: RendererConfig,
    ready: bool,
    calls: Vec<BackendCall>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    next_handle: u64,
    buffers_until_failure: Option<usize>,
    fail_shader_compilation: bool,
    entity_constants: HashMap<EntityId, EntityConstants>,
    light_buffer: LightArrayBuffer,
    shadow_matrices: Option<ShadowMatrices>,
    textures: TextureIndexPool,
    raster_state: RasterState,
    shadow_texture_bound: bool,
    pass: Option<Pass>,
}

impl RecordingBackend {
    /// Create a ready backend using the slots of `config`
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            ready: true,
            calls: Vec::new(),
            buffers: HashMap::new(),
            next_handle: 1,
            buffers_until_failure: None,
            fail_shader_compilation: false,
            entity_constants: HashMap::new(),
            light_buffer: LightArrayBuffer::default(),
            shadow_matrices: None,
            textures: TextureIndexPool::with_defaults(TextureHandle(1), TextureHandle(2), TextureHandle(3)),
            raster_state: RasterState::Default,
            shadow_texture_bound: false,
            pass: None,
        }
    }

    /// Simulate device loss or creation
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Make every following buffer creation fail
    pub fn set_fail_buffer_creation(&mut self, fail: bool) {
        self.buffers_until_failure = fail.then_some(0);
    }

    /// Let `count` more buffers succeed, then fail every creation after them
    pub fn fail_buffer_creation_after(&mut self, count: usize) {
        self.buffers_until_failure = Some(count);
    }

    /// Make every following shader compilation fail
    pub fn set_fail_shader_compilation(&mut self, fail: bool) {
        self.fail_shader_compilation = fail;
    }

    /// Calls received so far
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget recorded calls, keeping resources
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Number of draws recorded
    pub fn draw_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Draw { .. }))
    }

    /// Number of shader binds recorded with `mode`
    pub fn shader_bind_count(&self, mode: ShaderBindMode) -> usize {
        self.count(|call| matches!(call, BackendCall::BindShader { mode: m, .. } if *m == mode))
    }

    /// Number of material binds recorded
    pub fn material_bind_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::BindMaterial { .. }))
    }

    /// Number of constant uploads recorded for `entity`
    pub fn upload_count(&self, entity: EntityId) -> usize {
        self.count(|call| *call == BackendCall::UploadEntityConstants(entity))
    }

    /// Last constants uploaded for `entity`
    pub fn entity_constants(&self, entity: EntityId) -> Option<&EntityConstants> {
        self.entity_constants.get(&entity)
    }

    /// Last uploaded light array
    pub const fn light_buffer(&self) -> &LightArrayBuffer {
        &self.light_buffer
    }

    /// Last uploaded shadow matrices
    pub const fn shadow_matrices(&self) -> Option<&ShadowMatrices> {
        self.shadow_matrices.as_ref()
    }

    /// Current rasterizer state
    pub const fn raster_state(&self) -> RasterState {
        self.raster_state
    }

    /// Whether the shadow map is bound for sampling
    pub const fn shadow_texture_bound(&self) -> bool {
        self.shadow_texture_bound
    }

    /// Texture pool used to resolve material texture indices
    pub fn textures_mut(&mut self) -> &mut TextureIndexPool {
        &mut self.textures
    }

    /// Number of buffers not yet released
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Contents of a live buffer
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    fn record(&mut self, call: BackendCall) {
        log::trace!("{:?}", call);
        self.calls.push(call);
    }

    fn enter(&mut self, pass: Pass) {
        if let Some(current) = self.pass {
            log::warn!("{:?} pass started inside {:?} pass", pass, current);
        }
        self.pass = Some(pass);
    }

    fn leave(&mut self, pass: Pass) {
        if self.pass != Some(pass) {
            log::warn!("{:?} pass ended while {:?} was active", pass, self.pass);
        }
        self.pass = None;
    }

    fn allocate_handle(&mut self) -> BufferHandle {
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn resolve_texture(&self, index: u32) -> TextureHandle {
        self.textures
            .get(index)
            .or_else(|| self.textures.get(self.textures.white_index()))
            .unwrap_or(TextureHandle::NULL)
    }
}

impl GpuDevice for RecordingBackend {
    fn create_buffer(
        &mut self,
        data: &[u8],
        element_size: u32,
        count: u32,
        usage: BufferUsage,
    ) -> BackendResult<BufferHandle> {
        if self.buffers_until_failure == Some(0) {
            return Err(RenderError::ResourceCreationFailed("buffer creation disabled".to_string()));
        }
        let expected = element_size as usize * count as usize;
        if expected == 0 || data.len() != expected {
            return Err(RenderError::ResourceCreationFailed(format!(
                "buffer of {} x {} bytes given {} bytes",
                count,
                element_size,
                data.len()
            )));
        }

        if let Some(remaining) = self.buffers_until_failure.as_mut() {
            *remaining -= 1;
        }
        let buffer = self.allocate_handle();
        self.buffers.insert(buffer, data.to_vec());
        self.record(BackendCall::CreateBuffer { buffer, usage, size: data.len() });
        Ok(buffer)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()> {
        let Some(contents) = self.buffers.get_mut(&buffer) else {
            return Err(RenderError::UnknownHandle(format!("{buffer:?}")));
        };
        contents.clear();
        contents.extend_from_slice(data);
        self.record(BackendCall::UpdateBuffer(buffer));
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.record(BackendCall::ReleaseBuffer(buffer));
        }
    }

    fn compile_shader(&mut self, source: &ShaderSource) -> BackendResult<ShaderHandle> {
        source.validate().map_err(RenderError::ResourceCreationFailed)?;
        if self.fail_shader_compilation {
            return Err(RenderError::ResourceCreationFailed(format!("{} did not compile", source.pixel_path)));
        }
        let handle = ShaderHandle(self.next_handle);
        self.next_handle += 1;
        self.record(BackendCall::CompileShader(handle));
        Ok(handle)
    }
}

impl RenderBackend for RecordingBackend {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn begin_shadow_pass(&mut self) {
        self.enter(Pass::Shadow);
        self.raster_state = RasterState::FrontFaceCull;
        self.shadow_texture_bound = false;
        self.record(BackendCall::BeginShadowPass { size: self.config.shadow_map_size });
    }

    fn end_shadow_pass(&mut self) {
        self.leave(Pass::Shadow);
        self.raster_state = RasterState::Default;
        self.record(BackendCall::EndShadowPass);
    }

    fn begin_main_pass(&mut self, viewport: &Viewport) {
        self.enter(Pass::Main);
        self.record(BackendCall::BeginMainPass(*viewport));
    }

    fn end_main_pass(&mut self) {
        self.leave(Pass::Main);
        self.record(BackendCall::EndMainPass);
    }

    fn begin_rtt_pass(&mut self, target: &RenderTarget) {
        self.enter(Pass::Rtt);
        self.record(BackendCall::BeginRttPass(target.handle));
    }

    fn end_rtt_pass(&mut self) {
        self.leave(Pass::Rtt);
        self.record(BackendCall::EndRttPass);
    }

    fn update_shadow_matrix_buffer(&mut self, view: &Mat4, projection: &Mat4) {
        self.shadow_matrices = Some(ShadowMatrices::new(view, projection));
        self.record(BackendCall::UpdateShadowMatrices);
    }

    fn bind_shadow_matrix_constant_buffer_vs(&mut self) {
        let slot = self.config.shadow_matrix_slot;
        self.record(BackendCall::BindShadowMatricesVs { slot });
    }

    fn bind_shadow_resources_ps(&mut self) {
        self.shadow_texture_bound = true;
        let slot = self.config.shadow_texture_slot;
        self.record(BackendCall::BindShadowResourcesPs { slot });
    }

    fn upload_entity_constants(&mut self, entity: EntityId, constants: &EntityConstants) {
        log::trace!("Entity constants: {} bytes", bytes_of(constants).len());
        self.entity_constants.insert(entity, *constants);
        self.record(BackendCall::UploadEntityConstants(entity));
    }

    fn bind_entity_constants(&mut self, entity: EntityId) {
        if !self.entity_constants.contains_key(&entity) {
            log::warn!("Entity {:?} bound before its constants were uploaded", entity);
        }
        self.record(BackendCall::BindEntityConstants(entity));
    }

    fn bind_bone_buffer(&mut self, entity: EntityId, bones: &[BoneMatrix]) {
        self.record(BackendCall::BindBones { entity, count: bones.len() });
    }

    fn bind_shader(&mut self, shader: ShaderHandle, mode: ShaderBindMode) {
        self.record(BackendCall::BindShader { shader, mode });
    }

    fn bind_material(&mut self, material: MaterialId, data: &MaterialData, textures: &TextureSlots) {
        log::trace!("Material constants: {} bytes", bytes_of(data).len());
        let textures = [
            self.resolve_texture(textures.albedo),
            self.resolve_texture(textures.normal),
            self.resolve_texture(textures.orm),
            self.resolve_texture(textures.decal),
        ];
        self.record(BackendCall::BindMaterial { material, textures });
    }

    fn upload_light_array(&mut self, lights: &LightArrayBuffer) {
        self.light_buffer = *lights;
        self.record(BackendCall::UploadLights { count: lights.light_count });
    }

    fn draw_surface(&mut self, geometry: &SurfaceGpuBuffer, vertex_flags: VertexFlags) {
        let missing = vertex_flags - geometry.uploaded_flags();
        if !missing.is_empty() {
            log::warn!("Draw requests streams {:?} that were never uploaded", missing);
        }
        self.record(BackendCall::Draw { index_count: geometry.index_count, vertex_flags });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RecordingBackend {
        RecordingBackend::new(RendererConfig::default())
    }

    #[test]
    fn test_create_buffer_checks_size() {
        let mut backend = backend();
        let data = [0u8; 24];
        assert!(backend.create_buffer(&data, 12, 2, BufferUsage::VERTEX).is_ok());
        assert!(backend.create_buffer(&data, 12, 3, BufferUsage::VERTEX).is_err());
        assert!(backend.create_buffer(&[], 12, 0, BufferUsage::VERTEX).is_err());
        assert_eq!(backend.live_buffer_count(), 1);
    }

    #[test]
    fn test_buffer_update_and_release() {
        let mut backend = backend();
        let buffer = backend.create_buffer(&[1, 2, 3, 4], 4, 1, BufferUsage::CONSTANT).unwrap();
        backend.update_buffer(buffer, &[5, 6, 7, 8]).unwrap();
        assert_eq!(backend.buffer_data(buffer), Some(&[5u8, 6, 7, 8][..]));

        backend.release_buffer(buffer);
        assert_eq!(backend.live_buffer_count(), 0);
        assert!(backend.update_buffer(buffer, &[0; 4]).is_err());
    }

    #[test]
    fn test_failed_creation_toggle() {
        let mut backend = backend();
        backend.set_fail_buffer_creation(true);
        let result = backend.create_buffer(&[0; 4], 4, 1, BufferUsage::INDEX);
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
    }

    #[test]
    fn test_buffer_creation_fails_after_count() {
        let mut backend = backend();
        backend.fail_buffer_creation_after(2);
        assert!(backend.create_buffer(&[0; 4], 4, 1, BufferUsage::VERTEX).is_ok());
        assert!(backend.create_buffer(&[0; 4], 4, 1, BufferUsage::VERTEX).is_ok());
        assert!(backend.create_buffer(&[0; 4], 4, 1, BufferUsage::VERTEX).is_err());
        assert!(backend.create_buffer(&[0; 4], 4, 1, BufferUsage::VERTEX).is_err());
        assert_eq!(backend.live_buffer_count(), 2);

        backend.set_fail_buffer_creation(false);
        assert!(backend.create_buffer(&[0; 4], 4, 1, BufferUsage::VERTEX).is_ok());
    }

    #[test]
    fn test_shadow_pass_state() {
        let mut backend = backend();
        backend.bind_shadow_resources_ps();
        backend.begin_shadow_pass();
        assert_eq!(backend.raster_state(), RasterState::FrontFaceCull);
        assert!(!backend.shadow_texture_bound());

        backend.end_shadow_pass();
        assert_eq!(backend.raster_state(), RasterState::Default);
        assert_eq!(
            backend.calls().last(),
            Some(&BackendCall::EndShadowPass)
        );
    }

    #[test]
    fn test_material_textures_resolve_through_pool() {
        let mut backend = backend();
        let albedo = backend.textures_mut().get_or_add(TextureHandle(40));
        let textures = TextureSlots { albedo, ..TextureSlots::default() };
        let material = slotmap::SlotMap::<MaterialId, ()>::with_key().insert(());

        backend.bind_material(material, &MaterialData::default(), &textures);

        assert_eq!(
            backend.calls()[0],
            BackendCall::BindMaterial {
                material,
                textures: [TextureHandle(40), TextureHandle(2), TextureHandle(3), TextureHandle(1)],
            }
        );
    }
}
