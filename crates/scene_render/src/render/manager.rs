//! # Render Manager
//!
//! Top-level frame orchestration. One call to [`RenderManager::render_scene`]
//! runs, strictly in this order:
//!
//! 1. the transform update of the registry
//! 2. the shadow pass from the directional light
//! 3. the main pass: begin, bind shadow resources, upload lights, build the
//!    queue, flush it, end
//!
//! The manager only calls through [`RenderBackend`]; it never touches a
//! graphics API. Failures inside a frame are logged and counted in
//! [`FrameStats`], never returned.

use crate::config::RendererConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::{RenderBackend, ShaderBindMode};
use crate::render::command::{MaterialRef, RenderCommand, ShaderRef};
use crate::render::lighting::LightAggregator;
use crate::render::render_queue::RenderQueue;
use crate::render::stats::FrameStats;
use crate::render::target::RenderTarget;
use crate::scene::{Entity, EntityId, LayerMask, MatrixSet, ObjectRegistry};

/// Render target plus the camera used while rendering into it
#[derive(Debug, Clone)]
struct RttBinding {
    target: RenderTarget,
    camera: Option<EntityId>,
}

/// Frame orchestrator owning the backend, the queue and the light buffer
pub struct RenderManager {
    backend: Box<dyn RenderBackend>,
    config: RendererConfig,
    queue: RenderQueue,
    lights: LightAggregator,
    camera: Option<EntityId>,
    directional_light: Option<EntityId>,
    rtt: Option<RttBinding>,
    stats: FrameStats,
    last_logged_shader_count: Option<usize>,
}

impl std::fmt::Debug for RenderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderManager")
            .field("camera", &self.camera)
            .field("directional_light", &self.directional_light)
            .field("rtt", &self.rtt)
            .field("queued", &self.queue.command_count())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl RenderManager {
    /// Create a manager driving `backend`
    pub fn new(backend: Box<dyn RenderBackend>, config: RendererConfig) -> Self {
        log::info!(
            "Render manager created (shadows {}, shadow map {}px)",
            if config.shadows_enabled { "on" } else { "off" },
            config.shadow_map_size
        );
        Self {
            backend,
            config,
            queue: RenderQueue::with_capacity(256),
            lights: LightAggregator::new(),
            camera: None,
            directional_light: None,
            rtt: None,
            stats: FrameStats::default(),
            last_logged_shader_count: None,
        }
    }

    // Frame inputs

    /// Set the camera the main pass renders from
    pub fn set_camera(&mut self, camera: Option<EntityId>) {
        self.camera = camera;
    }

    /// Camera the main pass renders from
    pub const fn camera(&self) -> Option<EntityId> {
        self.camera
    }

    /// Set the light the shadow map is rendered from
    pub fn set_directional_light(&mut self, light: Option<EntityId>) {
        self.directional_light = light;
    }

    /// Light the shadow map is rendered from
    pub const fn directional_light(&self) -> Option<EntityId> {
        self.directional_light
    }

    /// Redirect the main pass into `target`, optionally from another camera
    ///
    /// `None` restores rendering to the default framebuffer. Without an RTT
    /// camera the regular camera is used.
    pub fn set_rtt_target(&mut self, target: Option<RenderTarget>, camera: Option<EntityId>) {
        self.rtt = target.map(|target| RttBinding { target, camera });
    }

    /// Active render target, if any
    pub fn rtt_target(&self) -> Option<&RenderTarget> {
        self.rtt.as_ref().map(|rtt| &rtt.target)
    }

    // Accessors

    /// Backend the manager drives
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Mutable access to the backend, e.g. as the GPU device for uploads
    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Statistics of the last frame
    pub const fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Queue built by the last frame
    pub const fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Light buffer built by the last frame
    pub const fn lights(&self) -> &LightAggregator {
        &self.lights
    }

    /// Renderer settings
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    // Frame

    /// Render one frame of `registry`
    ///
    /// Does nothing when the backend is not ready or no camera is set. With
    /// a render target set, both passes use the RTT camera when one was
    /// given; the regular camera is left untouched either way.
    pub fn render_scene(&mut self, registry: &mut ObjectRegistry) {
        self.stats = FrameStats::default();

        if !self.backend.is_ready() {
            log::warn!("Backend not ready; frame skipped");
            return;
        }

        registry.update_transforms();

        let is_camera = |id: &EntityId| registry.camera(*id).is_some();
        let frame_camera = self
            .rtt
            .as_ref()
            .and_then(|rtt| rtt.camera)
            .filter(is_camera)
            .or(self.camera);
        let Some(camera) = frame_camera.filter(is_camera) else {
            log::debug!("No camera set; frame skipped");
            return;
        };

        self.render_shadow_pass(registry, camera);
        self.render_main_pass(registry, camera);

        log::trace!("Frame done: {:?}", self.stats);
    }

    /// Draw shadow casters into the shadow map from the directional light
    ///
    /// Skipped when shadows are disabled or the light is unset or inactive.
    fn render_shadow_pass(&mut self, registry: &ObjectRegistry, camera: EntityId) {
        if !self.config.shadows_enabled || registry.entity(camera).is_none() {
            return;
        }
        let Some((light_view, light_projection)) = self.shadow_light_matrices(registry) else {
            return;
        };

        log::debug!("Shadow pass begin");
        self.backend.begin_shadow_pass();
        self.backend.update_shadow_matrix_buffer(&light_view, &light_projection);
        self.backend.bind_shadow_matrix_constant_buffer_vs();

        for &mesh_id in registry.meshes() {
            let Some(entity) = registry.entity(mesh_id) else {
                continue;
            };
            if !entity.is_active() || !entity.is_visible() || !entity.cast_shadows() {
                continue;
            }
            let Some(mesh) = entity.as_mesh() else {
                continue;
            };

            let mut uploaded = false;
            for &surface_id in mesh.surfaces() {
                let Some(surface) = registry.surface(surface_id) else {
                    continue;
                };
                if !surface.is_active() {
                    continue;
                }
                let Some(geometry) = surface.gpu() else {
                    continue;
                };
                let Some(material) = registry.resolve_material(surface_id).and_then(|id| registry.material(id)) else {
                    continue;
                };
                if !material.cast_shadows() {
                    continue;
                }
                let Some(shader) = material.shader().and_then(|id| registry.shader(id)) else {
                    continue;
                };

                if !uploaded {
                    let constants = MatrixSet {
                        world: *entity.world_matrix(),
                        view: light_view,
                        projection: light_projection,
                    }
                    .to_constants();
                    self.backend.upload_entity_constants(mesh_id, &constants);
                    uploaded = true;
                }

                self.backend.bind_shader(shader.handle(), ShaderBindMode::VertexOnly);
                self.backend.draw_surface(geometry, shader.vertex_flags());
                self.stats.shadow_draws += 1;
            }
        }

        self.backend.end_shadow_pass();
        log::debug!("Shadow pass end: {} draws", self.stats.shadow_draws);
    }

    /// Render the scene from `camera` into the default framebuffer or the
    /// active render target
    fn render_main_pass(&mut self, registry: &mut ObjectRegistry, camera: EntityId) {
        let Some(camera_entity) = registry.entity(camera) else {
            return;
        };
        let viewport = *camera_entity.viewport();

        log::debug!("Main pass begin");
        match &self.rtt {
            Some(rtt) => self.backend.begin_rtt_pass(&rtt.target),
            None => self.backend.begin_main_pass(&viewport),
        }

        self.backend.bind_shadow_resources_ps();
        if self.config.shadows_enabled {
            if let Some((view, projection)) = self.shadow_light_matrices(registry) {
                self.backend.update_shadow_matrix_buffer(&view, &projection);
                self.backend.bind_shadow_matrix_constant_buffer_vs();
            }
        }

        let light_count = self.lights.update(registry, self.backend.as_mut());
        log::trace!("{} lights uploaded", light_count);

        self.build_render_queue(registry, camera);
        self.flush_render_queue(registry, camera);

        if self.rtt.is_some() {
            self.backend.end_rtt_pass();
        } else {
            self.backend.end_main_pass();
        }
        log::debug!("Main pass end: {} draws", self.stats.draws);
    }

    /// View and projection of the directional light, when it can cast
    fn shadow_light_matrices(&self, registry: &ObjectRegistry) -> Option<(Mat4, Mat4)> {
        let entity = registry.entity(self.directional_light?)?;
        if !entity.is_active() {
            return None;
        }
        let light = entity.as_light()?;
        Some((light.view_matrix(), light.projection_matrix()))
    }

    /// Rebuild the queue from every mesh `camera` can see, then sort it
    ///
    /// Clears the per-frame upload flag of every mesh first.
    pub fn build_render_queue(&mut self, registry: &mut ObjectRegistry, camera: EntityId) {
        registry.reset_frame_flags();
        self.queue.clear();

        let cull_mask = registry.camera(camera).map_or(LayerMask::ALL, |c| c.cull_mask());
        let camera_position = registry
            .entity(camera)
            .map(Entity::world_position)
            .unwrap_or_else(Vec3::zeros);

        for &mesh_id in registry.meshes() {
            let Some(entity) = registry.entity(mesh_id) else {
                continue;
            };
            if !entity.is_active() || !entity.is_visible() {
                continue;
            }
            if !entity.layer_mask().intersects(cull_mask) {
                self.stats.culled_meshes += 1;
                continue;
            }
            let Some(mesh) = entity.as_mesh() else {
                continue;
            };

            let world = *entity.world_matrix();
            let distance = (entity.world_position() - camera_position).norm();

            for &surface_id in mesh.surfaces() {
                if !registry.surface(surface_id).is_some_and(|s| s.is_active()) {
                    continue;
                }
                let Some(material_id) = registry.resolve_material(surface_id) else {
                    continue;
                };
                let Some(material) = registry.material(material_id) else {
                    continue;
                };
                let Some(shader_id) = material.shader() else {
                    continue;
                };
                let (Some(shader), Some(vertex_flags)) =
                    (registry.shader_ref(shader_id), registry.shader(shader_id).map(|s| s.vertex_flags()))
                else {
                    continue;
                };
                let Some(material_ref) = registry.material_ref(material_id) else {
                    continue;
                };

                if material.is_transparent() {
                    self.queue.add_command(RenderCommand::transparent(
                        shader,
                        vertex_flags,
                        material_ref,
                        mesh_id,
                        surface_id,
                        world,
                        distance,
                    ));
                } else {
                    self.queue.submit(shader, vertex_flags, material_ref, mesh_id, surface_id, world);
                }
            }
        }

        self.queue.sort();
        self.log_queue(registry);
    }

    /// Dump the queue grouping when the number of shaders in it changes
    fn log_queue(&mut self, registry: &ObjectRegistry) {
        if !self.config.log_queue_changes {
            return;
        }
        let shader_count = self.queue.distinct_shader_count();
        if self.last_logged_shader_count == Some(shader_count) {
            return;
        }
        self.last_logged_shader_count = Some(shader_count);

        log::debug!("=== Render queue: {} shader(s) ===", shader_count);
        let mut previous: Option<(ShaderRef, MaterialRef)> = None;
        for command in self.queue.opaque_commands() {
            if previous.map(|(s, _)| s) != Some(command.shader) {
                let name = registry
                    .shader(command.shader.id)
                    .and_then(|s| s.name.as_deref())
                    .unwrap_or("");
                log::debug!("  shader #{} {}", command.shader.sort_id, name);
            }
            if previous != Some((command.shader, command.material)) {
                log::debug!("    material #{}", command.material.sort_id);
            }
            log::debug!("      mesh {:?} surface {:?}", command.mesh, command.surface);
            previous = Some((command.shader, command.material));
        }
        log::debug!(
            "  {} opaque + {} transparent draw(s)",
            self.queue.opaque_commands().len(),
            self.queue.transparent_commands().len()
        );
    }

    /// Execute the queue in sorted order, binding shaders and materials
    /// only when they change
    pub fn flush_render_queue(&mut self, registry: &mut ObjectRegistry, camera: EntityId) {
        let Some(camera_entity) = registry.entity(camera) else {
            return;
        };
        let view = camera_entity.matrices().view;
        let projection = camera_entity.matrices().projection;

        let mut bound_shader = None;
        let mut bound_material = None;

        for command in self.queue.iter() {
            let Some(shader) = registry.shader(command.shader.id) else {
                log::warn!("Shader {:?} no longer exists; draw skipped", command.shader.id);
                self.stats.skipped_draws += 1;
                continue;
            };
            let Some(material) = registry.material(command.material.id) else {
                log::warn!("Material {:?} no longer exists; draw skipped", command.material.id);
                self.stats.skipped_draws += 1;
                continue;
            };
            if registry.mesh(command.mesh).is_none() || registry.surface(command.surface).is_none() {
                log::warn!("Mesh {:?} or surface {:?} no longer exists; draw skipped", command.mesh, command.surface);
                self.stats.skipped_draws += 1;
                continue;
            }

            if bound_shader != Some(command.shader.id) {
                self.backend.bind_shader(shader.handle(), ShaderBindMode::Full);
                bound_shader = Some(command.shader.id);
                self.stats.shader_binds += 1;
            }
            if bound_material != Some(command.material.id) {
                self.backend.bind_material(command.material.id, material.data(), material.textures());
                bound_material = Some(command.material.id);
                self.stats.material_binds += 1;
            }

            if let Some(entity) = registry.entity_mut(command.mesh) {
                entity.matrices = MatrixSet { world: command.world, view, projection };
            }
            if !command.execute(registry, self.backend.as_mut(), &mut self.stats) {
                self.stats.skipped_draws += 1;
            }
        }
    }
}
