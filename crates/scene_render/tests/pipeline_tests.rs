//! Frame pipeline tests driven through the recording backend
//!
//! Each test builds a small scene, renders it and inspects the calls the
//! backend received.

use approx::assert_relative_eq;
use scene_render::foundation::math::{utils, Mat4, Vec3};
use scene_render::prelude::*;
use scene_render::render::ShaderBindMode;

struct Fixture {
    manager: RenderManager,
    registry: ObjectRegistry,
    shader: ShaderId,
    camera: EntityId,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    fn with_config(config: RendererConfig) -> Self {
        let manager = RenderManager::new(Box::new(RecordingBackend::new(config.clone())), config);
        let mut registry = ObjectRegistry::new();
        let shader = registry.create_shader(ShaderHandle(100), VertexFlags::POSITION | VertexFlags::NORMAL);
        let camera = registry.create_camera();
        let mut fixture = Self { manager, registry, shader, camera };
        fixture.manager.set_camera(Some(camera));
        fixture
    }

    fn device(&mut self) -> &mut RecordingBackend {
        self.manager
            .backend_mut()
            .as_any_mut()
            .downcast_mut::<RecordingBackend>()
            .unwrap()
    }

    fn backend(&self) -> &RecordingBackend {
        self.manager.backend().as_any().downcast_ref::<RecordingBackend>().unwrap()
    }

    fn material(&mut self) -> MaterialId {
        self.registry.create_material(Some(self.shader))
    }

    /// Mesh with `surfaces` uploaded triangles drawn with `material`
    fn mesh(&mut self, material: MaterialId, surfaces: usize) -> EntityId {
        let mesh = self.registry.create_mesh(Some(material)).unwrap();
        for _ in 0..surfaces {
            let surface = self.triangle(mesh);
            self.upload(surface).unwrap();
        }
        mesh
    }

    /// Triangle surface attached to `mesh`, not yet uploaded
    fn triangle(&mut self, mesh: EntityId) -> SurfaceId {
        let surface = self.registry.create_surface();
        let s = self.registry.surface_mut(surface).unwrap();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            let i = s.add_vertex(x, y, 0.0) as usize;
            s.set_vertex_normal(i, 0.0, 0.0, -1.0);
        }
        s.add_triangle(0, 1, 2);
        assert!(self.registry.add_surface_to_mesh(mesh, surface));
        surface
    }

    fn upload(&mut self, surface: SurfaceId) -> RenderResult<()> {
        let device = self
            .manager
            .backend_mut()
            .as_any_mut()
            .downcast_mut::<RecordingBackend>()
            .unwrap();
        self.registry.upload_surface(surface, device)
    }

    fn light(&mut self) -> EntityId {
        let light = self.registry.create_light(LightType::Directional);
        self.registry
            .entity_mut(light)
            .unwrap()
            .set_position(Vec3::new(0.0, 20.0, 0.0));
        self.manager.set_directional_light(Some(light));
        light
    }

    fn render(&mut self) {
        self.device().clear_calls();
        self.manager.render_scene(&mut self.registry);
    }

    fn position(&self, call: &BackendCall) -> usize {
        self.backend()
            .calls()
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{call:?} not recorded"))
    }
}

#[test]
fn visibility_follows_active_visible_and_layers() {
    let mut fx = Fixture::new();
    let material = fx.material();
    let cases = [
        (true, true, LayerMask::DEFAULT, true),
        (false, true, LayerMask::DEFAULT, false),
        (true, false, LayerMask::DEFAULT, false),
        (true, true, LayerMask::UI, false),
        (true, true, LayerMask::UI | LayerMask::FX, true),
    ];
    fx.registry
        .camera_mut(fx.camera)
        .unwrap()
        .set_cull_mask(LayerMask::DEFAULT | LayerMask::FX);

    let meshes: Vec<EntityId> = cases
        .iter()
        .map(|&(active, visible, layers, _)| {
            let mesh = fx.mesh(material, 1);
            let entity = fx.registry.entity_mut(mesh).unwrap();
            entity.set_active(active);
            entity.set_visible(visible);
            entity.set_layer_mask(layers);
            mesh
        })
        .collect();

    fx.render();

    let queued: Vec<EntityId> = fx.manager.queue().iter().map(|c| c.mesh).collect();
    for (mesh, &(_, _, _, expected)) in meshes.iter().zip(cases.iter()) {
        assert_eq!(queued.contains(mesh), expected, "mesh {mesh:?}");
    }
    assert_eq!(fx.manager.stats().culled_meshes, 1);
}

#[test]
fn camera_excluding_default_layer_queues_nothing() {
    let mut fx = Fixture::new();
    let material = fx.material();
    fx.mesh(material, 1);
    fx.registry
        .camera_mut(fx.camera)
        .unwrap()
        .set_cull_mask(LayerMask::ALL & !LayerMask::DEFAULT);

    fx.render();

    assert!(fx.manager.queue().is_empty());
    assert_eq!(fx.backend().draw_count(), 0);
}

#[test]
fn multi_surface_mesh_uploads_constants_once_per_frame() {
    let mut fx = Fixture::new();
    let material = fx.material();
    let mesh = fx.mesh(material, 3);

    for _ in 0..2 {
        fx.render();

        assert_eq!(fx.backend().upload_count(mesh), 1);
        assert_eq!(
            fx.backend().count(|c| *c == BackendCall::BindEntityConstants(mesh)),
            2
        );
        assert_eq!(fx.backend().draw_count(), 3);
        assert_eq!(fx.manager.stats().transform_uploads, 1);
        assert_eq!(fx.manager.stats().transform_rebinds, 2);
    }
}

#[test]
fn shared_shader_binds_once_and_each_material_once() {
    let mut fx = Fixture::new();
    let first = fx.material();
    let second = fx.material();
    fx.mesh(second, 1);
    fx.mesh(first, 1);
    fx.mesh(second, 1);

    fx.render();

    assert_eq!(fx.backend().shader_bind_count(ShaderBindMode::Full), 1);
    assert_eq!(fx.backend().material_bind_count(), 2);
    assert_eq!(fx.manager.stats().shader_binds, 1);
    assert_eq!(fx.manager.stats().material_binds, 2);
    assert_eq!(fx.backend().draw_count(), 3);
}

#[test]
fn queue_order_is_deterministic_across_frames() {
    let mut fx = Fixture::new();
    let other_shader = fx.registry.create_shader(ShaderHandle(200), VertexFlags::POSITION);
    let a = fx.material();
    let b = fx.registry.create_material(Some(other_shader));
    for material in [b, a, b, a, a] {
        fx.mesh(material, 1);
    }

    fx.render();
    let first: Vec<SurfaceId> = fx.manager.queue().iter().map(|c| c.surface).collect();
    fx.render();
    let second: Vec<SurfaceId> = fx.manager.queue().iter().map(|c| c.surface).collect();

    assert_eq!(first, second);
    let keys: Vec<u64> = fx.manager.queue().opaque_commands().iter().map(|c| c.sort_key()).collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn shadow_pass_draws_single_caster_once() {
    let mut fx = Fixture::new();
    let material = fx.material();
    fx.mesh(material, 1);
    fx.light();

    fx.render();

    assert_eq!(fx.manager.stats().shadow_draws, 1);
    assert_eq!(fx.backend().shader_bind_count(ShaderBindMode::VertexOnly), 1);
    assert_eq!(fx.backend().draw_count(), 2);
}

#[test]
fn shadow_pass_excludes_non_casters() {
    let mut fx = Fixture::new();
    let casting = fx.material();
    let non_casting = fx.material();
    fx.registry.material_mut(non_casting).unwrap().set_cast_shadows(false);

    fx.mesh(casting, 1);
    let hidden_from_light = fx.mesh(casting, 1);
    fx.registry
        .entity_mut(hidden_from_light)
        .unwrap()
        .set_cast_shadows(false);
    fx.mesh(non_casting, 1);
    fx.light();

    fx.render();

    assert_eq!(fx.manager.stats().shadow_draws, 1);
    assert_eq!(fx.manager.stats().draws, 3);
}

#[test]
fn inactive_light_disables_shadow_pass() {
    let mut fx = Fixture::new();
    let material = fx.material();
    fx.mesh(material, 1);
    let light = fx.light();
    fx.registry.entity_mut(light).unwrap().set_active(false);

    fx.render();

    assert_eq!(fx.backend().count(|c| matches!(c, BackendCall::BeginShadowPass { .. })), 0);
    assert_eq!(fx.backend().light_buffer().light_count, 0);
}

#[test]
fn passes_run_in_order() {
    let mut fx = Fixture::new();
    let material = fx.material();
    fx.mesh(material, 1);
    fx.light();

    fx.render();

    let begin_shadow = fx.position(&BackendCall::BeginShadowPass { size: 2048 });
    let end_shadow = fx.position(&BackendCall::EndShadowPass);
    let bind_shadow = fx.position(&BackendCall::BindShadowResourcesPs { slot: 7 });
    let lights = fx.position(&BackendCall::UploadLights { count: 1 });
    let end_main = fx.position(&BackendCall::EndMainPass);
    let calls = fx.backend().calls();
    let begin_main = calls
        .iter()
        .position(|c| matches!(c, BackendCall::BeginMainPass(_)))
        .unwrap();
    let last_draw = calls
        .iter()
        .rposition(|c| matches!(c, BackendCall::Draw { .. }))
        .unwrap();

    assert!(begin_shadow < end_shadow);
    assert!(end_shadow < begin_main);
    assert!(begin_main < bind_shadow);
    assert!(bind_shadow < lights);
    assert!(lights < last_draw);
    assert!(last_draw < end_main);
    assert_eq!(
        fx.backend().count(|c| *c == BackendCall::BindShadowMatricesVs { slot: 3 }),
        2
    );
}

#[test]
fn shadow_matrices_come_from_the_light() {
    let mut fx = Fixture::new();
    let material = fx.material();
    fx.mesh(material, 1);
    let light = fx.light();

    fx.render();

    let light_data = fx.registry.light(light).unwrap();
    let expected_view = utils::to_gpu(&light_data.view_matrix());
    let recorded = fx.backend().shadow_matrices().unwrap();
    for (row, expected) in recorded.view.iter().zip(expected_view.iter()) {
        for (a, b) in row.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }
}

#[test]
fn rtt_uses_its_camera_and_keeps_the_main_camera() {
    let mut fx = Fixture::new();
    let material = fx.material();
    let mesh = fx.mesh(material, 1);
    let rtt_camera = fx.registry.create_camera();
    fx.registry
        .entity_mut(rtt_camera)
        .unwrap()
        .set_position(Vec3::new(0.0, 0.0, -10.0));
    let target = RenderTarget::new(RenderTargetHandle(5), 256, 256);
    fx.manager.set_rtt_target(Some(target), Some(rtt_camera));

    fx.render();

    assert_eq!(fx.manager.camera(), Some(fx.camera));
    assert_eq!(fx.backend().count(|c| *c == BackendCall::BeginRttPass(RenderTargetHandle(5))), 1);
    assert_eq!(fx.backend().count(|c| *c == BackendCall::EndRttPass), 1);
    assert_eq!(fx.backend().count(|c| matches!(c, BackendCall::BeginMainPass(_))), 0);

    let rtt_view = utils::to_gpu(&fx.registry.entity(rtt_camera).unwrap().matrices().view);
    assert_eq!(fx.backend().entity_constants(mesh).unwrap().view, rtt_view);

    fx.manager.set_rtt_target(None, None);
    fx.render();
    assert_eq!(fx.backend().count(|c| matches!(c, BackendCall::BeginMainPass(_))), 1);
    let main_view = utils::to_gpu(&fx.registry.entity(fx.camera).unwrap().matrices().view);
    assert_eq!(fx.backend().entity_constants(mesh).unwrap().view, main_view);
}

#[test]
fn deleted_rtt_camera_falls_back_to_main_camera() {
    let mut fx = Fixture::new();
    let material = fx.material();
    let mesh = fx.mesh(material, 1);
    let rtt_camera = fx.registry.create_camera();
    assert!(fx.registry.delete_entity(rtt_camera));
    fx.manager
        .set_rtt_target(Some(RenderTarget::new(RenderTargetHandle(6), 128, 128)), Some(rtt_camera));

    fx.render();

    assert_eq!(fx.backend().count(|c| *c == BackendCall::BeginRttPass(RenderTargetHandle(6))), 1);
    assert_eq!(fx.backend().draw_count(), 1);
    let main_view = utils::to_gpu(&fx.registry.entity(fx.camera).unwrap().matrices().view);
    assert_eq!(fx.backend().entity_constants(mesh).unwrap().view, main_view);
}

#[test]
fn light_buffer_truncates_past_capacity() {
    let mut fx = Fixture::new();
    for _ in 0..40 {
        fx.registry.create_light(LightType::Point);
    }

    fx.render();

    assert_eq!(fx.backend().light_buffer().light_count, 32);
    assert_eq!(fx.backend().light_buffer().active().len(), 32);
}

#[test]
fn skinned_mesh_binds_bones_for_every_surface() {
    let mut fx = Fixture::new();
    let material = fx.material();
    let mesh = fx.mesh(material, 2);
    fx.registry
        .mesh_mut(mesh)
        .unwrap()
        .set_bone_matrices(&[Mat4::identity(); 3]);

    fx.render();

    assert_eq!(
        fx.backend().count(|c| *c == BackendCall::BindBones { entity: mesh, count: 3 }),
        2
    );
}

#[test]
fn transparent_surfaces_draw_after_opaque_far_to_near() {
    let mut fx = Fixture::new();
    let opaque = fx.material();
    let glass = fx.material();
    fx.registry.material_mut(glass).unwrap().set_transparency(0.5);

    let near = fx.mesh(glass, 1);
    let far = fx.mesh(glass, 1);
    let solid = fx.mesh(opaque, 1);
    fx.registry.entity_mut(near).unwrap().set_position(Vec3::new(0.0, 0.0, 2.0));
    fx.registry.entity_mut(far).unwrap().set_position(Vec3::new(0.0, 0.0, 8.0));
    fx.registry.entity_mut(solid).unwrap().set_position(Vec3::new(0.0, 0.0, 20.0));

    fx.render();

    let order: Vec<EntityId> = fx.manager.queue().iter().map(|c| c.mesh).collect();
    assert_eq!(order, vec![solid, far, near]);
}

#[test]
fn flush_skips_commands_whose_material_was_deleted() {
    let mut fx = Fixture::new();
    let kept = fx.material();
    let doomed = fx.material();
    fx.mesh(kept, 1);
    fx.mesh(doomed, 1);
    let camera = fx.camera;

    fx.registry.update_transforms();
    fx.manager.build_render_queue(&mut fx.registry, camera);
    assert!(fx.registry.delete_material(doomed));
    fx.device().clear_calls();
    fx.manager.flush_render_queue(&mut fx.registry, camera);

    assert_eq!(fx.manager.stats().skipped_draws, 1);
    assert_eq!(fx.backend().draw_count(), 1);
}

#[test]
fn failed_upload_releases_created_streams() {
    let mut fx = Fixture::new();
    let material = fx.material();
    let mesh = fx.registry.create_mesh(Some(material)).unwrap();

    // Position, normal and index buffers: fail on each in turn
    for created in 0..3 {
        let surface = fx.triangle(mesh);
        let live = fx.backend().live_buffer_count();
        fx.device().clear_calls();
        fx.device().fail_buffer_creation_after(created);

        let result = fx.upload(surface);

        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))), "{created}: {result:?}");
        assert!(fx.registry.surface(surface).unwrap().gpu().is_none());
        assert_eq!(fx.backend().live_buffer_count(), live);
        assert_eq!(fx.backend().count(|c| matches!(c, BackendCall::ReleaseBuffer(_))), created);
    }
    fx.device().set_fail_buffer_creation(false);

    fx.render();

    assert_eq!(fx.backend().draw_count(), 0);
    assert_eq!(fx.manager.stats().skipped_draws, 3);
}

#[test]
fn failed_shader_compile_registers_nothing() {
    let mut fx = Fixture::new();
    let source = ShaderSource::new("shaders/broken.vert", "shaders/broken.frag", VertexFlags::POSITION);
    let shaders = fx.registry.shaders().len();
    fx.device().set_fail_shader_compilation(true);

    let device = fx
        .manager
        .backend_mut()
        .as_any_mut()
        .downcast_mut::<RecordingBackend>()
        .unwrap();
    assert!(fx.registry.compile_shader(device, &source).is_none());
    assert_eq!(fx.registry.shaders().len(), shaders);
    assert_eq!(fx.backend().count(|c| matches!(c, BackendCall::CompileShader(_))), 0);

    fx.device().set_fail_shader_compilation(false);
    let device = fx
        .manager
        .backend_mut()
        .as_any_mut()
        .downcast_mut::<RecordingBackend>()
        .unwrap();
    assert!(fx.registry.compile_shader(device, &source).is_some());
    assert_eq!(fx.registry.shaders().len(), shaders + 1);
}

#[test]
fn device_not_ready_renders_nothing() {
    let mut fx = Fixture::new();
    let material = fx.material();
    fx.mesh(material, 1);
    fx.light();
    fx.device().set_ready(false);

    fx.render();

    assert!(fx.backend().calls().is_empty());
    assert_eq!(*fx.manager.stats(), FrameStats::default());
}
