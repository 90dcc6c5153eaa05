//! Demo scene construction
//!
//! A six-sided cube with two alternating materials, a ground plane, a glass
//! pane, a marker only the overview camera sees, one directional light and
//! two cameras.

use scene_render::foundation::math::Vec3;
use scene_render::prelude::*;
use scene_render::resources::Surface;

use crate::DemoError;

/// Entities the frame loop touches
pub struct DemoScene {
    /// Everything the renderer draws
    pub registry: ObjectRegistry,
    /// Main camera
    pub camera: EntityId,
    /// Camera rendering into the offscreen target
    pub overview_camera: EntityId,
    /// Shadow casting light
    pub sun: EntityId,
    /// Spinning multi-material mesh
    pub cube: EntityId,
}

/// Cube face as (normal, tangent u, tangent v)
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
];

/// Fill `surface` with one quad centered at `normal * offset`
fn write_quad(surface: &mut Surface, normal: [f32; 3], u: [f32; 3], v: [f32; 3], offset: f32, half: f32) {
    let n = Vec3::from(normal);
    let u = Vec3::from(u) * half;
    let v = Vec3::from(v) * half;
    let center = n * offset;

    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    for (i, (su, sv)) in corners.into_iter().enumerate() {
        let p = center + u * su + v * sv;
        let index = surface.add_vertex(p.x, p.y, p.z) as usize;
        debug_assert_eq!(index, i);
        surface.set_vertex_normal(index, n.x, n.y, n.z);
        surface.set_vertex_tex_coords(index, (su + 1.0) * 0.5, (1.0 - sv) * 0.5);
    }
    surface.add_triangle(0, 1, 2);
    surface.add_triangle(0, 2, 3);
}

/// Create an uploaded quad surface on `mesh`
fn add_quad(
    registry: &mut ObjectRegistry,
    device: &mut dyn GpuDevice,
    mesh: EntityId,
    material: Option<MaterialId>,
    face: ([f32; 3], [f32; 3], [f32; 3]),
    offset: f32,
    half: f32,
) -> Result<SurfaceId, DemoError> {
    let surface = registry.create_surface();
    let (normal, u, v) = face;
    if let Some(s) = registry.surface_mut(surface) {
        write_quad(s, normal, u, v, offset, half);
    }
    if !registry.add_surface_to_mesh(mesh, surface) {
        return Err(DemoError::Scene(format!("surface {surface:?} could not join mesh {mesh:?}")));
    }
    if material.is_some() {
        registry.set_surface_material(surface, material);
    }
    registry.upload_surface(surface, device)?;
    Ok(surface)
}

/// Build the demo scene, uploading geometry through `device`
pub fn build(device: &mut dyn GpuDevice) -> Result<DemoScene, DemoError> {
    let mut registry = ObjectRegistry::new();

    let lit = registry
        .compile_shader(
            device,
            &ShaderSource::with_path_resolution(
                "lit.vert",
                "lit.frag",
                VertexFlags::POSITION | VertexFlags::NORMAL | VertexFlags::TEX0 | VertexFlags::TANGENT,
            ),
        )
        .ok_or_else(|| DemoError::Scene("lit shader failed to compile".to_string()))?;
    let unlit = registry
        .compile_shader(
            device,
            &ShaderSource::new("shaders/unlit.vert", "shaders/unlit.frag", VertexFlags::POSITION)
                .with_entry_points("vs_main", "fs_main"),
        )
        .ok_or_else(|| DemoError::Scene("unlit shader failed to compile".to_string()))?;

    let stone = registry.create_material(Some(lit));
    if let Some(m) = registry.material_mut(stone) {
        m.set_base_color([0.6, 0.6, 0.65, 1.0]);
        m.set_roughness(0.9);
    }
    let brass = registry.create_material(Some(lit));
    if let Some(m) = registry.material_mut(brass) {
        m.set_base_color([0.8, 0.6, 0.2, 1.0]);
        m.set_metallic(1.0);
        m.set_roughness(0.35);
        m.set_emissive(0.2, 0.1, 0.0, 0.5);
    }
    let glass = registry.create_material(Some(lit));
    if let Some(m) = registry.material_mut(glass) {
        m.set_transparency(0.4);
        m.set_blend_mode(BlendMode::AlphaLerp);
        m.set_cast_shadows(false);
    }
    let marker = registry.create_material(Some(unlit));
    if let Some(m) = registry.material_mut(marker) {
        m.set_unlit(true);
        m.set_base_color([1.0, 0.1, 0.1, 1.0]);
    }
    registry.set_default_material(Some(stone));

    // Cube: faces alternate between the mesh material and a brass override
    let cube = registry
        .create_mesh(None)
        .ok_or_else(|| DemoError::Scene("cube mesh".to_string()))?;
    for (i, face) in FACES.into_iter().enumerate() {
        let material = (i % 2 == 1).then_some(brass);
        add_quad(&mut registry, device, cube, material, face, 1.0, 1.0)?;
    }
    if let Some(entity) = registry.entity_mut(cube) {
        entity.set_position(Vec3::new(0.0, 1.0, 0.0));
    }
    if let Some(mesh) = registry.mesh_mut(cube) {
        mesh.set_collision_mode(CollisionMode::Box);
    }

    let ground = registry
        .create_mesh(Some(stone))
        .ok_or_else(|| DemoError::Scene("ground mesh".to_string()))?;
    add_quad(&mut registry, device, ground, None, FACES[4], 0.0, 20.0)?;
    if let Some(entity) = registry.entity_mut(ground) {
        entity.set_cast_shadows(false);
    }

    let pane = registry
        .create_mesh(Some(glass))
        .ok_or_else(|| DemoError::Scene("glass mesh".to_string()))?;
    add_quad(&mut registry, device, pane, None, FACES[0], 0.0, 1.5)?;
    if let Some(entity) = registry.entity_mut(pane) {
        entity.set_position(Vec3::new(0.0, 1.5, -3.0));
    }

    let beacon = registry
        .create_mesh(Some(marker))
        .ok_or_else(|| DemoError::Scene("marker mesh".to_string()))?;
    add_quad(&mut registry, device, beacon, None, FACES[4], 0.0, 0.25)?;
    registry.set_parent(beacon, Some(cube))?;
    if let Some(entity) = registry.entity_mut(beacon) {
        entity.set_position(Vec3::new(0.0, 1.5, 0.0));
        entity.set_layer_mask(LayerMask::FX);
        entity.set_cast_shadows(false);
    }

    let sun = registry.create_light(LightType::Directional);
    if let Some(entity) = registry.entity_mut(sun) {
        entity.set_position(Vec3::new(10.0, 20.0, -10.0));
        entity.look_at(Vec3::zeros());
    }
    if let Some(light) = registry.light_mut(sun) {
        light.set_diffuse_color(1.0, 0.95, 0.85);
        light.set_shadow_ortho_size(40.0);
        light.set_shadow_planes(1.0, 60.0);
    }

    let camera = registry.create_camera();
    if let Some(entity) = registry.entity_mut(camera) {
        entity.set_position(Vec3::new(0.0, 3.0, -8.0));
        entity.look_at(Vec3::new(0.0, 1.0, 0.0));
        entity.generate_viewport(0.0, 0.0, 1280.0, 720.0, 0.0, 1.0);
    }
    if let Some(lens) = registry.camera_mut(camera) {
        lens.set_perspective(60.0, 16.0 / 9.0, 0.1, 200.0);
        lens.set_cull_mask(LayerMask::ALL & !LayerMask::FX);
    }

    let overview_camera = registry.create_camera();
    if let Some(entity) = registry.entity_mut(overview_camera) {
        entity.set_position(Vec3::new(0.0, 15.0, -0.1));
        entity.look_at(Vec3::zeros());
    }
    if let Some(lens) = registry.camera_mut(overview_camera) {
        lens.set_orthographic(24.0, 24.0, 0.1, 50.0);
    }

    log::info!(
        "Demo scene: {} entities, {} shaders",
        registry.entity_count(),
        registry.shaders().len()
    );

    Ok(DemoScene { registry, camera, overview_camera, sun, cube })
}
