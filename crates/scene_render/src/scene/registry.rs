//! # Object Registry
//!
//! Creates, owns and destroys every entity, material, shader and surface,
//! and keeps the links between them consistent:
//!
//! - a surface's owner and its mesh's surface list always agree
//! - a material's shader and that shader's material list always agree
//! - a child's parent and that parent's child list always agree
//!
//! Creation calls that can be handed bad input return `Option` and log the
//! reason; callers treat `None` as "nothing was created".

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Transform};
use crate::render::api::{GpuDevice, ShaderHandle};
use crate::render::command::{MaterialRef, ShaderRef};
use crate::render::{RenderError, RenderResult};
use crate::resources::{Material, MaterialId, Shader, ShaderId, ShaderSource, Surface, SurfaceId, VertexFlags};
use crate::scene::bounds::OrientedBox;
use crate::scene::{Camera, CollisionMode, Entity, EntityId, EntityKind, Light, LightType, Mesh};

/// Owner of all scene objects and GPU-facing resources
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    entities: SlotMap<EntityId, Entity>,
    materials: SlotMap<MaterialId, Material>,
    shaders: SlotMap<ShaderId, Shader>,
    surfaces: SlotMap<SurfaceId, Surface>,
    meshes: Vec<EntityId>,
    cameras: Vec<EntityId>,
    lights: Vec<EntityId>,
    shader_order: Vec<ShaderId>,
    default_material: Option<MaterialId>,
    next_sort_id: u32,
}

impl ObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sort_id(&mut self) -> u32 {
        let id = self.next_sort_id;
        self.next_sort_id = self.next_sort_id.wrapping_add(1);
        id
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a camera seeing every layer
    pub fn create_camera(&mut self) -> EntityId {
        let id = self.entities.insert(Entity::new(EntityKind::Camera(Camera::default())));
        self.cameras.push(id);
        log::debug!("Created camera {:?}", id);
        id
    }

    /// Create a light of the given kind
    pub fn create_light(&mut self, light_type: LightType) -> EntityId {
        let id = self.entities.insert(Entity::new(EntityKind::Light(Light::new(light_type))));
        self.lights.push(id);
        log::debug!("Created {:?} light {:?}", light_type, id);
        id
    }

    /// Create a mesh drawn with `material`, or with the default material
    ///
    /// Returns `None` when `material` is stale or when no material is given
    /// and no default is registered.
    pub fn create_mesh(&mut self, material: Option<MaterialId>) -> Option<EntityId> {
        let material = match material {
            Some(id) if self.materials.contains_key(id) => id,
            Some(id) => {
                log::error!("{}", RenderError::UnknownHandle(format!("material {id:?}")));
                return None;
            }
            None => {
                let Some(default) = self.default_material else {
                    log::error!("Cannot create mesh: {}", RenderError::MissingDefaultMaterial);
                    return None;
                };
                default
            }
        };

        let id = self.entities.insert(Entity::new(EntityKind::Mesh(Mesh::new(Some(material)))));
        self.meshes.push(id);
        log::debug!("Created mesh {:?} with material {:?}", id, material);
        Some(id)
    }

    /// Register an already compiled shader program
    pub fn create_shader(&mut self, handle: ShaderHandle, vertex_flags: VertexFlags) -> ShaderId {
        let sort_id = self.next_sort_id();
        let id = self.shaders.insert(Shader::new(handle, vertex_flags, sort_id));
        self.shader_order.push(id);
        log::debug!("Registered shader {:?} ({:?})", id, vertex_flags);
        id
    }

    /// Compile a shader through the device and register it
    ///
    /// Returns `None` and logs when the source is incomplete or compilation fails.
    pub fn compile_shader(&mut self, device: &mut dyn GpuDevice, source: &ShaderSource) -> Option<ShaderId> {
        if let Err(reason) = source.validate() {
            log::error!("Shader {} / {} rejected: {}", source.vertex_path, source.pixel_path, reason);
            return None;
        }
        match device.compile_shader(source) {
            Ok(handle) => {
                let id = self.create_shader(handle, source.vertex_flags);
                if let Some(shader) = self.shaders.get_mut(id) {
                    shader.name = Some(source.vertex_path.clone());
                }
                Some(id)
            }
            Err(err) => {
                log::error!("Shader {} / {} failed to compile: {}", source.vertex_path, source.pixel_path, err);
                None
            }
        }
    }

    /// Create a material, optionally drawn with `shader`
    pub fn create_material(&mut self, shader: Option<ShaderId>) -> MaterialId {
        let sort_id = self.next_sort_id();
        let id = self.materials.insert(Material::new(sort_id));
        if let Some(shader) = shader {
            if !self.assign_shader_to_material(shader, id) {
                log::warn!("Material {:?} created without shader: unknown shader {:?}", id, shader);
            }
        }
        id
    }

    /// Create an empty surface not attached to any mesh
    pub fn create_surface(&mut self) -> SurfaceId {
        self.surfaces.insert(Surface::new())
    }

    /// Material used by meshes created without one
    pub const fn default_material(&self) -> Option<MaterialId> {
        self.default_material
    }

    /// Set or clear the default material
    pub fn set_default_material(&mut self, material: Option<MaterialId>) {
        match material {
            Some(id) if !self.materials.contains_key(id) => {
                log::warn!("Ignoring unknown default material {:?}", id);
            }
            _ => self.default_material = material,
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Entity by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable entity by id
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Mesh data of a mesh entity
    pub fn mesh(&self, id: EntityId) -> Option<&Mesh> {
        self.entities.get(id).and_then(Entity::as_mesh)
    }

    /// Mutable mesh data of a mesh entity
    pub fn mesh_mut(&mut self, id: EntityId) -> Option<&mut Mesh> {
        self.entities.get_mut(id).and_then(Entity::as_mesh_mut)
    }

    /// Camera data of a camera entity
    pub fn camera(&self, id: EntityId) -> Option<&Camera> {
        self.entities.get(id).and_then(Entity::as_camera)
    }

    /// Mutable camera data of a camera entity
    pub fn camera_mut(&mut self, id: EntityId) -> Option<&mut Camera> {
        self.entities.get_mut(id).and_then(Entity::as_camera_mut)
    }

    /// Light data of a light entity
    pub fn light(&self, id: EntityId) -> Option<&Light> {
        self.entities.get(id).and_then(Entity::as_light)
    }

    /// Mutable light data of a light entity
    pub fn light_mut(&mut self, id: EntityId) -> Option<&mut Light> {
        self.entities.get_mut(id).and_then(Entity::as_light_mut)
    }

    /// Material by id
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Mutable material by id
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Shader by id
    pub fn shader(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id)
    }

    /// Surface by id
    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    /// Mutable surface by id
    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(id)
    }

    /// Mesh entities in creation order
    pub fn meshes(&self) -> &[EntityId] {
        &self.meshes
    }

    /// Camera entities in creation order
    pub fn cameras(&self) -> &[EntityId] {
        &self.cameras
    }

    /// Light entities in creation order
    pub fn lights(&self) -> &[EntityId] {
        &self.lights
    }

    /// Shaders in creation order
    pub fn shaders(&self) -> &[ShaderId] {
        &self.shader_order
    }

    /// Number of live entities of every kind
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Sorting identity of a shader
    pub fn shader_ref(&self, id: ShaderId) -> Option<ShaderRef> {
        self.shaders.get(id).map(|shader| ShaderRef {
            id,
            handle: shader.handle(),
            sort_id: shader.sort_id(),
        })
    }

    /// Sorting identity of a material
    pub fn material_ref(&self, id: MaterialId) -> Option<MaterialRef> {
        self.materials.get(id).map(|material| MaterialRef {
            id,
            sort_id: material.sort_id(),
        })
    }

    /// Material a surface is drawn with: its override, else its mesh's material
    pub fn resolve_material(&self, surface: SurfaceId) -> Option<MaterialId> {
        let surface = self.surfaces.get(surface)?;
        surface
            .material
            .or_else(|| surface.owner.and_then(|mesh| self.mesh(mesh)).and_then(Mesh::material))
            .filter(|id| self.materials.contains_key(*id))
    }

    // ------------------------------------------------------------------
    // Surfaces
    // ------------------------------------------------------------------

    /// Attach a surface to a mesh, detaching it from its previous owner
    pub fn add_surface_to_mesh(&mut self, mesh: EntityId, surface: SurfaceId) -> bool {
        if self.mesh(mesh).is_none() {
            log::warn!("Cannot attach surface: {:?} is not a mesh", mesh);
            return false;
        }
        let Some(previous) = self.surfaces.get(surface).map(|s| s.owner) else {
            log::warn!("Cannot attach unknown surface {:?}", surface);
            return false;
        };
        if previous == Some(mesh) {
            return true;
        }
        if let Some(old) = previous.and_then(|old| self.mesh_mut(old)) {
            old.surfaces.retain(|&s| s != surface);
        }
        if let Some(target) = self.mesh_mut(mesh) {
            target.surfaces.push(surface);
        }
        if let Some(s) = self.surfaces.get_mut(surface) {
            s.owner = Some(mesh);
        }
        true
    }

    /// Detach a surface from the mesh that owns it
    pub fn remove_surface_from_mesh(&mut self, mesh: EntityId, surface: SurfaceId) -> bool {
        match self.surfaces.get_mut(surface) {
            Some(s) if s.owner == Some(mesh) => s.owner = None,
            _ => return false,
        }
        if let Some(owner) = self.mesh_mut(mesh) {
            owner.surfaces.retain(|&s| s != surface);
        }
        true
    }

    /// Move a surface from one mesh to another
    pub fn move_surface(&mut self, surface: SurfaceId, from: EntityId, to: EntityId) -> bool {
        if self.surfaces.get(surface).and_then(|s| s.owner) != Some(from) {
            log::warn!("Surface {:?} is not owned by {:?}", surface, from);
            return false;
        }
        self.add_surface_to_mesh(to, surface)
    }

    /// Override (or stop overriding) the material of one surface
    pub fn set_surface_material(&mut self, surface: SurfaceId, material: Option<MaterialId>) -> bool {
        if material.is_some_and(|id| !self.materials.contains_key(id)) {
            log::warn!("Unknown material {:?} for surface {:?}", material, surface);
            return false;
        }
        self.surfaces.get_mut(surface).map_or(false, |s| {
            s.material = material;
            true
        })
    }

    /// Set the material of a mesh
    pub fn set_mesh_material(&mut self, mesh: EntityId, material: MaterialId) -> bool {
        if !self.materials.contains_key(material) {
            return false;
        }
        self.mesh_mut(mesh).map_or(false, |m| {
            m.material = Some(material);
            true
        })
    }

    /// Upload a surface with the vertex layout of the shader it is drawn with
    pub fn upload_surface(&mut self, surface: SurfaceId, device: &mut dyn GpuDevice) -> RenderResult<()> {
        let flags = self
            .resolve_material(surface)
            .and_then(|m| self.materials.get(m))
            .and_then(Material::shader)
            .and_then(|s| self.shaders.get(s))
            .map(Shader::vertex_flags)
            .ok_or_else(|| RenderError::UnknownHandle(format!("no shader resolves for surface {surface:?}")))?;

        self.surfaces
            .get_mut(surface)
            .ok_or_else(|| RenderError::UnknownHandle(format!("surface {surface:?}")))?
            .upload(device, flags)
    }

    // ------------------------------------------------------------------
    // Shader <-> material
    // ------------------------------------------------------------------

    /// Draw `material` with `shader`, leaving its previous shader's list
    pub fn assign_shader_to_material(&mut self, shader: ShaderId, material: MaterialId) -> bool {
        if !self.shaders.contains_key(shader) {
            return false;
        }
        let Some(previous) = self.materials.get(material).map(Material::shader) else {
            return false;
        };
        if previous == Some(shader) {
            return true;
        }
        if let Some(old) = previous.and_then(|old| self.shaders.get_mut(old)) {
            old.materials.retain(|&m| m != material);
        }
        if let Some(new) = self.shaders.get_mut(shader) {
            new.materials.push(material);
        }
        if let Some(m) = self.materials.get_mut(material) {
            m.shader = Some(shader);
        }
        true
    }

    /// Unlink a material from its shader
    pub fn remove_material_from_shader(&mut self, shader: ShaderId, material: MaterialId) -> bool {
        match self.materials.get_mut(material) {
            Some(m) if m.shader == Some(shader) => m.shader = None,
            _ => return false,
        }
        if let Some(s) = self.shaders.get_mut(shader) {
            s.materials.retain(|&m| m != material);
        }
        true
    }

    // ------------------------------------------------------------------
    // Scene graph
    // ------------------------------------------------------------------

    /// Attach `child` under `parent`, or detach it with `None`
    ///
    /// Rejects unknown ids, self-parenting and links that would form a cycle.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> RenderResult<()> {
        let Some(previous) = self.entities.get(child).map(Entity::parent) else {
            return Err(RenderError::UnknownHandle(format!("entity {child:?}")));
        };

        if let Some(parent) = parent {
            if !self.entities.contains_key(parent) {
                return Err(RenderError::UnknownHandle(format!("entity {parent:?}")));
            }
            if parent == child {
                return Err(RenderError::InvalidHierarchy("an entity cannot parent itself".to_string()));
            }
            let mut cursor = Some(parent);
            while let Some(ancestor) = cursor {
                if ancestor == child {
                    return Err(RenderError::InvalidHierarchy(format!(
                        "{parent:?} is a descendant of {child:?}"
                    )));
                }
                cursor = self.entities.get(ancestor).and_then(Entity::parent);
            }
        }

        if previous == parent {
            return Ok(());
        }
        if let Some(old) = previous.and_then(|p| self.entities.get_mut(p)) {
            old.children.retain(|&c| c != child);
        }
        if let Some(new) = parent.and_then(|p| self.entities.get_mut(p)) {
            new.children.push(child);
        }
        if let Some(entity) = self.entities.get_mut(child) {
            entity.parent = parent;
            entity.mark_world_stale();
        }
        Ok(())
    }

    /// Recompute world matrices along the parent chain
    ///
    /// Cameras derive their view and projection, lights their world
    /// placement, and meshes with a collision mode their oriented box.
    pub fn update_transforms(&mut self) {
        let mut stack: Vec<(EntityId, Mat4)> = self
            .entities
            .iter()
            .filter(|(_, e)| e.parent().is_none())
            .map(|(id, _)| (id, Mat4::identity()))
            .collect();

        while let Some((id, parent_world)) = stack.pop() {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let world = parent_world * entity.transform().to_matrix();
            entity.set_world(world);

            if entity.as_camera().is_some() {
                entity.update_camera_matrices();
            }
            let position = entity.world_position();
            let forward = entity.world_forward();
            if let Some(light) = entity.as_light_mut() {
                light.place(position, forward);
            }

            stack.extend(entity.children.iter().map(|&child| (child, world)));
        }

        self.update_collision_volumes();
    }

    fn update_collision_volumes(&mut self) {
        for &id in &self.meshes {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let world = Transform::from_matrix(entity.world_matrix());
            let Some(mesh) = entity.as_mesh_mut() else {
                continue;
            };
            if mesh.collision_mode() == CollisionMode::None {
                continue;
            }
            let local = mesh
                .surfaces
                .first()
                .and_then(|s| self.surfaces.get(*s))
                .and_then(|s| s.aabb(None));
            if let Some(local) = local {
                mesh.obb = OrientedBox::from_local(&local, &world.scale, world.rotation, world.position);
            }
        }
    }

    /// Oriented box test between two meshes
    ///
    /// False when either mesh is missing or has collision disabled.
    pub fn check_collision(&self, a: EntityId, b: EntityId) -> bool {
        match (self.mesh(a), self.mesh(b)) {
            (Some(a), Some(b))
                if a.collision_mode() != CollisionMode::None && b.collision_mode() != CollisionMode::None =>
            {
                a.obb().intersects(b.obb())
            }
            _ => false,
        }
    }

    /// Clear every mesh's "uploaded this frame" flag
    pub(crate) fn reset_frame_flags(&mut self) {
        for &id in &self.meshes {
            if let Some(mesh) = self.entities.get_mut(id).and_then(Entity::as_mesh_mut) {
                mesh.reset_frame_flag();
            }
        }
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Remove an entity
    ///
    /// Its parent forgets it, its children lose their parent link and, for
    /// a mesh, its surfaces become unowned.
    pub fn delete_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.remove(id) else {
            return false;
        };

        if let Some(parent) = entity.parent().and_then(|p| self.entities.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        for &child in entity.children() {
            if let Some(child) = self.entities.get_mut(child) {
                child.parent = None;
                child.mark_world_stale();
            }
        }

        match entity.kind() {
            EntityKind::Mesh(mesh) => {
                for &surface in mesh.surfaces() {
                    if let Some(surface) = self.surfaces.get_mut(surface) {
                        surface.owner = None;
                    }
                }
                self.meshes.retain(|&m| m != id);
            }
            EntityKind::Camera(_) => self.cameras.retain(|&c| c != id),
            EntityKind::Light(_) => self.lights.retain(|&l| l != id),
        }

        log::debug!("Deleted {:?} {:?}", entity.entity_type(), id);
        true
    }

    /// Remove a surface, releasing its GPU buffers
    pub fn delete_surface(&mut self, id: SurfaceId, device: &mut dyn GpuDevice) -> bool {
        let Some(mut surface) = self.surfaces.remove(id) else {
            return false;
        };
        if let Some(mesh) = surface.owner.and_then(|m| self.mesh_mut(m)) {
            mesh.surfaces.retain(|&s| s != id);
        }
        surface.release(device);
        true
    }

    /// Remove a material, clearing every reference to it
    pub fn delete_material(&mut self, id: MaterialId) -> bool {
        let Some(material) = self.materials.remove(id) else {
            return false;
        };
        if let Some(shader) = material.shader().and_then(|s| self.shaders.get_mut(s)) {
            shader.materials.retain(|&m| m != id);
        }
        for entity in self.entities.values_mut() {
            if let Some(mesh) = entity.as_mesh_mut() {
                if mesh.material == Some(id) {
                    mesh.material = None;
                }
            }
        }
        for surface in self.surfaces.values_mut() {
            if surface.material == Some(id) {
                surface.material = None;
            }
        }
        if self.default_material == Some(id) {
            self.default_material = None;
        }
        true
    }

    /// Remove a shader, unlinking the materials drawn with it
    pub fn delete_shader(&mut self, id: ShaderId) -> bool {
        let Some(shader) = self.shaders.remove(id) else {
            return false;
        };
        for material in shader.materials() {
            if let Some(material) = self.materials.get_mut(*material) {
                material.shader = None;
            }
        }
        self.shader_order.retain(|&s| s != id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn registry_with_default() -> (ObjectRegistry, ShaderId, MaterialId) {
        let mut registry = ObjectRegistry::new();
        let shader = registry.create_shader(ShaderHandle(1), VertexFlags::POSITION);
        let material = registry.create_material(Some(shader));
        registry.set_default_material(Some(material));
        (registry, shader, material)
    }

    fn triangle(registry: &mut ObjectRegistry) -> SurfaceId {
        let id = registry.create_surface();
        let surface = registry.surface_mut(id).unwrap();
        surface.add_vertex(-1.0, -1.0, -1.0);
        surface.add_vertex(1.0, -1.0, 1.0);
        surface.add_vertex(0.0, 1.0, 0.0);
        surface.add_triangle(0, 1, 2);
        id
    }

    #[test]
    fn test_mesh_without_material_needs_default() {
        let mut registry = ObjectRegistry::new();
        assert!(registry.create_mesh(None).is_none());

        let material = registry.create_material(None);
        assert!(registry.create_mesh(Some(material)).is_some());

        registry.set_default_material(Some(material));
        let mesh = registry.create_mesh(None).unwrap();
        assert_eq!(registry.mesh(mesh).unwrap().material(), Some(material));
    }

    #[test]
    fn test_sort_ids_follow_creation_order() {
        let mut registry = ObjectRegistry::new();
        let shader = registry.create_shader(ShaderHandle(1), VertexFlags::POSITION);
        let first = registry.create_material(Some(shader));
        let second = registry.create_material(Some(shader));
        let a = registry.material(first).unwrap().sort_id();
        let b = registry.material(second).unwrap().sort_id();
        assert!(registry.shader(shader).unwrap().sort_id() < a);
        assert!(a < b);
    }

    #[test]
    fn test_surface_owner_and_mesh_list_agree() {
        let (mut registry, _, _) = registry_with_default();
        let a = registry.create_mesh(None).unwrap();
        let b = registry.create_mesh(None).unwrap();
        let surface = triangle(&mut registry);

        assert!(registry.add_surface_to_mesh(a, surface));
        assert_eq!(registry.surface(surface).unwrap().owner(), Some(a));
        assert_eq!(registry.mesh(a).unwrap().surfaces(), &[surface]);

        assert!(registry.move_surface(surface, a, b));
        assert!(registry.mesh(a).unwrap().surfaces().is_empty());
        assert_eq!(registry.mesh(b).unwrap().surfaces(), &[surface]);
        assert_eq!(registry.surface(surface).unwrap().owner(), Some(b));

        assert!(!registry.move_surface(surface, a, b));
        assert!(registry.remove_surface_from_mesh(b, surface));
        assert_eq!(registry.surface(surface).unwrap().owner(), None);
    }

    #[test]
    fn test_surface_override_wins_over_mesh_material() {
        let (mut registry, shader, material) = registry_with_default();
        let mesh = registry.create_mesh(None).unwrap();
        let surface = triangle(&mut registry);
        registry.add_surface_to_mesh(mesh, surface);
        assert_eq!(registry.resolve_material(surface), Some(material));

        let other = registry.create_material(Some(shader));
        assert!(registry.set_surface_material(surface, Some(other)));
        assert_eq!(registry.resolve_material(surface), Some(other));

        registry.delete_material(other);
        assert_eq!(registry.resolve_material(surface), Some(material));
    }

    #[test]
    fn test_shader_material_lists_stay_consistent() {
        let mut registry = ObjectRegistry::new();
        let s1 = registry.create_shader(ShaderHandle(1), VertexFlags::POSITION);
        let s2 = registry.create_shader(ShaderHandle(2), VertexFlags::POSITION);
        let material = registry.create_material(Some(s1));
        assert_eq!(registry.shader(s1).unwrap().materials(), &[material]);

        assert!(registry.assign_shader_to_material(s2, material));
        assert!(registry.shader(s1).unwrap().materials().is_empty());
        assert_eq!(registry.shader(s2).unwrap().materials(), &[material]);

        assert!(registry.delete_shader(s2));
        assert_eq!(registry.material(material).unwrap().shader(), None);
        assert_eq!(registry.shaders(), &[s1]);
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut registry = ObjectRegistry::new();
        let a = registry.create_light(LightType::Point);
        let b = registry.create_light(LightType::Point);
        let c = registry.create_light(LightType::Point);

        registry.set_parent(b, Some(a)).unwrap();
        registry.set_parent(c, Some(b)).unwrap();
        assert!(matches!(registry.set_parent(a, Some(c)), Err(RenderError::InvalidHierarchy(_))));
        assert!(matches!(registry.set_parent(a, Some(a)), Err(RenderError::InvalidHierarchy(_))));
    }

    #[test]
    fn test_reparenting_updates_both_child_lists() {
        let mut registry = ObjectRegistry::new();
        let a = registry.create_camera();
        let b = registry.create_camera();
        let child = registry.create_light(LightType::Directional);

        registry.set_parent(child, Some(a)).unwrap();
        registry.set_parent(child, Some(b)).unwrap();
        assert!(registry.entity(a).unwrap().children().is_empty());
        assert_eq!(registry.entity(b).unwrap().children(), &[child]);

        registry.set_parent(child, None).unwrap();
        assert!(registry.entity(b).unwrap().children().is_empty());
        assert_eq!(registry.entity(child).unwrap().parent(), None);
    }

    #[test]
    fn test_deleting_parent_clears_children() {
        let mut registry = ObjectRegistry::new();
        let parent = registry.create_camera();
        let child = registry.create_light(LightType::Point);
        registry.set_parent(child, Some(parent)).unwrap();

        assert!(registry.delete_entity(parent));
        assert_eq!(registry.entity(child).unwrap().parent(), None);
        assert!(registry.cameras().is_empty());
        assert!(!registry.delete_entity(parent));
    }

    #[test]
    fn test_world_matrices_compose_along_parent_chain() {
        let mut registry = ObjectRegistry::new();
        let parent = registry.create_camera();
        let child = registry.create_light(LightType::Point);
        registry.entity_mut(parent).unwrap().set_position(Vec3::new(10.0, 0.0, 0.0));
        registry.entity_mut(child).unwrap().set_position(Vec3::new(0.0, 5.0, 0.0));
        registry.set_parent(child, Some(parent)).unwrap();

        registry.update_transforms();
        let child_entity = registry.entity(child).unwrap();
        assert!(child_entity.is_world_current());
        assert_relative_eq!(child_entity.world_position(), Vec3::new(10.0, 5.0, 0.0));
        assert_relative_eq!(registry.light(child).unwrap().position(), Vec3::new(10.0, 5.0, 0.0));

        let camera = registry.entity(parent).unwrap();
        assert_relative_eq!(camera.matrices().view, Mat4::new_translation(&Vec3::new(-10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_collision_uses_first_surface_bounds() {
        let (mut registry, _, _) = registry_with_default();
        let a = registry.create_mesh(None).unwrap();
        let b = registry.create_mesh(None).unwrap();
        for mesh in [a, b] {
            let surface = triangle(&mut registry);
            registry.add_surface_to_mesh(mesh, surface);
        }
        registry.entity_mut(b).unwrap().set_position(Vec3::new(1.5, 0.0, 0.0));

        registry.update_transforms();
        assert!(!registry.check_collision(a, b));

        registry.mesh_mut(a).unwrap().set_collision_mode(CollisionMode::Box);
        registry.mesh_mut(b).unwrap().set_collision_mode(CollisionMode::Box);
        registry.update_transforms();
        assert!(registry.check_collision(a, b));

        registry.entity_mut(b).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));
        registry.update_transforms();
        assert!(!registry.check_collision(a, b));
    }
}
