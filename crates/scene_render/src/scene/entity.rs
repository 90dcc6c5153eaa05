//! # Scene Entities
//!
//! One entity type with a closed set of kinds. Everything the pipeline
//! needs from any entity (transform, world matrix, flags, layers, scene
//! graph links) lives on [`Entity`]; kind-specific data is reached by
//! pattern matching through the `as_*` accessors, which return `None` for
//! the wrong kind instead of reinterpreting memory.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{utils, GpuMatrix, Mat4, Mat4Ext, Quat, Transform, Vec3};
use crate::render::Viewport;
use crate::scene::{Camera, LayerMask, Light, Mesh};

slotmap::new_key_type! {
    /// Id of an entity in the object registry
    pub struct EntityId;
}

/// Entity kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Drawable geometry
    Mesh,
    /// Point of view
    Camera,
    /// Light source
    Light,
}

/// Kind-specific entity data
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// Drawable geometry
    Mesh(Mesh),
    /// Point of view
    Camera(Camera),
    /// Light source
    Light(Light),
}

/// Per-entity constant block uploaded before drawing
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EntityConstants {
    /// Object to world
    pub world: GpuMatrix,
    /// World to view
    pub view: GpuMatrix,
    /// View to clip
    pub projection: GpuMatrix,
}

/// World, view and projection of an entity
///
/// For meshes the render manager fills view and projection from the
/// drawing camera (or the shadow light) right before each upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixSet {
    /// Object to world
    pub world: Mat4,
    /// World to view
    pub view: Mat4,
    /// View to clip
    pub projection: Mat4,
}

impl Default for MatrixSet {
    fn default() -> Self {
        Self {
            world: Mat4::identity(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
        }
    }
}

impl MatrixSet {
    /// Constant block in GPU layout
    pub fn to_constants(&self) -> EntityConstants {
        EntityConstants {
            world: utils::to_gpu(&self.world),
            view: utils::to_gpu(&self.view),
            projection: utils::to_gpu(&self.projection),
        }
    }
}

/// A scene entity
#[derive(Debug, Clone)]
pub struct Entity {
    transform: Transform,
    pub(crate) matrices: MatrixSet,
    viewport: Viewport,
    active: bool,
    visible: bool,
    cast_shadows: bool,
    layer_mask: LayerMask,
    world_current: bool,
    manual_view: bool,
    manual_projection: bool,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    kind: EntityKind,
}

impl Entity {
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            transform: Transform::identity(),
            matrices: MatrixSet::default(),
            viewport: Viewport::default(),
            active: true,
            visible: true,
            cast_shadows: true,
            layer_mask: LayerMask::DEFAULT,
            world_current: false,
            manual_view: false,
            manual_projection: false,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    // Kind access

    /// Kind tag
    pub const fn entity_type(&self) -> EntityType {
        match self.kind {
            EntityKind::Mesh(_) => EntityType::Mesh,
            EntityKind::Camera(_) => EntityType::Camera,
            EntityKind::Light(_) => EntityType::Light,
        }
    }

    /// Kind-specific data
    pub const fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Mesh data, if this is a mesh
    pub const fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            EntityKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Mutable mesh data, if this is a mesh
    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            EntityKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Camera data, if this is a camera
    pub const fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            EntityKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Mutable camera data, if this is a camera
    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            EntityKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Light data, if this is a light
    pub const fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            EntityKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Mutable light data, if this is a light
    pub fn as_light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            EntityKind::Light(light) => Some(light),
            _ => None,
        }
    }

    // Transform

    /// Local transform relative to the parent
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable local transform; the world matrix is stale until the next update pass
    pub fn transform_mut(&mut self) -> &mut Transform {
        self.world_current = false;
        &mut self.transform
    }

    /// Set the local position
    pub fn set_position(&mut self, position: Vec3) {
        self.transform_mut().position = position;
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform_mut().rotation = rotation;
    }

    /// Set the local scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform_mut().scale = scale;
    }

    /// Turn the local forward axis towards `target`
    pub fn look_at(&mut self, target: Vec3) {
        self.transform_mut().look_at(target, Vec3::y());
    }

    /// World matrix from the last update pass
    pub const fn world_matrix(&self) -> &Mat4 {
        &self.matrices.world
    }

    /// World-space position from the last update pass
    pub fn world_position(&self) -> Vec3 {
        self.matrices.world.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// World-space forward axis from the last update pass
    pub fn world_forward(&self) -> Vec3 {
        let forward = self.matrices.world.transform_vector(&Vec3::z());
        if forward.norm_squared() > f32::EPSILON {
            forward.normalize()
        } else {
            forward
        }
    }

    /// Whether the world matrix reflects the current transform
    pub const fn is_world_current(&self) -> bool {
        self.world_current
    }

    pub(crate) fn mark_world_stale(&mut self) {
        self.world_current = false;
    }

    pub(crate) fn set_world(&mut self, world: Mat4) {
        self.matrices.world = world;
        self.world_current = true;
    }

    // Matrix set and viewport

    /// World, view and projection last written for this entity
    pub const fn matrices(&self) -> &MatrixSet {
        &self.matrices
    }

    /// Set the view matrix explicitly
    ///
    /// A camera keeps an explicit view instead of deriving it from its world
    /// matrix until [`clear_matrix_overrides`](Self::clear_matrix_overrides).
    pub fn generate_view_matrix(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.matrices.view = Mat4::view_look_at_lh(eye, target, up);
        self.manual_view = true;
    }

    /// Set a perspective projection explicitly; `fov` in radians
    pub fn generate_projection_matrix(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.matrices.projection = Mat4::perspective_fov_lh(fov, aspect, near, far);
        self.manual_projection = true;
    }

    /// Return to deriving view and projection during the update pass
    pub fn clear_matrix_overrides(&mut self) {
        self.manual_view = false;
        self.manual_projection = false;
    }

    pub(crate) fn update_camera_matrices(&mut self) {
        if !self.manual_view {
            self.matrices.view = self.matrices.world.try_inverse().unwrap_or_else(|| {
                log::warn!("Camera world matrix is not invertible; using identity view");
                Mat4::identity()
            });
        }
        if !self.manual_projection {
            if let Some(projection) = self.as_camera().map(Camera::projection_matrix) {
                self.matrices.projection = projection;
            }
        }
    }

    /// Viewport used when this camera drives the main pass
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Set the viewport rectangle and depth range
    pub fn generate_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) {
        self.viewport = Viewport { x, y, width, height, min_depth, max_depth };
    }

    // Flags

    /// Whether the entity takes part in the frame
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Include or exclude the entity from the frame
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether a mesh is drawn
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether a mesh is drawn into the shadow map
    pub const fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Enable or disable shadow casting
    pub fn set_cast_shadows(&mut self, cast_shadows: bool) {
        self.cast_shadows = cast_shadows;
    }

    /// Render layers the entity belongs to
    pub const fn layer_mask(&self) -> LayerMask {
        self.layer_mask
    }

    /// Set the render layers
    pub fn set_layer_mask(&mut self, layers: LayerMask) {
        self.layer_mask = layers;
    }

    // Scene graph links, maintained by the registry

    /// Parent entity
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Child entities
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }
}
