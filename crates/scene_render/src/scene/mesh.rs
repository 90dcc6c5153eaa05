//! # Mesh
//!
//! Mesh data of a mesh entity: the surfaces it draws, its default material,
//! an optional collision volume and an optional skinning palette.

use crate::foundation::math::{utils, GpuMatrix, Mat4};
use crate::resources::{MaterialId, SurfaceId};
use crate::scene::bounds::OrientedBox;

/// Largest skinning palette a mesh can upload
pub const MAX_BONES: usize = 64;

/// One skinning matrix in GPU layout
pub type BoneMatrix = GpuMatrix;

/// Bounding volume kept up to date for collision queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollisionMode {
    /// No volume, collision queries report no contact
    #[default]
    None,
    /// Oriented box from the first surface's bounds
    Box,
    /// Sphere queries use the box as well
    Sphere,
}

/// Mesh data of a mesh entity
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub(crate) surfaces: Vec<SurfaceId>,
    pub(crate) material: Option<MaterialId>,
    collision_mode: CollisionMode,
    pub(crate) obb: OrientedBox,
    bones: Vec<BoneMatrix>,
    skinning: bool,
    updated_this_frame: bool,
}

impl Mesh {
    pub(crate) fn new(material: Option<MaterialId>) -> Self {
        Self {
            material,
            ..Self::default()
        }
    }

    /// Surfaces in draw order
    pub fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }

    /// Number of surfaces
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Material used by surfaces without an override
    pub const fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Current collision mode
    pub const fn collision_mode(&self) -> CollisionMode {
        self.collision_mode
    }

    /// Enable or disable the collision volume
    pub fn set_collision_mode(&mut self, mode: CollisionMode) {
        self.collision_mode = mode;
    }

    /// Collision volume from the last update pass
    pub const fn obb(&self) -> &OrientedBox {
        &self.obb
    }

    // Skinning

    /// Replace the skinning palette and enable skinning
    ///
    /// Palettes longer than [`MAX_BONES`] are truncated.
    pub fn set_bone_matrices(&mut self, bones: &[Mat4]) {
        if bones.len() > MAX_BONES {
            log::warn!(
                "Skinning palette of {} bones truncated to {}",
                bones.len(),
                MAX_BONES
            );
        }
        self.bones = bones.iter().take(MAX_BONES).map(utils::to_gpu).collect();
        self.skinning = true;
    }

    /// Drop the palette and disable skinning
    pub fn clear_skinning(&mut self) {
        self.bones.clear();
        self.skinning = false;
    }

    /// Whether the bone buffer is bound when drawing
    pub const fn has_skinning(&self) -> bool {
        self.skinning
    }

    /// Skinning palette in GPU layout
    pub fn bones(&self) -> &[BoneMatrix] {
        &self.bones
    }

    // Frame-local upload de-duplication

    /// Whether this frame's entity constants were already uploaded
    pub const fn is_updated_this_frame(&self) -> bool {
        self.updated_this_frame
    }

    pub(crate) fn mark_updated(&mut self) {
        self.updated_this_frame = true;
    }

    pub(crate) fn reset_frame_flag(&mut self) {
        self.updated_this_frame = false;
    }
}
