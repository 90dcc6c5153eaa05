//! # Camera
//!
//! Lens parameters and cull mask of a camera entity. The view matrix is
//! not stored here: during the update pass the camera's entity takes the
//! inverse of its world matrix as its view, so a camera looks down its
//! local +Z axis.

use crate::foundation::math::{utils, Mat4, Mat4Ext};
use crate::scene::LayerMask;

/// Lens model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective lens
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Width over height
        aspect: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },
    /// Orthographic lens centred on the view axis
    Orthographic {
        /// View volume width
        width: f32,
        /// View volume height
        height: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },
}

impl Projection {
    /// Left-handed projection matrix for this lens
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective { fov_y, aspect, near, far } => Mat4::perspective_fov_lh(fov_y, aspect, near, far),
            Self::Orthographic { width, height, near, far } => Mat4::orthographic_lh(width, height, near, far),
        }
    }
}

/// Camera data of a camera entity
///
/// # Defaults
/// 45 degree vertical field of view, 16:9 aspect, planes at 0.1 and 1000,
/// cull mask [`LayerMask::ALL`].
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Projection,
    cull_mask: LayerMask,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y: utils::deg_to_rad(45.0),
                aspect: 16.0 / 9.0,
                near: 0.1,
                far: 1000.0,
            },
            cull_mask: LayerMask::ALL,
        }
    }
}

impl Camera {
    /// Layers this camera draws
    pub const fn cull_mask(&self) -> LayerMask {
        self.cull_mask
    }

    /// Set the layers this camera draws
    pub fn set_cull_mask(&mut self, mask: LayerMask) {
        self.cull_mask = mask;
    }

    /// Whether an entity on `layers` is visible to this camera
    pub const fn sees(&self, layers: LayerMask) -> bool {
        self.cull_mask.sees(layers)
    }

    /// Current lens
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Use a perspective lens; `fov_degrees` is the vertical field of view
    pub fn set_perspective(&mut self, fov_degrees: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Projection::Perspective {
            fov_y: utils::deg_to_rad(fov_degrees.clamp(1.0, 179.0)),
            aspect: aspect.max(f32::EPSILON),
            near: near.max(0.001),
            far: far.max(near.max(0.001) + 0.001),
        };
    }

    /// Use an orthographic lens
    pub fn set_orthographic(&mut self, width: f32, height: f32, near: f32, far: f32) {
        self.projection = Projection::Orthographic {
            width: width.max(0.01),
            height: height.max(0.01),
            near,
            far: far.max(near + 0.001),
        };
    }

    /// Update the aspect ratio (e.g. after a resize)
    ///
    /// Orthographic lenses keep their height and adapt their width.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if aspect <= 0.0 || !aspect.is_finite() {
            log::warn!("Ignoring invalid camera aspect ratio {}", aspect);
            return;
        }
        match &mut self.projection {
            Projection::Perspective { aspect: current, .. } => {
                if (*current - aspect).abs() > f32::EPSILON {
                    log::debug!("Camera aspect ratio {:.3} -> {:.3}", current, aspect);
                }
                *current = aspect;
            }
            Projection::Orthographic { width, height, .. } => *width = *height * aspect,
        }
    }

    /// Projection matrix of the current lens
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }
}
