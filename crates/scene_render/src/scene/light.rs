//! # Lights
//!
//! Light data of a light entity, the shader-visible record the light
//! aggregator packs, and the view/projection pair used to render the
//! shadow map.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{safe_up, utils, Mat4, Mat4Ext, Vec3};

/// Light kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Parallel rays, orthographic shadow projection
    Directional,
    /// Omni light with a radius, perspective shadow projection
    Point,
}

/// Shader-visible light fields
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    /// World position, w = 0 for directional and 1 for point lights
    pub position: [f32; 4],
    /// World direction, w unused
    pub direction: [f32; 4],
    /// RGB diffuse color, radius in w
    pub diffuse: [f32; 4],
    /// RGBA ambient color
    pub ambient: [f32; 4],
}

/// Light data of a light entity
///
/// # Defaults
/// Directional, diffuse `(1.0, 0.8, 1.0)` with radius 100, ambient 0.2 grey,
/// shadow ortho size 50, planes 0.1 and 1000, field of view 90 degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    light_type: LightType,
    diffuse: [f32; 4],
    ambient: [f32; 4],
    shadow_ortho_size: f32,
    shadow_near: f32,
    shadow_far: f32,
    shadow_fov: f32,
    position: Vec3,
    direction: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self::new(LightType::Directional)
    }
}

impl Light {
    /// Create a light of the given kind with default parameters
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            diffuse: [1.0, 0.8, 1.0, 100.0],
            ambient: [0.2, 0.2, 0.2, 1.0],
            shadow_ortho_size: 50.0,
            shadow_near: 0.1,
            shadow_far: 1000.0,
            shadow_fov: std::f32::consts::FRAC_PI_2,
            position: Vec3::zeros(),
            direction: Vec3::z(),
        }
    }

    /// Light kind
    pub const fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Change the light kind
    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
    }

    /// Set the RGB diffuse color, keeping the radius
    pub fn set_diffuse_color(&mut self, r: f32, g: f32, b: f32) {
        self.diffuse = [r, g, b, self.diffuse[3]];
    }

    /// Set the RGBA ambient color
    pub fn set_ambient_color(&mut self, color: [f32; 4]) {
        self.ambient = color;
    }

    /// Point light radius
    pub const fn radius(&self) -> f32 {
        self.diffuse[3]
    }

    /// Set the point light radius
    pub fn set_radius(&mut self, radius: f32) {
        self.diffuse[3] = radius.max(0.0);
    }

    /// Set the width and height of the directional shadow volume
    pub fn set_shadow_ortho_size(&mut self, size: f32) {
        self.shadow_ortho_size = size.max(0.01);
    }

    /// Set the shadow near and far planes
    pub fn set_shadow_planes(&mut self, near: f32, far: f32) {
        self.shadow_near = near.max(0.001);
        self.shadow_far = far.max(self.shadow_near + 0.001);
    }

    /// Set the point light shadow field of view in radians
    pub fn set_shadow_fov(&mut self, fov: f32) {
        self.shadow_fov = fov.clamp(utils::deg_to_rad(5.0), utils::deg_to_rad(170.0));
    }

    /// World position from the last update pass
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// World direction from the last update pass
    pub const fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Store the world placement computed by the update pass
    pub(crate) fn place(&mut self, position: Vec3, direction: Vec3) {
        self.position = position;
        self.direction = direction;
    }

    /// Shader-visible record of the light
    pub fn record(&self) -> LightRecord {
        let w = match self.light_type {
            LightType::Directional => 0.0,
            LightType::Point => 1.0,
        };
        LightRecord {
            position: [self.position.x, self.position.y, self.position.z, w],
            direction: [self.direction.x, self.direction.y, self.direction.z, 0.0],
            diffuse: self.diffuse,
            ambient: self.ambient,
        }
    }

    /// View matrix for rendering the shadow map
    ///
    /// Looks from the light position along its direction. A zero direction
    /// falls back to straight down.
    pub fn view_matrix(&self) -> Mat4 {
        let direction = if self.direction.norm_squared() <= f32::EPSILON {
            -Vec3::y()
        } else {
            self.direction.normalize()
        };
        let up = safe_up(&direction, &Vec3::y());
        Mat4::view_look_to_lh(self.position, direction, up)
    }

    /// Projection matrix for rendering the shadow map
    pub fn projection_matrix(&self) -> Mat4 {
        match self.light_type {
            LightType::Directional => Mat4::orthographic_lh(
                self.shadow_ortho_size,
                self.shadow_ortho_size,
                self.shadow_near,
                self.shadow_far,
            ),
            LightType::Point => Mat4::perspective_fov_lh(self.shadow_fov, 1.0, self.shadow_near, self.shadow_far),
        }
    }
}
