//! Math utilities and types
//!
//! Provides the math types used by the scene data model and the render
//! pipeline. All projection helpers produce left-handed matrices with a
//! `[0, 1]` depth range and are meant to be applied to column vectors
//! (`clip = projection * view * world * position`).

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit, UnitQuaternion,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Column-major 4x4 matrix as uploaded to GPU constant blocks
pub type GpuMatrix = [[f32; 4]; 4];

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Split an affine matrix into translation, rotation and scale
    ///
    /// Shear is discarded. Degenerate axes give an identity rotation.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        let basis: Mat3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let scale = Vec3::new(basis.column(0).norm(), basis.column(1).norm(), basis.column(2).norm());

        let rotation = if scale.iter().all(|s| *s > f32::EPSILON) {
            let unscaled = Mat3::from_columns(&[
                basis.column(0) / scale.x,
                basis.column(1) / scale.y,
                basis.column(2) / scale.z,
            ]);
            Quat::from_matrix(&unscaled)
        } else {
            Quat::identity()
        };

        Self { position, rotation, scale }
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Local forward axis (+Z) rotated into parent space
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::z()
    }

    /// Rotate so that the forward axis points at `target`
    ///
    /// Leaves the rotation untouched when `target` coincides with the position.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let direction = target - self.position;
        if direction.norm_squared() <= f32::EPSILON {
            return;
        }
        self.rotation = Quat::face_towards(&direction, &safe_up(&direction, &up));
    }

    /// Rotate so that the forward axis points along `direction`
    pub fn look_to(&mut self, direction: Vec3, up: Vec3) {
        if direction.norm_squared() <= f32::EPSILON {
            return;
        }
        self.rotation = Quat::face_towards(&direction, &safe_up(&direction, &up));
    }

    /// Move by `offset` in parent space
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Apply an additional rotation given as euler angles in radians
    pub fn rotate_euler(&mut self, pitch: f32, yaw: f32, roll: f32) {
        self.rotation *= Quat::from_euler_angles(pitch, yaw, roll);
    }
}

/// Pick an up vector that is not (nearly) parallel to `direction`
///
/// Falls back to +Z when the requested up and the direction are within
/// roughly eleven degrees of each other.
pub fn safe_up(direction: &Vec3, up: &Vec3) -> Vec3 {
    let dir = direction.normalize();
    let up_n = up.normalize();
    if dir.dot(&up_n).abs() > 0.98 {
        if dir.z.abs() > 0.98 {
            Vec3::y()
        } else {
            Vec3::z()
        }
    } else {
        up_n
    }
}

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians.to_degrees()
    }

    /// Convert a matrix into the column-major array layout used by GPU blocks
    pub fn to_gpu(matrix: &super::Mat4) -> super::GpuMatrix {
        (*matrix).into()
    }
}

/// Extension trait for Mat4 with the projection and view helpers the
/// pipeline needs
pub trait Mat4Ext {
    /// Create a left-handed perspective projection matrix (depth 0..1)
    fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a left-handed orthographic projection centred on the view axis
    fn orthographic_lh(width: f32, height: f32, near: f32, far: f32) -> Mat4;

    /// Create a left-handed view matrix looking from `eye` along `direction`
    fn view_look_to_lh(eye: Vec3, direction: Vec3, up: Vec3) -> Mat4;

    /// Create a left-handed view matrix looking from `eye` at `target`
    fn view_look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [a⁻¹/tan(φ/2)    0              0          0         ]
        //     [0               1/tan(φ/2)     0          0         ]
        //     [0               0              f/(f-n)    -nf/(f-n) ]
        //     [0               0              1          0         ]
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;
        result
    }

    fn orthographic_lh(width: f32, height: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / width;
        result[(1, 1)] = 2.0 / height;
        result[(2, 2)] = 1.0 / (far - near);
        result[(2, 3)] = -near / (far - near);
        result
    }

    fn view_look_to_lh(eye: Vec3, direction: Vec3, up: Vec3) -> Mat4 {
        let forward = direction.normalize();
        let right = up.cross(&forward).normalize();
        let camera_up = forward.cross(&right);

        Mat4::new(
            right.x, right.y, right.z, -right.dot(&eye),
            camera_up.x, camera_up.y, camera_up.z, -camera_up.dot(&eye),
            forward.x, forward.y, forward.z, -forward.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn view_look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::view_look_to_lh(eye, target - eye, up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_transform_matrix_applies_scale_then_rotation_then_translation() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        transform.scale = Vec3::new(2.0, 2.0, 2.0);
        let point = transform.to_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point, Point3::new(3.0, 2.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_from_matrix_recovers_components() {
        let original = Transform {
            position: Vec3::new(1.0, -2.0, 3.0),
            rotation: Quat::from_euler_angles(0.3, 0.2, 0.1),
            scale: Vec3::new(2.0, 0.5, 1.5),
        };
        let recovered = Transform::from_matrix(&original.to_matrix());
        assert_relative_eq!(recovered.position, original.position, epsilon = EPSILON);
        assert_relative_eq!(recovered.scale, original.scale, epsilon = EPSILON);
        assert_relative_eq!(recovered.rotation.angle_to(&original.rotation), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_look_to_matches_inverse_of_facing_transform() {
        let eye = Vec3::new(0.0, 5.0, -10.0);
        let direction = Vec3::new(0.0, -0.5, 1.0);

        let mut transform = Transform::from_position(eye);
        transform.look_to(direction, Vec3::y());
        let inverse = transform.to_matrix().try_inverse().unwrap();

        let view = Mat4::view_look_to_lh(eye, direction, Vec3::y());
        assert_relative_eq!(view, inverse, epsilon = EPSILON);
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective_fov_lh(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        let near = proj * Vec4::new(0.0, 0.0, 1.0, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, 100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = EPSILON);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_orthographic_maps_depth_range() {
        let proj = Mat4::orthographic_lh(50.0, 50.0, 0.1, 1000.0);
        let near = proj * Vec4::new(25.0, -25.0, 0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, 1000.0, 1.0);
        assert_relative_eq!(near.x, 1.0, epsilon = EPSILON);
        assert_relative_eq!(near.y, -1.0, epsilon = EPSILON);
        assert_relative_eq!(near.z, 0.0, epsilon = EPSILON);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_safe_up_avoids_parallel_axis() {
        let up = safe_up(&Vec3::new(0.0, -1.0, 0.0), &Vec3::y());
        assert_relative_eq!(up, Vec3::z(), epsilon = EPSILON);

        let up = safe_up(&Vec3::new(1.0, -1.0, 0.0), &Vec3::y());
        assert_relative_eq!(up, Vec3::y(), epsilon = EPSILON);
    }
}
