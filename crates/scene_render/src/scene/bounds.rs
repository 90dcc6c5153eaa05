//! Bounding volumes used for mesh collision
//!
//! Axis-aligned boxes come from surface geometry; oriented boxes place
//! them in the world and are tested with the separating axis theorem.

use crate::foundation::math::{Mat3, Quat, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point, `None` for no points
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| Self {
            min: aabb.min.inf(&p),
            max: aabb.max.sup(&p),
        }))
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// World-space center
    pub center: Vec3,
    /// Half sizes along the local axes
    pub extents: Vec3,
    /// Orientation of the local axes
    pub rotation: Quat,
}

impl Default for OrientedBox {
    fn default() -> Self {
        Self {
            center: Vec3::zeros(),
            extents: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl OrientedBox {
    /// Place a local-space box in the world
    ///
    /// The box is scaled component-wise, rotated, then moved to `position`.
    pub fn from_local(local: &Aabb, scale: &Vec3, rotation: Quat, position: Vec3) -> Self {
        let center = position + rotation * local.center().component_mul(scale);
        let extents = local.extents().component_mul(scale).abs();
        Self { center, extents, rotation }
    }

    fn axes(&self) -> [Vec3; 3] {
        let m: Mat3 = *self.rotation.to_rotation_matrix().matrix();
        [m.column(0).into_owned(), m.column(1).into_owned(), m.column(2).into_owned()]
    }

    fn projected_radius(&self, axes: &[Vec3; 3], axis: &Vec3) -> f32 {
        axes.iter()
            .zip(self.extents.iter())
            .map(|(a, e)| a.dot(axis).abs() * e)
            .sum()
    }

    /// Separating axis test against another box
    ///
    /// Touching boxes count as intersecting.
    pub fn intersects(&self, other: &Self) -> bool {
        let a = self.axes();
        let b = other.axes();
        let offset = other.center - self.center;

        let mut candidates = Vec::with_capacity(15);
        candidates.extend_from_slice(&a);
        candidates.extend_from_slice(&b);
        for axis_a in &a {
            for axis_b in &b {
                candidates.push(axis_a.cross(axis_b));
            }
        }

        candidates
            .iter()
            .filter(|axis| axis.norm_squared() > 1e-6)
            .map(|axis| axis.normalize())
            .all(|axis| {
                offset.dot(&axis).abs() <= self.projected_radius(&a, &axis) + other.projected_radius(&b, &axis)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box(position: Vec3, rotation: Quat) -> OrientedBox {
        let local = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        OrientedBox::from_local(&local, &Vec3::new(1.0, 1.0, 1.0), rotation, position)
    }

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points([Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 0.5)]).unwrap();
        assert_relative_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_relative_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_from_local_scales_offset_center() {
        let local = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0));
        let obb = OrientedBox::from_local(&local, &Vec3::new(2.0, 1.0, 1.0), Quat::identity(), Vec3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(obb.center, Vec3::new(12.0, 1.0, 1.0));
        assert_relative_eq!(obb.extents, Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_separated_boxes_do_not_intersect() {
        let a = unit_box(Vec3::zeros(), Quat::identity());
        let b = unit_box(Vec3::new(2.5, 0.0, 0.0), Quat::identity());
        assert!(!a.intersects(&b));
        assert!(a.intersects(&unit_box(Vec3::new(1.5, 0.0, 0.0), Quat::identity())));
    }

    #[test]
    fn test_rotated_box_reaches_further() {
        let a = unit_box(Vec3::zeros(), Quat::identity());
        // A 45 degree turn about Y pushes a corner out to sqrt(2) along X
        let rotated = unit_box(
            Vec3::new(2.3, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_4),
        );
        assert!(a.intersects(&rotated));
        let aligned = unit_box(Vec3::new(2.3, 0.0, 0.0), Quat::identity());
        assert!(!a.intersects(&aligned));
    }
}
