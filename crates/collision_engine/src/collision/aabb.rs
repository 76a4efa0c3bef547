//! Axis-aligned bounding boxes
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.4.2:
//! "An axis-aligned bounding box (AABB) is a rectangular volume whose faces
//! are parallel to the axes of the coordinate system."

use crate::collision::ray::Ray;
use crate::foundation::math::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
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

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| aabb.expanded_to(p)))
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full edge lengths
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// True when min <= max on every axis and all components are finite
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|c| c.is_finite())
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB fully contains another
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x &&
        self.min.y <= other.min.y && self.max.y >= other.max.y &&
        self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grow the box so it contains `point`
    pub fn expanded_to(&self, point: &Vec3) -> Self {
        Self {
            min: self.min.inf(point),
            max: self.max.sup(point),
        }
    }

    /// Grow the box by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        let m = Vec3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Surface area, the cost metric used when inserting into the BVH
    pub fn surface_area(&self) -> f32 {
        let d = self.size();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Enclosed volume
    pub fn volume(&self) -> f32 {
        let d = self.size();
        d.x * d.y * d.z
    }

    /// The eight corner points
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }

    /// Closest point inside the box to `point`
    pub fn closest_point(&self, point: &Vec3) -> Vec3 {
        point.sup(&self.min).inf(&self.max)
    }

    /// Test ray intersection with this AABB using slab method
    ///
    /// Returns the distance along the ray to the entry point if the ray
    /// intersects (0 when the origin is inside), `None` otherwise.
    /// Based on "An Efficient and Robust Ray–Box Intersection Algorithm"
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            if ray.direction[axis] == 0.0 {
                // Parallel to this slab: either always inside or never
                if ray.origin[axis] < self.min[axis] || ray.origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv_dir = 1.0 / ray.direction[axis];
            let t1 = (self.min[axis] - ray.origin[axis]) * inv_dir;
            let t2 = (self.max[axis] - ray.origin[axis]) * inv_dir;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_aabb_containment_and_intersection() {
        let outer = unit_box();
        let inner = Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5));
        let apart = Aabb::from_center_extents(Vec3::new(5.0, 0.0, 0.0), Vec3::repeat(0.5));

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&apart));
        assert!(outer.contains_point(&Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_union_and_surface_area() {
        let a = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.0));
        let u = a.union(&b);

        assert_eq!(u.min, Vec3::zeros());
        assert_eq!(u.max, Vec3::new(3.0, 1.0, 1.0));
        assert_relative_eq!(a.surface_area(), 6.0);
        assert_relative_eq!(u.volume(), 3.0);
    }

    #[test]
    fn test_aabb_from_points() {
        let points = [Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 4.0)];
        let aabb = Aabb::from_points(points.iter()).expect("non-empty");
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 4.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_aabb_ray_intersection() {
        let aabb = unit_box();

        let hit = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(aabb.intersect_ray(&hit).expect("hit"), 9.0);

        let miss = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(aabb.intersect_ray(&miss).is_none());

        let behind = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&behind).is_none());

        let inside = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(aabb.intersect_ray(&inside), Some(0.0));
    }

    #[test]
    fn test_aabb_validity() {
        assert!(unit_box().is_valid());
        assert!(!Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros()).is_valid());
        assert!(!Aabb::new(Vec3::zeros(), Vec3::new(f32::NAN, 0.0, 0.0)).is_valid());
    }
}
