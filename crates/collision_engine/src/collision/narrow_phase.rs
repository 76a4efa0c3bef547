//! Narrow phase: exact shape-vs-shape collision tests
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.5:
//! "Once the broad phase has produced a list of potentially colliding pairs,
//! the narrow phase determines whether each pair is actually in contact."
//!
//! Handlers are registered once per unordered pair of shape types in
//! [`PairKind`]. Inputs are put in canonical order (by shape type, then by
//! shape ID) before dispatch and the result is flipped back afterwards, so
//! testing A against B and B against A always yields exactly negated
//! separation deltas.

use crate::collision::geometry::{
    closest_point_on_convex_polygon, closest_point_on_segment, closest_points_between_segments,
    closest_points_segment_polygon, Plane,
};
use crate::collision::shape::{Shape, ShapeGeometry, ShapeId, ShapeType};
use crate::foundation::math::{utils, RigidTransform, Vec3, EPSILON};

/// One tested pair of shapes and how they touch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePairCollisionStatus {
    /// First shape of the pair
    pub shape_a: ShapeId,
    /// Second shape of the pair
    pub shape_b: ShapeId,
    /// True if the shapes overlap
    pub in_collision: bool,
    /// Rough center of the overlap region, world space
    pub collision_center: Vec3,
    /// Translation that moves `shape_a` out of `shape_b`
    pub separation_delta: Vec3,
}

impl ShapePairCollisionStatus {
    /// Status for a pair that does not touch
    pub fn separated(shape_a: ShapeId, shape_b: ShapeId) -> Self {
        Self {
            shape_a,
            shape_b,
            in_collision: false,
            collision_center: Vec3::zeros(),
            separation_delta: Vec3::zeros(),
        }
    }

    /// True if `shape_id` is one of the pair
    pub fn involves(&self, shape_id: ShapeId) -> bool {
        self.shape_a == shape_id || self.shape_b == shape_id
    }

    /// Delta that moves `shape_id` out of the other shape
    pub fn separation_delta_for(&self, shape_id: ShapeId) -> Option<Vec3> {
        if shape_id == self.shape_a {
            Some(self.separation_delta)
        } else if shape_id == self.shape_b {
            Some(-self.separation_delta)
        } else {
            None
        }
    }

    /// The member of the pair that is not `shape_id`
    pub fn other_shape(&self, shape_id: ShapeId) -> Option<ShapeId> {
        if shape_id == self.shape_a {
            Some(self.shape_b)
        } else if shape_id == self.shape_b {
            Some(self.shape_a)
        } else {
            None
        }
    }

    /// Penetration depth
    pub fn separation_delta_length(&self) -> f32 {
        self.separation_delta.norm()
    }

    /// Same contact seen from the other shape
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            shape_a: self.shape_b,
            shape_b: self.shape_a,
            in_collision: self.in_collision,
            collision_center: self.collision_center,
            separation_delta: -self.separation_delta,
        }
    }

    /// This status oriented so that `shape_id` is `shape_a`
    #[must_use]
    pub fn oriented_for(&self, shape_id: ShapeId) -> Self {
        if self.shape_b == shape_id {
            self.flipped()
        } else {
            *self
        }
    }
}

/// Narrow phase failures
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrowPhaseError {
    /// No handler exists for this combination of shape types
    #[error("collision between {0} and {1} shapes is not supported")]
    Unsupported(ShapeType, ShapeType),
}

/// Every unordered pair of shape types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairKind {
    /// Sphere vs sphere
    SphereSphere,
    /// Sphere vs box
    SphereBox,
    /// Sphere vs capsule
    SphereCapsule,
    /// Sphere vs polygon
    SpherePolygon,
    /// Box vs box
    BoxBox,
    /// Box vs capsule
    BoxCapsule,
    /// Box vs polygon
    BoxPolygon,
    /// Capsule vs capsule
    CapsuleCapsule,
    /// Capsule vs polygon
    CapsulePolygon,
    /// Polygon vs polygon
    PolygonPolygon,
}

const PAIR_TABLE: [[PairKind; 4]; 4] = {
    use PairKind::{
        BoxBox, BoxCapsule, BoxPolygon, CapsuleCapsule, CapsulePolygon, PolygonPolygon,
        SphereBox, SphereCapsule, SpherePolygon, SphereSphere,
    };
    [
        [SphereSphere, SphereBox, SphereCapsule, SpherePolygon],
        [SphereBox, BoxBox, BoxCapsule, BoxPolygon],
        [SphereCapsule, BoxCapsule, CapsuleCapsule, CapsulePolygon],
        [SpherePolygon, BoxPolygon, CapsulePolygon, PolygonPolygon],
    ]
};

/// Contact between two shapes given in canonical order.
/// `delta` moves the first shape out of the second.
struct Contact {
    center: Vec3,
    delta: Vec3,
}

type PairHandler = fn(&Shape, &Shape) -> Option<Contact>;

impl PairKind {
    /// Pair kind for two shape types, in either order
    pub fn of(a: ShapeType, b: ShapeType) -> Self {
        PAIR_TABLE[a.index()][b.index()]
    }

    /// True if the narrow phase can test this pair
    pub fn is_supported(self) -> bool {
        self.handler().is_some()
    }

    fn handler(self) -> Option<PairHandler> {
        match self {
            Self::SphereSphere => Some(sphere_sphere),
            Self::SphereBox => Some(sphere_box),
            Self::SphereCapsule => Some(sphere_capsule),
            Self::SpherePolygon => Some(sphere_polygon),
            Self::BoxBox => Some(box_box),
            Self::BoxCapsule => Some(box_capsule),
            Self::CapsuleCapsule => Some(capsule_capsule),
            Self::CapsulePolygon => Some(capsule_polygon),
            Self::BoxPolygon | Self::PolygonPolygon => None,
        }
    }
}

/// Test two shapes against each other
///
/// The returned status always has `shape_a == id_a`.
pub fn collide(
    id_a: ShapeId,
    shape_a: &Shape,
    id_b: ShapeId,
    shape_b: &Shape,
) -> Result<ShapePairCollisionStatus, NarrowPhaseError> {
    let swap = (shape_b.shape_type(), id_b) < (shape_a.shape_type(), id_a);
    let (first_id, first, second_id, second) = if swap {
        (id_b, shape_b, id_a, shape_a)
    } else {
        (id_a, shape_a, id_b, shape_b)
    };

    let handler = PairKind::of(first.shape_type(), second.shape_type())
        .handler()
        .ok_or(NarrowPhaseError::Unsupported(first.shape_type(), second.shape_type()))?;

    let status = match handler(first, second) {
        Some(contact) => ShapePairCollisionStatus {
            shape_a: first_id,
            shape_b: second_id,
            in_collision: true,
            collision_center: contact.center,
            separation_delta: contact.delta,
        },
        None => ShapePairCollisionStatus::separated(first_id, second_id),
    };

    Ok(if swap { status.flipped() } else { status })
}

// ---------------------------------------------------------------------------
// World-space views of each geometry

fn world_sphere(shape: &Shape) -> Option<(Vec3, f32)> {
    match shape.geometry() {
        ShapeGeometry::Sphere(sphere) => Some((sphere.world_center(shape.object_to_world()), sphere.radius)),
        _ => None,
    }
}

fn world_capsule(shape: &Shape) -> Option<(Vec3, Vec3, f32)> {
    match shape.geometry() {
        ShapeGeometry::Capsule(capsule) => {
            let (a, b) = capsule.world_spine(shape.object_to_world());
            Some((a, b, capsule.radius))
        }
        _ => None,
    }
}

fn box_extents(shape: &Shape) -> Option<Vec3> {
    match shape.geometry() {
        ShapeGeometry::Box(box_shape) => Some(box_shape.extents),
        _ => None,
    }
}

fn world_polygon(shape: &Shape) -> Option<(&[Vec3], Plane)> {
    let cache = shape.world_polygon();
    Some((cache.vertices.as_slice(), cache.plane?))
}

// ---------------------------------------------------------------------------
// Handlers

fn spheres(center_a: &Vec3, radius_a: f32, center_b: &Vec3, radius_b: f32) -> Option<Contact> {
    let offset = center_a - center_b;
    let distance = offset.norm();
    let radius_sum = radius_a + radius_b;
    if distance >= radius_sum {
        return None;
    }
    let normal = if distance > EPSILON { offset / distance } else { Vec3::y() };
    Some(Contact {
        center: (center_a - normal * radius_a + center_b + normal * radius_b) * 0.5,
        delta: normal * (radius_sum - distance),
    })
}

fn sphere_sphere(a: &Shape, b: &Shape) -> Option<Contact> {
    let (center_a, radius_a) = world_sphere(a)?;
    let (center_b, radius_b) = world_sphere(b)?;
    spheres(&center_a, radius_a, &center_b, radius_b)
}

fn sphere_capsule(sphere: &Shape, capsule: &Shape) -> Option<Contact> {
    let (center, radius) = world_sphere(sphere)?;
    let (spine_a, spine_b, capsule_radius) = world_capsule(capsule)?;
    let (closest, _) = closest_point_on_segment(&center, &spine_a, &spine_b);
    spheres(&center, radius, &closest, capsule_radius)
}

fn sphere_polygon(sphere: &Shape, polygon: &Shape) -> Option<Contact> {
    let (center, radius) = world_sphere(sphere)?;
    let (vertices, plane) = world_polygon(polygon)?;
    let closest = closest_point_on_convex_polygon(&center, vertices, &plane);
    let offset = center - closest;
    let distance = offset.norm();
    if distance >= radius {
        return None;
    }
    let normal = if distance > EPSILON {
        offset / distance
    } else if plane.signed_distance(&center) < 0.0 {
        -plane.normal
    } else {
        plane.normal
    };
    Some(Contact {
        center: closest,
        delta: normal * (radius - distance),
    })
}

fn sphere_box(sphere: &Shape, box_shape: &Shape) -> Option<Contact> {
    let (center, radius) = world_sphere(sphere)?;
    let extents = box_extents(box_shape)?;
    let to_world = box_shape.object_to_world();

    let local = box_shape.world_to_object().transform_point(&center);
    let clamped = local.sup(&-extents).inf(&extents);
    let offset = local - clamped;
    let distance = offset.norm();

    let (local_center, local_delta) = if distance > EPSILON {
        if distance >= radius {
            return None;
        }
        (clamped, offset / distance * (radius - distance))
    } else {
        // Center is inside the box: leave through the nearest face
        let (axis, gap) = (0..3)
            .map(|axis| (axis, extents[axis] - local[axis].abs()))
            .fold((0, f32::INFINITY), |best, candidate| if candidate.1 < best.1 { candidate } else { best });
        let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut normal = Vec3::zeros();
        normal[axis] = sign;
        let mut face_point = local;
        face_point[axis] = sign * extents[axis];
        (face_point, normal * (gap + radius))
    };

    Some(Contact {
        center: to_world.transform_point(&local_center),
        delta: to_world.transform_vector(&local_delta),
    })
}

struct BoxFrame {
    center: Vec3,
    axes: [Vec3; 3],
    extents: Vec3,
}

impl BoxFrame {
    fn of(shape: &Shape) -> Option<Self> {
        let extents = box_extents(shape)?;
        let transform = shape.object_to_world();
        Some(Self {
            center: transform.translation,
            axes: [Vec3::x(), Vec3::y(), Vec3::z()].map(|axis| transform.transform_vector(&axis)),
            extents,
        })
    }

    fn projected_radius(&self, axis: &Vec3) -> f32 {
        (0..3).map(|i| self.extents[i] * axis.dot(&self.axes[i]).abs()).sum()
    }
}

fn closest_point_in_box(point: &Vec3, extents: &Vec3, to_world: &RigidTransform, to_object: &RigidTransform) -> Vec3 {
    let local = to_object.transform_point(point);
    to_world.transform_point(&local.sup(&-extents).inf(extents))
}

fn box_box(a: &Shape, b: &Shape) -> Option<Contact> {
    let frame_a = BoxFrame::of(a)?;
    let frame_b = BoxFrame::of(b)?;
    let between = frame_b.center - frame_a.center;

    let mut candidates: Vec<Vec3> = Vec::with_capacity(15);
    candidates.extend_from_slice(&frame_a.axes);
    candidates.extend_from_slice(&frame_b.axes);
    for axis_a in &frame_a.axes {
        for axis_b in &frame_b.axes {
            // Parallel edges give no new separating direction
            if let Some(axis) = axis_a.cross(axis_b).try_normalize(1e-4) {
                candidates.push(axis);
            }
        }
    }

    let mut best_overlap = f32::INFINITY;
    let mut best_direction = Vec3::y();
    for axis in candidates {
        let distance = axis.dot(&between);
        let overlap = frame_a.projected_radius(&axis) + frame_b.projected_radius(&axis) - distance.abs();
        if overlap <= 0.0 {
            return None;
        }
        if overlap < best_overlap {
            best_overlap = overlap;
            best_direction = if distance > 0.0 { -axis } else { axis };
        }
    }

    let on_a = closest_point_in_box(&frame_b.center, &frame_a.extents, a.object_to_world(), a.world_to_object());
    let on_b = closest_point_in_box(&frame_a.center, &frame_b.extents, b.object_to_world(), b.world_to_object());

    Some(Contact {
        center: (on_a + on_b) * 0.5,
        delta: best_direction * best_overlap,
    })
}

fn box_capsule(box_shape: &Shape, capsule: &Shape) -> Option<Contact> {
    let extents = box_extents(box_shape)?;
    let (spine_a, spine_b, radius) = world_capsule(capsule)?;
    let to_object = box_shape.world_to_object();
    let to_world = box_shape.object_to_world();
    let p0 = to_object.transform_point(&spine_a);
    let p1 = to_object.transform_point(&spine_b);

    let distance_at = |t: f32| {
        let point = utils::lerp(&p0, &p1, t);
        let clamped = point.sup(&-extents).inf(&extents);
        (point, clamped, (point - clamped).norm())
    };

    // Distance from a convex set along a segment is convex in t
    let golden = 0.618_034_f32;
    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    for _ in 0..48 {
        let t1 = hi - golden * (hi - lo);
        let t2 = lo + golden * (hi - lo);
        if distance_at(t1).2 < distance_at(t2).2 {
            hi = t2;
        } else {
            lo = t1;
        }
    }
    let (point, clamped, distance) = [distance_at(0.0), distance_at((lo + hi) * 0.5), distance_at(1.0)]
        .into_iter()
        .fold((Vec3::zeros(), Vec3::zeros(), f32::INFINITY), |best, sample| if sample.2 < best.2 { sample } else { best });

    if distance > EPSILON {
        if distance >= radius {
            return None;
        }
        let normal = (point - clamped) / distance;
        return Some(Contact {
            center: to_world.transform_point(&clamped),
            delta: to_world.transform_vector(&(-normal * (radius - distance))),
        });
    }

    // The spine passes through the box: find the cheapest push-out direction
    let spine = p1 - p0;
    let mut axes = vec![Vec3::x(), Vec3::y(), Vec3::z()];
    for axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
        if let Some(cross) = spine.cross(&axis).try_normalize(1e-4) {
            axes.push(cross);
        }
    }

    let mut best_push = f32::INFINITY;
    let mut best_delta = Vec3::zeros();
    for axis in axes {
        let box_radius = extents.x * axis.x.abs() + extents.y * axis.y.abs() + extents.z * axis.z.abs();
        let (s0, s1) = (axis.dot(&p0), axis.dot(&p1));
        let (seg_lo, seg_hi) = (s0.min(s1), s0.max(s1));
        // Push the capsule along +axis, or along -axis; the box moves the opposite way
        let push_positive = box_radius - (seg_lo - radius);
        let push_negative = (seg_hi + radius) + box_radius;
        if push_positive < best_push {
            best_push = push_positive;
            best_delta = -axis * push_positive;
        }
        if push_negative < best_push {
            best_push = push_negative;
            best_delta = axis * push_negative;
        }
    }

    Some(Contact {
        center: to_world.transform_point(&point),
        delta: to_world.transform_vector(&best_delta),
    })
}

fn capsule_capsule(a: &Shape, b: &Shape) -> Option<Contact> {
    let (a0, a1, radius_a) = world_capsule(a)?;
    let (b0, b1, radius_b) = world_capsule(b)?;
    let (on_a, on_b) = closest_points_between_segments(&a0, &a1, &b0, &b1);

    let offset = on_a - on_b;
    let distance = offset.norm();
    let radius_sum = radius_a + radius_b;
    if distance >= radius_sum {
        return None;
    }
    let normal = if distance > EPSILON {
        offset / distance
    } else {
        // Spines cross: push perpendicular to both
        let dir_a = a1 - a0;
        dir_a
            .cross(&(b1 - b0))
            .try_normalize(EPSILON)
            .or_else(|| utils::try_normalize(&dir_a).map(|d| utils::any_perpendicular(&d)))
            .unwrap_or_else(Vec3::y)
    };
    Some(Contact {
        center: (on_a - normal * radius_a + on_b + normal * radius_b) * 0.5,
        delta: normal * (radius_sum - distance),
    })
}

fn capsule_polygon(capsule: &Shape, polygon: &Shape) -> Option<Contact> {
    let (spine_a, spine_b, radius) = world_capsule(capsule)?;
    let (vertices, plane) = world_polygon(polygon)?;
    let (on_spine, on_polygon) = closest_points_segment_polygon(&spine_a, &spine_b, vertices, &plane);

    let offset = on_spine - on_polygon;
    let distance = offset.norm();
    if distance > EPSILON {
        if distance >= radius {
            return None;
        }
        return Some(Contact {
            center: on_polygon,
            delta: offset / distance * (radius - distance),
        });
    }

    // The spine pierces the polygon: leave along whichever side of the plane is closer
    let (da, db) = (plane.signed_distance(&spine_a), plane.signed_distance(&spine_b));
    let push_up = radius - da.min(db);
    let push_down = radius + da.max(db);
    let delta = if push_up <= push_down {
        plane.normal * push_up
    } else {
        -plane.normal * push_down
    };
    Some(Contact { center: on_polygon, delta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;
    use crate::foundation::math::{constants, Quat};
    use crate::collision::shape::ShapeKey;
    use approx::assert_relative_eq;

    fn ids() -> (ShapeId, ShapeId) {
        let mut keys: SlotMap<ShapeKey, ()> = SlotMap::with_key();
        (ShapeId::from_key(keys.insert(())), ShapeId::from_key(keys.insert(())))
    }

    fn floor() -> Shape {
        Shape::polygon(vec![
            Vec3::new(-5.0, 0.0, 5.0),
            Vec3::new(5.0, 0.0, 5.0),
            Vec3::new(5.0, 0.0, -5.0),
            Vec3::new(-5.0, 0.0, -5.0),
        ])
    }

    fn assert_symmetric(a: &Shape, b: &Shape) {
        let (id_a, id_b) = ids();
        let forward = collide(id_a, a, id_b, b).expect("supported pair");
        let backward = collide(id_b, b, id_a, a).expect("supported pair");

        assert!(forward.in_collision, "{:?} vs {:?} should collide", a.shape_type(), b.shape_type());
        assert!(backward.in_collision);
        assert_eq!(forward.shape_a, id_a);
        assert_eq!(backward.shape_a, id_b);

        let delta_a = forward.separation_delta_for(id_a).expect("a in pair");
        let delta_b = backward.separation_delta_for(id_b).expect("b in pair");
        assert_relative_eq!(delta_a, -delta_b, epsilon = 1e-6);
        assert_relative_eq!(
            forward.separation_delta_for(id_b).expect("b in pair"),
            backward.separation_delta_for(id_b).expect("b in pair"),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_pair_table_is_symmetric() {
        for a in ShapeType::ALL {
            for b in ShapeType::ALL {
                assert_eq!(PairKind::of(a, b), PairKind::of(b, a));
            }
        }
        assert!(!PairKind::of(ShapeType::Polygon, ShapeType::Polygon).is_supported());
        assert!(!PairKind::of(ShapeType::Polygon, ShapeType::Box).is_supported());
        assert!(PairKind::of(ShapeType::Capsule, ShapeType::Polygon).is_supported());
    }

    #[test]
    fn test_sphere_sphere_separation() {
        let (id_a, id_b) = ids();
        let a = Shape::sphere(1.0);
        let b = Shape::sphere(1.0).with_position(Vec3::new(1.5, 0.0, 0.0));

        let status = collide(id_a, &a, id_b, &b).expect("supported");
        assert!(status.in_collision);
        assert_relative_eq!(status.separation_delta, Vec3::new(-0.5, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(status.separation_delta_length(), 0.5, epsilon = 1e-6);
        assert_eq!(status.other_shape(id_a), Some(id_b));
    }

    #[test]
    fn test_separated_spheres() {
        let (id_a, id_b) = ids();
        let a = Shape::sphere(1.0);
        let b = Shape::sphere(1.0).with_position(Vec3::new(3.0, 0.0, 0.0));
        let status = collide(id_a, &a, id_b, &b).expect("supported");
        assert!(!status.in_collision);
        assert_eq!(status.separation_delta, Vec3::zeros());
    }

    #[test]
    fn test_sphere_resting_on_box() {
        let (id_a, id_b) = ids();
        let sphere = Shape::sphere(1.0).with_position(Vec3::new(0.0, 1.5, 0.0));
        let ground = Shape::cuboid(Vec3::new(5.0, 1.0, 5.0));

        let status = collide(id_a, &sphere, id_b, &ground).expect("supported");
        assert!(status.in_collision);
        assert_relative_eq!(status.separation_delta, Vec3::new(0.0, 0.5, 0.0), epsilon = 1e-5);
        assert_relative_eq!(status.collision_center, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_center_inside_box() {
        let (id_a, id_b) = ids();
        let sphere = Shape::sphere(0.5).with_position(Vec3::new(0.0, 0.8, 0.0));
        let block = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let status = collide(id_a, &sphere, id_b, &block).expect("supported");
        assert_relative_eq!(status.separation_delta, Vec3::new(0.0, 0.7, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_box_box_uses_minimum_axis() {
        let (id_a, id_b) = ids();
        let a = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let b = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0)).with_position(Vec3::new(1.8, 0.5, 0.0));
        let status = collide(id_a, &a, id_b, &b).expect("supported");
        assert!(status.in_collision);
        assert_relative_eq!(status.separation_delta, Vec3::new(-0.2, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_rotated_boxes_separated_on_cross_axis() {
        let (id_a, id_b) = ids();
        let a = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let b = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0)).with_transform(RigidTransform::from_rotation_translation(
            Quat::from_axis_angle(&Vec3::z_axis(), constants::PI / 4.0),
            Vec3::new(2.3, 0.0, 0.0),
        ));
        let status = collide(id_a, &a, id_b, &b).expect("supported");
        assert!(status.in_collision);

        let far = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0)).with_transform(RigidTransform::from_rotation_translation(
            Quat::from_axis_angle(&Vec3::z_axis(), constants::PI / 4.0),
            Vec3::new(2.8, 0.0, 0.0),
        ));
        assert!(!collide(id_a, &a, id_b, &far).expect("supported").in_collision);
    }

    #[test]
    fn test_capsule_standing_on_floor() {
        let (id_a, id_b) = ids();
        let capsule = Shape::capsule(Vec3::new(0.0, 0.3, 0.0), Vec3::new(0.0, 2.0, 0.0), 0.5);
        let status = collide(id_a, &capsule, id_b, &floor()).expect("supported");
        assert!(status.in_collision);
        assert_relative_eq!(status.separation_delta, Vec3::new(0.0, 0.2, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_capsule_piercing_floor_pushes_up() {
        let (id_a, id_b) = ids();
        let capsule = Shape::capsule(Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, 2.0, 0.0), 0.5);
        let status = collide(id_a, &capsule, id_b, &floor()).expect("supported");
        assert_relative_eq!(status.separation_delta, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_crossing_capsules() {
        let (id_a, id_b) = ids();
        let a = Shape::capsule(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.5);
        let b = Shape::capsule(Vec3::new(0.0, 0.6, -1.0), Vec3::new(0.0, 0.6, 1.0), 0.5);
        let status = collide(id_a, &a, id_b, &b).expect("supported");
        assert_relative_eq!(status.separation_delta, Vec3::new(0.0, -0.4, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_box_capsule_near_face() {
        let (id_a, id_b) = ids();
        let block = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let capsule = Shape::capsule(Vec3::new(-0.5, 1.3, 0.0), Vec3::new(0.5, 1.3, 0.0), 0.5);
        let status = collide(id_a, &block, id_b, &capsule).expect("supported");
        assert!(status.in_collision);
        assert_relative_eq!(status.separation_delta, Vec3::new(0.0, -0.2, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn test_box_capsule_spine_inside() {
        let (id_a, id_b) = ids();
        let block = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let capsule = Shape::capsule(Vec3::new(-0.5, 0.8, 0.0), Vec3::new(0.5, 0.8, 0.0), 0.5);
        let status = collide(id_a, &block, id_b, &capsule).expect("supported");
        assert!(status.in_collision);
        assert_relative_eq!(status.separation_delta, Vec3::new(0.0, -0.7, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn test_unsupported_pairs_report_error() {
        let (id_a, id_b) = ids();
        let result = collide(id_a, &floor(), id_b, &floor().with_position(Vec3::new(0.0, 0.1, 0.0)));
        assert_eq!(
            result,
            Err(NarrowPhaseError::Unsupported(ShapeType::Polygon, ShapeType::Polygon))
        );

        let block = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(
            collide(id_a, &floor(), id_b, &block),
            Err(NarrowPhaseError::Unsupported(ShapeType::Box, ShapeType::Polygon))
        );
    }

    #[test]
    fn test_narrow_phase_symmetry_for_every_supported_pair() {
        let sphere = || Shape::sphere(1.0).with_position(Vec3::new(0.3, 0.9, 0.2));
        let block = || Shape::cuboid(Vec3::new(1.0, 0.5, 1.0)).with_transform(RigidTransform::from_rotation_translation(
            Quat::from_axis_angle(&Vec3::y_axis(), 0.3),
            Vec3::new(0.1, 0.2, 0.0),
        ));
        let capsule = || Shape::capsule(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.4)
            .with_position(Vec3::new(0.0, 0.3, 0.4));
        let floor_at = || floor().with_position(Vec3::new(0.0, 0.1, 0.0));

        assert_symmetric(&sphere(), &sphere().with_position(Vec3::new(1.0, 0.5, 0.0)));
        assert_symmetric(&sphere(), &block());
        assert_symmetric(&sphere(), &capsule());
        assert_symmetric(&sphere(), &floor_at());
        assert_symmetric(&block(), &block().with_position(Vec3::new(0.5, 0.6, 0.2)));
        assert_symmetric(&block(), &capsule());
        assert_symmetric(&capsule(), &capsule().with_position(Vec3::new(0.2, 0.5, 0.0)));
        assert_symmetric(&capsule(), &floor_at());
    }

    #[test]
    fn test_status_orientation_helpers() {
        let (id_a, id_b) = ids();
        let status = ShapePairCollisionStatus {
            shape_a: id_a,
            shape_b: id_b,
            in_collision: true,
            collision_center: Vec3::zeros(),
            separation_delta: Vec3::new(1.0, 0.0, 0.0),
        };
        let oriented = status.oriented_for(id_b);
        assert_eq!(oriented.shape_a, id_b);
        assert_relative_eq!(oriented.separation_delta, Vec3::new(-1.0, 0.0, 0.0));
        assert!(status.involves(id_a));
        assert_eq!(status.separation_delta_for(ShapeId::none()), None);
    }
}
