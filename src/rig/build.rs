// ==============================================================================
// build.rs — RIG CONSTRUCTION
// ==============================================================================
// Root first, then every joint's child in list order:
//
//   R0      = rotation taking the child's (axis, reference) frame onto the parent's
//   q_child = q_parent · R(axis_parent, rest_angle) · R0
//   p_child = p_parent + q_parent·pivot_parent − q_child·pivot_child
//
// so both pivots coincide in world space and the hinge reads `rest_angle` at
// spawn. Each hinge is a rapier revolute joint (free AngX) with a velocity
// motor enabled at speed 0 and a finite max torque.
// ==============================================================================

use std::collections::{HashMap, HashSet};

use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3};
use rapier3d::prelude::{
    Collider, ColliderBuilder, GenericJointBuilder, JointAxesMask, JointAxis, RigidBodyBuilder,
};
use tracing::debug;

use crate::error::RigError;
use crate::physics::{PhysicsWorld, rig_groups};
use crate::rig::def::{JointDef, RigDef, SegmentDef, SegmentRole, Shape};
use crate::rig::segment::{Joint, Segment};

/// Topology and shape check. Pivot placement is not checked.
pub fn validate(def: &RigDef) -> Result<(), RigError> {
    let root = def.root().ok_or(RigError::EmptyDefinition)?;

    let mut known = HashSet::new();
    for seg in def.segments {
        if !known.insert(seg.role) {
            return Err(RigError::DuplicateSegment(seg.role));
        }
        if let Shape::ConvexHull { points } = seg.shape {
            if !spans_volume(points) {
                return Err(RigError::DegenerateHull(seg.role));
            }
        }
    }

    let mut built = HashSet::from([root.role]);
    for joint in def.joints {
        for role in [joint.parent, joint.child] {
            if !known.contains(&role) {
                return Err(RigError::UnknownSegment { joint: joint.name, role });
            }
        }
        if !built.contains(&joint.parent) {
            return Err(RigError::ChildBeforeParent {
                joint: joint.name,
                parent: joint.parent,
                child: joint.child,
            });
        }
        if !built.insert(joint.child) {
            return Err(RigError::DuplicateSegment(joint.child));
        }
        frame_alignment(joint)?;
    }

    match def.segments.iter().find(|s| !built.contains(&s.role)) {
        Some(orphan) => Err(RigError::Unattached(orphan.role)),
        None => Ok(()),
    }
}

/// True when the point cloud is not coplanar, i.e. a convex hull of it has volume.
fn spans_volume(points: &[[f32; 3]]) -> bool {
    const EPS: f32 = 1e-6;
    let pts: Vec<Vector3<f32>> = points.iter().map(|p| Vector3::from(*p)).collect();
    let Some(origin) = pts.first() else {
        return false;
    };
    let Some(u) = pts.iter().map(|p| p - origin).find(|d| d.norm() > EPS) else {
        return false;
    };
    let Some(normal) = pts
        .iter()
        .map(|p| u.cross(&(p - origin)))
        .find(|n| n.norm() > EPS)
    else {
        return false;
    };
    pts.iter().any(|p| normal.dot(&(p - origin)).abs() > EPS)
}

fn basis(axis: [f32; 3], reference: [f32; 3]) -> Option<Matrix3<f32>> {
    let a = Vector3::from(axis).try_normalize(1e-6)?;
    let r = Vector3::from(reference);
    let r = (r - a * r.dot(&a)).try_normalize(1e-6)?;
    Some(Matrix3::from_columns(&[a, r, a.cross(&r)]))
}

/// R0: child-local (axis, reference) -> parent-local (axis, reference).
fn frame_alignment(joint: &JointDef) -> Result<UnitQuaternion<f32>, RigError> {
    let degenerate = || RigError::DegenerateAxis(joint.name);
    let parent = basis(joint.axis_parent, joint.reference_parent).ok_or_else(degenerate)?;
    let child = basis(joint.axis_child, joint.reference_child).ok_or_else(degenerate)?;
    let m = parent * child.transpose();
    Ok(UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m)))
}

pub fn collider_for(seg: &SegmentDef) -> Result<ColliderBuilder, RigError> {
    let builder = match seg.shape {
        Shape::Cuboid { half_extents: [hx, hy, hz] } => ColliderBuilder::cuboid(hx, hy, hz),
        Shape::Cylinder { half_height, radius } => ColliderBuilder::cylinder(half_height, radius),
        Shape::ConvexHull { points } => {
            let pts: Vec<Point3<f32>> = points.iter().map(|p| Point3::from(*p)).collect();
            ColliderBuilder::convex_hull(&pts).ok_or(RigError::DegenerateHull(seg.role))?
        }
    };
    Ok(seg
        .material
        .apply(builder)
        .mass(seg.mass)
        .collision_groups(rig_groups()))
}

fn insert_segment(world: &mut PhysicsWorld, seg: &SegmentDef, collider: Collider, pose: Isometry3<f32>) -> Segment {
    let body = RigidBodyBuilder::dynamic()
        .position(pose)
        .linear_damping(seg.linear_damping)
        .angular_damping(seg.angular_damping)
        .ccd_enabled(true)
        .build();
    let (body, collider) = world.insert_body(body, collider);
    Segment { role: seg.role, body, collider }
}

/// Spawns every segment and joint of `def` with the root at `spawn`.
pub fn build_rig(
    def: &RigDef,
    world: &mut PhysicsWorld,
    spawn: Isometry3<f32>,
) -> Result<(Vec<Segment>, Vec<Joint>), RigError> {
    validate(def)?;
    let root = def.root().ok_or(RigError::EmptyDefinition)?;

    // Every shape is built before the first body goes in, so a failure leaves
    // the world untouched.
    let mut colliders = def
        .segments
        .iter()
        .map(|seg| Ok((seg.role, collider_for(seg)?.build())))
        .collect::<Result<HashMap<_, _>, RigError>>()?;
    let mut take_collider = |role: SegmentRole| colliders.remove(&role).ok_or(RigError::DuplicateSegment(role));

    let root_collider = take_collider(root.role)?;
    let mut segments = vec![insert_segment(world, root, root_collider, spawn)];
    let mut poses = vec![spawn];
    let mut joints = Vec::with_capacity(def.joints.len());

    for jd in def.joints {
        let parent_index = segments
            .iter()
            .position(|s| s.role == jd.parent)
            .ok_or(RigError::ChildBeforeParent { joint: jd.name, parent: jd.parent, child: jd.child })?;
        let child_def = def
            .segment(jd.child)
            .ok_or(RigError::UnknownSegment { joint: jd.name, role: jd.child })?;

        let parent_pose = poses[parent_index];
        let axis_parent = Unit::new_normalize(Vector3::from(jd.axis_parent));
        let axis_child = Unit::new_normalize(Vector3::from(jd.axis_child));
        let hinge = UnitQuaternion::from_axis_angle(&axis_parent, jd.rest_angle);

        let child_rot = parent_pose.rotation * hinge * frame_alignment(jd)?;
        let pivot_world = parent_pose * Point3::from(jd.pivot_parent);
        let child_pos = pivot_world.coords - child_rot * Vector3::from(jd.pivot_child);
        let child_pose = Isometry3::from_parts(Translation3::from(child_pos), child_rot);

        let child_collider = take_collider(jd.child)?;
        let child = insert_segment(world, child_def, child_collider, child_pose);

        let data = GenericJointBuilder::new(JointAxesMask::LOCKED_REVOLUTE_AXES)
            .local_anchor1(Point3::from(jd.pivot_parent))
            .local_anchor2(Point3::from(jd.pivot_child))
            .local_axis1(axis_parent)
            .local_axis2(axis_child)
            .motor_velocity(JointAxis::AngX, 0.0, jd.motor_factor)
            .motor_max_force(JointAxis::AngX, jd.max_torque)
            .contacts_enabled(false)
            .build();
        let parent_body = segments[parent_index].body;
        let handle = world.joints.insert(parent_body, child.body, data, true);

        debug!(joint = jd.name, parent = ?jd.parent, child = ?jd.child, "hinge built");

        joints.push(Joint::new(jd, handle, parent_body, child.body));
        segments.push(child);
        poses.push(child_pose);
    }

    Ok((segments, joints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::input::Action;
    use crate::physics::Material;
    use crate::rig::def::SegmentRole;
    use crate::rig_servo::{HoldMode, JointServo};
    use crate::vehicle::{EXCAVATOR, VehicleKind};

    const BOX: Shape = Shape::Cuboid { half_extents: [0.5, 0.5, 0.5] };

    const fn seg(role: SegmentRole) -> SegmentDef {
        SegmentDef {
            role,
            shape: BOX,
            mass: 10.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            material: Material::Steel,
        }
    }

    const fn hinge(name: &'static str, parent: SegmentRole, child: SegmentRole) -> JointDef {
        JointDef {
            name,
            parent,
            child,
            pivot_parent: [0.0, 0.5, 0.0],
            pivot_child: [0.0, -0.5, 0.0],
            axis_parent: [1.0, 0.0, 0.0],
            axis_child: [1.0, 0.0, 0.0],
            reference_parent: [0.0, 1.0, 0.0],
            reference_child: [0.0, 1.0, 0.0],
            rest_angle: 0.3,
            max_torque: 100.0,
            motor_factor: 100.0,
            limits: None,
            servo: JointServo { arm_speed: 1.0, hold: HoldMode::ZeroSpeed },
            positive: Action::BoomUp,
            negative: Action::BoomDown,
        }
    }

    fn def(segments: &'static [SegmentDef], joints: &'static [JointDef]) -> RigDef {
        RigDef { segments, joints, ..EXCAVATOR }
    }

    #[test]
    fn test_validate_rejects_bad_topology() {
        assert_eq!(validate(&def(&[], &[])), Err(RigError::EmptyDefinition));

        static DUP: [SegmentDef; 2] = [seg(SegmentRole::Chassis), seg(SegmentRole::Chassis)];
        assert_eq!(validate(&def(&DUP, &[])), Err(RigError::DuplicateSegment(SegmentRole::Chassis)));

        static TWO: [SegmentDef; 2] = [seg(SegmentRole::Chassis), seg(SegmentRole::Boom)];
        assert_eq!(validate(&def(&TWO, &[])), Err(RigError::Unattached(SegmentRole::Boom)));

        static UNKNOWN: [JointDef; 1] = [hinge("x", SegmentRole::Chassis, SegmentRole::Stick)];
        assert!(matches!(validate(&def(&TWO, &UNKNOWN)), Err(RigError::UnknownSegment { .. })));

        static THREE: [SegmentDef; 3] = [
            seg(SegmentRole::Chassis),
            seg(SegmentRole::Boom),
            seg(SegmentRole::Stick),
        ];
        static OUT_OF_ORDER: [JointDef; 2] = [
            hinge("stick", SegmentRole::Boom, SegmentRole::Stick),
            hinge("boom", SegmentRole::Chassis, SegmentRole::Boom),
        ];
        assert!(matches!(
            validate(&def(&THREE, &OUT_OF_ORDER)),
            Err(RigError::ChildBeforeParent { joint: "stick", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_degenerate_axis_and_hull() {
        static TWO: [SegmentDef; 2] = [seg(SegmentRole::Chassis), seg(SegmentRole::Boom)];
        static PARALLEL: [JointDef; 1] = [JointDef {
            reference_parent: [2.0, 0.0, 0.0],
            ..hinge("bad", SegmentRole::Chassis, SegmentRole::Boom)
        }];
        assert_eq!(validate(&def(&TWO, &PARALLEL)), Err(RigError::DegenerateAxis("bad")));

        static FLAT: [[f32; 3]; 3] = [[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        static HULL: [SegmentDef; 1] = [SegmentDef {
            shape: Shape::ConvexHull { points: &FLAT },
            ..seg(SegmentRole::Chassis)
        }];
        assert_eq!(validate(&def(&HULL, &[])), Err(RigError::DegenerateHull(SegmentRole::Chassis)));
    }

    #[test]
    fn test_coplanar_hull_fails_without_touching_world() {
        // Five points, all on the z = 0 plane.
        static PLANAR: [[f32; 3]; 5] = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.5, 0.5, 0.0],
        ];
        static SEGS: [SegmentDef; 2] = [
            seg(SegmentRole::Chassis),
            SegmentDef {
                shape: Shape::ConvexHull { points: &PLANAR },
                ..seg(SegmentRole::Boom)
            },
        ];
        static JOINTS: [JointDef; 1] = [hinge("boom", SegmentRole::Chassis, SegmentRole::Boom)];

        let mut world = PhysicsWorld::new(&PhysicsConfig::default(), 1.0 / 60.0);
        let bodies = world.bodies.len();
        let colliders = world.colliders.len();
        let result = build_rig(&def(&SEGS, &JOINTS), &mut world, Isometry3::identity());

        assert!(matches!(result, Err(RigError::DegenerateHull(SegmentRole::Boom))));
        assert_eq!(world.bodies.len(), bodies);
        assert_eq!(world.colliders.len(), colliders);
        assert_eq!(world.joints.len(), 0);
    }

    #[test]
    fn test_tetrahedron_hull_is_accepted() {
        assert!(spans_volume(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]));
        assert!(!spans_volume(&[[0.0; 3], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]]));
        assert!(!spans_volume(&[]));
    }

    #[test]
    fn test_pd_joints_start_holding_rest_angle() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default(), 1.0 / 60.0);
        let def = VehicleKind::Excavator.def();
        let (_, joints) = build_rig(def, &mut world, Isometry3::identity()).unwrap();
        for (joint, jd) in joints.iter().zip(def.joints) {
            match jd.servo.hold {
                HoldMode::Pd(_) => assert_eq!(joint.pd.target_angle, Some(jd.rest_angle), "{}", jd.name),
                HoldMode::ZeroSpeed => assert_eq!(joint.pd.target_angle, None, "{}", jd.name),
            }
        }
    }

    #[test]
    fn test_pivots_coincide_and_rest_angle_reads_back() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default(), 1.0 / 60.0);
        let spawn = Isometry3::new(Vector3::new(3.0, 2.0, -1.0), Vector3::y() * 0.7);
        let def = VehicleKind::Excavator.def();
        let (segments, joints) = build_rig(def, &mut world, spawn).unwrap();
        assert_eq!(segments.len(), def.segments.len());
        assert_eq!(joints.len(), def.joints.len());

        for (joint, jd) in joints.iter().zip(def.joints) {
            let p = &world.bodies[joint.parent];
            let c = &world.bodies[joint.child];
            let a = p.position() * Point3::from(jd.pivot_parent);
            let b = c.position() * Point3::from(jd.pivot_child);
            assert!((a - b).norm() < 1e-4, "{} pivots apart", jd.name);

            let angle = joint.relative_angle(&world.bodies).unwrap();
            assert!((angle - jd.rest_angle).abs() < 1e-4, "{}: {angle}", jd.name);
        }
    }

    #[test]
    fn test_differing_child_frame_reads_rest_angle() {
        static TWO: [SegmentDef; 2] = [seg(SegmentRole::Chassis), seg(SegmentRole::Boom)];
        // Child is modelled lying along its local -Z; its "up" is -Z and its hinge axis is -X.
        static FLIPPED: [JointDef; 1] = [JointDef {
            axis_child: [-1.0, 0.0, 0.0],
            reference_child: [0.0, 0.0, -1.0],
            ..hinge("flipped", SegmentRole::Chassis, SegmentRole::Boom)
        }];
        let mut world = PhysicsWorld::new(&PhysicsConfig::default(), 1.0 / 60.0);
        let (_, joints) = build_rig(&def(&TWO, &FLIPPED), &mut world, Isometry3::identity()).unwrap();

        let angle = joints[0].relative_angle(&world.bodies).unwrap();
        assert!((angle - 0.3).abs() < 1e-4, "angle={angle}");
        let c = &world.bodies[joints[0].child];
        let axis_world = c.rotation() * Vector3::new(-1.0, 0.0, 0.0);
        assert!((axis_world - Vector3::x()).norm() < 1e-4);
    }
}
