//! One-way pose export: simulated poses are copied into a render scene after all
//! physics and control work for the tick. Nothing ever reads poses back from it.

use std::collections::BTreeMap;

use nalgebra::Isometry3;
use rapier3d::prelude::RigidBodySet;
use serde::Serialize;

use crate::rig::RigId;
use crate::rig::def::SegmentRole;
use crate::rig::segment::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion [x, y, z, w]
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };

    pub fn from_pose(pose: &Isometry3<f32>) -> Self {
        let t = pose.translation.vector;
        let q = pose.rotation.coords; // [i, j, k, w]
        Self {
            position: [t.x, t.y, t.z],
            rotation: [q.x, q.y, q.z, q.w],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentTransform {
    pub role: SegmentRole,
    #[serde(flatten)]
    pub transform: Transform,
}

/// Render-side transforms: one list per rig plus the shared debris instance buffer.
#[derive(Debug, Clone, Default)]
pub struct RenderScene {
    rigs: BTreeMap<RigId, Vec<SegmentTransform>>,
    instances: Vec<Transform>,
}

impl RenderScene {
    pub fn rig(&self, id: RigId) -> Option<&[SegmentTransform]> {
        self.rigs.get(&id).map(Vec::as_slice)
    }

    pub fn rigs(&self) -> impl Iterator<Item = (RigId, &[SegmentTransform])> {
        self.rigs.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    pub fn remove_rig(&mut self, id: RigId) {
        self.rigs.remove(&id);
    }

    pub fn instances(&self) -> &[Transform] {
        &self.instances
    }

    pub fn set_instance(&mut self, slot: usize, transform: Transform) {
        if slot >= self.instances.len() {
            self.instances.resize(slot + 1, Transform::IDENTITY);
        }
        self.instances[slot] = transform;
    }
}

pub fn sync_segments(id: RigId, segments: &[Segment], bodies: &RigidBodySet, scene: &mut RenderScene) {
    let out = scene.rigs.entry(id).or_default();
    out.clear();
    for seg in segments {
        if let Some(body) = bodies.get(seg.body) {
            out.push(SegmentTransform {
                role: seg.role,
                transform: Transform::from_pose(body.position()),
            });
        }
    }
}
