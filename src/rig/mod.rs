//! rig - one articulated vehicle: segments, motorized hinges, locomotion and an
//! optional end effector, driven through per-tick phase methods in this order:
//!
//! 1. [`Rig::apply_controls`]  joint motors + track forces
//! 2. (world step)
//! 3. [`Rig::after_step`]      angle limiter + chassis stabilization
//! 4. [`Rig::update_effector`] pickup / release / carry
//! 5. [`Rig::sync`]            poses -> render scene

pub mod build;
pub mod controller;
pub mod def;
pub mod effector;
pub mod limiter;
pub mod locomotion;
pub mod segment;
pub mod sync;

use std::fmt;

use nalgebra::{Isometry3, Vector3};
use rapier3d::prelude::{RigidBodyHandle, RigidBodySet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::debris::DebrisPool;
use crate::debug_builders::{DebugOverlay, push_effector_debug, push_joint_debug};
use crate::error::RigError;
use crate::input::ActionSet;
use crate::physics::PhysicsWorld;
use crate::vehicle::VehicleKind;

use self::def::{RigDef, SegmentRole};
use self::effector::Effector;
use self::locomotion::Locomotion;
use self::segment::{Joint, Segment};
use self::sync::RenderScene;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RigId(pub u32);

impl fmt::Display for RigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rig#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Rig {
    id: RigId,
    kind: VehicleKind,
    segments: Vec<Segment>, // [0] is the chassis
    joints: Vec<Joint>,
    locomotion: Locomotion,
    effector: Option<Effector>,
}

impl Rig {
    pub fn spawn(
        id: RigId,
        kind: VehicleKind,
        def: &RigDef,
        world: &mut PhysicsWorld,
        pose: Isometry3<f32>,
    ) -> Result<Self, RigError> {
        let (segments, joints) = build::build_rig(def, world, pose)?;

        let effector = match def.effector {
            Some(config) => {
                let seg = segments
                    .iter()
                    .find(|s| s.role == config.segment)
                    .ok_or(RigError::UnknownSegment { joint: "effector", role: config.segment })?;
                Some(Effector::new(&config, seg.body))
            }
            None => None,
        };

        Ok(Self {
            id,
            kind,
            segments,
            joints,
            locomotion: Locomotion::new(def.locomotion, def.total_mass()),
            effector,
        })
    }

    pub fn id(&self) -> RigId {
        self.id
    }

    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    pub fn joint_angle(&self, name: &str, bodies: &RigidBodySet) -> Option<f32> {
        self.joint(name)?.relative_angle(bodies)
    }

    pub fn segment(&self, role: SegmentRole) -> Option<&Segment> {
        self.segments.iter().find(|s| s.role == role)
    }

    pub fn chassis(&self) -> RigidBodyHandle {
        self.segments[0].body
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    pub fn effector(&self) -> Option<&Effector> {
        self.effector.as_ref()
    }

    pub fn effector_tip(&self, bodies: &RigidBodySet) -> Option<Vector3<f32>> {
        self.effector.as_ref()?.tip_world(bodies)
    }

    pub fn apply_controls(&mut self, actions: &ActionSet, world: &mut PhysicsWorld) {
        let dt = world.dt();
        controller::drive_joints(&mut self.joints, actions, &mut world.bodies, &mut world.joints, dt);

        if let Some(chassis) = world.bodies.get_mut(self.chassis()) {
            self.locomotion.apply_drive(actions, chassis);
        }
    }

    pub fn after_step(&mut self, world: &mut PhysicsWorld) {
        limiter::enforce_limits(&mut self.joints, &mut world.bodies);

        if let Some(chassis) = world.bodies.get_mut(self.chassis()) {
            self.locomotion.stabilize(chassis);
        }
    }

    pub fn update_effector(
        &mut self,
        actions: &ActionSet,
        world: &mut PhysicsWorld,
        debris: &mut DebrisPool,
        scene: &mut RenderScene,
    ) {
        if let Some(effector) = self.effector.as_mut() {
            effector.update(self.id, actions, world, debris, scene);
        }
    }

    pub fn sync(&self, world: &PhysicsWorld, scene: &mut RenderScene) {
        sync::sync_segments(self.id, &self.segments, &world.bodies, scene);
    }

    pub fn debug(&self, world: &PhysicsWorld, overlay: &mut DebugOverlay) {
        for joint in &self.joints {
            push_joint_debug(overlay, self.id, joint, &world.bodies);
        }
        if let Some(effector) = &self.effector {
            push_effector_debug(overlay, self.id, effector, &world.bodies);
        }
    }

    /// Tears the rig down: carried blocks go back to the pool, then every body
    /// (with its colliders and joints) leaves the world.
    pub fn despawn(mut self, world: &mut PhysicsWorld, debris: &mut DebrisPool, scene: &mut RenderScene) {
        let released = match self.effector.as_mut() {
            Some(effector) => effector.release_all(world, debris),
            None => 0,
        };
        for seg in &self.segments {
            world.remove_body(seg.body);
        }
        scene.remove_rig(self.id);
        debug!(rig = %self.id, released, "🗑️ Rig removed");
    }
}
