//! End effector: proximity pickup, rigid carry and drop-in-place release of
//! debris blocks.
//!
//! Per tick, after the limiter: resolve the trigger, release or pick up (at most
//! one block), then re-place every carried block at
//! `effector_pos + effector_rot · local_offset` with the effector's orientation.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::{RigidBodyHandle, RigidBodySet};
use tracing::debug;

use crate::debris::DebrisPool;
use crate::input::{Action, ActionSet};
use crate::physics::PhysicsWorld;
use crate::rig::RigId;
use crate::rig::def::{EffectorConfig, EffectorTrigger};
use crate::rig::segment::body_pose;
use crate::rig::sync::{RenderScene, Transform};
use crate::rig_servo::gripper::{
    Carried, GripIntent, Gripper, SharedTrigger, carried_position, local_offset, nearest_within, resolve_split,
};

#[derive(Debug, Clone)]
enum Trigger {
    Split { pickup: Action, release: Action },
    Shared { action: Action, latch: SharedTrigger },
}

#[derive(Debug, Clone)]
pub struct Effector {
    body: RigidBodyHandle,
    tip: Vector3<f32>,
    pickup_radius: f32,
    trigger: Trigger,
    gripper: Gripper<usize>, // debris pool indices
}

impl Effector {
    pub fn new(config: &EffectorConfig, body: RigidBodyHandle) -> Self {
        let trigger = match config.trigger {
            EffectorTrigger::Split { pickup, release } => Trigger::Split { pickup, release },
            EffectorTrigger::Shared(action) => Trigger::Shared {
                action,
                latch: SharedTrigger::default(),
            },
        };
        Self {
            body,
            tip: Vector3::from(config.tip),
            pickup_radius: config.pickup_radius,
            trigger,
            gripper: Gripper::new(config.capacity),
        }
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn pickup_radius(&self) -> f32 {
        self.pickup_radius
    }

    pub fn capacity(&self) -> usize {
        self.gripper.capacity()
    }

    pub fn carried(&self) -> &[Carried<usize>] {
        self.gripper.carried()
    }

    pub fn tip_world(&self, bodies: &RigidBodySet) -> Option<Vector3<f32>> {
        let (pos, rot) = body_pose(bodies, self.body)?;
        Some(pos + rot * self.tip)
    }

    fn intent(&mut self, actions: &ActionSet) -> GripIntent {
        let carrying = !self.gripper.is_empty();
        match &mut self.trigger {
            Trigger::Split { pickup, release } => {
                resolve_split(actions.contains(*pickup), actions.contains(*release), carrying)
            }
            Trigger::Shared { action, latch } => latch.resolve(actions.contains(*action), carrying),
        }
    }

    pub fn update(
        &mut self,
        rig: RigId,
        actions: &ActionSet,
        world: &mut PhysicsWorld,
        debris: &mut DebrisPool,
        scene: &mut RenderScene,
    ) {
        let intent = self.intent(actions);
        let Some((pos, rot)) = body_pose(&world.bodies, self.body) else {
            return;
        };

        match intent {
            GripIntent::Release => {
                let released = self.release_all(world, debris);
                debug!(%rig, released, "📤 Released carried blocks");
            }
            GripIntent::Pickup => self.try_pickup(rig, &pos, &rot, world, debris),
            GripIntent::None => {}
        }

        self.carry(&pos, &rot, world, debris, scene);
    }

    fn try_pickup(
        &mut self,
        rig: RigId,
        pos: &Vector3<f32>,
        rot: &UnitQuaternion<f32>,
        world: &mut PhysicsWorld,
        debris: &mut DebrisPool,
    ) {
        // Full: decline silently.
        if self.gripper.is_full() {
            return;
        }
        let tip = pos + rot * self.tip;
        let Some(index) = nearest_within(&tip, debris.free_positions(&world.bodies), self.pickup_radius) else {
            return;
        };
        let Some(block_pos) = debris.position(index, &world.bodies) else {
            return;
        };

        let offset = local_offset(pos, rot, &block_pos);
        if self.gripper.try_attach(index, offset).is_ok() && debris.attach(index, rig, world) {
            debug!(%rig, block = index, carried = self.gripper.len(), "📥 Picked up block");
        }
    }

    fn carry(
        &self,
        pos: &Vector3<f32>,
        rot: &UnitQuaternion<f32>,
        world: &mut PhysicsWorld,
        debris: &DebrisPool,
        scene: &mut RenderScene,
    ) {
        for carried in self.gripper.carried() {
            let p = carried_position(pos, rot, &carried.local_offset);
            let pose = Isometry3::from_parts(Translation3::from(p), *rot);
            debris.place(carried.item, pose, world);
            if let Some(block) = debris.get(carried.item) {
                scene.set_instance(block.instance, Transform::from_pose(&pose));
            }
        }
    }

    /// Drops everything in place. Returns how many blocks were released.
    pub fn release_all(&mut self, world: &mut PhysicsWorld, debris: &mut DebrisPool) -> usize {
        self.gripper
            .release_all()
            .into_iter()
            .filter(|carried| debris.release(carried.item, world))
            .count()
    }
}
