// ==============================================================================
// physics.rs — RIGID BODY WORLD (rapier3d wrapper)
// ==============================================================================
// Responsibilities:
// - Own every rapier set + pipeline for the site.
// - Static ground slab whose top surface is y = 0.
// - Contact materials (friction + combine rule) and collision groups.
// - Fixed-step `step()`: one call advances exactly `dt`, then resets any body
//   that left the safety bound or went non-finite. A jointed body is reset
//   together with everything it is jointed to, offsets kept, so hinges are
//   not torn apart.
//
// Collision groups:
//   GROUND  <-> everything
//   RIG     <-> GROUND, DEBRIS        (rig segments never touch rig segments)
//   DEBRIS  <-> everything
//   CARRIED <-> GROUND, DEBRIS        (a carried block ignores the rig carrying it)
// ==============================================================================

use std::collections::{HashSet, VecDeque};

use rapier3d::prelude::*;
use rapier3d::prelude::{Group, InteractionGroups};
use tracing::{info, warn};

use crate::config::PhysicsConfig;

pub const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
pub const GROUP_RIG: Group = Group::from_bits_truncate(0b0010);
pub const GROUP_DEBRIS: Group = Group::from_bits_truncate(0b0100);
pub const GROUP_CARRIED: Group = Group::from_bits_truncate(0b1000);

const GROUND_HALF_SIZE: f32 = 500.0; // m
const GROUND_HALF_THICKNESS: f32 = 1.0; // m

pub fn ground_groups() -> InteractionGroups {
    InteractionGroups::new(GROUP_GROUND, GROUP_RIG | GROUP_DEBRIS | GROUP_CARRIED)
}

pub fn rig_groups() -> InteractionGroups {
    InteractionGroups::new(GROUP_RIG, GROUP_GROUND | GROUP_DEBRIS)
}

pub fn debris_groups() -> InteractionGroups {
    InteractionGroups::new(
        GROUP_DEBRIS,
        GROUP_GROUND | GROUP_RIG | GROUP_DEBRIS | GROUP_CARRIED,
    )
}

pub fn carried_groups() -> InteractionGroups {
    InteractionGroups::new(GROUP_CARRIED, GROUP_GROUND | GROUP_DEBRIS)
}

/// Contact materials. Restitution is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    Ground,
    /// Track pads: `Min` rule so the pad friction wins against any surface.
    Track,
    Steel,
    Debris,
}

impl Material {
    pub fn friction(self) -> f32 {
        match self {
            Material::Ground => 1.0,
            Material::Track => 0.6,
            Material::Steel => 0.4,
            Material::Debris => 0.8,
        }
    }

    pub fn combine_rule(self) -> CoefficientCombineRule {
        match self {
            Material::Track => CoefficientCombineRule::Min,
            _ => CoefficientCombineRule::Average,
        }
    }

    pub fn apply(self, builder: ColliderBuilder) -> ColliderBuilder {
        builder
            .friction(self.friction())
            .friction_combine_rule(self.combine_rule())
            .restitution(0.0)
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,                         // gravity vector
    pub integration_parameters: IntegrationParameters, // fixed dt lives here
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,
    pub ground: RigidBodyHandle,
    safety_bound: f32,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig, dt: f32) -> Self {
        let [gx, gy, gz] = config.gravity;

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Large static slab centred one half-thickness below zero, so its top
        // surface is exactly y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -GROUND_HALF_THICKNESS, 0.0])
            .build();
        let ground = bodies.insert(ground_rb);

        let ground_collider = Material::Ground
            .apply(ColliderBuilder::cuboid(
                GROUND_HALF_SIZE,
                GROUND_HALF_THICKNESS,
                GROUND_HALF_SIZE,
            ))
            .collision_groups(ground_groups())
            .build();
        colliders.insert_with_parent(ground_collider, ground, &mut bodies);

        info!(
            bodies = bodies.len(),
            colliders = colliders.len(),
            "🌎 Ground inserted"
        );

        Self {
            gravity: vector![gx, gy, gz],
            integration_parameters: IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            ground,
            safety_bound: config.safety_bound,
        }
    }

    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn insert_body(&mut self, body: RigidBody, collider: Collider) -> (RigidBodyHandle, ColliderHandle) {
        let handle = self.bodies.insert(body);
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        (handle, collider)
    }

    /// Removes the body together with its colliders and every joint touching it.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Advance exactly one fixed step. Returns how many runaway bodies were reset.
    pub fn step(&mut self) -> usize {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        self.reset_runaway_bodies()
    }

    // Safety: prevent bodies from exploding to insane coordinates
    fn reset_runaway_bodies(&mut self) -> usize {
        let bound = self.safety_bound;
        let runaway: Vec<RigidBodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| !body.is_fixed() && is_runaway(body.translation(), bound))
            .map(|(handle, _)| handle)
            .collect();

        let safe = vector![0.0, 1.0, 0.0];
        let mut visited = HashSet::new();
        let mut reset = 0;

        for handle in runaway {
            if !visited.insert(handle) {
                continue;
            }
            let group = self.jointed_group(handle, &mut visited);
            let Some(from) = self.bodies.get(handle).map(|b| *b.translation()) else {
                continue;
            };
            let finite = from.iter().all(|c| c.is_finite());

            for member in &group {
                let Some(body) = self.bodies.get_mut(*member) else {
                    continue;
                };
                let mut pose = *body.position();
                let offset = pose.translation.vector - from;
                pose.translation.vector = if finite && offset.iter().all(|c| c.is_finite()) {
                    safe + offset
                } else {
                    safe
                };
                if !pose.rotation.coords.iter().all(|c| c.is_finite()) {
                    pose.rotation = Rotation::identity();
                }
                body.set_position(pose, true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                reset += 1;
            }

            warn!(?handle, from = ?from, bodies = group.len(), "⚠️ Reset exploding body back to {:?}", safe);
        }
        reset
    }

    /// `start` plus every non-fixed body reachable from it through impulse joints.
    fn jointed_group(&self, start: RigidBodyHandle, visited: &mut HashSet<RigidBodyHandle>) -> Vec<RigidBodyHandle> {
        let mut group = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(handle) = queue.pop_front() {
            group.push(handle);
            for (a, b, _, _) in self.joints.attached_joints(handle) {
                let other = if a == handle { b } else { a };
                let movable = self.bodies.get(other).is_some_and(|body| !body.is_fixed());
                if movable && visited.insert(other) {
                    queue.push_back(other);
                }
            }
        }
        group
    }
}

fn is_runaway(pos: &Vector<Real>, bound: f32) -> bool {
    !pos.iter().all(|c| c.is_finite()) || pos.iter().any(|c| c.abs() > bound)
}
