// ==============================================================================
// debris.rs — POOL OF STACKABLE BLOCKS
// ==============================================================================
// Every block owns one fixed slot in the shared instance buffer (slot = pool
// index). A block is either:
//   free     dynamic body, DEBRIS group, pose written to its slot by sync
//   carried  kinematic body, CARRIED group, pose written by the effector carry
// Attach/release always zero both velocities.
// ==============================================================================

use nalgebra::{Isometry3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier3d::prelude::{
    ColliderBuilder, ColliderHandle, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, RigidBodyType,
};

use crate::config::DebrisConfig;
use crate::physics::{Material, PhysicsWorld, carried_groups, debris_groups};
use crate::rig::RigId;
use crate::terrain::TerrainHeight;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebrisBlock {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub instance: usize,
    pub half_extent: f32,
    pub carrier: Option<RigId>,
}

#[derive(Debug, Clone, Default)]
pub struct DebrisPool {
    blocks: Vec<DebrisBlock>,
}

impl DebrisPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DebrisBlock> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[DebrisBlock] {
        &self.blocks
    }

    pub fn free_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.carrier.is_none()).count()
    }

    pub fn attached_count(&self) -> usize {
        self.blocks.len() - self.free_count()
    }

    pub fn spawn_block(&mut self, world: &mut PhysicsWorld, position: Vector3<f32>, half_extent: f32, mass: f32) -> usize {
        let body = RigidBodyBuilder::dynamic()
            .translation(position)
            .linear_damping(0.1)
            .angular_damping(0.3)
            .build();
        let collider = Material::Debris
            .apply(ColliderBuilder::cuboid(half_extent, half_extent, half_extent))
            .mass(mass)
            .collision_groups(debris_groups())
            .build();
        let (body, collider) = world.insert_body(body, collider);

        let index = self.blocks.len();
        self.blocks.push(DebrisBlock {
            body,
            collider,
            instance: index,
            half_extent,
            carrier: None,
        });
        index
    }

    /// Seeded columns of blocks around `origin`, resting on the terrain.
    pub fn scatter(&mut self, world: &mut PhysicsWorld, config: &DebrisConfig, terrain: &dyn TerrainHeight) -> usize {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let size = config.half_extent * 2.0;
        let per_stack = config.stack_height.max(1);
        let stacks = config.count.div_ceil(per_stack);
        let columns = (stacks as f32).sqrt().ceil().max(1.0) as usize;

        let mut spawned = 0;
        for stack in 0..stacks {
            let [ox, _, oz] = config.origin;
            let jitter = config.spacing * 0.25;
            let x = ox + (stack % columns) as f32 * config.spacing + rng.gen_range(-jitter..=jitter);
            let z = oz + (stack / columns) as f32 * config.spacing + rng.gen_range(-jitter..=jitter);
            let ground = terrain.height_at(x, z);

            for level in 0..per_stack {
                if spawned == config.count {
                    break;
                }
                let y = ground + config.half_extent + level as f32 * (size + 0.005);
                self.spawn_block(world, Vector3::new(x, y, z), config.half_extent, config.mass);
                spawned += 1;
            }
        }
        spawned
    }

    pub fn position(&self, index: usize, bodies: &RigidBodySet) -> Option<Vector3<f32>> {
        let block = self.blocks.get(index)?;
        bodies.get(block.body).map(|b| *b.translation())
    }

    /// Positions of every free block, in pool order.
    pub fn free_positions<'a>(&'a self, bodies: &'a RigidBodySet) -> impl Iterator<Item = (usize, Vector3<f32>)> + 'a {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.carrier.is_none())
            .filter_map(|(i, b)| bodies.get(b.body).map(|body| (i, *body.translation())))
    }

    /// Free -> carried. Returns false for unknown or already carried blocks.
    pub fn attach(&mut self, index: usize, carrier: RigId, world: &mut PhysicsWorld) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        if block.carrier.is_some() {
            return false;
        }
        if let Some(body) = world.bodies.get_mut(block.body) {
            body.set_body_type(RigidBodyType::KinematicPositionBased, true);
            body.set_linvel(Vector3::zeros(), true);
            body.set_angvel(Vector3::zeros(), true);
        }
        if let Some(collider) = world.colliders.get_mut(block.collider) {
            collider.set_collision_groups(carried_groups());
        }
        block.carrier = Some(carrier);
        true
    }

    /// Carried -> free, dropped in place with zero velocity.
    pub fn release(&mut self, index: usize, world: &mut PhysicsWorld) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        if block.carrier.take().is_none() {
            return false;
        }
        if let Some(body) = world.bodies.get_mut(block.body) {
            body.set_body_type(RigidBodyType::Dynamic, true);
            body.set_linvel(Vector3::zeros(), true);
            body.set_angvel(Vector3::zeros(), true);
        }
        if let Some(collider) = world.colliders.get_mut(block.collider) {
            collider.set_collision_groups(debris_groups());
        }
        true
    }

    /// Teleport a carried block; it is never integrated while carried.
    pub fn place(&self, index: usize, pose: Isometry3<f32>, world: &mut PhysicsWorld) {
        let Some(block) = self.blocks.get(index) else {
            return;
        };
        if let Some(body) = world.bodies.get_mut(block.body) {
            body.set_position(pose, true);
            body.set_linvel(Vector3::zeros(), true);
            body.set_angvel(Vector3::zeros(), true);
        }
    }
}
