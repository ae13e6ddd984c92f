// ==============================================================================
// site.rs — THE SIMULATED WORK SITE
// ------------------------------------------------------------------------------
// Owns the physics world, every rig, the debris pool and the render scene, and
// advances them one fixed tick at a time:
//
//   1. resolve held keys into actions for the focused rig (others get none)
//   2. rig.apply_controls   (joint motors, track forces)
//   3. world.step           (one dt; runaway bodies reset)
//   4. rig.after_step       (angle limiter, chassis stabilization)
//   5. rig.update_effector  (pickup / release / carry)
//   6. sync                 (rig segments + free debris -> render scene)
//
// Network and timing live in main.rs; nothing here is async.
// ==============================================================================

use std::collections::{BTreeMap, HashMap};

use nalgebra::{Isometry3, Vector3};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::debris::DebrisPool;
use crate::debug_builders::DebugOverlay;
use crate::error::{RigError, SiteError};
use crate::input::{ActionSet, InputFocus, KeyBindings, KeyState};
use crate::physics::PhysicsWorld;
use crate::rig::def::RigDef;
use crate::rig::sync::{RenderScene, SegmentTransform, Transform};
use crate::rig::{Rig, RigId};
use crate::spawn::SpawnManager;
use crate::terrain::{FlatTerrain, TerrainHeight};
use crate::vehicle::VehicleKind;

/// Lateral distance between parked rigs.
const LANE_SPACING: f32 = 8.0;
/// Drop height above the terrain when spawning.
const SPAWN_CLEARANCE: f32 = 0.01;

pub struct Site {
    world: PhysicsWorld,
    terrain: Box<dyn TerrainHeight + Send>,
    rigs: BTreeMap<RigId, Rig>,
    next_id: u32,
    debris: DebrisPool,
    debris_mass: f32,
    keys: KeyState,
    focus: InputFocus,
    focus_cycle_key: String,
    bindings: HashMap<VehicleKind, KeyBindings>,
    spawner: SpawnManager,
    scene: RenderScene,
    overlay: DebugOverlay,
    joint_overlay: bool,
    tick: u64,
}

#[derive(Debug, Serialize)]
pub struct RigSnapshot<'a> {
    pub id: RigId,
    pub kind: VehicleKind,
    pub segments: &'a [SegmentTransform],
    pub carried: usize,
    pub forward_velocity: f32,
}

/// One outgoing frame. Serialized with `"type": "snapshot"`.
#[derive(Debug, Serialize)]
pub struct SiteSnapshot<'a> {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub tick: u64,
    pub focus: Option<RigId>,
    pub rigs: Vec<RigSnapshot<'a>>,
    pub instances: &'a [Transform],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<&'a DebugOverlay>,
}

impl Site {
    /// Site on flat ground at height 0.
    pub fn new(config: &SiteConfig) -> Result<Self, SiteError> {
        Self::with_terrain(config, Box::new(FlatTerrain::default()))
    }

    pub fn with_terrain(config: &SiteConfig, terrain: Box<dyn TerrainHeight + Send>) -> Result<Self, SiteError> {
        let world = PhysicsWorld::new(&config.physics, config.server.dt());

        let bindings = VehicleKind::ALL
            .iter()
            .map(|&kind| (kind, config.bindings_for(kind)))
            .collect();

        let mut site = Self {
            world,
            terrain,
            rigs: BTreeMap::new(),
            next_id: 0,
            debris: DebrisPool::new(),
            debris_mass: config.debris.mass,
            keys: KeyState::default(),
            focus: InputFocus::default(),
            focus_cycle_key: config.input.focus_cycle_key.clone(),
            bindings,
            spawner: SpawnManager::new(LANE_SPACING),
            scene: RenderScene::default(),
            overlay: DebugOverlay::default(),
            joint_overlay: config.debug.joint_overlay,
            tick: 0,
        };

        let scattered = site.debris.scatter(&mut site.world, &config.debris, site.terrain.as_ref());
        for &kind in &config.rigs {
            site.spawn_rig(kind)?;
        }
        site.sync_scene();

        info!(
            rigs = site.rigs.len(),
            debris = scattered,
            focus = ?site.focus.active(),
            "🏗️ Site ready"
        );
        Ok(site)
    }

    // ---------------------------------------------------------
    // Rigs
    // ---------------------------------------------------------

    /// Spawns `kind` in the next free lane.
    pub fn spawn_rig(&mut self, kind: VehicleKind) -> Result<RigId, SiteError> {
        let id = RigId(self.next_id);
        let slot = self.spawner.allocate(id);
        match self.insert_rig(id, kind, kind.def(), slot.x, slot.z, slot.yaw) {
            Ok(id) => Ok(id),
            Err(e) => {
                self.spawner.release(id);
                Err(e)
            }
        }
    }

    /// Spawns `kind` at an explicit ground position, heading rotated `yaw` rad about +Y.
    pub fn spawn_rig_at(&mut self, kind: VehicleKind, x: f32, z: f32, yaw: f32) -> Result<RigId, SiteError> {
        self.spawn_rig_from(kind, kind.def(), x, z, yaw)
    }

    /// Like [`Site::spawn_rig_at`] with a custom definition (e.g. a modified capacity).
    pub fn spawn_rig_from(
        &mut self,
        kind: VehicleKind,
        def: &RigDef,
        x: f32,
        z: f32,
        yaw: f32,
    ) -> Result<RigId, SiteError> {
        let id = RigId(self.next_id);
        self.insert_rig(id, kind, def, x, z, yaw)
    }

    fn insert_rig(
        &mut self,
        id: RigId,
        kind: VehicleKind,
        def: &RigDef,
        x: f32,
        z: f32,
        yaw: f32,
    ) -> Result<RigId, SiteError> {
        let root = def.root().ok_or(RigError::EmptyDefinition)?;
        let y = self.terrain.height_at(x, z) + root.shape.half_height() + SPAWN_CLEARANCE;
        let pose = Isometry3::new(Vector3::new(x, y, z), Vector3::y() * yaw);

        let rig = Rig::spawn(id, kind, def, &mut self.world, pose)?;
        rig.sync(&self.world, &mut self.scene);
        self.rigs.insert(id, rig);
        self.next_id += 1;

        if self.focus.active().is_none() {
            self.focus.set(Some(id));
        }

        info!(rig = %id, kind = kind.name(), x, z, "🚜 Rig spawned");
        Ok(id)
    }

    /// Removes a rig, dropping anything it carries. Clears focus if it pointed here.
    pub fn remove_rig(&mut self, id: RigId) -> Result<(), SiteError> {
        let rig = self.rigs.remove(&id).ok_or(SiteError::UnknownRig(id))?;
        rig.despawn(&mut self.world, &mut self.debris, &mut self.scene);
        self.spawner.release(id);
        if self.focus.is_active(id) {
            self.focus.set(None);
        }
        info!(rig = %id, "Rig removed from site");
        Ok(())
    }

    /// Drops a free debris block at `position`. Returns its pool index.
    pub fn spawn_block(&mut self, position: Vector3<f32>, half_extent: f32) -> usize {
        let index = self.debris.spawn_block(&mut self.world, position, half_extent, self.debris_mass);
        if let Some(body) = self.debris.get(index).and_then(|b| self.world.bodies.get(b.body)) {
            self.scene.set_instance(index, Transform::from_pose(body.position()));
        }
        index
    }

    // ---------------------------------------------------------
    // Input
    // ---------------------------------------------------------

    /// Records a key transition. The focus cycle key switches rigs on press.
    pub fn handle_key(&mut self, code: &str, down: bool) {
        let changed = self.keys.set(code, down);
        if changed && down && code == self.focus_cycle_key {
            self.cycle_focus();
        }
    }

    pub fn set_focus(&mut self, rig: Option<RigId>) -> Result<(), SiteError> {
        if let Some(id) = rig {
            if !self.rigs.contains_key(&id) {
                return Err(SiteError::UnknownRig(id));
            }
        }
        self.focus.set(rig);
        info!(focus = ?rig, "🎯 Input focus set");
        Ok(())
    }

    pub fn cycle_focus(&mut self) -> Option<RigId> {
        let order: Vec<RigId> = self.rigs.keys().copied().collect();
        let next = self.focus.cycle(&order);
        info!(focus = ?next, "🎯 Input focus cycled");
        next
    }

    pub fn focus(&self) -> Option<RigId> {
        self.focus.active()
    }

    fn actions_for(&self, rig: &Rig) -> ActionSet {
        if !self.focus.is_active(rig.id()) {
            return ActionSet::default();
        }
        self.bindings
            .get(&rig.kind())
            .map(|b| b.resolve(&self.keys))
            .unwrap_or_default()
    }

    // ---------------------------------------------------------
    // Tick
    // ---------------------------------------------------------

    pub fn tick(&mut self) {
        let actions: Vec<ActionSet> = self.rigs.values().map(|rig| self.actions_for(rig)).collect();

        for (rig, actions) in self.rigs.values_mut().zip(&actions) {
            rig.apply_controls(actions, &mut self.world);
        }

        let reset = self.world.step();
        if reset > 0 {
            warn!(tick = self.tick, reset, "Runaway bodies reset this tick");
        }

        for rig in self.rigs.values_mut() {
            rig.after_step(&mut self.world);
        }

        for (rig, actions) in self.rigs.values_mut().zip(&actions) {
            rig.update_effector(actions, &mut self.world, &mut self.debris, &mut self.scene);
        }

        self.sync_scene();

        if self.joint_overlay {
            self.overlay.clear();
            for rig in self.rigs.values() {
                rig.debug(&self.world, &mut self.overlay);
            }
        }

        self.tick += 1;
        debug!(tick = self.tick, "tick");
    }

    fn sync_scene(&mut self) {
        for rig in self.rigs.values() {
            rig.sync(&self.world, &mut self.scene);
        }
        // Carried blocks were already written by their effector.
        for block in self.debris.blocks().iter().filter(|b| b.carrier.is_none()) {
            if let Some(body) = self.world.bodies.get(block.body) {
                self.scene.set_instance(block.instance, Transform::from_pose(body.position()));
            }
        }
    }

    pub fn snapshot(&self) -> SiteSnapshot<'_> {
        let rigs = self
            .rigs
            .values()
            .filter_map(|rig| {
                Some(RigSnapshot {
                    id: rig.id(),
                    kind: rig.kind(),
                    segments: self.scene.rig(rig.id())?,
                    carried: rig.effector().map_or(0, |e| e.carried().len()),
                    forward_velocity: rig.locomotion().forward_velocity(),
                })
            })
            .collect();

        SiteSnapshot {
            msg_type: "snapshot",
            tick: self.tick,
            focus: self.focus.active(),
            rigs,
            instances: self.scene.instances(),
            debug: self.joint_overlay.then_some(&self.overlay),
        }
    }

    // ---------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------

    pub fn rig(&self, id: RigId) -> Option<&Rig> {
        self.rigs.get(&id)
    }

    pub fn rigs(&self) -> impl Iterator<Item = &Rig> {
        self.rigs.values()
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn debris(&self) -> &DebrisPool {
        &self.debris
    }

    pub fn scene(&self) -> &RenderScene {
        &self.scene
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn joint_angle(&self, id: RigId, joint: &str) -> Option<f32> {
        self.rigs.get(&id)?.joint_angle(joint, &self.world.bodies)
    }

    pub fn effector_tip(&self, id: RigId) -> Option<Vector3<f32>> {
        self.rigs.get(&id)?.effector_tip(&self.world.bodies)
    }
}
