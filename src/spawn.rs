// ---------------------------------------------
// SPAWN LANES FOR RIGS
// ---------------------------------------------
// Rigs park side by side along X, all facing -Z. Lanes fill outward from the
// centre, alternating sides (0, +1, -1, +2, -2, ...), and a lane freed by a
// removed rig is handed out again before new ones.

use std::collections::BTreeMap;

use crate::rig::RigId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnSlot {
    pub lane: usize,
    pub x: f32,
    pub z: f32,
    pub yaw: f32, // rad about +Y
}

#[derive(Debug, Clone)]
pub struct SpawnManager {
    lane_spacing: f32, // m
    occupied: BTreeMap<usize, RigId>,
}

impl SpawnManager {
    pub fn new(lane_spacing: f32) -> Self {
        Self {
            lane_spacing,
            occupied: BTreeMap::new(),
        }
    }

    // ---------------------------------------------------------
    // Lane index -> signed lateral offset
    // ---------------------------------------------------------
    fn lane_offset(lane: usize) -> f32 {
        let step = lane.div_ceil(2) as f32;
        if lane % 2 == 1 { step } else { -step }
    }

    pub fn allocate(&mut self, rig: RigId) -> SpawnSlot {
        let lane = (0..).find(|l| !self.occupied.contains_key(l)).unwrap_or(self.occupied.len());
        self.occupied.insert(lane, rig);

        SpawnSlot {
            lane,
            x: Self::lane_offset(lane) * self.lane_spacing,
            z: 0.0,
            yaw: 0.0,
        }
    }

    pub fn release(&mut self, rig: RigId) -> bool {
        let before = self.occupied.len();
        self.occupied.retain(|_, r| *r != rig);
        self.occupied.len() != before
    }

    pub fn occupied(&self) -> usize {
        self.occupied.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lanes_alternate_sides() {
        let mut spawner = SpawnManager::new(8.0);
        let xs: Vec<f32> = (0..5).map(|i| spawner.allocate(RigId(i)).x).collect();
        assert_eq!(xs, vec![0.0, 8.0, -8.0, 16.0, -16.0]);
    }

    #[test]
    fn test_released_lane_is_reused() {
        let mut spawner = SpawnManager::new(8.0);
        spawner.allocate(RigId(0));
        spawner.allocate(RigId(1));
        spawner.allocate(RigId(2));
        assert!(spawner.release(RigId(1)));
        assert!(!spawner.release(RigId(1)));
        assert_eq!(spawner.allocate(RigId(3)).lane, 1);
        assert_eq!(spawner.occupied(), 3);
    }
}
