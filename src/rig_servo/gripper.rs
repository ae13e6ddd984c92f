// ==============================================================================
// gripper.rs — END-EFFECTOR ATTACH/DETACH BOOKKEEPING (NO PHYSICS)
// ==============================================================================
// FREE -> ATTACHED -> FREE, per object.
//
// - pickup:  nearest candidate within `radius` of the effector tip (ties go to
//            the lower pool index), at most one per tick, refused silently when
//            `capacity` objects are already carried.
// - carry:   world = effector_pos + effector_rot · local_offset
// - release: everything at once.
//
// Trigger resolution:
// - split keys:  release (while carrying) wins over pickup.
// - shared key:  edge-triggered. A press while carrying releases all; a press
//                with nothing attached arms pickup for as long as it is held.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};

#[derive(Debug, Clone, PartialEq)]
pub struct Carried<T> {
    pub item: T,
    pub local_offset: Vector3<f32>, // effector-local, captured at pickup
}

#[derive(Debug, Clone)]
pub struct Gripper<T> {
    capacity: usize,
    carried: Vec<Carried<T>>,
}

impl<T> Gripper<T> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, carried: Vec::new() }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.carried.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carried.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.carried.len() >= self.capacity
    }

    pub fn carried(&self) -> &[Carried<T>] {
        &self.carried
    }

    /// Hands the item back when the gripper is full.
    pub fn try_attach(&mut self, item: T, local_offset: Vector3<f32>) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.carried.push(Carried { item, local_offset });
        Ok(())
    }

    pub fn release_all(&mut self) -> Vec<Carried<T>> {
        std::mem::take(&mut self.carried)
    }
}

/// Index of the closest candidate within `radius` of `point`.
pub fn nearest_within<I>(point: &Vector3<f32>, candidates: I, radius: f32) -> Option<usize>
where
    I: IntoIterator<Item = (usize, Vector3<f32>)>,
{
    let r2 = radius * radius;
    let mut best: Option<(usize, f32)> = None;
    for (index, position) in candidates {
        let d2 = (position - point).norm_squared();
        if d2 > r2 {
            continue;
        }
        match best {
            Some((_, best_d2)) if d2 >= best_d2 => {}
            _ => best = Some((index, d2)),
        }
    }
    best.map(|(index, _)| index)
}

pub fn local_offset(
    effector_pos: &Vector3<f32>,
    effector_rot: &UnitQuaternion<f32>,
    world: &Vector3<f32>,
) -> Vector3<f32> {
    effector_rot.inverse() * (world - effector_pos)
}

pub fn carried_position(
    effector_pos: &Vector3<f32>,
    effector_rot: &UnitQuaternion<f32>,
    local_offset: &Vector3<f32>,
) -> Vector3<f32> {
    effector_pos + effector_rot * local_offset
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripIntent {
    None,
    Pickup,
    Release,
}

pub fn resolve_split(pickup: bool, release: bool, carrying: bool) -> GripIntent {
    if release && carrying {
        GripIntent::Release
    } else if pickup {
        GripIntent::Pickup
    } else {
        GripIntent::None
    }
}

/// Edge latch for a single key that means both "pick up" and "release all".
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedTrigger {
    was_pressed: bool,
    picking: bool,
}

impl SharedTrigger {
    pub fn resolve(&mut self, pressed: bool, carrying: bool) -> GripIntent {
        let edge = pressed && !self.was_pressed;
        self.was_pressed = pressed;

        if !pressed {
            self.picking = false;
            return GripIntent::None;
        }
        if edge {
            if carrying {
                self.picking = false;
                return GripIntent::Release;
            }
            self.picking = true;
        }
        if self.picking { GripIntent::Pickup } else { GripIntent::None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_bound_is_never_exceeded() {
        let mut gripper = Gripper::new(20);
        let mut refused = 0;
        for i in 0..35 {
            if gripper.try_attach(i, Vector3::zeros()).is_err() {
                refused += 1;
            }
            assert!(gripper.len() <= 20);
        }
        assert_eq!(gripper.len(), 20);
        assert_eq!(refused, 15);
        assert!(gripper.is_full());
    }

    #[test]
    fn test_release_all_empties() {
        let mut gripper = Gripper::new(3);
        gripper.try_attach("a", Vector3::x()).unwrap();
        gripper.try_attach("b", Vector3::y()).unwrap();
        let dropped = gripper.release_all();
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[1].item, "b");
        assert!(gripper.is_empty());
    }

    #[test]
    fn test_nearest_within_prefers_closest_then_lowest_index() {
        let tip = Vector3::new(1.0, 1.0, 1.0);
        let candidates = vec![
            (0, Vector3::new(1.3, 1.0, 1.0)),
            (1, Vector3::new(1.1, 1.0, 1.0)),
            (2, Vector3::new(0.9, 1.0, 1.0)),
            (3, Vector3::new(5.0, 1.0, 1.0)),
        ];
        assert_eq!(nearest_within(&tip, candidates, 0.4), Some(1));

        let far = vec![(0, Vector3::new(2.0, 1.0, 1.0))];
        assert_eq!(nearest_within(&tip, far, 0.4), None);
    }

    #[test]
    fn test_offset_round_trip_follows_effector() {
        let pos = Vector3::new(2.0, 1.5, -3.0);
        let rot = UnitQuaternion::from_euler_angles(0.2, -0.4, 1.0);
        let world = Vector3::new(2.1, 1.2, -3.3);
        let offset = local_offset(&pos, &rot, &world);
        assert!((carried_position(&pos, &rot, &offset) - world).norm() < 1e-5);

        let moved_pos = Vector3::new(0.0, 3.0, 0.0);
        let moved_rot = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5) * rot;
        let carried = carried_position(&moved_pos, &moved_rot, &offset);
        assert!(((carried - moved_pos).norm() - (world - pos).norm()).abs() < 1e-5);
    }

    #[test]
    fn test_split_trigger_release_wins_when_carrying() {
        assert_eq!(resolve_split(true, true, true), GripIntent::Release);
        assert_eq!(resolve_split(true, true, false), GripIntent::Pickup);
        assert_eq!(resolve_split(false, true, false), GripIntent::None);
        assert_eq!(resolve_split(false, false, true), GripIntent::None);
    }

    #[test]
    fn test_shared_trigger_press_release_cycle() {
        let mut trigger = SharedTrigger::default();
        // Press with empty gripper: pickup while held.
        assert_eq!(trigger.resolve(true, false), GripIntent::Pickup);
        assert_eq!(trigger.resolve(true, true), GripIntent::Pickup);
        assert_eq!(trigger.resolve(false, true), GripIntent::None);
        // Next press while carrying releases, and holding does not re-pick.
        assert_eq!(trigger.resolve(true, true), GripIntent::Release);
        assert_eq!(trigger.resolve(true, false), GripIntent::None);
        assert_eq!(trigger.resolve(false, false), GripIntent::None);
    }
}
