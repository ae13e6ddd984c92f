//! Input state: key flags, per-vehicle action bindings and the input focus.
//!
//! Key events only flip flags in [`KeyState`]; the tick resolves them into an
//! [`ActionSet`] for the focused rig. Unfocused rigs receive an empty set and
//! keep simulating passively.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::rig::RigId;

/// Named operator actions. Key codes follow browser `KeyboardEvent.code`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    DriveForward,
    DriveBackward,
    TurnLeft,
    TurnRight,
    TurretLeft,
    TurretRight,
    BoomUp,
    BoomDown,
    StickOut,
    StickIn,
    BucketDump,
    BucketCurl,
    /// Pick up nearby objects with the end effector.
    Dig,
    /// Drop everything the end effector carries.
    Release,
    TipperRaise,
    TipperLower,
    PlowRaise,
    PlowLower,
    BladeLeft,
    BladeRight,
}

impl Action {
    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Set of actions active this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet(u32);

impl ActionSet {
    pub fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    pub fn remove(&mut self, action: Action) {
        self.0 &= !action.bit();
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// +1 / -1 / 0 from a pair of opposing actions; both held cancel.
    pub fn axis(&self, positive: Action, negative: Action) -> f32 {
        match (self.contains(positive), self.contains(negative)) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::default();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

/// Key code -> action table for one vehicle kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyBindings {
    keys: BTreeMap<String, Action>,
}

impl KeyBindings {
    pub fn from_pairs(pairs: &[(&str, Action)]) -> Self {
        let mut bindings = Self::default();
        for (key, action) in pairs {
            bindings.keys.insert((*key).to_string(), *action);
        }
        bindings
    }

    /// Bind `action` to `key` only: previous keys for the action are dropped and
    /// whatever `key` used to trigger is unbound.
    pub fn rebind(&mut self, action: Action, key: &str) {
        self.keys.retain(|_, a| *a != action);
        self.keys.insert(key.to_string(), action);
    }

    pub fn action_for(&self, key: &str) -> Option<Action> {
        self.keys.get(key).copied()
    }

    pub fn keys_for(&self, action: Action) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter(move |(_, a)| **a == action)
            .map(|(k, _)| k.as_str())
    }

    pub fn resolve(&self, keys: &KeyState) -> ActionSet {
        keys.pressed
            .iter()
            .filter_map(|code| self.action_for(code))
            .collect()
    }
}

/// Raw key flags, mutated only by key events.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    pressed: HashSet<String>,
}

impl KeyState {
    /// Returns true when the flag actually changed.
    pub fn set(&mut self, code: &str, down: bool) -> bool {
        if down {
            self.pressed.insert(code.to_string())
        } else {
            self.pressed.remove(code)
        }
    }

    pub fn is_down(&self, code: &str) -> bool {
        self.pressed.contains(code)
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
    }
}

/// Which rig currently consumes key state. Owned by the site loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFocus {
    active: Option<RigId>,
}

impl InputFocus {
    pub fn active(&self) -> Option<RigId> {
        self.active
    }

    pub fn is_active(&self, rig: RigId) -> bool {
        self.active == Some(rig)
    }

    pub fn set(&mut self, rig: Option<RigId>) {
        self.active = rig;
    }

    /// Moves focus to the next id in `order` (wrapping), or the first one when
    /// nothing or a stale id is focused.
    pub fn cycle(&mut self, order: &[RigId]) -> Option<RigId> {
        let next = match self.active.and_then(|a| order.iter().position(|id| *id == a)) {
            Some(i) => order.get((i + 1) % order.len()).copied(),
            None => order.first().copied(),
        };
        self.active = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_set_axis_cancels() {
        let set: ActionSet = [Action::BoomUp, Action::BoomDown, Action::TurnLeft].into_iter().collect();
        assert_eq!(set.axis(Action::BoomUp, Action::BoomDown), 0.0);
        assert_eq!(set.axis(Action::TurnLeft, Action::TurnRight), 1.0);
        assert_eq!(set.axis(Action::DriveForward, Action::DriveBackward), 0.0);
        let mut set = set;
        set.remove(Action::BoomUp);
        assert_eq!(set.axis(Action::BoomUp, Action::BoomDown), -1.0);
    }

    #[test]
    fn test_bindings_resolve_pressed_keys_only() {
        let bindings = KeyBindings::from_pairs(&[("KeyW", Action::DriveForward), ("KeyI", Action::BoomUp)]);
        let mut keys = KeyState::default();
        assert!(keys.set("KeyI", true));
        assert!(!keys.set("KeyI", true));
        keys.set("KeyZ", true);

        let actions = bindings.resolve(&keys);
        assert!(actions.contains(Action::BoomUp));
        assert!(!actions.contains(Action::DriveForward));

        keys.set("KeyI", false);
        assert!(bindings.resolve(&keys).is_empty());
    }

    #[test]
    fn test_rebind_replaces_previous_key() {
        let mut bindings = KeyBindings::from_pairs(&[("KeyI", Action::BoomUp), ("KeyK", Action::BoomDown)]);
        bindings.rebind(Action::BoomUp, "ArrowUp");
        assert_eq!(bindings.action_for("KeyI"), None);
        assert_eq!(bindings.action_for("ArrowUp"), Some(Action::BoomUp));

        // Stealing a key from another action.
        bindings.rebind(Action::BoomUp, "KeyK");
        assert_eq!(bindings.action_for("KeyK"), Some(Action::BoomUp));
        assert_eq!(bindings.keys_for(Action::BoomDown).count(), 0);
    }

    #[test]
    fn test_focus_cycle_wraps_and_recovers() {
        let order = [RigId(1), RigId(2), RigId(5)];
        let mut focus = InputFocus::default();
        assert_eq!(focus.cycle(&order), Some(RigId(1)));
        assert_eq!(focus.cycle(&order), Some(RigId(2)));
        assert_eq!(focus.cycle(&order), Some(RigId(5)));
        assert_eq!(focus.cycle(&order), Some(RigId(1)));

        focus.set(Some(RigId(9)));
        assert_eq!(focus.cycle(&order), Some(RigId(1)));
        assert_eq!(focus.cycle(&[]), None);
        assert!(!focus.is_active(RigId(1)));
    }
}
