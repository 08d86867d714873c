// dispatch.rs -- entity callback signatures and dispatch helpers
//
// Callbacks are plain fn pointers stored on the Edict. They are copied out
// before the call so the callee can take the entity list mutably.

use gsphys_common::shared::{EntityHandle, Trace};

use crate::g_local::{Edict, EntityList};

// ============================================================
// Type aliases for callback signatures
// ============================================================

/// Called when `next_think` comes due. `time` is the think time.
pub type ThinkFn = fn(self_ent: EntityHandle, ents: &mut EntityList, time: f32);

/// Called when `other` touches `self_ent`. The trace is the one that
/// produced the contact, if any.
pub type TouchFn = fn(self_ent: EntityHandle, other: EntityHandle, ents: &mut EntityList, trace: Option<&Trace>);

/// Called on a pusher when `other` stops its move.
pub type BlockedFn = fn(self_ent: EntityHandle, other: EntityHandle, ents: &mut EntityList);

/// Veto for collisions. `other` is the entity doing the moving, if any.
pub type ShouldCollideFn = fn(ent: &Edict, other: Option<&Edict>) -> bool;

// ============================================================
// Dispatch
// ============================================================

pub fn call_think(ent: EntityHandle, ents: &mut EntityList, time: f32) {
    let think = match ents.get(ent).and_then(|e| e.think) {
        Some(f) => f,
        None => return,
    };
    think(ent, ents, time);
}

pub fn call_touch(ent: EntityHandle, other: EntityHandle, ents: &mut EntityList, trace: Option<&Trace>) {
    let touch = match ents.get(ent).and_then(|e| e.touch) {
        Some(f) => f,
        None => return,
    };
    touch(ent, other, ents, trace);
}

pub fn call_blocked(ent: EntityHandle, other: EntityHandle, ents: &mut EntityList) {
    let blocked = match ents.get(ent).and_then(|e| e.blocked) {
        Some(f) => f,
        None => return,
    };
    blocked(ent, other, ents);
}

/// Entities without a veto always collide.
pub fn should_collide(ent: &Edict, other: Option<&Edict>) -> bool {
    match ent.should_collide {
        Some(f) => f(ent, other),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::g_local::EntityFlags;

    fn mark_touched(self_ent: EntityHandle, _other: EntityHandle, ents: &mut EntityList, _trace: Option<&Trace>) {
        if let Some(e) = ents.get_mut(self_ent) {
            e.health += 1.0;
        }
    }

    fn remove_self(self_ent: EntityHandle, ents: &mut EntityList, _time: f32) {
        if let Some(e) = ents.get_mut(self_ent) {
            e.flags |= EntityFlags::PENDING_DESTRUCTION;
        }
    }

    fn never(_ent: &Edict, _other: Option<&Edict>) -> bool {
        false
    }

    #[test]
    fn test_dispatch_calls_stored_callbacks() {
        let mut ents = EntityList::new(0);
        let world = ents.spawn(Edict::new("worldspawn")).unwrap();
        let mut e = Edict::new("trigger");
        e.touch = Some(mark_touched);
        e.think = Some(remove_self);
        let h = ents.spawn(e).unwrap();

        call_touch(h, world, &mut ents, None);
        assert_eq!(ents.get(h).unwrap().health, 1.0);

        call_think(h, &mut ents, 1.0);
        assert!(ents.get(h).unwrap().flags.contains(EntityFlags::PENDING_DESTRUCTION));

        // no callback is a no-op
        call_blocked(h, world, &mut ents);
        call_touch(world, h, &mut ents, None);
    }

    #[test]
    fn test_should_collide_default() {
        let mut e = Edict::new("box");
        assert!(should_collide(&e, None));
        e.should_collide = Some(never);
        assert!(!should_collide(&e, None));
    }
}
