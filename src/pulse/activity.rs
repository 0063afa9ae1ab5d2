//! Mobile activity pulse: NPC decision-making over a snapshot of the live
//! NPC set.
//!
//! The AI sees the world only through the narrow [`MobileWorld`] capability
//! surface, so its effect on the locked entity graph goes through the same
//! placement protocol as everything else. Behavior order per NPC per tick:
//! a prototype special behavior runs first and, when it acts, suppresses
//! the generic behaviors for the tick; otherwise scavenge, wander, and
//! aggress are each evaluated independently (scavenge and movement can both
//! fire in one tick).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::pulse::violence::set_fighting;
use crate::world::character::Character;
use crate::world::placement;
use crate::world::registry::World;
use crate::world::room::Room;
use crate::world::types::{
    MobFlag, MobProto, ObjKind, ObjectInstance, Position, RoomFlag, SpecialKind,
};

/// Evil enough for a cityguard to attack on sight.
const CITYGUARD_ALIGNMENT_THRESHOLD: i32 = -300;

/// Litter cheap enough for a janitor to sweep up.
const JANITOR_VALUE_THRESHOLD: i64 = 10;

/// The capability surface the scheduler exposes to the AI subsystem.
/// AI policy stays outside the core; its world mutations come back through
/// these few entry points.
pub trait MobileWorld {
    fn mobiles(&self) -> Vec<Arc<Character>>;
    fn characters_in_room(&self, room: &Arc<Room>) -> Vec<Arc<Character>>;
    fn objects_in_room(&self, room: &Arc<Room>) -> Vec<ObjectInstance>;
    /// Move an object from the room floor into a character's inventory.
    /// Returns false when the object was already gone.
    fn take_object(&self, room: &Arc<Room>, instance: Uuid, ch: &Arc<Character>) -> bool;
    fn move_character(&self, ch: &Arc<Character>, dest: &Arc<Room>);
    /// A random passable exit destination that NPCs may wander into.
    fn random_exit_room(&self, room: &Arc<Room>) -> Option<Arc<Room>>;
}

impl MobileWorld for World {
    fn mobiles(&self) -> Vec<Arc<Character>> {
        World::mobiles(self)
    }

    fn characters_in_room(&self, room: &Arc<Room>) -> Vec<Arc<Character>> {
        room.characters()
    }

    fn objects_in_room(&self, room: &Arc<Room>) -> Vec<ObjectInstance> {
        room.objects()
    }

    fn take_object(&self, room: &Arc<Room>, instance: Uuid, ch: &Arc<Character>) -> bool {
        // Room lock first, character lock nested: the sanctioned order.
        let mut state = room.write();
        match state.take_object(instance) {
            Some(obj) => {
                ch.write().inventory.push(obj);
                true
            }
            None => false,
        }
    }

    fn move_character(&self, ch: &Arc<Character>, dest: &Arc<Room>) {
        placement::move_character(ch, dest);
    }

    fn random_exit_room(&self, room: &Arc<Room>) -> Option<Arc<Room>> {
        let mut rng = rand::thread_rng();
        let candidates: Vec<Arc<Room>> = room
            .exits()
            .keys()
            .filter(|dir| room.exit_open(**dir))
            .filter_map(|dir| {
                let exit = room.exits().get(dir)?;
                self.get_room(exit.to)
            })
            .filter(|dest| !dest.has_flag(RoomFlag::Death) && !dest.has_flag(RoomFlag::NoMob))
            .collect();
        candidates.choose(&mut rng).cloned()
    }
}

/// The AI subsystem's entry point, invoked once per mobile pulse.
#[derive(Default)]
pub struct MobileActivity;

impl MobileActivity {
    pub fn new() -> Self {
        Self
    }

    pub fn tick(&self, world: &dyn MobileWorld, now: DateTime<Utc>) {
        let mobiles = world.mobiles();
        self.tick_with_mobiles(world, &mobiles, now);
    }

    /// Run one decision tick over an externally supplied NPC snapshot.
    pub fn tick_with_mobiles(
        &self,
        world: &dyn MobileWorld,
        mobiles: &[Arc<Character>],
        _now: DateTime<Utc>,
    ) {
        let mut rng = rand::thread_rng();
        for mob in mobiles {
            let Some(proto) = mob.proto().cloned() else {
                continue;
            };
            let (fighting, position) = {
                let state = mob.read();
                (state.fighting.is_some(), state.position)
            };
            // Fighters are the violence pulse's business.
            if fighting || position < Position::Standing {
                continue;
            }
            let Some(room) = mob.room() else {
                continue;
            };

            if let Some(kind) = proto.special {
                if dispatch_special(kind, world, mob, &room) {
                    continue;
                }
            }

            if proto.flags.contains(&MobFlag::Scavenger) {
                scavenge(world, mob, &room);
            }
            if !proto.flags.contains(&MobFlag::Sentinel) {
                wander(world, mob, &proto, &room, &mut rng);
            }
            if proto.flags.contains(&MobFlag::Aggressive) {
                // Use the room the mob ended the tick in.
                if let Some(here) = mob.room() {
                    aggress(world, mob, &here, &mut rng);
                }
            }
        }
    }
}

/// Run a prototype special behavior. Returning true means it acted and the
/// generic behaviors are suppressed for this tick.
fn dispatch_special(
    kind: SpecialKind,
    world: &dyn MobileWorld,
    mob: &Arc<Character>,
    room: &Arc<Room>,
) -> bool {
    match kind {
        SpecialKind::Janitor => janitor(world, mob, room),
        SpecialKind::Cityguard => cityguard(world, mob, room),
    }
}

/// Sweep up trash and litter.
fn janitor(world: &dyn MobileWorld, mob: &Arc<Character>, room: &Arc<Room>) -> bool {
    let litter = world
        .objects_in_room(room)
        .into_iter()
        .find(|o| o.takeable && (o.kind == ObjKind::Trash || o.cost < JANITOR_VALUE_THRESHOLD));
    match litter {
        Some(obj) => {
            let taken = world.take_object(room, obj.id, mob);
            if taken {
                debug!("{} sweeps up {}", mob.key(), obj.short_desc);
            }
            taken
        }
        None => false,
    }
}

/// Attack evil-aligned characters on sight.
fn cityguard(world: &dyn MobileWorld, mob: &Arc<Character>, room: &Arc<Room>) -> bool {
    if room.has_flag(RoomFlag::Peaceful) {
        return false;
    }
    let criminal = world
        .characters_in_room(room)
        .into_iter()
        .filter(|c| c.key() != mob.key())
        .find(|c| {
            let state = c.read();
            state.alignment < CITYGUARD_ALIGNMENT_THRESHOLD && state.position > Position::Dead
        });
    match criminal {
        Some(victim) => {
            debug!("{} screams 'PROTECT THE INNOCENT!'", mob.key());
            set_fighting(mob, &victim);
            true
        }
        None => false,
    }
}

/// Pick up the most valuable thing on the floor.
fn scavenge(world: &dyn MobileWorld, mob: &Arc<Character>, room: &Arc<Room>) {
    let best = world
        .objects_in_room(room)
        .into_iter()
        .filter(|o| o.takeable && o.cost > 0)
        .max_by_key(|o| o.cost);
    if let Some(obj) = best {
        if world.take_object(room, obj.id, mob) {
            debug!("{} gets {}", mob.key(), obj.short_desc);
        }
    }
}

/// Wander through a random open exit, about one tick in three. StayZone
/// mobs never cross a zone boundary.
fn wander(
    world: &dyn MobileWorld,
    mob: &Arc<Character>,
    proto: &Arc<MobProto>,
    room: &Arc<Room>,
    rng: &mut impl Rng,
) {
    if rng.gen_range(0..3) != 0 {
        return;
    }
    let Some(dest) = world.random_exit_room(room) else {
        return;
    };
    if proto.flags.contains(&MobFlag::StayZone) && dest.zone() != room.zone() {
        return;
    }
    world.move_character(mob, &dest);
}

/// Attack a random player in the room.
fn aggress(world: &dyn MobileWorld, mob: &Arc<Character>, room: &Arc<Room>, rng: &mut impl Rng) {
    if room.has_flag(RoomFlag::Peaceful) {
        return;
    }
    let players: Vec<Arc<Character>> = world
        .characters_in_room(room)
        .into_iter()
        .filter(|c| !c.is_npc())
        .filter(|c| c.read().position > Position::Dead)
        .collect();
    if let Some(victim) = players.choose(rng) {
        debug!("{} attacks {}", mob.key(), victim.key());
        set_fighting(mob, victim);
    }
}
