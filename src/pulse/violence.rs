//! The violence pulse: one combat round per fighting character, plus the
//! death path (fight-link cleanup, corpse, respawn scheduling, removal).
//!
//! Rounds follow the snapshot-then-process shape: the fighter set is copied
//! under a brief registry read lock, then each round touches only the two
//! characters' own locks, one at a time. Attacker numbers are copied out of
//! the attacker's lock before the victim's lock is taken, so no code path
//! ever holds two character locks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;

use crate::metrics;
use crate::world::character::Character;
use crate::world::registry::World;
use crate::world::types::{AffectFlag, Dice, ObjectInstance, Position, RoomFlag, WearSlot};
use crate::world::zone::schedule_mob_respawn;

/// Bare-handed damage when no weapon is wielded.
const BAREHAND_DICE: Dice = Dice {
    count: 1,
    size: 2,
    bonus: 0,
};

/// Point a character's fight link at a victim. Idempotent; an existing
/// fight is kept (a character swings at one opponent at a time).
pub fn set_fighting(attacker: &Arc<Character>, victim: &Arc<Character>) {
    let mut state = attacker.write();
    if state.fighting.is_none() {
        state.fighting = Some(victim.key().to_string());
    }
    if state.position == Position::Standing {
        state.position = Position::Fighting;
    }
}

/// Clear a character's fight link.
pub fn stop_fighting(ch: &Arc<Character>) {
    let mut state = ch.write();
    state.fighting = None;
    if state.position == Position::Fighting {
        state.position = Position::Standing;
    }
}

struct AttackerNumbers {
    victim_key: String,
    room_id: Option<crate::world::types::RoomId>,
    hitroll: i32,
    damroll: i32,
    dice: Dice,
}

/// One violence pulse: resolve a round for every character in a fight.
pub fn pulse_violence(world: &World, now: DateTime<Utc>) {
    let fighters: Vec<Arc<Character>> = world
        .characters()
        .into_iter()
        .filter(|c| c.read().fighting.is_some())
        .collect();

    for attacker in fighters {
        // A fighter may have died earlier in this same pulse.
        if world.get_character(attacker.key()).is_none() {
            continue;
        }
        one_round(world, &attacker, now);
    }
}

/// Resolve a single attack round for `attacker`.
pub fn one_round(world: &World, attacker: &Arc<Character>, now: DateTime<Utc>) {
    let numbers = {
        let state = attacker.read();
        if state.position < Position::Fighting {
            return;
        }
        let Some(victim_key) = state.fighting.clone() else {
            return;
        };
        let dice = state
            .equipment
            .get(&WearSlot::Wield)
            .and_then(|o| o.proto.as_ref())
            .and_then(|p| p.damage)
            .or_else(|| attacker.proto().map(|p| p.damage))
            .unwrap_or(BAREHAND_DICE);
        AttackerNumbers {
            victim_key,
            room_id: state.room.as_ref().map(|r| r.id),
            hitroll: state.stats.hitroll as i32,
            damroll: state.stats.damroll as i32,
            dice,
        }
    };

    let Some(victim) = world.get_character(&numbers.victim_key) else {
        // Opponent is gone; drop the stale link.
        stop_fighting(attacker);
        return;
    };

    // Fights only continue face to face.
    if victim.room_id() != numbers.room_id {
        debug!(
            "{} lost sight of {}; fight ends",
            attacker.key(),
            victim.key()
        );
        stop_fighting(attacker);
        return;
    }
    if let Some(room) = attacker.room() {
        if room.has_flag(RoomFlag::Peaceful) {
            stop_fighting(attacker);
            return;
        }
    }

    metrics::inc_violence_rounds();
    let mut rng = rand::thread_rng();
    let roll: i32 = rng.gen_range(1..=20);

    let dead = {
        let mut vstate = victim.write();
        let target = 10 + (vstate.stats.armor as i32) / 10;
        let hit = roll != 1 && (roll == 20 || roll + numbers.hitroll >= target);
        if !hit {
            debug!("{} misses {}", attacker.key(), victim.key());
            false
        } else {
            let mut damage = (numbers.dice.roll(&mut rng) + numbers.damroll).max(1);
            if vstate.has_affect_flag(AffectFlag::Sanctuary) {
                damage /= 2;
            }
            vstate.hit -= damage;
            vstate.update_position();
            debug!(
                "{} hits {} for {} ({} hp left)",
                attacker.key(),
                victim.key(),
                damage,
                vstate.hit
            );
            // The victim swings back starting next round.
            if vstate.position >= Position::Fighting && vstate.fighting.is_none() {
                vstate.fighting = Some(attacker.key().to_string());
                vstate.position = Position::Fighting;
            }
            vstate.position == Position::Dead
        }
    };

    if dead {
        raw_kill(world, &victim, now);
    }
}

/// The death path: clear every fight link targeting the victim system-wide
/// (any third party could be on it, not just the killer), spill the
/// victim's gear into a corpse, schedule an NPC respawn, and deregister.
pub fn raw_kill(world: &World, victim: &Arc<Character>, now: DateTime<Utc>) {
    for bystander in world.characters() {
        if bystander.key() == victim.key() {
            continue;
        }
        let mut state = bystander.write();
        if state.fighting.as_deref() == Some(victim.key()) {
            state.fighting = None;
            if state.position == Position::Fighting {
                state.position = Position::Standing;
            }
        }
    }

    let carried = {
        let mut state = victim.write();
        state.fighting = None;
        state.position = Position::Dead;
        state.strip_carried()
    };

    // Character lock released before touching the room.
    let room = victim.room();
    if let Some(room) = &room {
        room.write()
            .objects
            .push(ObjectInstance::corpse(victim.name(), carried));
        if let Some(proto) = victim.proto() {
            schedule_mob_respawn(world, proto.id, room, now);
        }
    } else {
        debug!("{} died roomless; no corpse left behind", victim.key());
    }

    world.remove_character(victim);
    metrics::inc_deaths();
    info!("{} is dead", victim.name());
}
