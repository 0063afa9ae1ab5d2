//! The pulse scheduler: a serial driver loop that invokes a fixed set of
//! pulse entry points at fixed real-time intervals.
//!
//! Every pulse has the same shape: snapshot the relevant entity set under a
//! brief registry read lock, release it, then process the snapshot taking
//! only the fine-grained room/character locks each individual mutation
//! needs. A long per-entity computation therefore never blocks
//! registry-level operations for the whole batch. A missed pulse causes
//! delay, never corruption; any pulse is safe to skip a cycle.

pub mod activity;
pub mod violence;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::time::MissedTickBehavior;

use crate::config::PulseConfig;
use crate::world::character::CharState;
use crate::world::registry::World;
use crate::world::types::{AffectFlag, ClassKind, ObjectInstance, Position};
use crate::world::zone::pulse_zones;

pub use activity::{MobileActivity, MobileWorld};
pub use violence::{pulse_violence, raw_kill, set_fighting, stop_fighting};

/// Drives the five pulses serially from one loop. The locking protocol
/// underneath stays correct if the pulses are ever parallelized; the
/// serial driver is a simplicity choice, not a correctness requirement.
pub struct PulseDriver {
    world: Arc<World>,
    activity: MobileActivity,
    config: PulseConfig,
}

impl PulseDriver {
    pub fn new(world: Arc<World>, config: PulseConfig) -> Self {
        Self {
            world,
            activity: MobileActivity::new(),
            config,
        }
    }

    /// Run until ctrl-c. The first tick of every interval fires
    /// immediately, so zones reset once at boot.
    pub async fn run(self) -> Result<()> {
        info!(
            "pulse driver started (violence {}s, points {}s, affects {}s, mobiles {}s, zones {}s)",
            self.config.violence_secs,
            self.config.point_secs,
            self.config.affect_secs,
            self.config.mobile_secs,
            self.config.zone_secs
        );

        let mut violence = tokio::time::interval(self.config.violence_interval());
        let mut points = tokio::time::interval(self.config.point_interval());
        let mut affects = tokio::time::interval(self.config.affect_interval());
        let mut mobiles = tokio::time::interval(self.config.mobile_interval());
        let mut zones = tokio::time::interval(self.config.zone_interval());
        for interval in [
            &mut violence,
            &mut points,
            &mut affects,
            &mut mobiles,
            &mut zones,
        ] {
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        loop {
            tokio::select! {
                _ = violence.tick() => pulse_violence(&self.world, Utc::now()),
                _ = points.tick() => pulse_point_update(&self.world, Utc::now()),
                _ = affects.tick() => pulse_affect_update(&self.world),
                _ = mobiles.tick() => self.activity.tick(self.world.as_ref(), Utc::now()),
                _ = zones.tick() => pulse_zones(&self.world, Utc::now()),
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested, stopping pulse driver");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn hit_gain(state: &CharState, is_npc: bool) -> i32 {
    if is_npc {
        return state.level as i32;
    }
    let mut gain = state.level as i32 / 2 + 4 + state.stats.constitution as i32 / 4;
    gain = match state.position {
        Position::Sleeping => gain * 2,
        Position::Resting => gain + gain / 2,
        Position::Sitting => gain + gain / 4,
        _ => gain,
    };
    if state.has_affect_flag(AffectFlag::Poison) {
        gain /= 4;
    }
    if state.conditions.hunger == 0 || state.conditions.thirst == 0 {
        gain /= 4;
    }
    gain
}

fn mana_gain(state: &CharState, is_npc: bool) -> i32 {
    if is_npc {
        return state.level as i32;
    }
    let mut gain = state.level as i32 / 2 + 4;
    if matches!(state.class, ClassKind::Mage | ClassKind::Cleric) {
        gain *= 2;
    }
    gain = match state.position {
        Position::Sleeping => gain * 2,
        Position::Resting => gain + gain / 2,
        Position::Sitting => gain + gain / 4,
        _ => gain,
    };
    if state.has_affect_flag(AffectFlag::Poison) {
        gain /= 4;
    }
    if state.conditions.hunger == 0 || state.conditions.thirst == 0 {
        gain /= 4;
    }
    gain
}

fn move_gain(state: &CharState, is_npc: bool) -> i32 {
    if is_npc {
        return state.level as i32;
    }
    let mut gain = state.level as i32 / 2 + 4 + state.stats.dexterity as i32 / 4;
    gain = match state.position {
        Position::Sleeping => gain * 2,
        Position::Resting => gain + gain / 2,
        Position::Sitting => gain + gain / 4,
        _ => gain,
    };
    if state.has_affect_flag(AffectFlag::Poison) {
        gain /= 4;
    }
    gain
}

/// Point-update pulse: regeneration, position-based decay damage,
/// hunger/thirst/drunkenness, and object decay timers.
pub fn pulse_point_update(world: &World, now: DateTime<Utc>) {
    for ch in world.characters() {
        let died = {
            let mut state = ch.write();
            match state.position {
                Position::Dead => false,
                Position::MortallyWounded => {
                    state.hit -= 2;
                    state.update_position();
                    state.position == Position::Dead
                }
                Position::Incapacitated => {
                    state.hit -= 1;
                    state.update_position();
                    state.position == Position::Dead
                }
                Position::Stunned => {
                    // Stunned characters come around on their own.
                    state.hit = (state.hit + hit_gain(&state, ch.is_npc())).min(state.max_hit);
                    state.update_position();
                    false
                }
                _ => {
                    state.hit = (state.hit + hit_gain(&state, ch.is_npc())).min(state.max_hit);
                    state.mana = (state.mana + mana_gain(&state, ch.is_npc())).min(state.max_mana);
                    state.moves =
                        (state.moves + move_gain(&state, ch.is_npc())).min(state.max_moves);
                    false
                }
            }
        };
        if died {
            debug!("{} succumbs to wounds", ch.key());
            raw_kill(world, &ch, now);
            continue;
        }
        if !ch.is_npc() {
            let mut state = ch.write();
            state.conditions.hunger = (state.conditions.hunger - 1).max(0);
            state.conditions.thirst = (state.conditions.thirst - 1).max(0);
            state.conditions.drunk = (state.conditions.drunk - 1).max(0);
        }
    }

    // Object decay runs room by room under each room's own lock.
    for room in world.rooms() {
        let mut state = room.write();
        decay_objects(&mut state.objects);
    }
}

/// Age decaying objects by one pulse. An expired corpse spills its
/// contents onto the floor before vanishing.
fn decay_objects(objects: &mut Vec<ObjectInstance>) {
    let mut spilled = Vec::new();
    objects.retain_mut(|obj| match obj.timer {
        Some(t) if t <= 1 => {
            debug!("{} crumbles to dust", obj.short_desc);
            spilled.append(&mut obj.contents);
            false
        }
        Some(t) => {
            obj.timer = Some(t - 1);
            true
        }
        None => true,
    });
    objects.extend(spilled);
}

/// Affect-update pulse: walk each character's affect vector, decrement
/// durations, drop expired entries, and recompute stat totals from scratch
/// (base + equipment + remaining affects, never incremental subtraction).
pub fn pulse_affect_update(world: &World) {
    for ch in world.characters() {
        let mut state = ch.write();
        if state.affects.is_empty() {
            continue;
        }
        for affect in &mut state.affects {
            affect.hours -= 1;
        }
        let expired: Vec<_> = state
            .affects
            .iter()
            .filter(|a| a.hours <= 0)
            .map(|a| a.kind)
            .collect();
        if expired.is_empty() {
            continue;
        }
        for kind in &expired {
            debug!("{:?} wears off {}", kind, ch.key());
        }
        state.affects.retain(|a| a.hours > 0);
        state.recompute_totals();
    }
}
