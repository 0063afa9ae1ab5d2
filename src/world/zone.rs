//! Zone aging, scripted reset execution, and respawn-queue processing.
//!
//! A zone ages by one each zone pulse; hitting its lifespan replays the
//! authored reset script and zeroes the age. Load commands are capped by a
//! per-room maximum checked twice, once optimistically and once under the
//! room lock, so concurrent resets cannot overshoot the cap.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::logutil::escape_log;
use crate::metrics;
use crate::world::character::Character;
use crate::world::registry::World;
use crate::world::room::Room;
use crate::world::types::{
    MobProtoId, MobRespawn, ObjKind, ObjectInstance, ResetCommand, RoomId, ZoneId,
};

pub struct Zone {
    id: ZoneId,
    name: String,
    /// Inclusive room-id range this zone owns.
    bottom: RoomId,
    top: RoomId,
    /// Zone pulses between resets; also the respawn delay in minutes.
    lifespan: u32,
    age: AtomicU32,
    commands: Vec<ResetCommand>,
}

impl Zone {
    pub fn new(
        id: ZoneId,
        name: &str,
        bottom: RoomId,
        top: RoomId,
        lifespan: u32,
        commands: Vec<ResetCommand>,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            bottom,
            top,
            lifespan: lifespan.max(1),
            age: AtomicU32::new(0),
            commands,
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifespan(&self) -> u32 {
        self.lifespan
    }

    pub fn age(&self) -> u32 {
        self.age.load(Ordering::SeqCst)
    }

    pub fn contains(&self, room: RoomId) -> bool {
        self.bottom <= room && room <= self.top
    }

    /// Advance the age by one pulse. Returns true exactly when this call
    /// crossed the lifespan and claimed the reset; the compare-exchange
    /// keeps "fires once" true even under concurrent pulse invocations.
    pub fn tick_age(&self) -> bool {
        let aged = self.age.fetch_add(1, Ordering::SeqCst) + 1;
        if aged >= self.lifespan {
            self.age
                .compare_exchange(aged, 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        } else {
            false
        }
    }
}

/// One zone/respawn pulse: age every zone, fire due resets, then process
/// the respawn queue.
pub fn pulse_zones(world: &World, now: DateTime<Utc>) {
    for zone in world.zones() {
        if zone.tick_age() {
            reset_zone(world, &zone);
        }
    }
    process_respawns(world, now);
}

/// Replay a zone's reset script. Each command is idempotent up to its cap;
/// content errors (missing prototypes, missing rooms) are logged and
/// skipped so one bad row never halts the reset.
pub fn reset_zone(world: &World, zone: &Zone) {
    debug!(
        "resetting zone {} ({})",
        zone.id(),
        escape_log(zone.name())
    );
    // Equip/give/put bind to the most recent successful load of this run.
    let mut last_mob: Option<Arc<Character>> = None;
    let mut last_obj_room: Option<RoomId> = None;

    for command in &zone.commands {
        match command {
            ResetCommand::LoadMobile { mobile, room, max } => {
                last_mob = match world.spawn_mobile(*mobile, *room, Some(*max)) {
                    Ok(spawned) => {
                        if spawned.is_some() {
                            metrics::record_zone_mob_loaded(zone.id().0);
                        }
                        spawned
                    }
                    Err(e) => {
                        warn!("zone {} load_mobile failed: {}", zone.id(), e);
                        None
                    }
                };
            }
            ResetCommand::LoadObject { object, room, max } => {
                last_obj_room = load_object_capped(world, zone, *object, *room, *max);
            }
            ResetCommand::EquipMobile { object, slot } => match (&last_mob, world.get_obj_proto(*object)) {
                (Some(mob), Some(proto)) => {
                    let mut state = mob.write();
                    state
                        .equipment
                        .insert(*slot, ObjectInstance::from_proto(&proto));
                    state.recompute_totals();
                }
                (None, _) => debug!(
                    "zone {} equip of {} skipped: no mobile loaded this run",
                    zone.id(),
                    object
                ),
                (_, None) => warn!(
                    "zone {} equip names missing object prototype {}",
                    zone.id(),
                    object
                ),
            },
            ResetCommand::GiveToMobile { object } => match (&last_mob, world.get_obj_proto(*object)) {
                (Some(mob), Some(proto)) => {
                    mob.write().inventory.push(ObjectInstance::from_proto(&proto));
                }
                (None, _) => debug!(
                    "zone {} give of {} skipped: no mobile loaded this run",
                    zone.id(),
                    object
                ),
                (_, None) => warn!(
                    "zone {} give names missing object prototype {}",
                    zone.id(),
                    object
                ),
            },
            ResetCommand::PutInObject { object, container } => {
                put_in_container(world, zone, *object, *container, last_obj_room);
            }
            ResetCommand::SetDoor {
                room,
                direction,
                state,
            } => match world.get_room(*room) {
                Some(room) => {
                    let has_door = room
                        .exits()
                        .get(direction)
                        .map(|e| e.door.is_some())
                        .unwrap_or(false);
                    if has_door {
                        room.write().doors.insert(*direction, *state);
                    } else {
                        warn!(
                            "zone {} set_door names {} {} which has no door",
                            zone.id(),
                            room.id(),
                            direction.as_str()
                        );
                    }
                }
                None => warn!("zone {} set_door names missing room {}", zone.id(), room),
            },
            ResetCommand::RemoveObject { object, room } => match world.get_room(*room) {
                Some(room) => {
                    room.write().objects.retain(|o| o.proto_id() != Some(*object));
                }
                None => warn!("zone {} remove names missing room {}", zone.id(), room),
            },
        }
    }

    metrics::inc_zone_resets();
    metrics::record_zone_reset(zone.id().0);
    info!("zone {} ({}) reset", zone.id(), escape_log(zone.name()));
}

/// Load an object into a room, capped at `max` existing copies. The count
/// runs twice: once without the room lock, once again under it.
fn load_object_capped(
    world: &World,
    zone: &Zone,
    object: crate::world::types::ObjProtoId,
    room_id: RoomId,
    max: u32,
) -> Option<RoomId> {
    let Some(room) = world.get_room(room_id) else {
        warn!("zone {} load_object names missing room {}", zone.id(), room_id);
        return None;
    };
    let Some(proto) = world.get_obj_proto(object) else {
        warn!(
            "zone {} load_object names missing object prototype {}",
            zone.id(),
            object
        );
        return None;
    };

    // Optimistic check without the lock.
    if room.count_objects_of(object) >= max as usize {
        return None;
    }

    let mut state = room.write();
    // Re-check under the lock: two concurrent resets may both have passed
    // the optimistic count.
    let present = state
        .objects
        .iter()
        .filter(|o| o.proto_id() == Some(object))
        .count();
    if present >= max as usize {
        debug!(
            "zone {} load_object of {} lost the double-check race, skipped",
            zone.id(),
            object
        );
        return None;
    }
    state.objects.push(ObjectInstance::from_proto(&proto));
    metrics::record_zone_obj_loaded(zone.id().0);
    Some(room_id)
}

/// Put a fresh instance of `object` inside a container. The room of the
/// last successful load is tried first, then the zone's rooms in id order.
fn put_in_container(
    world: &World,
    zone: &Zone,
    object: crate::world::types::ObjProtoId,
    container: crate::world::types::ObjProtoId,
    last_obj_room: Option<RoomId>,
) {
    let Some(proto) = world.get_obj_proto(object) else {
        warn!(
            "zone {} put names missing object prototype {}",
            zone.id(),
            object
        );
        return;
    };

    let mut candidates: Vec<Arc<Room>> = Vec::new();
    if let Some(id) = last_obj_room {
        if let Some(room) = world.get_room(id) {
            candidates.push(room);
        }
    }
    candidates.extend(
        world
            .rooms()
            .into_iter()
            .filter(|r| zone.contains(r.id()) || r.zone() == zone.id()),
    );

    for room in candidates {
        let mut state = room.write();
        let found = state.objects.iter_mut().find(|o| {
            o.proto_id() == Some(container)
                && (o.kind == ObjKind::Container || o.kind == ObjKind::Corpse)
        });
        if let Some(holder) = found {
            holder.contents.push(ObjectInstance::from_proto(&proto));
            return;
        }
    }
    debug!(
        "zone {} put of {} found no container {} to fill",
        zone.id(),
        object,
        container
    );
}

/// Queue a dead NPC for re-instantiation in the room it died in, delayed by
/// its zone's lifespan in minutes. An NPC whose zone cannot be resolved
/// fails closed: logged and dropped, never retried forever.
pub fn schedule_mob_respawn(
    world: &World,
    proto: MobProtoId,
    room: &Room,
    now: DateTime<Utc>,
) {
    match world.resolve_zone_for_room(room) {
        Some(zone) => world.schedule_respawn(MobRespawn {
            mobile: proto,
            room: room.id(),
            due_at: now + Duration::minutes(zone.lifespan() as i64),
        }),
        None => {
            warn!(
                "no zone resolves room {}; respawn of {} dropped",
                room.id(),
                proto
            );
            metrics::inc_respawns_dropped();
        }
    }
}

/// Re-instantiate every NPC whose scheduled time has passed, consuming its
/// queue entry exactly once.
pub fn process_respawns(world: &World, now: DateTime<Utc>) {
    for respawn in world.take_due_respawns(now) {
        match world.spawn_mobile(respawn.mobile, respawn.room, None) {
            Ok(Some(ch)) => {
                metrics::inc_respawns_spawned();
                debug!("{} respawned into {}", ch.key(), respawn.room);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "respawn of {} in {} failed: {}; entry dropped",
                    respawn.mobile, respawn.room, e
                );
                metrics::inc_respawns_dropped();
            }
        }
    }
}
