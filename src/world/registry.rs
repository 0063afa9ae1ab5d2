//! World registry: the single coarse lock over entity maps and the respawn
//! queue. The registry lock governs membership, never entity content; the
//! `Arc`s it hands out are mutated through each entity's own lock.
//!
//! Lock hierarchy, outermost first: registry, rooms (ascending id), one
//! character at a time. The registry write lock is held only across map
//! mutation; the one sanctioned nesting is a single room lock inside it,
//! used by capped spawning so the max-count re-check and the registration
//! are atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::metrics;
use crate::world::character::{Character, RoomRef};
use crate::world::errors::WorldError;
use crate::world::room::Room;
use crate::world::types::{
    MobProto, MobProtoId, MobRespawn, ObjProto, ObjProtoId, RoomId, Shop, ShopId, ZoneId,
};
use crate::world::zone::Zone;

/// Static world content produced by the seed loaders.
pub struct WorldContent {
    pub rooms: Vec<Room>,
    pub zones: Vec<Zone>,
    pub mob_protos: Vec<MobProto>,
    pub obj_protos: Vec<ObjProto>,
    pub shops: Vec<Shop>,
}

/// Placement fallbacks used when a character's room cannot be resolved.
#[derive(Debug, Clone, Copy)]
pub struct WorldSettings {
    pub start_room: RoomId,
    pub void_room: RoomId,
}

struct Registry {
    rooms: BTreeMap<RoomId, Arc<Room>>,
    zones: BTreeMap<ZoneId, Arc<Zone>>,
    mob_protos: HashMap<MobProtoId, Arc<MobProto>>,
    obj_protos: HashMap<ObjProtoId, Arc<ObjProto>>,
    shops: HashMap<ShopId, Arc<Shop>>,
    /// Live characters by registry key (players: lowercase name).
    characters: HashMap<String, Arc<Character>>,
    /// Pending NPC re-instantiations, insertion-ordered.
    respawns: Vec<MobRespawn>,
}

pub struct World {
    registry: RwLock<Registry>,
    settings: WorldSettings,
}

impl World {
    /// Assemble the world from loaded content. Shops are attached to their
    /// rooms here; a shop naming a missing room is a content error, logged
    /// and skipped.
    pub fn new(content: WorldContent, settings: WorldSettings) -> Arc<Self> {
        let rooms: BTreeMap<RoomId, Arc<Room>> = content
            .rooms
            .into_iter()
            .map(|r| (r.id(), Arc::new(r)))
            .collect();
        let zones: BTreeMap<ZoneId, Arc<Zone>> = content
            .zones
            .into_iter()
            .map(|z| (z.id(), Arc::new(z)))
            .collect();
        let mob_protos: HashMap<MobProtoId, Arc<MobProto>> = content
            .mob_protos
            .into_iter()
            .map(|p| (p.id, Arc::new(p)))
            .collect();
        let obj_protos: HashMap<ObjProtoId, Arc<ObjProto>> = content
            .obj_protos
            .into_iter()
            .map(|p| (p.id, Arc::new(p)))
            .collect();

        let mut shops = HashMap::new();
        for shop in content.shops {
            let shop = Arc::new(shop);
            match rooms.get(&shop.room) {
                Some(room) => {
                    room.write().shop = Some(Arc::clone(&shop));
                    shops.insert(shop.id, shop);
                }
                None => warn!("shop {} names missing room {}, skipped", shop.id, shop.room),
            }
        }

        info!(
            "world assembled: {} rooms, {} zones, {} mobile prototypes, {} object prototypes, {} shops",
            rooms.len(),
            zones.len(),
            mob_protos.len(),
            obj_protos.len(),
            shops.len()
        );

        Arc::new(Self {
            registry: RwLock::new(Registry {
                rooms,
                zones,
                mob_protos,
                obj_protos,
                shops,
                characters: HashMap::new(),
                respawns: Vec::new(),
            }),
            settings,
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().expect("world registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.registry.write().expect("world registry lock poisoned")
    }

    pub fn settings(&self) -> WorldSettings {
        self.settings
    }

    pub fn get_room(&self, id: RoomId) -> Option<Arc<Room>> {
        self.read().rooms.get(&id).cloned()
    }

    pub fn get_zone(&self, id: ZoneId) -> Option<Arc<Zone>> {
        self.read().zones.get(&id).cloned()
    }

    pub fn get_mob_proto(&self, id: MobProtoId) -> Option<Arc<MobProto>> {
        self.read().mob_protos.get(&id).cloned()
    }

    pub fn get_obj_proto(&self, id: ObjProtoId) -> Option<Arc<ObjProto>> {
        self.read().obj_protos.get(&id).cloned()
    }

    pub fn get_shop(&self, id: ShopId) -> Option<Arc<Shop>> {
        self.read().shops.get(&id).cloned()
    }

    /// Look up a live character by registry key (case-insensitive for
    /// player names).
    pub fn get_character(&self, key: &str) -> Option<Arc<Character>> {
        let lookup = key.to_ascii_lowercase();
        self.read().characters.get(&lookup).cloned()
    }

    /// Snapshot all rooms under a brief read lock.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.read().rooms.values().cloned().collect()
    }

    /// Snapshot all zones under a brief read lock.
    pub fn zones(&self) -> Vec<Arc<Zone>> {
        self.read().zones.values().cloned().collect()
    }

    /// Snapshot all live characters under a brief read lock. Pulse handlers
    /// iterate this throwaway copy without holding the registry lock.
    pub fn characters(&self) -> Vec<Arc<Character>> {
        self.read().characters.values().cloned().collect()
    }

    /// Snapshot all live NPCs.
    pub fn mobiles(&self) -> Vec<Arc<Character>> {
        self.read()
            .characters
            .values()
            .filter(|c| c.is_npc())
            .cloned()
            .collect()
    }

    /// Snapshot all live players.
    pub fn players(&self) -> Vec<Arc<Character>> {
        self.read()
            .characters
            .values()
            .filter(|c| !c.is_npc())
            .cloned()
            .collect()
    }

    pub fn character_count(&self) -> usize {
        self.read().characters.len()
    }

    /// Deterministic, total placement fallback: saved room, then the void
    /// room, then the start room, then no room at all.
    pub fn resolve_placement(&self, saved: Option<RoomId>) -> Option<Arc<Room>> {
        let registry = self.read();
        let candidates = [
            saved,
            Some(self.settings.void_room),
            Some(self.settings.start_room),
        ];
        for id in candidates.into_iter().flatten() {
            if let Some(room) = registry.rooms.get(&id) {
                return Some(Arc::clone(room));
            }
        }
        None
    }

    /// Register a character and place it in a room, externally atomic from
    /// the caller's point of view. A character whose room cannot be
    /// resolved stays registered but roomless rather than failing.
    ///
    /// Returns the room the character ended up in, if any.
    pub fn add_character(
        &self,
        ch: &Arc<Character>,
        saved_room: Option<RoomId>,
    ) -> Option<Arc<Room>> {
        // Resolve the target before taking any write lock.
        let room = self.resolve_placement(saved_room);
        if room.is_none() {
            warn!(
                "no resolvable room for {} (saved {:?}); registering roomless",
                ch.key(),
                saved_room
            );
        }

        {
            let mut registry = self.write();
            if registry
                .characters
                .insert(ch.key().to_string(), Arc::clone(ch))
                .is_some()
            {
                warn!("character {} was already registered; replaced", ch.key());
            }
        }

        if let Some(room) = &room {
            room.write().insert_character(room.id(), ch);
            ch.write().room = Some(RoomRef::new(room));
            debug!("{} enters the world at {}", ch.key(), room.id());
        }
        room
    }

    /// Deregister a character and strip it from its room's roster: the
    /// mirror of `add_character`.
    pub fn remove_character(&self, ch: &Arc<Character>) {
        let removed = self.write().characters.remove(ch.key()).is_some();
        if !removed {
            warn!("character {} was not registered during removal", ch.key());
        }

        let room = ch.room();
        if let Some(room) = room {
            room.write().remove_character(room.id(), ch.key());
        }
        let mut state = ch.write();
        state.room = None;
        state.fighting = None;
    }

    /// Count live NPCs of a prototype currently placed in a room, from
    /// cached room ids. Used as the optimistic half of the load-command
    /// double-check; the authoritative count happens under the room lock.
    pub fn count_mobiles_of_in(&self, proto: MobProtoId, room: RoomId) -> usize {
        self.read()
            .characters
            .values()
            .filter(|c| c.proto().map(|p| p.id) == Some(proto))
            .filter(|c| c.room_id() == Some(room))
            .count()
    }

    /// Instantiate a prototype into a room, optionally capped at `max`
    /// existing copies in that room.
    ///
    /// The cap is checked twice: optimistically before any write lock, and
    /// again with the room lock nested inside the registry write lock, so
    /// two concurrent resets cannot both pass. Returns `Ok(None)` when the
    /// cap holds the spawn back.
    pub fn spawn_mobile(
        &self,
        proto_id: MobProtoId,
        room_id: RoomId,
        max: Option<u32>,
    ) -> Result<Option<Arc<Character>>, WorldError> {
        if let Some(max) = max {
            if self.count_mobiles_of_in(proto_id, room_id) >= max as usize {
                debug!(
                    "spawn of {} in {} skipped: {} copies already present",
                    proto_id, room_id, max
                );
                return Ok(None);
            }
        }

        let proto = self
            .get_mob_proto(proto_id)
            .ok_or(WorldError::MobProtoNotFound(proto_id))?;
        let room = self
            .get_room(room_id)
            .ok_or(WorldError::RoomNotFound(room_id))?;
        let ch = Character::from_proto(&proto);

        {
            let mut registry = self.write();
            // Room lock nested inside the registry lock, never the reverse.
            let mut room_state = room.write();
            if let Some(max) = max {
                let in_room = room_state
                    .characters
                    .iter()
                    .filter(|c| c.proto().map(|p| p.id) == Some(proto_id))
                    .count();
                if in_room >= max as usize {
                    debug!(
                        "spawn of {} in {} lost the double-check race, skipped",
                        proto_id, room_id
                    );
                    return Ok(None);
                }
            }
            registry
                .characters
                .insert(ch.key().to_string(), Arc::clone(&ch));
            room_state.insert_character(room.id(), &ch);
            ch.write().room = Some(RoomRef::new(&room));
        }
        debug!("{} spawned into {}", ch.key(), room_id);
        Ok(Some(ch))
    }

    /// Queue an NPC for re-instantiation.
    pub fn schedule_respawn(&self, respawn: MobRespawn) {
        metrics::inc_respawns_scheduled();
        debug!(
            "respawn of {} in {} scheduled for {}",
            respawn.mobile, respawn.room, respawn.due_at
        );
        self.write().respawns.push(respawn);
    }

    /// Remove and return every respawn entry whose time has come: a stable
    /// partition, preserving insertion order among entries kept.
    pub fn take_due_respawns(&self, now: DateTime<Utc>) -> Vec<MobRespawn> {
        let mut registry = self.write();
        let (due, pending): (Vec<_>, Vec<_>) = registry
            .respawns
            .drain(..)
            .partition(|r| r.due_at <= now);
        registry.respawns = pending;
        due
    }

    pub fn respawn_queue_len(&self) -> usize {
        self.read().respawns.len()
    }

    /// Resolve the zone an event in `room` belongs to: the room's own zone
    /// reference first, falling back to a scan of zone room-id ranges.
    pub fn resolve_zone_for_room(&self, room: &Room) -> Option<Arc<Zone>> {
        let registry = self.read();
        if let Some(zone) = registry.zones.get(&room.zone()) {
            return Some(Arc::clone(zone));
        }
        registry
            .zones
            .values()
            .find(|z| z.contains(room.id()))
            .cloned()
    }
}
