//! Room entity: immutable description/exit data plus a per-room lock over
//! the three mutable collections (roster, objects, door states).
//!
//! The room's lock is the unit of fine-grained concurrency for everything
//! that happens "in" a room. Callers must never acquire a room lock while
//! holding any character's lock; the sanctioned order is registry, then
//! rooms (ascending id), then one character at a time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;
use rand::seq::SliceRandom;

use crate::world::character::Character;
use crate::world::types::{
    Direction, DoorState, ExitDef, ObjProtoId, ObjectInstance, RoomFlag, RoomId, Shop, ZoneId,
};

pub struct Room {
    id: RoomId,
    zone: ZoneId,
    name: String,
    description: String,
    flags: Vec<RoomFlag>,
    exits: HashMap<Direction, ExitDef>,
    state: RwLock<RoomState>,
}

/// The mutable slice of a room, guarded by the room's own lock.
#[derive(Default)]
pub struct RoomState {
    /// Characters currently present. A character appears in at most one
    /// room's roster at any quiescent point.
    pub characters: Vec<Arc<Character>>,
    pub objects: Vec<ObjectInstance>,
    pub doors: HashMap<Direction, DoorState>,
    pub shop: Option<Arc<Shop>>,
}

impl Room {
    pub fn new(
        id: RoomId,
        zone: ZoneId,
        name: &str,
        description: &str,
        flags: Vec<RoomFlag>,
        exits: HashMap<Direction, ExitDef>,
    ) -> Self {
        // Doors start in their authored initial state.
        let doors = exits
            .iter()
            .filter_map(|(dir, exit)| exit.door.as_ref().map(|d| (*dir, d.initial_state)))
            .collect();
        Self {
            id,
            zone,
            name: name.to_string(),
            description: description.to_string(),
            flags,
            exits,
            state: RwLock::new(RoomState {
                doors,
                ..RoomState::default()
            }),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn exits(&self) -> &HashMap<Direction, ExitDef> {
        &self.exits
    }

    pub fn has_flag(&self, flag: RoomFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, RoomState> {
        self.state.read().expect("room lock poisoned")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, RoomState> {
        self.state.write().expect("room lock poisoned")
    }

    /// Snapshot the roster under a brief read lock.
    pub fn characters(&self) -> Vec<Arc<Character>> {
        self.read().characters.clone()
    }

    /// Snapshot the object list under a brief read lock.
    pub fn objects(&self) -> Vec<ObjectInstance> {
        self.read().objects.clone()
    }

    /// Count live objects of a prototype, under a brief read lock.
    pub fn count_objects_of(&self, proto: ObjProtoId) -> usize {
        self.read()
            .objects
            .iter()
            .filter(|o| o.proto_id() == Some(proto))
            .count()
    }

    /// Whether the exit in `dir` is currently passable (exists and its door,
    /// if any, stands open).
    pub fn exit_open(&self, dir: Direction) -> bool {
        if !self.exits.contains_key(&dir) {
            return false;
        }
        match self.read().doors.get(&dir) {
            Some(DoorState::Closed) | Some(DoorState::Locked) => false,
            _ => true,
        }
    }

    /// Pick a random passable exit, for wandering NPCs. Returns the
    /// direction and destination room id.
    pub fn random_exit(&self, rng: &mut impl rand::Rng) -> Option<(Direction, RoomId)> {
        let open: Vec<(Direction, RoomId)> = self
            .exits
            .iter()
            .filter(|(dir, _)| self.exit_open(**dir))
            .map(|(dir, exit)| (*dir, exit.to))
            .collect();
        open.choose(rng).copied()
    }
}

impl RoomState {
    /// Remove a character from the roster by registry key. A missing entry
    /// indicates prior state drift; it is logged and tolerated, never fatal.
    pub fn remove_character(&mut self, room: RoomId, key: &str) -> bool {
        let before = self.characters.len();
        self.characters.retain(|c| c.key() != key);
        if self.characters.len() == before {
            warn!(
                "character {} missing from room {} roster during removal",
                key, room
            );
            return false;
        }
        true
    }

    /// Insert a character into the roster, tolerating (and logging) a
    /// duplicate insert from prior state drift.
    pub fn insert_character(&mut self, room: RoomId, ch: &Arc<Character>) {
        if self.characters.iter().any(|c| c.key() == ch.key()) {
            warn!(
                "character {} already present in room {} roster during insert",
                ch.key(),
                room
            );
            return;
        }
        self.characters.push(Arc::clone(ch));
    }

    /// Remove an object instance by id, returning it if present.
    pub fn take_object(&mut self, instance: uuid::Uuid) -> Option<ObjectInstance> {
        let idx = self.objects.iter().position(|o| o.id == instance)?;
        Some(self.objects.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::{ClassKind, DoorDef};

    fn exit(to: u32) -> ExitDef {
        ExitDef {
            to: RoomId(to),
            door: None,
        }
    }

    fn test_room(exits: HashMap<Direction, ExitDef>) -> Room {
        Room::new(
            RoomId(3001),
            ZoneId(30),
            "The Temple Square",
            "A wide square before the temple.",
            Vec::new(),
            exits,
        )
    }

    #[test]
    fn roster_insert_and_remove() {
        let room = test_room(HashMap::new());
        let ch = Character::new_player("alice", "Alice", ClassKind::Warrior);
        {
            let mut state = room.write();
            state.insert_character(room.id(), &ch);
            // Duplicate insert is tolerated but not doubled.
            state.insert_character(room.id(), &ch);
            assert_eq!(state.characters.len(), 1);
        }
        {
            let mut state = room.write();
            assert!(state.remove_character(room.id(), ch.key()));
            assert!(!state.remove_character(room.id(), ch.key()));
            assert!(state.characters.is_empty());
        }
    }

    #[test]
    fn closed_door_blocks_exit() {
        let mut exits = HashMap::new();
        exits.insert(Direction::North, exit(3002));
        exits.insert(
            Direction::East,
            ExitDef {
                to: RoomId(3003),
                door: Some(DoorDef {
                    keywords: "gate".to_string(),
                    key: None,
                    initial_state: DoorState::Closed,
                }),
            },
        );
        let room = test_room(exits);

        assert!(room.exit_open(Direction::North));
        assert!(!room.exit_open(Direction::East));
        assert!(!room.exit_open(Direction::South));

        // Only the open exit is ever chosen.
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let (dir, to) = room.random_exit(&mut rng).expect("one open exit");
            assert_eq!(dir, Direction::North);
            assert_eq!(to, RoomId(3002));
        }

        // Opening the door makes it passable.
        room.write().doors.insert(Direction::East, DoorState::Open);
        assert!(room.exit_open(Direction::East));
    }
}
