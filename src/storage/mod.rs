//! Player persistence layer.
//!
//! Sled-backed storage for player records. The in-memory registry is the
//! source of truth while the server runs; this store is consulted at login
//! and written on save/logout. The data directory carries an advisory file
//! lock so two server instances cannot share it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use log::{debug, info};
use sled::IVec;

use crate::validation::validate_player_name;
use crate::world::character::Character;
use crate::world::errors::WorldError;
use crate::world::registry::World;
use crate::world::types::{ClassKind, PlayerRecord, PLAYER_SCHEMA_VERSION};

const TREE_PLAYERS: &str = "players";
const LOCK_FILE: &str = "pulsemud.lock";

/// Sled-backed persistence for player state.
pub struct PlayerStore {
    _db: sled::Db,
    players: sled::Tree,
    /// Held for the store's lifetime; releases on drop.
    _lock_file: File,
}

impl PlayerStore {
    /// Open (or create) the player store rooted at `path`, taking the data
    /// directory lock first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WorldError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;

        let lock_path: PathBuf = path_ref.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| WorldError::DataDirLocked(lock_path.display().to_string()))?;

        let db = sled::open(path_ref.join("players_db"))?;
        let players = db.open_tree(TREE_PLAYERS)?;
        Ok(Self {
            _db: db,
            players,
            _lock_file: lock_file,
        })
    }

    fn players_key(username: &str) -> Vec<u8> {
        format!("players:{}", username.to_ascii_lowercase()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WorldError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, WorldError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a player record.
    pub fn put_player(&self, mut record: PlayerRecord) -> Result<(), WorldError> {
        record.schema_version = PLAYER_SCHEMA_VERSION;
        record.touch();
        let key = Self::players_key(&record.username);
        let bytes = Self::serialize(&record)?;
        self.players.insert(key, bytes)?;
        self.players.flush()?;
        Ok(())
    }

    /// Snapshot a live character into the store. NPCs are never persisted;
    /// saving one is a quiet no-op.
    pub fn save_character(&self, ch: &Character) -> Result<(), WorldError> {
        match ch.to_player_record() {
            Some(record) => self.put_player(record),
            None => {
                debug!("save of NPC {} skipped", ch.key());
                Ok(())
            }
        }
    }

    /// Fetch a player record by username.
    pub fn load_character(&self, username: &str) -> Result<PlayerRecord, WorldError> {
        let key = Self::players_key(username);
        let Some(bytes) = self.players.get(&key)? else {
            return Err(WorldError::NotFound(format!("player: {}", username)));
        };
        let record: PlayerRecord = Self::deserialize(bytes)?;
        if record.schema_version != PLAYER_SCHEMA_VERSION {
            return Err(WorldError::SchemaMismatch {
                entity: "player",
                expected: PLAYER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Whether a player of this name has ever been saved.
    pub fn character_exists(&self, username: &str) -> Result<bool, WorldError> {
        let key = Self::players_key(username);
        Ok(self.players.contains_key(key)?)
    }

    /// List all player usernames currently stored.
    pub fn list_player_names(&self) -> Result<Vec<String>, WorldError> {
        let mut names = Vec::new();
        for entry in self.players.scan_prefix(b"players:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(username) = text.strip_prefix("players:") {
                names.push(username.to_string());
            }
        }
        Ok(names)
    }
}

/// The player-load path: validate the name, load the saved record (or
/// create a fresh one), and place the character through the registry's
/// fallback chain. This is the command layer's single entry point for
/// bringing a player into the world.
pub fn login_player(
    world: &World,
    store: &PlayerStore,
    name: &str,
    class: ClassKind,
) -> Result<Arc<Character>, WorldError> {
    let key = validate_player_name(name).map_err(|e| WorldError::NoValidTarget(e.to_string()))?;
    let record = if store.character_exists(&key)? {
        store.load_character(&key)?
    } else {
        let record = PlayerRecord::new(&key, name, class);
        store.put_player(record.clone())?;
        record
    };
    let ch = Character::from_player_record(&record);
    let placed = world.add_character(&ch, record.room_id);
    info!(
        "{} enters the game at {}",
        ch.key(),
        placed
            .map(|r| r.id().to_string())
            .unwrap_or_else(|| "no room".to_string())
    );
    Ok(ch)
}

/// The mirror of `login_player`: persist the character, then deregister it
/// and strip it from its room's roster.
pub fn logout_player(
    world: &World,
    store: &PlayerStore,
    ch: &Arc<Character>,
) -> Result<(), WorldError> {
    store.save_character(ch)?;
    world.remove_character(ch);
    info!("{} leaves the game", ch.key());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::ClassKind;
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_player() {
        let dir = TempDir::new().expect("tempdir");
        let store = PlayerStore::open(dir.path()).expect("store");
        let mut record = PlayerRecord::new("alice", "Alice", ClassKind::Warrior);
        record.gold = 42;
        store.put_player(record.clone()).expect("put");
        let fetched = store.load_character("Alice").expect("get");
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.gold, 42);
        assert_eq!(fetched.schema_version, PLAYER_SCHEMA_VERSION);
    }

    #[test]
    fn exists_and_listing() {
        let dir = TempDir::new().expect("tempdir");
        let store = PlayerStore::open(dir.path()).expect("store");
        assert!(!store.character_exists("bob").expect("exists"));
        store
            .put_player(PlayerRecord::new("bob", "Bob", ClassKind::Thief))
            .expect("put");
        assert!(store.character_exists("bob").expect("exists"));
        assert_eq!(store.list_player_names().expect("list"), vec!["bob"]);
    }

    #[test]
    fn live_character_saves_and_reloads() {
        let dir = TempDir::new().expect("tempdir");
        let store = PlayerStore::open(dir.path()).expect("store");
        let ch = Character::new_player("carol", "Carol", ClassKind::Cleric);
        ch.write().gold = 1000;
        store.save_character(&ch).expect("save");

        let record = store.load_character("carol").expect("load");
        assert_eq!(record.gold, 1000);
        let revived = Character::from_player_record(&record);
        assert_eq!(revived.name(), "Carol");
        assert_eq!(revived.read().gold, 1000);
    }

    #[test]
    fn login_round_trip_restores_the_saved_room() {
        use crate::world::registry::{WorldContent, WorldSettings};
        use crate::world::room::Room;
        use crate::world::types::{RoomId, ZoneId};
        use std::collections::HashMap;

        let dir = TempDir::new().expect("tempdir");
        let store = PlayerStore::open(dir.path()).expect("store");
        let world = World::new(
            WorldContent {
                rooms: vec![
                    Room::new(
                        RoomId(1),
                        ZoneId(0),
                        "The Void",
                        "Nothing here.",
                        Vec::new(),
                        HashMap::new(),
                    ),
                    Room::new(
                        RoomId(3001),
                        ZoneId(30),
                        "Town",
                        "The town.",
                        Vec::new(),
                        HashMap::new(),
                    ),
                ],
                zones: Vec::new(),
                mob_protos: Vec::new(),
                obj_protos: Vec::new(),
                shops: Vec::new(),
            },
            WorldSettings {
                start_room: RoomId(3001),
                void_room: RoomId(1),
            },
        );

        // Fresh player: created, placed via the fallback chain.
        let ch = login_player(&world, &store, "Dora", ClassKind::Mage).expect("login");
        assert_eq!(ch.room_id(), Some(RoomId(1)));

        // Walk to town, log out, log back in: the saved room sticks.
        let town = world.get_room(RoomId(3001)).expect("room");
        crate::world::placement::move_character(&ch, &town);
        logout_player(&world, &store, &ch).expect("logout");
        assert!(world.get_character("dora").is_none());

        let again = login_player(&world, &store, "Dora", ClassKind::Mage).expect("relogin");
        assert_eq!(again.room_id(), Some(RoomId(3001)));
    }

    #[test]
    fn login_rejects_invalid_names() {
        use crate::world::registry::{WorldContent, WorldSettings};
        use crate::world::types::RoomId;

        let dir = TempDir::new().expect("tempdir");
        let store = PlayerStore::open(dir.path()).expect("store");
        let world = World::new(
            WorldContent {
                rooms: Vec::new(),
                zones: Vec::new(),
                mob_protos: Vec::new(),
                obj_protos: Vec::new(),
                shops: Vec::new(),
            },
            WorldSettings {
                start_room: RoomId(1),
                void_room: RoomId(1),
            },
        );
        assert!(matches!(
            login_player(&world, &store, "x", ClassKind::Thief),
            Err(WorldError::NoValidTarget(_))
        ));
    }

    #[test]
    fn second_open_of_same_dir_is_refused() {
        let dir = TempDir::new().expect("tempdir");
        let _store = PlayerStore::open(dir.path()).expect("store");
        assert!(matches!(
            PlayerStore::open(dir.path()),
            Err(WorldError::DataDirLocked(_))
        ));
    }
}
