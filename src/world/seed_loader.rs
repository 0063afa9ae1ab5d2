//! Seed data loaders for data-driven world initialization.
//!
//! The static world is authored as JSON files in `<data_dir>/world/`
//! (rooms, zones, mobiles, objects, shops), so builders can reshape content
//! without recompiling. Loading runs once at startup; a missing or
//! unparsable category is a hard startup failure, since the world cannot
//! run without its static content.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::world::errors::WorldError;
use crate::world::registry::WorldContent;
use crate::world::room::Room;
use crate::world::types::{
    Direction, ExitDef, MobProto, ObjProto, ResetCommand, RoomFlag, RoomId, Shop, ZoneId,
};
use crate::world::zone::Zone;

fn parse_error(path: &Path, e: serde_json::Error) -> WorldError {
    WorldError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("Failed to parse {}: {}", path.display(), e),
    ))
}

/// Load rooms from `rooms.json`.
pub fn load_rooms_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Room>, WorldError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<RoomSeed> = serde_json::from_str(&contents).map_err(|e| parse_error(path, e))?;
    Ok(seeds
        .into_iter()
        .map(|seed| {
            Room::new(
                seed.id,
                seed.zone,
                &seed.name,
                &seed.description,
                seed.flags,
                seed.exits,
            )
        })
        .collect())
}

/// Load zones and their reset scripts from `zones.json`.
pub fn load_zones_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Zone>, WorldError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<ZoneSeed> = serde_json::from_str(&contents).map_err(|e| parse_error(path, e))?;
    Ok(seeds
        .into_iter()
        .map(|seed| {
            Zone::new(
                seed.id,
                &seed.name,
                seed.bottom,
                seed.top,
                seed.lifespan,
                seed.commands,
            )
        })
        .collect())
}

/// Load mobile prototypes from `mobiles.json`.
pub fn load_mobiles_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<MobProto>, WorldError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| parse_error(path, e))
}

/// Load object prototypes from `objects.json`.
pub fn load_objects_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<ObjProto>, WorldError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| parse_error(path, e))
}

/// Load shops from `shops.json`.
pub fn load_shops_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Shop>, WorldError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| parse_error(path, e))
}

/// Load every static category from `dir`. Any one failing aborts world
/// construction.
pub fn load_world<P: AsRef<Path>>(dir: P) -> Result<WorldContent, WorldError> {
    let dir = dir.as_ref();
    Ok(WorldContent {
        rooms: load_rooms_from_json(dir.join("rooms.json"))?,
        zones: load_zones_from_json(dir.join("zones.json"))?,
        mob_protos: load_mobiles_from_json(dir.join("mobiles.json"))?,
        obj_protos: load_objects_from_json(dir.join("objects.json"))?,
        shops: load_shops_from_json(dir.join("shops.json"))?,
    })
}

// ============================================================================
// Seed data structures that match the JSON format
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct RoomSeed {
    id: RoomId,
    zone: ZoneId,
    name: String,
    description: String,
    #[serde(default)]
    flags: Vec<RoomFlag>,
    #[serde(default)]
    exits: HashMap<Direction, ExitDef>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ZoneSeed {
    id: ZoneId,
    name: String,
    bottom: RoomId,
    top: RoomId,
    lifespan: u32,
    #[serde(default)]
    commands: Vec<ResetCommand>,
}
