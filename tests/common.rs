//! Shared helpers for integration tests: small worlds, prototypes, and
//! characters built the way the seed loaders would build them.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use pulsemud::world::character::Character;
use pulsemud::world::registry::{World, WorldContent, WorldSettings};
use pulsemud::world::room::Room;
use pulsemud::world::types::{
    ClassKind, Dice, Direction, ExitDef, MobFlag, MobProto, MobProtoId, ObjKind, ObjProto,
    ObjProtoId, Position, ResetCommand, RoomFlag, RoomId, SpecialKind, Stats, ZoneId,
};
use pulsemud::world::zone::Zone;

pub fn room(id: u32, zone: u32, exits: HashMap<Direction, ExitDef>) -> Room {
    Room::new(
        RoomId(id),
        ZoneId(zone),
        &format!("Room {}", id),
        "A plain room for testing.",
        Vec::new(),
        exits,
    )
}

pub fn flagged_room(id: u32, zone: u32, flags: Vec<RoomFlag>) -> Room {
    Room::new(
        RoomId(id),
        ZoneId(zone),
        &format!("Room {}", id),
        "A plain room for testing.",
        flags,
        HashMap::new(),
    )
}

/// A row of rooms connected east/west: id, id+1, ..., id+count-1.
pub fn room_row(first: u32, count: u32, zone: u32) -> Vec<Room> {
    (first..first + count)
        .map(|id| {
            let mut exits = HashMap::new();
            if id > first {
                exits.insert(
                    Direction::West,
                    ExitDef {
                        to: RoomId(id - 1),
                        door: None,
                    },
                );
            }
            if id + 1 < first + count {
                exits.insert(
                    Direction::East,
                    ExitDef {
                        to: RoomId(id + 1),
                        door: None,
                    },
                );
            }
            room(id, zone, exits)
        })
        .collect()
}

pub fn mob_proto(
    id: u32,
    max_hit: i32,
    flags: Vec<MobFlag>,
    special: Option<SpecialKind>,
) -> MobProto {
    MobProto {
        id: MobProtoId(id),
        keywords: format!("mob{}", id),
        short_desc: format!("test mob {}", id),
        long_desc: format!("Test mob {} is here.", id),
        level: 5,
        class: ClassKind::Warrior,
        max_hit,
        max_mana: 0,
        max_move: 50,
        damage: Dice {
            count: 1,
            size: 4,
            bonus: 0,
        },
        stats: Stats::default(),
        alignment: 0,
        gold: 0,
        flags,
        special,
        default_position: Position::Standing,
    }
}

pub fn obj_proto(id: u32, kind: ObjKind, cost: i64, takeable: bool) -> ObjProto {
    ObjProto {
        id: ObjProtoId(id),
        keywords: format!("object{}", id),
        short_desc: format!("test object {}", id),
        kind,
        weight: 1,
        cost,
        wear_slots: Vec::new(),
        damage: None,
        applies: Vec::new(),
        takeable,
    }
}

/// Assemble a world from parts with explicit placement settings.
pub fn build_world(
    rooms: Vec<Room>,
    zones: Vec<Zone>,
    mob_protos: Vec<MobProto>,
    obj_protos: Vec<ObjProto>,
    settings: WorldSettings,
) -> Arc<World> {
    World::new(
        WorldContent {
            rooms,
            zones,
            mob_protos,
            obj_protos,
            shops: Vec::new(),
        },
        settings,
    )
}

/// A five-room town in zone 30 (rooms 3001..=3005) plus a void room (1),
/// with a rat prototype registered.
pub fn town_world() -> Arc<World> {
    let mut rooms = room_row(3001, 5, 30);
    rooms.push(flagged_room(1, 0, vec![RoomFlag::NoMob, RoomFlag::Peaceful]));
    build_world(
        rooms,
        vec![Zone::new(
            ZoneId(30),
            "The Town",
            RoomId(3000),
            RoomId(3099),
            3,
            Vec::new(),
        )],
        vec![mob_proto(3062, 8, vec![MobFlag::Sentinel], None)],
        Vec::new(),
        WorldSettings {
            start_room: RoomId(3001),
            void_room: RoomId(1),
        },
    )
}

/// A zone reset script that loads one capped mob and one capped object.
pub fn reset_commands(mobile: u32, object: u32, room: u32) -> Vec<ResetCommand> {
    vec![
        ResetCommand::LoadMobile {
            mobile: MobProtoId(mobile),
            room: RoomId(room),
            max: 1,
        },
        ResetCommand::LoadObject {
            object: ObjProtoId(object),
            room: RoomId(room),
            max: 1,
        },
    ]
}

pub fn player(name: &str) -> Arc<Character> {
    Character::new_player(name, name, ClassKind::Warrior)
}
