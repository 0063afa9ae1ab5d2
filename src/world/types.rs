//! Core world data model: identifiers, prototypes, timed affects, and the
//! zone reset command script. Entities with interior mutability (rooms,
//! characters, zones) live in their own modules; everything here is plain
//! data loaded from seed files or persisted player records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;

/// Decay timer for corpses, in point-update pulses.
pub const CORPSE_DECAY_PULSES: u32 = 10;

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Immutable room identifier. Doubles as the total order for room lock
    /// acquisition: when two room locks are held at once they are always
    /// taken in ascending `RoomId` order.
    RoomId
);
numeric_id!(
    /// Zone identifier.
    ZoneId
);
numeric_id!(
    /// Mobile (NPC) prototype identifier.
    MobProtoId
);
numeric_id!(
    /// Object prototype identifier.
    ObjProtoId
);
numeric_id!(
    /// Shop identifier.
    ShopId
);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Character posture, ordered from worst to best. Comparisons like
/// `position >= Position::Resting` gate regeneration and AI decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Dead,
    MortallyWounded,
    Incapacitated,
    Stunned,
    Sleeping,
    Resting,
    Sitting,
    Fighting,
    Standing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Mage,
    Cleric,
    Thief,
    Warrior,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MobFlag {
    /// Never wanders out of its room.
    Sentinel,
    /// Picks up valuables left on the floor.
    Scavenger,
    /// Attacks players on sight.
    Aggressive,
    /// Wanders, but never across a zone boundary.
    StayZone,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoomFlag {
    Dark,
    /// Entering kills wandering NPCs; AI never paths here.
    Death,
    /// NPCs never wander in.
    NoMob,
    /// No fighting allowed.
    Peaceful,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AffectFlag {
    Blind,
    Invisible,
    Sanctuary,
    Poison,
    Sleep,
}

/// Which derived stat an affect or equipment apply modifies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApplyLocation {
    None,
    Strength,
    Dexterity,
    Constitution,
    Hitroll,
    Damroll,
    Armor,
    MaxHit,
    MaxMana,
    MaxMove,
}

/// Identifies the spell or skill an affect came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AffectKind {
    Armor,
    Bless,
    Blindness,
    Poison,
    Sleep,
    Strength,
    Sanctuary,
}

/// A timed stat/flag modifier owned by exactly one character.
///
/// The sum of applied affect modifiers plus equipment applies always equals
/// `current stat - base stat`; the invariant is maintained by recomputing
/// totals from scratch rather than tracking increments (see
/// `CharState::recompute_totals`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Affect {
    pub kind: AffectKind,
    /// Remaining duration in affect-update pulses.
    pub hours: i32,
    pub modifier: i32,
    pub location: ApplyLocation,
    #[serde(default)]
    pub flags: Vec<AffectFlag>,
}

impl Affect {
    pub fn new(kind: AffectKind, hours: i32, modifier: i32, location: ApplyLocation) -> Self {
        Self {
            kind,
            hours,
            modifier,
            location,
            flags: Vec::new(),
        }
    }

    pub fn with_flag(mut self, flag: AffectFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }
}

/// Damage dice in the classic `NdS+B` form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dice {
    pub count: u32,
    pub size: u32,
    #[serde(default)]
    pub bonus: i32,
}

impl Dice {
    pub fn roll(&self, rng: &mut impl rand::Rng) -> i32 {
        let mut total = self.bonus;
        for _ in 0..self.count {
            total += rng.gen_range(1..=self.size.max(1)) as i32;
        }
        total
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self {
            count: 1,
            size: 2,
            bonus: 0,
        }
    }
}

/// Baseline ability and combat numbers. Base values come from the player
/// record or the mobile prototype; current values are derived by folding
/// equipment applies and active affects over the base.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Stats {
    pub strength: i16,
    pub dexterity: i16,
    pub constitution: i16,
    pub hitroll: i16,
    pub damroll: i16,
    pub armor: i16,
}

/// Hunger, thirst, and drunkenness, each decremented once per point-update
/// pulse down to zero. NPCs do not track conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conditions {
    pub hunger: i8,
    pub thirst: i8,
    pub drunk: i8,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            hunger: 24,
            thirst: 24,
            drunk: 0,
        }
    }
}

/// Prototype-registered special behavior, dispatched ahead of the generic
/// flag-driven behaviors each AI pulse. A tagged enum instead of stored
/// function pointers so dispatch stays data-only and auditable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpecialKind {
    /// Sweeps the floor: picks up trash and low-value litter.
    Janitor,
    /// Attacks evil-aligned characters on sight.
    Cityguard,
}

/// Immutable mobile prototype. Live NPCs hold an `Arc` back-reference to
/// their prototype; zone resets and respawns instantiate fresh characters
/// from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MobProto {
    pub id: MobProtoId,
    /// Space-separated keywords used for matching (`"guard cityguard"`).
    pub keywords: String,
    /// Display name (`"the cityguard"`).
    pub short_desc: String,
    /// Line shown when the mobile idles in a room.
    pub long_desc: String,
    pub level: u8,
    #[serde(default = "default_mob_class")]
    pub class: ClassKind,
    pub max_hit: i32,
    #[serde(default)]
    pub max_mana: i32,
    #[serde(default = "default_max_move")]
    pub max_move: i32,
    #[serde(default)]
    pub damage: Dice,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub alignment: i32,
    #[serde(default)]
    pub gold: i64,
    #[serde(default)]
    pub flags: Vec<MobFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialKind>,
    #[serde(default = "default_position")]
    pub default_position: Position,
}

fn default_mob_class() -> ClassKind {
    ClassKind::Warrior
}

fn default_max_move() -> i32 {
    50
}

fn default_position() -> Position {
    Position::Standing
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjKind {
    Light,
    Weapon,
    Armor,
    Container,
    Trash,
    Corpse,
    Key,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WearSlot {
    Head,
    Body,
    Arms,
    Hands,
    Legs,
    Feet,
    Shield,
    Wield,
    Held,
}

/// A stat modifier granted while an object is worn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjApply {
    pub location: ApplyLocation,
    pub modifier: i32,
}

/// Immutable object prototype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjProto {
    pub id: ObjProtoId,
    pub keywords: String,
    pub short_desc: String,
    pub kind: ObjKind,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub cost: i64,
    #[serde(default)]
    pub wear_slots: Vec<WearSlot>,
    #[serde(default)]
    pub damage: Option<Dice>,
    #[serde(default)]
    pub applies: Vec<ObjApply>,
    #[serde(default)]
    pub takeable: bool,
}

/// A live object in a room, an inventory, or an equipment slot. Display
/// fields are copied from the prototype at instantiation so dynamically
/// created objects (corpses) need no prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstance {
    pub id: Uuid,
    pub proto: Option<Arc<ObjProto>>,
    pub keywords: String,
    pub short_desc: String,
    pub kind: ObjKind,
    pub cost: i64,
    pub takeable: bool,
    /// Decay countdown in point-update pulses; `None` never decays.
    pub timer: Option<u32>,
    pub contents: Vec<ObjectInstance>,
}

impl ObjectInstance {
    pub fn from_proto(proto: &Arc<ObjProto>) -> Self {
        Self {
            id: Uuid::new_v4(),
            proto: Some(Arc::clone(proto)),
            keywords: proto.keywords.clone(),
            short_desc: proto.short_desc.clone(),
            kind: proto.kind,
            cost: proto.cost,
            takeable: proto.takeable,
            timer: None,
            contents: Vec::new(),
        }
    }

    /// Build a decaying corpse holding everything the character carried.
    pub fn corpse(victim_name: &str, contents: Vec<ObjectInstance>) -> Self {
        Self {
            id: Uuid::new_v4(),
            proto: None,
            keywords: format!("corpse {}", victim_name),
            short_desc: format!("the corpse of {}", victim_name),
            kind: ObjKind::Corpse,
            cost: 0,
            takeable: false,
            timer: Some(CORPSE_DECAY_PULSES),
            contents,
        }
    }

    pub fn proto_id(&self) -> Option<ObjProtoId> {
        self.proto.as_ref().map(|p| p.id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Open,
    Closed,
    Locked,
}

/// Static door data on an exit. Runtime open/closed state lives in the
/// owning room's `RoomState::doors`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoorDef {
    pub keywords: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ObjProtoId>,
    #[serde(default = "default_door_state")]
    pub initial_state: DoorState,
}

fn default_door_state() -> DoorState {
    DoorState::Closed
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitDef {
    pub to: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door: Option<DoorDef>,
}

/// One step of a zone's scripted reset. Load commands are idempotent up to
/// `max` existing copies in the target room; `equip`/`give`/`put` bind to the
/// most recently loaded mobile or object of the same reset run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ResetCommand {
    LoadMobile {
        mobile: MobProtoId,
        room: RoomId,
        #[serde(default = "default_reset_max")]
        max: u32,
    },
    LoadObject {
        object: ObjProtoId,
        room: RoomId,
        #[serde(default = "default_reset_max")]
        max: u32,
    },
    EquipMobile {
        object: ObjProtoId,
        slot: WearSlot,
    },
    GiveToMobile {
        object: ObjProtoId,
    },
    PutInObject {
        object: ObjProtoId,
        container: ObjProtoId,
    },
    SetDoor {
        room: RoomId,
        direction: Direction,
        state: DoorState,
    },
    RemoveObject {
        object: ObjProtoId,
        room: RoomId,
    },
}

fn default_reset_max() -> u32 {
    1
}

/// Shop data attached to a room at load time. Shop commands are handled by
/// an outer command layer; the core only carries the data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shop {
    pub id: ShopId,
    pub room: RoomId,
    pub keeper: MobProtoId,
    #[serde(default)]
    pub selling: Vec<ObjProtoId>,
    #[serde(default = "default_buy_profit")]
    pub buy_profit: f32,
    #[serde(default = "default_sell_profit")]
    pub sell_profit: f32,
}

fn default_buy_profit() -> f32 {
    1.15
}

fn default_sell_profit() -> f32 {
    0.85
}

/// A pending NPC re-instantiation. Created when an NPC dies, consumed
/// exactly once at or after `due_at` by the zone/respawn pulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobRespawn {
    pub mobile: MobProtoId,
    pub room: RoomId,
    pub due_at: DateTime<Utc>,
}

/// Persisted snapshot of a player character, stored in the sled-backed
/// player store between sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub username: String,
    pub display_name: String,
    pub room_id: Option<RoomId>,
    pub level: u8,
    pub class: ClassKind,
    pub hit: i32,
    pub max_hit: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub moves: i32,
    pub max_moves: i32,
    pub stats: Stats,
    pub alignment: i32,
    pub gold: i64,
    pub conditions: Conditions,
    #[serde(default)]
    pub affects: Vec<Affect>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(username: &str, display_name: &str, class: ClassKind) -> Self {
        let now = Utc::now();
        Self {
            username: username.to_string(),
            display_name: display_name.to_string(),
            room_id: None,
            level: 1,
            class,
            hit: 20,
            max_hit: 20,
            mana: 100,
            max_mana: 100,
            moves: 80,
            max_moves: 80,
            stats: Stats::default(),
            alignment: 0,
            gold: 0,
            conditions: Conditions::default(),
            affects: Vec::new(),
            created_at: now,
            last_seen: now,
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    /// Refresh the last-seen timestamp.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ids_order_ascending() {
        let mut ids = vec![RoomId(3100), RoomId(3001), RoomId(3050)];
        ids.sort();
        assert_eq!(ids, vec![RoomId(3001), RoomId(3050), RoomId(3100)]);
    }

    #[test]
    fn dice_roll_stays_in_range() {
        let dice = Dice {
            count: 2,
            size: 6,
            bonus: 3,
        };
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let roll = dice.roll(&mut rng);
            assert!((5..=15).contains(&roll), "2d6+3 rolled {}", roll);
        }
    }

    #[test]
    fn corpse_holds_contents_and_decays() {
        let proto = Arc::new(ObjProto {
            id: ObjProtoId(3020),
            keywords: "sword long".to_string(),
            short_desc: "a long sword".to_string(),
            kind: ObjKind::Weapon,
            weight: 8,
            cost: 100,
            wear_slots: vec![WearSlot::Wield],
            damage: Some(Dice {
                count: 1,
                size: 8,
                bonus: 0,
            }),
            applies: Vec::new(),
            takeable: true,
        });
        let sword = ObjectInstance::from_proto(&proto);
        let corpse = ObjectInstance::corpse("a rat", vec![sword]);
        assert_eq!(corpse.kind, ObjKind::Corpse);
        assert_eq!(corpse.timer, Some(CORPSE_DECAY_PULSES));
        assert_eq!(corpse.contents.len(), 1);
        assert!(corpse.proto_id().is_none());
    }

    #[test]
    fn reset_command_parses_from_json() {
        let json = r#"{"command": "load_mobile", "mobile": 3060, "room": 3001, "max": 2}"#;
        let cmd: ResetCommand = serde_json::from_str(json).expect("parse reset command");
        assert_eq!(
            cmd,
            ResetCommand::LoadMobile {
                mobile: MobProtoId(3060),
                room: RoomId(3001),
                max: 2
            }
        );

        let json = r#"{"command": "set_door", "room": 3010, "direction": "east", "state": "locked"}"#;
        let cmd: ResetCommand = serde_json::from_str(json).expect("parse door command");
        assert_eq!(
            cmd,
            ResetCommand::SetDoor {
                room: RoomId(3010),
                direction: Direction::East,
                state: DoorState::Locked,
            }
        );
    }

    #[test]
    fn player_record_defaults() {
        let record = PlayerRecord::new("alice", "Alice", ClassKind::Cleric);
        assert_eq!(record.schema_version, PLAYER_SCHEMA_VERSION);
        assert_eq!(record.level, 1);
        assert!(record.room_id.is_none());
        assert_eq!(record.conditions, Conditions::default());
    }
}
