//! Character entity: players and NPCs alike. Each character owns one lock
//! over all of its mutable state; every stat, affect, inventory, or
//! fight-link mutation goes through that lock, including the ones made from
//! pulse handlers.
//!
//! Lock discipline: a character lock is a leaf. Hold at most one at a time,
//! and never acquire a room or registry lock while holding it. Code that
//! needs data from two characters copies out of the first lock before
//! taking the second.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::Utc;

use crate::world::room::Room;
use crate::world::types::{
    Affect, AffectFlag, ApplyLocation, ClassKind, Conditions, MobProto, ObjectInstance,
    PlayerRecord, Position, RoomId, Stats, WearSlot, PLAYER_SCHEMA_VERSION,
};

/// Process-wide serial for NPC registry keys.
static MOB_SERIAL: AtomicU64 = AtomicU64::new(1);

/// The character's room back-reference: the `Weak` pointer and the cached
/// room id are one field so they can never be observed out of step.
#[derive(Clone)]
pub struct RoomRef {
    pub room: Weak<Room>,
    pub id: RoomId,
}

impl RoomRef {
    pub fn new(room: &Arc<Room>) -> Self {
        Self {
            room: Arc::downgrade(room),
            id: room.id(),
        }
    }
}

pub struct Character {
    /// Registry key: players use their lowercase name, NPCs a generated
    /// `<proto-id>#<serial>` key, so the live map stays total.
    key: String,
    name: String,
    is_npc: bool,
    proto: Option<Arc<MobProto>>,
    state: RwLock<CharState>,
}

/// Everything mutable about a character, guarded by the character's lock.
pub struct CharState {
    pub room: Option<RoomRef>,
    pub position: Position,
    pub hit: i32,
    pub mana: i32,
    pub moves: i32,
    /// Current derived maxima and stats (base + equipment + affects).
    pub max_hit: i32,
    pub max_mana: i32,
    pub max_moves: i32,
    pub stats: Stats,
    /// Baselines the derived values are recomputed from.
    pub base_max_hit: i32,
    pub base_max_mana: i32,
    pub base_max_moves: i32,
    pub base_stats: Stats,
    pub level: u8,
    pub class: ClassKind,
    pub alignment: i32,
    pub gold: i64,
    pub conditions: Conditions,
    pub affects: Vec<Affect>,
    /// Union of flags from equipment and active affects, refreshed by
    /// `recompute_totals`.
    pub affect_flags: Vec<AffectFlag>,
    pub equipment: HashMap<WearSlot, ObjectInstance>,
    pub inventory: Vec<ObjectInstance>,
    /// Registry key of the opponent, when fighting.
    pub fighting: Option<String>,
}

impl Character {
    pub fn new_player(username: &str, display_name: &str, class: ClassKind) -> Arc<Self> {
        let record = PlayerRecord::new(username, display_name, class);
        Self::from_player_record(&record)
    }

    /// Rebuild a live character from a persisted player record.
    pub fn from_player_record(record: &PlayerRecord) -> Arc<Self> {
        let mut state = CharState {
            room: None,
            position: Position::Standing,
            hit: record.hit,
            mana: record.mana,
            moves: record.moves,
            max_hit: record.max_hit,
            max_mana: record.max_mana,
            max_moves: record.max_moves,
            stats: record.stats,
            base_max_hit: record.max_hit,
            base_max_mana: record.max_mana,
            base_max_moves: record.max_moves,
            base_stats: record.stats,
            level: record.level,
            class: record.class,
            alignment: record.alignment,
            gold: record.gold,
            conditions: record.conditions,
            affects: record.affects.clone(),
            affect_flags: Vec::new(),
            equipment: HashMap::new(),
            inventory: Vec::new(),
            fighting: None,
        };
        state.recompute_totals();
        Arc::new(Self {
            key: record.username.to_ascii_lowercase(),
            name: record.display_name.clone(),
            is_npc: false,
            proto: None,
            state: RwLock::new(state),
        })
    }

    /// Instantiate a fresh NPC from its prototype. Used by zone-reset load
    /// commands and by respawn processing.
    pub fn from_proto(proto: &Arc<MobProto>) -> Arc<Self> {
        let serial = MOB_SERIAL.fetch_add(1, Ordering::Relaxed);
        let state = CharState {
            room: None,
            position: proto.default_position,
            hit: proto.max_hit,
            mana: proto.max_mana,
            moves: proto.max_move,
            max_hit: proto.max_hit,
            max_mana: proto.max_mana,
            max_moves: proto.max_move,
            stats: proto.stats,
            base_max_hit: proto.max_hit,
            base_max_mana: proto.max_mana,
            base_max_moves: proto.max_move,
            base_stats: proto.stats,
            level: proto.level,
            class: proto.class,
            alignment: proto.alignment,
            gold: proto.gold,
            conditions: Conditions::default(),
            affects: Vec::new(),
            affect_flags: Vec::new(),
            equipment: HashMap::new(),
            inventory: Vec::new(),
            fighting: None,
        };
        Arc::new(Self {
            key: format!("{}#{}", proto.id.0, serial),
            name: proto.short_desc.clone(),
            is_npc: true,
            proto: Some(Arc::clone(proto)),
            state: RwLock::new(state),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_npc(&self) -> bool {
        self.is_npc
    }

    pub fn proto(&self) -> Option<&Arc<MobProto>> {
        if self.is_npc {
            self.proto.as_ref()
        } else {
            None
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, CharState> {
        self.state.read().expect("character lock poisoned")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, CharState> {
        self.state.write().expect("character lock poisoned")
    }

    /// Current room id, copied out under a brief read lock.
    pub fn room_id(&self) -> Option<RoomId> {
        self.read().room.as_ref().map(|r| r.id)
    }

    /// Upgrade the room back-reference, copied out under a brief read lock.
    pub fn room(&self) -> Option<Arc<Room>> {
        self.read().room.as_ref().and_then(|r| r.room.upgrade())
    }

    /// Apply a new timed affect and refresh totals.
    pub fn apply_affect(&self, affect: Affect) {
        let mut state = self.write();
        state.affects.push(affect);
        state.recompute_totals();
    }

    /// Snapshot this character back into a persistable player record.
    /// Returns `None` for NPCs, which are never persisted.
    pub fn to_player_record(&self) -> Option<PlayerRecord> {
        if self.is_npc {
            return None;
        }
        let state = self.read();
        Some(PlayerRecord {
            username: self.key.clone(),
            display_name: self.name.clone(),
            room_id: state.room.as_ref().map(|r| r.id),
            level: state.level,
            class: state.class,
            hit: state.hit,
            max_hit: state.base_max_hit,
            mana: state.mana,
            max_mana: state.base_max_mana,
            moves: state.moves,
            max_moves: state.base_max_moves,
            stats: state.base_stats,
            alignment: state.alignment,
            gold: state.gold,
            conditions: state.conditions,
            affects: state.affects.clone(),
            created_at: Utc::now(),
            last_seen: Utc::now(),
            schema_version: PLAYER_SCHEMA_VERSION,
        })
    }
}

impl CharState {
    /// Recompute every derived value from scratch: start at the baselines,
    /// fold in equipment applies, then fold in active affects. This is the
    /// only sanctioned way to change totals; incremental add/subtract is
    /// forbidden because it drifts under double-application bugs.
    pub fn recompute_totals(&mut self) {
        self.stats = self.base_stats;
        self.max_hit = self.base_max_hit;
        self.max_mana = self.base_max_mana;
        self.max_moves = self.base_max_moves;
        self.affect_flags.clear();

        let equipment_applies: Vec<(ApplyLocation, i32)> = self
            .equipment
            .values()
            .filter_map(|obj| obj.proto.as_ref())
            .flat_map(|p| p.applies.iter().map(|a| (a.location, a.modifier)))
            .collect();
        for (location, modifier) in equipment_applies {
            self.apply_modifier(location, modifier);
        }

        let affect_applies: Vec<(ApplyLocation, i32, Vec<AffectFlag>)> = self
            .affects
            .iter()
            .map(|a| (a.location, a.modifier, a.flags.clone()))
            .collect();
        for (location, modifier, flags) in affect_applies {
            self.apply_modifier(location, modifier);
            for flag in flags {
                if !self.affect_flags.contains(&flag) {
                    self.affect_flags.push(flag);
                }
            }
        }

        self.hit = self.hit.min(self.max_hit);
        self.mana = self.mana.min(self.max_mana);
        self.moves = self.moves.min(self.max_moves);
    }

    fn apply_modifier(&mut self, location: ApplyLocation, modifier: i32) {
        match location {
            ApplyLocation::None => {}
            ApplyLocation::Strength => self.stats.strength += modifier as i16,
            ApplyLocation::Dexterity => self.stats.dexterity += modifier as i16,
            ApplyLocation::Constitution => self.stats.constitution += modifier as i16,
            ApplyLocation::Hitroll => self.stats.hitroll += modifier as i16,
            ApplyLocation::Damroll => self.stats.damroll += modifier as i16,
            ApplyLocation::Armor => self.stats.armor += modifier as i16,
            ApplyLocation::MaxHit => self.max_hit += modifier,
            ApplyLocation::MaxMana => self.max_mana += modifier,
            ApplyLocation::MaxMove => self.max_moves += modifier,
        }
    }

    pub fn has_affect_flag(&self, flag: AffectFlag) -> bool {
        self.affect_flags.contains(&flag)
    }

    /// Map hit points onto a posture, after damage or decay.
    pub fn update_position(&mut self) {
        self.position = if self.hit > 0 {
            match self.position {
                // Healthy characters keep their current posture; a fight
                // link keeps them fighting.
                Position::Dead
                | Position::MortallyWounded
                | Position::Incapacitated
                | Position::Stunned => Position::Standing,
                p => p,
            }
        } else if self.hit <= -11 {
            Position::Dead
        } else if self.hit <= -6 {
            Position::MortallyWounded
        } else if self.hit <= -3 {
            Position::Incapacitated
        } else {
            Position::Stunned
        };
    }

    /// Drain everything carried and worn, for corpse construction.
    pub fn strip_carried(&mut self) -> Vec<ObjectInstance> {
        let mut carried: Vec<ObjectInstance> = self.inventory.drain(..).collect();
        carried.extend(self.equipment.drain().map(|(_, obj)| obj));
        carried
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::{AffectKind, Dice, MobFlag, MobProtoId, ObjApply, ObjKind, ObjProto, ObjProtoId};

    fn helmet_proto() -> Arc<ObjProto> {
        Arc::new(ObjProto {
            id: ObjProtoId(3040),
            keywords: "helmet iron".to_string(),
            short_desc: "an iron helmet".to_string(),
            kind: ObjKind::Armor,
            weight: 5,
            cost: 50,
            wear_slots: vec![WearSlot::Head],
            damage: None,
            applies: vec![ObjApply {
                location: ApplyLocation::Armor,
                modifier: -10,
            }],
            takeable: true,
        })
    }

    #[test]
    fn totals_fold_equipment_and_affects_over_base() {
        let ch = Character::new_player("alice", "Alice", ClassKind::Warrior);
        {
            let mut state = ch.write();
            let helmet = ObjectInstance::from_proto(&helmet_proto());
            state.equipment.insert(WearSlot::Head, helmet);
            state.recompute_totals();
            assert_eq!(state.stats.armor, -10);
        }

        ch.apply_affect(
            Affect::new(AffectKind::Strength, 5, 2, ApplyLocation::Strength)
                .with_flag(AffectFlag::Sanctuary),
        );

        let state = ch.read();
        assert_eq!(state.stats.strength, state.base_stats.strength + 2);
        assert_eq!(state.stats.armor, -10);
        assert!(state.has_affect_flag(AffectFlag::Sanctuary));
    }

    #[test]
    fn recompute_is_order_independent() {
        let ch = Character::new_player("bob", "Bob", ClassKind::Thief);
        ch.apply_affect(Affect::new(AffectKind::Bless, 3, 1, ApplyLocation::Hitroll));
        ch.apply_affect(Affect::new(AffectKind::Armor, 3, -20, ApplyLocation::Armor));

        let (hitroll, armor) = {
            let state = ch.read();
            (state.stats.hitroll, state.stats.armor)
        };

        // Reverse the affect order and recompute; totals must not change.
        {
            let mut state = ch.write();
            state.affects.reverse();
            state.recompute_totals();
            assert_eq!(state.stats.hitroll, hitroll);
            assert_eq!(state.stats.armor, armor);
        }
    }

    #[test]
    fn positions_track_hit_points() {
        let ch = Character::new_player("carol", "Carol", ClassKind::Cleric);
        let mut state = ch.write();

        state.hit = -1;
        state.update_position();
        assert_eq!(state.position, Position::Stunned);

        state.hit = -4;
        state.update_position();
        assert_eq!(state.position, Position::Incapacitated);

        state.hit = -8;
        state.update_position();
        assert_eq!(state.position, Position::MortallyWounded);

        state.hit = -11;
        state.update_position();
        assert_eq!(state.position, Position::Dead);

        state.hit = 5;
        state.update_position();
        assert_eq!(state.position, Position::Standing);
    }

    #[test]
    fn npc_keys_are_unique_per_instance() {
        let proto = Arc::new(MobProto {
            id: MobProtoId(3060),
            keywords: "guard cityguard".to_string(),
            short_desc: "the cityguard".to_string(),
            long_desc: "A cityguard stands here.".to_string(),
            level: 10,
            class: ClassKind::Warrior,
            max_hit: 100,
            max_mana: 0,
            max_move: 100,
            damage: Dice {
                count: 2,
                size: 4,
                bonus: 1,
            },
            stats: Stats::default(),
            alignment: 500,
            gold: 20,
            flags: vec![MobFlag::Sentinel],
            special: None,
            default_position: Position::Standing,
        });
        let a = Character::from_proto(&proto);
        let b = Character::from_proto(&proto);
        assert!(a.is_npc() && b.is_npc());
        assert_ne!(a.key(), b.key());
        assert_eq!(a.name(), "the cityguard");
        assert_eq!(a.proto().map(|p| p.id), Some(MobProtoId(3060)));
    }
}
