//! The placement protocol: moving a character between rooms without
//! deadlock and without a window where it is in neither or both rosters.
//!
//! Two deadlock classes are closed here. Registry-then-room ordering is
//! handled by the registry (`world::registry`); this module handles
//! room-then-room ordering by always acquiring the two room locks in
//! ascending `RoomId` order, regardless of travel direction. Every code
//! path that can hold two room locks at once goes through `move_character`.

use std::sync::Arc;

use log::{debug, warn};

use crate::metrics;
use crate::world::character::{Character, RoomRef};
use crate::world::room::Room;

/// Move a character into `dest`, atomically from an observer's point of
/// view: after return the character is absent from its old roster, present
/// in the new one, and its back-reference names `dest`.
///
/// Moving a character to the room it is already in is a no-op; this also
/// sidesteps self-deadlock on a single room's lock. A character with no
/// current room (entering the world, or a dangling back-reference after
/// its room was dropped) only locks the destination.
pub fn move_character(ch: &Arc<Character>, dest: &Arc<Room>) {
    let current: Option<Arc<Room>> = {
        let state = ch.read();
        state.room.as_ref().and_then(|r| r.room.upgrade())
    };

    match current {
        Some(src) => {
            if src.id() == dest.id() {
                debug!("{} move to {} is a no-op", ch.key(), dest.id());
                return;
            }
            // Ascending-id acquisition, never call-dependent order.
            let (mut src_state, mut dest_state) = if src.id() < dest.id() {
                let s = src.write();
                let d = dest.write();
                (s, d)
            } else {
                let d = dest.write();
                let s = src.write();
                (s, d)
            };
            src_state.remove_character(src.id(), ch.key());
            dest_state.insert_character(dest.id(), ch);
            // Back-reference and cached id change together, while the
            // roster locks are still held, so no observer sees them split.
            ch.write().room = Some(RoomRef::new(dest));
        }
        None => {
            if ch.read().room.is_some() {
                warn!(
                    "{} had a dangling room back-reference; treating as roomless",
                    ch.key()
                );
            }
            let mut dest_state = dest.write();
            dest_state.insert_character(dest.id(), ch);
            ch.write().room = Some(RoomRef::new(dest));
        }
    }

    metrics::inc_moves();
    debug!("{} moved to {}", ch.key(), dest.id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::{ClassKind, RoomId, ZoneId};
    use std::collections::HashMap;

    fn room(id: u32) -> Arc<Room> {
        Arc::new(Room::new(
            RoomId(id),
            ZoneId(1),
            "A Room",
            "A plain room.",
            Vec::new(),
            HashMap::new(),
        ))
    }

    #[test]
    fn move_is_atomic_between_rosters() {
        let a = room(1);
        let b = room(2);
        let ch = Character::new_player("alice", "Alice", ClassKind::Warrior);

        move_character(&ch, &a);
        assert_eq!(a.characters().len(), 1);
        assert_eq!(ch.room_id(), Some(RoomId(1)));

        move_character(&ch, &b);
        assert!(a.characters().is_empty());
        assert_eq!(b.characters().len(), 1);
        assert_eq!(ch.room_id(), Some(RoomId(2)));
    }

    #[test]
    fn move_to_current_room_is_a_noop() {
        let a = room(1);
        let ch = Character::new_player("bob", "Bob", ClassKind::Thief);
        move_character(&ch, &a);
        move_character(&ch, &a);
        assert_eq!(a.characters().len(), 1);
        assert_eq!(ch.room_id(), Some(RoomId(1)));
    }

    #[test]
    fn move_with_descending_ids_still_completes() {
        let high = room(9000);
        let low = room(10);
        let ch = Character::new_player("carol", "Carol", ClassKind::Cleric);
        move_character(&ch, &high);
        move_character(&ch, &low);
        assert!(high.characters().is_empty());
        assert_eq!(low.characters().len(), 1);
        assert_eq!(ch.room_id(), Some(RoomId(10)));
    }
}
