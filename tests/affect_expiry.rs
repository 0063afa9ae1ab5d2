//! Affect expiry idempotence: a duration-d affect survives exactly d
//! affect pulses, and totals always recompute to base + equipment +
//! remaining affects regardless of application order.

mod common;

use pulsemud::pulse::pulse_affect_update;
use pulsemud::world::types::{
    Affect, AffectFlag, AffectKind, ApplyLocation, ObjApply, ObjKind, ObjectInstance, RoomId,
    WearSlot,
};
use std::sync::Arc;

#[test]
fn affect_decrements_exactly_its_duration() {
    let world = common::town_world();
    let alice = common::player("alice");
    world.add_character(&alice, Some(RoomId(3001)));

    alice.apply_affect(Affect::new(AffectKind::Armor, 4, -20, ApplyLocation::Armor));
    let base_armor = alice.read().base_stats.armor;

    for pulse in 1..=3 {
        pulse_affect_update(&world);
        assert_eq!(
            alice.read().affects.len(),
            1,
            "affect should survive pulse {}",
            pulse
        );
        assert_eq!(alice.read().stats.armor, base_armor - 20);
    }

    pulse_affect_update(&world);
    let state = alice.read();
    assert!(state.affects.is_empty(), "affect expires on pulse 4");
    assert_eq!(state.stats.armor, base_armor);
}

#[test]
fn totals_equal_base_plus_equipment_plus_remaining_affects() {
    let world = common::town_world();
    let alice = common::player("alice");
    world.add_character(&alice, Some(RoomId(3001)));

    // A worn ring granting +2 hitroll.
    let mut ring = common::obj_proto(4000, ObjKind::Armor, 30, true);
    ring.wear_slots = vec![WearSlot::Held];
    ring.applies = vec![ObjApply {
        location: ApplyLocation::Hitroll,
        modifier: 2,
    }];
    let ring = Arc::new(ring);
    {
        let mut state = alice.write();
        state
            .equipment
            .insert(WearSlot::Held, ObjectInstance::from_proto(&ring));
        state.recompute_totals();
    }

    // Two affects with different durations on the same location.
    alice.apply_affect(Affect::new(AffectKind::Bless, 1, 3, ApplyLocation::Hitroll));
    alice.apply_affect(
        Affect::new(AffectKind::Sanctuary, 2, 1, ApplyLocation::Hitroll)
            .with_flag(AffectFlag::Sanctuary),
    );

    let base = alice.read().base_stats.hitroll;
    assert_eq!(alice.read().stats.hitroll, base + 2 + 3 + 1);

    // Bless expires first; the total must reflect equipment + sanctuary.
    pulse_affect_update(&world);
    {
        let state = alice.read();
        assert_eq!(state.affects.len(), 1);
        assert_eq!(state.stats.hitroll, base + 2 + 1);
        assert!(state.has_affect_flag(AffectFlag::Sanctuary));
    }

    // Sanctuary expires; only the equipment apply remains.
    pulse_affect_update(&world);
    let state = alice.read();
    assert!(state.affects.is_empty());
    assert_eq!(state.stats.hitroll, base + 2);
    assert!(!state.has_affect_flag(AffectFlag::Sanctuary));
}
