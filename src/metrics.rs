//! Minimal metrics scaffolding for the simulation core.
//! Counters are cheap atomics sampled by the `status` command and by tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static VIOLENCE_ROUNDS: AtomicU64 = AtomicU64::new(0);
static DEATHS: AtomicU64 = AtomicU64::new(0);
static MOVES: AtomicU64 = AtomicU64::new(0);
static ZONE_RESETS: AtomicU64 = AtomicU64::new(0);
static RESPAWNS_SCHEDULED: AtomicU64 = AtomicU64::new(0);
static RESPAWNS_SPAWNED: AtomicU64 = AtomicU64::new(0);
static RESPAWNS_DROPPED: AtomicU64 = AtomicU64::new(0);

static ZONE_COUNTERS: OnceLock<Mutex<HashMap<u32, ZoneCounter>>> = OnceLock::new();

pub fn inc_violence_rounds() {
    VIOLENCE_ROUNDS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_deaths() {
    DEATHS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_moves() {
    MOVES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_zone_resets() {
    ZONE_RESETS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_respawns_scheduled() {
    RESPAWNS_SCHEDULED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_respawns_spawned() {
    RESPAWNS_SPAWNED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_respawns_dropped() {
    RESPAWNS_DROPPED.fetch_add(1, Ordering::Relaxed);
}

/// Per-zone reset activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZoneCounter {
    pub resets: u64,
    pub mobiles_loaded: u64,
    pub objects_loaded: u64,
}

fn zone_counter_lock() -> &'static Mutex<HashMap<u32, ZoneCounter>> {
    ZONE_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_zone_reset(zone: u32) -> ZoneCounter {
    let mut guard = zone_counter_lock()
        .lock()
        .expect("zone counter mutex poisoned");
    let counter = guard.entry(zone).or_default();
    counter.resets = counter.resets.saturating_add(1);
    *counter
}

pub fn record_zone_mob_loaded(zone: u32) -> ZoneCounter {
    let mut guard = zone_counter_lock()
        .lock()
        .expect("zone counter mutex poisoned");
    let counter = guard.entry(zone).or_default();
    counter.mobiles_loaded = counter.mobiles_loaded.saturating_add(1);
    *counter
}

pub fn record_zone_obj_loaded(zone: u32) -> ZoneCounter {
    let mut guard = zone_counter_lock()
        .lock()
        .expect("zone counter mutex poisoned");
    let counter = guard.entry(zone).or_default();
    counter.objects_loaded = counter.objects_loaded.saturating_add(1);
    *counter
}

pub fn zone_counters_snapshot() -> HashMap<u32, ZoneCounter> {
    zone_counter_lock()
        .lock()
        .expect("zone counter mutex poisoned")
        .clone()
}

#[cfg(test)]
pub(crate) fn reset_zone_counters_for_tests() {
    if let Some(lock) = ZONE_COUNTERS.get() {
        let mut guard = lock.lock().expect("zone counter mutex poisoned");
        guard.clear();
    }
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub violence_rounds: u64,
    pub deaths: u64,
    pub moves: u64,
    pub zone_resets: u64,
    pub respawns_scheduled: u64,
    pub respawns_spawned: u64,
    pub respawns_dropped: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        violence_rounds: VIOLENCE_ROUNDS.load(Ordering::Relaxed),
        deaths: DEATHS.load(Ordering::Relaxed),
        moves: MOVES.load(Ordering::Relaxed),
        zone_resets: ZONE_RESETS.load(Ordering::Relaxed),
        respawns_scheduled: RESPAWNS_SCHEDULED.load(Ordering::Relaxed),
        respawns_spawned: RESPAWNS_SPAWNED.load(Ordering::Relaxed),
        respawns_dropped: RESPAWNS_DROPPED.load(Ordering::Relaxed),
    }
}
