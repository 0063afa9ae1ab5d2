//! World model and concurrency core: entity graph, registry, placement
//! protocol, and the zone/respawn lifecycle.
//!
//! Lock hierarchy, outermost first: the registry lock, then room locks in
//! ascending room-id order, then one character lock at a time. Every
//! mutation path in the crate follows it.

pub mod character;
pub mod errors;
pub mod placement;
pub mod registry;
pub mod room;
pub mod seed_loader;
pub mod types;
pub mod zone;

pub use character::{CharState, Character, RoomRef};
pub use errors::WorldError;
pub use placement::move_character;
pub use registry::{World, WorldContent, WorldSettings};
pub use room::{Room, RoomState};
pub use seed_loader::load_world;
pub use zone::{pulse_zones, reset_zone, schedule_mob_respawn, Zone};
pub use types::*;
