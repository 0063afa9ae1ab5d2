//! # Pulsemud - A Pulse-Driven Multi-User Dungeon World Engine
//!
//! Pulsemud is the simulation core of a multi-user real-time game: a
//! persistent, shared, mutable world of rooms, characters, and objects that
//! many concurrent actors read and mutate while a fixed-cadence scheduler
//! independently advances combat, regeneration, timed effects, NPC
//! behavior, and world-content respawn.
//!
//! ## Features
//!
//! - **Per-Entity Locking**: Rooms and characters each own a lock over
//!   their mutable collections; a single ascending-room-id rule keeps
//!   two-room movement deadlock-free.
//! - **Placement Protocol**: One set of entry points for entering,
//!   moving within, and leaving the world, shared by player commands and
//!   NPC AI alike.
//! - **Pulse Scheduler**: Five independent pulses (violence, points,
//!   affects, mobile activity, zone/respawn) driven serially from one
//!   Tokio loop, each following snapshot-then-process.
//! - **Zone Resets**: Data-driven reset scripts with capped, double-checked
//!   load commands, plus a time-ordered NPC respawn queue.
//! - **Persistence**: Sled-backed player storage and JSON seed files for
//!   static world content.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulsemud::config::Config;
//! use pulsemud::pulse::PulseDriver;
//! use pulsemud::world::{load_world, World};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let content = load_world("data/world")?;
//!     let world = World::new(content, config.world.settings());
//!     PulseDriver::new(world, config.pulse.clone()).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - Entity graph, registry, placement protocol, zones
//! - [`pulse`] - The scheduler and its five pulse handlers
//! - [`storage`] - Player persistence layer
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Player-name validation
//! - [`metrics`] - Simulation counters for status reporting and tests

pub mod config;
pub mod logutil;
pub mod metrics;
pub mod pulse;
pub mod storage;
pub mod validation;
pub mod world;
