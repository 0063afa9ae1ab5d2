use thiserror::Error;

use crate::world::types::{MobProtoId, ObjProtoId, RoomId, ZoneId};

/// Errors that can arise while loading, querying, or mutating the world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (seed files, data directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around seed file JSON errors.
    #[error("seed data error: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A room id did not resolve in the registry.
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),

    /// A zone id did not resolve in the registry.
    #[error("zone {0} does not exist")]
    ZoneNotFound(ZoneId),

    /// A mobile prototype id did not resolve in the registry.
    #[error("mobile prototype {0} does not exist")]
    MobProtoNotFound(MobProtoId),

    /// An object prototype id did not resolve in the registry.
    #[error("object prototype {0} does not exist")]
    ObjProtoNotFound(ObjProtoId),

    /// Returned when deserializing a player record with an unexpected schema
    /// version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Another process already holds the data directory.
    #[error("data directory is locked by another instance: {0}")]
    DataDirLocked(String),

    /// Domain-rule error surfaced to the one caller that triggered it, never
    /// logged as a warning and never fatal.
    #[error("no valid target: {0}")]
    NoValidTarget(String),

    /// Two characters must share a room for the attempted action.
    #[error("{0} is not here")]
    NotInSameRoom(String),
}
