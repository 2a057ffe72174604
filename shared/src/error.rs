use crate::entity::EntityId;
use crate::events::EventKind;
use thiserror::Error;

/// Reasons a join request is refused. Reported to the requester only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("name '{0}' is already taken")]
    DuplicateName(String),
    #[error("world is full ({capacity} players)")]
    ServerFull { capacity: usize },
}

/// A snapshot that cannot be loaded. The target state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("entity {id} has unrecognized type '{tag}'")]
    UnknownType { id: EntityId, tag: String },
    #[error("snapshot key {key} does not match entity id {id}")]
    IdMismatch { key: EntityId, id: EntityId },
    #[error("player entity {id} has no name")]
    MissingName { id: EntityId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("no handler registered for event '{0}'")]
    Unregistered(EventKind),
}
