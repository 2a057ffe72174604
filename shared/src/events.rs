//! Named-callback registry used by the world to announce lifecycle changes
//!
//! The world never talks to the network. It fires [`WorldEvent`]s through an
//! [`EventChannel`], and whoever owns the world (the server loop, a client
//! session) registers one handler per [`EventKind`] at construction time.
//! Firing a kind that has no handler is a programming error and surfaces as
//! [`EventError::Unregistered`].

use crate::entity::EntityId;
use crate::error::EventError;
use log::error;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Joined,
    Left,
    Died,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Joined, EventKind::Left, EventKind::Died];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Joined => "joined",
            EventKind::Left => "left",
            EventKind::Died => "died",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Joined { id: EntityId, name: String },
    Left { id: EntityId, name: String },
    Died { id: EntityId, name: String },
}

impl WorldEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorldEvent::Joined { .. } => EventKind::Joined,
            WorldEvent::Left { .. } => EventKind::Left,
            WorldEvent::Died { .. } => EventKind::Died,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            WorldEvent::Joined { name, .. }
            | WorldEvent::Left { name, .. }
            | WorldEvent::Died { name, .. } => name,
        }
    }
}

pub type EventHandler = Box<dyn FnMut(&WorldEvent) + Send + Sync>;

/// One handler slot per event kind; registering again replaces the old one
#[derive(Default)]
pub struct EventChannel {
    handlers: HashMap<EventKind, EventHandler>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&WorldEvent) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn emit(&mut self, event: &WorldEvent) -> Result<(), EventError> {
        let kind = event.kind();
        match self.handlers.get_mut(&kind) {
            Some(handler) => {
                handler(event);
                Ok(())
            }
            None => {
                error!("Event '{}' fired with no registered handler", kind);
                Err(EventError::Unregistered(kind))
            }
        }
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("registered", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
