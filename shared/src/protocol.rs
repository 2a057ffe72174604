//! Message kinds exchanged over a client connection
//!
//! Every frame is a JSON object `{"type": <kind>, "data": <payload>}`.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Messages the server sends to a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    // Full snapshot sent once, right after the connection opens.
    Start { state: Snapshot },
    Join(JoinNotice),
    Leave(LeaveNotice),
    // Reply to a snapshot request, also broadcast after a velocity change.
    State { state: Snapshot },
    Time(TimeSync),
    // Join refused; only the requester receives it.
    Rejected { name: String, reason: String },
}

/// Messages a client sends to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    Join { name: String },
    Leave { name: String },
    // Request for a full snapshot.
    State,
    Move { vx: f64, vy: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinNotice {
    pub name: String,
    pub time_stamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isme: Option<bool>,
}

impl JoinNotice {
    pub fn is_me(&self) -> bool {
        self.isme.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveNotice {
    pub name: String,
    pub time_stamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSync {
    /// Server wall clock when the message was sent
    pub time_stamp: u64,
    /// Timestamp of the authoritative world state
    pub last_update: u64,
    pub update_count: u64,
    pub observer_count: usize,
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl ClientMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityId};
    use crate::snapshot::save;
    use crate::world::WorldState;
    use serde_json::{json, Value};

    #[test]
    fn test_join_notice_shape() {
        let message = ServerMessage::Join(JoinNotice {
            name: "alice".to_string(),
            time_stamp: 1_000,
            isme: Some(true),
        });
        let value: Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "join", "data": {"name": "alice", "timeStamp": 1000, "isme": true}})
        );
    }

    #[test]
    fn test_join_without_isme_omits_field() {
        let message = ServerMessage::Join(JoinNotice {
            name: "bob".to_string(),
            time_stamp: 5,
            isme: None,
        });
        let value: Value = serde_json::to_value(&message).unwrap();
        assert!(value["data"].get("isme").is_none());

        let text = r#"{"type":"join","data":{"name":"bob","timeStamp":5}}"#;
        let parsed = ServerMessage::from_json(text).unwrap();
        match parsed {
            ServerMessage::Join(notice) => assert!(!notice.is_me()),
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_time_shape() {
        let message = ServerMessage::Time(TimeSync {
            time_stamp: 10,
            last_update: 9,
            update_count: 3,
            observer_count: 2,
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "time", "data": {
                "timeStamp": 10, "lastUpdate": 9, "updateCount": 3, "observerCount": 2
            }})
        );
    }

    #[test]
    fn test_start_carries_snapshot() {
        let mut state = WorldState::new(77);
        state
            .objects
            .insert(EntityId(1), Entity::player(EntityId(1), "alice", 200.0, 200.0));
        let message = ServerMessage::Start { state: save(&state) };

        let text = message.to_json().unwrap();
        assert_eq!(ServerMessage::from_json(&text).unwrap(), message);

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["data"]["state"]["objects"]["1"]["name"], "alice");
    }

    #[test]
    fn test_client_messages_parse() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"join","data":{"name":"alice"}}"#).unwrap(),
            ClientMessage::Join {
                name: "alice".to_string()
            }
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"state"}"#).unwrap(),
            ClientMessage::State
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"move","data":{"vx":1.5,"vy":-2}}"#).unwrap(),
            ClientMessage::Move { vx: 1.5, vy: -2.0 }
        );
        assert!(ClientMessage::from_json(r#"{"type":"teleport","data":{}}"#).is_err());
    }

    #[test]
    fn test_state_request_round_trip() {
        let text = ClientMessage::State.to_json().unwrap();
        assert_eq!(ClientMessage::from_json(&text).unwrap(), ClientMessage::State);
    }
}
