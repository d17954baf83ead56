//! JSON wire messages exchanged with the arena server.
//!
//! Every message is an object discriminated by its `type` field. Decoding reads
//! the tag first so that an unknown message kind is reported as such instead of
//! being folded into a generic parse failure.

use crate::{MovementIntent, Vector2};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Messages the client sends to the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Movement {
        sequence: u64,
        movement: MovementIntent,
    },
    Fire {
        bullet: FireRequest,
    },
    Reskin,
}

impl ClientMessage {
    pub const TAGS: [&'static str; 3] = ["movement", "fire", "reskin"];

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Malformed)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        decode_tagged(text, &Self::TAGS)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Movement { .. } => "movement",
            ClientMessage::Fire { .. } => "fire",
            ClientMessage::Reskin => "reskin",
        }
    }
}

/// Bullet spawn request; the server fills in the position.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FireRequest {
    pub owner: String,
    pub direction: Vector2,
}

/// Messages the server sends to the client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Identifies which player in subsequent updates belongs to this connection.
    Bootstrap { id: String },
    /// Full authoritative snapshot of the room.
    Update {
        #[serde(default, deserialize_with = "null_as_empty")]
        players: Vec<PlayerState>,
        #[serde(default, deserialize_with = "null_as_empty")]
        bullets: Vec<Bullet>,
    },
    Error { error: String },
}

impl ServerMessage {
    pub const TAGS: [&'static str; 3] = ["bootstrap", "update", "error"];

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Malformed)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        decode_tagged(text, &Self::TAGS)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub id: String,
    pub position: Vector2,
    /// Highest input sequence the server has applied for this player.
    #[serde(rename = "sequence", default)]
    pub last_acked_sequence: u64,
    #[serde(default)]
    pub hue: i32,
    /// Remaining respawn time in nanoseconds; positive while the player is down.
    #[serde(rename = "spawn_time", default)]
    pub spawn_timer: i64,
}

impl PlayerState {
    pub fn new(id: impl Into<String>, position: Vector2) -> Self {
        Self {
            id: id.into(),
            position,
            last_acked_sequence: 0,
            hue: 0,
            spawn_timer: 0,
        }
    }

    pub fn is_respawning(&self) -> bool {
        self.spawn_timer > 0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bullet {
    #[serde(rename = "owner")]
    pub owner_id: String,
    pub position: Vector2,
    pub direction: Vector2,
}

#[derive(Debug)]
pub enum ProtocolError {
    /// The payload is a JSON object without a string `type` field.
    MissingType,
    /// The `type` tag names a message this side does not understand.
    UnknownType(String),
    /// Invalid JSON, or a known tag with a body that does not fit it.
    Malformed(serde_json::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingType => write!(f, "message has no type tag"),
            Self::UnknownType(tag) => write!(f, "unknown message type: {tag:?}"),
            Self::Malformed(e) => write!(f, "malformed message: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

fn decode_tagged<T>(text: &str, known: &[&str]) -> Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
    let tag = match value.get("type").and_then(Value::as_str) {
        Some(tag) => tag.to_owned(),
        None => return Err(ProtocolError::MissingType),
    };
    if !known.contains(&tag.as_str()) {
        return Err(ProtocolError::UnknownType(tag));
    }
    serde_json::from_value(value).map_err(ProtocolError::Malformed)
}

// The server marshals empty slices as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movement_message_shape() {
        let msg = ClientMessage::Movement {
            sequence: 7,
            movement: MovementIntent::UP,
        };
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "movement",
                "sequence": 7,
                "movement": {"up": true, "down": false, "left": false, "right": false}
            })
        );
    }

    #[test]
    fn test_fire_and_reskin_message_shape() {
        let fire = ClientMessage::Fire {
            bullet: FireRequest {
                owner: "abc".to_string(),
                direction: Vector2::new(1.0, 0.0),
            },
        };
        let value: Value = serde_json::from_str(&fire.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "fire", "bullet": {"owner": "abc", "direction": {"x": 1.0, "y": 0.0}}})
        );

        let reskin = ClientMessage::Reskin.encode().unwrap();
        assert_eq!(reskin, r#"{"type":"reskin"}"#);
    }

    #[test]
    fn test_decode_bootstrap() {
        let msg = ServerMessage::decode(r#"{"type":"bootstrap","id":"p-1"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Bootstrap {
                id: "p-1".to_string()
            }
        );
    }

    #[test]
    fn test_decode_update_from_server_json() {
        let text = r#"{
            "type": "update",
            "players": [
                {"id": "a", "hue": 120, "sequence": 4, "position": {"x": 100, "y": 95.5}, "spawn_time": 0},
                {"id": "b", "hue": 7, "sequence": 0, "position": {"x": 1, "y": 2}, "spawn_time": 1000000000}
            ],
            "bullets": null
        }"#;
        match ServerMessage::decode(text).unwrap() {
            ServerMessage::Update { players, bullets } => {
                assert_eq!(players.len(), 2);
                assert_eq!(players[0].last_acked_sequence, 4);
                assert_eq!(players[0].position, Vector2::new(100.0, 95.5));
                assert!(!players[0].is_respawning());
                assert!(players[1].is_respawning());
                assert!(bullets.is_empty());
            }
            other => panic!("Wrong message type after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_decode_update_with_missing_lists() {
        match ServerMessage::decode(r#"{"type":"update"}"#).unwrap() {
            ServerMessage::Update { players, bullets } => {
                assert!(players.is_empty());
                assert!(bullets.is_empty());
            }
            other => panic!("Wrong message type after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_decode_bullet() {
        let text = r#"{"type":"update","players":[],"bullets":[
            {"owner":"a","direction":{"x":0,"y":-1},"position":{"x":50,"y":40}}
        ]}"#;
        match ServerMessage::decode(text).unwrap() {
            ServerMessage::Update { bullets, .. } => {
                assert_eq!(bullets[0].owner_id, "a");
                assert_eq!(bullets[0].direction, Vector2::new(0.0, -1.0));
            }
            other => panic!("Wrong message type after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_message() {
        let msg = ServerMessage::decode(r#"{"type":"error","error":"room is full"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                error: "room is full".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_tag_is_distinct_error() {
        let err = ServerMessage::decode(r#"{"type":"teleport","x":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(ref tag) if tag == "teleport"));
    }

    #[test]
    fn test_missing_tag() {
        let err = ServerMessage::decode(r#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingType));
        let err = ServerMessage::decode(r#"{"type":5}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingType));
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            ServerMessage::decode("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"type":"bootstrap"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_client_message_decode() {
        let msg = ClientMessage::decode(
            r#"{"type":"movement","sequence":3,"movement":{"left":true}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Movement {
                sequence: 3,
                movement: MovementIntent::LEFT
            }
        );
        assert_eq!(msg.kind(), "movement");
        assert!(matches!(
            ClientMessage::decode(r#"{"type":"chat"}"#),
            Err(ProtocolError::UnknownType(_))
        ));
    }
}
