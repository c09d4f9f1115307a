//! Bridge wire protocol.
//!
//! The bridge is a game-side process (the part that speaks the game's own
//! protocol and runs path planning) listening on a TCP control socket. Both
//! directions carry one JSON object per line.
//!
//! ```text
//! -> {"id":3,"op":"equip","slot":36}
//! <- {"id":3,"ok":true,"result":null}
//! <- {"id":4,"ok":false,"error":{"kind":"rejected","message":"slot 36 is empty"}}
//! <- {"event":"chat","sender":"Steve","message":"!hello"}
//! ```

use minebrain_core::{AuthMode, BlockPos, ContainerId, EntityFilter, EntityId, Face, GameError};
use serde::{Deserialize, Serialize};

/// A request from the agent to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Login {
        host: String,
        port: u16,
        username: String,
        auth: AuthMode,
    },
    Status,
    Inventory,
    Players,
    NearestEntity { filter: EntityFilter },
    Entity { id: EntityId },
    BlockAt { position: BlockPos },
    FindBlock { name: String, max_distance: f64 },
    RaycastBlock { max_distance: f64 },
    Equip { slot: u16 },
    PlaceBlock { reference: BlockPos, face: Face },
    Dig { position: BlockPos },
    Attack { entity: EntityId },
    SetGoal { goal: BlockPos },
    Look { yaw: f32, pitch: f32 },
    OpenContainer { position: BlockPos },
    Deposit { container: ContainerId, slot: u16, count: u32 },
    CloseContainer { container: ContainerId },
    Chat { text: String },
}

impl Request {
    /// Operation name, for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Request::Login { .. } => "login",
            Request::Status => "status",
            Request::Inventory => "inventory",
            Request::Players => "players",
            Request::NearestEntity { .. } => "nearest_entity",
            Request::Entity { .. } => "entity",
            Request::BlockAt { .. } => "block_at",
            Request::FindBlock { .. } => "find_block",
            Request::RaycastBlock { .. } => "raycast_block",
            Request::Equip { .. } => "equip",
            Request::PlaceBlock { .. } => "place_block",
            Request::Dig { .. } => "dig",
            Request::Attack { .. } => "attack",
            Request::SetGoal { .. } => "set_goal",
            Request::Look { .. } => "look",
            Request::OpenContainer { .. } => "open_container",
            Request::Deposit { .. } => "deposit",
            Request::CloseContainer { .. } => "close_container",
            Request::Chat { .. } => "chat",
        }
    }
}

/// A request tagged with its correlation id.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub request: &'a Request,
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireError {
    pub kind: String,
    pub message: String,
}

impl From<WireError> for GameError {
    fn from(err: WireError) -> Self {
        match err.kind.as_str() {
            "not_found" => GameError::NotFound(err.message),
            "disconnected" => GameError::Disconnected(err.message),
            _ => GameError::Rejected(err.message),
        }
    }
}

/// Reply to one request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<WireError>,
}

impl Response {
    pub fn into_result(self) -> Result<serde_json::Value, GameError> {
        if self.ok {
            return Ok(self.result);
        }
        Err(self
            .error
            .map(GameError::from)
            .unwrap_or_else(|| GameError::Protocol(format!("request {} failed without an error", self.id))))
    }
}

/// Unsolicited notification from the bridge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Chat { sender: String, message: String },
    Disconnected { reason: String },
}

/// Any line the bridge can send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Response(Response),
    Event(Event),
}

/// Serialize a request as one protocol line, newline included.
pub fn encode(id: u64, request: &Request) -> Result<String, GameError> {
    let mut line = serde_json::to_string(&Envelope { id, request })
        .map_err(|e| GameError::Protocol(format!("encode {}: {e}", request.op())))?;
    line.push('\n');
    Ok(line)
}

pub fn decode(line: &str) -> Result<Incoming, GameError> {
    serde_json::from_str(line.trim()).map_err(|e| GameError::Protocol(format!("invalid line: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_flattens_op_and_id() {
        let line = encode(7, &Request::Equip { slot: 36 }).unwrap();
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7, "op": "equip", "slot": 36}));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn unit_request_has_only_op() {
        let line = encode(1, &Request::Status).unwrap();
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "op": "status"}));
    }

    #[test]
    fn place_block_carries_face_name() {
        let line = encode(2, &Request::PlaceBlock {
            reference: BlockPos::new(1, 63, 0),
            face: Face::Up,
        })
        .unwrap();
        assert!(line.contains(r#""face":"up""#));
        assert!(line.contains(r#""reference":{"x":1,"y":63,"z":0}"#));
    }

    #[test]
    fn decodes_success_and_failure() {
        let ok = decode(r#"{"id":3,"ok":true,"result":{"x":1}}"#).unwrap();
        match ok {
            Incoming::Response(resp) => assert_eq!(resp.into_result().unwrap()["x"], 1),
            other => panic!("Expected response, got {other:?}"),
        }

        let failed = decode(r#"{"id":4,"ok":false,"error":{"kind":"not_found","message":"chest"}}"#).unwrap();
        match failed {
            Incoming::Response(resp) => {
                assert_eq!(resp.into_result().unwrap_err(), GameError::NotFound("chest".into()))
            }
            other => panic!("Expected response, got {other:?}"),
        }
    }

    #[test]
    fn decodes_chat_event() {
        let event = decode(r#"{"event":"chat","sender":"Steve","message":"!hi"}"#).unwrap();
        assert_eq!(
            event,
            Incoming::Event(Event::Chat {
                sender: "Steve".into(),
                message: "!hi".into()
            })
        );
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        assert!(matches!(decode("{not json"), Err(GameError::Protocol(_))));
        assert!(matches!(decode(r#"{"hello":1}"#), Err(GameError::Protocol(_))));
    }
}
