use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

// === Server -> Client ===

/// Tagged messages. The per-tick snapshot is untagged (see [`StateMsg`]).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "init")]
    Init(InitMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InitMsg {
    pub id: String,
}

/// Full arena snapshot, sent once per tick. Keys are entity ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StateMsg {
    pub players: BTreeMap<String, PlayerWire>,
    pub bullets: BTreeMap<String, BulletWire>,
    pub enemies: BTreeMap<String, AgentWire>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerWire {
    pub x: f64,
    pub y: f64,
    pub health: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulletWire {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgentWire {
    pub x: f64,
    pub y: f64,
    pub health: i32,
}

/// Room-scoped notification (join/leave and anything the room layer emits).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub room_id: String,
    pub payload: serde_json::Value,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "action")]
pub enum ClientMsg {
    #[serde(rename = "move", rename_all = "camelCase")]
    Move { velocity_x: f64, velocity_y: f64 },
    #[serde(rename = "shoot", rename_all = "camelCase")]
    Shoot { dir_x: f64, dir_y: f64 },
}
