//! Conversion between the wire protocol and engine types.

use crate::error::ProtocolError;
use crate::registry::Snapshot;
use arena_shared::protocol::{AgentWire, BulletWire, ClientMsg, PlayerWire, StateMsg};
use arena_shared::vec2::Vec2;

pub use arena_shared::protocol::{InitMsg, RoomEvent, ServerMsg};

/// Inbound frames above this size are dropped unparsed.
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// Validated player input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Raw intended velocity, not normalized
    Move { velocity: Vec2 },
    Shoot { direction: Vec2 },
}

/// Decode one inbound text frame.
pub fn decode_input(text: &str) -> Result<InputEvent, ProtocolError> {
    if text.len() > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::TooLarge(text.len()));
    }
    match serde_json::from_str::<ClientMsg>(text)? {
        ClientMsg::Move {
            velocity_x,
            velocity_y,
        } => {
            let velocity = Vec2::new(velocity_x, velocity_y);
            if !velocity.is_finite() {
                return Err(ProtocolError::NonFinite("move"));
            }
            Ok(InputEvent::Move { velocity })
        }
        ClientMsg::Shoot { dir_x, dir_y } => {
            let direction = Vec2::new(dir_x, dir_y);
            if !direction.is_finite() {
                return Err(ProtocolError::NonFinite("shoot"));
            }
            Ok(InputEvent::Shoot { direction })
        }
    }
}

/// Round to 2 decimal places (plenty for screen positions)
#[inline]
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Minimal per-tick state: positions and health only.
pub fn state_msg(snapshot: &Snapshot) -> StateMsg {
    StateMsg {
        players: snapshot
            .players
            .iter()
            .map(|p| {
                (
                    p.id.clone(),
                    PlayerWire {
                        x: round2(p.pos.x),
                        y: round2(p.pos.y),
                        health: p.health,
                    },
                )
            })
            .collect(),
        bullets: snapshot
            .bullets
            .iter()
            .map(|b| {
                (
                    b.id.to_string(),
                    BulletWire {
                        x: round2(b.pos.x),
                        y: round2(b.pos.y),
                    },
                )
            })
            .collect(),
        enemies: snapshot
            .agents
            .iter()
            .map(|a| {
                (
                    a.id.to_string(),
                    AgentWire {
                        x: round2(a.pos.x),
                        y: round2(a.pos.y),
                        health: a.health,
                    },
                )
            })
            .collect(),
    }
}
