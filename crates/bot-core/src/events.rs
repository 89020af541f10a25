// events.rs
//
// Closed set of inbound events surfaced by the transport layer and
// outbound packets handed back to it, plus the small value types shared
// by the movement and packet-assembly code.

use serde::{Deserialize, Serialize};

use crate::player::auth_input::AuthInputPacket;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

/// Orientation in degrees, normalized to (-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub head_yaw: f64,
}

/// Session baseline delivered by `start_game`. `rotation` carries
/// (pitch, yaw) the way the wire does; head yaw starts equal to yaw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGamePacket {
    pub seed: i64,
    pub runtime_entity_id: u64,
    pub player_position: Vec3,
    pub rotation: Vec2,
    pub current_tick: u64,
}

/// Classification tag on an inbound text packet. Only `Chat` is routed
/// through the LLM; everything else passes through the queue untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    Chat,
    Whisper,
    Announcement,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPacket {
    pub kind: TextKind,
    pub source_name: String,
    /// Sender identity (XUID) used for the privileged allow-list.
    pub xuid: String,
    pub message: String,
}

/// Position report for some entity in the world. When `runtime_id`
/// matches our own avatar this is an authoritative correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePlayerPacket {
    pub runtime_id: u64,
    pub position: Vec3,
    pub pitch: f64,
    pub yaw: f64,
    pub head_yaw: f64,
    pub tick: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundEvent {
    Connect,
    Spawn,
    StartGame(StartGamePacket),
    Text(TextPacket),
    MovePlayer(MovePlayerPacket),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OutboundPacket {
    Text {
        message: String,
        source_name: String,
    },
    AuthInput(AuthInputPacket),
    LoadingScreen {
        screen_type: u32,
    },
    Interact {
        action_id: String,
        target_entity_id: u64,
        position: Vec3,
    },
    LocalPlayerInitialized {
        runtime_entity_id: u64,
    },
}
