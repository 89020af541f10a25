// auth_input.rs
//
// Assembles the client-authoritative `player_auth_input` state update:
// advances the predicted position, derives facing from this tick's
// displacement, and encodes the pressed-input bitset.

use bitflags::bitflags;
use serde::Serialize;

use crate::events::{Rotation, Vec2, Vec3};

/// Below this a displacement counts as stationary and orientation holds.
const EPSILON: f64 = 1e-6;

bitflags! {
    /// Bedrock 1.21 `player_auth_input` input-flag mapping. Forward
    /// motion rides the `ASCEND` bit, matching the vanilla client
    /// encoding.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct InputFlags: u64 {
        const ASCEND = 0x01;
        const DESCEND = 0x02;
        const NORTH_JUMP = 0x04;
        const JUMP_DOWN = 0x08;
        const SPRINT_DOWN = 0x10;
        const CHANGE_HEIGHT = 0x20;
        const JUMPING = 0x40;
        const AUTO_JUMPING = 0x80;
        const SNEAKING = 0x100;
        const SNEAK_DOWN = 0x200;
        const CRAWLING = 0x400;
        const CRAWL_DOWN = 0x800;
        const SPRINTING = 0x1000;
        const ASCEND_SCAFFOLD = 0x2000;
        const DESCEND_SCAFFOLD = 0x4000;
        const SNEAK_TOGGLE_DOWN = 0x8000;
        const PERSIST_SNEAK = 0x1_0000;
        const START_SPRINTING = 0x2_0000;
        const STOP_SPRINTING = 0x4_0000;
        const START_SNEAKING = 0x8_0000;
        const STOP_SNEAKING = 0x10_0000;
        const START_SWIMMING = 0x20_0000;
        const STOP_SWIMMING = 0x40_0000;
        const START_JUMPING = 0x80_0000;
        const START_GLIDING = 0x100_0000;
        const STOP_GLIDING = 0x200_0000;
        const INTERACT = 0x400_0000;
        const ITEM_INTERACT = 0x800_0000;
        const BLOCK_ACTION = 0x1000_0000;
        const ITEM_STACK_REQUEST = 0x2000_0000;
        const CLIENT_PREDICTED_VEHICLE = 0x4000_0000;
    }
}

/// Maps pressed inputs to the wire bitset.
pub fn input_bits(forward: bool, jump: bool, sprint: bool, sneak: bool) -> InputFlags {
    let mut bits = InputFlags::empty();
    if forward {
        bits |= InputFlags::ASCEND;
    }
    if jump {
        bits |= InputFlags::JUMPING;
    }
    if sprint {
        bits |= InputFlags::SPRINTING;
    }
    if sneak {
        bits |= InputFlags::SNEAKING;
    }
    bits
}

/// Normalizes an angle in degrees into (-180, 180].
pub fn normalize_angle_deg(angle: f64) -> f64 {
    let wrapped = ((angle + 180.0) % 360.0 + 360.0) % 360.0 - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Outbound `player_auth_input` payload. The local stick vector is
/// duplicated into `move_vector`, `analogue_move_vector`, and
/// `raw_move_vector`; the wire expects all three.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthInputPacket {
    pub position: Vec3,
    pub pitch: f64,
    pub yaw: f64,
    pub head_yaw: f64,
    pub move_vector: Vec2,
    pub input_data: u64,
    /// 0 = mouse/keyboard.
    pub input_mode: u32,
    /// 0 = normal play.
    pub play_mode: u32,
    pub interaction_model: u32,
    pub interact_rotation: Vec2,
    pub tick: u64,
    /// Raw world-space displacement the client reports for this tick.
    pub delta: Vec3,
    pub analogue_move_vector: Vec2,
    /// Placeholder until camera tracking is modeled.
    pub camera_orientation: Vec3,
    pub raw_move_vector: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedState {
    pub position: Vec3,
    pub rotation: Rotation,
}

/// Given the current predicted state and a world-space displacement for
/// this tick, returns the next state and the `player_auth_input` packet
/// announcing it.
///
/// Facing rules: the bot faces where it moves horizontally (yaw 0 =
/// -Z); pitch follows the displacement slope, upward motion giving
/// negative pitch. A stationary tick holds the previous orientation.
pub fn build_auth_input(
    current_pos: Vec3,
    current_rot: Rotation,
    move_vector: Vec3,
    tick: u64,
    sprint: bool,
    sneak: bool,
) -> (PredictedState, AuthInputPacket) {
    let new_pos = Vec3 {
        x: current_pos.x + move_vector.x,
        y: current_pos.y + move_vector.y,
        z: current_pos.z + move_vector.z,
    };

    let horiz_len = move_vector.x.hypot(move_vector.z);
    let moving = horiz_len > EPSILON;

    let yaw = if moving {
        normalize_angle_deg((-move_vector.x).atan2(move_vector.z).to_degrees())
    } else {
        current_rot.yaw
    };
    let pitch = if moving || move_vector.y.abs() > EPSILON {
        normalize_angle_deg(-move_vector.y.atan2(horiz_len).to_degrees())
    } else {
        current_rot.pitch
    };
    let new_rot = Rotation {
        pitch,
        yaw,
        head_yaw: yaw,
    };

    // local stick vector: strafe = x, forward = y
    let stick = Vec2 {
        x: 0.0,
        y: horiz_len.min(1.0),
    };

    let packet = AuthInputPacket {
        position: new_pos,
        pitch: new_rot.pitch,
        yaw: new_rot.yaw,
        head_yaw: new_rot.head_yaw,
        move_vector: stick,
        input_data: input_bits(moving, false, sprint, sneak).bits(),
        input_mode: 0,
        play_mode: 0,
        interaction_model: 0,
        interact_rotation: Vec2 {
            x: new_rot.pitch,
            y: new_rot.yaw,
        },
        tick,
        delta: move_vector,
        analogue_move_vector: stick,
        camera_orientation: Vec3::default(),
        raw_move_vector: stick,
    };

    (
        PredictedState {
            position: new_pos,
            rotation: new_rot,
        },
        packet,
    )
}
