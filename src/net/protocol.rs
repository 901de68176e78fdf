//! Wire message definitions
//!
//! These are the serde types the transport layer moves; the crate does not
//! own a socket. Any transport that can carry JSON (or any other serde
//! format) can drive a session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::movement::GroundedState;
use crate::game::roles::Role;
use crate::game::session::Avatar;
use crate::game::{AvatarId, InputSample};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Player input for the current tick
    Input {
        /// Sequence number, newest wins under reordering
        seq: u32,
        /// Sideways move axis in [-1, 1]
        move_x: f32,
        /// Forward move axis in [-1, 1]
        move_y: f32,
        /// Sprint held
        sprint: bool,
        /// Jump requested this sample (edge, produced once per key-down)
        jump: bool,
        /// Facing yaw in radians
        yaw: f32,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp, echoed back verbatim
        t: u64,
    },

    /// Leave the session
    Leave,
}

impl ClientMsg {
    /// Extract the input sample carried by an `Input` message
    pub fn into_sample(self) -> Option<InputSample> {
        match self {
            ClientMsg::Input {
                seq,
                move_x,
                move_y,
                sprint,
                jump,
                yaw,
            } => Some(InputSample {
                seq,
                move_x,
                move_y,
                sprint,
                jump,
                yaw,
            }),
            _ => None,
        }
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Messages sent from server to client and to the game-rules layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Role assignment result for a fresh connection
    Welcome {
        connection_id: Uuid,
        role: Role,
        /// Avatar bound to the connection, absent for spectators
        avatar_id: Option<AvatarId>,
    },

    /// An avatar entered the session
    AvatarSpawned {
        avatar_id: AvatarId,
        connection_id: Uuid,
        role: Role,
        x: f32,
        y: f32,
        z: f32,
        yaw: f32,
    },

    /// An avatar left the session
    AvatarRemoved { avatar_id: AvatarId, reason: String },

    /// The Runner disconnected; the round must end
    RunnerLeft { connection_id: Uuid },

    /// Authoritative state snapshot (sent at the snapshot cadence)
    Snapshot {
        /// Server tick number
        tick: u64,
        /// All avatar states, ascending avatar id
        avatars: Vec<AvatarSnapshot>,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong { t: u64 },
}

impl ServerMsg {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Avatar state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarSnapshot {
    pub avatar_id: AvatarId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Facing yaw in radians
    pub yaw: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub vel_z: f32,
    pub grounded: bool,
}

impl AvatarSnapshot {
    /// Flatten one authoritative avatar into its wire form
    pub fn of(avatar: &Avatar) -> Self {
        Self {
            avatar_id: avatar.id,
            x: avatar.body.position.x,
            y: avatar.body.position.y,
            z: avatar.body.position.z,
            yaw: avatar.body.yaw,
            vel_x: avatar.body.velocity.x,
            vel_y: avatar.body.velocity.y,
            vel_z: avatar.body.velocity.z,
            grounded: avatar.body.grounded == GroundedState::Grounded,
        }
    }
}
