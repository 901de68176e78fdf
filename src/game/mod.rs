//! Game simulation modules

pub mod movement;
pub mod ownership;
pub mod roles;
pub mod session;
pub mod snapshot;
pub mod world;

pub use roles::{Departure, Role, RoleAssignor};
pub use session::{Session, SessionAuthority, SessionHandle};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable avatar identifier, unique per session, never reused
///
/// Ids are handed out sequentially, so iterating avatars in ascending id
/// order is the deterministic simulation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AvatarId(pub u32);

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "avatar-{}", self.0)
    }
}

/// One tick's worth of input for a single avatar
///
/// `jump` is an edge flag produced once by the input source when the key
/// goes down, never a level re-derived by polling. Samples are ephemeral:
/// the newest sample supersedes older unconsumed ones and nothing is queued.
#[derive(Debug, Clone, Default)]
pub struct InputSample {
    /// Monotonic per-connection sequence number, guards against reordering
    pub seq: u32,
    /// Sideways move axis in [-1, 1]
    pub move_x: f32,
    /// Forward move axis in [-1, 1]
    pub move_y: f32,
    /// Sprint held this sample
    pub sprint: bool,
    /// Jump requested (edge)
    pub jump: bool,
    /// Facing yaw in radians, rotation about the vertical axis
    pub yaw: f32,
}

/// Control-plane events, processed between ticks and never mid-tick
#[derive(Debug, Clone)]
pub enum ControlEvent {
    Connected(Uuid),
    Disconnected(Uuid),
}
