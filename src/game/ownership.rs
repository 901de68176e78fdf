//! Ownership gating - who controls, presents and simulates which avatar
//!
//! Every process evaluates the same rule table for every (connection,
//! avatar) pair it knows about:
//!
//! | Target                      | Local owner | Authority (non-owner) | Remote observer |
//! |-----------------------------|-------------|-----------------------|-----------------|
//! | Camera / presentation       | active      | off                   | off             |
//! | Local input capture         | active      | off                   | off             |
//! | Movement simulation         | if authority| active                | off             |
//!
//! On a dedicated authority no connection is local, so clients present and
//! capture input for their own avatar but never simulate; on a combined
//! host-and-authority process the host's own avatar simulates locally
//! because owner and authority coincide.

use super::AvatarId;

/// A component whose activity the gate may flip
///
/// Concrete local-control pieces (camera rig, input reader, local mover)
/// implement this; the gate depends only on the capability, never on the
/// concrete type.
pub trait Controllable {
    fn set_active(&mut self, active: bool);
}

/// Boundary seam for the platform cursor
///
/// Cursor capture follows local-control activation: captured while the
/// process drives an avatar, free otherwise.
pub trait CursorHost {
    fn set_captured(&mut self, captured: bool);
}

/// Activation booleans for one (connection, avatar) pair on one process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipDecision {
    /// Camera and presentation for the avatar
    pub presentation: bool,
    /// Local device input capture for the avatar
    pub input_capture: bool,
    /// Movement simulation for the avatar
    pub simulation: bool,
}

/// Applies the ownership rule table
pub struct OwnershipGate;

impl OwnershipGate {
    /// Evaluate the rule table for one avatar as seen from one process
    ///
    /// `is_local_owner`: the evaluating process hosts the connection that
    /// owns the avatar. `is_authority`: the evaluating process is the
    /// simulation authority.
    pub fn decide(is_local_owner: bool, is_authority: bool) -> OwnershipDecision {
        OwnershipDecision {
            presentation: is_local_owner,
            input_capture: is_local_owner,
            simulation: is_authority,
        }
    }

    /// Push a decision into the local-control components for one avatar
    pub fn apply(
        decision: OwnershipDecision,
        presentation: &mut dyn Controllable,
        input_capture: &mut dyn Controllable,
        local_mover: &mut dyn Controllable,
        cursor: &mut dyn CursorHost,
    ) {
        presentation.set_active(decision.presentation);
        input_capture.set_active(decision.input_capture);
        local_mover.set_active(decision.simulation);
        cursor.set_captured(decision.input_capture);
    }

    /// Does the authority accept this connection's input for this avatar?
    ///
    /// `owned` is the avatar bound to the submitting connection; input is
    /// accepted only for that one avatar. A connection with no binding
    /// (spectator, or already disconnected) drives nothing.
    pub fn accepts_input(owned: Option<AvatarId>, target: AvatarId) -> bool {
        owned == Some(target)
    }
}
