//! Per-connection input mailboxes
//!
//! The authority never queues input: each connection has one mailbox slot
//! holding the newest sample, and the tick loop takes it at tick start.
//! Publishing is lock-free from the simulation's point of view (the slot
//! mutex is held for an assignment, never across a tick), stale sequence
//! numbers lose, and jump edges are captured stickily so an edge survives
//! being overwritten by a later jump-less sample before the tick consumes
//! the slot.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;
use uuid::Uuid;

use crate::game::InputSample;
use crate::util::time::SimClock;

/// Everything the tick loop learns from one connection's mailbox per tick
#[derive(Debug, Default)]
pub struct TakenInput {
    /// Newest sample since the previous take, if any arrived
    pub sample: Option<InputSample>,
    /// Simulation time the most recent jump edge was received at
    pub jump_requested_at: Option<f64>,
}

#[derive(Debug, Default)]
struct MailboxSlot {
    latest: Option<InputSample>,
    /// Newest sequence ever seen; survives takes so reordered stragglers
    /// stay dead after the slot empties
    last_seq: Option<u32>,
    jump_requested_at: Option<f64>,
}

/// The bank of per-connection input mailboxes
///
/// Registration follows the connection lifecycle: the session registers a
/// mailbox when it processes a connect and removes it on every disconnect
/// path. A frame for an unregistered connection is a consistency error per
/// the error model and is discarded silently.
pub struct InputBank {
    slots: DashMap<Uuid, Mutex<MailboxSlot>>,
    clock: Arc<SimClock>,
}

impl InputBank {
    pub fn new(clock: Arc<SimClock>) -> Self {
        Self {
            slots: DashMap::new(),
            clock,
        }
    }

    /// Open a mailbox for a connection
    pub fn register(&self, connection_id: Uuid) {
        self.slots
            .insert(connection_id, Mutex::new(MailboxSlot::default()));
    }

    /// Close a connection's mailbox, revoking its input authority
    ///
    /// Any frame still in flight (or reordered by the network) arrives at a
    /// missing slot afterwards and is dropped.
    pub fn deregister(&self, connection_id: Uuid) {
        self.slots.remove(&connection_id);
    }

    /// Publish the newest frame for a connection
    ///
    /// Returns false when the frame was discarded: unknown connection, or a
    /// sequence number at or below the newest already seen.
    pub fn publish(&self, connection_id: Uuid, sample: InputSample) -> bool {
        let Some(slot) = self.slots.get(&connection_id) else {
            trace!(connection_id = %connection_id, "Dropping input for unbound connection");
            return false;
        };

        let mut slot = slot.lock();
        if let Some(newest) = slot.last_seq {
            if sample.seq <= newest {
                trace!(
                    connection_id = %connection_id,
                    seq = sample.seq,
                    newest,
                    "Dropping stale input"
                );
                return false;
            }
        }

        if sample.jump {
            slot.jump_requested_at = Some(self.clock.now());
        }
        slot.last_seq = Some(sample.seq);
        slot.latest = Some(sample);
        true
    }

    /// Take the newest sample and any pending jump edge, emptying the slot
    pub fn take(&self, connection_id: Uuid) -> TakenInput {
        let Some(slot) = self.slots.get(&connection_id) else {
            return TakenInput::default();
        };

        let mut slot = slot.lock();
        TakenInput {
            sample: slot.latest.take(),
            jump_requested_at: slot.jump_requested_at.take(),
        }
    }

    /// Drop every mailbox; used at session teardown
    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
