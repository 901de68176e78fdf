//! Role assignment for the session's fixed role pool
//!
//! One Runner, up to `hunter_capacity` Hunters, assigned in connection
//! order. The assignor is a plain struct owned by the session authority and
//! handed around by reference; connect/disconnect handling is serialized by
//! the session, which is what makes assignment a total function of arrival
//! order and occupancy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Game-rules identity assigned to a connection for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No slot available, connection is a spectator at best
    None,
    /// The chased player, exactly one per session
    Runner,
    /// A chasing player, up to the configured capacity
    Hunter,
}

/// Signal raised by a disconnect that the game-rules layer must act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The Runner left; the round cannot continue
    RunnerLeft,
}

/// Assigns roles at connect time and reacts to disconnects
pub struct RoleAssignor {
    assignments: HashMap<Uuid, Role>,
    runner_assigned: bool,
    hunter_capacity: usize,
}

impl RoleAssignor {
    pub fn new(hunter_capacity: usize) -> Self {
        Self {
            assignments: HashMap::new(),
            runner_assigned: false,
            hunter_capacity,
        }
    }

    /// Assign a role to a newly connected client
    ///
    /// Returns `Role::None` when every slot is taken. The session-capacity
    /// gate at the connection-accept layer should refuse such connections
    /// before they reach this point; this branch is a defensive backstop.
    pub fn on_connect(&mut self, connection_id: Uuid) -> Role {
        if let Some(existing) = self.assignments.get(&connection_id) {
            warn!(
                connection_id = %connection_id,
                role = ?existing,
                "Connection already has a role"
            );
            return *existing;
        }

        let role = if !self.runner_assigned {
            self.runner_assigned = true;
            Role::Runner
        } else if self.hunter_count() < self.hunter_capacity {
            Role::Hunter
        } else {
            Role::None
        };

        self.assignments.insert(connection_id, role);
        info!(connection_id = %connection_id, role = ?role, "Assigned role");
        role
    }

    /// Remove a connection's role binding
    ///
    /// A departing Runner yields [`Departure::RunnerLeft`] exactly once so
    /// the game-rules layer can end the round; Hunter and spectator
    /// departures yield nothing.
    pub fn on_disconnect(&mut self, connection_id: Uuid) -> Option<Departure> {
        let role = self.assignments.remove(&connection_id)?;
        info!(connection_id = %connection_id, role = ?role, "Released role");

        if role == Role::Runner {
            self.runner_assigned = false;
            return Some(Departure::RunnerLeft);
        }
        None
    }

    /// Role currently bound to a connection, if any
    pub fn role_of(&self, connection_id: Uuid) -> Option<Role> {
        self.assignments.get(&connection_id).copied()
    }

    pub fn hunter_count(&self) -> usize {
        self.assignments
            .values()
            .filter(|role| **role == Role::Hunter)
            .count()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
