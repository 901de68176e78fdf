//! Snapshot building for state replication

use std::collections::BTreeMap;

use crate::game::session::Avatar;
use crate::game::AvatarId;
use crate::net::protocol::{AvatarSnapshot, ServerMsg};

/// Builds snapshots for network transmission
///
/// Simulation runs faster than replication; the builder counts ticks and
/// fires every `snapshot_interval` of them.
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force a snapshot on the next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message
    ///
    /// Avatars come out in ascending id order, matching the deterministic
    /// simulation order.
    pub fn build(&self, tick: u64, avatars: &BTreeMap<AvatarId, Avatar>) -> ServerMsg {
        ServerMsg::Snapshot {
            tick,
            avatars: avatars.values().map(AvatarSnapshot::of).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::movement::KinematicState;
    use crate::game::roles::Role;
    use crate::game::world::Vec3;
    use uuid::Uuid;

    fn avatar(id: u32) -> Avatar {
        Avatar {
            id: AvatarId(id),
            connection_id: Uuid::new_v4(),
            role: Role::Hunter,
            body: KinematicState::at(Vec3::new(id as f32, 0.0, 0.0), 0.0),
        }
    }

    #[test]
    fn cadence_fires_every_interval() {
        let mut builder = SnapshotBuilder::new(3);

        assert!(!builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());
    }

    #[test]
    fn force_next_overrides_cadence() {
        let mut builder = SnapshotBuilder::new(10);
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn snapshot_lists_avatars_in_ascending_id_order() {
        let builder = SnapshotBuilder::new(1);
        let mut avatars = BTreeMap::new();
        for id in [3, 1, 2] {
            avatars.insert(AvatarId(id), avatar(id));
        }

        let ServerMsg::Snapshot { tick, avatars } = builder.build(42, &avatars) else {
            panic!("expected snapshot");
        };

        assert_eq!(tick, 42);
        let ids: Vec<u32> = avatars.iter().map(|a| a.avatar_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
