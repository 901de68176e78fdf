//! Session state and the authoritative tick loop
//!
//! One [`SessionAuthority`] task owns every avatar in the session and is the
//! only writer of their kinematic state. Control-plane events (connect,
//! disconnect) are queued and drained at a single point between ticks, so
//! role assignment never races the simulation or itself. Input flows around
//! the control queue through the lock-free mailbox bank and is consumed
//! newest-sample-first at tick start.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::game::movement::{
    KinematicState, MovementAuthority, MovementError, MovementTuning,
};
use crate::game::ownership::OwnershipGate;
use crate::game::roles::{Departure, Role, RoleAssignor};
use crate::game::snapshot::SnapshotBuilder;
use crate::game::world::{BodyProbes, ProbeError, Vec3, WorldQuery};
use crate::game::{AvatarId, ControlEvent, InputSample};
use crate::net::channel::{InputBank, TakenInput};
use crate::net::protocol::{ClientMsg, ServerMsg};
use crate::util::time::{snapshot_interval_ticks, tick_delta, tick_duration, SimClock};

/// One controllable character (authoritative)
pub struct Avatar {
    pub id: AvatarId,
    /// The one connection authorized to drive this avatar
    pub connection_id: Uuid,
    pub role: Role,
    pub body: KinematicState,
}

/// One transport connection's standing in the session
pub struct ConnectionState {
    pub connection_id: Uuid,
    pub role: Role,
    /// Avatar this connection controls; `None` for spectators
    pub owned_avatar: Option<AvatarId>,
}

/// Session construction errors, fatal before the loop ever runs
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid movement tuning: {0}")]
    Movement(#[from] MovementError),

    #[error("Invalid probe layout: {0}")]
    Probe(#[from] ProbeError),
}

/// Session state (owned by the authority task)
pub struct SessionState {
    pub id: Uuid,
    pub tick: u64,
    avatars: BTreeMap<AvatarId, Avatar>,
    connections: HashMap<Uuid, ConnectionState>,
    roles: RoleAssignor,
    next_avatar_id: u32,
    rng: ChaCha8Rng,
    spawn_radius: f32,
}

impl SessionState {
    fn new(config: &Config) -> Self {
        Self {
            id: Uuid::new_v4(),
            tick: 0,
            avatars: BTreeMap::new(),
            connections: HashMap::new(),
            roles: RoleAssignor::new(config.hunter_capacity),
            next_avatar_id: 1,
            rng: ChaCha8Rng::seed_from_u64(config.session_seed),
            spawn_radius: config.spawn_radius,
        }
    }

    /// Spawn pose for a new avatar
    ///
    /// The Runner starts at the arena origin; Hunters spawn on a seeded ring
    /// around it, facing inward. Seeding makes placement reproducible per
    /// session seed.
    fn spawn_pose(&mut self, role: Role) -> (Vec3, f32) {
        match role {
            Role::Runner => (Vec3::ZERO, 0.0),
            _ => {
                let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                let x = angle.cos() * self.spawn_radius;
                let z = angle.sin() * self.spawn_radius;
                (Vec3::new(x, 0.0, z), (-x).atan2(-z))
            }
        }
    }

    pub fn connection(&self, connection_id: Uuid) -> Option<&ConnectionState> {
        self.connections.get(&connection_id)
    }

    pub fn avatar(&self, avatar_id: AvatarId) -> Option<&Avatar> {
        self.avatars.get(&avatar_id)
    }

    pub fn avatar_count(&self) -> usize {
        self.avatars.len()
    }
}

/// Builds a session authority and its transport-facing handle
pub struct Session;

impl Session {
    /// Construct the authority for one session over the given world
    ///
    /// Fails fast on any invalid tuning; a constructed authority never
    /// re-validates inside the tick loop.
    pub fn new(
        config: &Config,
        world: Arc<dyn WorldQuery>,
    ) -> Result<(SessionAuthority, SessionHandle), SessionError> {
        config.validate()?;

        let probes = BodyProbes::new(
            config.foot_anchor_offset,
            config.head_anchor_offset,
            config.ground_probe_radius,
            config.ceiling_probe_distance,
        )?;
        let tuning = MovementTuning {
            walk_speed: config.walk_speed,
            sprint_speed: config.sprint_speed,
            jump_impulse: config.jump_impulse,
            head_bonk_impulse: config.head_bonk_impulse,
            fall_gravity_multiplier: config.fall_gravity_multiplier,
            gravity_y: config.gravity_y,
            coyote_time: config.coyote_time,
            jump_buffer_time: config.jump_buffer_time,
        };
        let movement = MovementAuthority::new(tuning, probes)?;

        let clock = Arc::new(SimClock::new());
        let bank = Arc::new(InputBank::new(clock.clone()));
        let (control_tx, control_rx) = mpsc::channel(64);
        let (msg_tx, _) = broadcast::channel(256);

        let state = SessionState::new(config);
        let handle = SessionHandle {
            session_id: state.id,
            control_tx,
            bank: bank.clone(),
            msg_tx: msg_tx.clone(),
        };

        let authority = SessionAuthority {
            state,
            control_rx,
            control_closed: false,
            bank,
            msg_tx,
            movement,
            world,
            clock,
            snapshots: SnapshotBuilder::new(snapshot_interval_ticks(
                config.simulation_tps,
                config.snapshot_tps,
            )),
            tick_duration: tick_duration(config.simulation_tps),
            dt: tick_delta(config.simulation_tps),
        };

        Ok((authority, handle))
    }
}

/// Handle the transport layer uses to feed a running session
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    control_tx: mpsc::Sender<ControlEvent>,
    bank: Arc<InputBank>,
    msg_tx: broadcast::Sender<ServerMsg>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.session_id
    }

    /// Register a connection; the role is assigned between ticks and
    /// announced on the message stream
    pub async fn connect(&self, connection_id: Uuid) -> bool {
        self.control_tx
            .send(ControlEvent::Connected(connection_id))
            .await
            .is_ok()
    }

    /// Unregister a connection
    pub async fn disconnect(&self, connection_id: Uuid) -> bool {
        self.control_tx
            .send(ControlEvent::Disconnected(connection_id))
            .await
            .is_ok()
    }

    /// Publish the newest input sample for a connection
    ///
    /// Bypasses the control queue entirely; returns false when the frame was
    /// discarded (unbound connection or stale sequence).
    pub fn submit_input(&self, connection_id: Uuid, sample: InputSample) -> bool {
        self.bank.publish(connection_id, sample)
    }

    /// Route a decoded client message to the right surface
    pub async fn route(&self, connection_id: Uuid, msg: ClientMsg) {
        match msg {
            ClientMsg::Input { .. } => {
                if let Some(sample) = msg.into_sample() {
                    self.submit_input(connection_id, sample);
                }
            }
            ClientMsg::Ping { t } => {
                let _ = self.msg_tx.send(ServerMsg::Pong { t });
            }
            ClientMsg::Leave => {
                self.disconnect(connection_id).await;
            }
        }
    }

    /// Subscribe to the session's message stream
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.msg_tx.subscribe()
    }
}

/// The authoritative session simulation
pub struct SessionAuthority {
    state: SessionState,
    control_rx: mpsc::Receiver<ControlEvent>,
    control_closed: bool,
    bank: Arc<InputBank>,
    msg_tx: broadcast::Sender<ServerMsg>,
    movement: MovementAuthority,
    world: Arc<dyn WorldQuery>,
    clock: Arc<SimClock>,
    snapshots: SnapshotBuilder,
    tick_duration: Duration,
    dt: f32,
}

impl SessionAuthority {
    /// Run the authoritative tick loop
    ///
    /// Returns when every [`SessionHandle`] has been dropped.
    pub async fn run(mut self) {
        info!(session_id = %self.state.id, "Session authority started");

        let mut ticker = interval(self.tick_duration);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            // Control plane first, at one point between ticks, never mid-tick
            self.drain_control();
            self.step();

            if self.control_closed {
                break;
            }
        }

        info!(session_id = %self.state.id, tick = self.state.tick, "Session authority stopped");
    }

    /// Process all pending connect/disconnect events
    fn drain_control(&mut self) {
        loop {
            match self.control_rx.try_recv() {
                Ok(ControlEvent::Connected(id)) => self.handle_connect(id),
                Ok(ControlEvent::Disconnected(id)) => self.handle_disconnect(id),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.control_closed = true;
                    break;
                }
            }
        }
    }

    /// Bind a role and avatar to a fresh connection
    fn handle_connect(&mut self, connection_id: Uuid) {
        if self.state.connections.contains_key(&connection_id) {
            warn!(connection_id = %connection_id, "Connection already registered");
            return;
        }

        let role = self.state.roles.on_connect(connection_id);
        if role == Role::None {
            // Capacity backstop: the connection-accept layer should have
            // refused this connection already. No avatar, no input authority.
            self.state.connections.insert(
                connection_id,
                ConnectionState {
                    connection_id,
                    role,
                    owned_avatar: None,
                },
            );
            let _ = self.msg_tx.send(ServerMsg::Welcome {
                connection_id,
                role,
                avatar_id: None,
            });
            let _ = self.msg_tx.send(ServerMsg::Error {
                code: "session_full".to_string(),
                message: "No role slot available".to_string(),
            });
            warn!(connection_id = %connection_id, "Session full, no role assigned");
            return;
        }

        let avatar_id = AvatarId(self.state.next_avatar_id);
        self.state.next_avatar_id += 1;

        let (position, yaw) = self.state.spawn_pose(role);
        self.state.avatars.insert(
            avatar_id,
            Avatar {
                id: avatar_id,
                connection_id,
                role,
                body: KinematicState::at(position, yaw),
            },
        );
        self.state.connections.insert(
            connection_id,
            ConnectionState {
                connection_id,
                role,
                owned_avatar: Some(avatar_id),
            },
        );
        self.bank.register(connection_id);

        let _ = self.msg_tx.send(ServerMsg::Welcome {
            connection_id,
            role,
            avatar_id: Some(avatar_id),
        });
        let _ = self.msg_tx.send(ServerMsg::AvatarSpawned {
            avatar_id,
            connection_id,
            role,
            x: position.x,
            y: position.y,
            z: position.z,
            yaw,
        });

        info!(
            session_id = %self.state.id,
            connection_id = %connection_id,
            avatar = %avatar_id,
            role = ?role,
            "Connection joined session"
        );
    }

    /// Unbind a connection, its avatar and its input authority
    fn handle_disconnect(&mut self, connection_id: Uuid) {
        let Some(connection) = self.state.connections.remove(&connection_id) else {
            warn!(connection_id = %connection_id, "Disconnect for unknown connection");
            return;
        };

        // Revoke input authority before anything else; frames reordered by
        // the network now land in a missing mailbox and vanish.
        self.bank.deregister(connection_id);

        if let Some(avatar_id) = connection.owned_avatar {
            if self.state.avatars.remove(&avatar_id).is_some() {
                let _ = self.msg_tx.send(ServerMsg::AvatarRemoved {
                    avatar_id,
                    reason: "disconnected".to_string(),
                });
            }
        }

        if let Some(Departure::RunnerLeft) = self.state.roles.on_disconnect(connection_id) {
            info!(
                session_id = %self.state.id,
                connection_id = %connection_id,
                "Runner left, signalling round end"
            );
            let _ = self.msg_tx.send(ServerMsg::RunnerLeft { connection_id });
        }

        info!(
            session_id = %self.state.id,
            connection_id = %connection_id,
            "Connection left session"
        );
    }

    /// Run a single simulation tick
    fn step(&mut self) {
        self.state.tick += 1;
        let now = self.clock.now();

        // Ascending avatar id: the deterministic simulation order
        for avatar in self.state.avatars.values_mut() {
            // Input is accepted only along the connection-to-avatar binding
            let owned = self
                .state
                .connections
                .get(&avatar.connection_id)
                .and_then(|connection| connection.owned_avatar);
            let taken = if OwnershipGate::accepts_input(owned, avatar.id) {
                self.bank.take(avatar.connection_id)
            } else {
                TakenInput::default()
            };
            if let Some(at) = taken.jump_requested_at {
                avatar.body.note_jump_request(at);
            }
            self.movement.advance(
                &mut avatar.body,
                taken.sample.as_ref(),
                self.world.as_ref(),
                now,
                self.dt,
            );
        }

        if self.snapshots.should_send() {
            let _ = self
                .msg_tx
                .send(self.snapshots.build(self.state.tick, &self.state.avatars));
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }
}

impl Drop for SessionAuthority {
    fn drop(&mut self) {
        // Mailboxes must not outlive the authority on any exit path
        self.bank.clear();
    }
}
