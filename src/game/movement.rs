//! Authoritative avatar movement
//!
//! One [`MovementAuthority::advance`] call moves one avatar forward by one
//! simulation tick. The in-tick order is fixed and load-bearing:
//! ground probe, ceiling probe, horizontal movement, jump, gravity. Running
//! the ceiling check before the jump step keeps a buffered jump from being
//! granted with stale upward velocity that the ceiling already cancelled.

use tracing::debug;

use super::world::{BodyProbes, Vec3, WorldQuery};
use super::InputSample;

/// Sentinel for "no jump request pending"
pub const NO_JUMP_REQUEST: f64 = f64::NEG_INFINITY;

/// Ground contact state, derived fresh from the world every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundedState {
    Grounded,
    Airborne,
}

/// The kinematic state the authority owns for one avatar
#[derive(Debug, Clone)]
pub struct KinematicState {
    /// Feet position in world space
    pub position: Vec3,
    /// Facing, rotation about the vertical axis (radians)
    pub yaw: f32,
    pub velocity: Vec3,
    pub grounded: GroundedState,
    /// Simulation time of the most recent grounded sample
    pub last_grounded_at: f64,
    /// True once a coyote-window jump has been spent since last grounding
    pub coyote_consumed: bool,
    /// Simulation time of the most recent jump request, or [`NO_JUMP_REQUEST`]
    pub last_jump_request_at: f64,
}

impl KinematicState {
    /// A freshly spawned body at `position`, facing `yaw`
    pub fn at(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            velocity: Vec3::ZERO,
            grounded: GroundedState::Airborne,
            last_grounded_at: f64::NEG_INFINITY,
            coyote_consumed: false,
            last_jump_request_at: NO_JUMP_REQUEST,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded == GroundedState::Grounded
    }

    /// Record a jump-request edge captured at `at` on the simulation clock
    ///
    /// Level-triggered capture of an edge event: the request is stamped when
    /// it arrives, not when the tick that consumes it runs.
    pub fn note_jump_request(&mut self, at: f64) {
        if at > self.last_jump_request_at {
            self.last_jump_request_at = at;
        }
    }
}

/// Movement tuning, validated once at construction
#[derive(Debug, Clone, Copy)]
pub struct MovementTuning {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub jump_impulse: f32,
    pub head_bonk_impulse: f32,
    pub fall_gravity_multiplier: f32,
    pub gravity_y: f32,
    pub coyote_time: f64,
    pub jump_buffer_time: f64,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            walk_speed: 8.0,
            sprint_speed: 12.0,
            jump_impulse: 12.0,
            head_bonk_impulse: 12.0,
            fall_gravity_multiplier: 2.5,
            gravity_y: -24.0,
            coyote_time: 0.15,
            jump_buffer_time: 0.15,
        }
    }
}

/// Movement configuration errors, fatal at initialization
#[derive(Debug, thiserror::Error)]
pub enum MovementError {
    #[error("{name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("Fall gravity multiplier must be at least 1.0, got {0}")]
    FallMultiplier(f32),

    #[error("Gravity must pull downward, got {0}")]
    Gravity(f32),
}

/// Advances avatar kinematics on the simulation authority
pub struct MovementAuthority {
    tuning: MovementTuning,
    probes: BodyProbes,
}

impl MovementAuthority {
    pub fn new(tuning: MovementTuning, probes: BodyProbes) -> Result<Self, MovementError> {
        for (name, value) in [
            ("walk_speed", tuning.walk_speed),
            ("sprint_speed", tuning.sprint_speed),
            ("jump_impulse", tuning.jump_impulse),
            ("head_bonk_impulse", tuning.head_bonk_impulse),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MovementError::NonPositive { name, value });
            }
        }
        if !tuning.fall_gravity_multiplier.is_finite() || tuning.fall_gravity_multiplier < 1.0 {
            return Err(MovementError::FallMultiplier(tuning.fall_gravity_multiplier));
        }
        if !tuning.gravity_y.is_finite() || tuning.gravity_y >= 0.0 {
            return Err(MovementError::Gravity(tuning.gravity_y));
        }

        Ok(Self { tuning, probes })
    }

    /// Advance one avatar by one tick
    ///
    /// `input` is the newest sample for this avatar, if any arrived since the
    /// previous tick; absence means neutral input. `now` is the authority's
    /// monotonic simulation time and `dt` the fixed tick delta.
    pub fn advance(
        &self,
        body: &mut KinematicState,
        input: Option<&InputSample>,
        world: &dyn WorldQuery,
        now: f64,
        dt: f32,
    ) {
        self.probe_ground(body, world, now);
        self.probe_ceiling(body, world);
        self.steer(body, input);
        self.try_jump(body, now);
        self.apply_gravity(body, dt);

        body.position.x += body.velocity.x * dt;
        body.position.y += body.velocity.y * dt;
        body.position.z += body.velocity.z * dt;
    }

    /// Ground probe and grounded-state bookkeeping
    fn probe_ground(&self, body: &mut KinematicState, world: &dyn WorldQuery, now: f64) {
        if self.probes.ground_contact(body.position, world) {
            if !body.is_grounded() {
                body.coyote_consumed = false;
            }
            body.grounded = GroundedState::Grounded;
            body.last_grounded_at = now;
            if body.velocity.y < 0.0 {
                body.velocity.y = 0.0;
            }
        } else {
            body.grounded = GroundedState::Airborne;
        }
    }

    /// Ceiling probe: cancel ascent and shove the avatar back down
    ///
    /// Runs against the vertical velocity carried in from the previous tick,
    /// before the jump step may set a new one. The one-shot downward impulse
    /// is what makes jump-spamming into a low ceiling unprofitable.
    fn probe_ceiling(&self, body: &mut KinematicState, world: &dyn WorldQuery) {
        if body.velocity.y > 0.0 && self.probes.ceiling_contact(body.position, world) {
            body.velocity.y = 0.0;
            body.velocity.y -= self.tuning.head_bonk_impulse;
        }
    }

    /// Horizontal movement from the sanitized move vector; vertical untouched
    fn steer(&self, body: &mut KinematicState, input: Option<&InputSample>) {
        let Some(sample) = input else {
            body.velocity.x = 0.0;
            body.velocity.z = 0.0;
            return;
        };

        let (move_x, move_y) = sanitize_move(sample);
        if sample.yaw.is_finite() {
            body.yaw = sample.yaw;
        } else {
            debug!(seq = sample.seq, "Discarding non-finite yaw");
        }

        // Basis from facing: forward is +Z at yaw 0, right is +X
        let (sin, cos) = body.yaw.sin_cos();
        let world_x = cos * move_x + sin * move_y;
        let world_z = -sin * move_x + cos * move_y;

        let magnitude = (world_x * world_x + world_z * world_z).sqrt();
        if magnitude > f32::EPSILON {
            let speed = if sample.sprint {
                self.tuning.sprint_speed
            } else {
                self.tuning.walk_speed
            };
            body.velocity.x = world_x / magnitude * speed;
            body.velocity.z = world_z / magnitude * speed;
        } else {
            body.velocity.x = 0.0;
            body.velocity.z = 0.0;
        }
    }

    /// Jump buffering and execution
    fn try_jump(&self, body: &mut KinematicState, now: f64) {
        let can_coyote =
            now - body.last_grounded_at <= self.tuning.coyote_time && !body.coyote_consumed;
        let can_jump = body.is_grounded() || can_coyote;
        let buffered = now - body.last_jump_request_at <= self.tuning.jump_buffer_time;

        if buffered && can_jump {
            body.velocity.y = 0.0;
            body.velocity.y += self.tuning.jump_impulse;
            // One request yields exactly one jump
            body.last_jump_request_at = NO_JUMP_REQUEST;
            if !body.is_grounded() {
                body.coyote_consumed = true;
            }
            body.grounded = GroundedState::Airborne;
        }
    }

    /// Base gravity plus enhanced fall gravity while descending
    fn apply_gravity(&self, body: &mut KinematicState, dt: f32) {
        if body.is_grounded() {
            return;
        }
        body.velocity.y += self.tuning.gravity_y * dt;
        if body.velocity.y < 0.0 {
            let extra = self.tuning.gravity_y * (self.tuning.fall_gravity_multiplier - 1.0);
            body.velocity.y += extra * dt;
        }
    }
}

/// Clamp the move vector into the unit disc, zeroing non-finite components
fn sanitize_move(sample: &InputSample) -> (f32, f32) {
    let mut clamped = false;

    let mut sanitize_axis = |value: f32| -> f32 {
        if !value.is_finite() {
            clamped = true;
            0.0
        } else if !(-1.0..=1.0).contains(&value) {
            clamped = true;
            value.clamp(-1.0, 1.0)
        } else {
            value
        }
    };

    let mut move_x = sanitize_axis(sample.move_x);
    let mut move_y = sanitize_axis(sample.move_y);

    let magnitude = (move_x * move_x + move_y * move_y).sqrt();
    if magnitude > 1.0 {
        move_x /= magnitude;
        move_y /= magnitude;
    }

    if clamped {
        debug!(
            seq = sample.seq,
            move_x = sample.move_x,
            move_y = sample.move_y,
            "Sanitized out-of-range move vector"
        );
    }

    (move_x, move_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::{Aabb, CollisionMask, StaticWorld};

    const DT: f32 = 1.0 / 60.0;

    fn authority() -> MovementAuthority {
        MovementAuthority::new(
            MovementTuning::default(),
            BodyProbes::new(0.1, 1.7, 0.4, 0.2).unwrap(),
        )
        .unwrap()
    }

    fn floor_world() -> StaticWorld {
        StaticWorld::with_floor(50.0, 0.0)
    }

    fn empty_world() -> StaticWorld {
        StaticWorld::new()
    }

    fn grounded_body() -> KinematicState {
        KinematicState::at(Vec3::ZERO, 0.0)
    }

    fn walk_forward(seq: u32) -> InputSample {
        InputSample {
            seq,
            move_x: 0.0,
            move_y: 1.0,
            sprint: false,
            jump: false,
            yaw: 0.0,
        }
    }

    #[test]
    fn walking_forward_moves_along_facing() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();

        authority.advance(&mut body, Some(&walk_forward(1)), &world, 0.0, DT);

        assert!((body.velocity.x).abs() < 1e-5);
        assert!((body.velocity.z - 8.0).abs() < 1e-4);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.is_grounded());
    }

    #[test]
    fn sprinting_uses_sprint_speed() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        let sample = InputSample {
            sprint: true,
            ..walk_forward(1)
        };

        authority.advance(&mut body, Some(&sample), &world, 0.0, DT);

        assert!((body.velocity.z - 12.0).abs() < 1e-4);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        let sample = InputSample {
            move_x: 1.0,
            move_y: 1.0,
            ..walk_forward(1)
        };

        authority.advance(&mut body, Some(&sample), &world, 0.0, DT);

        let horizontal =
            (body.velocity.x * body.velocity.x + body.velocity.z * body.velocity.z).sqrt();
        assert!((horizontal - 8.0).abs() < 1e-3);
    }

    #[test]
    fn yaw_rotates_movement_basis() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        let sample = InputSample {
            yaw: std::f32::consts::FRAC_PI_2,
            ..walk_forward(1)
        };

        authority.advance(&mut body, Some(&sample), &world, 0.0, DT);

        // Facing +X now, forward input moves along +X
        assert!((body.velocity.x - 8.0).abs() < 1e-3);
        assert!(body.velocity.z.abs() < 1e-3);
        assert!((body.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn absent_input_stops_horizontal_movement() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        body.velocity = Vec3::new(5.0, 0.0, 5.0);

        authority.advance(&mut body, None, &world, 0.0, DT);

        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(body.velocity.z, 0.0);
    }

    #[test]
    fn malformed_input_is_treated_as_neutral() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        let sample = InputSample {
            move_x: f32::NAN,
            move_y: f32::INFINITY,
            yaw: f32::NAN,
            ..InputSample::default()
        };

        authority.advance(&mut body, Some(&sample), &world, 0.0, DT);

        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(body.velocity.z, 0.0);
        assert_eq!(body.yaw, 0.0);
    }

    #[test]
    fn out_of_range_axis_is_clamped_not_rejected() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        let sample = InputSample {
            move_x: 4.0,
            ..InputSample::default()
        };

        authority.advance(&mut body, Some(&sample), &world, 0.0, DT);

        assert!((body.velocity.x - 8.0).abs() < 1e-3);
        assert!(body.velocity.z.abs() < 1e-3);
    }

    #[test]
    fn grounded_jump_executes_without_consuming_coyote() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        // Let one tick establish ground contact first
        authority.advance(&mut body, None, &world, 0.0, DT);
        assert!(body.is_grounded());

        body.note_jump_request(0.02);
        authority.advance(&mut body, None, &world, 0.02, DT);

        assert!(body.velocity.y > 0.0);
        assert!(!body.coyote_consumed);
        assert_eq!(body.last_jump_request_at, NO_JUMP_REQUEST);
    }

    #[test]
    fn one_request_yields_exactly_one_jump() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        authority.advance(&mut body, None, &world, 0.0, DT);

        body.note_jump_request(0.02);
        authority.advance(&mut body, None, &world, 0.02, DT);
        let after_first = body.velocity.y;
        assert!(after_first > 0.0);

        // Still well inside the buffer window, but the request is spent
        authority.advance(&mut body, None, &world, 0.04, DT);
        assert!(body.velocity.y <= after_first);
        assert_eq!(body.last_jump_request_at, NO_JUMP_REQUEST);
    }

    #[test]
    fn coyote_jump_within_window_consumes_coyote() {
        let authority = authority();
        let world = empty_world();
        let mut body = grounded_body();
        body.last_grounded_at = 9.90;

        body.note_jump_request(10.0);
        authority.advance(&mut body, None, &world, 10.0, DT);

        assert!(body.velocity.y > 0.0);
        assert!(body.coyote_consumed);
        assert_eq!(body.last_jump_request_at, NO_JUMP_REQUEST);
    }

    #[test]
    fn coyote_jump_after_window_expires_does_nothing() {
        let authority = authority();
        let world = empty_world();
        let mut body = grounded_body();
        body.last_grounded_at = 9.80;

        body.note_jump_request(10.0);
        authority.advance(&mut body, None, &world, 10.0, DT);

        assert!(body.velocity.y < 0.0);
        assert!(!body.coyote_consumed);
        // Unexecuted requests stay pending until they expire on their own
        assert_eq!(body.last_jump_request_at, 10.0);
    }

    #[test]
    fn consumed_coyote_blocks_second_airborne_jump() {
        let authority = authority();
        let world = empty_world();
        let mut body = grounded_body();
        body.last_grounded_at = 9.95;
        body.coyote_consumed = true;

        body.note_jump_request(10.0);
        authority.advance(&mut body, None, &world, 10.0, DT);

        assert!(body.velocity.y < 0.0);
    }

    #[test]
    fn expired_buffer_blocks_grounded_jump() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        authority.advance(&mut body, None, &world, 0.0, DT);

        body.note_jump_request(0.0);
        authority.advance(&mut body, None, &world, 0.5, DT);

        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn landing_resets_coyote_and_zeroes_descent() {
        let authority = authority();
        let world = floor_world();
        let mut body = grounded_body();
        body.grounded = GroundedState::Airborne;
        body.coyote_consumed = true;
        body.velocity.y = -6.0;

        authority.advance(&mut body, None, &world, 3.0, DT);

        assert!(body.is_grounded());
        assert!(!body.coyote_consumed);
        assert_eq!(body.last_grounded_at, 3.0);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn head_bonk_cancels_ascent_and_shoves_down() {
        let authority = authority();
        let mut world = StaticWorld::new();
        world.add(
            Aabb::new(Vec3::new(-2.0, 1.8, -2.0), Vec3::new(2.0, 2.2, 2.0)),
            CollisionMask::CEILING,
        );
        let mut body = grounded_body();
        body.velocity.y = 5.0;

        authority.advance(&mut body, None, &world, 0.0, DT);

        // Cancelled to zero, bonked to -12, then one tick of fall gravity
        let expected = -12.0 + (-24.0 * DT) + (-24.0 * 1.5 * DT);
        assert!((body.velocity.y - expected).abs() < 1e-3);
    }

    #[test]
    fn no_bonk_without_upward_velocity() {
        let authority = authority();
        let mut world = StaticWorld::new();
        world.add(
            Aabb::new(Vec3::new(-2.0, 1.8, -2.0), Vec3::new(2.0, 2.2, 2.0)),
            CollisionMask::CEILING,
        );
        let mut body = grounded_body();
        body.velocity.y = -1.0;

        authority.advance(&mut body, None, &world, 0.0, DT);

        // Only gravity, no -12 shove
        assert!(body.velocity.y > -3.0);
    }

    #[test]
    fn no_bonk_without_ceiling_hit() {
        let authority = authority();
        let world = empty_world();
        let mut body = grounded_body();
        body.velocity.y = 5.0;

        authority.advance(&mut body, None, &world, 0.0, DT);

        assert!(body.velocity.y > 4.0);
    }

    #[test]
    fn falling_uses_enhanced_gravity() {
        let authority = authority();
        let world = empty_world();

        let mut rising = grounded_body();
        rising.velocity.y = 10.0;
        authority.advance(&mut rising, None, &world, 0.0, DT);
        let rise_loss = 10.0 - rising.velocity.y;

        let mut falling = grounded_body();
        falling.velocity.y = -10.0;
        authority.advance(&mut falling, None, &world, 0.0, DT);
        let fall_gain = -10.0 - falling.velocity.y;

        assert!((rise_loss - 24.0 * DT).abs() < 1e-3);
        assert!((fall_gain - 24.0 * 2.5 * DT).abs() < 1e-3);
    }

    #[test]
    fn construction_rejects_bad_tuning() {
        let probes = BodyProbes::new(0.1, 1.7, 0.4, 0.2).unwrap();

        let tuning = MovementTuning {
            walk_speed: -1.0,
            ..MovementTuning::default()
        };
        assert!(matches!(
            MovementAuthority::new(tuning, probes),
            Err(MovementError::NonPositive { .. })
        ));

        let tuning = MovementTuning {
            fall_gravity_multiplier: 0.9,
            ..MovementTuning::default()
        };
        assert!(matches!(
            MovementAuthority::new(tuning, probes),
            Err(MovementError::FallMultiplier(_))
        ));

        let tuning = MovementTuning {
            gravity_y: 1.0,
            ..MovementTuning::default()
        };
        assert!(matches!(
            MovementAuthority::new(tuning, probes),
            Err(MovementError::Gravity(_))
        ));
    }
}
