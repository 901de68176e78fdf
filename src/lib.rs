//! Manhunt Authority - authoritative movement and role assignment
//!
//! This crate is the trusted core of a session-based manhunt game: one
//! Runner is chased by a small pack of Hunters. It owns:
//! - Server-side avatar movement (ground/ceiling probing, coyote time,
//!   jump buffering, head-bonk cancellation, enhanced fall gravity)
//! - Role assignment and the connection-to-avatar ownership table
//! - The fixed-rate simulation tick and snapshot broadcasting
//!
//! Transport, device input capture and presentation live in the embedding
//! server and client; they talk to this crate through [`SessionHandle`],
//! the [`WorldQuery`] probe boundary and the [`ownership`] gate.
//!
//! [`SessionHandle`]: game::session::SessionHandle
//! [`WorldQuery`]: game::world::WorldQuery
//! [`ownership`]: game::ownership

pub mod config;
pub mod game;
pub mod net;
pub mod util;

pub use config::Config;
pub use game::session::{Session, SessionAuthority, SessionHandle};
