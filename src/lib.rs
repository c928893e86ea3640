//! Core engine for a hand-tracked lane-slashing rhythm game.
//!
//! The crate is the headless half of the game: it polls a tracking agent
//! for hand telemetry, normalizes and filters the poses, predicts cursor
//! motion to hide capture latency, schedules notes deterministically from
//! (BPM, offset, seed), judges swipes geometrically and keeps score. A
//! renderer sits on top by reading poses, cursors and effect pools out of
//! [`game::session::Session`] every frame.

pub mod config;
pub mod game;
pub mod telemetry;

pub use game::session::{FrameInput, Session, SessionParams};
