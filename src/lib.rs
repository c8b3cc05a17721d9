//! Action Guard - authoritative server-side cheat detection
//!
//! Every player action is checked against the previous snapshot and the
//! active rule set before the game applies it:
//! - Kinematic limits (speed, displacement)
//! - Client source and signature markers
//! - Behavioral detectors (aim, fire rate, tampering flags)
//! - Statistical heuristics reported as soft signals
//!
//! Confirmed violations are reported and the account and device are banned.

pub mod app;
pub mod config;
pub mod enforcement;
pub mod engine;
pub mod http;
pub mod rules;
pub mod store;
pub mod util;
