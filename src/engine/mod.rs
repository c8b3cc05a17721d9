//! Rule evaluation engine
//!
//! Leaves first: signature matching and kinematic checks, the behavioral
//! detector catalog, statistical heuristics, and the aggregator that runs
//! them in priority order.

pub mod aggregator;
pub mod category;
pub mod detectors;
pub mod heuristics;
pub mod kinematic;
pub mod signature;
pub mod types;

pub use aggregator::{AntiCheatEngine, Stage, PIPELINE};
pub use category::CheatCategory;
pub use signature::{SignatureMatcher, SignatureRule};
pub use types::{
    ActionPayload, AimPayload, AimSample, CheatSignals, DetectionEvent, FirePayload, PlayerState,
    Position, Telemetry, Verdict,
};
