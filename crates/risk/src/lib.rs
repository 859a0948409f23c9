//! parapet-risk — risk scoring primitives for authorization decisions.
//!
//! Everything in this crate is pure and synchronous: the gate compares
//! scores against thresholds, profiles describe a user's behavioural
//! baseline, and pattern analysis summarises recent access events. The
//! engine crate owns the clocks, buffers, and network calls that feed
//! these functions.

pub mod gate;
pub mod patterns;
pub mod profile;

pub use gate::{GateDecision, evaluate_gate};
pub use patterns::{AccessPatternEvent, PatternAssessment, PatternSummary};
pub use profile::{BaselineMetrics, RiskProfile};
