//! Tickstream State -- per-pass aggregation state and tick boundary detection.
//!
//! This crate holds the decision-making half of the snapshot pipeline:
//!
//! - [`accumulator`]: [`MatchState`](accumulator::MatchState), the mutable
//!   store that collects events between two snapshots and keeps the
//!   persistent bomb / round flags.
//! - [`boundary`]: [`BoundaryDetector`](boundary::BoundaryDetector), which
//!   decides on every decoder frame whether a new snapshot must be emitted.
//!
//! Both are synchronous and allocation-light; the I/O side of the pipeline
//! lives in `tickstream-engine`.

#![deny(unsafe_code)]

pub mod accumulator;
pub mod boundary;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::accumulator::{MatchState, TransientEvents};
    pub use crate::boundary::{BoundaryDetector, BoundaryReason, BoundaryStats};
}
