//! QF Matching Engine
//!
//! Computes each approved project's share of a round's matching pool with
//! the quadratic-funding formula: a project's score is the square of the sum
//! of the square roots of what each distinct contributor gave in USD, so
//! breadth of support outweighs concentration.
//!
//! # Key Properties
//!
//! - Pure and synchronous; no I/O and no shared state
//! - Deterministic: a permuted contribution list gives an identical result
//! - Σ matched token ≤ pool, and no share exceeds the cap
//! - Cap leftovers stay unallocated and are reported, never redistributed
//!   to capped projects

pub mod allocation;
pub mod domain;
pub mod engine;
pub mod error;
pub mod result;

pub use allocation::{allocate, qf_score, Allocation, WEIGHT_SCALE};
pub use domain::{PriceSource, ProjectTally, RoundParameters};
pub use engine::compute_distribution;
pub use error::MatchingError;
pub use result::{Diagnostics, DistributionEntry, DistributionResult, TokenTotal};

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchingError>;
