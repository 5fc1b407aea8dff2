//! Funding overview for QF rounds
//!
//! Ties the round data loaders, the price oracle and the matching engine
//! together behind one call, [`OverviewAssembler::funding_overview`], and
//! serves it over HTTP.
//!
//! # Core Components
//!
//! - [`assembler`] - fetch, price and match one round
//! - [`summary`] - round-wide contribution totals
//! - [`api`] - axum router, handlers and error mapping
//! - [`error`] - one error type folding every crate's failures

pub mod api;
pub mod assembler;
pub mod error;
pub mod summary;

pub use api::{create_router, OverviewApiState};
pub use assembler::{AssemblerConfig, FundingOverview, OverviewAssembler, OverviewRequest};
pub use error::{OverviewError, Result};
pub use summary::ContributionSummary;
