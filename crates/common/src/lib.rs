//! Common types and utilities for the QF matching service
//!
//! This crate provides shared types, traits, and utilities used across
//! all workspace crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`address`] - Address canonicalization (EIP-55)
//! - [`types`] - Shared domain types (TokenAmount, Contribution, RoundMetadata, etc.)
//! - [`chain`] - Chain id → chain config lookup table
//! - [`pricing`] - Price resolution markers shared by the oracle and the engine
//! - [`registry`] - Approved project registry (payout address ↔ project id)
//! - [`retry`] - Exponential backoff for upstream calls

pub mod address;
pub mod chain;
pub mod error;
pub mod pricing;
pub mod registry;
pub mod retry;
pub mod types;

pub use address::{canonical_address, checksum, NATIVE_TOKEN};
pub use alloy_primitives::{Address, U256};
pub use chain::{
    ChainConfig, ChainId, ChainRegistry, ExplorerKind, TokenInfo, DEFAULT_TOKEN_DECIMALS,
};
pub use error::{Error, Result};
pub use pricing::{PriceResolution, PriceTable, PricingPolicy};
pub use registry::{ProjectRegistry, RegistryEntryId, RegistryError};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use types::*;
