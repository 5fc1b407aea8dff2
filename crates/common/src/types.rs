//! Common types used across the QF matching service
//!
//! This module provides the fundamental domain types shared by the loaders,
//! the matching engine, and the overview assembler.

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::checksummed;
use crate::chain::ChainId;
use crate::error::{Error, Result};

/// Stable identifier of an approved project (the application id)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token amount in the token's smallest unit.
///
/// Serialized as a decimal string so that 256-bit values survive JSON
/// consumers that parse numbers as doubles. Deserializes from either a
/// decimal string, a `0x` hex string, or a JSON integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(pub U256);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(U256::ZERO);

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn from_u128(value: u128) -> Self {
        Self(U256::from(value))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a non-negative integer string (decimal, or hex with a `0x` prefix)
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('-') {
            return Err(Error::invalid_amount(raw, "not a non-negative integer"));
        }
        U256::from_str(trimmed)
            .map(Self)
            .map_err(|e| Error::invalid_amount(raw, e.to_string()))
    }

    /// Convert a whole-token decimal (e.g. `"1000.5"`) to smallest units.
    ///
    /// Digits beyond `decimals` fractional places are truncated.
    pub fn from_decimal_str(raw: &str, decimals: u8) -> Result<Self> {
        let value = BigDecimal::from_str(raw.trim())
            .map_err(|e| Error::invalid_amount(raw, e.to_string()))?;
        if value < BigDecimal::zero() {
            return Err(Error::invalid_amount(raw, "negative amount"));
        }

        let scale = BigDecimal::from_str(&format!("1E{}", decimals))
            .map_err(|e| Error::invalid_amount(raw, e.to_string()))?;
        let (units, _) = (value * scale).with_scale(0).into_bigint_and_exponent();

        U256::from_str(&units.to_string())
            .map(Self)
            .map_err(|_| Error::invalid_amount(raw, "exceeds 256 bits"))
    }

    /// Amount in whole tokens as an `f64`, exact up to double precision.
    pub fn to_decimal_f64(&self, decimals: u8) -> Result<f64> {
        let raw = self.0.to_string();
        let value = BigDecimal::from_str(&format!("{}E-{}", raw, decimals))
            .map_err(|e| Error::invalid_amount(&raw, e.to_string()))?;
        value
            .to_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::invalid_amount(raw, "not representable as f64"))
    }

    pub fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: TokenAmount) -> TokenAmount {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => TokenAmount::parse(&s).map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(TokenAmount(U256::from(n))),
        }
    }
}

/// Content pointer (protocol 1 = IPFS)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaPtr {
    pub protocol: u64,
    pub pointer: String,
}

impl MetaPtr {
    pub fn ipfs(pointer: impl Into<String>) -> Self {
        Self {
            protocol: 1,
            pointer: pointer.into(),
        }
    }
}

/// Voting strategy attached to a round; its id keys the contribution feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStrategy {
    pub id: String,
    pub strategy_name: String,
}

/// A single vote event from the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub id: String,
    pub amount: TokenAmount,
    #[serde(with = "checksummed")]
    pub token: Address,
    #[serde(with = "checksummed")]
    pub contributor: Address,
    #[serde(with = "checksummed")]
    pub payout_address: Address,
    /// Project reference exactly as encoded in the feed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_ref: Option<String>,
    /// Pre-resolved USD value; wins over the price lookup when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd_value: Option<f64>,
}

/// Round fields as indexed on-chain, before the metadata document is read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOnChain {
    #[serde(with = "checksummed")]
    pub id: Address,
    pub chain_id: ChainId,
    #[serde(with = "checksummed")]
    pub token: Address,
    pub round_start_time: i64,
    pub round_end_time: i64,
    pub voting_strategy: VotingStrategy,
    pub round_meta_ptr: MetaPtr,
    pub projects_meta_ptr: Option<MetaPtr>,
}

/// Round configuration used for one computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMetadata {
    #[serde(flatten)]
    pub on_chain: RoundOnChain,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub token_symbol: Option<String>,
    pub token_decimals: u8,
    /// Matching pool in the token's smallest unit
    pub matching_pool: TokenAmount,
    /// Per-project cap as a percentage of the pool (0-100)
    pub matching_cap_percentage: Option<f64>,
}

impl RoundMetadata {
    pub fn id(&self) -> Address {
        self.on_chain.id
    }

    pub fn chain_id(&self) -> ChainId {
        self.on_chain.chain_id
    }

    pub fn token(&self) -> Address {
        self.on_chain.token
    }
}
