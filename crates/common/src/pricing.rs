//! Price resolution types shared by the oracle and the engine

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Outcome of pricing a single token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PriceResolution {
    /// USD price per whole token
    Resolved { usd: f64 },
    /// No usable price; carries the reason
    Unresolved { reason: String },
}

impl PriceResolution {
    /// Build a resolution from a raw price, rejecting non-finite and non-positive values
    pub fn from_price(usd: f64) -> Self {
        if usd.is_finite() && usd > 0.0 {
            PriceResolution::Resolved { usd }
        } else {
            PriceResolution::Unresolved {
                reason: format!("unusable price {}", usd),
            }
        }
    }

    pub fn unresolved(reason: impl Into<String>) -> Self {
        PriceResolution::Unresolved {
            reason: reason.into(),
        }
    }

    pub fn usd(&self) -> Option<f64> {
        match self {
            PriceResolution::Resolved { usd } => Some(*usd),
            PriceResolution::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, PriceResolution::Resolved { .. })
    }
}

/// Token address → price resolution
pub type PriceTable = BTreeMap<Address, PriceResolution>;

/// How token prices are sampled for a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingPolicy {
    /// Current price at request time
    Spot,
    /// Mean of first and last price over the round window
    #[default]
    Average,
}

impl PricingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingPolicy::Spot => "spot",
            PricingPolicy::Average => "average",
        }
    }
}

impl std::fmt::Display for PricingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "spot" => Ok(PricingPolicy::Spot),
            "average" | "avg" => Ok(PricingPolicy::Average),
            other => Err(Error::invalid_input(format!(
                "unknown pricing policy '{}', expected spot or average",
                other
            ))),
        }
    }
}
