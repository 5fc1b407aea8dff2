//! Domain types for the QF matching engine
//!
//! Inputs the engine needs beyond the raw contributions, and the per-project
//! tally it builds while normalizing them.

use std::collections::{BTreeMap, BTreeSet};

use common::{
    Address, ChainConfig, PriceResolution, PriceTable, ProjectId, RoundMetadata, TokenAmount,
    DEFAULT_TOKEN_DECIMALS,
};

// ============================================================================
// Round Parameters
// ============================================================================

/// Round configuration consumed by [`compute_distribution`](crate::compute_distribution)
#[derive(Debug, Clone, PartialEq)]
pub struct RoundParameters {
    /// Matching pool in the pool token's smallest unit
    pub matching_pool: TokenAmount,
    /// Token the pool is denominated in
    pub pool_token: Address,
    pub pool_token_decimals: u8,
    /// Per-project cap as a percentage of the pool (0-100)
    pub cap_percentage: Option<f64>,
    /// Decimals of every token contributions may arrive in
    pub token_decimals: BTreeMap<Address, u8>,
}

impl RoundParameters {
    pub fn new(matching_pool: TokenAmount, pool_token: Address, pool_token_decimals: u8) -> Self {
        Self {
            matching_pool,
            pool_token,
            pool_token_decimals,
            cap_percentage: None,
            token_decimals: BTreeMap::from([(pool_token, pool_token_decimals)]),
        }
    }

    pub fn with_cap(mut self, cap_percentage: f64) -> Self {
        self.cap_percentage = Some(cap_percentage);
        self
    }

    pub fn with_token_decimals(mut self, token: Address, decimals: u8) -> Self {
        self.token_decimals.insert(token, decimals);
        self
    }

    /// Parameters for a loaded round, with token decimals from its chain table
    pub fn from_round(metadata: &RoundMetadata, chain: &ChainConfig) -> Self {
        let mut token_decimals: BTreeMap<Address, u8> =
            chain.tokens.iter().map(|t| (t.address, t.decimals)).collect();
        token_decimals.insert(metadata.token(), metadata.token_decimals);

        Self {
            matching_pool: metadata.matching_pool,
            pool_token: metadata.token(),
            pool_token_decimals: metadata.token_decimals,
            cap_percentage: metadata.matching_cap_percentage,
            token_decimals,
        }
    }

    /// Decimals for `token`, falling back to 18 for unknown tokens
    pub fn decimals_of(&self, token: &Address) -> u8 {
        self.token_decimals
            .get(token)
            .copied()
            .unwrap_or(DEFAULT_TOKEN_DECIMALS)
    }
}

// ============================================================================
// Price Source
// ============================================================================

/// USD lookup the engine prices contributions with
pub trait PriceSource {
    /// USD per whole token; `None` when the price is unresolved
    fn usd_price(&self, token: &Address) -> Option<f64>;
}

impl PriceSource for PriceTable {
    fn usd_price(&self, token: &Address) -> Option<f64> {
        self.get(token).and_then(PriceResolution::usd)
    }
}

impl PriceSource for BTreeMap<Address, f64> {
    fn usd_price(&self, token: &Address) -> Option<f64> {
        self.get(token).copied()
    }
}

// ============================================================================
// Project Tally
// ============================================================================

/// Everything counted for one approved project during normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTally {
    pub project_id: ProjectId,
    pub payout_address: Address,
    pub contribution_count: usize,
    /// Every contributor, priced or not
    pub contributors: BTreeSet<Address>,
    /// Priced USD values per contributor, in arrival order
    pub usd_by_contributor: BTreeMap<Address, Vec<f64>>,
    /// Raw token totals across all contributions
    pub token_totals: BTreeMap<Address, TokenAmount>,
    pub unpriced_count: usize,
}

impl ProjectTally {
    pub fn new(project_id: ProjectId, payout_address: Address) -> Self {
        Self {
            project_id,
            payout_address,
            contribution_count: 0,
            contributors: BTreeSet::new(),
            usd_by_contributor: BTreeMap::new(),
            token_totals: BTreeMap::new(),
            unpriced_count: 0,
        }
    }

    /// Per-contributor USD totals, each summed in ascending order
    pub fn contributor_totals(&self) -> Vec<f64> {
        self.usd_by_contributor
            .values()
            .map(|values| ascending_sum(values.iter().copied()))
            .collect()
    }

    /// Total priced USD; order-independent
    pub fn total_usd(&self) -> f64 {
        ascending_sum(self.contributor_totals())
    }

    pub fn unique_contributors(&self) -> usize {
        self.contributors.len()
    }
}

/// Sum in ascending magnitude so the result does not depend on input order
pub fn ascending_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(|a, b| a.abs().total_cmp(&b.abs()).then(a.total_cmp(b)));
    values.into_iter().sum()
}
