//! Result types for distribution computations

use common::address::checksummed;
use common::{Address, ProjectId, TokenAmount};
use serde::{Deserialize, Serialize};

/// Raw amount contributed to a project in one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTotal {
    #[serde(with = "checksummed")]
    pub token: Address,
    pub amount: TokenAmount,
}

/// One project's share of the matching pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionEntry {
    pub project_id: ProjectId,
    #[serde(rename = "projectPayoutAddress", with = "checksummed")]
    pub payout_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_explorer_url: Option<String>,
    pub unique_contributors_count: usize,
    pub contributions_count: usize,
    /// `None` when any of the project's contributions could not be priced
    #[serde(rename = "totalContributionsInUSD")]
    pub total_contributions_usd: Option<f64>,
    /// `None` when the pool token price is unresolved
    #[serde(rename = "matchAmountInUSD")]
    pub match_amount_usd: Option<f64>,
    #[serde(rename = "matchAmountInToken")]
    pub match_amount_token: TokenAmount,
    pub match_pool_percentage: f64,
    pub qf_score: f64,
    pub capped: bool,
    pub unpriced_contributions_count: usize,
    pub contribution_totals: Vec<TokenTotal>,
}

/// Counts of what normalization set aside
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Contributions whose payout address matched no approved project
    pub discarded_contributions: usize,
    /// Contributions with a zero token amount, skipped before attribution
    pub zero_amount_contributions: usize,
    /// Contributions counted as zero USD because their token had no price
    pub unpriced_contributions: usize,
    /// Checksummed addresses of tokens without a price
    pub unresolved_tokens: Vec<String>,
}

/// Full output of one matching computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResult {
    /// Sorted by project id
    pub distribution: Vec<DistributionEntry>,
    pub is_saturated: bool,
    /// Pool remainder left unallocated, in smallest units
    pub unallocated_amount: TokenAmount,
    pub unallocated_percentage: f64,
    #[serde(with = "checksummed")]
    pub matching_pool_token: Address,
    pub matching_pool: TokenAmount,
    #[serde(rename = "matchingPoolUSD")]
    pub matching_pool_usd: Option<f64>,
    pub diagnostics: Diagnostics,
}

impl DistributionResult {
    /// Σ matched token over all entries, `None` on overflow
    pub fn total_matched(&self) -> Option<TokenAmount> {
        self.distribution
            .iter()
            .try_fold(TokenAmount::ZERO, |acc, e| acc.checked_add(e.match_amount_token))
    }

    pub fn entry(&self, project: &ProjectId) -> Option<&DistributionEntry> {
        self.distribution.iter().find(|e| &e.project_id == project)
    }

    /// Fill `payoutExplorerUrl` for every entry
    pub fn with_explorer_links<F>(mut self, link: F) -> Self
    where
        F: Fn(&Address) -> Option<String>,
    {
        for entry in &mut self.distribution {
            entry.payout_explorer_url = link(&entry.payout_address);
        }
        self
    }
}
