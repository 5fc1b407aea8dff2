//! Round-wide contribution summary

use std::collections::BTreeSet;

use common::Contribution;
use matching_engine::{PriceSource, RoundParameters};
use serde::{Deserialize, Serialize};

/// Totals over every contribution in the feed, approved project or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSummary {
    pub contribution_count: usize,
    pub unique_contributors: usize,
    /// `None` when no contribution could be priced
    #[serde(rename = "totalContributionsInUSD")]
    pub total_contributions_usd: Option<f64>,
    /// Mean over the priced contributions
    #[serde(rename = "averageUSDContribution")]
    pub average_usd_contribution: Option<f64>,
}

impl ContributionSummary {
    pub fn from_contributions<P>(
        contributions: &[Contribution],
        params: &RoundParameters,
        prices: &P,
    ) -> Self
    where
        P: PriceSource + ?Sized,
    {
        let contributors: BTreeSet<_> = contributions.iter().map(|c| c.contributor).collect();

        let mut priced: Vec<f64> = contributions
            .iter()
            .filter_map(|c| usd_value(c, params, prices))
            .collect();
        priced.sort_by(|a, b| a.total_cmp(b));

        let (total, average) = if priced.is_empty() {
            (None, None)
        } else {
            let total: f64 = priced.iter().sum();
            (Some(total), Some(total / priced.len() as f64))
        };

        Self {
            contribution_count: contributions.len(),
            unique_contributors: contributors.len(),
            total_contributions_usd: total,
            average_usd_contribution: average,
        }
    }
}

fn usd_value<P>(contribution: &Contribution, params: &RoundParameters, prices: &P) -> Option<f64>
where
    P: PriceSource + ?Sized,
{
    let usd = match contribution.usd_value {
        Some(usd) => usd,
        None => {
            let price = prices.usd_price(&contribution.token)?;
            let decimals = params.decimals_of(&contribution.token);
            contribution.amount.to_decimal_f64(decimals).ok()? * price
        }
    };
    (usd.is_finite() && usd >= 0.0).then_some(usd)
}
