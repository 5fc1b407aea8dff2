//! Core QF matching computation
//!
//! [`compute_distribution`] is a pure function of its inputs:
//! 1. Normalize: attribute each contribution to an approved project and price it
//! 2. Aggregate per project and per contributor
//! 3. Score each project with the quadratic formula
//! 4. Allocate pool shares under the cap (water-filling)
//! 5. Denominate shares in token units and USD
//! 6. Verify conservation, cap, and finiteness before returning

use std::collections::{BTreeMap, BTreeSet};

use common::{checksum, Address, Contribution, ProjectId, ProjectRegistry, TokenAmount};
use tracing::{debug, warn};

use crate::allocation::{allocate, denominate, qf_score, Allocation};
use crate::domain::{PriceSource, ProjectTally, RoundParameters};
use crate::error::MatchingError;
use crate::result::{Diagnostics, DistributionEntry, DistributionResult, TokenTotal};
use crate::Result;

/// Tolerance for floating-point share checks
const SHARE_EPSILON: f64 = 1e-9;

/// Compute the matching distribution for one round
pub fn compute_distribution<P: PriceSource + ?Sized>(
    params: &RoundParameters,
    contributions: &[Contribution],
    registry: &ProjectRegistry,
    prices: &P,
) -> Result<DistributionResult> {
    let cap = validate_cap(params.cap_percentage)?;
    let pool_usd = pool_usd(params, prices)?;

    let (tallies, diagnostics) = normalize(params, contributions, registry, prices)?;

    let scores: Vec<f64> = tallies
        .values()
        .map(|t| qf_score(&t.contributor_totals()))
        .collect();
    let allocation = allocate(&scores, cap);
    let matched = denominate(params.matching_pool, &allocation);

    let distribution: Vec<DistributionEntry> = tallies
        .into_values()
        .zip(scores.iter())
        .enumerate()
        .map(|(i, (tally, score))| {
            entry(tally, *score, &allocation, i, matched[i], pool_usd)
        })
        .collect();

    let mut result = DistributionResult {
        distribution,
        is_saturated: allocation.is_saturated(),
        unallocated_amount: TokenAmount::ZERO,
        unallocated_percentage: allocation.unallocated * 100.0,
        matching_pool_token: params.pool_token,
        matching_pool: params.matching_pool,
        matching_pool_usd: pool_usd,
        diagnostics,
    };

    let total_matched = result
        .total_matched()
        .ok_or_else(|| MatchingError::invariant("matched total overflows 256 bits"))?;
    result.unallocated_amount = params.matching_pool.saturating_sub(total_matched);

    verify(params, cap, &result, total_matched)?;

    debug!(
        projects = result.distribution.len(),
        saturated = result.is_saturated,
        unallocated = %result.unallocated_amount,
        "Computed distribution"
    );
    Ok(result)
}

fn validate_cap(cap_percentage: Option<f64>) -> Result<Option<f64>> {
    match cap_percentage {
        None => Ok(None),
        Some(cap) if cap.is_finite() && (0.0..=100.0).contains(&cap) => Ok(Some(cap / 100.0)),
        Some(cap) => Err(MatchingError::validation(format!(
            "cap percentage {} is outside [0, 100]",
            cap
        ))),
    }
}

fn checked_price(token: &Address, price: Option<f64>) -> Result<Option<f64>> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(MatchingError::validation(format!(
            "price {} for token {} is not a finite non-negative number",
            p,
            checksum(token)
        ))),
        other => Ok(other),
    }
}

/// Pool value in USD, `None` when the pool token has no price
fn pool_usd<P: PriceSource + ?Sized>(
    params: &RoundParameters,
    prices: &P,
) -> Result<Option<f64>> {
    let quote = prices.usd_price(&params.pool_token);
    let Some(price) = checked_price(&params.pool_token, quote)? else {
        return Ok(None);
    };
    let whole = params
        .matching_pool
        .to_decimal_f64(params.pool_token_decimals)
        .map_err(|e| MatchingError::validation(e.to_string()))?;
    finite_usd(whole * price, "matching pool").map(Some)
}

fn finite_usd(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MatchingError::validation(format!("USD conversion of {} overflowed", what)))
    }
}

/// Attribute and price every contribution
fn normalize<P: PriceSource + ?Sized>(
    params: &RoundParameters,
    contributions: &[Contribution],
    registry: &ProjectRegistry,
    prices: &P,
) -> Result<(BTreeMap<ProjectId, ProjectTally>, Diagnostics)> {
    let mut tallies: BTreeMap<ProjectId, ProjectTally> = BTreeMap::new();
    let mut diagnostics = Diagnostics::default();
    let mut unresolved: BTreeSet<Address> = BTreeSet::new();

    for contribution in contributions {
        if contribution.amount.is_zero() {
            diagnostics.zero_amount_contributions += 1;
            continue;
        }
        let Some(project) = registry.project_for(&contribution.payout_address) else {
            diagnostics.discarded_contributions += 1;
            continue;
        };

        let usd = match contribution.usd_value {
            Some(v) if v.is_finite() && v >= 0.0 => Some(v),
            Some(v) => {
                return Err(MatchingError::validation(format!(
                    "contribution {} has USD value {}",
                    contribution.id, v
                )))
            }
            None => match checked_price(
                &contribution.token,
                prices.usd_price(&contribution.token),
            )? {
                Some(price) => {
                    let whole = contribution
                        .amount
                        .to_decimal_f64(params.decimals_of(&contribution.token))
                        .map_err(|e| MatchingError::validation(e.to_string()))?;
                    Some(finite_usd(whole * price, &contribution.id)?)
                }
                None => {
                    unresolved.insert(contribution.token);
                    None
                }
            },
        };

        let tally = tallies
            .entry(project.clone())
            .or_insert_with(|| ProjectTally::new(project.clone(), contribution.payout_address));

        tally.contribution_count += 1;
        tally.contributors.insert(contribution.contributor);
        let token_total = tally.token_totals.entry(contribution.token).or_default();
        *token_total = token_total
            .checked_add(contribution.amount)
            .ok_or_else(|| MatchingError::validation("token total overflows 256 bits"))?;

        match usd {
            Some(v) => tally
                .usd_by_contributor
                .entry(contribution.contributor)
                .or_default()
                .push(v),
            None => {
                tally.unpriced_count += 1;
                diagnostics.unpriced_contributions += 1;
            }
        }
    }

    if diagnostics.discarded_contributions > 0 {
        warn!(
            discarded = diagnostics.discarded_contributions,
            "Contributions to unknown or unapproved projects excluded from matching"
        );
    }
    if diagnostics.zero_amount_contributions > 0 {
        debug!(
            skipped = diagnostics.zero_amount_contributions,
            "Zero-amount contributions skipped"
        );
    }
    if !unresolved.is_empty() {
        warn!(
            tokens = unresolved.len(),
            unpriced = diagnostics.unpriced_contributions,
            "Contributions without a USD price counted as zero"
        );
    }
    diagnostics.unresolved_tokens = unresolved.iter().map(checksum).collect();

    Ok((tallies, diagnostics))
}

fn entry(
    tally: ProjectTally,
    score: f64,
    allocation: &Allocation,
    index: usize,
    matched: TokenAmount,
    pool_usd: Option<f64>,
) -> DistributionEntry {
    let share = allocation.shares[index];
    let total_usd = (tally.unpriced_count == 0).then(|| tally.total_usd());

    DistributionEntry {
        unique_contributors_count: tally.unique_contributors(),
        contributions_count: tally.contribution_count,
        total_contributions_usd: total_usd,
        match_amount_usd: pool_usd.map(|usd| share * usd),
        match_amount_token: matched,
        match_pool_percentage: share * 100.0,
        qf_score: score,
        capped: allocation.capped[index],
        unpriced_contributions_count: tally.unpriced_count,
        contribution_totals: tally
            .token_totals
            .into_iter()
            .map(|(token, amount)| TokenTotal { token, amount })
            .collect(),
        project_id: tally.project_id,
        payout_address: tally.payout_address,
        payout_explorer_url: None,
    }
}

/// Post-computation checks; any failure is an engine bug
fn verify(
    params: &RoundParameters,
    cap: Option<f64>,
    result: &DistributionResult,
    total_matched: TokenAmount,
) -> Result<()> {
    if total_matched > params.matching_pool {
        return Err(MatchingError::invariant(format!(
            "matched {} exceeds pool {}",
            total_matched, params.matching_pool
        )));
    }

    let mut share_sum = 0.0;
    for e in &result.distribution {
        let share = e.match_pool_percentage / 100.0;
        if let Some(cap) = cap {
            if share > cap + SHARE_EPSILON {
                return Err(MatchingError::invariant(format!(
                    "project {} share {} exceeds cap {}",
                    e.project_id, share, cap
                )));
            }
        }
        let floats = [
            Some(e.match_pool_percentage),
            Some(e.qf_score),
            e.match_amount_usd,
            e.total_contributions_usd,
        ];
        if floats.iter().flatten().any(|v| !v.is_finite()) || share < 0.0 {
            return Err(MatchingError::invariant(format!(
                "project {} has a non-finite or negative figure",
                e.project_id
            )));
        }
        share_sum += share;
    }

    if share_sum > 1.0 + SHARE_EPSILON {
        return Err(MatchingError::invariant(format!(
            "shares sum to {}",
            share_sum
        )));
    }
    if !result.unallocated_percentage.is_finite() || result.unallocated_percentage < 0.0 {
        return Err(MatchingError::invariant("unallocated percentage is not a finite share"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use common::{PriceResolution, PriceTable};

    fn token() -> Address {
        Address::repeat_byte(0xee)
    }

    fn contribution(
        id: &str,
        contributor: u8,
        payout: Address,
        whole_tokens: u128,
    ) -> Contribution {
        Contribution {
            id: id.to_string(),
            amount: TokenAmount::from_u128(whole_tokens * 10u128.pow(18)),
            token: token(),
            contributor: Address::repeat_byte(contributor),
            payout_address: payout,
            project_ref: None,
            usd_value: None,
        }
    }

    fn registry(projects: &[(&str, Address)]) -> ProjectRegistry {
        let mut registry = ProjectRegistry::new();
        for (id, payout) in projects {
            registry.insert(ProjectId::new(*id), *payout).unwrap();
        }
        registry
    }

    fn prices(usd: f64) -> PriceTable {
        PriceTable::from([(token(), PriceResolution::from_price(usd))])
    }

    fn params() -> RoundParameters {
        RoundParameters::new(TokenAmount::from_u128(1_000), token(), 18)
    }

    #[test]
    fn test_cap_out_of_range_rejected() {
        for cap in [-1.0, 100.5, f64::NAN, f64::INFINITY] {
            assert_matches!(
                compute_distribution(
                    &params().with_cap(cap),
                    &[],
                    &ProjectRegistry::new(),
                    &prices(1.0)
                ),
                Err(MatchingError::Validation(_))
            );
        }
    }

    #[test]
    fn test_pre_resolved_usd_wins() {
        let payout = Address::repeat_byte(1);
        let mut c = contribution("c1", 10, payout, 1);
        c.usd_value = Some(9.0);

        let registry = registry(&[("a", payout)]);
        let result = compute_distribution(&params(), &[c], &registry, &prices(1.0)).unwrap();

        assert_eq!(result.distribution[0].total_contributions_usd, Some(9.0));
        assert_eq!(result.distribution[0].qf_score, 9.0);
    }

    #[test]
    fn test_invalid_usd_value_rejected() {
        let payout = Address::repeat_byte(1);
        let mut c = contribution("c1", 10, payout, 1);
        c.usd_value = Some(f64::NAN);

        assert_matches!(
            compute_distribution(&params(), &[c], &registry(&[("a", payout)]), &prices(1.0)),
            Err(MatchingError::Validation(_))
        );
    }

    #[test]
    fn test_non_finite_price_rejected() {
        let payout = Address::repeat_byte(1);
        let table = BTreeMap::from([(token(), f64::INFINITY)]);
        assert_matches!(
            compute_distribution(
                &params(),
                &[contribution("c1", 10, payout, 1)],
                &registry(&[("a", payout)]),
                &table
            ),
            Err(MatchingError::Validation(_))
        );
    }

    #[test]
    fn test_repeat_contributions_sum_per_contributor() {
        let payout = Address::repeat_byte(1);
        let contributions = vec![
            contribution("c1", 10, payout, 4),
            contribution("c2", 10, payout, 5),
        ];

        let registry = registry(&[("a", payout)]);
        let result =
            compute_distribution(&params(), &contributions, &registry, &prices(1.0)).unwrap();
        let entry = &result.distribution[0];

        assert_eq!(entry.contributions_count, 2);
        assert_eq!(entry.unique_contributors_count, 1);
        assert_eq!(entry.qf_score, 9.0);
        assert_eq!(
            entry.contribution_totals,
            vec![TokenTotal {
                token: token(),
                amount: TokenAmount::from_u128(9 * 10u128.pow(18))
            }]
        );
    }

    #[test]
    fn test_pool_usd_from_pool_token_price() {
        let payout = Address::repeat_byte(1);
        let params = RoundParameters::new(TokenAmount::from_u128(2 * 10u128.pow(18)), token(), 18);
        let result = compute_distribution(
            &params,
            &[contribution("c1", 10, payout, 1)],
            &registry(&[("a", payout)]),
            &prices(3.0),
        )
        .unwrap();

        assert_eq!(result.matching_pool_usd, Some(6.0));
        assert_eq!(result.distribution[0].match_amount_usd, Some(6.0));
        assert_eq!(result.distribution[0].match_pool_percentage, 100.0);
    }
}
