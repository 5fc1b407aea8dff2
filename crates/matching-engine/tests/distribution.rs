//! End-to-end properties of `compute_distribution`

use assert_matches::assert_matches;
use common::{
    checksum, Address, Contribution, PriceResolution, PriceTable, ProjectId, ProjectRegistry,
    TokenAmount, U256,
};
use matching_engine::{compute_distribution, DistributionResult, MatchingError, RoundParameters};

const WEI: u128 = 1_000_000_000_000_000_000;

fn pool_token() -> Address {
    Address::repeat_byte(0xd0)
}

fn payout(project: &str) -> Address {
    Address::repeat_byte(project.as_bytes()[0])
}

fn tip(id: usize, contributor: u8, project: &str, whole_tokens: u128) -> Contribution {
    Contribution {
        id: format!("vote-{id:03}"),
        amount: TokenAmount::from_u128(whole_tokens * WEI),
        token: pool_token(),
        contributor: Address::repeat_byte(contributor),
        payout_address: payout(project),
        project_ref: None,
        usd_value: None,
    }
}

fn registry(projects: &[&str]) -> ProjectRegistry {
    let mut registry = ProjectRegistry::new();
    for project in projects {
        registry.insert(ProjectId::new(*project), payout(project)).unwrap();
    }
    registry
}

fn dollar_prices() -> PriceTable {
    PriceTable::from([(pool_token(), PriceResolution::from_price(1.0))])
}

fn round(pool_tokens: u128) -> RoundParameters {
    RoundParameters::new(TokenAmount::from_u128(pool_tokens * WEI), pool_token(), 18)
}

/// A = 1×$400, B = 4×$25, C = 1×$100
fn scenario() -> Vec<Contribution> {
    let mut tips = vec![tip(0, 1, "A", 400)];
    for (i, contributor) in (10..14).enumerate() {
        tips.push(tip(i + 1, contributor, "B", 25));
    }
    tips.push(tip(5, 20, "C", 100));
    tips
}

fn distribute(
    params: &RoundParameters,
    tips: &[Contribution],
    projects: &[&str],
) -> DistributionResult {
    compute_distribution(params, tips, &registry(projects), &dollar_prices()).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn matched_total(result: &DistributionResult) -> U256 {
    result
        .distribution
        .iter()
        .map(|e| e.match_amount_token.as_u256())
        .fold(U256::ZERO, |acc, v| acc + v)
}

#[test]
fn test_scenario_scores_and_raw_shares() {
    let result = distribute(&round(1000), &scenario(), &["A", "B", "C"]);

    let scores: Vec<f64> = result.distribution.iter().map(|e| e.qf_score).collect();
    assert!(close(scores[0], 400.0));
    assert!(close(scores[1], 400.0));
    assert!(close(scores[2], 100.0));

    let a = &result.distribution[0];
    let b = &result.distribution[1];
    let c = &result.distribution[2];
    assert_eq!(a.match_pool_percentage, b.match_pool_percentage);
    assert!(b.match_pool_percentage > c.match_pool_percentage);
    assert!(close(b.match_pool_percentage, 400.0 / 9.0));
    assert!(close(c.match_pool_percentage, 100.0 / 9.0));
    assert_eq!(b.total_contributions_usd, c.total_contributions_usd);
    assert_eq!(b.unique_contributors_count, 4);
    assert!(!result.is_saturated);
}

#[test]
fn test_scenario_with_cap_saturates_every_project() {
    let params = round(1000).with_cap(20.0);
    let result = distribute(&params, &scenario(), &["A", "B", "C"]);

    assert!(result.is_saturated);
    for entry in &result.distribution {
        assert!(entry.capped);
        assert!(close(entry.match_pool_percentage, 20.0));
        assert_eq!(entry.match_amount_token, TokenAmount::from_u128(200 * WEI));
    }
    assert_eq!(result.unallocated_amount, TokenAmount::from_u128(400 * WEI));
    assert!(close(result.unallocated_percentage, 40.0));
}

#[test]
fn test_conservation_without_cap() {
    let params = RoundParameters::new(TokenAmount::from_u128(1_001), pool_token(), 18);
    let tips = vec![tip(0, 1, "A", 1), tip(1, 2, "B", 1), tip(2, 3, "C", 1)];
    let result = distribute(&params, &tips, &["A", "B", "C"]);

    let total = matched_total(&result);
    assert!(total <= U256::from(1_001u64));
    assert!(U256::from(1_001u64) - total <= U256::from(3u64));
    assert_eq!(result.unallocated_amount.as_u256(), U256::from(1_001u64) - total);
    assert_eq!(result.unallocated_percentage, 0.0);
}

#[test]
fn test_cap_never_exceeded() {
    let tips: Vec<Contribution> = (0..40)
        .map(|i| {
            let project = ["A", "B", "C", "D", "E"][i % 5];
            tip(i, i as u8 + 1, project, (i as u128 % 7 + 1) * 13)
        })
        .collect();
    let params = round(777).with_cap(25.0);
    let result = distribute(&params, &tips, &["A", "B", "C", "D", "E"]);

    for entry in &result.distribution {
        assert!(entry.match_pool_percentage <= 25.0 + 1e-9);
    }
    assert!(matched_total(&result) <= U256::from(777 * WEI));
}

#[test]
fn test_zero_contribution_round() {
    let result = distribute(&round(1000), &[], &["A"]);

    assert!(result.distribution.is_empty());
    assert!(!result.is_saturated);
    assert_eq!(result.unallocated_amount, TokenAmount::from_u128(1000 * WEI));
    assert_eq!(result.unallocated_percentage, 100.0);
}

#[test]
fn test_breadth_beats_concentration() {
    let mut tips: Vec<Contribution> = (0..10).map(|i| tip(i, i as u8 + 1, "A", 10)).collect();
    tips.push(tip(10, 50, "B", 100));

    let result = distribute(&round(1000), &tips, &["A", "B"]);

    let a = &result.distribution[0];
    let b = &result.distribution[1];
    assert_eq!(a.total_contributions_usd, b.total_contributions_usd);
    assert!(a.qf_score > b.qf_score);
    assert!(a.match_amount_token > b.match_amount_token);
}

#[test]
fn test_deterministic_under_permutation() {
    let registry = registry(&["A", "B", "C"]);
    let params = round(1000).with_cap(40.0);
    let forward = scenario();
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut rotated = forward.clone();
    rotated.rotate_left(2);

    let run = |tips: &[Contribution]| {
        let result = compute_distribution(&params, tips, &registry, &dollar_prices()).unwrap();
        serde_json::to_string(&result).unwrap()
    };

    let expected = run(&forward);
    for permuted in [reversed, rotated] {
        let actual = run(&permuted);
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_unresolved_price_counts_as_zero_and_is_reported() {
    let other = Address::repeat_byte(0x77);
    let mut unpriced = tip(1, 2, "B", 50);
    unpriced.token = other;

    let mut prices = dollar_prices();
    prices.insert(other, PriceResolution::unresolved("no market"));

    let result = compute_distribution(
        &round(100),
        &[tip(0, 1, "A", 16), unpriced],
        &registry(&["A", "B"]),
        &prices,
    )
    .unwrap();

    let b = &result.distribution[1];
    assert_eq!(b.total_contributions_usd, None);
    assert_eq!(b.qf_score, 0.0);
    assert_eq!(b.unpriced_contributions_count, 1);
    assert_eq!(b.match_amount_token, TokenAmount::ZERO);
    assert_eq!(result.distribution[0].match_pool_percentage, 100.0);
    assert_eq!(result.diagnostics.unpriced_contributions, 1);
    assert_eq!(result.diagnostics.unresolved_tokens, vec![checksum(&other)]);
}

#[test]
fn test_unresolved_pool_price_nulls_usd_figures() {
    let prices = PriceTable::from([(pool_token(), PriceResolution::unresolved("down"))]);
    let result = compute_distribution(
        &round(100),
        &[tip(0, 1, "A", 1)],
        &registry(&["A"]),
        &prices,
    )
    .unwrap();

    assert_eq!(result.matching_pool_usd, None);
    assert_eq!(result.distribution[0].match_amount_usd, None);
    assert_eq!(result.distribution[0].total_contributions_usd, None);
    assert!(result.distribution.iter().all(|e| e.match_amount_token.is_zero()));
    assert_eq!(result.unallocated_percentage, 100.0);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["matchingPoolUSD"].is_null());
    assert!(json["distribution"][0]["matchAmountInUSD"].is_null());
}

#[test]
fn test_unapproved_projects_excluded() {
    let stranger = tip(3, 9, "Z", 1_000);
    let tips = vec![tip(0, 1, "A", 4), stranger];

    let result = distribute(&round(100), &tips, &["A"]);

    assert_eq!(result.distribution.len(), 1);
    assert_eq!(result.distribution[0].project_id, ProjectId::new("A"));
    assert_eq!(result.distribution[0].match_pool_percentage, 100.0);
    assert_eq!(result.diagnostics.discarded_contributions, 1);
}

#[test]
fn test_zero_amount_tips_are_skipped() {
    let tips = vec![tip(0, 1, "A", 4), tip(1, 2, "A", 0), tip(2, 3, "B", 0)];
    let registry = registry(&["A", "B"]);

    let result = compute_distribution(&round(100), &tips, &registry, &dollar_prices()).unwrap();

    assert_eq!(result.distribution.len(), 1);
    let a = &result.distribution[0];
    assert_eq!(a.unique_contributors_count, 1);
    assert_eq!(a.contributions_count, 1);
    assert_eq!(result.diagnostics.zero_amount_contributions, 2);
    assert_eq!(result.diagnostics.discarded_contributions, 0);
    assert_eq!(result.total_matched(), Some(TokenAmount::from_u128(100 * WEI)));
}

#[test]
fn test_output_is_camel_case_and_checksummed() {
    let result = distribute(&round(10), &[tip(0, 1, "A", 1)], &["A"]);
    let json = serde_json::to_value(&result).unwrap();
    let entry = &json["distribution"][0];

    assert_eq!(entry["projectId"], "A");
    assert_eq!(entry["projectPayoutAddress"], checksum(&payout("A")));
    assert_eq!(entry["matchAmountInToken"], (10 * WEI).to_string());
    assert!(json["isSaturated"].is_boolean());
    assert!(json["diagnostics"]["discardedContributions"].is_number());
    assert!(json["diagnostics"]["zeroAmountContributions"].is_number());
}

#[test]
fn test_zero_cap_allocates_nothing() {
    let result = compute_distribution(
        &round(100).with_cap(0.0),
        &[tip(0, 1, "A", 1)],
        &registry(&["A"]),
        &dollar_prices(),
    )
    .unwrap();
    assert!(result.is_saturated);
    assert!(result.distribution[0].match_amount_token.is_zero());
    assert_eq!(result.unallocated_amount, TokenAmount::from_u128(100 * WEI));
}

#[test]
fn test_invalid_cap_is_validation_error() {
    assert_matches!(
        compute_distribution(
            &round(1).with_cap(150.0),
            &[],
            &ProjectRegistry::new(),
            &dollar_prices()
        ),
        Err(MatchingError::Validation(_))
    );
}
