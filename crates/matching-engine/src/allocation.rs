//! Pool allocation: quadratic scores, capped shares, token denomination

use common::{TokenAmount, U256};

use crate::domain::ascending_sum;

/// Fixed-point scale for share weights
pub const WEIGHT_SCALE: u128 = 1_000_000_000_000_000_000;

/// `(Σ sqrt(total_c))²` with the square roots summed in ascending order
pub fn qf_score(contributor_totals: &[f64]) -> f64 {
    let root_sum = ascending_sum(contributor_totals.iter().map(|usd| usd.max(0.0).sqrt()));
    root_sum * root_sum
}

/// Pool shares after cap enforcement
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Fractions of the pool, aligned with the input scores
    pub shares: Vec<f64>,
    pub capped: Vec<bool>,
    /// Fraction of the pool no project receives
    pub unallocated: f64,
}

impl Allocation {
    pub fn is_saturated(&self) -> bool {
        self.capped.iter().any(|c| *c)
    }
}

/// Proportional shares with water-filling under `cap` (a fraction in [0, 1]).
///
/// Shares above the cap are clamped and the freed mass is spread over the
/// remaining projects in proportion to their scores, repeating until nothing
/// exceeds the cap. Whatever cannot be absorbed stays unallocated.
pub fn allocate(scores: &[f64], cap: Option<f64>) -> Allocation {
    let n = scores.len();
    let mut shares = vec![0.0; n];
    let mut capped = vec![false; n];

    let total = ascending_sum(scores.iter().copied());
    if total <= 0.0 {
        return Allocation {
            shares,
            capped,
            unallocated: 1.0,
        };
    }

    let Some(cap) = cap else {
        for (share, score) in shares.iter_mut().zip(scores) {
            *share = score / total;
        }
        return Allocation {
            shares,
            capped,
            unallocated: 0.0,
        };
    };

    loop {
        let clamped = capped.iter().filter(|c| **c).count();
        let remaining = (1.0 - clamped as f64 * cap).max(0.0);
        let free_score = ascending_sum(
            scores
                .iter()
                .zip(&capped)
                .filter(|(_, c)| !**c)
                .map(|(s, _)| *s),
        );
        if free_score <= 0.0 {
            break;
        }

        let mut newly_capped = false;
        for i in 0..n {
            if capped[i] {
                continue;
            }
            let tentative = remaining * scores[i] / free_score;
            if tentative > cap {
                capped[i] = true;
                newly_capped = true;
            }
        }

        if !newly_capped {
            for i in 0..n {
                if !capped[i] {
                    shares[i] = remaining * scores[i] / free_score;
                }
            }
            break;
        }
    }

    for i in 0..n {
        if capped[i] {
            shares[i] = cap;
        }
    }

    let unallocated = if capped.iter().any(|c| *c) {
        (1.0 - ascending_sum(shares.iter().copied())).max(0.0)
    } else {
        0.0
    };

    Allocation {
        shares,
        capped,
        unallocated,
    }
}

/// Share as a fixed-point weight out of [`WEIGHT_SCALE`]
pub fn weight(share: f64) -> u128 {
    (share.clamp(0.0, 1.0) * WEIGHT_SCALE as f64).round() as u128
}

/// `⌊pool × w / denominator⌋` without overflowing 256 bits.
///
/// Splits `pool = q·d + r` so the product never exceeds `pool` (given `w ≤ d`).
pub fn pro_rata(pool: TokenAmount, w: u128, denominator: u128) -> TokenAmount {
    if denominator == 0 || w == 0 {
        return TokenAmount::ZERO;
    }
    let d = U256::from(denominator);
    let w = U256::from(w);
    let pool = pool.as_u256();
    let q = pool / d;
    let r = pool % d;
    TokenAmount::new(q.saturating_mul(w).saturating_add(r * w / d))
}

/// Matched token per project.
///
/// When nothing is left unallocated by policy the weights are normalised by
/// their own sum, so only per-project flooring dust remains.
pub fn denominate(pool: TokenAmount, allocation: &Allocation) -> Vec<TokenAmount> {
    let weights: Vec<u128> = allocation.shares.iter().map(|s| weight(*s)).collect();
    let weight_sum: u128 = weights.iter().sum();

    let denominator = if allocation.is_saturated() || allocation.unallocated > 0.0 {
        weight_sum.max(WEIGHT_SCALE)
    } else {
        weight_sum
    };

    weights
        .into_iter()
        .map(|w| pro_rata(pool, w, denominator))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_qf_score() {
        assert_eq!(qf_score(&[400.0]), 400.0);
        assert_eq!(qf_score(&[25.0, 25.0, 25.0, 25.0]), 400.0);
        assert_eq!(qf_score(&[]), 0.0);
        assert_eq!(qf_score(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_uncapped_shares_are_proportional() {
        let allocation = allocate(&[400.0, 400.0, 100.0], None);
        assert!(close(allocation.shares[0], 4.0 / 9.0));
        assert!(close(allocation.shares[2], 1.0 / 9.0));
        assert!(!allocation.is_saturated());
        assert_eq!(allocation.unallocated, 0.0);
    }

    #[test]
    fn test_water_filling_redistributes() {
        // 60/30/10 with a 50% cap: 60 is clamped, 50% is left for 30 and 10
        let allocation = allocate(&[60.0, 30.0, 10.0], Some(0.5));
        assert!(allocation.capped[0]);
        assert!(close(allocation.shares[0], 0.5));
        assert!(close(allocation.shares[1], 0.375));
        assert!(close(allocation.shares[2], 0.125));
        assert!(close(allocation.unallocated, 0.0));
    }

    #[test]
    fn test_every_project_capped_leaves_remainder() {
        let allocation = allocate(&[400.0, 400.0, 100.0], Some(0.2));
        assert_eq!(allocation.capped, vec![true, true, true]);
        assert!(allocation.shares.iter().all(|s| *s == 0.2));
        assert!(close(allocation.unallocated, 0.4));
    }

    #[test]
    fn test_zero_scores_allocate_nothing() {
        let allocation = allocate(&[0.0, 0.0], Some(0.5));
        assert_eq!(allocation.shares, vec![0.0, 0.0]);
        assert_eq!(allocation.unallocated, 1.0);
        assert!(!allocation.is_saturated());
    }

    #[test]
    fn test_equal_scores_equal_shares() {
        let allocation = allocate(&[7.0, 7.0, 7.0], Some(0.3));
        assert_eq!(allocation.shares[0], allocation.shares[1]);
        assert_eq!(allocation.shares[1], allocation.shares[2]);
    }

    #[test]
    fn test_pro_rata_handles_huge_pools() {
        let pool = TokenAmount::new(U256::MAX);
        let half = pro_rata(pool, WEIGHT_SCALE / 2, WEIGHT_SCALE);
        assert_eq!(half.as_u256(), U256::MAX / U256::from(2u8));
    }

    #[test]
    fn test_denominate_conserves_pool() {
        let pool = TokenAmount::from_u128(1_000);
        let allocation = allocate(&[1.0, 1.0, 1.0], None);
        let matched = denominate(pool, &allocation);
        let total: u128 = matched.iter().map(|m| u128::try_from(m.as_u256()).unwrap()).sum();
        assert!(total <= 1_000);
        assert!(1_000 - total < 3);
    }

    #[test]
    fn test_denominate_saturated_leaves_remainder() {
        let pool = TokenAmount::from_u128(1_000);
        let allocation = allocate(&[400.0, 400.0, 100.0], Some(0.2));
        let matched = denominate(pool, &allocation);
        assert_eq!(matched, vec![TokenAmount::from_u128(200); 3]);
    }
}
