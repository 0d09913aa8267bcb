//! C1: pure, side-effect-free round arithmetic (spec §4.1).
//!
//! Every function here is a closed-form computation over `Height`/`RoundId`.
//! None of them read or write any store — that is what lets `RoundEngine`
//! call them identically on the forward and backward path.

use ippan_round_types::{Height, RoundId};

/// `r = ceil(h / n)`, computed without floating point.
pub fn round_of(height: Height, active_delegates: u32) -> RoundId {
    let n = active_delegates as u64;
    (height + n - 1) / n
}

pub fn first_in_round(round: RoundId, active_delegates: u32) -> Height {
    (round - 1) * active_delegates as u64 + 1
}

pub fn last_in_round(round: RoundId, active_delegates: u32) -> Height {
    round * active_delegates as u64
}

/// Spec §4.1: a height ends its round either because the next height falls
/// into a different round, or because it is the genesis block (height 1),
/// which is its own round-finishing event regardless of `active_delegates`.
pub fn is_round_end(height: Height, active_delegates: u32) -> bool {
    height == 1 || round_of(height, active_delegates) != round_of(height + 1, active_delegates)
}

/// `per_delegate = floor(total_fees / n)`, `remainder = total_fees - per_delegate * n`.
/// The remainder is awarded to the round's last forger (spec §4.1).
pub fn split_fees(total_fees: i64, n: usize) -> (i64, i64) {
    if n == 0 {
        return (0, total_fees);
    }
    let n = n as i64;
    let per_delegate = total_fees.div_euclid(n);
    let remainder = total_fees - per_delegate * n;
    (per_delegate, remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: u32 = 101;

    #[test]
    fn round_of_matches_ceiling_division() {
        assert_eq!(round_of(1, N), 1);
        assert_eq!(round_of(101, N), 1);
        assert_eq!(round_of(102, N), 2);
        assert_eq!(round_of(202, N), 2);
        assert_eq!(round_of(203, N), 3);
    }

    #[test]
    fn first_and_last_in_round_bracket_the_round() {
        assert_eq!(first_in_round(1, N), 1);
        assert_eq!(last_in_round(1, N), 101);
        assert_eq!(first_in_round(2, N), 102);
        assert_eq!(last_in_round(2, N), 202);
    }

    #[test]
    fn genesis_height_is_always_a_round_end() {
        assert!(is_round_end(1, N));
    }

    #[test]
    fn round_end_only_at_last_height_of_round() {
        assert!(!is_round_end(100, N));
        assert!(is_round_end(101, N));
        assert!(!is_round_end(102, N));
    }

    #[test]
    fn split_fees_remainder_matches_spec_scenario_3() {
        let (per, remainder) = split_fees(10_000_000, 101);
        assert_eq!(per, 99_009);
        assert_eq!(remainder, 91);
        assert_eq!(per * 101 + remainder, 10_000_000);
    }

    #[test]
    fn split_fees_exact_division_has_zero_remainder() {
        let (per, remainder) = split_fees(101 * 37, 101);
        assert_eq!(per, 37);
        assert_eq!(remainder, 0);
    }

    proptest::proptest! {
        #[test]
        fn split_fees_conserves_total(total in 0i64..1_000_000_000, n in 1usize..500) {
            let (per, remainder) = split_fees(total, n);
            proptest::prop_assert_eq!(per * n as i64 + remainder, total);
            proptest::prop_assert!(remainder >= 0 && remainder < n as i64);
        }
    }
}
