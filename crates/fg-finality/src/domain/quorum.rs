//! Two-thirds quorum rule

use serde::{Deserialize, Serialize};

/// Outcome of weighing the votes for one block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuorumOutcome {
    /// Voted power reached two thirds of the total
    Finalized,
    /// Votes fell short
    NotFinalized,
    /// The committee holds no power at all
    NoQuorumPossible,
}

impl QuorumOutcome {
    pub fn is_finalized(self) -> bool {
        self == QuorumOutcome::Finalized
    }

    /// Label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            QuorumOutcome::Finalized => "finalized",
            QuorumOutcome::NotFinalized => "not_finalized",
            QuorumOutcome::NoQuorumPossible => "no_quorum",
        }
    }
}

/// Decide finality for `voted_power` out of `total_power`
///
/// INVARIANT: finalized iff `3 * voted >= 2 * total`, evaluated in u128.
pub fn evaluate(total_power: u64, voted_power: u64) -> QuorumOutcome {
    if total_power == 0 {
        return QuorumOutcome::NoQuorumPossible;
    }
    if u128::from(voted_power) * 3 >= u128::from(total_power) * 2 {
        QuorumOutcome::Finalized
    } else {
        QuorumOutcome::NotFinalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_total() {
        assert_eq!(evaluate(0, 0), QuorumOutcome::NoQuorumPossible);
        assert_eq!(evaluate(0, 500), QuorumOutcome::NoQuorumPossible);
    }

    #[test]
    fn test_threshold_table() {
        // pk1:100, pk2:300
        assert_eq!(evaluate(400, 0), QuorumOutcome::NotFinalized);
        assert_eq!(evaluate(400, 100), QuorumOutcome::NotFinalized);
        assert_eq!(evaluate(400, 300), QuorumOutcome::Finalized);
        assert_eq!(evaluate(400, 400), QuorumOutcome::Finalized);
        // exactly two thirds
        assert_eq!(evaluate(300, 200), QuorumOutcome::Finalized);
        assert_eq!(evaluate(300, 199), QuorumOutcome::NotFinalized);
    }

    #[test]
    fn test_no_overflow_near_max() {
        assert_eq!(evaluate(u64::MAX, u64::MAX), QuorumOutcome::Finalized);
        assert_eq!(
            evaluate(u64::MAX, u64::MAX / 3 * 2 - 1),
            QuorumOutcome::NotFinalized
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert!(QuorumOutcome::Finalized.is_finalized());
        assert!(!QuorumOutcome::NoQuorumPossible.is_finalized());
        assert_eq!(QuorumOutcome::NotFinalized.as_str(), "not_finalized");
    }

    proptest! {
        #[test]
        fn prop_zero_total_never_quorum(voted in any::<u64>()) {
            prop_assert_eq!(evaluate(0, voted), QuorumOutcome::NoQuorumPossible);
        }

        #[test]
        fn prop_two_thirds_rule(total in 1u64.., fraction in 0.0f64..=1.0) {
            let voted = ((total as f64) * fraction) as u64;
            let voted = voted.min(total);
            let expected = 3 * (voted as u128) >= 2 * (total as u128);
            prop_assert_eq!(evaluate(total, voted).is_finalized(), expected);
        }

        #[test]
        fn prop_more_votes_never_hurt(total in 1u64..1_000_000, a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            if evaluate(total, low).is_finalized() {
                prop_assert!(evaluate(total, high).is_finalized());
            }
        }
    }
}
