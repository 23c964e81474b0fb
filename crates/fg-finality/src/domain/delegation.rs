//! BTC delegations and the active-delegation rule

use serde::{Deserialize, Serialize};

/// A BTC stake delegation as reported by the staking chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// BTC height the staking tx was included at
    pub start_height: u64,
    /// BTC height the staking timelock expires at
    pub end_height: u64,
    /// Staked amount in satoshis
    pub total_sat: u64,
    /// Number of covenant committee signatures collected
    pub covenant_signature_count: u32,
}

/// Staking chain parameters the active rule depends on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    /// k-deep confirmation requirement
    pub btc_confirmation_depth: u64,
    pub covenant_quorum: u32,
}

/// Snapshot of everything needed to decide whether delegations are active
///
/// Built once per query so the parameters cannot drift between delegations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationView {
    pub latest_btc_height: u64,
    pub params: StakingParams,
}

impl ActivationView {
    pub fn new(latest_btc_height: u64, params: StakingParams) -> Self {
        Self {
            latest_btc_height,
            params,
        }
    }

    /// Height at which the staking tx becomes k-deep
    pub fn confirmation_height(&self, delegation: &Delegation) -> u64 {
        delegation
            .start_height
            .saturating_add(self.params.btc_confirmation_depth)
    }

    /// A delegation is active once its staking tx is k-deep, its timelock
    /// outlives that point, and the covenant committee signed it.
    pub fn is_active(&self, delegation: &Delegation) -> bool {
        let confirmation_height = self.confirmation_height(delegation);
        self.latest_btc_height > confirmation_height
            && delegation.end_height > confirmation_height
            && delegation.covenant_signature_count > self.params.covenant_quorum
    }

    /// Stake this delegation contributes, zero when inactive
    pub fn active_stake(&self, delegation: &Delegation) -> u64 {
        if self.is_active(delegation) {
            delegation.total_sat
        } else {
            0
        }
    }

    /// Confirmation height of an active delegation
    pub fn active_since(&self, delegation: &Delegation) -> Option<u64> {
        self.is_active(delegation)
            .then(|| self.confirmation_height(delegation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StakingParams {
        StakingParams {
            btc_confirmation_depth: 6,
            covenant_quorum: 2,
        }
    }

    fn delegation(start: u64, end: u64, sigs: u32) -> Delegation {
        Delegation {
            start_height: start,
            end_height: end,
            total_sat: 50_000,
            covenant_signature_count: sigs,
        }
    }

    #[test]
    fn test_active_delegation() {
        let view = ActivationView::new(200, params());
        let del = delegation(100, 1_000, 3);
        assert_eq!(view.confirmation_height(&del), 106);
        assert!(view.is_active(&del));
        assert_eq!(view.active_stake(&del), 50_000);
        assert_eq!(view.active_since(&del), Some(106));
    }

    #[test]
    fn test_not_deep_enough() {
        // tip must be strictly above start + k
        let view = ActivationView::new(106, params());
        assert!(!view.is_active(&delegation(100, 1_000, 3)));
        let view = ActivationView::new(107, params());
        assert!(view.is_active(&delegation(100, 1_000, 3)));
    }

    #[test]
    fn test_expired_before_confirmation() {
        let view = ActivationView::new(500, params());
        assert!(!view.is_active(&delegation(100, 106, 3)));
        assert!(view.is_active(&delegation(100, 107, 3)));
    }

    #[test]
    fn test_covenant_quorum_is_strict() {
        let view = ActivationView::new(500, params());
        assert!(!view.is_active(&delegation(100, 1_000, 2)));
        assert_eq!(view.active_stake(&delegation(100, 1_000, 2)), 0);
        assert_eq!(view.active_since(&delegation(100, 1_000, 2)), None);
    }

    #[test]
    fn test_confirmation_height_saturates() {
        let view = ActivationView::new(u64::MAX, params());
        assert_eq!(view.confirmation_height(&delegation(u64::MAX - 1, u64::MAX, 3)), u64::MAX);
        assert!(!view.is_active(&delegation(u64::MAX - 1, u64::MAX, 3)));
    }
}
