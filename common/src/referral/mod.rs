// Referral tier configuration and lookup.
//
// Tiers are a static ascending table keyed by minimum referral count. A
// referrer sits in the highest tier whose threshold their count meets. The
// rate is skimmed from every reward their referred users earn; the bonus is
// paid once, when the count first reaches the tier threshold.

use serde::Serialize;

use crate::config::COIN_VALUE;

/// Reward rate denominator: rates are expressed in basis points (100 = 1%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// A referral bonus bracket.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTier {
    /// Referral count needed to enter this tier
    pub min_referrals: u32,
    /// Skim rate on referred users' earnings, in basis points
    pub rate_bps: u16,
    /// One-time bonus paid when the threshold is first reached (atomic units)
    pub bonus: u64,
    pub label: &'static str,
}

impl ReferralTier {
    /// Referrer share of a referred user's reward, floored
    pub fn skim(&self, amount: u64) -> u64 {
        // u128 to survive amount * rate overflow on large airdrops
        ((amount as u128 * self.rate_bps as u128) / BPS_DENOMINATOR as u128) as u64
    }
}

/// Ascending tier table. `tier_for` relies on the ordering: last match wins.
pub const REFERRAL_TIERS: [ReferralTier; 5] = [
    ReferralTier {
        min_referrals: 0,
        rate_bps: 500,
        bonus: 0,
        label: "Bronze",
    },
    ReferralTier {
        min_referrals: 5,
        rate_bps: 700,
        bonus: 50 * COIN_VALUE,
        label: "Silver",
    },
    ReferralTier {
        min_referrals: 15,
        rate_bps: 1000,
        bonus: 150 * COIN_VALUE,
        label: "Gold",
    },
    ReferralTier {
        min_referrals: 30,
        rate_bps: 1200,
        bonus: 400 * COIN_VALUE,
        label: "Platinum",
    },
    ReferralTier {
        min_referrals: 60,
        rate_bps: 1500,
        bonus: 1000 * COIN_VALUE,
        label: "Diamond",
    },
];

/// Current tier for a referral count: highest threshold met
pub fn tier_for(referral_count: u32) -> &'static ReferralTier {
    let mut current = &REFERRAL_TIERS[0];
    for tier in REFERRAL_TIERS.iter() {
        if referral_count >= tier.min_referrals {
            current = tier;
        }
    }
    current
}

/// First tier strictly above the count, None at the top
pub fn next_tier_for(referral_count: u32) -> Option<&'static ReferralTier> {
    REFERRAL_TIERS
        .iter()
        .find(|tier| tier.min_referrals > referral_count)
}

/// Tier entered by moving from `previous` to `current` referrals, if any.
/// Used to pay the one-time bonus exactly once per threshold.
pub fn crossed_tier(previous: u32, current: u32) -> Option<&'static ReferralTier> {
    REFERRAL_TIERS
        .iter()
        .find(|tier| tier.min_referrals > previous && tier.min_referrals <= current)
}

/// Display-only progress towards the next tier, 0-100
pub fn progress_to_next(referral_count: u32) -> u32 {
    match next_tier_for(referral_count) {
        Some(next) => {
            let count = referral_count as u64;
            let target = next.min_referrals as u64;
            ((count * 100 + target / 2) / target) as u32
        }
        None => 100,
    }
}
