// Referral aggregation storage provider trait

use async_trait::async_trait;

use crate::core::error::CoreError;
use pulse_common::ledger::UserId;

/// Read-side aggregations over referral linkage
#[async_trait]
pub trait ReferralProvider {
    /// Top referrers by cached referral count, descending
    async fn get_referral_leaderboard(
        &self,
        limit: usize,
    ) -> Result<Vec<(UserId, u32)>, CoreError>;

    /// Lifetime sum of a user's referral bonus credits
    async fn sum_referral_earnings(&self, user: &UserId) -> Result<u64, CoreError>;
}
