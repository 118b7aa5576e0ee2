// Params and results for every RPC method exposed by the daemon.
// Field names follow the platform's JSON convention (camelCase).

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    account::Account,
    chain::{ChainId, TxHash, WalletAddress},
    ledger::{
        BatchId, CampaignId, DistributionBatch, PostId, RewardTransaction, TransactionStatus,
        TransactionType, TxId, UserId,
    },
    referral::ReferralTier,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountParams {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountResult {
    pub account: Account,
    /// Signup bonus credited at registration (atomic units)
    pub signup_bonus: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWalletAddressParams {
    pub user_id: UserId,
    pub wallet_address: WalletAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBalanceParams {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBalanceResult {
    pub balance: u64,
    pub total_earned: u64,
    pub total_withdrawn: u64,
    /// Reserved withdrawals awaiting batch settlement
    pub pending_withdrawals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardParams {
    pub user_id: UserId,
    pub post_id: PostId,
    pub kind: TransactionType,
    /// Reward amount funded by the campaign (atomic units)
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardResult {
    pub reward: RewardTransaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWithdrawalParams {
    pub user_id: UserId,
    pub amount: u64,
    /// Connected wallet override; falls back to the linked address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WithdrawalStatus {
    /// Reserved, waiting for the next batch run
    Queued,
    /// Settled synchronously through the fast path
    Distributed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWithdrawalResult {
    pub status: WithdrawalStatus,
    pub tx_id: TxId,
    pub amount: u64,
    pub wallet_address: WalletAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionParams {
    pub id: TxId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHistoryParams {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHistoryResult {
    pub transactions: Vec<RewardTransaction>,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,
}

/// Per-withdrawal outcome of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionOutcome {
    pub tx_id: TxId,
    pub user_id: UserId,
    pub amount: u64,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeResult {
    /// Withdrawals claimed by this run
    pub processed: usize,
    pub distributed: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<DistributionOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropParams {
    pub user_ids: Vec<UserId>,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropOutcome {
    pub user_id: UserId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<TxId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropResult {
    pub credited: usize,
    pub failed: usize,
    pub results: Vec<AirdropOutcome>,
}

/// Owned view of a referral tier for API consumers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TierInfo {
    pub label: String,
    pub min_referrals: u32,
    pub rate_bps: u16,
    pub bonus: u64,
}

impl From<&ReferralTier> for TierInfo {
    fn from(tier: &ReferralTier) -> Self {
        Self {
            label: tier.label.to_string(),
            min_referrals: tier.min_referrals,
            rate_bps: tier.rate_bps,
            bonus: tier.bonus,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetReferralStatsParams {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatsResult {
    pub referral_count: u32,
    pub tier: TierInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<TierInfo>,
    /// Display-only progress towards the next tier, 0-100
    pub progress_to_next: u32,
    /// Lifetime referral bonus earnings (atomic units)
    pub total_referral_earnings: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetReferralLeaderboardParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub referral_count: u32,
    pub tier_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetReferralTiersResult {
    pub tiers: Vec<TierInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBatchParams {
    pub id: BatchId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBatchesParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBatchesResult {
    pub batches: Vec<DistributionBatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionStatusResult {
    /// False when the chain integration is not configured
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<WalletAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    /// Withdrawals currently waiting for a batch
    pub pending_withdrawals: u32,
    /// Seconds between scheduled runs, 0 when the scheduler is off
    pub interval_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_encoding() {
        let params = GetHistoryParams {
            user_id: "u1".to_string(),
            kind: Some(TransactionType::AdView),
            skip: None,
            limit: Some(10),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["kind"], "ad-view");
        assert_eq!(json["limit"], 10);
        assert!(json.get("skip").is_none());
    }

    #[test]
    fn test_withdrawal_status_encoding() {
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Queued).unwrap(),
            "\"queued\""
        );
    }
}
