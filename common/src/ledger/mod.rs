// Ledger entry and distribution batch data structures.
//
// A RewardTransaction is an immutable ledger entry: amounts are absolute
// atomic units, the type carries the direction (Withdrawal debits, everything
// else credits). Once a transaction reaches Distributed or Failed it is
// terminal and no further mutation is accepted.

mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    chain::{ChainId, TxHash, WalletAddress},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

/// Platform user identifier (owned by the upstream user directory)
pub type UserId = String;
/// Post identifier attached to view/engagement claims
pub type PostId = String;
/// Ad campaign identifier
pub type CampaignId = String;
/// Monotonic ledger entry identifier
pub type TxId = u64;
/// Monotonic distribution batch identifier
pub type BatchId = u64;

/// Kind of a ledger entry.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransactionType {
    /// Reward for viewing a sponsored post
    AdView,
    /// Reward for engaging with a sponsored post
    AdEngagement,
    /// Bonus credited to a referrer
    ReferralBonus,
    /// User withdrawal towards the settlement chain
    Withdrawal,
    /// Admin-triggered bulk credit
    Airdrop,
    /// One-time bonus at account registration
    SignupBonus,
}

impl TransactionType {
    /// Withdrawals debit the balance, everything else credits it
    pub fn is_credit(&self) -> bool {
        !matches!(self, Self::Withdrawal)
    }

    /// Claim types requiring a post id and an idempotency key
    pub fn requires_post(&self) -> bool {
        matches!(self, Self::AdView | Self::AdEngagement)
    }

    /// Stable discriminant used in storage encoding and claim keys
    pub fn id(&self) -> u8 {
        match self {
            Self::AdView => 0,
            Self::AdEngagement => 1,
            Self::ReferralBonus => 2,
            Self::Withdrawal => 3,
            Self::Airdrop => 4,
            Self::SignupBonus => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::AdView,
            1 => Self::AdEngagement,
            2 => Self::ReferralBonus,
            3 => Self::Withdrawal,
            4 => Self::Airdrop,
            5 => Self::SignupBonus,
            _ => return None,
        })
    }
}

impl Serializer for TransactionType {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(self.id());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Self::from_id(reader.read_u8()?).ok_or(ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        1
    }
}

/// Lifecycle of a ledger entry.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransactionStatus {
    /// Created, not yet committed
    Pending,
    /// Committed; for withdrawals: reserved, awaiting batch settlement
    Confirmed,
    /// Settled on-chain
    Distributed,
    /// Settlement failed, reservation rolled back
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Distributed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Confirmed) => true,
            (Self::Pending, Self::Failed) => true,
            (Self::Confirmed, Self::Distributed) => true,
            (Self::Confirmed, Self::Failed) => true,
            _ => false,
        }
    }

    fn id(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Distributed => 2,
            Self::Failed => 3,
        }
    }

    fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Pending,
            1 => Self::Confirmed,
            2 => Self::Distributed,
            3 => Self::Failed,
            _ => return None,
        })
    }
}

impl Serializer for TransactionStatus {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(self.id());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Self::from_id(reader.read_u8()?).ok_or(ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        1
    }
}

/// An immutable ledger entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardTransaction {
    /// Ledger entry id
    pub id: TxId,
    /// Owning user
    pub user_id: UserId,
    /// Entry kind
    pub kind: TransactionType,
    /// Absolute amount in atomic units
    pub amount: u64,
    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Post that triggered the claim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    /// Campaign that funded the reward
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    /// The referred user whose earning triggered this bonus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_user_id: Option<UserId>,
    /// Referral rate applied at issuance time (basis points)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_rate_bps: Option<u16>,
    /// Current lifecycle status
    pub status: TransactionStatus,
    /// Distribution batch settling this withdrawal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    /// Settlement transaction hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Withdrawal destination address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl RewardTransaction {
    /// Create a credit entry, committed immediately
    pub fn new_credit(
        id: TxId,
        user_id: UserId,
        kind: TransactionType,
        amount: u64,
        timestamp: TimestampMillis,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            amount,
            description: None,
            post_id: None,
            campaign_id: None,
            source_user_id: None,
            referral_rate_bps: None,
            status: TransactionStatus::Confirmed,
            batch_id: None,
            tx_hash: None,
            wallet_address: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Create a withdrawal entry, reserved and queued for batch settlement
    pub fn new_withdrawal(
        id: TxId,
        user_id: UserId,
        amount: u64,
        wallet_address: WalletAddress,
        timestamp: TimestampMillis,
    ) -> Self {
        Self {
            id,
            user_id,
            kind: TransactionType::Withdrawal,
            amount,
            description: None,
            post_id: None,
            campaign_id: None,
            source_user_id: None,
            referral_rate_bps: None,
            status: TransactionStatus::Confirmed,
            batch_id: None,
            tx_hash: None,
            wallet_address: Some(wallet_address),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Transition to a new status, rejecting moves out of a terminal state
    pub fn set_status(
        &mut self,
        status: TransactionStatus,
        timestamp: TimestampMillis,
    ) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(status) {
            return Err(LedgerError::InvalidTransactionTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.updated_at = timestamp;
        Ok(())
    }

    /// Attach this withdrawal to a distribution batch
    pub fn attach_batch(&mut self, batch_id: BatchId, timestamp: TimestampMillis) {
        self.batch_id = Some(batch_id);
        self.updated_at = timestamp;
    }

    /// Mark as settled on-chain with the batch transaction hash
    pub fn mark_distributed(
        &mut self,
        tx_hash: TxHash,
        timestamp: TimestampMillis,
    ) -> Result<(), LedgerError> {
        self.set_status(TransactionStatus::Distributed, timestamp)?;
        self.tx_hash = Some(tx_hash);
        Ok(())
    }
}

impl Serializer for RewardTransaction {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.id);
        self.user_id.write(writer);
        self.kind.write(writer);
        writer.write_u64(&self.amount);
        self.description.write(writer);
        self.post_id.write(writer);
        self.campaign_id.write(writer);
        self.source_user_id.write(writer);
        self.referral_rate_bps.write(writer);
        self.status.write(writer);
        self.batch_id.write(writer);
        self.tx_hash.write(writer);
        self.wallet_address.write(writer);
        writer.write_u64(&self.created_at);
        writer.write_u64(&self.updated_at);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            id: reader.read_u64()?,
            user_id: String::read(reader)?,
            kind: TransactionType::read(reader)?,
            amount: reader.read_u64()?,
            description: Option::read(reader)?,
            post_id: Option::read(reader)?,
            campaign_id: Option::read(reader)?,
            source_user_id: Option::read(reader)?,
            referral_rate_bps: Option::read(reader)?,
            status: TransactionStatus::read(reader)?,
            batch_id: Option::read(reader)?,
            tx_hash: Option::read(reader)?,
            wallet_address: Option::read(reader)?,
            created_at: reader.read_u64()?,
            updated_at: reader.read_u64()?,
        })
    }

    fn size(&self) -> usize {
        8 + self.user_id.size()
            + self.kind.size()
            + 8
            + self.description.size()
            + self.post_id.size()
            + self.campaign_id.size()
            + self.source_user_id.size()
            + self.referral_rate_bps.size()
            + self.status.size()
            + self.batch_id.size()
            + self.tx_hash.size()
            + self.wallet_address.size()
            + 8
            + 8
    }
}

/// Lifecycle of a distribution batch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BatchStatus {
    /// Batch created, claim recorded
    Pending,
    /// On-chain submission in flight
    Processing,
    /// Settled on-chain
    Confirmed,
    /// Submission failed, reservations rolled back
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing) => true,
            (Self::Pending, Self::Failed) => true,
            (Self::Processing, Self::Confirmed) => true,
            (Self::Processing, Self::Failed) => true,
            _ => false,
        }
    }

    fn id(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Confirmed => 2,
            Self::Failed => 3,
        }
    }

    fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Pending,
            1 => Self::Processing,
            2 => Self::Confirmed,
            3 => Self::Failed,
            _ => return None,
        })
    }
}

impl Serializer for BatchStatus {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(self.id());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Self::from_id(reader.read_u8()?).ok_or(ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        1
    }
}

/// A group of withdrawals settled together in one on-chain transfer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBatch {
    pub id: BatchId,
    /// Settlement transaction hash, unique once set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Token contract the transfer goes through
    pub contract: WalletAddress,
    pub chain_id: ChainId,
    /// Sum of the constituent withdrawal amounts
    pub total_amount: u64,
    /// Number of constituent withdrawals
    pub recipient_count: u32,
    pub status: BatchStatus,
    /// Error message when the batch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: TimestampMillis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<TimestampMillis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<TimestampMillis>,
}

impl DistributionBatch {
    pub fn new(
        id: BatchId,
        contract: WalletAddress,
        chain_id: ChainId,
        total_amount: u64,
        recipient_count: u32,
        timestamp: TimestampMillis,
    ) -> Self {
        Self {
            id,
            tx_hash: None,
            contract,
            chain_id,
            total_amount,
            recipient_count,
            status: BatchStatus::Pending,
            error: None,
            created_at: timestamp,
            processed_at: None,
            confirmed_at: None,
        }
    }

    fn set_status(
        &mut self,
        status: BatchStatus,
    ) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(status) {
            return Err(LedgerError::InvalidBatchTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }

    pub fn mark_processing(&mut self, timestamp: TimestampMillis) -> Result<(), LedgerError> {
        self.set_status(BatchStatus::Processing)?;
        self.processed_at = Some(timestamp);
        Ok(())
    }

    pub fn mark_confirmed(
        &mut self,
        tx_hash: TxHash,
        timestamp: TimestampMillis,
    ) -> Result<(), LedgerError> {
        self.set_status(BatchStatus::Confirmed)?;
        self.tx_hash = Some(tx_hash);
        self.confirmed_at = Some(timestamp);
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        error: String,
        timestamp: TimestampMillis,
    ) -> Result<(), LedgerError> {
        self.set_status(BatchStatus::Failed)?;
        self.error = Some(error);
        self.confirmed_at = Some(timestamp);
        Ok(())
    }
}

impl Serializer for DistributionBatch {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.id);
        self.tx_hash.write(writer);
        self.contract.write(writer);
        writer.write_u64(&self.chain_id);
        writer.write_u64(&self.total_amount);
        writer.write_u32(&self.recipient_count);
        self.status.write(writer);
        self.error.write(writer);
        writer.write_u64(&self.created_at);
        self.processed_at.write(writer);
        self.confirmed_at.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            id: reader.read_u64()?,
            tx_hash: Option::read(reader)?,
            contract: WalletAddress::read(reader)?,
            chain_id: reader.read_u64()?,
            total_amount: reader.read_u64()?,
            recipient_count: reader.read_u32()?,
            status: BatchStatus::read(reader)?,
            error: Option::read(reader)?,
            created_at: reader.read_u64()?,
            processed_at: Option::read(reader)?,
            confirmed_at: Option::read(reader)?,
        })
    }

    fn size(&self) -> usize {
        8 + self.tx_hash.size()
            + self.contract.size()
            + 8
            + 8
            + 4
            + self.status.size()
            + self.error.size()
            + 8
            + self.processed_at.size()
            + self.confirmed_at.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_withdrawal() -> RewardTransaction {
        RewardTransaction::new_withdrawal(
            1,
            "user-1".to_string(),
            100,
            WalletAddress::zero(),
            1_000,
        )
    }

    #[test]
    fn transaction_roundtrip() {
        let mut tx = RewardTransaction::new_credit(
            42,
            "user-9".to_string(),
            TransactionType::ReferralBonus,
            1_500,
            2_000,
        );
        tx.source_user_id = Some("user-3".to_string());
        tx.referral_rate_bps = Some(700);
        tx.description = Some("tier bonus".to_string());

        let decoded = RewardTransaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(tx, decoded);
    }

    #[test]
    fn batch_roundtrip() {
        let mut batch = DistributionBatch::new(3, WalletAddress::zero(), 137, 4_500, 3, 5_000);
        batch.mark_processing(5_100).unwrap();
        batch
            .mark_failed("submission reverted".to_string(), 5_200)
            .unwrap();

        let decoded = DistributionBatch::from_bytes(&batch.to_bytes()).unwrap();
        assert_eq!(batch, decoded);
    }

    #[test]
    fn terminal_transaction_is_immutable() {
        let mut tx = sample_withdrawal();
        tx.set_status(TransactionStatus::Failed, 1_100).unwrap();
        assert!(tx.status.is_terminal());

        let err = tx
            .set_status(TransactionStatus::Distributed, 1_200)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransactionTransition { .. }
        ));
    }

    #[test]
    fn batch_cannot_confirm_twice() {
        let mut batch = DistributionBatch::new(1, WalletAddress::zero(), 1, 100, 1, 0);
        batch.mark_processing(1).unwrap();
        batch.mark_confirmed(TxHash::new([1u8; 32]), 2).unwrap();
        assert!(batch.mark_confirmed(TxHash::new([2u8; 32]), 3).is_err());
        assert!(batch.mark_failed("late failure".to_string(), 4).is_err());
    }

    #[test]
    fn withdrawal_is_reserved_on_creation() {
        let tx = sample_withdrawal();
        assert_eq!(tx.status, TransactionStatus::Confirmed);
        assert!(tx.batch_id.is_none());
        assert!(!tx.kind.is_credit());
    }

    #[test]
    fn type_discriminants_are_stable() {
        for kind in [
            TransactionType::AdView,
            TransactionType::AdEngagement,
            TransactionType::ReferralBonus,
            TransactionType::Withdrawal,
            TransactionType::Airdrop,
            TransactionType::SignupBonus,
        ] {
            assert_eq!(TransactionType::from_id(kind.id()), Some(kind));
        }
        assert_eq!(TransactionType::from_id(6), None);
    }
}
