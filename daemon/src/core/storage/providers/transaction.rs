// Ledger entry storage provider trait

use async_trait::async_trait;

use crate::core::error::CoreError;
use pulse_common::ledger::{PostId, RewardTransaction, TransactionType, TxId, UserId};

/// Storage provider for ledger entries, the claim-key constraint and the
/// pending-withdrawal queue
#[async_trait]
pub trait TransactionProvider {
    /// Allocate the next monotonic ledger entry id
    async fn next_transaction_id(&mut self) -> Result<TxId, CoreError>;

    /// Get a ledger entry by id
    async fn get_transaction(&self, id: TxId) -> Result<Option<RewardTransaction>, CoreError>;

    /// Insert a fresh ledger entry and its per-user index.
    /// Confirmed withdrawals are also enqueued for batch settlement.
    async fn insert_transaction(&mut self, tx: &RewardTransaction) -> Result<(), CoreError>;

    /// Overwrite an existing ledger entry (status transitions only)
    async fn update_transaction(&mut self, tx: &RewardTransaction) -> Result<(), CoreError>;

    /// Fast-path check of the claim uniqueness constraint
    async fn has_claim(
        &self,
        user: &UserId,
        post: &PostId,
        kind: TransactionType,
    ) -> Result<bool, CoreError>;

    /// Atomically insert a claim key.
    /// Returns false when the key was already present - the authoritative
    /// "already claimed" signal, even under concurrent identical claims.
    async fn insert_claim(
        &mut self,
        user: &UserId,
        post: &PostId,
        kind: TransactionType,
        tx_id: TxId,
    ) -> Result<bool, CoreError>;

    /// Paginated per-user history, newest first, optionally filtered by kind
    async fn get_user_transactions(
        &self,
        user: &UserId,
        kind: Option<TransactionType>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RewardTransaction>, CoreError>;

    /// Confirmed withdrawals not yet attached to a batch, oldest first
    async fn next_pending_withdrawals(
        &self,
        max: usize,
    ) -> Result<Vec<RewardTransaction>, CoreError>;

    /// Remove a withdrawal from the pending queue once a batch claimed it
    async fn remove_pending_withdrawal(&mut self, tx: &RewardTransaction)
        -> Result<(), CoreError>;

    /// Count of reserved withdrawals awaiting settlement, optionally per user
    async fn count_pending_withdrawals(&self, user: Option<&UserId>) -> Result<u32, CoreError>;
}
