// Distribution batch storage provider trait

use async_trait::async_trait;

use crate::core::error::CoreError;
use pulse_common::ledger::{BatchId, DistributionBatch, RewardTransaction, TxId};

/// Storage provider for distribution batches
#[async_trait]
pub trait BatchProvider {
    /// Allocate the next monotonic batch id
    async fn next_batch_id(&mut self) -> Result<BatchId, CoreError>;

    /// Get a batch by id
    async fn get_batch(&self, id: BatchId) -> Result<Option<DistributionBatch>, CoreError>;

    /// Insert or overwrite a batch row
    async fn set_batch(&mut self, batch: &DistributionBatch) -> Result<(), CoreError>;

    /// Record that a transaction belongs to a batch
    async fn add_batch_transaction(&mut self, id: BatchId, tx_id: TxId) -> Result<(), CoreError>;

    /// All transactions claimed by a batch
    async fn get_batch_transactions(
        &self,
        id: BatchId,
    ) -> Result<Vec<RewardTransaction>, CoreError>;

    /// Paginated batch listing, newest first
    async fn list_batches(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<DistributionBatch>, CoreError>;
}
