// Withdrawal queue and batched on-chain distribution.
//
// A withdrawal debits the balance immediately (reservation), so concurrent
// requests cannot double-spend, and queues a confirmed ledger entry. The
// distributor claims a bounded set of queued withdrawals under the write
// lock, submits one on-chain transfer without holding any ledger lock, then
// reconciles: confirmed batches stamp every entry Distributed, failed or
// timed-out batches roll every reservation back. Rollback is guarded by the
// batch status so it can never be applied twice.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, error, info, warn};
use tokio::{task::JoinHandle, time::{interval, timeout}};

use crate::core::{
    chain::Transfer,
    error::CoreError,
    ledger::{ChainContext, Ledger, LedgerEvent},
    storage::Storage,
};
use pulse_common::{
    api::{
        DistributeResult, DistributionOutcome, DistributionStatusResult, RequestWithdrawalResult,
        WithdrawalStatus,
    },
    chain::WalletAddress,
    ledger::{
        BatchId, BatchStatus, DistributionBatch, LedgerError, RewardTransaction,
        TransactionStatus, TransactionType, TxId, UserId,
    },
    time::get_current_time_in_millis,
    utils::format_coin,
};

/// Which queued withdrawals a batch run claims
enum ClaimSelection {
    /// Up to N oldest queued withdrawals
    Oldest(usize),
    /// One specific withdrawal (synchronous fast path)
    Single(TxId),
}

/// A batch claimed from the queue, ready for submission
struct ClaimedBatch {
    batch: DistributionBatch,
    transactions: Vec<RewardTransaction>,
}

fn build_report(
    batch: &DistributionBatch,
    transactions: &[RewardTransaction],
) -> DistributeResult {
    let results: Vec<DistributionOutcome> = transactions
        .iter()
        .map(|tx| DistributionOutcome {
            tx_id: tx.id,
            user_id: tx.user_id.clone(),
            amount: tx.amount,
            status: tx.status,
        })
        .collect();

    DistributeResult {
        processed: transactions.len(),
        distributed: transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Distributed)
            .count(),
        failed: transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Failed)
            .count(),
        batch_id: Some(batch.id),
        tx_hash: batch.tx_hash,
        error: batch.error.clone(),
        results,
    }
}

fn empty_report() -> DistributeResult {
    DistributeResult {
        processed: 0,
        distributed: 0,
        failed: 0,
        batch_id: None,
        tx_hash: None,
        error: None,
        results: Vec::new(),
    }
}

impl<S: Storage> Ledger<S> {
    pub fn distribution_enabled(&self) -> bool {
        self.chain.is_some()
    }

    fn chain_context(&self) -> Result<&ChainContext, CoreError> {
        self.chain
            .as_ref()
            .ok_or_else(|| LedgerError::DistributionDisabled.into())
    }

    // ===== Withdrawal queue =====

    /// Reserve a withdrawal: debit the balance and queue a confirmed entry
    /// for batch settlement. With instant distribution enabled, settle it
    /// synchronously instead.
    pub async fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: u64,
        wallet_address: Option<WalletAddress>,
    ) -> Result<RequestWithdrawalResult, CoreError> {
        let min = self.distribution.min_withdrawal;
        let max = self.distribution.max_withdrawal;
        if amount < min || amount > max {
            return Err(LedgerError::AmountOutOfBounds {
                min,
                max,
                requested: amount,
            }
            .into());
        }

        let tx = {
            let mut storage = self.get_storage().write().await;
            let mut account = storage
                .get_account(user_id)
                .await?
                .ok_or(LedgerError::AccountNotFound)?;

            // connected wallet wins over the linked one
            let wallet = wallet_address
                .or(account.wallet_address)
                .ok_or(LedgerError::NoWalletLinked)?;

            account.debit(amount)?;

            let now = get_current_time_in_millis();
            let id = storage.next_transaction_id().await?;
            let tx = RewardTransaction::new_withdrawal(id, user_id.clone(), amount, wallet, now);
            storage.insert_transaction(&tx).await?;
            storage.set_account(user_id, &account).await?;
            tx
        };

        info!(
            "{} reserved withdrawal of {} to {}",
            user_id,
            format_coin(amount),
            tx.wallet_address
                .map(|w| w.to_string())
                .unwrap_or_default()
        );
        self.notify(LedgerEvent::WithdrawalQueued {
            user_id: user_id.clone(),
            tx_id: tx.id,
            amount,
        });

        // fast path: settle this withdrawal on its own, right now
        if self.distribution.instant_distribution && self.distribution_enabled() {
            let report = self.distribute_transaction(tx.id).await?;
            return if report.distributed == 1 {
                let tx_hash = report.tx_hash;
                Ok(RequestWithdrawalResult {
                    status: WithdrawalStatus::Distributed,
                    tx_id: tx.id,
                    amount,
                    wallet_address: tx.wallet_address.unwrap_or(WalletAddress::zero()),
                    explorer_url: tx_hash
                        .as_ref()
                        .and_then(|hash| self.explorer_tx_url(hash)),
                    tx_hash,
                    message: "Withdrawal settled on-chain".to_string(),
                })
            } else {
                // the requester is still waiting here, so the settlement
                // failure is propagated instead of surfacing asynchronously;
                // the reservation has already been rolled back
                Err(LedgerError::SubmissionFailed(
                    report.error.unwrap_or_else(|| "settlement failed".to_string()),
                )
                .into())
            };
        }

        Ok(RequestWithdrawalResult {
            status: WithdrawalStatus::Queued,
            tx_id: tx.id,
            amount,
            wallet_address: tx.wallet_address.unwrap_or(WalletAddress::zero()),
            tx_hash: None,
            explorer_url: None,
            message: "Withdrawal queued for batch settlement".to_string(),
        })
    }

    fn explorer_tx_url(&self, tx_hash: &pulse_common::chain::TxHash) -> Option<String> {
        self.chain.as_ref().and_then(|chain| {
            chain
                .explorer_url
                .as_ref()
                .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
        })
    }

    // ===== Batch distribution =====

    /// Claim up to `max_size` queued withdrawals and settle them in one
    /// on-chain transfer. Refuses to run when the chain is not configured.
    pub async fn run_batch(&self, max_size: usize) -> Result<DistributeResult, CoreError> {
        self.chain_context()?;
        let max = max_size.clamp(1, self.distribution.max_batch_size);

        match self.claim_batch(ClaimSelection::Oldest(max)).await? {
            Some(claimed) => self.settle(claimed).await,
            None => {
                debug!("no withdrawals queued, nothing to distribute");
                Ok(empty_report())
            }
        }
    }

    /// Settle one specific queued withdrawal (fast path)
    pub(crate) async fn distribute_transaction(
        &self,
        tx_id: TxId,
    ) -> Result<DistributeResult, CoreError> {
        self.chain_context()?;
        match self.claim_batch(ClaimSelection::Single(tx_id)).await? {
            Some(claimed) => self.settle(claimed).await,
            None => Ok(empty_report()),
        }
    }

    /// Claim phase, one critical section: selected withdrawals are stamped
    /// with the batch id and leave the queue, so a concurrent run cannot
    /// see them.
    async fn claim_batch(
        &self,
        selection: ClaimSelection,
    ) -> Result<Option<ClaimedBatch>, CoreError> {
        let chain = self.chain_context()?;
        let mut storage = self.get_storage().write().await;

        let pending = match selection {
            ClaimSelection::Oldest(max) => storage.next_pending_withdrawals(max).await?,
            ClaimSelection::Single(tx_id) => {
                let tx = storage
                    .get_transaction(tx_id)
                    .await?
                    .ok_or(LedgerError::TransactionNotFound(tx_id))?;
                if tx.kind != TransactionType::Withdrawal
                    || tx.status != TransactionStatus::Confirmed
                    || tx.batch_id.is_some()
                {
                    warn!("transaction {} is not claimable for settlement", tx_id);
                    return Ok(None);
                }
                vec![tx]
            }
        };

        if pending.is_empty() {
            return Ok(None);
        }

        let now = get_current_time_in_millis();
        let batch_id = storage.next_batch_id().await?;
        let total_amount = pending.iter().map(|tx| tx.amount).sum();
        let mut batch = DistributionBatch::new(
            batch_id,
            chain.contract,
            chain.chain_id,
            total_amount,
            pending.len() as u32,
            now,
        );
        storage.set_batch(&batch).await?;

        let mut transactions = Vec::with_capacity(pending.len());
        for mut tx in pending {
            tx.attach_batch(batch_id, now);
            storage.update_transaction(&tx).await?;
            storage.remove_pending_withdrawal(&tx).await?;
            storage.add_batch_transaction(batch_id, tx.id).await?;
            transactions.push(tx);
        }

        batch.mark_processing(now)?;
        storage.set_batch(&batch).await?;

        info!(
            "batch {} claimed {} withdrawals totaling {}",
            batch_id,
            transactions.len(),
            format_coin(total_amount)
        );
        Ok(Some(ClaimedBatch {
            batch,
            transactions,
        }))
    }

    /// Submission phase: no ledger lock is held while the chain call is in
    /// flight. A timeout is treated exactly like a submission failure.
    async fn settle(&self, claimed: ClaimedBatch) -> Result<DistributeResult, CoreError> {
        let chain = self.chain_context()?;
        let transfers: Vec<Transfer> = claimed
            .transactions
            .iter()
            .filter_map(|tx| {
                tx.wallet_address.map(|recipient| Transfer {
                    recipient,
                    amount: tx.amount,
                })
            })
            .collect();

        let timeout_secs = self.distribution.submit_timeout_secs;
        let submission = timeout(
            Duration::from_secs(timeout_secs),
            chain
                .client
                .submit_batch_transfer(&chain.contract, chain.chain_id, &transfers),
        )
        .await;

        match submission {
            Ok(Ok(tx_hash)) => self.confirm_batch(claimed, tx_hash).await,
            Ok(Err(e)) => {
                error!("batch {} submission failed: {}", claimed.batch.id, e);
                self.fail_batch(claimed.batch.id, e.to_string()).await
            }
            Err(_) => {
                let e = LedgerError::SubmissionTimeout(timeout_secs);
                error!("batch {}: {}", claimed.batch.id, e);
                self.fail_batch(claimed.batch.id, e.to_string()).await
            }
        }
    }

    async fn confirm_batch(
        &self,
        claimed: ClaimedBatch,
        tx_hash: pulse_common::chain::TxHash,
    ) -> Result<DistributeResult, CoreError> {
        let report = {
            let mut storage = self.get_storage().write().await;
            let now = get_current_time_in_millis();

            let mut batch = storage
                .get_batch(claimed.batch.id)
                .await?
                .ok_or(LedgerError::BatchNotFound(claimed.batch.id))?;
            batch.mark_confirmed(tx_hash, now)?;
            storage.set_batch(&batch).await?;

            let mut transactions = claimed.transactions;
            for tx in transactions.iter_mut() {
                tx.mark_distributed(tx_hash, now)?;
                storage.update_transaction(tx).await?;
            }

            info!(
                "batch {} confirmed on-chain as {}",
                batch.id, tx_hash
            );
            build_report(&batch, &transactions)
        };

        self.notify(LedgerEvent::BatchConfirmed {
            batch_id: claimed.batch.id,
            tx_hash,
        });
        Ok(report)
    }

    /// Fail a batch and roll the reservations back: every constituent
    /// withdrawal becomes Failed and its user's balance is restored.
    /// Guarded by the batch status - reapplying to an already failed batch
    /// is a no-op, so the rollback can never double-credit.
    pub async fn fail_batch(
        &self,
        batch_id: BatchId,
        error: String,
    ) -> Result<DistributeResult, CoreError> {
        let (report, applied) = {
            let mut storage = self.get_storage().write().await;
            let now = get_current_time_in_millis();

            let mut batch = storage
                .get_batch(batch_id)
                .await?
                .ok_or(LedgerError::BatchNotFound(batch_id))?;

            if batch.status != BatchStatus::Processing {
                warn!(
                    "rollback skipped for batch {} in status {}",
                    batch_id, batch.status
                );
                let transactions = storage.get_batch_transactions(batch_id).await?;
                (build_report(&batch, &transactions), false)
            } else {
                batch.mark_failed(error.clone(), now)?;
                storage.set_batch(&batch).await?;

                let mut transactions = storage.get_batch_transactions(batch_id).await?;
                for tx in transactions.iter_mut() {
                    if tx.status != TransactionStatus::Confirmed {
                        warn!(
                            "batch {} rollback: transaction {} already in status {}",
                            batch_id, tx.id, tx.status
                        );
                        continue;
                    }
                    tx.set_status(TransactionStatus::Failed, now)?;
                    storage.update_transaction(tx).await?;

                    // restore the reservation debited at request time
                    match storage.get_account(&tx.user_id).await? {
                        Some(mut account) => {
                            account.rollback_withdrawal(tx.amount);
                            storage.set_account(&tx.user_id, &account).await?;
                            debug!(
                                "restored {} to {} after failed batch {}",
                                format_coin(tx.amount),
                                tx.user_id,
                                batch_id
                            );
                        }
                        None => warn!(
                            "batch {} rollback: account {} not found",
                            batch_id, tx.user_id
                        ),
                    }
                }

                (build_report(&batch, &transactions), true)
            }
        };

        if applied {
            self.notify(LedgerEvent::BatchFailed {
                batch_id,
                error,
            });
        }
        Ok(report)
    }

    /// Operator view of the distribution subsystem
    pub async fn get_distribution_status(&self) -> Result<DistributionStatusResult, CoreError> {
        let pending_withdrawals = {
            let storage = self.get_storage().read().await;
            storage.count_pending_withdrawals(None).await?
        };

        Ok(DistributionStatusResult {
            enabled: self.distribution_enabled(),
            contract: self.chain.as_ref().map(|chain| chain.contract),
            chain_id: self.chain.as_ref().map(|chain| chain.chain_id),
            pending_withdrawals,
            interval_secs: self.distribution.distribution_interval_secs,
        })
    }
}

/// Periodic batch runs. Returns None when the scheduler is disabled, either
/// by config or because the chain integration is missing.
pub fn start_distribution_scheduler<S: Storage>(
    ledger: Arc<Ledger<S>>,
    running: Arc<AtomicBool>,
) -> Option<JoinHandle<()>> {
    let interval_secs = ledger.distribution.distribution_interval_secs;
    if interval_secs == 0 {
        info!("distribution scheduler disabled by config");
        return None;
    }
    if !ledger.distribution_enabled() {
        warn!("distribution scheduler disabled: chain integration is not configured");
        return None;
    }

    info!(
        "distribution scheduler running every {}s",
        interval_secs
    );
    Some(tokio::spawn(async move {
        let mut timer = interval(Duration::from_secs(interval_secs));
        // the first tick fires immediately, skip it
        timer.tick().await;

        while running.load(Ordering::SeqCst) {
            timer.tick().await;
            let max_size = ledger.distribution.max_batch_size;
            match ledger.run_batch(max_size).await {
                Ok(report) if report.processed > 0 => info!(
                    "scheduled batch run: {} processed, {} distributed, {} failed",
                    report.processed, report.distributed, report.failed
                ),
                Ok(_) => debug!("scheduled batch run: queue empty"),
                Err(e) => error!("scheduled batch run failed: {}", e),
            }
        }
    }))
}
