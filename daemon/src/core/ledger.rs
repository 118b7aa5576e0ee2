// The reward ledger service.
//
// Ledger<S> is the single owner of the shared mutable state. Every mutation
// takes the storage write lock, which serializes balance updates across
// concurrent requests; the claim-key constraint in storage backs the
// at-most-once guarantee independently of the locking. Events are emitted
// after the storage commit and never block a ledger operation.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::core::{
    chain::ChainClient,
    error::CoreError,
    storage::Storage,
};
use pulse_common::{
    account::Account,
    api::{
        AirdropOutcome, AirdropParams, AirdropResult, GetBalanceResult, RegisterAccountResult,
        ReferralStatsResult, TierInfo,
    },
    chain::{ChainId, TxHash, WalletAddress},
    config::{DEFAULT_PAGE_SIZE, MAX_AIRDROP_RECIPIENTS, MAX_PAGE_SIZE},
    ledger::{
        BatchId, CampaignId, DistributionBatch, LedgerError, PostId, RewardTransaction,
        TransactionType, TxId, UserId,
    },
    referral::{crossed_tier, next_tier_for, progress_to_next, tier_for},
    time::{get_current_time_in_millis, TimestampMillis},
    utils::format_coin,
};

// Capacity of the event broadcast channel; lagging subscribers lose events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Resolved settlement chain integration
pub struct ChainContext {
    pub client: Arc<dyn ChainClient>,
    pub contract: WalletAddress,
    pub chain_id: ChainId,
    pub explorer_url: Option<String>,
}

/// Outbound event published after a ledger commit.
/// Consumed by the notification collaborator, advisory only.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum LedgerEvent {
    AccountRegistered {
        user_id: UserId,
    },
    RewardCredited {
        user_id: UserId,
        tx_id: TxId,
        kind: TransactionType,
        amount: u64,
    },
    WithdrawalQueued {
        user_id: UserId,
        tx_id: TxId,
        amount: u64,
    },
    BatchConfirmed {
        batch_id: BatchId,
        tx_hash: TxHash,
    },
    BatchFailed {
        batch_id: BatchId,
        error: String,
    },
}

/// Additional fields attached to a credit at issuance
#[derive(Default)]
pub struct CreditMeta {
    pub description: Option<String>,
    pub post_id: Option<PostId>,
    pub campaign_id: Option<CampaignId>,
    pub source_user_id: Option<UserId>,
    pub referral_rate_bps: Option<u16>,
}

pub struct Ledger<S: Storage> {
    storage: RwLock<S>,
    pub(crate) chain: Option<ChainContext>,
    pub(crate) distribution: crate::config::DistributionConfig,
    events: broadcast::Sender<LedgerEvent>,
}

impl<S: Storage> Ledger<S> {
    pub fn new(
        storage: S,
        chain: Option<ChainContext>,
        distribution: crate::config::DistributionConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            storage: RwLock::new(storage),
            chain,
            distribution,
            events,
        })
    }

    pub fn get_storage(&self) -> &RwLock<S> {
        &self.storage
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: LedgerEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    pub async fn stop(&self) {
        info!("Stopping ledger...");
        let mut storage = self.storage.write().await;
        if let Err(e) = storage.flush().await {
            warn!("Error while flushing storage on stop: {}", e);
        }
    }

    // ===== Registration =====

    /// Create the ledger account for a fresh platform user.
    /// Optionally binds an immutable referrer, credits the signup bonus and
    /// pays the referrer's one-time tier bonus when a threshold is crossed.
    pub async fn register_account(
        &self,
        user_id: &UserId,
        referrer_id: Option<UserId>,
    ) -> Result<RegisterAccountResult, CoreError> {
        let mut events = Vec::new();
        let result = {
            let mut storage = self.storage.write().await;
            if storage.has_account(user_id).await? {
                return Err(LedgerError::AccountAlreadyExists.into());
            }

            if let Some(referrer_id) = referrer_id.as_ref() {
                if referrer_id == user_id {
                    return Err(LedgerError::SelfReferral.into());
                }
                if !storage.has_account(referrer_id).await? {
                    return Err(LedgerError::ReferrerNotFound.into());
                }
            }

            let now = get_current_time_in_millis();
            let mut account = Account::new(referrer_id.clone(), now);
            storage.set_account(user_id, &account).await?;

            // signup bonus for the fresh account
            let signup_bonus = self.distribution.signup_bonus;
            if signup_bonus > 0 {
                let id = storage.next_transaction_id().await?;
                let tx = Self::credit(
                    &mut *storage,
                    id,
                    user_id,
                    TransactionType::SignupBonus,
                    signup_bonus,
                    CreditMeta::default(),
                    now,
                )
                .await?;
                events.push(LedgerEvent::RewardCredited {
                    user_id: user_id.clone(),
                    tx_id: tx.id,
                    kind: tx.kind,
                    amount: tx.amount,
                });
                if let Some(bonus) = Self::maybe_skim(&mut *storage, &tx, now).await? {
                    events.push(LedgerEvent::RewardCredited {
                        user_id: bonus.user_id.clone(),
                        tx_id: bonus.id,
                        kind: bonus.kind,
                        amount: bonus.amount,
                    });
                }
                // reload, the bonus credit went through storage
                account = storage
                    .get_account(user_id)
                    .await?
                    .ok_or(LedgerError::AccountNotFound)?;
            }

            // referral linkage: bump the referrer and pay crossed tier bonuses
            if let Some(referrer_id) = referrer_id {
                let mut referrer = storage
                    .get_account(&referrer_id)
                    .await?
                    .ok_or(LedgerError::ReferrerNotFound)?;
                let previous = referrer.referral_count;
                let current = referrer.increment_referral_count();
                storage.set_account(&referrer_id, &referrer).await?;
                debug!(
                    "{} referred by {} (count {} -> {})",
                    user_id, referrer_id, previous, current
                );

                if let Some(tier) = crossed_tier(previous, current) {
                    if tier.bonus > 0 {
                        let id = storage.next_transaction_id().await?;
                        let bonus = Self::credit(
                            &mut *storage,
                            id,
                            &referrer_id,
                            TransactionType::ReferralBonus,
                            tier.bonus,
                            CreditMeta {
                                description: Some(format!("{} tier bonus", tier.label)),
                                source_user_id: Some(user_id.clone()),
                                referral_rate_bps: Some(tier.rate_bps),
                                ..Default::default()
                            },
                            now,
                        )
                        .await?;
                        info!(
                            "{} reached {} tier, credited {} bonus",
                            referrer_id,
                            tier.label,
                            format_coin(tier.bonus)
                        );
                        events.push(LedgerEvent::RewardCredited {
                            user_id: referrer_id.clone(),
                            tx_id: bonus.id,
                            kind: bonus.kind,
                            amount: bonus.amount,
                        });
                    }
                }
            }

            RegisterAccountResult {
                account,
                signup_bonus,
            }
        };

        self.notify(LedgerEvent::AccountRegistered {
            user_id: user_id.clone(),
        });
        for event in events {
            self.notify(event);
        }
        Ok(result)
    }

    /// Link a settlement wallet to an account
    pub async fn set_wallet_address(
        &self,
        user_id: &UserId,
        wallet_address: WalletAddress,
    ) -> Result<(), CoreError> {
        let mut storage = self.storage.write().await;
        let mut account = storage
            .get_account(user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        account.wallet_address = Some(wallet_address);
        storage.set_account(user_id, &account).await?;
        Ok(())
    }

    // ===== Reward issuance =====

    /// Credit a reward to a user and skim the referrer share.
    /// The whole operation is one critical section under the write lock.
    pub async fn issue_reward(
        &self,
        user_id: &UserId,
        kind: TransactionType,
        amount: u64,
        meta: CreditMeta,
    ) -> Result<RewardTransaction, CoreError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount.into());
        }

        let (tx, bonus) = {
            let mut storage = self.storage.write().await;
            if !storage.has_account(user_id).await? {
                return Err(LedgerError::AccountNotFound.into());
            }

            let now = get_current_time_in_millis();
            let id = storage.next_transaction_id().await?;
            let tx = Self::credit(&mut *storage, id, user_id, kind, amount, meta, now).await?;
            let bonus = Self::maybe_skim(&mut *storage, &tx, now).await?;
            (tx, bonus)
        };

        self.notify(LedgerEvent::RewardCredited {
            user_id: tx.user_id.clone(),
            tx_id: tx.id,
            kind: tx.kind,
            amount: tx.amount,
        });
        if let Some(bonus) = bonus {
            self.notify(LedgerEvent::RewardCredited {
                user_id: bonus.user_id.clone(),
                tx_id: bonus.id,
                kind: bonus.kind,
                amount: bonus.amount,
            });
        }
        Ok(tx)
    }

    /// Claim a per-post reward (ad view / engagement) at most once.
    /// The claim-key insert is the authoritative duplicate guard; the
    /// existence pre-check only short-circuits the common repeat case.
    pub async fn claim_post_reward(
        &self,
        user_id: &UserId,
        post_id: &PostId,
        kind: TransactionType,
        amount: u64,
        campaign_id: Option<CampaignId>,
    ) -> Result<RewardTransaction, CoreError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount.into());
        }

        let (tx, bonus) = {
            let mut storage = self.storage.write().await;
            if !storage.has_account(user_id).await? {
                return Err(LedgerError::AccountNotFound.into());
            }

            // fast path
            if storage.has_claim(user_id, post_id, kind).await? {
                return Err(LedgerError::AlreadyClaimed.into());
            }

            let now = get_current_time_in_millis();
            let id = storage.next_transaction_id().await?;
            if !storage.insert_claim(user_id, post_id, kind, id).await? {
                return Err(LedgerError::AlreadyClaimed.into());
            }

            let tx = Self::credit(
                &mut *storage,
                id,
                user_id,
                kind,
                amount,
                CreditMeta {
                    post_id: Some(post_id.clone()),
                    campaign_id,
                    ..Default::default()
                },
                now,
            )
            .await?;
            let bonus = Self::maybe_skim(&mut *storage, &tx, now).await?;
            (tx, bonus)
        };

        debug!("{} claimed {} on post {}", user_id, tx.kind, post_id);
        self.notify(LedgerEvent::RewardCredited {
            user_id: tx.user_id.clone(),
            tx_id: tx.id,
            kind: tx.kind,
            amount: tx.amount,
        });
        if let Some(bonus) = bonus {
            self.notify(LedgerEvent::RewardCredited {
                user_id: bonus.user_id.clone(),
                tx_id: bonus.id,
                kind: bonus.kind,
                amount: bonus.amount,
            });
        }
        Ok(tx)
    }

    /// Bulk admin credit: one airdrop transaction per user.
    /// A missing account fails that recipient only, not the whole call.
    pub async fn airdrop(&self, params: AirdropParams) -> Result<AirdropResult, CoreError> {
        if params.amount == 0 {
            return Err(LedgerError::InvalidAmount.into());
        }
        if params.user_ids.len() > MAX_AIRDROP_RECIPIENTS {
            return Err(LedgerError::TooManyRecipients {
                max: MAX_AIRDROP_RECIPIENTS,
                requested: params.user_ids.len(),
            }
            .into());
        }

        let mut results = Vec::with_capacity(params.user_ids.len());
        let mut credited = 0;
        let mut failed = 0;
        for user_id in params.user_ids {
            let outcome = self
                .issue_reward(
                    &user_id,
                    TransactionType::Airdrop,
                    params.amount,
                    CreditMeta {
                        description: params.description.clone(),
                        campaign_id: params.campaign_id.clone(),
                        ..Default::default()
                    },
                )
                .await;
            match outcome {
                Ok(tx) => {
                    credited += 1;
                    results.push(AirdropOutcome {
                        user_id,
                        success: true,
                        tx_id: Some(tx.id),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("airdrop to {} failed: {}", user_id, e);
                    failed += 1;
                    results.push(AirdropOutcome {
                        user_id,
                        success: false,
                        tx_id: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!("airdrop credited {} accounts, {} failed", credited, failed);
        Ok(AirdropResult {
            credited,
            failed,
            results,
        })
    }

    // ===== Internal credit path =====

    /// Apply a credit: balance mutation plus the confirmed ledger entry.
    /// Caller must hold the write lock and have allocated the entry id.
    async fn credit(
        storage: &mut S,
        id: TxId,
        user_id: &UserId,
        kind: TransactionType,
        amount: u64,
        meta: CreditMeta,
        now: TimestampMillis,
    ) -> Result<RewardTransaction, CoreError> {
        let mut account = storage
            .get_account(user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        account.credit(amount)?;

        let mut tx = RewardTransaction::new_credit(id, user_id.clone(), kind, amount, now);
        tx.description = meta.description;
        tx.post_id = meta.post_id;
        tx.campaign_id = meta.campaign_id;
        tx.source_user_id = meta.source_user_id;
        tx.referral_rate_bps = meta.referral_rate_bps;

        storage.insert_transaction(&tx).await?;
        storage.set_account(user_id, &account).await?;
        Ok(tx)
    }

    /// Pay the referrer share of a fresh credit, if any is owed.
    /// Referral bonuses never trigger further skims.
    async fn maybe_skim(
        storage: &mut S,
        earned: &RewardTransaction,
        now: TimestampMillis,
    ) -> Result<Option<RewardTransaction>, CoreError> {
        if earned.kind == TransactionType::ReferralBonus {
            return Ok(None);
        }

        let account = storage
            .get_account(&earned.user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        let referrer_id = match account.referrer {
            Some(referrer_id) => referrer_id,
            None => return Ok(None),
        };

        let referrer = match storage.get_account(&referrer_id).await? {
            Some(referrer) => referrer,
            None => {
                warn!(
                    "{} references missing referrer {}",
                    earned.user_id, referrer_id
                );
                return Ok(None);
            }
        };

        let tier = tier_for(referrer.referral_count);
        let share = tier.skim(earned.amount);
        if share == 0 {
            return Ok(None);
        }

        let id = storage.next_transaction_id().await?;
        let bonus = Self::credit(
            storage,
            id,
            &referrer_id,
            TransactionType::ReferralBonus,
            share,
            CreditMeta {
                description: Some(format!("{} referral share", tier.label)),
                source_user_id: Some(earned.user_id.clone()),
                referral_rate_bps: Some(tier.rate_bps),
                ..Default::default()
            },
            now,
        )
        .await?;
        Ok(Some(bonus))
    }

    // ===== Read side =====

    pub async fn get_balance(&self, user_id: &UserId) -> Result<GetBalanceResult, CoreError> {
        let storage = self.storage.read().await;
        let account = storage
            .get_account(user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        let pending_withdrawals = storage.count_pending_withdrawals(Some(user_id)).await?;
        Ok(GetBalanceResult {
            balance: account.balance,
            total_earned: account.total_earned,
            total_withdrawn: account.total_withdrawn,
            pending_withdrawals,
        })
    }

    pub async fn get_transaction(&self, id: TxId) -> Result<RewardTransaction, CoreError> {
        let storage = self.storage.read().await;
        storage
            .get_transaction(id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(id).into())
    }

    pub async fn get_history(
        &self,
        user_id: &UserId,
        kind: Option<TransactionType>,
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> Result<(Vec<RewardTransaction>, usize, usize), CoreError> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

        let storage = self.storage.read().await;
        if !storage.has_account(user_id).await? {
            return Err(LedgerError::AccountNotFound.into());
        }
        let transactions = storage
            .get_user_transactions(user_id, kind, skip, limit)
            .await?;
        Ok((transactions, skip, limit))
    }

    pub async fn get_batch(&self, id: BatchId) -> Result<DistributionBatch, CoreError> {
        let storage = self.storage.read().await;
        storage
            .get_batch(id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(id).into())
    }

    pub async fn list_batches(
        &self,
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<DistributionBatch>, CoreError> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let storage = self.storage.read().await;
        storage.list_batches(skip, limit).await
    }

    // ===== Referral read views =====

    pub async fn get_referral_stats(
        &self,
        user_id: &UserId,
    ) -> Result<ReferralStatsResult, CoreError> {
        let storage = self.storage.read().await;
        let account = storage
            .get_account(user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        let total_referral_earnings = storage.sum_referral_earnings(user_id).await?;

        let count = account.referral_count;
        Ok(ReferralStatsResult {
            referral_count: count,
            tier: tier_for(count).into(),
            next_tier: next_tier_for(count).map(TierInfo::from),
            progress_to_next: progress_to_next(count),
            total_referral_earnings,
        })
    }

    pub async fn get_referral_leaderboard(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<(UserId, u32)>, CoreError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let storage = self.storage.read().await;
        storage.get_referral_leaderboard(limit).await
    }
}
