// Sled-backed storage.
//
// One tree per concern. Integer keys are big-endian so range scans iterate
// in id order; composite keys end with the 8-byte tx id to stay unique.
// String ids are suffixed with a zero byte in composite keys so prefix scans
// of one user cannot leak into another user sharing a prefix.

use async_trait::async_trait;
use log::{trace, warn};
use sled::Tree;

use crate::core::error::CoreError;
use pulse_common::{
    account::Account,
    ledger::{
        BatchId, DistributionBatch, PostId, RewardTransaction, TransactionStatus, TransactionType,
        TxId, UserId,
    },
    serializer::{ReaderError, Serializer},
};

use super::{
    AccountProvider, BatchProvider, ReferralProvider, Storage, TransactionProvider,
};

// Tree names
const ACCOUNTS_TREE: &[u8] = b"accounts";
const TRANSACTIONS_TREE: &[u8] = b"transactions";
const USER_INDEX_TREE: &[u8] = b"user_transactions";
const CLAIMS_TREE: &[u8] = b"claims";
const PENDING_TREE: &[u8] = b"pending_withdrawals";
const BATCHES_TREE: &[u8] = b"batches";
const BATCH_INDEX_TREE: &[u8] = b"batch_transactions";
const META_TREE: &[u8] = b"meta";

// Counter keys in the meta tree
const TX_COUNTER_KEY: &[u8] = b"TX_COUNTER";
const BATCH_COUNTER_KEY: &[u8] = b"BATCH_COUNTER";

// Separator terminating string ids inside composite keys
const KEY_SEPARATOR: u8 = 0;

pub struct SledStorage {
    db: sled::Db,
    accounts: Tree,
    transactions: Tree,
    user_index: Tree,
    claims: Tree,
    pending: Tree,
    batches: Tree,
    batch_index: Tree,
    meta: Tree,
}

impl SledStorage {
    pub fn new(path: &str) -> Result<Self, CoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            accounts: db.open_tree(ACCOUNTS_TREE)?,
            transactions: db.open_tree(TRANSACTIONS_TREE)?,
            user_index: db.open_tree(USER_INDEX_TREE)?,
            claims: db.open_tree(CLAIMS_TREE)?,
            pending: db.open_tree(PENDING_TREE)?,
            batches: db.open_tree(BATCHES_TREE)?,
            batch_index: db.open_tree(BATCH_INDEX_TREE)?,
            meta: db.open_tree(META_TREE)?,
            db,
        })
    }

    fn load<V: Serializer>(tree: &Tree, key: &[u8]) -> Result<Option<V>, CoreError> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(V::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn next_counter(&self, key: &[u8]) -> Result<u64, CoreError> {
        let current = match self.meta.get(key)? {
            Some(bytes) => u64::from_bytes(&bytes)?,
            None => 0,
        };
        let next = current + 1;
        self.meta.insert(key, next.to_bytes())?;
        Ok(next)
    }

    fn user_prefix(user: &UserId) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(user.len() + 1);
        prefix.extend_from_slice(user.as_bytes());
        prefix.push(KEY_SEPARATOR);
        prefix
    }

    fn user_index_key(user: &UserId, tx_id: TxId) -> Vec<u8> {
        let mut key = Self::user_prefix(user);
        key.extend_from_slice(&tx_id.to_be_bytes());
        key
    }

    fn claim_key(user: &UserId, post: &PostId, kind: TransactionType) -> Vec<u8> {
        let mut key = Vec::with_capacity(user.len() + post.len() + 3);
        key.extend_from_slice(user.as_bytes());
        key.push(KEY_SEPARATOR);
        key.extend_from_slice(post.as_bytes());
        key.push(KEY_SEPARATOR);
        key.push(kind.id());
        key
    }

    fn pending_key(tx: &RewardTransaction) -> Vec<u8> {
        let mut key = Vec::with_capacity(16);
        key.extend_from_slice(&tx.created_at.to_be_bytes());
        key.extend_from_slice(&tx.id.to_be_bytes());
        key
    }

    fn batch_index_key(id: BatchId, tx_id: TxId) -> Vec<u8> {
        let mut key = Vec::with_capacity(16);
        key.extend_from_slice(&id.to_be_bytes());
        key.extend_from_slice(&tx_id.to_be_bytes());
        key
    }
}

#[async_trait]
impl AccountProvider for SledStorage {
    async fn has_account(&self, user: &UserId) -> Result<bool, CoreError> {
        trace!("has account {}", user);
        Ok(self.accounts.contains_key(user.as_bytes())?)
    }

    async fn get_account(&self, user: &UserId) -> Result<Option<Account>, CoreError> {
        trace!("get account {}", user);
        Self::load(&self.accounts, user.as_bytes())
    }

    async fn set_account(&mut self, user: &UserId, account: &Account) -> Result<(), CoreError> {
        trace!("set account {}", user);
        self.accounts.insert(user.as_bytes(), account.to_bytes())?;
        Ok(())
    }

    async fn count_accounts(&self) -> Result<u64, CoreError> {
        Ok(self.accounts.len() as u64)
    }
}

#[async_trait]
impl TransactionProvider for SledStorage {
    async fn next_transaction_id(&mut self) -> Result<TxId, CoreError> {
        self.next_counter(TX_COUNTER_KEY)
    }

    async fn get_transaction(&self, id: TxId) -> Result<Option<RewardTransaction>, CoreError> {
        trace!("get transaction {}", id);
        Self::load(&self.transactions, &id.to_be_bytes())
    }

    async fn insert_transaction(&mut self, tx: &RewardTransaction) -> Result<(), CoreError> {
        trace!("insert transaction {} for {}", tx.id, tx.user_id);
        self.transactions
            .insert(tx.id.to_be_bytes(), tx.to_bytes())?;
        self.user_index.insert(
            Self::user_index_key(&tx.user_id, tx.id),
            &tx.id.to_be_bytes()[..],
        )?;

        // fresh confirmed withdrawals wait in the settlement queue
        if tx.kind == TransactionType::Withdrawal
            && tx.status == TransactionStatus::Confirmed
            && tx.batch_id.is_none()
        {
            self.pending
                .insert(Self::pending_key(tx), &tx.id.to_be_bytes()[..])?;
        }
        Ok(())
    }

    async fn update_transaction(&mut self, tx: &RewardTransaction) -> Result<(), CoreError> {
        trace!("update transaction {} -> {}", tx.id, tx.status);
        self.transactions
            .insert(tx.id.to_be_bytes(), tx.to_bytes())?;
        Ok(())
    }

    async fn has_claim(
        &self,
        user: &UserId,
        post: &PostId,
        kind: TransactionType,
    ) -> Result<bool, CoreError> {
        Ok(self
            .claims
            .contains_key(Self::claim_key(user, post, kind))?)
    }

    async fn insert_claim(
        &mut self,
        user: &UserId,
        post: &PostId,
        kind: TransactionType,
        tx_id: TxId,
    ) -> Result<bool, CoreError> {
        let key = Self::claim_key(user, post, kind);
        // compare_and_swap against an absent key is the uniqueness constraint:
        // exactly one of two concurrent identical claims can win it
        let result = self.claims.compare_and_swap(
            key,
            None as Option<&[u8]>,
            Some(&tx_id.to_be_bytes()[..]),
        )?;
        Ok(result.is_ok())
    }

    async fn get_user_transactions(
        &self,
        user: &UserId,
        kind: Option<TransactionType>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RewardTransaction>, CoreError> {
        trace!("get user transactions for {}", user);
        let mut transactions = Vec::new();
        let mut skipped = 0;

        // ids ascend chronologically, reverse the scan for newest first
        for entry in self.user_index.scan_prefix(Self::user_prefix(user)).rev() {
            let (_, value) = entry?;
            let tx_id = u64::from_bytes(&value)?;
            let tx = match self.get_transaction(tx_id).await? {
                Some(tx) => tx,
                None => {
                    warn!("user index references missing transaction {}", tx_id);
                    continue;
                }
            };

            if let Some(kind) = kind {
                if tx.kind != kind {
                    continue;
                }
            }

            if skipped < skip {
                skipped += 1;
                continue;
            }

            transactions.push(tx);
            if transactions.len() >= limit {
                break;
            }
        }
        Ok(transactions)
    }

    async fn next_pending_withdrawals(
        &self,
        max: usize,
    ) -> Result<Vec<RewardTransaction>, CoreError> {
        let mut withdrawals = Vec::new();
        // keys are (created_at, id): iteration order is oldest first
        for entry in self.pending.iter() {
            let (_, value) = entry?;
            let tx_id = u64::from_bytes(&value)?;
            match self.get_transaction(tx_id).await? {
                Some(tx) if tx.batch_id.is_none() => withdrawals.push(tx),
                Some(tx) => {
                    warn!("pending queue holds already claimed transaction {}", tx.id)
                }
                None => warn!("pending queue references missing transaction {}", tx_id),
            }
            if withdrawals.len() >= max {
                break;
            }
        }
        Ok(withdrawals)
    }

    async fn remove_pending_withdrawal(
        &mut self,
        tx: &RewardTransaction,
    ) -> Result<(), CoreError> {
        trace!("remove pending withdrawal {}", tx.id);
        self.pending.remove(Self::pending_key(tx))?;
        Ok(())
    }

    async fn count_pending_withdrawals(&self, user: Option<&UserId>) -> Result<u32, CoreError> {
        match user {
            None => Ok(self.pending.len() as u32),
            Some(user) => {
                let mut count = 0;
                for entry in self.pending.iter() {
                    let (_, value) = entry?;
                    let tx_id = u64::from_bytes(&value)?;
                    if let Some(tx) = self.get_transaction(tx_id).await? {
                        if tx.user_id == *user {
                            count += 1;
                        }
                    }
                }
                Ok(count)
            }
        }
    }
}

#[async_trait]
impl BatchProvider for SledStorage {
    async fn next_batch_id(&mut self) -> Result<BatchId, CoreError> {
        self.next_counter(BATCH_COUNTER_KEY)
    }

    async fn get_batch(&self, id: BatchId) -> Result<Option<DistributionBatch>, CoreError> {
        trace!("get batch {}", id);
        Self::load(&self.batches, &id.to_be_bytes())
    }

    async fn set_batch(&mut self, batch: &DistributionBatch) -> Result<(), CoreError> {
        trace!("set batch {} -> {}", batch.id, batch.status);
        self.batches
            .insert(batch.id.to_be_bytes(), batch.to_bytes())?;
        Ok(())
    }

    async fn add_batch_transaction(&mut self, id: BatchId, tx_id: TxId) -> Result<(), CoreError> {
        self.batch_index
            .insert(Self::batch_index_key(id, tx_id), &[][..])?;
        Ok(())
    }

    async fn get_batch_transactions(
        &self,
        id: BatchId,
    ) -> Result<Vec<RewardTransaction>, CoreError> {
        let mut transactions = Vec::new();
        for entry in self.batch_index.scan_prefix(id.to_be_bytes()) {
            let (key, _) = entry?;
            // the tx id is the trailing 8 bytes of the composite key
            let tx_id = u64::from_bytes(&key[key.len() - 8..])?;
            match self.get_transaction(tx_id).await? {
                Some(tx) => transactions.push(tx),
                None => warn!("batch {} references missing transaction {}", id, tx_id),
            }
        }
        Ok(transactions)
    }

    async fn list_batches(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<DistributionBatch>, CoreError> {
        let mut batches = Vec::new();
        for entry in self.batches.iter().rev().skip(skip).take(limit) {
            let (_, value) = entry?;
            batches.push(DistributionBatch::from_bytes(&value)?);
        }
        Ok(batches)
    }
}

#[async_trait]
impl ReferralProvider for SledStorage {
    async fn get_referral_leaderboard(
        &self,
        limit: usize,
    ) -> Result<Vec<(UserId, u32)>, CoreError> {
        let mut referrers = Vec::new();
        for entry in self.accounts.iter() {
            let (key, value) = entry?;
            let account = Account::from_bytes(&value)?;
            if account.referral_count > 0 {
                let user = String::from_utf8(key.to_vec())
                    .map_err(|_| CoreError::Deserialization(ReaderError::InvalidString))?;
                referrers.push((user, account.referral_count));
            }
        }
        // highest counts first, stable on user id for equal counts
        referrers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        referrers.truncate(limit);
        Ok(referrers)
    }

    async fn sum_referral_earnings(&self, user: &UserId) -> Result<u64, CoreError> {
        let mut total = 0u64;
        for entry in self.user_index.scan_prefix(Self::user_prefix(user)) {
            let (_, value) = entry?;
            let tx_id = u64::from_bytes(&value)?;
            if let Some(tx) = self.get_transaction(tx_id).await? {
                if tx.kind == TransactionType::ReferralBonus {
                    total = total.saturating_add(tx.amount);
                }
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl Storage for SledStorage {
    async fn flush(&mut self) -> Result<(), CoreError> {
        self.db.flush_async().await?;
        Ok(())
    }
}
