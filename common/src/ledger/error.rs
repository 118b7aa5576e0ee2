// Ledger error types

use thiserror::Error;

use super::{BatchId, BatchStatus, TransactionStatus, TxId};

/// Errors that can occur in the reward ledger
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Reward or withdrawal amount is zero
    #[error("Amount must be a positive value")]
    InvalidAmount,

    /// Reward was already claimed for this (user, post, type) key
    #[error("Reward already claimed for this post")]
    AlreadyClaimed,

    /// Balance too low for the requested withdrawal
    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// Withdrawal amount outside the configured bounds
    #[error("Amount {requested} is out of bounds [{min}, {max}]")]
    AmountOutOfBounds { min: u64, max: u64, requested: u64 },

    /// No wallet address supplied and none linked to the account
    #[error("No wallet address linked to this account")]
    NoWalletLinked,

    /// Account not found in the ledger
    #[error("Account not found")]
    AccountNotFound,

    /// Account already registered
    #[error("Account already registered")]
    AccountAlreadyExists,

    /// Attempted to set self as referrer
    #[error("Cannot set self as referrer")]
    SelfReferral,

    /// Referrer account not found
    #[error("Referrer not found")]
    ReferrerNotFound,

    /// Transaction not found in the ledger
    #[error("Transaction {0} not found")]
    TransactionNotFound(TxId),

    /// Distribution batch not found
    #[error("Batch {0} not found")]
    BatchNotFound(BatchId),

    /// Transaction status transition not allowed
    #[error("Invalid transaction status transition: {from} -> {to}")]
    InvalidTransactionTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Batch status transition not allowed
    #[error("Invalid batch status transition: {from} -> {to}")]
    InvalidBatchTransition { from: BatchStatus, to: BatchStatus },

    /// Too many recipients in a single airdrop
    #[error("Airdrop recipients {requested} exceeds maximum {max}")]
    TooManyRecipients { max: usize, requested: usize },

    /// Chain integration is not configured, distribution refused
    #[error("Distribution is disabled: chain integration is not configured")]
    DistributionDisabled,

    /// On-chain submission was rejected or reverted
    #[error("On-chain submission failed: {0}")]
    SubmissionFailed(String),

    /// On-chain submission did not complete in time
    #[error("On-chain submission timed out after {0} seconds")]
    SubmissionTimeout(u64),

    /// Internal storage error
    #[error("Internal storage error: {0}")]
    StorageError(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
