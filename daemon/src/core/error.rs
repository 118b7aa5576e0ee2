use thiserror::Error;

use pulse_common::{ledger::LedgerError, serializer::ReaderError};

/// Daemon-side errors: the domain taxonomy plus everything the storage and
/// chain layers can raise underneath it.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Corrupted entry in storage: {0}")]
    Deserialization(#[from] ReaderError),

    #[error("Chain request failed: {0}")]
    ChainRequest(#[from] reqwest::Error),

    #[error("Unexpected response from chain service: {0}")]
    InvalidChainResponse(String),

    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

impl CoreError {
    /// Domain error carried by this error, if any.
    /// Used at the RPC boundary to map onto stable error codes.
    pub fn as_ledger_error(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(e) => Some(e),
            _ => None,
        }
    }
}
