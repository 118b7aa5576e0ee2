// Account storage provider trait

use async_trait::async_trait;

use crate::core::error::CoreError;
use pulse_common::{account::Account, ledger::UserId};

/// Storage provider for per-user ledger accounts
#[async_trait]
pub trait AccountProvider {
    /// Check if an account is registered
    async fn has_account(&self, user: &UserId) -> Result<bool, CoreError>;

    /// Get an account by user id
    async fn get_account(&self, user: &UserId) -> Result<Option<Account>, CoreError>;

    /// Insert or overwrite an account row
    async fn set_account(&mut self, user: &UserId, account: &Account) -> Result<(), CoreError>;

    /// Total number of registered accounts
    async fn count_accounts(&self) -> Result<u64, CoreError>;
}
