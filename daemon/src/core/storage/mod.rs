mod providers;
mod sled;

pub use self::sled::SledStorage;
pub use providers::*;

use async_trait::async_trait;

use crate::core::error::CoreError;

#[async_trait]
pub trait Storage:
    AccountProvider + TransactionProvider + BatchProvider + ReferralProvider + Sync + Send + 'static
{
    /// Flush pending writes to disk
    async fn flush(&mut self) -> Result<(), CoreError>;
}
