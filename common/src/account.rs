// Per-user ledger account.
//
// The balance triple is the source of truth for everything the platform
// shows a user: `balance` is spendable off-chain, `total_earned` and
// `total_withdrawn` are running totals. `balance` can never underflow;
// every mutation is checked.

use serde::{Deserialize, Serialize};

use crate::{
    chain::WalletAddress,
    ledger::{LedgerError, UserId},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Off-chain spendable balance in atomic units
    pub balance: u64,
    /// Lifetime credited amount
    pub total_earned: u64,
    /// Lifetime withdrawn amount (rolled-back withdrawals excluded)
    pub total_withdrawn: u64,
    /// Linked settlement wallet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
    /// Referrer binding, immutable once set at registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<UserId>,
    /// Cached count of users referred by this account
    pub referral_count: u32,
    pub created_at: TimestampMillis,
}

impl Account {
    pub fn new(referrer: Option<UserId>, created_at: TimestampMillis) -> Self {
        Self {
            balance: 0,
            total_earned: 0,
            total_withdrawn: 0,
            wallet_address: None,
            referrer,
            referral_count: 0,
            created_at,
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet_address.is_some()
    }

    /// Credit a reward: balance and total_earned move together
    pub fn credit(&mut self, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount)?;
        self.total_earned = self.total_earned.saturating_add(amount);
        Ok(())
    }

    /// Reserve a withdrawal: balance and total_withdrawn move together
    pub fn debit(&mut self, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.total_withdrawn = self.total_withdrawn.saturating_add(amount);
        Ok(())
    }

    /// Undo a reserved withdrawal after a failed settlement.
    /// The amount flows back to the balance and leaves the withdrawn total.
    pub fn rollback_withdrawal(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
        self.total_withdrawn = self.total_withdrawn.saturating_sub(amount);
    }

    /// Increment the cached referral count, returning the new value
    pub fn increment_referral_count(&mut self) -> u32 {
        self.referral_count = self.referral_count.saturating_add(1);
        self.referral_count
    }
}

impl Serializer for Account {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.balance);
        writer.write_u64(&self.total_earned);
        writer.write_u64(&self.total_withdrawn);
        self.wallet_address.write(writer);
        self.referrer.write(writer);
        writer.write_u32(&self.referral_count);
        writer.write_u64(&self.created_at);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            balance: reader.read_u64()?,
            total_earned: reader.read_u64()?,
            total_withdrawn: reader.read_u64()?,
            wallet_address: Option::read(reader)?,
            referrer: Option::read(reader)?,
            referral_count: reader.read_u32()?,
            created_at: reader.read_u64()?,
        })
    }

    fn size(&self) -> usize {
        8 + 8 + 8 + self.wallet_address.size() + self.referrer.size() + 4 + 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_moves_balance_and_earned() {
        let mut account = Account::new(None, 0);
        account.credit(100).unwrap();
        account.credit(50).unwrap();
        assert_eq!(account.balance, 150);
        assert_eq!(account.total_earned, 150);
        assert_eq!(account.total_withdrawn, 0);
    }

    #[test]
    fn debit_rejects_overdraft() {
        let mut account = Account::new(None, 0);
        account.credit(15).unwrap();

        let err = account.debit(20).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                needed: 20,
                available: 15
            }
        );
        // balance unchanged on rejection
        assert_eq!(account.balance, 15);
        assert_eq!(account.total_withdrawn, 0);
    }

    #[test]
    fn rollback_restores_balance() {
        let mut account = Account::new(None, 0);
        account.credit(100).unwrap();
        account.debit(40).unwrap();
        assert_eq!(account.balance, 60);
        assert_eq!(account.total_withdrawn, 40);

        account.rollback_withdrawal(40);
        assert_eq!(account.balance, 100);
        assert_eq!(account.total_withdrawn, 0);
        // earned total untouched by the withdrawal cycle
        assert_eq!(account.total_earned, 100);
    }

    #[test]
    fn zero_amounts_rejected() {
        let mut account = Account::new(None, 0);
        assert_eq!(account.credit(0), Err(LedgerError::InvalidAmount));
        assert_eq!(account.debit(0), Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn account_roundtrip() {
        let mut account = Account::new(Some("referrer-1".to_string()), 1_234);
        account.credit(500).unwrap();
        account.wallet_address = Some(WalletAddress::zero());
        account.increment_referral_count();

        let decoded = Account::from_bytes(&account.to_bytes()).unwrap();
        assert_eq!(account, decoded);
    }
}
