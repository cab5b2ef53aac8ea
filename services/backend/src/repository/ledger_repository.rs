use async_trait::async_trait;
use rust_decimal::Decimal;
use wallet_shared::types::ValidationError;
use wallet_shared::{Amount, TxRef, UserId};

use crate::domain::{Bet, NewBet, NewTransaction, Transaction, TransactionStatus};

/// Persistence failures. Never recoverable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt ledger record: {0}")]
    Corrupt(String),

    #[error("Amount cannot be stored: {0}")]
    Unrepresentable(#[from] ValidationError),

    #[error("Balance overflow for user {0}")]
    Overflow(UserId),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq)]
pub enum BetApplication {
    Applied { bet: Bet, balance: Decimal },
    /// Stake exceeded the balance at apply time; nothing was written
    InsufficientFunds { available: Decimal },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DepositCredit {
    Credited { transaction: Transaction, balance: Decimal },
    /// The reference was already credited; nothing was written
    Duplicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalRecord {
    pub transaction: Transaction,
    pub balance: Decimal,
}

/// Durable owner of accounts, transactions and bets
///
/// Every method that touches a balance is a single atomic step per user.
/// Accounts are created lazily with a zero balance on first reference.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Current balance, creating the account at zero if absent
    async fn balance(&self, user_id: UserId) -> StorageResult<Decimal>;

    /// Atomic read-modify-write; does not enforce non-negativity
    async fn adjust_balance(&self, user_id: UserId, delta: Decimal) -> StorageResult<Decimal>;

    /// Re-check `stake <= balance`, apply the net delta and append the bet
    async fn apply_bet(&self, bet: NewBet) -> StorageResult<BetApplication>;

    /// Credit a deposit at most once per `tx_ref`
    async fn credit_deposit(
        &self,
        user_id: UserId,
        amount: Amount,
        tx_ref: &TxRef,
    ) -> StorageResult<DepositCredit>;

    /// Record a payout outcome; debits only when `status` is `Success`
    async fn settle_withdrawal(
        &self,
        user_id: UserId,
        amount: Amount,
        tx_ref: &TxRef,
        status: TransactionStatus,
    ) -> StorageResult<WithdrawalRecord>;

    /// Append an audit row without touching the balance
    async fn record_transaction(&self, tx: NewTransaction) -> StorageResult<Transaction>;

    /// Newest first
    async fn transactions(&self, user_id: UserId, limit: usize) -> StorageResult<Vec<Transaction>>;

    /// Newest first
    async fn bets(&self, user_id: UserId, limit: usize) -> StorageResult<Vec<Bet>>;

    async fn ping(&self) -> StorageResult<()>;
}
