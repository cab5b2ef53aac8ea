use rust_decimal::Decimal;
use std::sync::Arc;
use wallet_shared::UserId;

use crate::domain::{Bet, Transaction};
use crate::repository::{LedgerRepository, StorageResult};

/// Read and adjust balances
///
/// `adjust_balance` does not enforce non-negativity; callers debiting must
/// check funds first.
#[derive(Clone)]
pub struct BalanceService {
    ledger: Arc<dyn LedgerRepository>,
}

impl BalanceService {
    pub fn new(ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { ledger }
    }

    pub async fn get_balance(&self, user_id: UserId) -> StorageResult<Decimal> {
        self.ledger.balance(user_id).await
    }

    pub async fn adjust_balance(&self, user_id: UserId, delta: Decimal) -> StorageResult<Decimal> {
        let balance = self.ledger.adjust_balance(user_id, delta).await?;
        tracing::debug!(user_id = %user_id, delta = %delta, balance = %balance, "Balance adjusted");
        Ok(balance)
    }

    /// Newest-first transactions and bets for audit views
    pub async fn history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StorageResult<(Vec<Transaction>, Vec<Bet>)> {
        let transactions = self.ledger.transactions(user_id, limit).await?;
        let bets = self.ledger.bets(user_id, limit).await?;
        Ok((transactions, bets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryLedgerRepository;
    use std::str::FromStr;

    fn service() -> BalanceService {
        BalanceService::new(Arc::new(InMemoryLedgerRepository::new()))
    }

    #[tokio::test]
    async fn test_unknown_user_starts_at_zero() {
        let balances = service();
        let user = UserId::new(5).unwrap();
        assert_eq!(balances.get_balance(user).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_adjust_then_read() {
        let balances = service();
        let user = UserId::new(5).unwrap();
        balances.adjust_balance(user, Decimal::from(100)).await.unwrap();
        let balance = balances
            .adjust_balance(user, Decimal::from_str("-20.50").unwrap())
            .await
            .unwrap();
        assert_eq!(balance, Decimal::from_str("79.50").unwrap());
        assert_eq!(balances.get_balance(user).await.unwrap(), balance);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let balances = service();
        let a = UserId::new(1).unwrap();
        let b = UserId::new(2).unwrap();
        balances.adjust_balance(a, Decimal::from(10)).await.unwrap();
        assert_eq!(balances.get_balance(b).await.unwrap(), Decimal::ZERO);
        let (transactions, bets) = balances.history(b, 10).await.unwrap();
        assert!(transactions.is_empty() && bets.is_empty());
    }
}
