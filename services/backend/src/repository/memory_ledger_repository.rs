//! In-memory LedgerRepository implementation
//!
//! Volatile store for local development and tests. Each account sits behind
//! its own mutex so adjustments to one user never wait on another.
//! Lock order is always account -> transactions/bets. The credited-ref set
//! is only held while a reference is claimed or released, never across
//! another lock.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use wallet_shared::{decimal_from_minor_units, decimal_to_minor_units, Amount, TxRef, UserId};

use super::ledger_repository::{
    BetApplication, DepositCredit, LedgerRepository, StorageError, StorageResult,
    WithdrawalRecord,
};
use crate::domain::{
    Bet, NewBet, NewTransaction, Transaction, TransactionStatus, TransactionType,
};

#[derive(Default)]
pub struct InMemoryLedgerRepository {
    /// Balances in minor units
    accounts: RwLock<HashMap<UserId, Arc<Mutex<i64>>>>,
    transactions: Mutex<Vec<Transaction>>,
    bets: Mutex<Vec<Bet>>,
    credited_refs: Mutex<HashSet<String>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn account(&self, user_id: UserId) -> Arc<Mutex<i64>> {
        if let Some(account) = self.accounts.read().await.get(&user_id) {
            return account.clone();
        }
        let mut accounts = self.accounts.write().await;
        accounts
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(0)))
            .clone()
    }

    async fn append_transaction(&self, tx: NewTransaction) -> Transaction {
        let mut transactions = self.transactions.lock().await;
        let transaction = Transaction {
            id: transactions.len() as u64 + 1,
            user_id: tx.user_id,
            tx_type: tx.tx_type,
            amount: tx.amount,
            status: tx.status,
            tx_ref: tx.tx_ref,
            created_at: Utc::now(),
        };
        transactions.push(transaction.clone());
        transaction
    }
}

fn apply_delta(balance: &mut i64, delta_minor: i64, user_id: UserId) -> StorageResult<Decimal> {
    *balance = balance
        .checked_add(delta_minor)
        .ok_or(StorageError::Overflow(user_id))?;
    Ok(decimal_from_minor_units(*balance))
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn balance(&self, user_id: UserId) -> StorageResult<Decimal> {
        let account = self.account(user_id).await;
        let balance = *account.lock().await;
        Ok(decimal_from_minor_units(balance))
    }

    async fn adjust_balance(&self, user_id: UserId, delta: Decimal) -> StorageResult<Decimal> {
        let delta_minor = decimal_to_minor_units(delta)?;
        let account = self.account(user_id).await;
        let mut balance = account.lock().await;
        apply_delta(&mut balance, delta_minor, user_id)
    }

    async fn apply_bet(&self, bet: NewBet) -> StorageResult<BetApplication> {
        let delta_minor = decimal_to_minor_units(bet.ledger_delta())?;
        let account = self.account(bet.user_id).await;
        let mut balance = account.lock().await;

        if bet.stake.to_minor_units() > *balance {
            return Ok(BetApplication::InsufficientFunds {
                available: decimal_from_minor_units(*balance),
            });
        }

        let new_balance = apply_delta(&mut balance, delta_minor, bet.user_id)?;

        let mut bets = self.bets.lock().await;
        let row = Bet {
            id: bets.len() as u64 + 1,
            user_id: bet.user_id,
            game: bet.game,
            amount: bet.stake,
            multiplier: bet.multiplier,
            payout: bet.payout,
            status: bet.status,
            created_at: Utc::now(),
        };
        bets.push(row.clone());

        Ok(BetApplication::Applied {
            bet: row,
            balance: new_balance,
        })
    }

    async fn credit_deposit(
        &self,
        user_id: UserId,
        amount: Amount,
        tx_ref: &TxRef,
    ) -> StorageResult<DepositCredit> {
        if !self
            .credited_refs
            .lock()
            .await
            .insert(tx_ref.as_str().to_string())
        {
            return Ok(DepositCredit::Duplicate);
        }

        let account = self.account(user_id).await;
        let mut balance = account.lock().await;
        let new_balance = match apply_delta(&mut balance, amount.to_minor_units(), user_id) {
            Ok(new_balance) => new_balance,
            Err(e) => {
                drop(balance);
                // Release the claim so a redelivered callback can retry
                self.credited_refs.lock().await.remove(tx_ref.as_str());
                return Err(e);
            }
        };

        let transaction = self
            .append_transaction(NewTransaction {
                user_id,
                tx_type: TransactionType::Deposit,
                amount,
                status: TransactionStatus::Success,
                tx_ref: Some(tx_ref.clone()),
            })
            .await;

        Ok(DepositCredit::Credited {
            transaction,
            balance: new_balance,
        })
    }

    async fn settle_withdrawal(
        &self,
        user_id: UserId,
        amount: Amount,
        tx_ref: &TxRef,
        status: TransactionStatus,
    ) -> StorageResult<WithdrawalRecord> {
        let account = self.account(user_id).await;
        let mut balance = account.lock().await;
        let new_balance = if status == TransactionStatus::Success {
            apply_delta(&mut balance, -amount.to_minor_units(), user_id)?
        } else {
            decimal_from_minor_units(*balance)
        };

        let transaction = self
            .append_transaction(NewTransaction {
                user_id,
                tx_type: TransactionType::Withdraw,
                amount,
                status,
                tx_ref: Some(tx_ref.clone()),
            })
            .await;

        Ok(WithdrawalRecord {
            transaction,
            balance: new_balance,
        })
    }

    async fn record_transaction(&self, tx: NewTransaction) -> StorageResult<Transaction> {
        Ok(self.append_transaction(tx).await)
    }

    async fn transactions(&self, user_id: UserId, limit: usize) -> StorageResult<Vec<Transaction>> {
        let transactions = self.transactions.lock().await;
        Ok(transactions
            .iter()
            .rev()
            .filter(|tx| tx.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn bets(&self, user_id: UserId, limit: usize) -> StorageResult<Vec<Bet>> {
        let bets = self.bets.lock().await;
        Ok(bets
            .iter()
            .rev()
            .filter(|bet| bet.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BetStatus;
    use std::str::FromStr;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn amount(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_balance_creates_account_at_zero() {
        let repo = InMemoryLedgerRepository::new();
        assert_eq!(repo.balance(user(1)).await.unwrap(), Decimal::ZERO);
        assert_eq!(repo.accounts.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_adjust_balance_can_go_negative() {
        let repo = InMemoryLedgerRepository::new();
        let balance = repo.adjust_balance(user(1), Decimal::from(-5)).await.unwrap();
        assert_eq!(balance, Decimal::from(-5));
    }

    #[tokio::test]
    async fn test_adjust_balance_rejects_sub_cent_delta() {
        let repo = InMemoryLedgerRepository::new();
        let result = repo
            .adjust_balance(user(1), Decimal::from_str("0.001").unwrap())
            .await;
        assert!(matches!(result, Err(StorageError::Unrepresentable(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adjustments_lose_no_updates() {
        let repo = Arc::new(InMemoryLedgerRepository::new());
        repo.adjust_balance(user(7), Decimal::from(1000)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..200 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let delta = if i % 2 == 0 {
                    Decimal::from_str("1.25").unwrap()
                } else {
                    Decimal::from_str("-0.75").unwrap()
                };
                repo.adjust_balance(user(7), delta).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 100 * 1.25 - 100 * 0.75 = 50
        assert_eq!(repo.balance(user(7)).await.unwrap(), Decimal::from(1050));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redelivery_credits_once() {
        let repo = Arc::new(InMemoryLedgerRepository::new());
        let tx_ref = TxRef::deposit(user(5));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let repo = repo.clone();
            let tx_ref = tx_ref.clone();
            handles.push(tokio::spawn(async move {
                repo.credit_deposit(user(5), amount("100"), &tx_ref)
                    .await
                    .unwrap()
            }));
        }

        let mut credited = 0;
        for handle in handles {
            if let DepositCredit::Credited { .. } = handle.await.unwrap() {
                credited += 1;
            }
        }

        assert_eq!(credited, 1);
        assert_eq!(repo.balance(user(5)).await.unwrap(), Decimal::from(100));
        let rows = repo.transactions(user(5), 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TransactionStatus::Success);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bets_never_overdraw() {
        let repo = Arc::new(InMemoryLedgerRepository::new());
        repo.adjust_balance(user(8), Decimal::from(100)).await.unwrap();

        // 30 stakes of 10 against a balance of 100
        let mut handles = Vec::new();
        for _ in 0..30 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.apply_bet(NewBet {
                    user_id: user(8),
                    game: "aviator".to_string(),
                    stake: amount("10"),
                    multiplier: Decimal::from(2),
                    status: BetStatus::Lost,
                    payout: Decimal::ZERO,
                })
                .await
                .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                BetApplication::Applied { balance, .. } => {
                    assert!(balance >= Decimal::ZERO);
                    applied += 1;
                }
                BetApplication::InsufficientFunds { available } => {
                    assert!(available >= Decimal::ZERO);
                }
            }
        }

        assert_eq!(applied, 10);
        assert_eq!(repo.balance(user(8)).await.unwrap(), Decimal::ZERO);
        assert_eq!(repo.bets(user(8), 100).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_apply_bet_rejects_stake_above_balance() {
        let repo = InMemoryLedgerRepository::new();
        repo.adjust_balance(user(1), Decimal::from(10)).await.unwrap();

        let result = repo
            .apply_bet(NewBet {
                user_id: user(1),
                game: "aviator".to_string(),
                stake: amount("10.01"),
                multiplier: Decimal::from(2),
                status: BetStatus::Lost,
                payout: Decimal::ZERO,
            })
            .await
            .unwrap();

        assert_eq!(
            result,
            BetApplication::InsufficientFunds {
                available: Decimal::from(10)
            }
        );
        assert!(repo.bets(user(1), 10).await.unwrap().is_empty());
        assert_eq!(repo.balance(user(1)).await.unwrap(), Decimal::from(10));
    }

    #[tokio::test]
    async fn test_credit_deposit_is_idempotent_per_reference() {
        let repo = InMemoryLedgerRepository::new();
        let tx_ref = TxRef::from("tx-1-aaaaaa");

        let first = repo.credit_deposit(user(1), amount("100"), &tx_ref).await.unwrap();
        let second = repo.credit_deposit(user(1), amount("100"), &tx_ref).await.unwrap();

        assert!(matches!(first, DepositCredit::Credited { .. }));
        assert_eq!(second, DepositCredit::Duplicate);
        assert_eq!(repo.balance(user(1)).await.unwrap(), Decimal::from(100));
        assert_eq!(repo.transactions(user(1), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_withdrawal_leaves_balance() {
        let repo = InMemoryLedgerRepository::new();
        repo.adjust_balance(user(1), Decimal::from(30)).await.unwrap();

        let record = repo
            .settle_withdrawal(user(1), amount("20"), &TxRef::from("wd-1"), TransactionStatus::Failed)
            .await
            .unwrap();

        assert_eq!(record.balance, Decimal::from(30));
        assert_eq!(record.transaction.status, TransactionStatus::Failed);
        assert_eq!(record.transaction.tx_type, TransactionType::Withdraw);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_per_user() {
        let repo = InMemoryLedgerRepository::new();
        for i in 0..3 {
            repo.record_transaction(NewTransaction {
                user_id: user(1),
                tx_type: TransactionType::Deposit,
                amount: amount("5"),
                status: TransactionStatus::Pending,
                tx_ref: Some(TxRef::from(format!("tx-1-{i}"))),
            })
            .await
            .unwrap();
        }
        repo.record_transaction(NewTransaction {
            user_id: user(2),
            tx_type: TransactionType::Deposit,
            amount: amount("5"),
            status: TransactionStatus::Pending,
            tx_ref: None,
        })
        .await
        .unwrap();

        let history = repo.transactions(user(1), 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].id > history[1].id);
        assert!(history.iter().all(|tx| tx.user_id == user(1)));
    }
}
