//! Redis-based LedgerRepository implementation
//!
//! Accounts are hashes holding an integer `balance_minor`; transactions and
//! bets are append-only hashes indexed per user by sorted sets scored with
//! their sequence id. Multi-key steps run as Lua scripts so each is atomic.

mod deserialization;
mod keys;
mod lua_scripts;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use rust_decimal::Decimal;
use wallet_shared::{decimal_from_minor_units, decimal_to_minor_units, Amount, TxRef, UserId};

use super::ledger_repository::{
    BetApplication, DepositCredit, LedgerRepository, StorageError, StorageResult,
    WithdrawalRecord,
};
use crate::domain::{Bet, NewBet, NewTransaction, Transaction, TransactionStatus};

pub use deserialization::*;
pub use keys::*;
pub use lua_scripts::*;

pub struct RedisLedgerRepository {
    redis: ConnectionManager,
    apply_bet: Script,
    credit_deposit: Script,
    settle_withdrawal: Script,
    append_transaction: Script,
}

impl RedisLedgerRepository {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            apply_bet: Script::new(APPLY_BET_SCRIPT),
            credit_deposit: Script::new(CREDIT_DEPOSIT_SCRIPT),
            settle_withdrawal: Script::new(SETTLE_WITHDRAWAL_SCRIPT),
            append_transaction: Script::new(APPEND_TRANSACTION_SCRIPT),
        }
    }

    async fn load_transaction_row(&self, id: u64) -> StorageResult<Transaction> {
        let mut redis_conn = self.redis.clone();
        load_transaction(&mut redis_conn, id)
            .await?
            .ok_or_else(|| StorageError::Corrupt(format!("transaction {} missing after write", id)))
    }
}

fn script_reply(reply: &[i64], len: usize, script: &str) -> StorageResult<()> {
    if reply.len() != len {
        return Err(StorageError::Corrupt(format!(
            "{} returned {} values, expected {}",
            script,
            reply.len(),
            len
        )));
    }
    Ok(())
}

fn row_id(raw: i64) -> StorageResult<u64> {
    u64::try_from(raw).map_err(|_| StorageError::Corrupt(format!("invalid row id {}", raw)))
}

#[async_trait]
impl LedgerRepository for RedisLedgerRepository {
    async fn balance(&self, user_id: UserId) -> StorageResult<Decimal> {
        let mut redis_conn = self.redis.clone();
        let key = account_key(user_id);
        let now_ms = Utc::now().timestamp_millis();

        let (balance_minor,): (i64,) = redis::pipe()
            .atomic()
            .hset_nx(&key, "created_at_ms", now_ms)
            .ignore()
            .hset_nx(&key, "balance_minor", 0)
            .ignore()
            .hget(&key, "balance_minor")
            .query_async(&mut redis_conn)
            .await?;

        Ok(decimal_from_minor_units(balance_minor))
    }

    async fn adjust_balance(&self, user_id: UserId, delta: Decimal) -> StorageResult<Decimal> {
        let delta_minor = decimal_to_minor_units(delta)?;
        let mut redis_conn = self.redis.clone();
        let key = account_key(user_id);
        let now_ms = Utc::now().timestamp_millis();

        let (balance_minor,): (i64,) = redis::pipe()
            .atomic()
            .hset_nx(&key, "created_at_ms", now_ms)
            .ignore()
            .hincr(&key, "balance_minor", delta_minor)
            .query_async(&mut redis_conn)
            .await?;

        Ok(decimal_from_minor_units(balance_minor))
    }

    async fn apply_bet(&self, bet: NewBet) -> StorageResult<BetApplication> {
        let delta_minor = decimal_to_minor_units(bet.ledger_delta())?;
        let payout_minor = decimal_to_minor_units(bet.payout)?;
        let now = Utc::now();
        let mut redis_conn = self.redis.clone();

        let reply: Vec<i64> = self
            .apply_bet
            .key(account_key(bet.user_id))
            .key(bet_sequence_key())
            .key(user_bets_key(bet.user_id))
            .arg(bet.stake.to_minor_units())
            .arg(delta_minor)
            .arg(now.timestamp_millis())
            .arg(bet.user_id.get())
            .arg(&bet.game)
            .arg(bet.multiplier.to_string())
            .arg(bet.status.as_str())
            .arg(payout_minor)
            .invoke_async(&mut redis_conn)
            .await?;
        script_reply(&reply, 3, "APPLY_BET_SCRIPT")?;

        let balance = decimal_from_minor_units(reply[1]);
        if reply[0] == 0 {
            return Ok(BetApplication::InsufficientFunds { available: balance });
        }

        Ok(BetApplication::Applied {
            bet: Bet {
                id: row_id(reply[2])?,
                user_id: bet.user_id,
                game: bet.game,
                amount: bet.stake,
                multiplier: bet.multiplier,
                payout: bet.payout,
                status: bet.status,
                created_at: now,
            },
            balance,
        })
    }

    async fn credit_deposit(
        &self,
        user_id: UserId,
        amount: Amount,
        tx_ref: &TxRef,
    ) -> StorageResult<DepositCredit> {
        let mut redis_conn = self.redis.clone();

        let reply: Vec<i64> = self
            .credit_deposit
            .key(account_key(user_id))
            .key(credited_ref_key(tx_ref.as_str()))
            .key(transaction_sequence_key())
            .key(user_transactions_key(user_id))
            .arg(amount.to_minor_units())
            .arg(Utc::now().timestamp_millis())
            .arg(user_id.get())
            .arg(tx_ref.as_str())
            .invoke_async(&mut redis_conn)
            .await?;
        script_reply(&reply, 3, "CREDIT_DEPOSIT_SCRIPT")?;

        if reply[0] == 0 {
            return Ok(DepositCredit::Duplicate);
        }

        let transaction = self.load_transaction_row(row_id(reply[2])?).await?;
        Ok(DepositCredit::Credited {
            transaction,
            balance: decimal_from_minor_units(reply[1]),
        })
    }

    async fn settle_withdrawal(
        &self,
        user_id: UserId,
        amount: Amount,
        tx_ref: &TxRef,
        status: TransactionStatus,
    ) -> StorageResult<WithdrawalRecord> {
        let mut redis_conn = self.redis.clone();
        let amount_minor = amount.to_minor_units();

        let reply: Vec<i64> = self
            .settle_withdrawal
            .key(account_key(user_id))
            .key(transaction_sequence_key())
            .key(user_transactions_key(user_id))
            .arg(amount_minor)
            .arg(-amount_minor)
            .arg(Utc::now().timestamp_millis())
            .arg(user_id.get())
            .arg(tx_ref.as_str())
            .arg(status.as_str())
            .invoke_async(&mut redis_conn)
            .await?;
        script_reply(&reply, 2, "SETTLE_WITHDRAWAL_SCRIPT")?;

        let transaction = self.load_transaction_row(row_id(reply[1])?).await?;
        Ok(WithdrawalRecord {
            transaction,
            balance: decimal_from_minor_units(reply[0]),
        })
    }

    async fn record_transaction(&self, tx: NewTransaction) -> StorageResult<Transaction> {
        let mut redis_conn = self.redis.clone();
        let tx_ref = tx
            .tx_ref
            .as_ref()
            .map(|r| r.as_str().to_string())
            .unwrap_or_default();

        let id: i64 = self
            .append_transaction
            .key(transaction_sequence_key())
            .key(user_transactions_key(tx.user_id))
            .arg(tx.user_id.get())
            .arg(tx.tx_type.as_str())
            .arg(tx.amount.to_minor_units())
            .arg(tx.status.as_str())
            .arg(tx_ref)
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut redis_conn)
            .await?;

        self.load_transaction_row(row_id(id)?).await
    }

    async fn transactions(&self, user_id: UserId, limit: usize) -> StorageResult<Vec<Transaction>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut redis_conn = self.redis.clone();
        let ids: Vec<u64> = redis_conn
            .zrevrange(user_transactions_key(user_id), 0, limit as isize - 1)
            .await?;

        let mut transactions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tx) = load_transaction(&mut redis_conn, id).await? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    async fn bets(&self, user_id: UserId, limit: usize) -> StorageResult<Vec<Bet>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut redis_conn = self.redis.clone();
        let ids: Vec<u64> = redis_conn
            .zrevrange(user_bets_key(user_id), 0, limit as isize - 1)
            .await?;

        let mut bets = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bet) = load_bet(&mut redis_conn, id).await? {
                bets.push(bet);
            }
        }
        Ok(bets)
    }

    async fn ping(&self) -> StorageResult<()> {
        let mut redis_conn = self.redis.clone();
        let _: String = redis::cmd("PING").query_async(&mut redis_conn).await?;
        Ok(())
    }
}
