//! Deserialization of ledger rows from Redis hash storage

use chrono::{DateTime, TimeZone, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use wallet_shared::{decimal_from_minor_units, Amount, TxRef, UserId};

use super::keys::{bet_key, transaction_key};
use crate::domain::{Bet, BetStatus, Transaction, TransactionStatus, TransactionType};
use crate::repository::ledger_repository::{StorageError, StorageResult};

/// Load a transaction row; `Ok(None)` when the hash does not exist
pub async fn load_transaction(
    redis: &mut ConnectionManager,
    id: u64,
) -> StorageResult<Option<Transaction>> {
    let map: HashMap<String, String> = redis.hgetall(transaction_key(id)).await?;
    if map.is_empty() {
        return Ok(None);
    }
    transaction_from_map(id, &map).map(Some)
}

/// Load a bet row; `Ok(None)` when the hash does not exist
pub async fn load_bet(redis: &mut ConnectionManager, id: u64) -> StorageResult<Option<Bet>> {
    let map: HashMap<String, String> = redis.hgetall(bet_key(id)).await?;
    if map.is_empty() {
        return Ok(None);
    }
    bet_from_map(id, &map).map(Some)
}

pub fn transaction_from_map(id: u64, map: &HashMap<String, String>) -> StorageResult<Transaction> {
    let corrupt = |field: &str| StorageError::Corrupt(format!("transaction {} field {}", id, field));

    let tx_type = map
        .get("type")
        .and_then(|v| TransactionType::parse(v))
        .ok_or_else(|| corrupt("type"))?;
    let status = map
        .get("status")
        .and_then(|v| TransactionStatus::parse(v))
        .ok_or_else(|| corrupt("status"))?;

    Ok(Transaction {
        id,
        user_id: parse_user(map).ok_or_else(|| corrupt("user_id"))?,
        tx_type,
        amount: parse_amount(map, "amount_minor").ok_or_else(|| corrupt("amount_minor"))?,
        status,
        tx_ref: map
            .get("tx_ref")
            .filter(|v| !v.is_empty())
            .map(|v| TxRef::from(v.as_str())),
        created_at: parse_timestamp(map).ok_or_else(|| corrupt("created_at_ms"))?,
    })
}

pub fn bet_from_map(id: u64, map: &HashMap<String, String>) -> StorageResult<Bet> {
    let corrupt = |field: &str| StorageError::Corrupt(format!("bet {} field {}", id, field));

    let status = map
        .get("status")
        .and_then(|v| BetStatus::parse(v))
        .ok_or_else(|| corrupt("status"))?;
    let multiplier = map
        .get("multiplier")
        .and_then(|v| Decimal::from_str(v).ok())
        .ok_or_else(|| corrupt("multiplier"))?;
    let payout = map
        .get("payout_minor")
        .and_then(|v| v.parse::<i64>().ok())
        .map(decimal_from_minor_units)
        .ok_or_else(|| corrupt("payout_minor"))?;

    Ok(Bet {
        id,
        user_id: parse_user(map).ok_or_else(|| corrupt("user_id"))?,
        game: map.get("game").cloned().unwrap_or_default(),
        amount: parse_amount(map, "amount_minor").ok_or_else(|| corrupt("amount_minor"))?,
        multiplier,
        payout,
        status,
        created_at: parse_timestamp(map).ok_or_else(|| corrupt("created_at_ms"))?,
    })
}

fn parse_user(map: &HashMap<String, String>) -> Option<UserId> {
    map.get("user_id")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|id| UserId::new(id).ok())
}

fn parse_amount(map: &HashMap<String, String>, field: &str) -> Option<Amount> {
    map.get(field)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|minor| Amount::from_minor_units(minor).ok())
}

fn parse_timestamp(map: &HashMap<String, String>) -> Option<DateTime<Utc>> {
    map.get("created_at_ms")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}
