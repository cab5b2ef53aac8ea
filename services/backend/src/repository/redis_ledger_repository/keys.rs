//! Redis key generation functions
//!
//! Centralizes all Redis key patterns used for ledger storage and indexing.
//! Lua scripts build `tx:{id}` and `bet:{id}` keys themselves from the
//! same prefixes.

use wallet_shared::UserId;

/// Redis key prefix for account hashes
const ACCOUNT_KEY_PREFIX: &str = "account:";

/// Redis key prefix for transaction hashes
pub const TRANSACTION_KEY_PREFIX: &str = "tx:";

/// Redis key prefix for a user's transaction index
const USER_TRANSACTIONS_PREFIX: &str = "txs:user:";

/// Redis key prefix for the credited-deposit uniqueness index
const CREDITED_REF_PREFIX: &str = "txs:ref:";

/// Redis key prefix for bet hashes
pub const BET_KEY_PREFIX: &str = "bet:";

/// Redis key prefix for a user's bet index
const USER_BETS_PREFIX: &str = "bets:user:";

/// Transaction id sequence
const TRANSACTION_SEQUENCE: &str = "seq:tx";

/// Bet id sequence
const BET_SEQUENCE: &str = "seq:bet";

pub fn account_key(user_id: UserId) -> String {
    format!("{}{}", ACCOUNT_KEY_PREFIX, user_id)
}

pub fn transaction_key(id: u64) -> String {
    format!("{}{}", TRANSACTION_KEY_PREFIX, id)
}

pub fn user_transactions_key(user_id: UserId) -> String {
    format!("{}{}", USER_TRANSACTIONS_PREFIX, user_id)
}

pub fn credited_ref_key(tx_ref: &str) -> String {
    format!("{}{}", CREDITED_REF_PREFIX, tx_ref)
}

pub fn bet_key(id: u64) -> String {
    format!("{}{}", BET_KEY_PREFIX, id)
}

pub fn user_bets_key(user_id: UserId) -> String {
    format!("{}{}", USER_BETS_PREFIX, user_id)
}

pub fn transaction_sequence_key() -> &'static str {
    TRANSACTION_SEQUENCE
}

pub fn bet_sequence_key() -> &'static str {
    BET_SEQUENCE
}
