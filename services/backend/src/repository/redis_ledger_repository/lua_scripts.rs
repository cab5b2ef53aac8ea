//! Redis Lua scripts for atomic ledger operations
//!
//! Every script that moves money also lazily creates the account hash, so
//! a first-touch credit or bet never races account creation. Amounts are
//! integer minor units; `HINCRBY` keeps them exact.

/// Lua script to check funds, apply a bet's net delta and append the bet row
///
/// Keys: [account, bet_sequence, user_bets_index]
/// Args: [stake_minor, delta_minor, now_ms, user_id, game, multiplier, status, payout_minor]
///
/// Returns: [applied (1|0), balance_minor, bet_id]
pub const APPLY_BET_SCRIPT: &str = r#"
local account = KEYS[1]
local stake = tonumber(ARGV[1])
local now_ms = ARGV[3]

redis.call('HSETNX', account, 'created_at_ms', now_ms)
redis.call('HSETNX', account, 'balance_minor', '0')

local balance = tonumber(redis.call('HGET', account, 'balance_minor'))
if stake > balance then
  return { 0, balance, 0 }
end

local new_balance = redis.call('HINCRBY', account, 'balance_minor', ARGV[2])
local bet_id = redis.call('INCR', KEYS[2])

redis.call('HSET', 'bet:' .. bet_id,
  'id', bet_id,
  'user_id', ARGV[4],
  'game', ARGV[5],
  'amount_minor', ARGV[1],
  'multiplier', ARGV[6],
  'status', ARGV[7],
  'payout_minor', ARGV[8],
  'created_at_ms', now_ms
)
redis.call('ZADD', KEYS[3], bet_id, bet_id)

return { 1, new_balance, bet_id }
"#;

/// Lua script to credit a deposit at most once per payment reference
///
/// Keys: [account, credited_ref, transaction_sequence, user_transactions_index]
/// Args: [amount_minor, now_ms, user_id, tx_ref]
///
/// Returns: [credited (1|0), balance_minor, transaction_id]
pub const CREDIT_DEPOSIT_SCRIPT: &str = r#"
local account = KEYS[1]
local credited_ref = KEYS[2]
local now_ms = ARGV[2]

if redis.call('EXISTS', credited_ref) == 1 then
  return { 0, 0, 0 }
end

redis.call('HSETNX', account, 'created_at_ms', now_ms)
redis.call('HSETNX', account, 'balance_minor', '0')

local new_balance = redis.call('HINCRBY', account, 'balance_minor', ARGV[1])
local tx_id = redis.call('INCR', KEYS[3])

redis.call('HSET', 'tx:' .. tx_id,
  'id', tx_id,
  'user_id', ARGV[3],
  'type', 'deposit',
  'amount_minor', ARGV[1],
  'status', 'success',
  'tx_ref', ARGV[4],
  'created_at_ms', now_ms
)
redis.call('ZADD', KEYS[4], tx_id, tx_id)
redis.call('SET', credited_ref, tx_id)

return { 1, new_balance, tx_id }
"#;

/// Lua script to record a payout outcome, debiting only on success
///
/// Keys: [account, transaction_sequence, user_transactions_index]
/// Args: [amount_minor, debit_minor, now_ms, user_id, tx_ref, status]
///
/// Returns: [balance_minor, transaction_id]
pub const SETTLE_WITHDRAWAL_SCRIPT: &str = r#"
local account = KEYS[1]
local now_ms = ARGV[3]
local status = ARGV[6]

redis.call('HSETNX', account, 'created_at_ms', now_ms)
redis.call('HSETNX', account, 'balance_minor', '0')

local balance
if status == 'success' then
  balance = redis.call('HINCRBY', account, 'balance_minor', ARGV[2])
else
  balance = tonumber(redis.call('HGET', account, 'balance_minor'))
end

local tx_id = redis.call('INCR', KEYS[2])
redis.call('HSET', 'tx:' .. tx_id,
  'id', tx_id,
  'user_id', ARGV[4],
  'type', 'withdraw',
  'amount_minor', ARGV[1],
  'status', status,
  'tx_ref', ARGV[5],
  'created_at_ms', now_ms
)
redis.call('ZADD', KEYS[3], tx_id, tx_id)

return { balance, tx_id }
"#;

/// Lua script to append an audit-only transaction row
///
/// Keys: [transaction_sequence, user_transactions_index]
/// Args: [user_id, type, amount_minor, status, tx_ref, now_ms]
///
/// Returns: transaction_id
pub const APPEND_TRANSACTION_SCRIPT: &str = r#"
local tx_id = redis.call('INCR', KEYS[1])
redis.call('HSET', 'tx:' .. tx_id,
  'id', tx_id,
  'user_id', ARGV[1],
  'type', ARGV[2],
  'amount_minor', ARGV[3],
  'status', ARGV[4],
  'tx_ref', ARGV[5],
  'created_at_ms', ARGV[6]
)
redis.call('ZADD', KEYS[2], tx_id, tx_id)
return tx_id
"#;
