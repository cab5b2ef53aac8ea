//! Provider webhook payload parsing
//!
//! Callbacks arrive either flat (`{tx_ref, status, amount}`) or nested under
//! `data`. A flat field wins when it is present and non-empty.

use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use wallet_shared::{Amount, TxRef, UserId};

const SUCCESS_STATUS: &str = "success";

/// A well-formed, successful deposit notification
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationEvent {
    pub tx_ref: TxRef,
    pub user_id: UserId,
    pub amount: Amount,
}

/// Why a callback produced no ledger mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingReference,
    UnparseableReference(String),
    MissingStatus,
    NotSuccessful(String),
    InvalidAmount(String),
    BadSignature,
    MalformedBody,
}

impl IgnoreReason {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::MissingReference => "missing_reference",
            IgnoreReason::UnparseableReference(_) => "unparseable_reference",
            IgnoreReason::MissingStatus => "missing_status",
            IgnoreReason::NotSuccessful(_) => "not_successful",
            IgnoreReason::InvalidAmount(_) => "invalid_amount",
            IgnoreReason::BadSignature => "bad_signature",
            IgnoreReason::MalformedBody => "malformed_body",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnparseableReference(r) => write!(f, "unparseable reference '{}'", r),
            IgnoreReason::NotSuccessful(s) => write!(f, "status '{}'", s),
            IgnoreReason::InvalidAmount(a) => write!(f, "invalid amount {}", a),
            other => f.write_str(other.as_str()),
        }
    }
}

pub struct ProviderCallback;

impl ProviderCallback {
    pub fn parse(payload: &Value) -> Result<ReconciliationEvent, IgnoreReason> {
        let tx_ref = match field(payload, "tx_ref") {
            None => return Err(IgnoreReason::MissingReference),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => return Err(IgnoreReason::UnparseableReference(other.to_string())),
        };
        let tx_ref = TxRef::from(tx_ref);
        let user_id = tx_ref
            .deposit_user()
            .ok_or_else(|| IgnoreReason::UnparseableReference(tx_ref.to_string()))?;

        match field(payload, "status") {
            None => return Err(IgnoreReason::MissingStatus),
            Some(Value::String(s)) if s == SUCCESS_STATUS => {}
            Some(Value::String(s)) => return Err(IgnoreReason::NotSuccessful(s.clone())),
            Some(other) => return Err(IgnoreReason::NotSuccessful(other.to_string())),
        }

        let raw_amount = field(payload, "amount")
            .ok_or_else(|| IgnoreReason::InvalidAmount("missing".to_string()))?;
        let amount = parse_amount(raw_amount)
            .ok_or_else(|| IgnoreReason::InvalidAmount(raw_amount.to_string()))?;

        Ok(ReconciliationEvent {
            tx_ref,
            user_id,
            amount,
        })
    }
}

/// Flat field if set, else `data.{name}`
fn field<'a>(payload: &'a Value, name: &str) -> Option<&'a Value> {
    payload
        .get(name)
        .filter(|v| is_set(v))
        .or_else(|| payload.get("data").and_then(|d| d.get(name)).filter(|v| is_set(v)))
}

/// Empty strings, zero, false, null and empty containers count as unset
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn parse_amount(value: &Value) -> Option<Amount> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let decimal = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;
    Amount::from_provider(decimal).ok()
}
