/// Type-safe wrappers for domain primitives
///
/// These types enforce validation at construction time so the ledger never
/// sees a zero user, a non-positive amount, or a sub-cent fraction.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Amount {amount} has more than {max} decimal places")]
    TooPrecise { amount: Decimal, max: u32 },

    #[error("Amount {0} does not fit the ledger's range")]
    OutOfRange(Decimal),

    #[error("User id must be non-zero")]
    ZeroUserId,
}

/// Chat-platform user identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id == 0 {
            return Err(ValidationError::ZeroUserId);
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = ValidationError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strictly positive money amount with at most `MONEY_SCALE` decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Validate a caller-supplied amount
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(value));
        }
        if value.normalize().scale() > MONEY_SCALE {
            return Err(ValidationError::TooPrecise {
                amount: value,
                max: MONEY_SCALE,
            });
        }
        // Must be representable in minor units
        decimal_to_minor_units(value)?;
        Ok(Self(value.normalize()))
    }

    /// Round a provider-reported amount to the money scale, then validate
    pub fn from_provider(value: Decimal) -> Result<Self, ValidationError> {
        Self::new(round_money(value))
    }

    pub fn from_minor_units(minor: i64) -> Result<Self, ValidationError> {
        Self::new(decimal_from_minor_units(minor))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn to_minor_units(&self) -> i64 {
        // Checked in `new`
        decimal_to_minor_units(self.0).unwrap_or(i64::MAX)
    }

    /// Multiply by a non-negative factor, rounding to the money scale
    ///
    /// Returns `None` on overflow or when the rounded product is zero.
    pub fn scaled(&self, factor: Decimal) -> Option<Self> {
        let product = self.0.checked_mul(factor)?;
        Self::new(round_money(product)).ok()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Round to the money scale, midpoint away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a decimal (e.g. a signed balance delta) into integer minor units
pub fn decimal_to_minor_units(value: Decimal) -> Result<i64, ValidationError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(ValidationError::TooPrecise {
            amount: value,
            max: MONEY_SCALE,
        });
    }
    value
        .checked_mul(Decimal::from(MINOR_UNITS_PER_UNIT))
        .and_then(|minor| minor.to_i64())
        .ok_or(ValidationError::OutOfRange(value))
}

pub fn decimal_from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MONEY_SCALE)
}

/// Opaque payment reference correlating an outbound request with its callback
///
/// Deposit references embed the user id (`tx-{user_id}-{hex}`) so a
/// provider callback can be mapped back to the account without a
/// server-side pending table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    pub fn deposit(user_id: UserId) -> Self {
        Self(format!(
            "{DEPOSIT_REF_PREFIX}{TX_REF_DELIMITER}{user_id}{TX_REF_DELIMITER}{}",
            random_suffix()
        ))
    }

    pub fn withdrawal() -> Self {
        Self(format!(
            "{WITHDRAWAL_REF_PREFIX}{TX_REF_DELIMITER}{}",
            random_suffix()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// User embedded in a deposit reference, if this is one
    pub fn deposit_user(&self) -> Option<UserId> {
        parse_deposit_user(&self.0)
    }
}

impl From<String> for TxRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TxRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recover the user id from `tx-{user_id}-{suffix}`
///
/// Group chats have negative ids, so the id may start with the delimiter
/// itself (`tx--5-{suffix}`).
pub fn parse_deposit_user(tx_ref: &str) -> Option<UserId> {
    let rest = tx_ref
        .strip_prefix(DEPOSIT_REF_PREFIX)?
        .strip_prefix(TX_REF_DELIMITER)?;
    let (sign, unsigned) = match rest.strip_prefix(TX_REF_DELIMITER) {
        Some(unsigned) => ("-", unsigned),
        None => ("", rest),
    };
    let (digits, _suffix) = unsigned.split_once(TX_REF_DELIMITER)?;
    format!("{sign}{digits}")
        .parse::<i64>()
        .ok()
        .and_then(|id| UserId::new(id).ok())
}

fn random_suffix() -> String {
    let mut bytes = [0u8; TX_REF_SUFFIX_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
