/// Shared constants for the wallet services
///
/// Centralizes the money and reference-format rules so the HTTP surface,
/// the ledger and the reconciliation path agree on them.

/// Settlement currency sent to the payment provider
pub const CURRENCY: &str = "ETB";

/// Number of decimal places a balance or amount may carry
///
/// Ledger storage works in integer minor units of this scale.
pub const MONEY_SCALE: u32 = 2;

/// Minor units per whole currency unit (10^MONEY_SCALE)
pub const MINOR_UNITS_PER_UNIT: i64 = 100;

/// First token of a deposit reference: `tx-{user_id}-{suffix}`
pub const DEPOSIT_REF_PREFIX: &str = "tx";

/// First token of a withdrawal reference: `wd-{suffix}`
pub const WITHDRAWAL_REF_PREFIX: &str = "wd";

/// Separator between reference tokens
pub const TX_REF_DELIMITER: char = '-';

/// Random bytes in a reference suffix (hex encoded, so twice as many chars)
pub const TX_REF_SUFFIX_BYTES: usize = 6;

/// Game label used when a bet request does not name one
pub const DEFAULT_GAME: &str = "aviator";
