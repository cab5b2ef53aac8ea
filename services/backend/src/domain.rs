use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wallet_shared::{Amount, TxRef, UserId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionType::Deposit),
            "withdraw" => Some(TransactionType::Withdraw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(TransactionStatus::Success),
            "failed" => Some(TransactionStatus::Failed),
            "pending" => Some(TransactionStatus::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Won,
    Lost,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "won" => Some(BetStatus::Won),
            "lost" => Some(BetStatus::Lost),
            _ => None,
        }
    }
}

/// Append-only ledger row for money entering or leaving the house
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: u64,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub tx_ref: Option<TxRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub tx_type: TransactionType,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub tx_ref: Option<TxRef>,
}

/// Append-only record of a settled bet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub id: u64,
    pub user_id: UserId,
    pub game: String,
    pub amount: Amount,
    pub multiplier: Decimal,
    pub payout: Decimal,
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
}

/// A drawn bet that has not been applied to the ledger yet
#[derive(Debug, Clone)]
pub struct NewBet {
    pub user_id: UserId,
    pub game: String,
    pub stake: Amount,
    pub multiplier: Decimal,
    pub status: BetStatus,
    /// Gross credit on a win (`stake * multiplier`), zero on a loss
    pub payout: Decimal,
}

impl NewBet {
    /// Net balance change: `payout - stake`
    pub fn ledger_delta(&self) -> Decimal {
        self.payout - self.stake.as_decimal()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub user_id: UserId,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceBetRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    pub game: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitPaymentRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequest {
    pub init_data: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub user_id: UserId,
    pub limit: Option<usize>,
}
