use axum::{extract::State, Json};
use serde::Serialize;
use wallet_shared::{Amount, UserId};

use crate::{
    domain::{BalanceRequest, BalanceResponse, Bet, HistoryQuery, PlaceBetRequest, Transaction},
    errors::Result,
    extractors::{ValidatedJson, ValidatedQuery},
    services::BetReceipt,
    state::AppState,
};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: UserId,
    pub transactions: Vec<Transaction>,
    pub bets: Vec<Bet>,
}

pub async fn get_balance(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<BalanceRequest>,
) -> Result<Json<BalanceResponse>> {
    let balance = state.balances.get_balance(req.user_id).await?;
    Ok(Json(BalanceResponse {
        user_id: req.user_id,
        balance,
    }))
}

pub async fn place_bet(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PlaceBetRequest>,
) -> Result<Json<BetReceipt>> {
    let stake = Amount::new(req.amount)?;
    let receipt = state
        .bets
        .place_bet(req.user_id, req.game.as_deref(), stake)
        .await?;
    Ok(Json(receipt))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<Vec<Transaction>>> {
    let limit = history_limit(query.limit);
    let transactions = state.ledger.transactions(query.user_id, limit).await?;
    tracing::debug!(user_id = %query.user_id, count = transactions.len(), "Retrieved transactions");
    Ok(Json(transactions))
}

pub async fn list_bets(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<Vec<Bet>>> {
    let limit = history_limit(query.limit);
    let bets = state.ledger.bets(query.user_id, limit).await?;
    tracing::debug!(user_id = %query.user_id, count = bets.len(), "Retrieved bets");
    Ok(Json(bets))
}

/// Both audit logs for one user, newest first
pub async fn history(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = history_limit(query.limit);
    let (transactions, bets) = state.balances.history(query.user_id, limit).await?;
    Ok(Json(HistoryResponse {
        user_id: query.user_id,
        transactions,
        bets,
    }))
}

fn history_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT)
}
