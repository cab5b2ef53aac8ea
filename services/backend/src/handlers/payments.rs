use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use wallet_shared::Amount;

use crate::{
    domain::{InitPaymentRequest, WithdrawRequest},
    errors::{AppError, Result},
    extractors::ValidatedJson,
    services::{DepositRequest, ReconciliationOutcome, WithdrawalOutcome},
    state::AppState,
};

const SIGNATURE_HEADERS: [&str; 2] = ["chapa-signature", "x-chapa-signature"];

pub async fn init_payment(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<InitPaymentRequest>,
) -> Result<Json<Value>> {
    let amount = Amount::new(req.amount)?;
    let email = req
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or(AppError::MissingField("email"))?;
    if !validator::validate_email(&email) {
        return Err(AppError::invalid_request("Invalid email address"));
    }

    let reply = state
        .reconciler
        .initiate_deposit(DepositRequest {
            user_id: req.user_id,
            amount,
            email,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;
    Ok(Json(reply))
}

/// Provider callback; acknowledged with 200 unless the ledger write failed
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok());

    let outcome = state.reconciler.handle_callback(&body, signature).await?;
    let status = match outcome {
        ReconciliationOutcome::Credited { .. } | ReconciliationOutcome::Duplicate => "ok",
        ReconciliationOutcome::Ignored(_) => "ignored",
    };
    Ok(Json(json!({ "status": status })))
}

pub async fn withdraw(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<WithdrawRequest>,
) -> Result<Response> {
    let amount = Amount::new(req.amount)?;
    let outcome = state
        .payouts
        .initiate_withdrawal(req.user_id, amount, req.email.as_deref())
        .await?;

    let response = match outcome {
        WithdrawalOutcome::Succeeded { balance, tx_ref } => (
            StatusCode::OK,
            Json(json!({ "status": "success", "balance": balance, "tx_ref": tx_ref })),
        ),
        WithdrawalOutcome::Failed { detail } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "failed", "detail": detail })),
        ),
    };
    Ok(response.into_response())
}
