use axum::{extract::State, Json};

use crate::{
    domain::{AuthRequest, BalanceResponse},
    errors::{AppError, Result},
    extractors::ValidatedJson,
    state::AppState,
};

/// Verify mini-app init data and open (or create) the signed user's wallet
pub async fn authenticate(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AuthRequest>,
) -> Result<Json<BalanceResponse>> {
    let init_data = req.init_data.as_deref().unwrap_or_default();
    let user_id = state
        .verifier
        .verify(init_data)
        .and_then(|verified| verified.resolve_user(req.user_id))
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected init_data");
            AppError::from(e)
        })?;

    let balance = state.balances.get_balance(user_id).await?;
    tracing::info!(user_id = %user_id, "User authenticated");
    Ok(Json(BalanceResponse { user_id, balance }))
}
