use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use wallet_shared::{Amount, TxRef, UserId};

use crate::clients::gateway::reply_status;
use crate::clients::{PaymentGateway, PayoutOrder};
use crate::domain::TransactionStatus;
use crate::errors::{AppError, Result};
use crate::repository::LedgerRepository;

#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawalOutcome {
    Succeeded { balance: Decimal, tx_ref: TxRef },
    /// Provider refused or was unreachable; the balance is untouched
    Failed { detail: Value },
}

/// Sends payouts and debits the ledger only once the provider confirms
#[derive(Clone)]
pub struct PayoutInitiator {
    ledger: Arc<dyn LedgerRepository>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl PayoutInitiator {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            currency: currency.into(),
        }
    }

    #[tracing::instrument(skip(self, email), fields(user_id = %user_id, amount = %amount))]
    pub async fn initiate_withdrawal(
        &self,
        user_id: UserId,
        amount: Amount,
        email: Option<&str>,
    ) -> Result<WithdrawalOutcome> {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(AppError::MissingField("email"))?;
        if !validator::validate_email(email) {
            return Err(AppError::invalid_request("Invalid email address"));
        }

        let available = self.ledger.balance(user_id).await?;
        if amount.as_decimal() > available {
            tracing::debug!(available = %available, "Withdrawal exceeds balance");
            return Err(AppError::InsufficientFunds {
                required: amount.as_decimal(),
                available,
            });
        }

        let tx_ref = TxRef::withdrawal();
        let order = PayoutOrder {
            amount: amount.to_string(),
            currency: self.currency.clone(),
            email: email.to_string(),
            tx_ref: tx_ref.as_str().to_string(),
        };

        let detail = match self.gateway.payout(&order).await {
            Ok(reply) if reply_status(&reply) == Some("success") => {
                let record = self
                    .ledger
                    .settle_withdrawal(user_id, amount, &tx_ref, TransactionStatus::Success)
                    .await
                    .map_err(|e| {
                        // The provider has paid; this needs manual reconciliation
                        tracing::error!(
                            tx_ref = %tx_ref,
                            user_id = %user_id,
                            amount = %amount,
                            error = %e,
                            "Confirmed payout could not be recorded"
                        );
                        metrics::counter!("withdrawals_unrecorded_total").increment(1);
                        e
                    })?;
                if record.balance < Decimal::ZERO {
                    // Money already left the house; the debit stands
                    tracing::warn!(
                        tx_ref = %tx_ref,
                        balance = %record.balance,
                        "Confirmed payout overdrew the account"
                    );
                }
                metrics::counter!("withdrawals_total", "status" => "success").increment(1);
                tracing::info!(tx_ref = %tx_ref, balance = %record.balance, "Withdrawal paid out");
                return Ok(WithdrawalOutcome::Succeeded {
                    balance: record.balance,
                    tx_ref,
                });
            }
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(tx_ref = %tx_ref, error = %e, "Payout call failed");
                json!({ "error": e.to_string() })
            }
        };

        self.ledger
            .settle_withdrawal(user_id, amount, &tx_ref, TransactionStatus::Failed)
            .await?;
        metrics::counter!("withdrawals_total", "status" => "failed").increment(1);
        tracing::info!(tx_ref = %tx_ref, "Withdrawal failed");

        Ok(WithdrawalOutcome::Failed { detail })
    }
}
