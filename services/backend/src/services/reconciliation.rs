//! Deposit initiation and provider callback reconciliation
//!
//! Deposit references embed the user id, so a callback is mapped back to an
//! account from the reference alone. Each reference is credited at most once.

use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;
use wallet_shared::{Amount, TxRef, UserId};

use super::callback::{IgnoreReason, ProviderCallback};
use crate::auth::verify_webhook_signature;
use crate::clients::gateway::reply_status;
use crate::clients::{InitializePayment, Notifier, PaymentGateway};
use crate::config::Config;
use crate::domain::{NewTransaction, TransactionStatus, TransactionType};
use crate::errors::{AppError, Result};
use crate::repository::{DepositCredit, LedgerRepository, StorageError};

#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub user_id: UserId,
    pub amount: Amount,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationOutcome {
    Credited {
        user_id: UserId,
        amount: Amount,
        balance: rust_decimal::Decimal,
    },
    Duplicate,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub currency: String,
    pub callback_url: String,
    pub return_url: String,
    pub webhook_secret: Option<String>,
}

impl ReconcilerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            currency: config.provider.currency.clone(),
            callback_url: config.callback_url(),
            return_url: config.server.return_url.clone(),
            webhook_secret: config.provider.webhook_secret.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PaymentReconciler {
    ledger: Arc<dyn LedgerRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    settings: ReconcilerSettings,
}

impl PaymentReconciler {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            ledger,
            gateway,
            notifier,
            settings,
        }
    }

    /// Open a provider checkout and return its reply unchanged
    ///
    /// The attempt is recorded as `pending` when the provider accepted it,
    /// `failed` otherwise. Nothing is credited here.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, amount = %request.amount))]
    pub async fn initiate_deposit(&self, request: DepositRequest) -> Result<Value> {
        let tx_ref = TxRef::deposit(request.user_id);
        let payment = InitializePayment {
            amount: request.amount.to_string(),
            currency: self.settings.currency.clone(),
            email: request.email,
            first_name: request.first_name.unwrap_or_else(|| "User".to_string()),
            last_name: request.last_name.unwrap_or_default(),
            tx_ref: tx_ref.as_str().to_string(),
            callback_url: self.settings.callback_url.clone(),
            return_url: self.settings.return_url.clone(),
        };

        let reply = self.gateway.initialize(&payment).await;
        let status = match &reply {
            Ok(body) if reply_status(body) == Some("success") => TransactionStatus::Pending,
            _ => TransactionStatus::Failed,
        };

        self.ledger
            .record_transaction(NewTransaction {
                user_id: request.user_id,
                tx_type: TransactionType::Deposit,
                amount: request.amount,
                status,
                tx_ref: Some(tx_ref.clone()),
            })
            .await?;

        match reply {
            Ok(body) => {
                tracing::info!(tx_ref = %tx_ref, status = status.as_str(), "Deposit initiated");
                Ok(body)
            }
            Err(e) => {
                tracing::warn!(tx_ref = %tx_ref, error = %e, "Deposit initiation failed");
                Err(AppError::Provider(e))
            }
        }
    }

    /// Apply a provider callback
    ///
    /// Only storage faults are errors; every other problem is `Ignored`.
    pub async fn handle_callback(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> std::result::Result<ReconciliationOutcome, StorageError> {
        if let Some(secret) = &self.settings.webhook_secret {
            let valid = signature
                .map(|sig| verify_webhook_signature(secret, body, sig))
                .unwrap_or(false);
            if !valid {
                return Ok(self.ignored(IgnoreReason::BadSignature));
            }
        }

        let payload: Value = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(_) => return Ok(self.ignored(IgnoreReason::MalformedBody)),
        };

        let event = match ProviderCallback::parse(&payload) {
            Ok(event) => event,
            Err(reason) => return Ok(self.ignored(reason)),
        };

        let span = tracing::info_span!(
            "reconcile_deposit",
            tx_ref = %event.tx_ref,
            user_id = %event.user_id,
            amount = %event.amount
        );

        async {
            match self
                .ledger
                .credit_deposit(event.user_id, event.amount, &event.tx_ref)
                .await
            {
                Ok(DepositCredit::Credited { balance, .. }) => {
                    metrics::counter!("deposits_credited_total").increment(1);
                    tracing::info!(balance = %balance, "Deposit credited");
                    self.notify_credit(event.user_id, event.amount);
                    Ok(ReconciliationOutcome::Credited {
                        user_id: event.user_id,
                        amount: event.amount,
                        balance,
                    })
                }
                Ok(DepositCredit::Duplicate) => {
                    metrics::counter!("deposits_duplicate_total").increment(1);
                    tracing::info!("Duplicate callback, already credited");
                    Ok(ReconciliationOutcome::Duplicate)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to credit deposit");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn ignored(&self, reason: IgnoreReason) -> ReconciliationOutcome {
        metrics::counter!("webhooks_ignored_total", "reason" => reason.as_str()).increment(1);
        tracing::debug!(reason = %reason, "Callback ignored");
        ReconciliationOutcome::Ignored(reason)
    }

    fn notify_credit(&self, user_id: UserId, amount: Amount) {
        let notifier = self.notifier.clone();
        let text = format!(
            "Deposit of {} {} was successful and has been credited to your wallet.",
            amount, self.settings.currency
        );
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(user_id, &text).await {
                tracing::warn!(user_id = %user_id, error = %e, "Deposit notification failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::sign_webhook_body;
    use crate::clients::{NotifyError, PayoutOrder, ProviderError};
    use crate::repository::InMemoryLedgerRepository;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct StubGateway {
        reply: std::result::Result<Value, ProviderError>,
        seen: Mutex<Vec<InitializePayment>>,
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn initialize(&self, request: &InitializePayment) -> std::result::Result<Value, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }

        async fn payout(&self, _order: &PayoutOrder) -> std::result::Result<Value, ProviderError> {
            unreachable!("deposits never pay out")
        }
    }

    struct ChannelNotifier(mpsc::UnboundedSender<(UserId, String)>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn notify(&self, user_id: UserId, text: &str) -> std::result::Result<(), NotifyError> {
            let _ = self.0.send((user_id, text.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        reconciler: PaymentReconciler,
        ledger: Arc<InMemoryLedgerRepository>,
        gateway: Arc<StubGateway>,
        notifications: mpsc::UnboundedReceiver<(UserId, String)>,
    }

    fn fixture(
        reply: std::result::Result<Value, ProviderError>,
        webhook_secret: Option<&str>,
    ) -> Fixture {
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let gateway = Arc::new(StubGateway {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let (tx, notifications) = mpsc::unbounded_channel();
        let reconciler = PaymentReconciler::new(
            ledger.clone(),
            gateway.clone(),
            Arc::new(ChannelNotifier(tx)),
            ReconcilerSettings {
                currency: "ETB".to_string(),
                callback_url: "https://kana.example/webhook".to_string(),
                return_url: "https://t.me/".to_string(),
                webhook_secret: webhook_secret.map(str::to_string),
            },
        );
        Fixture {
            reconciler,
            ledger,
            gateway,
            notifications,
        }
    }

    fn deposit(user: i64, amount: i64) -> DepositRequest {
        DepositRequest {
            user_id: UserId::new(user).unwrap(),
            amount: Amount::new(Decimal::from(amount)).unwrap(),
            email: "a@b.com".to_string(),
            first_name: None,
            last_name: None,
        }
    }

    fn success_callback(tx_ref: &str, amount: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({"tx_ref": tx_ref, "status": "success", "amount": amount})).unwrap()
    }

    #[tokio::test]
    async fn test_deposit_round_trip_credits_embedded_user() {
        let mut f = fixture(Ok(json!({"status": "success", "data": {"checkout_url": "https://pay"}})), None);

        let reply = f.reconciler.initiate_deposit(deposit(42, 100)).await.unwrap();
        assert_eq!(reply["data"]["checkout_url"], "https://pay");

        let sent = f.gateway.seen.lock().unwrap()[0].clone();
        assert!(sent.tx_ref.starts_with("tx-42-"));
        assert_eq!(sent.amount, "100.00");
        assert_eq!(sent.first_name, "User");
        assert_eq!(sent.callback_url, "https://kana.example/webhook");

        let user = UserId::new(42).unwrap();
        let pending = f.ledger.transactions(user, 10).await.unwrap();
        assert_eq!(pending[0].status, TransactionStatus::Pending);
        assert_eq!(f.ledger.balance(user).await.unwrap(), Decimal::ZERO);

        let outcome = f
            .reconciler
            .handle_callback(&success_callback(&sent.tx_ref, "100"), None)
            .await
            .unwrap();
        assert!(matches!(outcome, ReconciliationOutcome::Credited { .. }));
        assert_eq!(f.ledger.balance(user).await.unwrap(), Decimal::from(100));

        let (notified, text) = tokio::time::timeout(Duration::from_secs(1), f.notifications.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notified, user);
        assert!(text.contains("100.00 ETB"));
    }

    #[tokio::test]
    async fn test_replayed_callback_credits_once() {
        let f = fixture(Ok(json!({})), None);
        let body = success_callback("tx-5-abcdef", "30");

        let first = f.reconciler.handle_callback(&body, None).await.unwrap();
        let second = f.reconciler.handle_callback(&body, None).await.unwrap();

        assert!(matches!(first, ReconciliationOutcome::Credited { .. }));
        assert_eq!(second, ReconciliationOutcome::Duplicate);

        let user = UserId::new(5).unwrap();
        assert_eq!(f.ledger.balance(user).await.unwrap(), Decimal::from(30));
        let rows = f.ledger.transactions(user, 10).await.unwrap();
        assert_eq!(
            rows.iter().filter(|t| t.status == TransactionStatus::Success).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_provider_failure_records_failed_attempt() {
        let f = fixture(Err(ProviderError::Timeout), None);

        let result = f.reconciler.initiate_deposit(deposit(8, 10)).await;
        assert!(matches!(result, Err(AppError::Provider(ProviderError::Timeout))));

        let rows = f.ledger.transactions(UserId::new(8).unwrap(), 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_rejected_initialization_is_returned_and_recorded_failed() {
        let f = fixture(Ok(json!({"status": "failed", "message": "invalid email"})), None);

        let reply = f.reconciler.initiate_deposit(deposit(8, 10)).await.unwrap();
        assert_eq!(reply["message"], "invalid email");

        let rows = f.ledger.transactions(UserId::new(8).unwrap(), 10).await.unwrap();
        assert_eq!(rows[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_unparseable_callbacks_are_ignored() {
        let f = fixture(Ok(json!({})), None);

        let outcome = f.reconciler.handle_callback(b"not json", None).await.unwrap();
        assert_eq!(outcome, ReconciliationOutcome::Ignored(IgnoreReason::MalformedBody));

        let outcome = f
            .reconciler
            .handle_callback(&success_callback("order-99", "10"), None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ReconciliationOutcome::Ignored(IgnoreReason::UnparseableReference(_))
        ));
    }

    #[tokio::test]
    async fn test_signature_required_when_secret_configured() {
        let f = fixture(Ok(json!({})), Some("whsec"));
        let body = success_callback("tx-3-aa", "10");

        let unsigned = f.reconciler.handle_callback(&body, None).await.unwrap();
        assert_eq!(unsigned, ReconciliationOutcome::Ignored(IgnoreReason::BadSignature));

        let forged = f.reconciler.handle_callback(&body, Some("00ff")).await.unwrap();
        assert_eq!(forged, ReconciliationOutcome::Ignored(IgnoreReason::BadSignature));

        let signature = sign_webhook_body("whsec", &body);
        let signed = f.reconciler.handle_callback(&body, Some(&signature)).await.unwrap();
        assert!(matches!(signed, ReconciliationOutcome::Credited { .. }));
    }
}
