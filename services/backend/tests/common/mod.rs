//! Common test utilities and fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use wallet_backend::auth::InitDataVerifier;
use wallet_backend::build_router;
use wallet_backend::clients::{
    InitializePayment, Notifier, NotifyError, PaymentGateway, PayoutOrder, ProviderError,
};
use wallet_backend::config::Config;
use wallet_backend::repository::{InMemoryLedgerRepository, LedgerRepository};
use wallet_backend::services::{Draw, OutcomeSource};
use wallet_backend::state::AppState;
use wallet_shared::UserId;

pub const TEST_BOT_TOKEN: &str = "123456:TEST-BOT-TOKEN";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Payment provider double with scripted replies
pub struct MockGateway {
    pub init_reply: Mutex<Result<Value, ProviderError>>,
    pub payout_reply: Mutex<Result<Value, ProviderError>>,
    pub initialized: Mutex<Vec<InitializePayment>>,
    pub payouts: Mutex<Vec<PayoutOrder>>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            init_reply: Mutex::new(Ok(json!({
                "status": "success",
                "message": "Hosted Link",
                "data": {"checkout_url": "https://checkout.example/pay/abc"}
            }))),
            payout_reply: Mutex::new(Ok(json!({"status": "success"}))),
            initialized: Mutex::new(Vec::new()),
            payouts: Mutex::new(Vec::new()),
        }
    }

    pub fn reply_to_payouts(&self, reply: Result<Value, ProviderError>) {
        *self.payout_reply.lock().unwrap() = reply;
    }

    pub fn reply_to_initialize(&self, reply: Result<Value, ProviderError>) {
        *self.init_reply.lock().unwrap() = reply;
    }

    pub fn last_tx_ref(&self) -> String {
        self.initialized
            .lock()
            .unwrap()
            .last()
            .expect("no checkout was initialized")
            .tx_ref
            .clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize(&self, request: &InitializePayment) -> Result<Value, ProviderError> {
        self.initialized.lock().unwrap().push(request.clone());
        self.init_reply.lock().unwrap().clone()
    }

    async fn payout(&self, order: &PayoutOrder) -> Result<Value, ProviderError> {
        self.payouts.lock().unwrap().push(order.clone());
        self.payout_reply.lock().unwrap().clone()
    }
}

/// Outcome source that always returns the draw it was last given
pub struct FixedOutcomes(Mutex<Draw>);

impl FixedOutcomes {
    pub fn set(&self, multiplier: &str, won: bool) {
        *self.0.lock().unwrap() = Draw {
            multiplier: dec(multiplier),
            won,
        };
    }
}

impl OutcomeSource for FixedOutcomes {
    fn draw(&self) -> Draw {
        *self.0.lock().unwrap()
    }
}

pub struct ChannelNotifier(mpsc::UnboundedSender<(UserId, String)>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, user_id: UserId, text: &str) -> Result<(), NotifyError> {
        let _ = self.0.send((user_id, text.to_string()));
        Ok(())
    }
}

/// In-process server over the in-memory ledger and test doubles
pub struct TestContext {
    pub server: TestServer,
    pub ledger: Arc<InMemoryLedgerRepository>,
    pub gateway: Arc<MockGateway>,
    pub outcomes: Arc<FixedOutcomes>,
    pub verifier: InitDataVerifier,
    notifications: tokio::sync::Mutex<mpsc::UnboundedReceiver<(UserId, String)>>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Require signed webhooks
    pub fn with_webhook_secret() -> Self {
        Self::with_env(&[("CHAPA_WEBHOOK_SECRET", TEST_WEBHOOK_SECRET)])
    }

    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = [
            ("BOT_TOKEN", TEST_BOT_TOKEN),
            ("STORAGE_BACKEND", "memory"),
            ("PUBLIC_URL", "wallet.test"),
            ("CHAPA_SECRET_KEY", "sk_test"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("test config");

        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let gateway = Arc::new(MockGateway::new());
        let outcomes = Arc::new(FixedOutcomes(Mutex::new(Draw {
            multiplier: dec("2"),
            won: false,
        })));
        let (tx, rx) = mpsc::unbounded_channel();
        let verifier = InitDataVerifier::new(TEST_BOT_TOKEN, config.auth.secret_scheme);

        let state = AppState::new(
            config,
            ledger.clone(),
            gateway.clone(),
            Arc::new(ChannelNotifier(tx)),
            outcomes.clone(),
        );
        let server = TestServer::new(build_router(state)).expect("Failed to start test server");

        Self {
            server,
            ledger,
            gateway,
            outcomes,
            verifier,
            notifications: tokio::sync::Mutex::new(rx),
        }
    }

    /// Put money on an account directly
    pub async fn fund(&self, user_id: i64, amount: &str) {
        self.ledger
            .adjust_balance(user(user_id), dec(amount))
            .await
            .expect("Failed to fund account");
    }

    pub async fn balance(&self, user_id: i64) -> Decimal {
        self.ledger
            .balance(user(user_id))
            .await
            .expect("Failed to read balance")
    }

    pub async fn next_notification(&self) -> Option<(UserId, String)> {
        let mut rx = self.notifications.lock().await;
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Query string signed the way the mini-app platform signs it
    pub fn signed_init_data(&self, pairs: &[(&str, &str)]) -> String {
        let fields: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let hash = self.verifier.sign(&fields);
        let mut query: Vec<String> = pairs
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    k,
                    percent_encoding::utf8_percent_encode(v, percent_encoding::NON_ALPHANUMERIC)
                )
            })
            .collect();
        query.push(format!("hash={}", hash));
        query.join("&")
    }
}

pub fn user(id: i64) -> UserId {
    UserId::new(id).expect("non-zero user id")
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal")
}

/// Decimals travel as JSON strings; accept numbers too
pub fn decimal_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => dec(s),
        Value::Number(n) => dec(&n.to_string()),
        other => panic!("not a decimal: {}", other),
    }
}

/// Helper function to parse error response
pub fn parse_error(body: &str) -> Option<(String, String, String)> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;

    Some((
        error.get("code")?.as_str()?.to_string(),
        error.get("message")?.as_str()?.to_string(),
        error.get("category")?.as_str()?.to_string(),
    ))
}
