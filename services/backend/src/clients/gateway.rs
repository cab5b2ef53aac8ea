//! Payment provider client
//!
//! Requests carry amounts as strings. Replies are kept as raw JSON so the
//! deposit path can return them to the caller unchanged.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::ProviderConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("payment provider secret key is not configured")]
    NotConfigured,

    #[error("payment provider timed out")]
    Timeout,

    #[error("payment provider unreachable: {0}")]
    Transport(String),

    #[error("invalid response from payment provider: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Body of the checkout initialization call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializePayment {
    pub amount: String,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
}

/// Body of the payout call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutOrder {
    pub amount: String,
    pub currency: String,
    pub email: String,
    pub tx_ref: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: &InitializePayment) -> Result<Value, ProviderError>;

    async fn payout(&self, order: &PayoutOrder) -> Result<Value, ProviderError>;
}

/// `status` field of a provider reply
pub fn reply_status(reply: &Value) -> Option<&str> {
    reply.get("status").and_then(Value::as_str)
}

pub struct ChapaGateway {
    http: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl ChapaGateway {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<Value, ProviderError> {
        let secret_key = self.secret_key.as_deref().ok_or(ProviderError::NotConfigured)?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(secret_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        tracing::debug!(
            url = %url,
            http_status = status.as_u16(),
            "Payment provider replied"
        );

        // Error replies are JSON too; the caller inspects `status`
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    async fn initialize(&self, request: &InitializePayment) -> Result<Value, ProviderError> {
        self.post("/v1/transaction/initialize", request).await
    }

    async fn payout(&self, order: &PayoutOrder) -> Result<Value, ProviderError> {
        self.post("/v1/payout", order).await
    }
}
