//! Best-effort user notifications over the chat platform

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use wallet_shared::UserId;

use crate::config::TelegramConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for NotifyError {
    /// The request URL embeds the bot token and must never reach the logs
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Http(e.without_url())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, text: &str) -> Result<(), NotifyError>;
}

pub struct TelegramNotifier {
    http: Client,
    send_message_url: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            http,
            send_message_url: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user_id: UserId, text: &str) -> Result<(), NotifyError> {
        self.http
            .post(&self.send_message_url)
            .json(&json!({ "chat_id": user_id.get(), "text": text }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
