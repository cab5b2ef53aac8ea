use anyhow::{anyhow, ensure, Context};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::SecretScheme;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub telegram: TelegramConfig,
    pub betting: BettingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_port: u16,
    pub metrics_port: u16,
    /// Public host name (no scheme) the provider calls back on
    pub public_url: Option<String>,
    pub return_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Redis,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StorageBackend::Redis),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub redis_url: String,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub timeout: Duration,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct BettingConfig {
    pub multiplier_min: f64,
    pub multiplier_max: f64,
    pub win_probability: f64,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            multiplier_min: 1.0,
            multiplier_max: 8.0,
            win_probability: 0.45,
        }
    }
}

impl BettingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.multiplier_min >= 1.0,
            "BET_MULTIPLIER_MIN must be at least 1.0, got {}",
            self.multiplier_min
        );
        ensure!(
            self.multiplier_min <= self.multiplier_max,
            "BET_MULTIPLIER_MIN ({}) exceeds BET_MULTIPLIER_MAX ({})",
            self.multiplier_min,
            self.multiplier_max
        );
        ensure!(
            (0.0..=1.0).contains(&self.win_probability),
            "BET_WIN_PROBABILITY must be within [0, 1], got {}",
            self.win_probability
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_scheme: SecretScheme,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let betting = BettingConfig {
            multiplier_min: parse_or(&get, "BET_MULTIPLIER_MIN", 1.0)?,
            multiplier_max: parse_or(&get, "BET_MULTIPLIER_MAX", 8.0)?,
            win_probability: parse_or(&get, "BET_WIN_PROBABILITY", 0.45)?,
        };
        betting.validate()?;

        let api_port = match get("API_PORT").or_else(|| get("PORT")) {
            Some(port) => port.parse().context("API_PORT must be a port number")?,
            None => 5000,
        };

        Ok(Config {
            server: ServerConfig {
                api_port,
                metrics_port: parse_or(&get, "METRICS_PORT", 9090)?,
                public_url: get("PUBLIC_URL")
                    .or_else(|| get("RAILWAY_STATIC_URL"))
                    .or_else(|| get("PROJECT_URL")),
                return_url: get("RETURN_URL").unwrap_or_else(|| "https://t.me/".to_string()),
            },
            storage: StorageConfig {
                backend: match get("STORAGE_BACKEND") {
                    Some(backend) => backend.parse()?,
                    None => StorageBackend::Redis,
                },
                redis_url: get("REDIS_URL")
                    .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            },
            provider: ProviderConfig {
                base_url: get("PROVIDER_BASE_URL")
                    .unwrap_or_else(|| "https://api.chapa.co".to_string()),
                secret_key: get("CHAPA_SECRET_KEY"),
                webhook_secret: get("CHAPA_WEBHOOK_SECRET"),
                timeout: Duration::from_secs(parse_or(&get, "PROVIDER_TIMEOUT_SECS", 30)?),
                currency: get("CURRENCY").unwrap_or_else(|| wallet_shared::CURRENCY.to_string()),
            },
            telegram: TelegramConfig {
                bot_token: get("BOT_TOKEN")
                    .ok_or_else(|| anyhow!("BOT_TOKEN must be set"))?,
                api_url: get("TELEGRAM_API_URL")
                    .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            },
            betting,
            auth: AuthConfig {
                secret_scheme: match get("AUTH_SECRET_SCHEME") {
                    Some(scheme) => scheme.parse()?,
                    None => SecretScheme::TokenDigest,
                },
            },
        })
    }

    /// Provider callback target: `https://{public_url}/webhook`, or a bare
    /// path when no public host is known
    pub fn callback_url(&self) -> String {
        match &self.server.public_url {
            Some(host) => format!("https://{}/webhook", host.trim_end_matches('/')),
            None => "/webhook".to_string(),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
