//! Mini-app init-data verification
//!
//! The client surface forwards the platform's signed `initData` query string.
//! All fields except `hash` are sorted by key, joined as `key=value` lines and
//! signed with HMAC-SHA256 under a secret derived from the bot token.

use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::str::FromStr;
use wallet_shared::UserId;

type HmacSha256 = Hmac<Sha256>;

const HASH_FIELD: &str = "hash";
const WEB_APP_KEY: &[u8] = b"WebAppData";

/// How the signing secret is derived from the bot token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretScheme {
    /// `SHA256(bot_token)`
    TokenDigest,
    /// `HMAC_SHA256(key = "WebAppData", bot_token)`
    WebApp,
}

impl FromStr for SecretScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token_digest" => Ok(SecretScheme::TokenDigest),
            "web_app" => Ok(SecretScheme::WebApp),
            other => Err(anyhow::anyhow!("unknown AUTH_SECRET_SCHEME '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("init_data is empty")]
    Empty,

    #[error("init_data has no hash field")]
    MissingHash,

    #[error("hash is not valid hex")]
    MalformedHash,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("no user id in init_data or request")]
    MissingUser,

    #[error("claimed user {claimed} does not match signed user {verified}")]
    UserMismatch { claimed: i64, verified: UserId },
}

/// Field set whose signature checked out
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedInitData {
    fields: BTreeMap<String, String>,
}

impl VerifiedInitData {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// `user_id` field, else the `id` inside the JSON `user` field
    pub fn user_id(&self) -> Option<UserId> {
        if let Some(id) = self.get("user_id").and_then(|v| v.trim().parse::<i64>().ok()) {
            if let Ok(user) = UserId::new(id) {
                return Some(user);
            }
        }
        self.get("user")
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|user| user.get("id").and_then(|id| id.as_i64()))
            .and_then(|id| UserId::new(id).ok())
    }

    /// Identity for the session: the signed id wins, a body id is only
    /// accepted when the signed payload carries none
    pub fn resolve_user(&self, claimed: Option<i64>) -> Result<UserId, AuthError> {
        let claimed = claimed.filter(|id| *id != 0);
        match (self.user_id(), claimed) {
            (Some(verified), Some(claimed)) if claimed != verified.get() => {
                Err(AuthError::UserMismatch { claimed, verified })
            }
            (Some(verified), _) => Ok(verified),
            (None, Some(claimed)) => UserId::new(claimed).map_err(|_| AuthError::MissingUser),
            (None, None) => Err(AuthError::MissingUser),
        }
    }
}

#[derive(Clone)]
pub struct InitDataVerifier {
    secret: Vec<u8>,
}

impl InitDataVerifier {
    pub fn new(bot_token: &str, scheme: SecretScheme) -> Self {
        let secret = match scheme {
            SecretScheme::TokenDigest => Sha256::digest(bot_token.as_bytes()).to_vec(),
            SecretScheme::WebApp => {
                let mut mac = new_mac(WEB_APP_KEY);
                mac.update(bot_token.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
        };
        Self { secret }
    }

    pub fn verify(&self, init_data: &str) -> Result<VerifiedInitData, AuthError> {
        if init_data.trim().is_empty() {
            return Err(AuthError::Empty);
        }

        let mut fields = parse_init_data(init_data);
        let hash = fields.remove(HASH_FIELD).ok_or(AuthError::MissingHash)?;
        let expected = hex::decode(hash.trim()).map_err(|_| AuthError::MalformedHash)?;

        let mut mac = new_mac(&self.secret);
        mac.update(data_check_string(&fields).as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| AuthError::SignatureMismatch)?;

        Ok(VerifiedInitData { fields })
    }

    /// Hex signature over `fields`; the counterpart of [`verify`](Self::verify)
    pub fn sign(&self, fields: &BTreeMap<String, String>) -> String {
        let mut mac = new_mac(&self.secret);
        mac.update(data_check_string(fields).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Split on `&`, then once on `=`; pairs without `=` are dropped and a
/// repeated key keeps its last value
fn parse_init_data(init_data: &str) -> BTreeMap<String, String> {
    init_data
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            (
                key.to_string(),
                percent_decode_str(value).decode_utf8_lossy().into_owned(),
            )
        })
        .collect()
}

fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != HASH_FIELD)
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length
    match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key length is unbounded"),
    }
}

/// Check a provider webhook signature: hex HMAC-SHA256(secret, raw body)
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = new_mac(secret.as_bytes());
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Hex HMAC-SHA256(secret, body), as a provider would compute it
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> String {
    let mut mac = new_mac(secret.as_bytes());
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
