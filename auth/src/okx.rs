//! OKX v5 login signing and clock-skew handling

use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

type HmacSha256 = Hmac<Sha256>;

/// The fixed message suffix OKX expects in the websocket login signature
const LOGIN_VERB_PATH: &str = "GET/users/self/verify";

/// OKX API credentials
#[derive(Debug, Clone)]
pub struct OkxCredentials {
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: String,
    /// API passphrase chosen at key creation
    pub passphrase: String,
}

impl OkxCredentials {
    /// Create a new credential set
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: passphrase.into(),
        }
    }
}

/// Arguments of the `login` operation on the private websocket
#[derive(Debug, Clone, Serialize)]
pub struct OkxLoginArgs {
    /// API key
    #[serde(rename = "apiKey")]
    pub api_key: String,
    /// API passphrase
    pub passphrase: String,
    /// Epoch-second timestamp the signature covers
    pub timestamp: String,
    /// base64(HMAC-SHA256(secret, timestamp + "GET" + "/users/self/verify"))
    pub sign: String,
}

#[derive(Debug, Deserialize)]
struct TimeResponse {
    data: Vec<TimeEntry>,
}

#[derive(Debug, Deserialize)]
struct TimeEntry {
    ts: String,
}

/// Signs OKX login challenges, compensating for local clock skew
///
/// The timestamp is generated locally; when the venue answers `invalid
/// timestamp` the session calls [`OkxSigner::sync_clock`] against the
/// REST time endpoint and retries the login once.
pub struct OkxSigner {
    credentials: OkxCredentials,
    client: reqwest::Client,
    clock_offset_ms: i64,
}

impl OkxSigner {
    /// Create a signer with zero assumed clock skew
    #[must_use]
    pub fn new(credentials: OkxCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
            clock_offset_ms: 0,
        }
    }

    /// API key of the underlying credentials
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// Current epoch-second timestamp, skew-compensated
    #[must_use]
    pub fn timestamp(&self) -> String {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        let adjusted = now_ms + self.clock_offset_ms;
        (adjusted / 1000).to_string()
    }

    /// Sign the websocket login challenge for `timestamp`
    pub fn login_signature(&self, timestamp: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| anyhow!("invalid OKX secret: {e}"))?;
        mac.update(timestamp.as_bytes());
        mac.update(LOGIN_VERB_PATH.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Build the full login args for the private websocket
    pub fn login_args(&self) -> Result<OkxLoginArgs> {
        let timestamp = self.timestamp();
        let sign = self.login_signature(&timestamp)?;
        Ok(OkxLoginArgs {
            api_key: self.credentials.api_key.clone(),
            passphrase: self.credentials.passphrase.clone(),
            timestamp,
            sign,
        })
    }

    /// Resync the local clock offset from the venue's REST time endpoint
    pub async fn sync_clock(&mut self, api_url: &str) -> Result<()> {
        let url = format!("{api_url}/api/v5/public/time");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("OKX time probe failed")?;
        let body: TimeResponse = response.json().await.context("OKX time probe body")?;
        let server_ms: i64 = body
            .data
            .first()
            .map(|e| e.ts.as_str())
            .unwrap_or_default()
            .parse()
            .context("OKX time probe ts field")?;
        let local_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        self.clock_offset_ms = server_ms - local_ms;
        info!(offset_ms = self.clock_offset_ms, "resynced clock against OKX");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> OkxSigner {
        OkxSigner::new(OkxCredentials::new("key", "secret", "phrase"))
    }

    #[test]
    fn signature_is_deterministic() {
        let s = signer();
        let a = s.login_signature("1700000000").unwrap();
        let b = s.login_signature("1700000000").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signature_is_base64_of_a_sha256_mac() {
        let s = signer();
        let sig = s.login_signature("1700000000").unwrap();
        let raw = BASE64.decode(&sig).unwrap();
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn signature_depends_on_secret_and_timestamp() {
        let a = signer().login_signature("1700000000").unwrap();
        let b = signer().login_signature("1700000001").unwrap();
        assert_ne!(a, b);

        let other = OkxSigner::new(OkxCredentials::new("key", "other-secret", "phrase"));
        assert_ne!(a, other.login_signature("1700000000").unwrap());
    }

    #[test]
    fn login_args_carry_key_and_passphrase() {
        let args = signer().login_args().unwrap();
        assert_eq!(args.api_key, "key");
        assert_eq!(args.passphrase, "phrase");
        assert!(!args.sign.is_empty());
    }
}
