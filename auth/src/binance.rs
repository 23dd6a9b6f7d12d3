//! Binance REST signing and listenKey lifecycle

use anyhow::{Context, Result, anyhow};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Binance API credentials
#[derive(Debug, Clone)]
pub struct BinanceCredentials {
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: String,
}

impl BinanceCredentials {
    /// Create a new credential set
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListenKeyResponse {
    #[serde(rename = "listenKey")]
    listen_key: String,
}

/// Signs Binance REST queries and manages the user-data listenKey
///
/// The listenKey authorizes the private stream and must be kept alive
/// with a keepalive PUT every 30 minutes.
pub struct BinanceSigner {
    credentials: BinanceCredentials,
    client: reqwest::Client,
}

impl BinanceSigner {
    /// Create a new signer
    #[must_use]
    pub fn new(credentials: BinanceCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
        }
    }

    /// API key of the underlying credentials
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// hex(HMAC-SHA256(secret, query_string)) as appended to signed REST calls
    pub fn sign_query(&self, query: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| anyhow!("invalid Binance secret: {e}"))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Obtain a fresh listenKey for the user-data stream
    pub async fn create_listen_key(&self, api_url: &str) -> Result<String> {
        let url = format!("{api_url}/api/v3/userDataStream");
        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()
            .await
            .context("listenKey request failed")?;
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("listenKey request rejected: {detail}"));
        }
        let body: ListenKeyResponse = response.json().await.context("listenKey body")?;
        info!("obtained Binance listenKey");
        Ok(body.listen_key)
    }

    /// Extend the listenKey's validity; called every 30 minutes
    pub async fn keepalive_listen_key(&self, api_url: &str, listen_key: &str) -> Result<()> {
        let url = format!("{api_url}/api/v3/userDataStream");
        let response = self
            .client
            .put(&url)
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .query(&[("listenKey", listen_key)])
            .send()
            .await
            .context("listenKey keepalive failed")?;
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("listenKey keepalive rejected: {detail}"));
        }
        debug!("Binance listenKey kept alive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_hex() {
        let signer = BinanceSigner::new(BinanceCredentials::new("key", "secret"));
        let query = "symbol=BTCUSDT&timestamp=1700000000000";
        let a = signer.sign_query(query).unwrap();
        let b = signer.sign_query(query).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_depends_on_secret() {
        let a = BinanceSigner::new(BinanceCredentials::new("key", "secret"))
            .sign_query("q=1")
            .unwrap();
        let b = BinanceSigner::new(BinanceCredentials::new("key", "other"))
            .sign_query("q=1")
            .unwrap();
        assert_ne!(a, b);
    }
}
