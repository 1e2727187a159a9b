//! Kraken exchange API client
//!
//! HTTP client for the market-data/account collaborator the decision core
//! depends on. All four operations are best-effort: callers degrade any
//! failure to a safe default instead of propagating it into the cycle.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use crate::{Candle, FeeSchedule, OrderIntent};

type HmacSha512 = Hmac<Sha512>;

const API_BASE_URL: &str = "https://api.kraken.com";

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no credentials configured")]
    MissingCredentials,
}

/// Market data and account access required by the decision core.
///
/// Implementations are expected to be best-effort; the session substitutes
/// degenerate defaults (zero price, empty series, zero balance) on failure.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Last traded price for the pair
    async fn ticker(&self, pair: &str) -> Result<f64, ExchangeError>;

    /// Most recent `count` candles at the given sampling period, ascending
    async fn candles(
        &self,
        pair: &str,
        period_minutes: u32,
        count: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;

    /// Current maker/taker rates for the pair, falling back to market
    /// metadata when the account-level schedule is unavailable
    async fn fee_schedule(&self, pair: &str) -> Result<FeeSchedule, ExchangeError>;

    /// Free balance of the given quote asset
    async fn available_balance(&self, asset: &str) -> Result<f64, ExchangeError>;
}

/// Order-submission contract for a live-execution collaborator.
///
/// No implementation ships in this crate: live placement is a capability
/// this system does not provide, and the session's submitter slot stays
/// `None`. Any future implementation is a separate component.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit(&self, pair: &str, intent: &OrderIntent) -> Result<(), ExchangeError>;
}

/// API credentials container
#[derive(Debug, Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign a private-endpoint request: HMAC-SHA512 over path and the
    /// SHA-256 digest of nonce + body, keyed with the base64-decoded secret.
    pub fn sign(&self, path: &str, nonce: &str, post_data: &str) -> Result<String, ExchangeError> {
        let secret = BASE64
            .decode(&self.api_secret)
            .map_err(|_| ExchangeError::Auth("API secret is not valid base64".to_string()))?;

        let mut digest = Sha256::new();
        digest.update(nonce.as_bytes());
        digest.update(post_data.as_bytes());

        let mut mac =
            HmacSha512::new_from_slice(&secret).expect("HMAC can take key of any size");
        mac.update(path.as_bytes());
        mac.update(&digest.finalize());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// Response envelope shared by every Kraken endpoint
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Vec<String>,
    result: Option<serde_json::Value>,
}

impl Envelope {
    fn into_result(self) -> Result<serde_json::Value, ExchangeError> {
        if !self.error.is_empty() {
            return Err(ExchangeError::Api(self.error.join("; ")));
        }
        self.result
            .ok_or_else(|| ExchangeError::Parse("missing result".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct KrakenClient {
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl KrakenClient {
    pub fn new(credentials: Option<Credentials>) -> Self {
        KrakenClient {
            client: reqwest::Client::new(),
            credentials,
        }
    }

    /// Map a BASE/QUOTE pair to the exchange's pair naming
    pub fn to_exchange_pair(pair: &str) -> String {
        pair.replace("BTC", "XBT").replace('/', "")
    }

    async fn public_get(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, ExchangeError> {
        let url = format!("{}/0/public/{}", API_BASE_URL, endpoint);
        let envelope: Envelope = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await?
            .json()
            .await?;
        envelope.into_result()
    }

    async fn private_post(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, ExchangeError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials)?;

        let nonce = Utc::now().timestamp_millis().to_string();
        let path = format!("/0/private/{}", endpoint);
        let mut post_data = format!("nonce={}", nonce);
        for (k, v) in params {
            post_data.push_str(&format!("&{}={}", k, v));
        }
        let signature = creds.sign(&path, &nonce, &post_data)?;

        let envelope: Envelope = self
            .client
            .post(format!("{}{}", API_BASE_URL, path))
            .header("API-Key", creds.api_key())
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(post_data)
            .send()
            .await?
            .json()
            .await?;
        envelope.into_result()
    }

    /// Fee tiers from public pair metadata: first maker/taker tier, percent
    async fn metadata_fees(&self, pair: &str) -> Result<FeeSchedule, ExchangeError> {
        let result = self
            .public_get("AssetPairs", &[("pair", Self::to_exchange_pair(pair))])
            .await?;
        let info = first_entry(&result)
            .ok_or_else(|| ExchangeError::Parse("no pair metadata".to_string()))?;

        let taker = first_tier_rate(info.get("fees"))
            .ok_or_else(|| ExchangeError::Parse("missing fee tiers".to_string()))?;
        let maker = first_tier_rate(info.get("fees_maker")).unwrap_or(taker);
        Ok(FeeSchedule { maker, taker })
    }
}

/// First value of a JSON object, for result maps keyed by exchange pair name
fn first_entry(value: &serde_json::Value) -> Option<&serde_json::Value> {
    value.as_object().and_then(|map| map.values().next())
}

/// Fee tier arrays are [[volume, percent], ...]; take the base tier as a
/// fraction
fn first_tier_rate(tiers: Option<&serde_json::Value>) -> Option<f64> {
    let rate = tiers?.as_array()?.first()?.as_array()?.get(1)?.as_f64()?;
    Some(rate / 100.0)
}

fn parse_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[async_trait]
impl MarketData for KrakenClient {
    async fn ticker(&self, pair: &str) -> Result<f64, ExchangeError> {
        let result = self
            .public_get("Ticker", &[("pair", Self::to_exchange_pair(pair))])
            .await?;
        first_entry(&result)
            .and_then(|t| t.get("c"))
            .and_then(|c| c.get(0))
            .and_then(parse_price)
            .ok_or_else(|| ExchangeError::Parse("no last price in ticker".to_string()))
    }

    async fn candles(
        &self,
        pair: &str,
        period_minutes: u32,
        count: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let result = self
            .public_get(
                "OHLC",
                &[
                    ("pair", Self::to_exchange_pair(pair)),
                    ("interval", period_minutes.to_string()),
                ],
            )
            .await?;

        // Result object holds the candle array under the pair key plus a
        // "last" cursor; take the array entry.
        let rows = result
            .as_object()
            .and_then(|map| {
                map.iter()
                    .find(|(k, v)| *k != "last" && v.is_array())
                    .map(|(_, v)| v)
            })
            .and_then(|v| v.as_array())
            .ok_or_else(|| ExchangeError::Parse("no candle rows".to_string()))?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let fields = row
                .as_array()
                .ok_or_else(|| ExchangeError::Parse("malformed candle row".to_string()))?;
            let ts = fields
                .first()
                .and_then(|v| v.as_i64())
                .ok_or_else(|| ExchangeError::Parse("missing candle timestamp".to_string()))?;
            let field = |i: usize| -> Result<f64, ExchangeError> {
                fields
                    .get(i)
                    .and_then(parse_price)
                    .ok_or_else(|| ExchangeError::Parse(format!("missing candle field {}", i)))
            };
            candles.push(Candle {
                datetime: DateTime::<Utc>::from_timestamp(ts, 0)
                    .ok_or_else(|| ExchangeError::Parse("bad candle timestamp".to_string()))?,
                open: field(1)?,
                high: field(2)?,
                low: field(3)?,
                close: field(4)?,
                volume: field(6)?,
            });
        }

        if candles.len() > count {
            candles.drain(..candles.len() - count);
        }
        Ok(candles)
    }

    async fn fee_schedule(&self, pair: &str) -> Result<FeeSchedule, ExchangeError> {
        // Account-level schedule first; fall back to pair metadata when the
        // private endpoint is unavailable (no keys, API failure).
        let exchange_pair = Self::to_exchange_pair(pair);
        let account_fees = async {
            let result = self
                .private_post(
                    "TradeVolume",
                    &[
                        ("pair", exchange_pair.clone()),
                        ("fee-info", "true".to_string()),
                    ],
                )
                .await?;
            let taker = result
                .get("fees")
                .and_then(first_entry)
                .and_then(|f| f.get("fee"))
                .and_then(parse_price)
                .ok_or_else(|| ExchangeError::Parse("missing taker fee".to_string()))?;
            let maker = result
                .get("fees_maker")
                .and_then(first_entry)
                .and_then(|f| f.get("fee"))
                .and_then(parse_price)
                .unwrap_or(taker);
            Ok::<FeeSchedule, ExchangeError>(FeeSchedule {
                maker: maker / 100.0,
                taker: taker / 100.0,
            })
        }
        .await;

        match account_fees {
            Ok(fees) => Ok(fees),
            Err(err) => {
                tracing::debug!("account fee lookup failed ({err}), using pair metadata");
                self.metadata_fees(pair).await
            }
        }
    }

    async fn available_balance(&self, asset: &str) -> Result<f64, ExchangeError> {
        let result = self.private_post("Balance", &[]).await?;
        let balances = result
            .as_object()
            .ok_or_else(|| ExchangeError::Parse("malformed balance map".to_string()))?;

        // Balance keys may carry the legacy Z/X asset-class prefix
        for key in [
            asset.to_string(),
            format!("Z{}", asset),
            format!("X{}", asset),
        ] {
            if let Some(amount) = balances.get(&key).and_then(parse_price) {
                return Ok(amount);
            }
        }
        Ok(0.0)
    }
}
