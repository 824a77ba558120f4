//! # Hashvest Market
//!
//! Live BTC price and network difficulty with fallback sources.
//!
//! Price comes from CoinGecko, falling back to CryptoCompare; difficulty
//! comes from mempool.space. Every fetch failure is logged and degrades to
//! `None` — the caller substitutes saved or default values, and the
//! projection engine stays oblivious to how its inputs were obtained.
//! History endpoints feed the charts page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const COINGECKO_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";
const CRYPTOCOMPARE_PRICE_URL: &str =
    "https://min-api.cryptocompare.com/data/price?fsym=BTC&tsyms=USD";
const MEMPOOL_HASHRATE_1D_URL: &str = "https://mempool.space/api/v1/mining/hashrate/1d";
const MEMPOOL_HASHRATE_1Y_URL: &str = "https://mempool.space/api/v1/mining/hashrate/1y";
const COINGECKO_CHART_URL: &str =
    "https://api.coingecko.com/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=90";

/// Result type alias for market fetch operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors from individual market fetches (callers usually degrade instead
/// of propagating these)
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("market request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected market payload: {0}")]
    Malformed(String),
}

/// Current market conditions; `None` fields mean every source failed
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Spot BTC price in whole USD
    pub price_usd: Option<f64>,
    /// Network difficulty in T, two decimals
    pub difficulty_t: Option<f64>,
}

impl MarketSnapshot {
    pub fn is_live(&self) -> bool {
        self.price_usd.is_some() || self.difficulty_t.is_some()
    }
}

/// One point of a price history series
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PricePoint {
    pub at: DateTime<Utc>,
    pub usd: f64,
}

/// One point of a difficulty or hashrate history series
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NetworkPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

#[derive(Deserialize)]
struct CoingeckoPrice {
    bitcoin: CoingeckoPriceInner,
}

#[derive(Deserialize)]
struct CoingeckoPriceInner {
    usd: f64,
}

#[derive(Deserialize)]
struct CryptocomparePrice {
    #[serde(rename = "USD")]
    usd: f64,
}

#[derive(Deserialize)]
struct MempoolHashrate {
    #[serde(default)]
    difficulty: Vec<MempoolDifficultyPoint>,
    #[serde(default)]
    hashrates: Vec<MempoolHashratePoint>,
}

#[derive(Deserialize)]
struct MempoolDifficultyPoint {
    time: i64,
    difficulty: f64,
}

#[derive(Deserialize)]
struct MempoolHashratePoint {
    timestamp: i64,
    #[serde(rename = "avgHashrate")]
    avg_hashrate: f64,
}

#[derive(Deserialize)]
struct CoingeckoChart {
    // timestamps arrive in milliseconds, occasionally as floats
    prices: Vec<(f64, f64)>,
}

/// HTTP client over the public market-data sources
pub struct MarketClient {
    http: reqwest::Client,
}

impl MarketClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("hashvest/0.1")
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { http }
    }

    /// Fetch current price and difficulty, degrading per-field on failure.
    pub async fn snapshot(&self) -> MarketSnapshot {
        let price_usd = match self.fetch_price().await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::warn!(error = %e, "all price sources failed");
                None
            }
        };
        let difficulty_t = match self.fetch_difficulty().await {
            Ok(difficulty) => Some(difficulty),
            Err(e) => {
                tracing::warn!(error = %e, "difficulty source failed");
                None
            }
        };
        MarketSnapshot {
            price_usd,
            difficulty_t,
        }
    }

    /// Spot price in whole USD: CoinGecko first, CryptoCompare fallback.
    async fn fetch_price(&self) -> Result<f64> {
        match self.coingecko_price().await {
            Ok(price) => Ok(price),
            Err(e) => {
                tracing::warn!(error = %e, "CoinGecko price failed, trying CryptoCompare");
                self.cryptocompare_price().await
            }
        }
    }

    async fn coingecko_price(&self) -> Result<f64> {
        let payload: CoingeckoPrice = self
            .http
            .get(COINGECKO_PRICE_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        validate_price(payload.bitcoin.usd)
    }

    async fn cryptocompare_price(&self) -> Result<f64> {
        let payload: CryptocomparePrice = self
            .http
            .get(CRYPTOCOMPARE_PRICE_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        validate_price(payload.usd)
    }

    /// Latest network difficulty in T, rounded to two decimals.
    async fn fetch_difficulty(&self) -> Result<f64> {
        let payload: MempoolHashrate = self
            .http
            .get(MEMPOOL_HASHRATE_1D_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let latest = payload
            .difficulty
            .last()
            .ok_or_else(|| MarketError::Malformed("empty difficulty series".into()))?;
        if latest.difficulty <= 0.0 {
            return Err(MarketError::Malformed("non-positive difficulty".into()));
        }
        Ok(round2(latest.difficulty / 1e12))
    }

    /// 90-day BTC price history, sampled down to roughly 90 points.
    pub async fn price_history(&self) -> Result<Vec<PricePoint>> {
        let payload: CoingeckoChart = self
            .http
            .get(COINGECKO_CHART_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(sample_prices(&payload.prices, 90))
    }

    /// One-year difficulty history in T.
    pub async fn difficulty_history(&self) -> Result<Vec<NetworkPoint>> {
        let payload = self.mempool_year().await?;
        Ok(payload
            .difficulty
            .iter()
            .map(|p| NetworkPoint {
                at: timestamp(p.time),
                value: round2(p.difficulty / 1e12),
            })
            .collect())
    }

    /// One-year average hashrate history in EH/s.
    pub async fn hashrate_history(&self) -> Result<Vec<NetworkPoint>> {
        let payload = self.mempool_year().await?;
        Ok(payload
            .hashrates
            .iter()
            .map(|p| NetworkPoint {
                at: timestamp(p.timestamp),
                value: p.avg_hashrate / 1e18,
            })
            .collect())
    }

    async fn mempool_year(&self) -> Result<MempoolHashrate> {
        Ok(self
            .http
            .get(MEMPOOL_HASHRATE_1Y_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

impl Default for MarketClient {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_price(price: f64) -> Result<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price.round())
    } else {
        Err(MarketError::Malformed(format!("bad price {price}")))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

/// Thin every-nth sampling keeping the series readable on a chart
fn sample_prices(raw: &[(f64, f64)], target: usize) -> Vec<PricePoint> {
    let step = (raw.len() / target.max(1)).max(1);
    raw.iter()
        .step_by(step)
        .map(|(ms, usd)| PricePoint {
            at: DateTime::<Utc>::from_timestamp_millis(*ms as i64).unwrap_or_else(Utc::now),
            usd: usd.round(),
        })
        .collect()
}
