use binance::{api::Binance, config::Config as BinanceConfig, market::Market};
use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use rand::Rng;
use tracing::warn;

use crate::config::Config;
use crate::error::AppError;
use crate::models::market::{Candle, PriceSample};

/// Anything that can quote a last-traded price for a symbol.
pub trait PriceSource: Send + Sync {
    fn fetch_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<f64, AppError>>;
}

pub struct MarketDataService {
    market: Market,
}

impl MarketDataService {
    pub fn new(config: &Config) -> Self {
        let mut conf = BinanceConfig::default();
        if let Some(endpoint) = &config.binance_rest_endpoint {
            conf = conf.set_rest_api_endpoint(endpoint.clone());
        }
        let market: Market = Binance::new_with_config(
            config.binance_api_key.clone(),
            config.binance_secret_key.clone(),
            &conf,
        );
        Self { market }
    }
}

impl PriceSource for MarketDataService {
    fn fetch_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<f64, AppError>> {
        Box::pin(async move {
            let ticker = self
                .market
                .get_price(symbol)
                .await
                .map_err(|e| AppError::Binance(e.to_string()))?;
            if !ticker.price.is_finite() || ticker.price <= 0.0 {
                return Err(AppError::Binance(format!(
                    "unusable price {} for {}",
                    ticker.price, symbol
                )));
            }
            Ok(ticker.price)
        })
    }
}

/// Baseline plus uniform noise in [-50, 50).
pub fn synthetic_price<R: Rng>(rng: &mut R, base: f64) -> f64 {
    base + (rng.gen::<f64>() - 0.5) * 100.0
}

/// Quotes `symbol` from `source`, substituting a synthetic price on any failure.
/// Never returns an error.
pub async fn price_or_fallback(
    source: &dyn PriceSource,
    symbol: &str,
    fallback_base: f64,
) -> PriceSample {
    let price = match source.fetch_price(symbol).await {
        Ok(price) => price,
        Err(e) => {
            warn!("Failed to fetch real price, using mock data: {}", e);
            synthetic_price(&mut rand::thread_rng(), fallback_base)
        }
    };
    PriceSample {
        symbol: symbol.to_string(),
        price,
        timestamp: Utc::now(),
    }
}

const CANDLE_BASE_PRICE: f64 = 50_000.0;

/// Hourly random-walk candles, oldest first, the last one opening at `now`.
pub fn generate_candles<R: Rng>(rng: &mut R, count: usize, now: DateTime<Utc>) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(count);
    let mut open = CANDLE_BASE_PRICE;
    for i in (0..count).rev() {
        let close = open + (rng.gen::<f64>() - 0.5) * 1000.0;
        candles.push(Candle {
            time: now - Duration::hours(i as i64),
            open,
            high: open.max(close) + rng.gen::<f64>() * 200.0,
            low: open.min(close) - rng.gen::<f64>() * 200.0,
            close,
        });
        open = close;
    }
    candles
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed script of quotes; once exhausted it keeps failing.
    pub struct ScriptedSource {
        quotes: Mutex<Vec<Result<f64, String>>>,
    }

    impl ScriptedSource {
        pub fn new(mut quotes: Vec<Result<f64, String>>) -> Self {
            quotes.reverse();
            Self {
                quotes: Mutex::new(quotes),
            }
        }

        pub fn failing() -> Self {
            Self::new(Vec::new())
        }
    }

    impl PriceSource for ScriptedSource {
        fn fetch_price<'a>(&'a self, _symbol: &'a str) -> BoxFuture<'a, Result<f64, AppError>> {
            let next = self
                .quotes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err("connection refused".to_string()));
            Box::pin(async move { next.map_err(AppError::Binance) })
        }
    }
}
