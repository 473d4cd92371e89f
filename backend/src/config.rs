use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub price_symbol: String,
    pub poll_interval: Duration,
    pub generation_delay: Duration,
    pub fallback_base_price: f64,
    pub position_notional: f64,
    pub session_ttl: Duration,
    pub max_sessions: usize,
    pub binance_api_key: Option<String>,
    pub binance_secret_key: Option<String>,
    pub binance_rest_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:8080".to_string(),
            price_symbol: "BTCUSDT".to_string(),
            poll_interval: Duration::from_millis(2000),
            generation_delay: Duration::from_millis(5000),
            fallback_base_price: 65_000.0,
            position_notional: 10_000.0,
            session_ttl: Duration::from_secs(3600),
            max_sessions: 1000,
            binance_api_key: None,
            binance_secret_key: None,
            binance_rest_endpoint: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            price_symbol: env::var("PRICE_SYMBOL").unwrap_or(defaults.price_symbol),
            poll_interval: Duration::from_millis(parse_env(
                "PRICE_POLL_INTERVAL_MS",
                2000,
                |ms: &u64| *ms > 0,
            )),
            generation_delay: Duration::from_millis(parse_env(
                "GENERATION_DELAY_MS",
                5000,
                |_: &u64| true,
            )),
            fallback_base_price: parse_env(
                "FALLBACK_BASE_PRICE",
                defaults.fallback_base_price,
                is_positive_price,
            ),
            position_notional: parse_env(
                "POSITION_NOTIONAL",
                defaults.position_notional,
                is_positive_price,
            ),
            session_ttl: Duration::from_secs(parse_env("SESSION_TTL_SECS", 3600, |s: &u64| *s > 0)),
            max_sessions: parse_env("MAX_SESSIONS", defaults.max_sessions, |n: &usize| *n > 0),
            binance_api_key: env::var("BINANCE_API_KEY").ok(),
            binance_secret_key: env::var("BINANCE_SECRET_KEY").ok(),
            binance_rest_endpoint: rest_endpoint_from_env(),
        }
    }
}

fn is_positive_price(value: &f64) -> bool {
    value.is_finite() && *value > 0.0
}

/// Reads `key`, falling back to `default` when it is unset, unparsable or rejected
/// by `accept`.
fn parse_env<T, F>(key: &str, default: T, accept: F) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&T) -> bool,
{
    let Ok(raw) = env::var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if accept(&value) => value,
        _ => {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }
    }
}

fn rest_endpoint_from_env() -> Option<String> {
    if let Ok(custom) = env::var("BINANCE_REST_ENDPOINT") {
        Some(custom)
    } else if env::var("BINANCE_US").is_ok() {
        Some("https://api.binance.us".to_string())
    } else {
        None
    }
}
