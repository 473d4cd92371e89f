use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::market::PriceSample;
use crate::services::market_data::{price_or_fallback, PriceSource};

// tokio::time::interval panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls one symbol on a fixed interval and publishes the latest sample.
pub struct PricePoller {
    source: Arc<dyn PriceSource>,
    symbol: String,
    fallback_base: f64,
    interval: Duration,
    tx: watch::Sender<Option<PriceSample>>,
}

impl PricePoller {
    pub fn new(
        source: Arc<dyn PriceSource>,
        symbol: String,
        fallback_base: f64,
        interval: Duration,
    ) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            source,
            symbol,
            fallback_base,
            interval: interval.max(MIN_POLL_INTERVAL),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PriceSample>> {
        self.tx.subscribe()
    }

    pub async fn poll_once(&self) -> PriceSample {
        let sample = price_or_fallback(self.source.as_ref(), &self.symbol, self.fallback_base).await;
        debug!("{} @ {:.2}", sample.symbol, sample.price);
        self.tx.send_replace(Some(sample.clone()));
        sample
    }

    /// Fetches immediately, then once per interval until the task is dropped.
    pub async fn start_background_task(self: Arc<Self>) {
        info!(
            "Price poller started for {}. Polling every {:?}.",
            self.symbol, self.interval
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::market_data::testing::ScriptedSource;

    #[tokio::test]
    async fn publishes_latest_sample() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(65_000.0), Ok(65_500.0)]));
        let poller = PricePoller::new(source, "BTCUSDT".into(), 65_000.0, Duration::from_secs(2));
        let rx = poller.subscribe();
        assert!(rx.borrow().is_none());

        poller.poll_once().await;
        assert_eq!(rx.borrow().as_ref().map(|s| s.price), Some(65_000.0));
        poller.poll_once().await;
        assert_eq!(rx.borrow().as_ref().map(|s| s.price), Some(65_500.0));
    }

    #[tokio::test]
    async fn network_failure_never_escapes() {
        let poller = PricePoller::new(
            Arc::new(ScriptedSource::failing()),
            "BTCUSDT".into(),
            65_000.0,
            Duration::from_secs(2),
        );
        let sample = poller.poll_once().await;
        assert!((sample.price - 65_000.0).abs() <= 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn background_task_polls_on_start_and_every_interval() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(1.0), Ok(2.0), Ok(3.0)]));
        let poller = Arc::new(PricePoller::new(
            source,
            "BTCUSDT".into(),
            65_000.0,
            Duration::from_secs(2),
        ));
        let mut rx = poller.subscribe();
        let handle = tokio::spawn(poller.clone().start_background_task());

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.price), Some(1.0));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.price), Some(2.0));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.price), Some(3.0));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_publishes() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(10.0), Ok(11.0)]));
        let poller = Arc::new(PricePoller::new(
            source,
            "BTCUSDT".into(),
            65_000.0,
            Duration::ZERO,
        ));
        let mut rx = poller.subscribe();
        let handle = tokio::spawn(poller.clone().start_background_task());

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.price), Some(10.0));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.price), Some(11.0));
        assert!(!handle.is_finished());

        handle.abort();
    }
}
