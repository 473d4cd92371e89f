use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::market::PriceSample;
use crate::models::simulation::{Simulation, SimulationView};
use crate::models::strategy::{BacktestData, BacktestPeriod};
use crate::services::strategy_generator;

/// Owns every live simulation session. Nothing here survives a restart.
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Simulation>>,
    prices: watch::Receiver<Option<PriceSample>>,
    config: Config,
}

impl SessionManager {
    pub fn new(prices: watch::Receiver<Option<PriceSample>>, config: Config) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            prices,
            config,
        }
    }

    pub fn current_price(&self) -> Option<PriceSample> {
        self.prices.borrow().clone()
    }

    fn view(&self, simulation: &Simulation) -> SimulationView {
        SimulationView {
            simulation: simulation.clone(),
            strategy: simulation.selected_strategy().cloned(),
            current_price: self.current_price().map(|s| s.price),
            analysis_steps: simulation.analysis_steps(Utc::now(), self.config.generation_delay),
        }
    }

    /// Starts an idle session. At capacity, the least recently used one is evicted.
    pub async fn create(&self) -> SimulationView {
        let sim = Simulation::new(Utc::now());
        let view = self.view(&sim);
        let mut sessions = self.sessions.write().await;
        while sessions.len() >= self.config.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|s| s.last_activity)
                .map(|s| s.id)
            else {
                break;
            };
            sessions.remove(&oldest);
            info!("Simulation {} evicted, {} sessions open", oldest, sessions.len());
        }
        info!("Simulation {} created", sim.id);
        sessions.insert(sim.id, sim);
        view
    }

    /// Drops sessions nobody has touched for longer than the configured TTL.
    pub async fn sweep_idle(&self, now: DateTime<Utc>) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(self.config.session_ttl) else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_activity <= ttl);
        let swept = before - sessions.len();
        if swept > 0 {
            info!("Swept {} idle simulations", swept);
        }
        swept
    }

    pub async fn list(&self) -> Vec<SimulationView> {
        let sessions = self.sessions.read().await;
        let mut views: Vec<_> = sessions.values().map(|s| self.view(s)).collect();
        views.sort_by(|a, b| b.simulation.created_at.cmp(&a.simulation.created_at));
        views
    }

    pub async fn get(&self, id: Uuid) -> Result<SimulationView, AppError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .map(|s| self.view(s))
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!("Simulation {} discarded", id);
                Ok(())
            }
            None => Err(not_found(id)),
        }
    }

    /// Applies `f` to one session under the write lock and returns the fresh view.
    async fn update<F>(&self, id: Uuid, f: F) -> Result<SimulationView, AppError>
    where
        F: FnOnce(&mut Simulation),
    {
        let mut sessions = self.sessions.write().await;
        let sim = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        f(sim);
        sim.last_activity = Utc::now();
        Ok(self.view(sim))
    }

    /// Marks the session as generating, waits out the artificial delay with the
    /// lock released, then installs a fresh preset set. A result overtaken by a
    /// later generate request is discarded.
    pub async fn generate(&self, id: Uuid, input: String) -> Result<SimulationView, AppError> {
        let mut ticket = 0;
        self.update(id, |sim| ticket = sim.begin_generation(&input, Utc::now()))
            .await?;

        tokio::time::sleep(self.config.generation_delay).await;

        let current_price = self.current_price().map(|s| s.price);
        let strategies = strategy_generator::generate_strategies(
            &mut rand::thread_rng(),
            &input,
            current_price,
            Utc::now(),
        );
        self.update(id, move |sim| {
            sim.finish_generation(ticket, strategies);
        })
        .await
        .map_err(|e| {
            warn!("Simulation {} vanished while generating", id);
            e
        })
    }

    pub async fn select_strategy(&self, id: Uuid, index: i64) -> Result<SimulationView, AppError> {
        self.update(id, |sim| {
            sim.select_strategy(index);
        })
        .await
    }

    pub async fn start_trading(&self, id: Uuid) -> Result<SimulationView, AppError> {
        let current_price = self.current_price().map(|s| s.price);
        self.update(id, |sim| {
            sim.start_trading(&mut rand::thread_rng(), current_price, Utc::now());
        })
        .await
    }

    pub async fn complete_trade(&self, id: Uuid) -> Result<SimulationView, AppError> {
        let current_price = self.current_price().map(|s| s.price);
        let notional = self.config.position_notional;
        self.update(id, |sim| {
            sim.complete_trade(current_price, notional);
        })
        .await
    }

    /// A fresh backtest of the given strategy over another window. Not stored.
    pub async fn backtest(
        &self,
        id: Uuid,
        index: usize,
        period: BacktestPeriod,
    ) -> Result<BacktestData, AppError> {
        let sessions = self.sessions.read().await;
        let sim = sessions.get(&id).ok_or_else(|| not_found(id))?;
        let strategy = sim
            .strategies
            .get(index)
            .ok_or_else(|| AppError::NotFound(format!("Strategy {index} in simulation {id}")))?;
        Ok(strategy_generator::generate_backtest(
            &mut rand::thread_rng(),
            period,
            strategy.risk_level.base_return(),
            Utc::now(),
        ))
    }

    async fn record_tick(&self, sample: &PriceSample) {
        let mut sessions = self.sessions.write().await;
        let mut rng = rand::thread_rng();
        for sim in sessions.values_mut() {
            sim.record_tick(&mut rng, sample.price, sample.timestamp);
        }
    }

    /// Forwards every new price sample into the trading sessions and expires idle
    /// ones on the same beat.
    pub async fn start_tick_listener(self: Arc<Self>) {
        let mut rx = self.prices.clone();
        info!("Tick listener started");
        while rx.changed().await.is_ok() {
            let sample = rx.borrow_and_update().clone();
            if let Some(sample) = sample {
                self.record_tick(&sample).await;
            }
            self.sweep_idle(Utc::now()).await;
        }
        info!("Price feed closed, tick listener stopped");
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Simulation {id}"))
}
