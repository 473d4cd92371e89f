//! The per-session simulation state machine.
//!
//! `idle -> generating -> ready -> trading -> completed`. Transitions whose inputs
//! are missing (no price yet, no open trade) leave the state untouched and report
//! `false`; there is no error state.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::simulation::{
    AnalysisStep, ChartPoint, Direction, Insight, InsightKind, Position, Simulation,
    SimulationStatus, StepStatus,
};
use crate::models::strategy::Strategy;

pub const CHART_SEED_POINTS: usize = 30;
pub const CHART_CAPACITY: usize = 60;
pub const INSIGHT_CAPACITY: usize = 10;
const INSIGHT_PROBABILITY: f64 = 0.2;

const INSIGHT_TEMPLATES: [(InsightKind, &str); 5] = [
    (InsightKind::Analysis, "Volatility contraction detected."),
    (InsightKind::Signal, "RSI divergence on 5m timeframe."),
    (InsightKind::Risk, "Dynamic stop-loss adjusted."),
    (InsightKind::Analysis, "Order flow imbalance favoring bulls."),
    (InsightKind::Signal, "Key resistance level tested."),
];

const ANALYSIS_STEPS: [(&str, &str, &str); 4] = [
    (
        "Analyzing market data",
        "Collecting live prices, volume and volatility across recent sessions...",
        "1,234 historical records analyzed",
    ),
    (
        "Detecting trading signals",
        "Scanning technical indicators and recurring patterns for entry opportunities...",
        "15 trading signals detected",
    ),
    (
        "Assessing risk",
        "Weighing reward against volatility to place stop-loss and take-profit levels...",
        "Risk score: 7.2/10",
    ),
    (
        "Generating strategy parameters",
        "Tuning entry, exit and position sizing for each candidate strategy...",
        "3 strategy candidates generated",
    ),
];

/// Picks the direction that profits from the observed move and prices the trade
/// against a fixed notional. An unchanged price resolves LONG with zero pnl.
pub fn resolve_position(
    entry_price: f64,
    exit_price: f64,
    notional: f64,
    opened_at: DateTime<Utc>,
) -> Position {
    let direction = if exit_price < entry_price {
        Direction::Short
    } else {
        Direction::Long
    };
    let pnl_fraction = match direction {
        Direction::Long => (exit_price - entry_price) / entry_price,
        Direction::Short => (entry_price - exit_price) / entry_price,
    };

    Position {
        direction,
        entry_price,
        exit_price,
        pnl: pnl_fraction * notional,
        pnl_percent: pnl_fraction * 100.0,
        timestamp: opened_at,
    }
}

impl Simulation {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SimulationStatus::Idle,
            input: None,
            strategies: Vec::new(),
            selected_index: 0,
            start_price: None,
            start_time: None,
            position: None,
            chart: VecDeque::with_capacity(CHART_CAPACITY),
            insights: VecDeque::with_capacity(INSIGHT_CAPACITY),
            generation_started_at: None,
            generation: 0,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn selected_strategy(&self) -> Option<&Strategy> {
        self.strategies.get(self.selected_index)
    }

    /// Returns the ticket that `finish_generation` must present.
    pub fn begin_generation(&mut self, input: &str, now: DateTime<Utc>) -> u64 {
        info!("Simulation {}: {} -> generating", self.id, self.status);
        self.status = SimulationStatus::Generating;
        self.input = Some(input.to_string());
        self.generation_started_at = Some(now);
        self.generation += 1;
        self.generation
    }

    /// Installs the strategies unless a newer generate request has started since
    /// `ticket` was issued.
    pub fn finish_generation(&mut self, ticket: u64, strategies: Vec<Strategy>) -> bool {
        if ticket != self.generation {
            debug!(
                "Simulation {}: dropping stale generation {} (latest {})",
                self.id, ticket, self.generation
            );
            return false;
        }
        info!(
            "Simulation {}: {} strategies ready",
            self.id,
            strategies.len()
        );
        self.strategies = strategies;
        self.selected_index = 0;
        self.status = SimulationStatus::Ready;
        true
    }

    /// Switches the selected strategy. Out-of-range indices are ignored.
    pub fn select_strategy(&mut self, index: i64) -> bool {
        match usize::try_from(index) {
            Ok(i) if i < self.strategies.len() => {
                self.selected_index = i;
                true
            }
            _ => {
                debug!("Simulation {}: ignoring selection {}", self.id, index);
                false
            }
        }
    }

    pub fn start_trading<R: Rng>(
        &mut self,
        rng: &mut R,
        current_price: Option<f64>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(price) = current_price else {
            debug!("Simulation {}: no price yet, not starting", self.id);
            return false;
        };

        info!("Simulation {}: {} -> trading @ {:.2}", self.id, self.status, price);
        self.status = SimulationStatus::Trading;
        self.start_price = Some(price);
        self.start_time = Some(now);

        self.chart = seed_chart(rng, price);
        self.insights.clear();
        self.push_insight(
            InsightKind::Analysis,
            "AI Agent initialized. Scanning market structure...",
            now,
        );
        true
    }

    pub fn complete_trade(&mut self, current_price: Option<f64>, notional: f64) -> bool {
        let (Some(entry), Some(exit), Some(opened_at)) =
            (self.start_price, current_price, self.start_time)
        else {
            debug!("Simulation {}: nothing to complete", self.id);
            return false;
        };

        let position = resolve_position(entry, exit, notional, opened_at);
        info!(
            "Simulation {}: {:?} {:.2} -> {:.2}, pnl ${:.2} ({:.2}%)",
            self.id, position.direction, entry, exit, position.pnl, position.pnl_percent
        );
        self.position = Some(position);
        self.status = SimulationStatus::Completed;
        true
    }

    /// Feeds a live price into the chart and occasionally emits an insight.
    /// Only sessions that are trading react.
    pub fn record_tick<R: Rng>(&mut self, rng: &mut R, price: f64, now: DateTime<Utc>) {
        if self.status != SimulationStatus::Trading {
            return;
        }

        let time = self.chart.back().map_or(0, |p| p.time + 1);
        self.chart.push_back(ChartPoint { time, price });
        while self.chart.len() > CHART_CAPACITY {
            self.chart.pop_front();
        }

        if rng.gen_bool(INSIGHT_PROBABILITY) {
            if let Some((kind, message)) = INSIGHT_TEMPLATES.choose(rng) {
                self.push_insight(*kind, message, now);
            }
        }
    }

    fn push_insight(&mut self, kind: InsightKind, message: &str, now: DateTime<Utc>) {
        self.insights.push_back(Insight {
            id: Uuid::new_v4(),
            kind,
            message: message.to_string(),
            timestamp: now,
        });
        while self.insights.len() > INSIGHT_CAPACITY {
            self.insights.pop_front();
        }
    }

    /// Progress of the four fake analysis stages, paced across `delay`.
    pub fn analysis_steps(&self, now: DateTime<Utc>, delay: Duration) -> Vec<AnalysisStep> {
        let fraction = match (self.status, self.generation_started_at) {
            (SimulationStatus::Idle, _) => return Vec::new(),
            (SimulationStatus::Generating, Some(started)) => {
                let elapsed = (now - started).to_std().unwrap_or_default();
                if delay.is_zero() {
                    1.0
                } else {
                    (elapsed.as_secs_f64() / delay.as_secs_f64()).min(1.0)
                }
            }
            (SimulationStatus::Generating, None) => 0.0,
            _ => 1.0,
        };

        let count = ANALYSIS_STEPS.len() as f64;
        ANALYSIS_STEPS
            .iter()
            .enumerate()
            .map(|(i, (title, description, data_points))| {
                let start = i as f64 / count;
                let end = (i + 1) as f64 / count;
                let (status, progress) = if fraction >= end {
                    (StepStatus::Completed, 100)
                } else if fraction >= start {
                    let within = (fraction - start) * count * 100.0;
                    (StepStatus::Processing, within.clamp(0.0, 99.0) as u8)
                } else {
                    (StepStatus::Pending, 0)
                };
                AnalysisStep {
                    id: i as u8 + 1,
                    title: title.to_string(),
                    description: description.to_string(),
                    data_points: data_points.to_string(),
                    status,
                    progress,
                }
            })
            .collect()
    }
}

/// Synthetic lead-in so the live chart is not empty when trading starts.
fn seed_chart<R: Rng>(rng: &mut R, start_price: f64) -> VecDeque<ChartPoint> {
    let mut chart = VecDeque::with_capacity(CHART_CAPACITY);
    let mut price = start_price;
    for time in 0..CHART_SEED_POINTS as u64 {
        price *= 1.0 + (rng.gen::<f64>() - 0.5) * 0.002;
        chart.push_back(ChartPoint { time, price });
    }
    chart
}
