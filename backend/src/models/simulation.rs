use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::strategy::{BacktestPeriod, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Idle,
    Generating,
    Ready,
    Trading,
    Completed,
}

impl std::fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationStatus::Idle => write!(f, "idle"),
            SimulationStatus::Generating => write!(f, "generating"),
            SimulationStatus::Ready => write!(f, "ready"),
            SimulationStatus::Trading => write!(f, "trading"),
            SimulationStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "type")]
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    /// When the trade was opened.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: u64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Analysis,
    Risk,
    Signal,
    Execution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub id: u8,
    pub title: String,
    pub description: String,
    pub data_points: String,
    pub status: StepStatus,
    pub progress: u8,
}

/// Per-session view state. Lives only in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub id: Uuid,
    pub status: SimulationStatus,
    pub input: Option<String>,
    pub strategies: Vec<Strategy>,
    pub selected_index: usize,
    pub start_price: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub position: Option<Position>,
    pub chart: VecDeque<ChartPoint>,
    pub insights: VecDeque<Insight>,
    pub generation_started_at: Option<DateTime<Utc>>,
    /// Bumped by every generate request; only the latest one may install results.
    #[serde(skip)]
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationView {
    #[serde(flatten)]
    pub simulation: Simulation,
    pub strategy: Option<Strategy>,
    pub current_price: Option<f64>,
    pub analysis_steps: Vec<AnalysisStep>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectStrategyRequest {
    pub index: i64,
}

#[derive(Debug, Deserialize)]
pub struct BacktestQuery {
    pub period: Option<String>,
}

impl BacktestQuery {
    pub fn period(&self) -> Result<BacktestPeriod, String> {
        match self.period.as_deref() {
            None => Ok(BacktestPeriod::Days30),
            Some(raw) => raw.parse(),
        }
    }
}
