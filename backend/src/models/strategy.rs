use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Return rate (%) the mock backtests drift towards.
    pub fn base_return(self) -> f64 {
        match self {
            RiskLevel::High => 15.0,
            RiskLevel::Medium => 10.0,
            RiskLevel::Low => 6.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BacktestPeriod {
    #[serde(rename = "30d")]
    Days30,
    #[serde(rename = "90d")]
    Days90,
    #[serde(rename = "180d")]
    Days180,
}

impl BacktestPeriod {
    pub fn days(self) -> u32 {
        match self {
            BacktestPeriod::Days30 => 30,
            BacktestPeriod::Days90 => 90,
            BacktestPeriod::Days180 => 180,
        }
    }
}

impl std::str::FromStr for BacktestPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "30d" => Ok(BacktestPeriod::Days30),
            "90d" => Ok(BacktestPeriod::Days90),
            "180d" => Ok(BacktestPeriod::Days180),
            other => Err(format!("unknown backtest period '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestPoint {
    pub date: String,
    /// Cumulative return in percent.
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestData {
    pub period: BacktestPeriod,
    pub data: Vec<BacktestPoint>,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_trades: u32,
    pub avg_return: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandPosition {
    Above,
    Below,
    Inside,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rsi {
    pub value: f64,
    pub signal: RsiSignal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Macd {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub position: BandPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub rsi: Rsi,
    pub macd: Macd,
    pub bollinger_bands: BollingerBands,
    pub current_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub entry_condition: String,
    pub exit_condition: String,
    pub stop_loss: String,
    pub take_profit: String,
    pub position_size: String,
}

/// Percentage mix of the four archetypes; always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyGenetics {
    pub trend_following: u8,
    pub mean_reversion: u8,
    pub momentum: u8,
    pub volatility: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub risk_label: String,
    pub expected_return: String,
    pub backtest_data: Option<BacktestData>,
    pub technical_indicators: Option<TechnicalIndicators>,
    pub parameters: Option<StrategyParameters>,
    pub genetics: Option<StrategyGenetics>,
    pub ai_confidence: Option<f64>,
    pub market_adaptability: Option<f64>,
    pub ai_analysis: Option<String>,
}
