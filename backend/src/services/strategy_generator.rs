use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

use crate::models::strategy::{
    BacktestData, BacktestPeriod, BacktestPoint, BandPosition, BollingerBands, Macd, RiskLevel,
    Rsi, RsiSignal, Strategy, StrategyGenetics, StrategyParameters, TechnicalIndicators, Trend,
};

struct Preset {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    expected_return: &'static str,
    risk_level: RiskLevel,
}

const PRESETS: [Preset; 3] = [
    Preset {
        id: "trend_following",
        name: "Trend Following",
        description: "Rides established moves once price and volume confirm direction.",
        expected_return: "+8% ~ +12% / month",
        risk_level: RiskLevel::Medium,
    },
    Preset {
        id: "mean_reversion",
        name: "Mean Reversion",
        description: "Buys stretched sell-offs and fades them back towards the average.",
        expected_return: "+12% ~ +18% / month",
        risk_level: RiskLevel::High,
    },
    Preset {
        id: "arbitrage",
        name: "Cross-Exchange Arbitrage",
        description: "Captures short-lived price gaps between venues with small, fast fills.",
        expected_return: "+4% ~ +7% / month",
        risk_level: RiskLevel::Low,
    },
];

pub const PRESET_COUNT: usize = PRESETS.len();

/// Produces the fixed preset strategies, each with freshly randomized analytics.
///
/// The user's prompt is only logged; it never changes what comes back.
/// Indicators are attached only when a price is already known.
pub fn generate_strategies<R: Rng>(
    rng: &mut R,
    input: &str,
    current_price: Option<f64>,
    now: DateTime<Utc>,
) -> Vec<Strategy> {
    info!(
        "Generating {} strategies for prompt of {} chars",
        PRESET_COUNT,
        input.chars().count()
    );

    PRESETS
        .iter()
        .map(|preset| Strategy {
            id: preset.id.to_string(),
            name: preset.name.to_string(),
            description: preset.description.to_string(),
            risk_level: preset.risk_level,
            risk_label: preset.risk_level.label().to_string(),
            expected_return: preset.expected_return.to_string(),
            backtest_data: Some(generate_backtest(
                rng,
                BacktestPeriod::Days30,
                preset.risk_level.base_return(),
                now,
            )),
            technical_indicators: current_price.map(|p| generate_indicators(rng, p)),
            parameters: Some(strategy_parameters(preset.id)),
            genetics: Some(strategy_genetics(preset.id)),
            ai_confidence: Some(rng.gen_range(85.0..95.0)),
            market_adaptability: Some(rng.gen_range(75.0..95.0)),
            ai_analysis: Some(ai_analysis(preset.id).to_string()),
        })
        .collect()
}

/// Random walk of daily cumulative returns with an upward bias, one point per day
/// ending yesterday.
pub fn generate_backtest<R: Rng>(
    rng: &mut R,
    period: BacktestPeriod,
    base_return: f64,
    now: DateTime<Utc>,
) -> BacktestData {
    let days = period.days();
    let drift = base_return / f64::from(days);

    let mut cumulative = 0.0;
    let mut data = Vec::with_capacity(days as usize);
    for i in 0..days {
        cumulative += (rng.gen::<f64>() - 0.3) * 2.0 + drift;
        let date = now - Duration::days(i64::from(days - i));
        data.push(BacktestPoint {
            date: date.format("%Y-%m-%d").to_string(),
            value: cumulative,
        });
    }

    BacktestData {
        period,
        data,
        win_rate: rng.gen_range(60.0..80.0),
        sharpe_ratio: rng.gen_range(1.2..2.5),
        max_drawdown: rng.gen_range(5.0..20.0),
        total_trades: days / 3 + rng.gen_range(0..10),
        avg_return: base_return / (f64::from(days) / 7.0),
        best_trade: rng.gen_range(5.0..15.0),
        worst_trade: -rng.gen_range(2.0..7.0),
    }
}

pub fn generate_indicators<R: Rng>(rng: &mut R, current_price: f64) -> TechnicalIndicators {
    let rsi_value = rng.gen_range(30.0..70.0);
    let macd_value = (rng.gen::<f64>() - 0.5) * 100.0;

    TechnicalIndicators {
        rsi: Rsi {
            value: rsi_value,
            signal: rsi_signal(rsi_value),
        },
        macd: Macd {
            value: macd_value,
            signal: macd_value * 0.9,
            histogram: macd_value * 0.1,
            trend: macd_trend(macd_value),
        },
        bollinger_bands: BollingerBands {
            upper: current_price * 1.02,
            middle: current_price,
            lower: current_price * 0.98,
            position: if rng.gen_bool(0.5) {
                BandPosition::Inside
            } else {
                BandPosition::Above
            },
        },
        current_price,
    }
}

fn rsi_signal(value: f64) -> RsiSignal {
    if value > 70.0 {
        RsiSignal::Overbought
    } else if value < 30.0 {
        RsiSignal::Oversold
    } else {
        RsiSignal::Neutral
    }
}

fn macd_trend(value: f64) -> Trend {
    if value > 0.0 {
        Trend::Bullish
    } else if value < -20.0 {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

// Unknown ids read as trend following in the three lookups below.

pub fn strategy_parameters(strategy_id: &str) -> StrategyParameters {
    let (entry, exit, stop, take, size) = match strategy_id {
        "mean_reversion" => (
            "RSI < 30 and price touches the lower Bollinger band",
            "RSI > 50 or price returns to the moving average",
            "3% below entry",
            "5% above entry",
            "Fixed 40% allocation",
        ),
        "arbitrage" => (
            "Cross-exchange spread above 0.5%",
            "Spread converges below 0.1%",
            "Spread widens beyond 1%",
            "Spread fully converged",
            "High-frequency small clips, 20% per fill",
        ),
        _ => (
            "Price breaks the 20-day MA with volume 1.5x average",
            "Close below the 5-day MA or take-profit at 8%",
            "5% below entry",
            "8% above entry",
            "Start at 30%, scale to 50% once in profit",
        ),
    };
    StrategyParameters {
        entry_condition: entry.to_string(),
        exit_condition: exit.to_string(),
        stop_loss: stop.to_string(),
        take_profit: take.to_string(),
        position_size: size.to_string(),
    }
}

pub fn strategy_genetics(strategy_id: &str) -> StrategyGenetics {
    let (trend_following, mean_reversion, momentum, volatility) = match strategy_id {
        "mean_reversion" => (15, 60, 10, 15),
        "arbitrage" => (5, 20, 25, 50),
        _ => (70, 10, 15, 5),
    };
    StrategyGenetics {
        trend_following,
        mean_reversion,
        momentum,
        volatility,
    }
}

pub fn ai_analysis(strategy_id: &str) -> &'static str {
    match strategy_id {
        "mean_reversion" => {
            "Volatility has picked up and price keeps bouncing out of oversold territory. \
             Mean reversion performs well in this regime: enter when RSI < 30, target 5%, \
             and respect the stop in case the trend turns."
        }
        "arbitrage" => {
            "Persistent price gaps are showing up across several exchanges, so arbitrage \
             windows open frequently. Risk is low but execution has to be fast; keep clips \
             small and make sure liquidity is there."
        }
        _ => {
            "BTC is trading inside a rising channel and momentum indicators are strong, \
             which favours trend following. A 5% stop keeps risk contained and the setup \
             has a high probability of success under current conditions."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn always_three_presets_regardless_of_input() {
        let mut rng = StdRng::seed_from_u64(7);
        for input in ["", "buy the dip", "x".repeat(10_000).as_str()] {
            let strategies = generate_strategies(&mut rng, input, Some(65_000.0), Utc::now());
            assert_eq!(strategies.len(), 3);
            let ids: Vec<_> = strategies.iter().map(|s| s.id.as_str()).collect();
            assert_eq!(ids, ["trend_following", "mean_reversion", "arbitrage"]);
        }
    }

    #[test]
    fn indicators_only_when_price_known() {
        let mut rng = StdRng::seed_from_u64(1);
        let without = generate_strategies(&mut rng, "", None, Utc::now());
        assert!(without.iter().all(|s| s.technical_indicators.is_none()));

        let with = generate_strategies(&mut rng, "", Some(60_000.0), Utc::now());
        for s in &with {
            let ti = s.technical_indicators.as_ref().unwrap();
            assert_eq!(ti.bollinger_bands.middle, 60_000.0);
            assert!((ti.bollinger_bands.upper - 61_200.0).abs() < 1e-6);
            assert!((ti.bollinger_bands.lower - 58_800.0).abs() < 1e-6);
        }
    }

    #[test]
    fn backtest_shape_and_ranges() {
        let mut rng = StdRng::seed_from_u64(42);
        let now = DateTime::parse_from_rfc3339("2024-03-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        for period in [BacktestPeriod::Days30, BacktestPeriod::Days90, BacktestPeriod::Days180] {
            let bt = generate_backtest(&mut rng, period, 10.0, now);
            let days = period.days();
            assert_eq!(bt.data.len(), days as usize);
            assert_eq!(bt.data.last().unwrap().date, "2024-03-30");
            assert!((60.0..80.0).contains(&bt.win_rate));
            assert!((1.2..2.5).contains(&bt.sharpe_ratio));
            assert!((5.0..20.0).contains(&bt.max_drawdown));
            assert!(bt.total_trades >= days / 3 && bt.total_trades < days / 3 + 10);
            assert!((bt.avg_return - 10.0 / (f64::from(days) / 7.0)).abs() < 1e-9);
            assert!((5.0..15.0).contains(&bt.best_trade));
            assert!(bt.worst_trade <= -2.0 && bt.worst_trade > -7.0);
        }
        let first = generate_backtest(&mut rng, BacktestPeriod::Days30, 10.0, now);
        assert_eq!(first.data[0].date, "2024-03-01");
    }

    #[test]
    fn indicator_signals_follow_thresholds() {
        assert_eq!(rsi_signal(71.0), RsiSignal::Overbought);
        assert_eq!(rsi_signal(29.0), RsiSignal::Oversold);
        assert_eq!(rsi_signal(50.0), RsiSignal::Neutral);
        assert_eq!(macd_trend(0.5), Trend::Bullish);
        assert_eq!(macd_trend(-10.0), Trend::Neutral);
        assert_eq!(macd_trend(-25.0), Trend::Bearish);
    }

    #[test]
    fn genetics_sum_to_one_hundred_and_unknown_falls_back() {
        for id in ["trend_following", "mean_reversion", "arbitrage"] {
            let g = strategy_genetics(id);
            let total = g.trend_following + g.mean_reversion + g.momentum + g.volatility;
            assert_eq!(total, 100, "{id}");
        }
        assert_eq!(strategy_genetics("scalping"), strategy_genetics("trend_following"));
        assert_eq!(strategy_parameters("scalping"), strategy_parameters("trend_following"));
        assert_eq!(ai_analysis("scalping"), ai_analysis("trend_following"));
    }

    #[test]
    fn confidence_and_adaptability_ranges() {
        let mut rng = StdRng::seed_from_u64(99);
        for s in generate_strategies(&mut rng, "", None, Utc::now()) {
            let c = s.ai_confidence.unwrap();
            let a = s.market_adaptability.unwrap();
            assert!((85.0..95.0).contains(&c));
            assert!((75.0..95.0).contains(&a));
        }
    }
}
