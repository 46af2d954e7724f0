//! Strategy backtesting.
//!
//! A strategy is loaded with data (fetched odds or synthetic features) and
//! then simulated exactly once; simulating again without reloading is a
//! precondition error, as is simulating before anything was loaded.

pub mod classifier;
pub mod heuristic;

use std::fmt;

use tracing::info;

use crate::error::Result;

pub use classifier::{
    Classifier, ClassifierStrategy, LogisticRegression, PlattCalibrated, SyntheticMatches,
};
pub use heuristic::{ExpectedValueStrategy, ImpliedProbability, ProbabilityEstimator, Signal};

/// Aggregate outcome of one simulation run. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub unprofitable_trades: usize,
    pub total_profit: f64,
    pub average_bet_probability: f64,
}

impl fmt::Display for StrategyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trades={} profitable={} unprofitable={} profit={:.2} avg_prob={:.4}",
            self.total_trades,
            self.profitable_trades,
            self.unprofitable_trades,
            self.total_profit,
            self.average_bet_probability
        )
    }
}

pub trait Strategy {
    fn name(&self) -> &str;

    /// Run the simulation over the loaded data, consuming it.
    fn simulate(&mut self) -> Result<StrategyResult>;
}

/// Runs a weighted set of strategies in order.
pub struct TradingSystem {
    strategies: Vec<(f64, Box<dyn Strategy>)>,
}

impl TradingSystem {
    pub fn new(strategies: Vec<(f64, Box<dyn Strategy>)>) -> Self {
        Self { strategies }
    }

    pub fn backtest(&mut self) -> Result<Vec<(f64, StrategyResult)>> {
        let mut results = Vec::with_capacity(self.strategies.len());

        for (proportion, strategy) in self.strategies.iter_mut() {
            info!(
                "Backtesting strategy '{}' with proportion: {}",
                strategy.name(),
                proportion
            );
            let result = strategy.simulate()?;
            info!("{}: {}", strategy.name(), result);
            results.push((*proportion, result));
        }

        Ok(results)
    }
}
