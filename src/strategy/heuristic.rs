//! Expected-value signal over decimal odds.
//!
//! `expected_value = probability * odds - 1`, BUY above 0.05, HOLD otherwise.
//! With the default estimator the probability is `1 / odds`, which makes the
//! expected value zero for every valid price: the market is scored against
//! itself. Plug in a model-backed `ProbabilityEstimator` to get real signals.

use tracing::debug;

use super::{Strategy, StrategyResult};
use crate::error::{PipelineError, Result};
use crate::models::OddsRow;

pub const EV_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Hold,
}

/// Win probability for one priced row.
pub trait ProbabilityEstimator {
    fn estimate(&self, row: &OddsRow, odds: f64) -> f64;
}

/// Bookmaker-implied probability, `1 / odds`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpliedProbability;

impl ProbabilityEstimator for ImpliedProbability {
    fn estimate(&self, _row: &OddsRow, odds: f64) -> f64 {
        1.0 / odds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub event_name: Option<String>,
    pub odds: f64,
    pub probability: f64,
    pub expected_value: f64,
    pub signal: Signal,
}

/// Usable decimal price, if any. Zero, negative and non-finite prices are rejected.
fn usable_odds(row: &OddsRow) -> Option<f64> {
    row.odds_a.filter(|o| o.is_finite() && *o > 0.0)
}

pub struct ExpectedValueStrategy<E = ImpliedProbability> {
    risk_target: f64,
    capital: f64,
    estimator: E,
    rows: Option<Vec<OddsRow>>,
}

impl ExpectedValueStrategy<ImpliedProbability> {
    pub fn new(risk_target: f64, capital: f64) -> Self {
        Self::with_estimator(risk_target, capital, ImpliedProbability)
    }
}

impl<E: ProbabilityEstimator> ExpectedValueStrategy<E> {
    pub fn with_estimator(risk_target: f64, capital: f64, estimator: E) -> Self {
        Self {
            risk_target,
            capital,
            estimator,
            rows: None,
        }
    }

    /// Materialize the odds this strategy will run over.
    pub fn load(&mut self, rows: Vec<OddsRow>) {
        self.rows = Some(rows);
    }

    pub fn is_loaded(&self) -> bool {
        self.rows.is_some()
    }

    /// Score every row with a usable price; rows without one are skipped.
    pub fn evaluate(&self, rows: &[OddsRow]) -> Vec<Evaluation> {
        rows.iter()
            .filter_map(|row| {
                let Some(odds) = usable_odds(row) else {
                    debug!("Skipping row without a usable price: {:?}", row.event_name);
                    return None;
                };
                let probability = self.estimator.estimate(row, odds);
                let expected_value = probability * odds - 1.0;
                let signal = if expected_value > EV_THRESHOLD {
                    Signal::Buy
                } else {
                    Signal::Hold
                };
                Some(Evaluation {
                    event_name: row.event_name.clone(),
                    odds,
                    probability,
                    expected_value,
                    signal,
                })
            })
            .collect()
    }
}

impl<E: ProbabilityEstimator> Strategy for ExpectedValueStrategy<E> {
    fn name(&self) -> &str {
        "expected_value"
    }

    fn simulate(&mut self) -> Result<StrategyResult> {
        let rows = self.rows.take().ok_or_else(|| {
            PipelineError::Precondition("no odds loaded; fetch data before simulating".to_string())
        })?;
        if rows.is_empty() {
            return Err(PipelineError::Precondition("loaded odds are empty".to_string()));
        }

        let evaluations = self.evaluate(&rows);
        if evaluations.is_empty() {
            return Err(PipelineError::Precondition(format!(
                "none of the {} loaded odds rows has a usable price",
                rows.len()
            )));
        }
        let stake = self.risk_target * self.capital;

        let buys: Vec<&Evaluation> = evaluations
            .iter()
            .filter(|e| e.signal == Signal::Buy)
            .collect();
        let total_profit = buys.iter().map(|e| stake * e.expected_value).sum::<f64>();
        let average_bet_probability =
            evaluations.iter().map(|e| e.probability).sum::<f64>() / evaluations.len() as f64;

        Ok(StrategyResult {
            total_trades: evaluations.len(),
            profitable_trades: buys.len(),
            unprofitable_trades: evaluations.len() - buys.len(),
            total_profit,
            average_bet_probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(odds: Option<f64>) -> OddsRow {
        OddsRow {
            sport_key: "baseball_mlb_world_series_winner".to_string(),
            event_id: None,
            event_name: Some("Team".to_string()),
            bookmaker: "DraftKings".to_string(),
            market: "outrights".to_string(),
            odds_a: odds,
            odds_b: None,
            odds_c: None,
            region: "us".to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn implied_probability_gives_zero_ev_and_hold() {
        let strategy = ExpectedValueStrategy::new(0.3, 100.0);
        let evals = strategy.evaluate(&[row(Some(4.0))]);
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].probability, 0.25);
        assert_eq!(evals[0].expected_value, 0.0);
        assert_eq!(evals[0].signal, Signal::Hold);
    }

    #[test]
    fn implied_probability_never_buys() {
        let strategy = ExpectedValueStrategy::new(0.3, 100.0);
        let rows: Vec<OddsRow> = [1.01, 1.5, 1.91, 2.0, 3.0, 3.3, 7.5, 13.0, 101.0, 1001.0]
            .iter()
            .map(|o| row(Some(*o)))
            .collect();
        let evals = strategy.evaluate(&rows);
        assert_eq!(evals.len(), rows.len());
        assert!(evals.iter().all(|e| e.signal == Signal::Hold));
    }

    #[test]
    fn unusable_prices_are_skipped() {
        let strategy = ExpectedValueStrategy::new(0.3, 100.0);
        let evals = strategy.evaluate(&[
            row(None),
            row(Some(0.0)),
            row(Some(-2.0)),
            row(Some(f64::INFINITY)),
            row(Some(2.0)),
        ]);
        assert_eq!(evals.len(), 1);
    }

    struct Fixed(f64);

    impl ProbabilityEstimator for Fixed {
        fn estimate(&self, _row: &OddsRow, _odds: f64) -> f64 {
            self.0
        }
    }

    #[test]
    fn pluggable_estimator_produces_buys() {
        let mut strategy = ExpectedValueStrategy::with_estimator(0.1, 1000.0, Fixed(0.5));
        strategy.load(vec![row(Some(2.5)), row(Some(1.8))]);

        let result = strategy.simulate().unwrap();
        // 0.5 * 2.5 - 1 = 0.25 -> BUY, 0.5 * 1.8 - 1 = -0.1 -> HOLD
        assert_eq!(result.total_trades, 2);
        assert_eq!(result.profitable_trades, 1);
        assert_eq!(result.unprofitable_trades, 1);
        assert!((result.total_profit - 25.0).abs() < 1e-9);
        assert!((result.average_bet_probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn simulate_requires_data_and_is_one_shot() {
        let mut strategy = ExpectedValueStrategy::new(0.3, 100.0);
        assert!(matches!(strategy.simulate(), Err(PipelineError::Precondition(_))));

        strategy.load(Vec::new());
        assert!(matches!(strategy.simulate(), Err(PipelineError::Precondition(_))));

        strategy.load(vec![row(None), row(Some(0.0)), row(Some(f64::NAN))]);
        assert!(matches!(strategy.simulate(), Err(PipelineError::Precondition(_))));

        strategy.load(vec![row(Some(4.0))]);
        let result = strategy.simulate().unwrap();
        assert_eq!(result.profitable_trades, 0);
        assert_eq!(result.total_profit, 0.0);
        assert!(!strategy.is_loaded());
        assert!(strategy.simulate().is_err());
    }
}
