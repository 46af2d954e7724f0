//! Classifier-driven backtest on synthetic match features.
//!
//! Features per row: `odds_diff`, `player_form`, `head_to_head`. A trade is
//! labelled profitable when `odds_diff > 0.2 && player_form > 0`. The model
//! is trained on a seeded synthetic set, calibrated, and then asked for
//! probabilities on a second seeded set; rows above 0.6 become trades.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::{Strategy, StrategyResult};
use crate::error::{PipelineError, Result};

pub const TRAINING_SEED: u64 = 42;
pub const SIMULATION_SEED: u64 = 101;
pub const TRAINING_SIZE: usize = 1000;
pub const SIMULATION_SIZE: usize = 50;
pub const BET_THRESHOLD: f64 = 0.6;
/// Fraction of the stake lost on a trade that is not taken or not won.
pub const LOSS_FACTOR: f64 = 0.5;

/// Binary classifier contract used by the backtest.
pub trait Classifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[bool]) -> Result<()>;

    /// Probability of the positive class for each row.
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<bool>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| p >= 0.5)
            .collect())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-9, 1.0 - 1e-9);
    (p / (1.0 - p)).ln()
}

fn check_training_set(features: &[Vec<f64>], labels: &[bool]) -> Result<usize> {
    if features.is_empty() || features.len() != labels.len() {
        return Err(PipelineError::Precondition(format!(
            "training set needs matching, non-empty features and labels (got {} and {})",
            features.len(),
            labels.len()
        )));
    }
    let width = features[0].len();
    if features.iter().any(|row| row.len() != width) {
        return Err(PipelineError::Precondition(
            "training rows have different widths".to_string(),
        ));
    }
    Ok(width)
}

/// L2-regularized logistic regression fitted by batch gradient descent.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
    weights: Vec<f64>,
    bias: f64,
    fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 1000,
            l2: 1e-4,
            weights: Vec::new(),
            bias: 0.0,
            fitted: false,
        }
    }
}

impl LogisticRegression {
    fn score(&self, row: &[f64]) -> f64 {
        self.bias
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[bool]) -> Result<()> {
        let width = check_training_set(features, labels)?;
        let n = features.len() as f64;

        self.weights = vec![0.0; width];
        self.bias = 0.0;

        for _ in 0..self.epochs {
            let mut grad_w = vec![0.0; width];
            let mut grad_b = 0.0;

            for (row, &label) in features.iter().zip(labels) {
                let error = sigmoid(self.score(row)) - if label { 1.0 } else { 0.0 };
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += error * x;
                }
                grad_b += error;
            }

            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * (g / n + self.l2 * *w);
            }
            self.bias -= self.learning_rate * grad_b / n;
        }

        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::Precondition("classifier is not fitted".to_string()));
        }
        Ok(features.iter().map(|row| sigmoid(self.score(row))).collect())
    }
}

/// Platt scaling on top of any classifier.
///
/// The base model is fitted on the first part of the training set and the
/// sigmoid `p' = σ(a · logit(p) + b)` on the held-out tail.
#[derive(Debug, Clone)]
pub struct PlattCalibrated<C> {
    base: C,
    holdout_fraction: f64,
    a: f64,
    b: f64,
    fitted: bool,
}

impl<C: Classifier> PlattCalibrated<C> {
    pub fn new(base: C) -> Self {
        Self {
            base,
            holdout_fraction: 0.2,
            a: 1.0,
            b: 0.0,
            fitted: false,
        }
    }
}

impl<C: Classifier> Classifier for PlattCalibrated<C> {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[bool]) -> Result<()> {
        check_training_set(features, labels)?;

        let holdout = ((features.len() as f64) * self.holdout_fraction) as usize;
        if holdout == 0 || holdout == features.len() {
            return Err(PipelineError::Precondition(
                "training set too small to hold out a calibration slice".to_string(),
            ));
        }
        let split = features.len() - holdout;

        self.base.fit(&features[..split], &labels[..split])?;
        let scores: Vec<f64> = self
            .base
            .predict_proba(&features[split..])?
            .into_iter()
            .map(logit)
            .collect();
        let targets = &labels[split..];

        let (mut a, mut b) = (1.0, 0.0);
        let n = scores.len() as f64;
        for _ in 0..500 {
            let (mut grad_a, mut grad_b) = (0.0, 0.0);
            for (s, &label) in scores.iter().zip(targets) {
                let error = sigmoid(a * s + b) - if label { 1.0 } else { 0.0 };
                grad_a += error * s;
                grad_b += error;
            }
            a -= 0.1 * grad_a / n;
            b -= 0.1 * grad_b / n;
        }

        self.a = a;
        self.b = b;
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::Precondition("classifier is not fitted".to_string()));
        }
        Ok(self
            .base
            .predict_proba(features)?
            .into_iter()
            .map(|p| sigmoid(self.a * logit(p) + self.b))
            .collect())
    }
}

/// Seeded synthetic feature rows.
#[derive(Debug, Clone)]
pub struct SyntheticMatches {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<bool>,
}

impl SyntheticMatches {
    pub fn generate(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut features = Vec::with_capacity(size);
        let mut labels = Vec::with_capacity(size);

        for _ in 0..size {
            let odds_diff = normal(&mut rng) * 0.5 + 0.1;
            let player_form = normal(&mut rng) * 0.5;
            let head_to_head = normal(&mut rng) * 0.3;
            labels.push(odds_diff > 0.2 && player_form > 0.0);
            features.push(vec![odds_diff, player_form, head_to_head]);
        }

        Self { features, labels }
    }

    /// Shuffle with `seed` and split off `test_fraction` of the rows.
    pub fn split(&self, test_fraction: f64, seed: u64) -> (SyntheticMatches, SyntheticMatches) {
        let mut order: Vec<usize> = (0..self.features.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let test_len = ((self.features.len() as f64) * test_fraction).round() as usize;
        let (test_idx, train_idx) = order.split_at(test_len);
        let pick = |idx: &[usize]| SyntheticMatches {
            features: idx.iter().map(|&i| self.features[i].clone()).collect(),
            labels: idx.iter().map(|&i| self.labels[i]).collect(),
        };

        (pick(train_idx), pick(test_idx))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Standard normal draw (Box-Muller).
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn accuracy(predicted: &[bool], actual: &[bool]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = predicted.iter().zip(actual).filter(|(p, a)| p == a).count();
    hits as f64 / actual.len() as f64
}

pub struct ClassifierStrategy<C> {
    risk_target: f64,
    capital: f64,
    model: C,
    trained: bool,
    simulation: Option<Vec<Vec<f64>>>,
}

impl ClassifierStrategy<PlattCalibrated<LogisticRegression>> {
    pub fn calibrated_logistic(risk_target: f64, capital: f64) -> Self {
        Self::new(
            risk_target,
            capital,
            PlattCalibrated::new(LogisticRegression::default()),
        )
    }
}

impl<C: Classifier> ClassifierStrategy<C> {
    pub fn new(risk_target: f64, capital: f64, model: C) -> Self {
        Self {
            risk_target,
            capital,
            model,
            trained: false,
            simulation: None,
        }
    }

    /// Train on the seeded synthetic set and return hold-out accuracy.
    pub fn train(&mut self) -> Result<f64> {
        let data = SyntheticMatches::generate(TRAINING_SIZE, TRAINING_SEED);
        let (train, test) = data.split(0.2, TRAINING_SEED);

        self.model.fit(&train.features, &train.labels)?;
        let predicted = self.model.predict(&test.features)?;
        let score = accuracy(&predicted, &test.labels);
        self.trained = true;

        info!("Classifier strategy trained. Test accuracy: {:.2}", score);
        Ok(score)
    }

    /// Materialize the rows the simulation runs over.
    pub fn load(&mut self, features: Vec<Vec<f64>>) {
        self.simulation = Some(features);
    }

    /// Train (if needed) and load the seeded synthetic simulation set.
    pub fn prepare(&mut self) -> Result<()> {
        if !self.trained {
            self.train()?;
        }
        let sim = SyntheticMatches::generate(SIMULATION_SIZE, SIMULATION_SEED);
        self.load(sim.features);
        Ok(())
    }
}

impl<C: Classifier> Strategy for ClassifierStrategy<C> {
    fn name(&self) -> &str {
        "classifier"
    }

    fn simulate(&mut self) -> Result<StrategyResult> {
        if !self.trained {
            return Err(PipelineError::Precondition(
                "classifier strategy has not been trained".to_string(),
            ));
        }
        let rows = self.simulation.take().ok_or_else(|| {
            PipelineError::Precondition("no simulation data loaded".to_string())
        })?;
        if rows.is_empty() {
            return Err(PipelineError::Precondition("simulation data is empty".to_string()));
        }

        let probabilities = self.model.predict_proba(&rows)?;
        let total = rows.len();
        let profitable = probabilities.iter().filter(|&&p| p > BET_THRESHOLD).count();
        let unprofitable = total - profitable;

        let stake = self.risk_target * self.capital;
        let total_profit =
            profitable as f64 * stake - unprofitable as f64 * stake * LOSS_FACTOR;

        Ok(StrategyResult {
            total_trades: total,
            profitable_trades: profitable,
            unprofitable_trades: unprofitable,
            total_profit,
            average_bet_probability: probabilities.iter().sum::<f64>() / total as f64,
        })
    }
}
