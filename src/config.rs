//! # Configuration
//!
//! $$
//! r_{adj}=(1+r_{annual})^{28/365}-1
//! $$
//!
//! Run-wide parameters bundled into one immutable value that is passed
//! explicitly through the pipeline.

use chrono::NaiveDate;

/// A simulation horizon: a human-readable label and its length in days.
#[derive(Clone, Debug)]
pub struct Horizon {
  pub label: String,
  pub days: usize,
}

impl Horizon {
  pub fn new(label: impl Into<String>, days: usize) -> Self {
    Self {
      label: label.into(),
      days,
    }
  }
}

/// Configuration for a full analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
  /// Horizons to simulate, in reporting order.
  pub horizons: Vec<Horizon>,
  /// Monte Carlo paths per horizon.
  pub n_simulations: usize,
  /// Annual risk-free rate used in Sharpe ratios.
  pub risk_free_rate: f64,
  /// Lower bound per portfolio weight.
  pub min_weight: f64,
  /// Upper bound per portfolio weight.
  pub max_weight: f64,
  /// Tail probability for CVaR.
  pub cvar_alpha: f64,
  /// Portfolio subset sizes to enumerate.
  pub subset_sizes: Vec<usize>,
  /// Inclusive date window applied when loading return series.
  pub date_window: Option<(NaiveDate, NaiveDate)>,
  /// Base RNG seed for the simulators.
  pub seed: u64,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      horizons: vec![
        Horizon::new("1_week", 7),
        Horizon::new("2_week", 14),
        Horizon::new("3_week", 21),
        Horizon::new("4_week", 28),
      ],
      n_simulations: 1000,
      risk_free_rate: 0.04,
      min_weight: 0.01,
      max_weight: 0.70,
      cvar_alpha: 0.05,
      subset_sizes: vec![2, 3, 4],
      date_window: NaiveDate::from_ymd_opt(2024, 1, 2)
        .zip(NaiveDate::from_ymd_opt(2025, 5, 31)),
      seed: 42,
    }
  }
}

impl AnalysisConfig {
  /// Risk-free rate compounded to a fixed 28-day horizon.
  ///
  /// The same value is used for every horizon length; the Sharpe
  /// numerator is deliberately not recomputed per horizon.
  pub fn adjusted_risk_free(&self) -> f64 {
    (1.0 + self.risk_free_rate).powf(28.0 / 365.0) - 1.0
  }
}
