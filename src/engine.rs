//! # Combinatorial Search Engine
//!
//! $$
//! \max_{H,\,k,\,S\in\binom{U}{k}}\ \mathrm{Sharpe}\big(\mathbf w^*(S, H)\big)
//! $$
//!
//! Drives the full pipeline: GARCH fits and joint tail estimation once per
//! run, then per horizon one simulation and risk estimate, then per subset
//! size an exhaustive lexicographic enumeration of asset combinations with
//! one constrained optimization each. Candidates are evaluated on rayon but
//! collected in enumeration order, so best-candidate ties always resolve to
//! the first combination in the canonical order.

use ndarray::Array1;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::info;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::data::ReturnPanel;
use crate::error::Result;
use crate::garch::fit_garch;
use crate::garch::GarchFit;
use crate::optimize::optimize_weights;
use crate::optimize::OptimizeOutcome;
use crate::risk::cvar;
use crate::risk::ledoit_wolf;
use crate::risk::mean_and_std;
use crate::risk::portfolio_returns;
use crate::simulate::simulate_cumulative_returns;
use crate::tail::correlation_matrix;
use crate::tail::estimate_tail_df;
use crate::tail::standardized_residual_matrix;

/// One successfully optimized subset with its realized statistics.
#[derive(Clone, Debug)]
pub struct PortfolioCandidate {
  pub horizon_label: String,
  pub horizon_days: usize,
  pub size: usize,
  pub assets: Vec<String>,
  pub weights: Vec<f64>,
  pub sharpe: f64,
  pub cvar: f64,
}

/// Best candidate for one `(horizon, size)` cell.
#[derive(Clone, Debug)]
pub struct BestPortfolio {
  pub horizon_label: String,
  pub size: usize,
  pub candidate: PortfolioCandidate,
}

/// Full output of a run: every candidate plus per-cell winners.
#[derive(Clone, Debug, Default)]
pub struct AnalysisReport {
  pub candidates: Vec<PortfolioCandidate>,
  pub best: Vec<BestPortfolio>,
  pub tail_df: f64,
}

/// All k-combinations of `0..n` in lexicographic order. This order is the
/// canonical tie-break for best-candidate selection.
pub fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
  if k == 0 || k > n {
    return Vec::new();
  }

  let mut out = Vec::new();
  let mut idx: Vec<usize> = (0..k).collect();
  loop {
    out.push(idx.clone());

    // advance the rightmost index that can still move
    let mut i = k;
    while i > 0 {
      i -= 1;
      if idx[i] != i + n - k {
        idx[i] += 1;
        for j in (i + 1)..k {
          idx[j] = idx[j - 1] + 1;
        }
        break;
      }
      if i == 0 {
        return out;
      }
    }
  }
}

fn evaluate_combination(
  combo: &[usize],
  cumulative: &Array2<f64>,
  mean_returns: &Array1<f64>,
  covariance: &Array2<f64>,
  symbols: &[String],
  config: &AnalysisConfig,
  horizon_label: &str,
  horizon_days: usize,
) -> Option<PortfolioCandidate> {
  let mu_sel = Array1::from_iter(combo.iter().map(|&i| mean_returns[i]));
  let mut cov_sel = Array2::zeros((combo.len(), combo.len()));
  for (a, &i) in combo.iter().enumerate() {
    for (b, &j) in combo.iter().enumerate() {
      cov_sel[[a, b]] = covariance[[i, j]];
    }
  }

  let weights = match optimize_weights(
    &mu_sel,
    &cov_sel,
    config.min_weight,
    config.max_weight,
    config.adjusted_risk_free(),
  ) {
    OptimizeOutcome::Optimal(w) => w,
    OptimizeOutcome::Infeasible => return None,
  };

  let port_rets = portfolio_returns(cumulative, combo, &weights);
  let (mean, std) = mean_and_std(&port_rets);
  if std <= 1e-12 {
    // degenerate simulated risk: Sharpe undefined, treat like a failed
    // optimization and drop the subset
    return None;
  }

  let sharpe = (mean - config.adjusted_risk_free()) / std;
  if !sharpe.is_finite() {
    return None;
  }
  let port_cvar = cvar(&port_rets, config.cvar_alpha);

  Some(PortfolioCandidate {
    horizon_label: horizon_label.to_string(),
    horizon_days,
    size: combo.len(),
    assets: combo.iter().map(|&i| symbols[i].clone()).collect(),
    weights,
    sharpe,
    cvar: port_cvar,
  })
}

/// Run the complete analysis over an aligned return panel.
///
/// Model fitting failures abort before any candidate is produced; failed
/// per-subset optimizations are skipped silently.
pub fn run_analysis(panel: &ReturnPanel, config: &AnalysisConfig) -> Result<AnalysisReport> {
  let fits: Vec<GarchFit> = panel
    .symbols
    .iter()
    .enumerate()
    .map(|(i, symbol)| {
      let returns: Vec<f64> = panel.asset_returns(i).to_vec();
      fit_garch(symbol, &returns)
    })
    .collect::<Result<_>>()?;
  info!(assets = fits.len(), "volatility models fitted");

  let residuals = standardized_residual_matrix(&fits);
  let corr = correlation_matrix(&residuals);
  let tail_df = estimate_tail_df(&residuals)?;
  info!(tail_df, "joint tail parameter estimated");

  let mut report = AnalysisReport {
    tail_df,
    ..Default::default()
  };

  for (h_idx, horizon) in config.horizons.iter().enumerate() {
    let seed = config.seed.wrapping_add((h_idx as u64) << 32);
    let cumulative = simulate_cumulative_returns(
      &fits,
      &corr,
      tail_df,
      horizon.days,
      config.n_simulations,
      seed,
    )?;
    let risk = ledoit_wolf(&cumulative);
    info!(
      horizon = %horizon.label,
      shrinkage = risk.shrinkage,
      "simulated horizon and estimated risk"
    );

    for &size in &config.subset_sizes {
      let combos = combinations(panel.n_assets(), size);
      if combos.is_empty() {
        warn!(size, universe = panel.n_assets(), "no combinations of this size");
        continue;
      }

      let evaluated: Vec<Option<PortfolioCandidate>> = combos
        .par_iter()
        .map(|combo| {
          evaluate_combination(
            combo,
            &cumulative,
            &risk.mean_returns,
            &risk.covariance,
            &panel.symbols,
            config,
            &horizon.label,
            horizon.days,
          )
        })
        .collect();

      let mut best: Option<PortfolioCandidate> = None;
      for candidate in evaluated.into_iter().flatten() {
        // strict > keeps the first combination on ties
        if best.as_ref().map_or(true, |b| candidate.sharpe > b.sharpe) {
          best = Some(candidate.clone());
        }
        report.candidates.push(candidate);
      }

      match best {
        Some(candidate) => report.best.push(BestPortfolio {
          horizon_label: horizon.label.clone(),
          size,
          candidate,
        }),
        None => warn!(
          horizon = %horizon.label,
          size,
          "every combination failed optimization"
        ),
      }
    }
  }

  Ok(report)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rand::rngs::StdRng;
  use rand::Rng;
  use rand::SeedableRng;
  use rand_distr::Distribution;
  use rand_distr::StandardNormal;

  use super::*;
  use crate::config::Horizon;

  fn synthetic_panel(n_assets: usize, n_days: usize, seed: u64) -> ReturnPanel {
    let mut rng = StdRng::seed_from_u64(seed);
    let symbols: Vec<String> = (0..n_assets).map(|i| format!("C{:02}", i)).collect();
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let dates: Vec<NaiveDate> = (0..n_days)
      .map(|d| start + chrono::Days::new(d as u64))
      .collect();

    // volatility-clustered returns so the GARCH fit is well posed
    let mut returns = Array2::zeros((n_days, n_assets));
    for j in 0..n_assets {
      let mut sigma2: f64 = 0.0004;
      let mut eps: f64 = 0.0;
      for i in 0..n_days {
        sigma2 = 0.00004 + 0.08 * eps * eps + 0.82 * sigma2;
        let z: f64 = StandardNormal.sample(&mut rng);
        eps = sigma2.sqrt() * z;
        returns[[i, j]] = eps + 0.0002 * rng.gen_range(-1.0..1.0);
      }
    }

    ReturnPanel {
      symbols,
      dates,
      returns,
    }
  }

  fn small_config() -> AnalysisConfig {
    AnalysisConfig {
      horizons: vec![Horizon::new("1_week", 7)],
      n_simulations: 200,
      subset_sizes: vec![2],
      seed: 17,
      ..AnalysisConfig::default()
    }
  }

  #[test]
  fn combinations_are_lexicographic_and_complete() {
    let combos = combinations(4, 2);
    assert_eq!(
      combos,
      vec![
        vec![0, 1],
        vec![0, 2],
        vec![0, 3],
        vec![1, 2],
        vec![1, 3],
        vec![2, 3],
      ]
    );
    assert!(combinations(3, 0).is_empty());
    assert!(combinations(2, 3).is_empty());
    assert_eq!(combinations(5, 5).len(), 1);
  }

  #[test]
  fn three_asset_universe_yields_three_candidates() {
    let panel = synthetic_panel(3, 600, 21);
    let report = run_analysis(&panel, &small_config()).unwrap();

    assert_eq!(report.candidates.len(), 3);
    assert_eq!(report.best.len(), 1);

    let best_sharpe = report.best[0].candidate.sharpe;
    let max_sharpe = report
      .candidates
      .iter()
      .map(|c| c.sharpe)
      .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(best_sharpe, max_sharpe);
  }

  #[test]
  fn emitted_candidates_satisfy_weight_invariants() {
    let panel = synthetic_panel(3, 600, 4);
    let config = small_config();
    let report = run_analysis(&panel, &config).unwrap();

    for candidate in &report.candidates {
      let sum: f64 = candidate.weights.iter().sum();
      assert!((sum - 1.0).abs() < 1e-6, "weight sum {}", sum);
      for &w in &candidate.weights {
        assert!(w >= config.min_weight - 1e-9);
        assert!(w <= config.max_weight + 1e-9);
      }
      assert!(candidate.sharpe.is_finite());
      assert!(candidate.cvar.is_finite());
    }
  }

  #[test]
  fn tail_df_lies_in_open_interval() {
    let panel = synthetic_panel(3, 600, 8);
    let report = run_analysis(&panel, &small_config()).unwrap();
    assert!(report.tail_df > crate::tail::DF_MIN);
    assert!(report.tail_df < crate::tail::DF_MAX);
  }

  #[test]
  fn run_is_deterministic_for_a_fixed_seed() {
    let panel = synthetic_panel(3, 500, 33);
    let config = small_config();

    let a = run_analysis(&panel, &config).unwrap();
    let b = run_analysis(&panel, &config).unwrap();

    assert_eq!(a.candidates.len(), b.candidates.len());
    for (x, y) in a.candidates.iter().zip(b.candidates.iter()) {
      assert_eq!(x.assets, y.assets);
      assert_eq!(x.sharpe, y.sharpe);
      assert_eq!(x.weights, y.weights);
    }
  }

  #[test]
  fn infeasible_bounds_fail_every_combination_without_aborting() {
    let panel = synthetic_panel(3, 500, 19);
    let config = AnalysisConfig {
      // two weights capped at 0.4 can never sum to 1
      max_weight: 0.4,
      ..small_config()
    };

    let report = run_analysis(&panel, &config).unwrap();
    assert!(report.candidates.is_empty());
    assert!(report.best.is_empty());
  }

  #[test]
  fn oversized_subsets_produce_no_candidates_but_no_error() {
    let panel = synthetic_panel(3, 500, 12);
    let config = AnalysisConfig {
      subset_sizes: vec![5],
      ..small_config()
    };

    let report = run_analysis(&panel, &config).unwrap();
    assert!(report.candidates.is_empty());
    assert!(report.best.is_empty());
  }
}
