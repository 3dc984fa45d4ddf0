//! # GARCH(1,1) Volatility Fitting
//!
//! $$
//! \sigma_t^2 = \omega + \alpha\,\varepsilon_{t-1}^2 + \beta\,\sigma_{t-1}^2,
//! \quad \varepsilon_t = r_t - \mu,\ \varepsilon_t\sim\mathcal N(0,\sigma_t^2)
//! $$
//!
//! Per-asset conditional-volatility estimation by Gaussian maximum
//! likelihood over `(mu, omega, alpha, beta)`. Fitting happens on returns
//! rescaled to percent units for numerical stability; the fitted state is
//! de-scaled back to fractional units before it leaves this module.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;

use crate::error::AnalysisError;
use crate::error::Result;

const INFEASIBLE: f64 = 1e10;
const SCALE: f64 = 100.0;

/// A fitted GARCH(1,1) model in fractional-return units.
///
/// Immutable once fitted; `(sigma_last, resid_last)` seed the forward
/// simulation recursion.
#[derive(Clone, Debug)]
pub struct GarchFit {
  pub symbol: String,
  /// Conditional mean of daily returns.
  pub mu: f64,
  /// Variance intercept.
  pub omega: f64,
  /// Shock coefficient.
  pub alpha: f64,
  /// Persistence coefficient, `alpha + beta < 1`.
  pub beta: f64,
  /// Conditional volatility per observation.
  pub conditional_vol: Vec<f64>,
  /// Residuals divided by conditional volatility, unit-order variance.
  pub std_residuals: Vec<f64>,
  /// Final conditional volatility.
  pub sigma_last: f64,
  /// Final residual.
  pub resid_last: f64,
}

struct GarchNll {
  returns_pct: Vec<f64>,
  var0: f64,
}

impl GarchNll {
  /// Conditional variance path for given percent-unit parameters.
  /// `sigma_0^2` is seeded with the sample variance of the series.
  fn variance_path(&self, mu: f64, omega: f64, alpha: f64, beta: f64) -> (Vec<f64>, Vec<f64>) {
    let n = self.returns_pct.len();
    let mut sigma2 = Vec::with_capacity(n);
    let mut eps = Vec::with_capacity(n);

    let mut prev_sigma2 = self.var0;
    let mut prev_eps2 = self.var0;
    for (t, &r) in self.returns_pct.iter().enumerate() {
      let s2 = if t == 0 {
        self.var0
      } else {
        omega + alpha * prev_eps2 + beta * prev_sigma2
      };
      let e = r - mu;
      sigma2.push(s2);
      eps.push(e);
      prev_sigma2 = s2;
      prev_eps2 = e * e;
    }

    (sigma2, eps)
  }
}

impl CostFunction for GarchNll {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, p: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let (mu, omega, alpha, beta) = (p[0], p[1], p[2], p[3]);
    if omega <= 0.0 || alpha < 0.0 || beta < 0.0 || alpha + beta >= 1.0 {
      return Ok(INFEASIBLE);
    }

    let (sigma2, eps) = self.variance_path(mu, omega, alpha, beta);
    let ln_2pi = (2.0 * std::f64::consts::PI).ln();
    let mut nll = 0.0;
    for (s2, e) in sigma2.iter().zip(eps.iter()) {
      if *s2 <= 0.0 {
        return Ok(INFEASIBLE);
      }
      nll += 0.5 * (ln_2pi + s2.ln() + e * e / s2);
    }

    if nll.is_finite() { Ok(nll) } else { Ok(INFEASIBLE) }
  }
}

fn sample_mean(xs: &[f64]) -> f64 {
  xs.iter().sum::<f64>() / xs.len() as f64
}

fn sample_variance(xs: &[f64], mean: f64) -> f64 {
  xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Fit a GARCH(1,1) model to one asset's daily fractional returns.
///
/// Non-convergence is fatal for the run: there is no per-asset fallback,
/// since silently dropping an asset would change the combinatorial
/// universe under the caller.
pub fn fit_garch(symbol: &str, returns: &[f64]) -> Result<GarchFit> {
  if returns.len() < 30 {
    return Err(AnalysisError::ModelFit {
      symbol: symbol.to_string(),
      reason: format!("{} observations, need at least 30", returns.len()),
    });
  }

  let returns_pct: Vec<f64> = returns.iter().map(|r| r * SCALE).collect();
  let mean = sample_mean(&returns_pct);
  let var0 = sample_variance(&returns_pct, mean);
  if !(var0.is_finite() && var0 > 0.0) {
    return Err(AnalysisError::ModelFit {
      symbol: symbol.to_string(),
      reason: "degenerate return variance".to_string(),
    });
  }

  let cost = GarchNll {
    returns_pct: returns_pct.clone(),
    var0,
  };

  // Conventional starting point: mild shock term, strong persistence,
  // omega implied by the unconditional variance.
  let alpha0 = 0.05;
  let beta0 = 0.90;
  let x0 = vec![mean, var0 * (1.0 - alpha0 - beta0), alpha0, beta0];
  let mut simplex = Vec::with_capacity(5);
  simplex.push(x0.clone());
  let steps = [0.1 * var0.sqrt().max(1e-3), 0.5 * x0[1].max(1e-4), 0.04, -0.05];
  for (i, step) in steps.iter().enumerate() {
    let mut point = x0.clone();
    point[i] += step;
    simplex.push(point);
  }

  let solver = NelderMead::new(simplex)
    .with_sd_tolerance(1e-10)
    .map_err(|e| AnalysisError::ModelFit {
      symbol: symbol.to_string(),
      reason: e.to_string(),
    })?;
  let res = Executor::new(cost, solver)
    .configure(|state| state.max_iters(10_000))
    .run()
    .map_err(|e| AnalysisError::ModelFit {
      symbol: symbol.to_string(),
      reason: e.to_string(),
    })?;

  let best_cost = res.state.best_cost;
  let best = res.state.best_param.ok_or_else(|| AnalysisError::ModelFit {
    symbol: symbol.to_string(),
    reason: "optimizer returned no parameters".to_string(),
  })?;
  if !best_cost.is_finite() || best_cost >= INFEASIBLE {
    return Err(AnalysisError::ModelFit {
      symbol: symbol.to_string(),
      reason: "likelihood optimizer did not reach a feasible point".to_string(),
    });
  }

  let (mu, omega, alpha, beta) = (best[0], best[1], best[2], best[3]);
  let nll = GarchNll { returns_pct, var0 };
  let (sigma2, eps) = nll.variance_path(mu, omega, alpha, beta);

  let conditional_vol: Vec<f64> = sigma2.iter().map(|s2| s2.sqrt() / SCALE).collect();
  let residuals: Vec<f64> = eps.iter().map(|e| e / SCALE).collect();
  let std_residuals: Vec<f64> = residuals
    .iter()
    .zip(conditional_vol.iter())
    .map(|(e, s)| e / s)
    .collect();
  let sigma_last = *conditional_vol.last().unwrap_or(&0.0);
  let resid_last = *residuals.last().unwrap_or(&0.0);

  debug!(
    symbol,
    omega = omega / (SCALE * SCALE),
    alpha,
    beta,
    nll = best_cost,
    "garch fit converged"
  );

  Ok(GarchFit {
    symbol: symbol.to_string(),
    mu: mu / SCALE,
    omega: omega / (SCALE * SCALE),
    alpha,
    beta,
    conditional_vol,
    std_residuals,
    sigma_last,
    resid_last,
  })
}

#[cfg(test)]
mod tests {
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use rand_distr::Distribution;
  use rand_distr::StandardNormal;

  use super::*;

  /// Simulate a percent-unit GARCH(1,1) path with known parameters.
  fn synthetic_garch(n: usize, omega: f64, alpha: f64, beta: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sigma2 = omega / (1.0 - alpha - beta);
    let mut eps = 0.0;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
      sigma2 = omega + alpha * eps * eps + beta * sigma2;
      let z: f64 = StandardNormal.sample(&mut rng);
      eps = sigma2.sqrt() * z;
      // back to fractional units as the fitter expects
      out.push(eps / 100.0);
    }
    out
  }

  #[test]
  fn fit_recovers_stationary_parameters() {
    let returns = synthetic_garch(2000, 0.1, 0.1, 0.8, 7);
    let fit = fit_garch("SYN", &returns).unwrap();

    assert!(fit.omega > 0.0);
    assert!(fit.alpha >= 0.0);
    assert!(fit.beta >= 0.0);
    assert!(fit.alpha + fit.beta < 1.0);
    assert_eq!(fit.conditional_vol.len(), returns.len());
    assert_eq!(fit.std_residuals.len(), returns.len());
  }

  #[test]
  fn standardized_residuals_have_unit_order_variance() {
    let returns = synthetic_garch(2000, 0.05, 0.08, 0.85, 11);
    let fit = fit_garch("SYN", &returns).unwrap();

    let m = sample_mean(&fit.std_residuals);
    let v = sample_variance(&fit.std_residuals, m);
    assert!(v > 0.7 && v < 1.3, "std residual variance {}", v);
  }

  #[test]
  fn last_state_matches_series_tail() {
    let returns = synthetic_garch(500, 0.1, 0.05, 0.9, 3);
    let fit = fit_garch("SYN", &returns).unwrap();
    assert_eq!(fit.sigma_last, *fit.conditional_vol.last().unwrap());
    assert!(fit.sigma_last > 0.0);
  }

  #[test]
  fn infeasible_parameters_are_penalized() {
    let cost = GarchNll {
      returns_pct: vec![0.5, -0.5, 0.2, -0.1],
      var0: 0.1,
    };
    assert_eq!(cost.cost(&vec![0.0, 0.1, 0.6, 0.5]).unwrap(), INFEASIBLE);
    assert_eq!(cost.cost(&vec![0.0, -0.1, 0.1, 0.5]).unwrap(), INFEASIBLE);
  }

  #[test]
  fn short_series_is_rejected() {
    let returns = vec![0.01; 10];
    assert!(fit_garch("SHORT", &returns).is_err());
  }
}
