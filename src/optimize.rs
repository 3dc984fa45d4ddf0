//! # Constrained Weight Optimization
//!
//! $$
//! \max_{\mathbf w}\ 0.9\,\frac{\mathbf w^\top\mu - r_{adj}}
//! {\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! - \frac{0.1}{\lVert\mathbf w-\tfrac1n\rVert^2+\epsilon},
//! \quad \textstyle\sum w_i = 1,\ w_i\in[w_{min},w_{max}]
//! $$
//!
//! Nelder-Mead over an unconstrained parameter vector mapped onto the
//! capped simplex by an exact projection, so every evaluated point (and
//! the returned weights) satisfies both constraints to machine precision.
//! A subset with no usable solution yields `Infeasible`, never an error:
//! the caller drops it and continues.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use ndarray::Array2;

const INFEASIBLE_COST: f64 = 1e10;
const DIVERSIFICATION_EPS: f64 = 1e-6;
const SHARPE_WEIGHT: f64 = 0.9;
const PENALTY_WEIGHT: f64 = 0.1;

/// Outcome of one subset's weight optimization. `Infeasible` is a normal,
/// recoverable result, distinct from programming errors.
#[derive(Clone, Debug, PartialEq)]
pub enum OptimizeOutcome {
  Optimal(Vec<f64>),
  Infeasible,
}

/// Project `v` onto `{ w : sum(w) = 1, lo <= w_i <= hi }` by bisecting on
/// the shift `tau` in `w_i = clamp(v_i + tau, lo, hi)`; the sum is
/// monotone non-decreasing in `tau`.
pub fn project_capped_simplex(v: &[f64], lo: f64, hi: f64) -> Vec<f64> {
  let n = v.len();
  debug_assert!(n > 0 && lo <= hi);
  debug_assert!(n as f64 * lo <= 1.0 + 1e-12 && n as f64 * hi >= 1.0 - 1e-12);

  let clamped_sum = |tau: f64| -> f64 { v.iter().map(|x| (x + tau).clamp(lo, hi)).sum() };

  let v_max = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let v_min = v.iter().cloned().fold(f64::INFINITY, f64::min);
  let mut left = lo - v_max;
  let mut right = hi - v_min;

  for _ in 0..100 {
    let mid = 0.5 * (left + right);
    if clamped_sum(mid) < 1.0 {
      left = mid;
    } else {
      right = mid;
    }
  }

  let tau = 0.5 * (left + right);
  v.iter().map(|x| (x + tau).clamp(lo, hi)).collect()
}

struct WeightCost {
  mu: Vec<f64>,
  cov: Array2<f64>,
  adjusted_rf: f64,
  min_weight: f64,
  max_weight: f64,
}

impl WeightCost {
  fn objective(&self, w: &[f64]) -> f64 {
    let n = w.len();
    let port_ret: f64 = w.iter().zip(self.mu.iter()).map(|(wi, mi)| wi * mi).sum();

    let mut port_var = 0.0;
    for i in 0..n {
      for j in 0..n {
        port_var += w[i] * self.cov[[i, j]] * w[j];
      }
    }
    if port_var <= 1e-16 {
      return INFEASIBLE_COST;
    }

    let sharpe = (port_ret - self.adjusted_rf) / port_var.sqrt();

    let equal = 1.0 / n as f64;
    let dev2: f64 = w.iter().map(|wi| (wi - equal).powi(2)).sum();
    let diversification = 1.0 / (dev2 + DIVERSIFICATION_EPS);

    let cost = -SHARPE_WEIGHT * sharpe + PENALTY_WEIGHT * diversification;
    if cost.is_finite() { cost } else { INFEASIBLE_COST }
  }
}

impl CostFunction for WeightCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = project_capped_simplex(x, self.min_weight, self.max_weight);
    Ok(self.objective(&w))
  }
}

/// Solve for the subset's weights. `mu` and `cov` are already restricted
/// to the selected assets; `adjusted_rf` is the horizon-adjusted
/// risk-free rate from the run configuration.
pub fn optimize_weights(
  mu: &Array1<f64>,
  cov: &Array2<f64>,
  min_weight: f64,
  max_weight: f64,
  adjusted_rf: f64,
) -> OptimizeOutcome {
  let n = mu.len();
  if n == 0 || cov.nrows() != n || cov.ncols() != n {
    return OptimizeOutcome::Infeasible;
  }
  // bounds must admit a point on the simplex at all
  if n as f64 * min_weight > 1.0 + 1e-12 || (n as f64) * max_weight < 1.0 - 1e-12 {
    return OptimizeOutcome::Infeasible;
  }

  let cost = WeightCost {
    mu: mu.to_vec(),
    cov: cov.clone(),
    adjusted_rf,
    min_weight,
    max_weight,
  };

  // start from bounds-clipped equal weights
  let x0: Vec<f64> = vec![(1.0 / n as f64).clamp(min_weight, max_weight); n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] += 0.1;
    simplex.push(point);
  }

  let solver = match NelderMead::new(simplex).with_sd_tolerance(1e-12) {
    Ok(s) => s,
    Err(_) => return OptimizeOutcome::Infeasible,
  };
  let res = match Executor::new(cost, solver)
    .configure(|state| state.max_iters(5000))
    .run()
  {
    Ok(r) => r,
    Err(_) => return OptimizeOutcome::Infeasible,
  };

  let Some(best) = res.state.best_param else {
    return OptimizeOutcome::Infeasible;
  };
  if !res.state.best_cost.is_finite() || res.state.best_cost >= INFEASIBLE_COST {
    return OptimizeOutcome::Infeasible;
  }

  OptimizeOutcome::Optimal(project_capped_simplex(&best, min_weight, max_weight))
}
