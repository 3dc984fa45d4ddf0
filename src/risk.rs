//! # Portfolio Risk Estimation
//!
//! $$
//! \Sigma_{LW} = \rho\,\mu I + (1-\rho)\,S,\qquad
//! \mathrm{CVaR}_\alpha = -\mathbb E[R \mid R \le q_\alpha]
//! $$
//!
//! Ledoit-Wolf shrinkage covariance and mean returns over simulated
//! horizon outcomes, plus empirical CVaR for candidate portfolios.

use ndarray::Array1;
use ndarray::Array2;

/// Shrinkage covariance and per-asset means of a cumulative-return matrix.
#[derive(Clone, Debug)]
pub struct RiskEstimate {
  pub covariance: Array2<f64>,
  pub mean_returns: Array1<f64>,
  /// Shrinkage intensity actually applied, in `[0, 1]`.
  pub shrinkage: f64,
}

/// Ledoit-Wolf (2004) well-conditioned estimator: the ML sample covariance
/// shrunk toward `mu * I` with the closed-form optimal intensity.
///
/// Uses the ddof = 0 sample covariance and Frobenius-norm pivot
/// estimates from the original Ledoit-Wolf paper.
pub fn ledoit_wolf(returns: &Array2<f64>) -> RiskEstimate {
  let (n, p) = (returns.nrows(), returns.ncols());
  assert!(n > 0 && p > 0, "empty return matrix");

  let n_f = n as f64;
  let p_f = p as f64;

  let means: Vec<f64> = (0..p).map(|j| returns.column(j).sum() / n_f).collect();
  let mut centered = returns.clone();
  for j in 0..p {
    for i in 0..n {
      centered[[i, j]] -= means[j];
    }
  }

  // S = X'X / n
  let mut sample = Array2::zeros((p, p));
  for i in 0..p {
    for j in i..p {
      let mut acc = 0.0;
      for t in 0..n {
        acc += centered[[t, i]] * centered[[t, j]];
      }
      let c = acc / n_f;
      sample[[i, j]] = c;
      sample[[j, i]] = c;
    }
  }

  let mu = (0..p).map(|i| sample[[i, i]]).sum::<f64>() / p_f;

  // delta^2 = ||S - mu I||_F^2 / p
  let mut delta2 = 0.0;
  for i in 0..p {
    for j in 0..p {
      let target = if i == j { mu } else { 0.0 };
      delta2 += (sample[[i, j]] - target).powi(2);
    }
  }
  delta2 /= p_f;

  // beta_bar^2 = (1 / n^2) sum_t ||x_t x_t' - S||_F^2 / p
  let mut beta_bar2 = 0.0;
  for t in 0..n {
    for i in 0..p {
      for j in 0..p {
        let outer = centered[[t, i]] * centered[[t, j]];
        beta_bar2 += (outer - sample[[i, j]]).powi(2);
      }
    }
  }
  beta_bar2 /= n_f * n_f * p_f;

  let beta2 = beta_bar2.min(delta2);
  let shrinkage = if delta2 > 0.0 { beta2 / delta2 } else { 0.0 };
  let shrinkage = shrinkage.clamp(0.0, 1.0);

  let mut covariance = sample;
  for i in 0..p {
    for j in 0..p {
      let target = if i == j { mu } else { 0.0 };
      covariance[[i, j]] = shrinkage * target + (1.0 - shrinkage) * covariance[[i, j]];
    }
  }

  RiskEstimate {
    covariance,
    mean_returns: Array1::from(means),
    shrinkage,
  }
}

/// Simulated per-path returns of a weighted subset of assets.
pub fn portfolio_returns(cumulative: &Array2<f64>, subset: &[usize], weights: &[f64]) -> Vec<f64> {
  debug_assert_eq!(subset.len(), weights.len());
  (0..cumulative.nrows())
    .map(|s| {
      subset
        .iter()
        .zip(weights.iter())
        .map(|(&a, &w)| w * cumulative[[s, a]])
        .sum()
    })
    .collect()
}

/// Empirical CVaR: mean of the lowest `floor(alpha * n)` sorted returns
/// (at least one observation), negated so losses are positive.
pub fn cvar(returns: &[f64], alpha: f64) -> f64 {
  if returns.is_empty() {
    return 0.0;
  }

  let mut sorted = returns.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
  let cutoff = ((alpha * sorted.len() as f64).floor() as usize)
    .max(1)
    .min(sorted.len());
  let tail_mean: f64 = sorted[..cutoff].iter().sum::<f64>() / cutoff as f64;

  -tail_mean
}

/// Population mean and standard deviation (ddof = 0).
pub fn mean_and_std(xs: &[f64]) -> (f64, f64) {
  if xs.is_empty() {
    return (0.0, 0.0);
  }
  let n = xs.len() as f64;
  let mean = xs.iter().sum::<f64>() / n;
  let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
  (mean, var.sqrt())
}
