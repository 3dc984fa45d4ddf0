//! # Joint Tail Estimation
//!
//! $$
//! \hat\nu=\arg\max_{\nu\in(2.01,30)}\sum_t \log t_\nu(\mathbf{z}_t;\,\mathbf{0},\,\hat\Sigma)
//! $$
//!
//! Shared degrees-of-freedom of a zero-mean multivariate Student-t fitted
//! to the standardized GARCH residuals of all assets, plus the residual
//! correlation matrix that shapes the simulated shocks.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::goldensectionsearch::GoldenSectionSearch;
use nalgebra::Cholesky;
use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::Array2;
use statrs::function::gamma::ln_gamma;
use tracing::debug;

use crate::error::AnalysisError;
use crate::error::Result;
use crate::garch::GarchFit;

/// Lower bound excluded from the likelihood: variance is undefined there.
pub const DF_MIN: f64 = 2.01;
pub const DF_MAX: f64 = 30.0;

const DF_SEED: f64 = 5.0;
const PENALTY: f64 = 1e10;

/// Stack per-asset standardized residuals into a (time, assets) matrix.
///
/// All fits come from the same aligned panel, so the residual series have
/// equal length; the shortest one wins defensively.
pub fn standardized_residual_matrix(fits: &[GarchFit]) -> Array2<f64> {
  let rows = fits
    .iter()
    .map(|f| f.std_residuals.len())
    .min()
    .unwrap_or(0);
  let mut out = Array2::zeros((rows, fits.len()));
  for (j, fit) in fits.iter().enumerate() {
    let offset = fit.std_residuals.len() - rows;
    for i in 0..rows {
      out[[i, j]] = fit.std_residuals[offset + i];
    }
  }
  out
}

fn column_means(data: &Array2<f64>) -> Vec<f64> {
  let n = data.nrows() as f64;
  (0..data.ncols())
    .map(|j| data.column(j).sum() / n)
    .collect()
}

/// Pearson correlation matrix over the columns of a (time, assets) matrix.
pub fn correlation_matrix(data: &Array2<f64>) -> Array2<f64> {
  let p = data.ncols();
  let means = column_means(data);
  let mut corr = Array2::eye(p);

  for i in 0..p {
    for j in (i + 1)..p {
      let (mut cov, mut si, mut sj) = (0.0, 0.0, 0.0);
      for t in 0..data.nrows() {
        let di = data[[t, i]] - means[i];
        let dj = data[[t, j]] - means[j];
        cov += di * dj;
        si += di * di;
        sj += dj * dj;
      }
      let denom = (si * sj).sqrt();
      let r = if denom < 1e-15 {
        0.0
      } else {
        (cov / denom).clamp(-1.0, 1.0)
      };
      corr[[i, j]] = r;
      corr[[j, i]] = r;
    }
  }

  corr
}

/// Sample covariance (ddof = 1) over the columns of a (time, assets) matrix.
pub fn sample_covariance(data: &Array2<f64>) -> Array2<f64> {
  let (n, p) = (data.nrows(), data.ncols());
  let means = column_means(data);
  let mut cov = Array2::zeros((p, p));
  for i in 0..p {
    for j in i..p {
      let mut acc = 0.0;
      for t in 0..n {
        acc += (data[[t, i]] - means[i]) * (data[[t, j]] - means[j]);
      }
      let c = acc / (n - 1) as f64;
      cov[[i, j]] = c;
      cov[[j, i]] = c;
    }
  }
  cov
}

/// Negative joint log-likelihood of the residual rows under a zero-mean
/// multivariate Student-t with fixed scale matrix.
struct TailNll {
  /// Precomputed Mahalanobis distances `z' \Sigma^{-1} z` per row.
  mahalanobis: Vec<f64>,
  log_det: f64,
  dim: f64,
}

impl TailNll {
  fn new(residuals: &Array2<f64>) -> Result<Self> {
    let (n, p) = (residuals.nrows(), residuals.ncols());
    if n < 2 || p == 0 {
      return Err(AnalysisError::TailFit(format!(
        "residual matrix too small: {}x{}",
        n, p
      )));
    }

    let scale = sample_covariance(residuals);
    let scale_na = DMatrix::from_fn(p, p, |i, j| scale[[i, j]]);
    let chol = Cholesky::new(scale_na).ok_or_else(|| {
      AnalysisError::TailFit("residual scale matrix is not positive definite".into())
    })?;
    let log_det = chol.l().diagonal().iter().map(|d| 2.0 * d.ln()).sum();

    let mut mahalanobis = Vec::with_capacity(n);
    for t in 0..n {
      let x = DVector::from_fn(p, |i, _| residuals[[t, i]]);
      let solved = chol.solve(&x);
      mahalanobis.push(x.dot(&solved));
    }

    Ok(Self {
      mahalanobis,
      log_det,
      dim: p as f64,
    })
  }
}

impl CostFunction for TailNll {
  type Param = f64;
  type Output = f64;

  fn cost(&self, df: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let df = *df;
    if df <= DF_MIN {
      return Ok(PENALTY);
    }

    let d = self.dim;
    let norm = ln_gamma((df + d) / 2.0)
      - ln_gamma(df / 2.0)
      - 0.5 * d * (df * std::f64::consts::PI).ln()
      - 0.5 * self.log_det;

    let mut ll = 0.0;
    for &delta in &self.mahalanobis {
      ll += norm - 0.5 * (df + d) * (delta / df).ln_1p();
    }

    if ll.is_finite() { Ok(-ll) } else { Ok(PENALTY) }
  }
}

/// Maximum-likelihood degrees of freedom over the bounded interval
/// `[DF_MIN, DF_MAX]`, golden-section search seeded at 5.
pub fn estimate_tail_df(residuals: &Array2<f64>) -> Result<f64> {
  let cost = TailNll::new(residuals)?;

  let solver = GoldenSectionSearch::new(DF_MIN, DF_MAX)
    .map_err(|e| AnalysisError::TailFit(e.to_string()))?
    .with_tolerance(1e-5)
    .map_err(|e| AnalysisError::TailFit(e.to_string()))?;

  let res = Executor::new(cost, solver)
    .configure(|state| state.param(DF_SEED).max_iters(200))
    .run()
    .map_err(|e| AnalysisError::TailFit(e.to_string()))?;

  let df = res
    .state
    .best_param
    .ok_or_else(|| AnalysisError::TailFit("search returned no parameter".into()))?;
  if !res.state.best_cost.is_finite() || res.state.best_cost >= PENALTY {
    return Err(AnalysisError::TailFit(
      "likelihood non-finite over the search interval".into(),
    ));
  }

  let df = df.clamp(DF_MIN + 1e-6, DF_MAX - 1e-6);
  debug!(df, "estimated joint tail parameter");
  Ok(df)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use rand_distr::Distribution;
  use rand_distr::StandardNormal;
  use rand_distr::StudentT;

  use super::*;

  fn t_residuals(n: usize, p: usize, df: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = StudentT::new(df).unwrap();
    Array2::from_shape_fn((n, p), |_| dist.sample(&mut rng))
  }

  #[test]
  fn correlation_matrix_is_symmetric_with_unit_diagonal() {
    let mut rng = StdRng::seed_from_u64(1);
    let data = Array2::from_shape_fn((200, 3), |_| StandardNormal.sample(&mut rng));
    let corr = correlation_matrix(&data);

    for i in 0..3 {
      assert_relative_eq!(corr[[i, i]], 1.0, epsilon = 1e-12);
      for j in 0..3 {
        assert_relative_eq!(corr[[i, j]], corr[[j, i]], epsilon = 1e-12);
        assert!(corr[[i, j]].abs() <= 1.0);
      }
    }
  }

  #[test]
  fn correlated_columns_show_high_correlation() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut data = Array2::zeros((500, 2));
    for t in 0..500 {
      let z: f64 = StandardNormal.sample(&mut rng);
      let e: f64 = StandardNormal.sample(&mut rng);
      data[[t, 0]] = z;
      data[[t, 1]] = 0.9 * z + 0.1 * e;
    }
    let corr = correlation_matrix(&data);
    assert!(corr[[0, 1]] > 0.9);
  }

  #[test]
  fn df_estimate_stays_inside_open_interval() {
    let residuals = t_residuals(1500, 3, 6.0, 42);
    let df = estimate_tail_df(&residuals).unwrap();
    assert!(df > DF_MIN && df < DF_MAX, "df = {}", df);
  }

  #[test]
  fn heavy_tails_yield_lower_df_than_gaussian_data() {
    let heavy = t_residuals(2000, 2, 3.0, 5);
    let df_heavy = estimate_tail_df(&heavy).unwrap();

    let mut rng = StdRng::seed_from_u64(6);
    let gaussian = Array2::from_shape_fn((2000, 2), |_| StandardNormal.sample(&mut rng));
    let df_gauss = estimate_tail_df(&gaussian).unwrap();

    assert!(df_heavy < df_gauss, "{} vs {}", df_heavy, df_gauss);
  }

  #[test]
  fn df_at_or_below_lower_bound_is_penalized() {
    let residuals = t_residuals(200, 2, 5.0, 9);
    let cost = TailNll::new(&residuals).unwrap();
    assert_eq!(cost.cost(&2.0).unwrap(), PENALTY);
    assert!(cost.cost(&5.0).unwrap() < PENALTY);
  }

  #[test]
  fn degenerate_scale_matrix_is_rejected() {
    // two identical columns -> singular covariance
    let mut rng = StdRng::seed_from_u64(12);
    let mut data = Array2::zeros((100, 2));
    for t in 0..100 {
      let z: f64 = StandardNormal.sample(&mut rng);
      data[[t, 0]] = z;
      data[[t, 1]] = z;
    }
    assert!(estimate_tail_df(&data).is_err());
  }
}
