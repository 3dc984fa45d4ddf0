//! # Errors
//!
//! $$
//! \text{ModelFitFailure}\Rightarrow\text{abort},\quad
//! \text{OptimizationFailure}\Rightarrow\text{skip subset}
//! $$
//!
//! Error taxonomy for the analysis pipeline. Fitting failures (GARCH or
//! tail df) abort the run before any artifact is written; a per-subset
//! optimization failure is not an error at all — it is the `Infeasible`
//! variant of [`crate::optimize::OptimizeOutcome`] and the subset is
//! silently dropped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
  /// GARCH maximum-likelihood estimation did not converge for one asset.
  #[error("volatility model fit failed for {symbol}: {reason}")]
  ModelFit { symbol: String, reason: String },

  /// Joint Student-t degrees-of-freedom estimation did not converge.
  #[error("tail parameter estimation failed: {0}")]
  TailFit(String),

  /// Input return panel is malformed or empty.
  #[error("data error: {0}")]
  Data(String),

  /// Numerical breakdown outside the model-fit path, e.g. a correlation
  /// matrix with no Cholesky factor.
  #[error("numerical error: {0}")]
  Numeric(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
