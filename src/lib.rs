//! # cryptfolio
//!
//! Risk-adjusted cryptocurrency portfolio construction. The pipeline fits
//! a GARCH(1,1) volatility model per asset, estimates the shared tail
//! heaviness of the joint shock distribution, simulates correlated
//! multi-day return paths, and searches every asset subset of the
//! configured sizes for the Sharpe-maximizing constrained weight vector.
//!
//! ## Modules
//!
//! | Module       | Description                                                       |
//! |--------------|-------------------------------------------------------------------|
//! | [`config`]   | Run-wide immutable configuration.                                 |
//! | [`data`]     | Return-series loading and panel alignment.                        |
//! | [`garch`]    | Per-asset GARCH(1,1) maximum-likelihood fitting.                  |
//! | [`tail`]     | Joint Student-t degrees-of-freedom and residual correlation.      |
//! | [`simulate`] | Correlated multi-day Monte Carlo return simulation.               |
//! | [`risk`]     | Ledoit-Wolf shrinkage covariance and empirical CVaR.              |
//! | [`optimize`] | Constrained Sharpe-maximizing weight optimization.                |
//! | [`engine`]   | Per-horizon, per-size combinatorial search orchestration.         |
//! | [`report`]   | Text report, candidate CSV and console summary.                   |
//!
//! ## Parallelism
//!
//! Simulation paths and per-combination optimizations run on `rayon`;
//! both collect results in canonical order, so output is deterministic
//! for a fixed seed regardless of thread scheduling.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod garch;
pub mod optimize;
pub mod report;
pub mod risk;
pub mod simulate;
pub mod tail;

pub use config::AnalysisConfig;
pub use config::Horizon;
pub use data::ReturnPanel;
pub use data::ReturnSeries;
pub use engine::run_analysis;
pub use engine::AnalysisReport;
pub use engine::BestPortfolio;
pub use engine::PortfolioCandidate;
pub use error::AnalysisError;
pub use garch::fit_garch;
pub use garch::GarchFit;
pub use optimize::optimize_weights;
pub use optimize::OptimizeOutcome;
pub use report::summary_table;
pub use report::write_candidate_csv;
pub use report::write_text_report;
pub use risk::cvar;
pub use risk::ledoit_wolf;
pub use risk::RiskEstimate;
pub use simulate::simulate_cumulative_returns;
pub use tail::correlation_matrix;
pub use tail::estimate_tail_df;
