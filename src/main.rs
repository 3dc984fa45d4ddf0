use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cryptfolio::config::AnalysisConfig;
use cryptfolio::data::ReturnPanel;
use cryptfolio::engine::run_analysis;
use cryptfolio::report::summary_table;
use cryptfolio::report::write_candidate_csv;
use cryptfolio::report::write_text_report;

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let mut args = std::env::args().skip(1);
  let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data/prep".to_string()));
  let result_dir = PathBuf::from(args.next().unwrap_or_else(|| "data/result".to_string()));

  let config = AnalysisConfig::default();

  let panel = ReturnPanel::load_dir(&data_dir, config.date_window)
    .with_context(|| format!("loading return series from {}", data_dir.display()))?;
  info!(
    assets = panel.n_assets(),
    rows = panel.dates.len(),
    "return panel loaded"
  );

  let report = run_analysis(&panel, &config).context("analysis run failed")?;
  info!(
    candidates = report.candidates.len(),
    best = report.best.len(),
    tail_df = report.tail_df,
    "analysis complete"
  );

  std::fs::create_dir_all(&result_dir)?;
  write_text_report(&report, &result_dir.join("result_analyze.txt"))?;
  write_candidate_csv(&report, &result_dir.join("portfolio_combinations.csv"))?;

  summary_table(&report).printstd();

  Ok(())
}
