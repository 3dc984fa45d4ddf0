//! # Report Artifacts
//!
//! Text report of the best portfolio per `(subset size, horizon)`, a CSV
//! table of every successfully optimized candidate, and a console summary
//! table. Weight vectors are rounded to 4 decimals in all artifacts.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use prettytable::row;
use prettytable::Table;

use crate::engine::AnalysisReport;
use crate::error::Result;

fn round4(x: f64) -> f64 {
  (x * 1e4).round() / 1e4
}

fn weights_string(weights: &[f64]) -> String {
  let rounded: Vec<String> = weights.iter().map(|w| format!("{}", round4(*w))).collect();
  format!("[{}]", rounded.join(", "))
}

/// Write the structured text report, mirroring the layout consumed by the
/// downstream reporting collaborator.
pub fn write_text_report(report: &AnalysisReport, path: &Path) -> Result<()> {
  let mut out = BufWriter::new(File::create(path)?);

  writeln!(out, "Crypto Portfolio Analysis Results")?;
  writeln!(out, "{}", "=".repeat(50))?;

  for best in &report.best {
    let c = &best.candidate;
    writeln!(out)?;
    writeln!(
      out,
      "Best Portfolio for {} assets ({}):",
      best.size, best.horizon_label
    )?;
    writeln!(out, "Assets: {}", c.assets.join(", "))?;
    writeln!(out, "Weights: {}", weights_string(&c.weights))?;
    writeln!(out, "Sharpe Ratio: {:.4}", c.sharpe)?;
    writeln!(out, "CVaR: {:.4}", c.cvar)?;
    writeln!(out, "{}", "-".repeat(50))?;
  }

  out.flush()?;
  Ok(())
}

/// Write one CSV row per successfully optimized candidate.
pub fn write_candidate_csv(report: &AnalysisReport, path: &Path) -> Result<()> {
  let mut out = BufWriter::new(File::create(path)?);

  writeln!(out, "num_assets,period,assets,weights,sharpe_ratio,cvar")?;
  for c in &report.candidates {
    writeln!(
      out,
      "{},{},\"{}\",\"{}\",{:.6},{:.6}",
      c.size,
      c.horizon_label,
      c.assets.join(", "),
      weights_string(&c.weights),
      c.sharpe,
      c.cvar,
    )?;
  }

  out.flush()?;
  Ok(())
}

/// Console summary of the per-cell winners.
pub fn summary_table(report: &AnalysisReport) -> Table {
  let mut table = Table::new();
  table.add_row(row!["Horizon", "Size", "Assets", "Weights", "Sharpe", "CVaR"]);

  for best in &report.best {
    let c = &best.candidate;
    table.add_row(row![
      best.horizon_label,
      best.size,
      c.assets.join(", "),
      weights_string(&c.weights),
      format!("{:.4}", c.sharpe),
      format!("{:.4}", c.cvar),
    ]);
  }

  table
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::BestPortfolio;
  use crate::engine::PortfolioCandidate;

  fn sample_report() -> AnalysisReport {
    let candidate = PortfolioCandidate {
      horizon_label: "1_week".to_string(),
      horizon_days: 7,
      size: 2,
      assets: vec!["BTC".to_string(), "ETH".to_string()],
      weights: vec![0.69999, 0.30001],
      sharpe: 1.23456,
      cvar: 0.04567,
    };
    AnalysisReport {
      candidates: vec![candidate.clone()],
      best: vec![BestPortfolio {
        horizon_label: "1_week".to_string(),
        size: 2,
        candidate,
      }],
      tail_df: 5.4,
    }
  }

  #[test]
  fn text_report_lists_best_portfolios() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result_analyze.txt");
    write_text_report(&sample_report(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Crypto Portfolio Analysis Results"));
    assert!(text.contains("Best Portfolio for 2 assets (1_week):"));
    assert!(text.contains("Assets: BTC, ETH"));
    assert!(text.contains("Sharpe Ratio: 1.2346"));
  }

  #[test]
  fn csv_has_header_plus_one_row_per_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portfolio_combinations.csv");
    write_candidate_csv(&sample_report(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("num_assets,period"));
    assert!(lines[1].contains("\"BTC, ETH\""));
  }

  #[test]
  fn weights_are_rounded_to_four_decimals() {
    assert_eq!(weights_string(&[0.69999, 0.30001]), "[0.7, 0.3]");
    assert_eq!(weights_string(&[0.12341, 0.87659]), "[0.1234, 0.8766]");
  }

  #[test]
  fn summary_table_has_one_row_per_best() {
    let table = summary_table(&sample_report());
    assert_eq!(table.len(), 2);
  }
}
