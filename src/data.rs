//! # Return Data
//!
//! $$
//! r_t = \frac{P_t}{P_{t-1}} - 1
//! $$
//!
//! Loading and alignment of preprocessed daily-return series. The series
//! are produced upstream (price fetch and return computation are out of
//! scope); this module only consumes `(Date, Daily Return)` tables, applies
//! the configured date window and inner-joins all assets on common dates.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;
use tracing::debug;

use crate::error::AnalysisError;
use crate::error::Result;

/// One asset's daily return series, chronological with unique dates.
#[derive(Clone, Debug)]
pub struct ReturnSeries {
  pub symbol: String,
  pub observations: BTreeMap<NaiveDate, f64>,
}

impl ReturnSeries {
  /// Parse a `Date,Daily Return` CSV. Extra columns are ignored, rows
  /// with an unparseable date or return are dropped.
  pub fn from_csv(symbol: impl Into<String>, path: &Path) -> Result<Self> {
    let symbol = symbol.into();
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
      .next()
      .transpose()?
      .ok_or_else(|| AnalysisError::Data(format!("{}: empty file", symbol)))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let date_col = columns
      .iter()
      .position(|c| c.eq_ignore_ascii_case("date"))
      .ok_or_else(|| AnalysisError::Data(format!("{}: no Date column", symbol)))?;
    let ret_col = columns
      .iter()
      .position(|c| c.eq_ignore_ascii_case("daily return"))
      .ok_or_else(|| AnalysisError::Data(format!("{}: no Daily Return column", symbol)))?;

    let mut observations = BTreeMap::new();
    for line in lines {
      let line = line?;
      let fields: Vec<&str> = line.split(',').map(str::trim).collect();
      let (Some(&date_str), Some(&ret_str)) = (fields.get(date_col), fields.get(ret_col)) else {
        continue;
      };
      let date_str = date_str.get(..10).unwrap_or(date_str);
      let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
        continue;
      };
      let Ok(ret) = ret_str.parse::<f64>() else {
        continue;
      };
      if ret.is_finite() {
        observations.insert(date, ret);
      }
    }

    if observations.is_empty() {
      return Err(AnalysisError::Data(format!(
        "{}: no valid observations",
        symbol
      )));
    }

    Ok(Self {
      symbol,
      observations,
    })
  }

  /// Keep only observations inside the inclusive window.
  pub fn restrict(&mut self, start: NaiveDate, end: NaiveDate) {
    self.observations.retain(|date, _| *date >= start && *date <= end);
  }
}

/// All assets aligned on a common date index; rows are days, columns are
/// assets in `symbols` order.
#[derive(Clone, Debug)]
pub struct ReturnPanel {
  pub symbols: Vec<String>,
  pub dates: Vec<NaiveDate>,
  pub returns: Array2<f64>,
}

impl ReturnPanel {
  /// Inner-join the series on dates present in every asset.
  pub fn align(series: Vec<ReturnSeries>) -> Result<Self> {
    if series.is_empty() {
      return Err(AnalysisError::Data("no return series supplied".into()));
    }

    let mut common: BTreeSet<NaiveDate> = series[0].observations.keys().copied().collect();
    for s in &series[1..] {
      let keys: BTreeSet<NaiveDate> = s.observations.keys().copied().collect();
      common = common.intersection(&keys).copied().collect();
    }
    if common.len() < 2 {
      return Err(AnalysisError::Data(format!(
        "only {} common dates across {} assets",
        common.len(),
        series.len()
      )));
    }

    let dates: Vec<NaiveDate> = common.into_iter().collect();
    let symbols: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();
    let mut returns = Array2::zeros((dates.len(), series.len()));
    for (j, s) in series.iter().enumerate() {
      for (i, date) in dates.iter().enumerate() {
        returns[[i, j]] = s.observations[date];
      }
    }

    debug!(
      assets = symbols.len(),
      rows = dates.len(),
      "aligned return panel"
    );

    Ok(Self {
      symbols,
      dates,
      returns,
    })
  }

  /// Load every `*.csv` in a directory; the file stem is the symbol.
  /// Symbols are sorted so the asset (and enumeration) order is stable.
  pub fn load_dir(dir: &Path, window: Option<(NaiveDate, NaiveDate)>) -> Result<Self> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
      .collect();
    paths.sort();

    let mut series = Vec::with_capacity(paths.len());
    for path in &paths {
      let symbol = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
      let mut s = ReturnSeries::from_csv(symbol, path)?;
      if let Some((start, end)) = window {
        s.restrict(start, end);
      }
      series.push(s);
    }

    Self::align(series)
  }

  pub fn n_assets(&self) -> usize {
    self.symbols.len()
  }

  pub fn asset_returns(&self, idx: usize) -> ArrayView1<f64> {
    self.returns.index_axis(Axis(1), idx)
  }
}
