//! Category and threshold filtering over a dataset snapshot.
//!
//! The pass is pure: same records + same `FilterState` always yield the same
//! ordered result. Records whose metrics cannot be read are excluded and
//! counted, never treated as an error for the pass as a whole.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::StrategyRecord;

/// Label of the "no category filter" option.
pub const ALL_LABEL: &str = "All";

/// Categories offered before any data arrives.
pub const BASELINE_CATEGORIES: [&str; 10] = [
    "RSI_ONLY",
    "MACD_ONLY",
    "SMA_CROSSOVER",
    "EMA_CROSSOVER",
    "BB_BOUNCE",
    "RSI_SENTIMENT",
    "MACD_SENTIMENT",
    "SMA_SENTIMENT",
    "ML_PREDICT",
    "FF_INSPIRED_STRATEGY",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    All,
    Named(String),
}

impl Category {
    pub fn label(&self) -> &str {
        match self {
            Category::All => ALL_LABEL,
            Category::Named(s) => s.as_str(),
        }
    }

    /// Exact, case-sensitive match against a record's `Strategy_Type`.
    pub fn matches(&self, rec: &StrategyRecord) -> bool {
        match self {
            Category::All => true,
            Category::Named(want) => rec.strategy_type() == Some(want.as_str()),
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        if s == ALL_LABEL { Category::All } else { Category::Named(s.to_string()) }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKey {
    Sharpe,
    ProfitFactor,
    Sortino,
    TotalReturn,
}

impl MetricKey {
    pub const ALL: [MetricKey; 4] = [MetricKey::Sharpe, MetricKey::ProfitFactor, MetricKey::Sortino, MetricKey::TotalReturn];

    pub fn field_name(self) -> &'static str {
        match self {
            MetricKey::Sharpe => "Sharpe_Ratio",
            MetricKey::ProfitFactor => "Profit_Factor",
            MetricKey::Sortino => "Sortino_Ratio",
            MetricKey::TotalReturn => "Total_Return",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("metric {0} is missing")]
    Missing(&'static str),
    #[error("metric {0} is not numeric: {1}")]
    NotNumeric(&'static str, String),
}

/// Read one metric as f64. Numbers and numeric strings are accepted.
pub fn parse_metric(metrics: Option<&Map<String, Value>>, key: MetricKey) -> Result<f64, MetricError> {
    let name = key.field_name();
    let v = metrics.and_then(|m| m.get(name)).ok_or(MetricError::Missing(name))?;
    match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| MetricError::NotNumeric(name, n.to_string())),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| MetricError::NotNumeric(name, s.clone())),
        Value::Null => Err(MetricError::Missing(name)),
        other => Err(MetricError::NotNumeric(name, other.to_string())),
    }
}

/// The four metrics the threshold filter looks at, already parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricValues {
    pub sharpe: f64,
    pub profit_factor: f64,
    pub sortino: f64,
    /// Stored as a fraction (0.05 == 5%).
    pub total_return: f64,
}

impl MetricValues {
    pub fn parse(rec: &StrategyRecord) -> Result<Self, MetricError> {
        let m = rec.performance_metrics();
        Ok(Self {
            sharpe: parse_metric(m, MetricKey::Sharpe)?,
            profit_factor: parse_metric(m, MetricKey::ProfitFactor)?,
            sortino: parse_metric(m, MetricKey::Sortino)?,
            total_return: parse_metric(m, MetricKey::TotalReturn)?,
        })
    }

    pub fn total_return_pct(&self) -> f64 {
        self.total_return * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub category: Category,
    pub min_sharpe: f64,
    pub min_profit_factor: f64,
    pub min_sortino: f64,
    pub min_total_return_pct: f64,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: Category::All,
            min_sharpe: 0.2,
            min_profit_factor: 1.0,
            min_sortino: 0.2,
            min_total_return_pct: 1.0,
        }
    }
}

impl FilterState {
    /// First threshold the values fall short of, if any. NaN never passes.
    pub fn first_failed(&self, v: &MetricValues) -> Option<MetricKey> {
        if !(v.sharpe >= self.min_sharpe) {
            return Some(MetricKey::Sharpe);
        }
        if !(v.profit_factor >= self.min_profit_factor) {
            return Some(MetricKey::ProfitFactor);
        }
        if !(v.sortino >= self.min_sortino) {
            return Some(MetricKey::Sortino);
        }
        if !(v.total_return_pct() >= self.min_total_return_pct) {
            return Some(MetricKey::TotalReturn);
        }
        None
    }
}

/// Why a record is or is not visible.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Visible,
    WrongCategory,
    Malformed(MetricError),
    BelowThreshold(MetricKey),
}

pub fn evaluate(rec: &StrategyRecord, state: &FilterState) -> Verdict {
    if !state.category.matches(rec) {
        return Verdict::WrongCategory;
    }
    match MetricValues::parse(rec) {
        Err(e) => Verdict::Malformed(e),
        Ok(v) => match state.first_failed(&v) {
            Some(k) => Verdict::BelowThreshold(k),
            None => Verdict::Visible,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOutcome {
    /// Indexes into the filtered slice, ordered by `Strategy_Name`.
    pub visible: Vec<usize>,
    /// Category matched but metrics could not be read.
    pub excluded_malformed: usize,
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }
}

/// Run the category + threshold pass and sort survivors by name.
/// The sort is stable, so equal names keep their dataset order.
pub fn apply_filters(records: &[StrategyRecord], state: &FilterState) -> FilterOutcome {
    let mut out = FilterOutcome::default();
    for (i, rec) in records.iter().enumerate() {
        match evaluate(rec, state) {
            Verdict::Visible => out.visible.push(i),
            Verdict::Malformed(_) => out.excluded_malformed += 1,
            Verdict::WrongCategory | Verdict::BelowThreshold(_) => {}
        }
    }
    out.visible.sort_by(|a, b| records[*a].sort_name().cmp(records[*b].sort_name()));
    out
}

/// Selector options: "All", the baseline set, then observed types not yet
/// listed, sorted.
pub fn category_options(records: &[StrategyRecord]) -> Vec<String> {
    let observed: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.strategy_type())
        .filter(|t| !t.is_empty())
        .collect();
    let mut out: Vec<String> = Vec::with_capacity(1 + BASELINE_CATEGORIES.len() + observed.len());
    out.push(ALL_LABEL.to_string());
    out.extend(BASELINE_CATEGORIES.iter().map(|s| s.to_string()));
    for t in observed {
        if !out.iter().any(|s| s == t) {
            out.push(t.to_string());
        }
    }
    out
}
