//! Text helpers for rendering strategy records.

#![forbid(unsafe_code)]

use serde_json::Value;

use crate::StrategyRecord;

pub const MISSING: &str = "N/A";

/// `Sharpe_Ratio` -> `Sharpe Ratio`, `max_DRAWDOWN` -> `Max Drawdown`.
pub fn humanize_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_alpha = false;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Render an opaque field value. Strings are shown bare, absent/null as N/A.
pub fn format_value(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Collapsible entry title: `"{name} - Type: {type}"`.
pub fn entry_title(rec: &StrategyRecord) -> String {
    format!(
        "{} - Type: {}",
        rec.name().unwrap_or(MISSING),
        rec.strategy_type().unwrap_or(MISSING)
    )
}

/// Metric lines in key order, or None when there are no metrics to list.
pub fn metric_lines(rec: &StrategyRecord) -> Option<Vec<String>> {
    let m = rec.performance_metrics()?;
    if m.is_empty() {
        return None;
    }
    Some(
        m.iter()
            .map(|(k, v)| format!("{}: {}", humanize_key(k), format_value(Some(v))))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn humanize_title_cases_words() {
        assert_eq!(humanize_key("Sharpe_Ratio"), "Sharpe Ratio");
        assert_eq!(humanize_key("max_DRAWDOWN"), "Max Drawdown");
        assert_eq!(humanize_key("win_rate_30d"), "Win Rate 30D");
    }

    #[test]
    fn format_value_handles_absent_and_scalars() {
        assert_eq!(format_value(None), "N/A");
        assert_eq!(format_value(Some(&Value::Null)), "N/A");
        assert_eq!(format_value(Some(&json!("High"))), "High");
        assert_eq!(format_value(Some(&json!(10000))), "10000");
    }
}
