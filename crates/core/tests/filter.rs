use quantboard_core::filter::{apply_filters, category_options, evaluate, Category, FilterState, MetricError, MetricKey, Verdict, BASELINE_CATEGORIES};
use quantboard_core::StrategyRecord;
use serde_json::{json, Value};

fn rec(id: &str, v: Value) -> StrategyRecord {
    StrategyRecord { id: id.to_string(), fields: v.as_object().cloned().unwrap_or_default() }
}

fn strat(id: &str, name: &str, ty: &str, sharpe: f64, pf: f64, sortino: f64, ret: f64) -> StrategyRecord {
    rec(id, json!({
        "Strategy_Name": name,
        "Strategy_Type": ty,
        "Performance_Metrics": {
            "Sharpe_Ratio": sharpe,
            "Profit_Factor": pf,
            "Sortino_Ratio": sortino,
            "Total_Return": ret,
        }
    }))
}

fn names(records: &[StrategyRecord], ix: &[usize]) -> Vec<String> {
    ix.iter().map(|i| records[*i].sort_name().to_string()).collect()
}

#[test]
fn defaults_keep_only_records_clearing_every_threshold() {
    let data = vec![
        strat("1", "B", "RSI_ONLY", 0.5, 1.2, 0.3, 0.05),
        strat("2", "A", "RSI_ONLY", 0.1, 1.2, 0.3, 0.05),
    ];
    let out = apply_filters(&data, &FilterState::default());
    assert_eq!(names(&data, &out.visible), vec!["B"]);
    assert_eq!(out.excluded_malformed, 0);
    assert_eq!(evaluate(&data[1], &FilterState::default()), Verdict::BelowThreshold(MetricKey::Sharpe));
}

#[test]
fn unknown_category_yields_empty_outcome() {
    let data = vec![strat("1", "B", "RSI_ONLY", 0.5, 1.2, 0.3, 0.05)];
    let state = FilterState { category: Category::from("MACD_ONLY"), ..FilterState::default() };
    let out = apply_filters(&data, &state);
    assert!(out.is_empty());
    assert_eq!(out.excluded_malformed, 0);
}

#[test]
fn empty_metrics_are_excluded_without_error() {
    let data = vec![
        rec("1", json!({ "Strategy_Name": "Empty", "Strategy_Type": "RSI_ONLY", "Performance_Metrics": {} })),
        rec("2", json!({ "Strategy_Name": "NoMap", "Strategy_Type": "RSI_ONLY" })),
        rec("3", json!({ "Strategy_Name": "Junk", "Strategy_Type": "RSI_ONLY", "Performance_Metrics": {
            "Sharpe_Ratio": "high", "Profit_Factor": 2, "Sortino_Ratio": 1, "Total_Return": 0.5
        } })),
        strat("4", "Good", "RSI_ONLY", 1.0, 2.0, 1.0, 0.5),
    ];
    // Thresholds at the floor: still nothing malformed gets through.
    let state = FilterState {
        min_sharpe: f64::MIN,
        min_profit_factor: f64::MIN,
        min_sortino: f64::MIN,
        min_total_return_pct: f64::MIN,
        ..FilterState::default()
    };
    let out = apply_filters(&data, &state);
    assert_eq!(names(&data, &out.visible), vec!["Good"]);
    assert_eq!(out.excluded_malformed, 3);
    assert_eq!(
        evaluate(&data[2], &state),
        Verdict::Malformed(MetricError::NotNumeric("Sharpe_Ratio", "high".into()))
    );
    assert_eq!(evaluate(&data[0], &state), Verdict::Malformed(MetricError::Missing("Sharpe_Ratio")));
}

#[test]
fn numeric_strings_parse_and_total_return_is_percent() {
    let data = vec![rec("1", json!({
        "Strategy_Name": "S", "Strategy_Type": "BB_BOUNCE",
        "Performance_Metrics": { "Sharpe_Ratio": " 0.3 ", "Profit_Factor": "1.0", "Sortino_Ratio": 0.2, "Total_Return": "0.01" }
    }))];
    let out = apply_filters(&data, &FilterState::default());
    assert_eq!(out.visible, vec![0]);

    let stricter = FilterState { min_total_return_pct: 1.5, ..FilterState::default() };
    assert_eq!(evaluate(&data[0], &stricter), Verdict::BelowThreshold(MetricKey::TotalReturn));
}

#[test]
fn visibility_matches_category_and_thresholds_exactly() {
    let types = ["RSI_ONLY", "MACD_ONLY", "ML_PREDICT"];
    let mut data = Vec::new();
    let mut n = 0;
    for ty in types {
        for sharpe in [0.0, 0.2, 0.4] {
            for ret in [0.0, 0.01, 0.02] {
                n += 1;
                data.push(strat(&n.to_string(), &format!("s{:02}", 40 - n), ty, sharpe, 1.1, 0.25, ret));
            }
        }
    }
    data.push(rec("bad", json!({ "Strategy_Name": "bad", "Strategy_Type": "RSI_ONLY", "Performance_Metrics": { "Sharpe_Ratio": null } })));

    for cat in [Category::All, Category::from("RSI_ONLY"), Category::from("ML_PREDICT")] {
        for min_sharpe in [0.0, 0.2, 0.3] {
            let state = FilterState { category: cat.clone(), min_sharpe, ..FilterState::default() };
            let out = apply_filters(&data, &state);
            for (i, r) in data.iter().enumerate() {
                let m = r.performance_metrics();
                let cat_ok = matches!(cat, Category::All) || r.strategy_type() == Some(cat.label());
                let expected = cat_ok
                    && m.and_then(|m| m.get("Sharpe_Ratio")).and_then(|v| v.as_f64()).map(|v| v >= min_sharpe).unwrap_or(false)
                    && m.and_then(|m| m.get("Total_Return")).and_then(|v| v.as_f64()).map(|v| v * 100.0 >= 1.0).unwrap_or(false);
                assert_eq!(out.visible.contains(&i), expected, "record {} under {:?}", r.id, state);
            }
        }
    }
}

#[test]
fn filter_pass_is_idempotent() {
    let data = vec![
        strat("1", "Zeta", "RSI_ONLY", 0.5, 1.2, 0.3, 0.05),
        strat("2", "Alpha", "MACD_ONLY", 0.9, 1.5, 0.6, 0.10),
        strat("3", "Mid", "RSI_ONLY", 0.7, 1.3, 0.4, 0.02),
    ];
    let state = FilterState::default();
    let first = apply_filters(&data, &state);
    let second = apply_filters(&data, &state);
    assert_eq!(first, second);
    assert_eq!(names(&data, &first.visible), vec!["Alpha", "Mid", "Zeta"]);
}

#[test]
fn equal_names_keep_dataset_order() {
    let data = vec![
        strat("first", "Same", "RSI_ONLY", 0.5, 1.2, 0.3, 0.05),
        strat("x", "Other", "RSI_ONLY", 0.5, 1.2, 0.3, 0.05),
        strat("second", "Same", "RSI_ONLY", 0.5, 1.2, 0.3, 0.05),
        rec("unnamed", json!({ "Strategy_Type": "RSI_ONLY", "Performance_Metrics": {
            "Sharpe_Ratio": 1, "Profit_Factor": 2, "Sortino_Ratio": 1, "Total_Return": 0.5
        } })),
    ];
    let out = apply_filters(&data, &FilterState::default());
    let ids: Vec<&str> = out.visible.iter().map(|i| data[*i].id.as_str()).collect();
    assert_eq!(ids, vec!["unnamed", "x", "first", "second"]);
}

#[test]
fn category_options_merge_baseline_with_observed() {
    let empty = category_options(&[]);
    assert_eq!(empty[0], "All");
    assert_eq!(empty.len(), 1 + BASELINE_CATEGORIES.len());

    let data = vec![
        strat("1", "a", "ZZ_NEW", 0.0, 0.0, 0.0, 0.0),
        strat("2", "b", "RSI_ONLY", 0.0, 0.0, 0.0, 0.0),
        strat("3", "c", "AA_NEW", 0.0, 0.0, 0.0, 0.0),
        strat("4", "d", "ZZ_NEW", 0.0, 0.0, 0.0, 0.0),
        rec("5", json!({ "Strategy_Type": "" })),
    ];
    let opts = category_options(&data);
    assert_eq!(&opts[1..=BASELINE_CATEGORIES.len()], &BASELINE_CATEGORIES.map(String::from)[..]);
    assert_eq!(&opts[BASELINE_CATEGORIES.len() + 1..], &["AA_NEW".to_string(), "ZZ_NEW".to_string()]);
}

#[test]
fn category_match_is_case_sensitive() {
    let data = vec![strat("1", "B", "rsi_only", 0.5, 1.2, 0.3, 0.05)];
    let state = FilterState { category: Category::from("RSI_ONLY"), ..FilterState::default() };
    assert!(apply_filters(&data, &state).is_empty());
}
