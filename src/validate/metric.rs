use serde_json::{Map, Value};

use super::{NodeLabel, ValidationContext, ValidationReport};
use crate::spec::value::{non_empty_str, positive_int};

/// Calendar metrics read from the clock; they never take a symbol.
pub const TIME_METRICS: &[&str] = &["month", "day-of-week", "day-of-month", "day-of-year"];

/// Metrics a condition operand must give an explicit `args.period`.
pub const CONDITION_PERIOD_METRICS: &[&str] = &["moving-average-price", "rsi"];

/// Metrics a filter must give an explicit `args.period`.
pub const FILTER_PERIOD_METRICS: &[&str] = &[
    "sma",
    "ema",
    "rsi",
    "moving-avg-price",
    "moving-avg-return",
    "std-dev-price",
    "std-dev-return",
    "volatility",
    "returns",
    "drawdown",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SymbolRule {
    Required,
    Optional,
    Forbidden,
}

/// Checks shared by condition operands and filter metrics.
pub(crate) fn check_metric(
    metric: &Map<String, Value>,
    path: &str,
    symbol_rule: SymbolRule,
    period_metrics: &[&str],
    ctx: &ValidationContext,
    label: &NodeLabel,
    report: &mut ValidationReport,
) {
    let name = non_empty_str(metric.get("name")).map(|n| n.trim().to_lowercase());
    match &name {
        None => report.error(label.msg(format!("{path}.name must be a non-empty string"))),
        Some(n) if !ctx.metric_allowed(n) => {
            report.error(label.msg(format!("{path}.name '{n}' is not in allowed_metrics")))
        }
        Some(_) => {}
    }

    let args = match metric.get("args") {
        None | Some(Value::Null) => None,
        Some(Value::Object(a)) => Some(a),
        Some(_) => {
            report.error(label.msg(format!("{path}.args must be a dict when provided")));
            None
        }
    };

    let is_time_metric = name.as_deref().is_some_and(|n| TIME_METRICS.contains(&n));
    let symbol = metric.get("symbol");
    match symbol_rule {
        SymbolRule::Forbidden => {
            if !matches!(symbol, None | Some(Value::Null)) {
                report.error(label.msg(format!(
                    "{path}.symbol should not be provided; the metric is evaluated for each universe symbol"
                )));
            }
        }
        SymbolRule::Required | SymbolRule::Optional => match non_empty_str(symbol) {
            Some(sym) if !ctx.symbol_allowed(sym) => report.error(label.msg(format!(
                "{path} symbol '{}' is not in allowed_symbols",
                sym.trim().to_uppercase()
            ))),
            Some(_) => {}
            None if symbol_rule == SymbolRule::Required && !is_time_metric => {
                report.error(label.msg(format!(
                    "{path}.symbol is required and must be a non-empty string"
                )))
            }
            None => {}
        },
    }

    if let Some(n) = &name {
        if period_metrics.contains(&n.as_str()) {
            let period_ok = args.and_then(|a| a.get("period")).and_then(positive_int).is_some();
            if !period_ok {
                report.error(label.msg(format!("{path} '{n}' requires args.period as positive int")));
            }
        }
    }
}
