use serde_json::Value;

use super::metric::{check_metric, SymbolRule, FILTER_PERIOD_METRICS};
use super::{check_id_and_description, warn_unknown_fields, NodeLabel, ValidationContext, ValidationReport};
use crate::spec::normalize_universe;
use crate::spec::value::{as_number, parse_enum, positive_int};
use crate::spec::{Allocation, SelectMode};

const KNOWN_FIELDS: &[&str] = &["universe", "select", "selection", "metric", "allocation", "size", "weights"];

/// Validate a filter node.
///
/// The metric is evaluated once per universe member, so it may not name a
/// symbol of its own.
pub fn validate_filter_node(node: &Value, ctx: &ValidationContext) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("filter node must be a dict");
        return report;
    };
    let label = NodeLabel::new("filter", obj);

    if obj.get("type").and_then(Value::as_str) != Some("filter") {
        report.error(label.msg("node.type must be 'filter'"));
    }
    check_id_and_description("filter", obj, &label, false, &mut report);

    let universe = match obj.get("universe") {
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => normalize_universe(obj.get("universe")),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            report.error(label.msg("filter.universe must be an array of strings"));
            Vec::new()
        }
    };
    if ctx.options.require_universe_nonempty && universe.is_empty() {
        report.error(label.msg("filter.universe must contain at least one symbol"));
    }
    let invalid: Vec<&str> = universe
        .iter()
        .filter(|s| !ctx.symbol_allowed(s))
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        report.error(label.msg(format!(
            "filter.universe contains symbols not allowed: {}",
            invalid.join(", ")
        )));
    }

    match obj.get("select") {
        Some(v) if parse_enum::<SelectMode>(v).is_some() => {}
        _ => report.error(label.msg("filter.select must be one of: top, bottom, middle")),
    }

    match obj.get("selection") {
        Some(Value::Object(sel)) if sel.contains_key("n") => match sel.get("n").and_then(positive_int) {
            None => report.error(label.msg("filter.selection.n must be a positive integer")),
            Some(n) if !universe.is_empty() && n as usize > universe.len() => report.error(label.msg(format!(
                "filter.selection.n ({n}) cannot exceed universe size ({})",
                universe.len()
            ))),
            Some(_) => {}
        },
        _ => report.error(label.msg("filter.selection must be an object with at least 'n'")),
    }

    match obj.get("metric") {
        Some(Value::Object(metric)) => check_metric(
            metric,
            "filter.metric",
            SymbolRule::Forbidden,
            FILTER_PERIOD_METRICS,
            ctx,
            &label,
            &mut report,
        ),
        _ => report.error(label.msg("filter.metric must be an object with a 'name'")),
    }

    if let Some(v) = obj.get("allocation") {
        if parse_enum::<Allocation>(v).is_none() {
            report.error(label.msg(format!(
                "filter.allocation must be one of: {}",
                Allocation::NAMES.join(", ")
            )));
        }
    }
    if let Some(size) = obj.get("size") {
        if !as_number(size).is_some_and(|s| s >= 0.0) {
            report.error(label.msg("filter.size must be a number >= 0 when provided"));
        }
    }
    if let Some(weights) = obj.get("weights") {
        match weights.as_object() {
            Some(map) => {
                for (sym, w) in map {
                    if !as_number(w).is_some_and(|v| v >= 0.0) {
                        report.error(label.msg(format!(
                            "filter weight for {} must be a number >= 0",
                            sym.trim().to_uppercase()
                        )));
                    }
                }
            }
            None => report.error(label.msg("filter.weights must be an object/dict when provided")),
        }
    }

    warn_unknown_fields(obj, KNOWN_FIELDS, &label, &mut report);
    report
}
