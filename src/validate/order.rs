use std::collections::BTreeSet;

use serde_json::Value;

use super::{check_id_and_description, warn_unknown_fields, NodeLabel, ValidationContext, ValidationReport};
use crate::spec::value::{as_number, parse_enum};
use crate::spec::{Allocation, SizeType};

const KNOWN_FIELDS: &[&str] = &[
    "side",
    "size_type",
    "size",
    "allocation",
    "weights",
    "symbol_filter",
    "universe",
];

/// Weighted allocations are normalized at generation; sums off by more than
/// this are reported.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validate an order node.
///
/// Every referenced symbol needs an explicit weight entry, whatever the
/// allocation mode.
pub fn validate_order_node(node: &Value, ctx: &ValidationContext) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("order node must be a dict");
        return report;
    };
    let label = NodeLabel::new("order", obj);

    if obj.get("type").and_then(Value::as_str) != Some("order") {
        report.error(label.msg("node.type must be 'order'"));
        return report;
    }
    check_id_and_description("order", obj, &label, false, &mut report);

    match obj.get("side") {
        Some(Value::String(s)) if s == "long" || s == "short" => {}
        Some(Value::String(_)) => report.error(label.msg("order.side must be 'long' or 'short'")),
        _ => {
            report.error(label.msg("order.side must be a string"));
            report.error(label.msg("order.side must be 'long' or 'short'"));
        }
    }

    if let Some(v) = obj.get("size_type") {
        if parse_enum::<SizeType>(v).is_none() {
            report.error(label.msg(format!(
                "order.size_type must be one of: {}",
                SizeType::NAMES.join(", ")
            )));
        }
    }

    let allocation = match obj.get("allocation") {
        None => Some(Allocation::Equal),
        Some(Value::String(_)) => {
            let parsed = obj.get("allocation").and_then(parse_enum::<Allocation>);
            if parsed.is_none() {
                report.error(label.msg(format!(
                    "order.allocation must be one of: {}",
                    Allocation::NAMES.join(", ")
                )));
            }
            parsed
        }
        Some(_) => {
            report.error(label.msg("order.allocation must be a string"));
            None
        }
    };

    if let Some(size) = obj.get("size") {
        match as_number(size) {
            None => report.error(label.msg("order.size must be a number when provided")),
            Some(v) if v < 0.0 => report.error(label.msg("order.size must be >= 0")),
            Some(_) => {}
        }
    }

    let weights = match obj.get("weights") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            report.error(label.msg("order.weights must be an object/dict when provided"));
            None
        }
    };

    let mut symbols: BTreeSet<String> = BTreeSet::new();
    if let Some(map) = weights {
        symbols.extend(map.keys().map(|k| k.trim().to_uppercase()));
    }
    match obj.get("symbol_filter") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => {
            if !s.trim().is_empty() {
                symbols.insert(s.trim().to_uppercase());
            }
        }
        Some(_) => report.error(label.msg("order.symbol_filter must be a string when provided")),
    }
    match obj.get("universe") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => {
            symbols.extend(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty()),
            );
        }
        Some(_) => report.error(label.msg("order.universe must be an array of strings when provided")),
    }

    if symbols.is_empty() {
        report.error(label.msg(
            "No symbols found: provide at least one via weights, symbol_filter, or universe",
        ));
    }

    let invalid: Vec<&str> = symbols
        .iter()
        .filter(|s| !ctx.symbol_allowed(s))
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        report.error(label.msg(format!("Symbols not allowed: {}", invalid.join(", "))));
    }

    let weighted: BTreeSet<String> = weights
        .map(|m| m.keys().map(|k| k.trim().to_uppercase()).collect())
        .unwrap_or_default();
    let missing: Vec<&str> = symbols
        .iter()
        .filter(|s| !weighted.contains(*s))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        report.error(label.msg(format!("Missing weight(s) for: {}", missing.join(", "))));
    }

    let mut sum = 0.0;
    let mut all_numeric = true;
    if let Some(map) = weights {
        for (sym, w) in map {
            let sym = sym.trim().to_uppercase();
            match as_number(w) {
                None => {
                    all_numeric = false;
                    report.error(label.msg(format!("Weight for {sym} must be a number")));
                }
                Some(v) if v < 0.0 => {
                    all_numeric = false;
                    report.error(label.msg(format!("Weight for {sym} must be >= 0")));
                }
                Some(v) => sum += v,
            }
        }
        if allocation == Some(Allocation::Weighted)
            && all_numeric
            && !map.is_empty()
            && (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE
        {
            report.warn(label.msg(format!(
                "weights sum to {sum}, they will be normalized to the order size"
            )));
        }
    }

    warn_unknown_fields(obj, KNOWN_FIELDS, &label, &mut report);
    report
}
