use serde_json::Value;

use super::group::check_children;
use super::{check_id_and_description, warn_unknown_fields, NodeLabel, ValidationContext, ValidationReport};
use crate::spec::value::{as_number, children_of, parse_enum};
use crate::spec::AllocationMethod;

/// Validate a weight node and the shape of its children.
pub fn validate_weight_node(node: &Value, ctx: &ValidationContext) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("weight node must be a dict");
        return report;
    };
    let label = NodeLabel::new("weight", obj);

    if obj.get("type").and_then(Value::as_str) != Some("weight") {
        report.error(label.msg("node.type must be 'weight'"));
    }
    check_id_and_description("weight", obj, &label, false, &mut report);

    match obj.get("allocation_method") {
        None | Some(Value::Null) => report.error(label.msg("weight node must have an allocation_method")),
        Some(v) if parse_enum::<AllocationMethod>(v).is_none() => report.error(label.msg(format!(
            "weight.allocation_method must be one of: {}",
            AllocationMethod::NAMES.join(", ")
        ))),
        Some(_) => {}
    }

    match obj.get("weights") {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (sym, w) in map {
                let sym = sym.trim().to_uppercase();
                if !ctx.symbol_allowed(&sym) {
                    report.error(label.msg(format!("weight symbol '{sym}' is not in allowed_symbols")));
                }
                match as_number(w) {
                    None => report.error(label.msg(format!("Weight for {sym} must be a number"))),
                    Some(v) if v < 0.0 => report.error(label.msg(format!("Weight for {sym} must be >= 0"))),
                    Some(_) => {}
                }
            }
        }
        Some(_) => report.error(label.msg("weight.weights must be an object/dict when provided")),
    }

    match children_of(obj) {
        Some(children) => check_children("weight", &children, &label, &mut report),
        None => report.error(label.msg("weight.children must be an array when provided")),
    }

    warn_unknown_fields(obj, &["allocation_method", "weights", "children"], &label, &mut report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorOptions;
    use serde_json::json;

    fn ctx() -> ValidationContext {
        ValidationContext::with_options(["SPY", "BIL"], ValidatorOptions::default())
    }

    #[test]
    fn requires_allocation_method() {
        let r = validate_weight_node(&json!({"type": "weight", "weights": {"SPY": 1}}), &ctx());
        assert!(r.errors[0].ends_with("weight node must have an allocation_method"));

        let r = validate_weight_node(
            &json!({"type": "weight", "allocation_method": "risk_parity"}),
            &ctx(),
        );
        assert!(r.errors[0].contains("explicit_weights, inverse_volatility"));
    }

    #[test]
    fn explicit_weights() {
        let r = validate_weight_node(
            &json!({"type": "weight", "allocation_method": "explicit_weights", "weights": {"SPY": 0.7, "BIL": 0.3}}),
            &ctx(),
        );
        assert!(r.is_valid(), "{r}");

        let r = validate_weight_node(
            &json!({"type": "weight", "allocation_method": "explicit_weights", "weights": {"QQQ": -1}}),
            &ctx(),
        );
        assert_eq!(r.errors.len(), 2, "{r}");
    }
}
