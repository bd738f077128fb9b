//! Exit and expression nodes: structural checks only.

use serde_json::Value;

use super::{check_id_and_description, warn_unknown_fields, NodeLabel, ValidationReport};
use crate::spec::value::{as_number, non_empty_str, parse_enum};
use crate::spec::ExitType;

/// Validate an exit node. All fields are optional.
pub fn validate_exit_node(node: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("exit node must be a dict");
        return report;
    };
    let label = NodeLabel::new("exit", obj);

    if obj.get("type").and_then(Value::as_str) != Some("exit") {
        report.error(label.msg("node.type must be 'exit'"));
    }
    check_id_and_description("exit", obj, &label, false, &mut report);

    if let Some(v) = obj.get("exit_type") {
        if parse_enum::<ExitType>(v).is_none() {
            report.error(label.msg(format!(
                "exit.exit_type must be one of: {}",
                ExitType::NAMES.join(", ")
            )));
        }
    }
    if let Some(v) = obj.get("qty_percent") {
        if !as_number(v).is_some_and(|q| q > 0.0 && q <= 100.0) {
            report.error(label.msg("exit.qty_percent must be a number in (0, 100]"));
        }
    }
    if let Some(v) = obj.get("threshold") {
        if !as_number(v).is_some_and(|t| t >= 0.0) {
            report.error(label.msg("exit.threshold must be a number >= 0"));
        }
    }

    warn_unknown_fields(obj, &["exit_type", "qty_percent", "threshold"], &label, &mut report);
    report
}

/// Validate an expression node: only a non-empty `expression` is required.
pub fn validate_expression_node(node: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("expression node must be a dict");
        return report;
    };
    let label = NodeLabel::new("expression", obj);

    if obj.get("type").and_then(Value::as_str) != Some("expression") {
        report.error(label.msg("node.type must be 'expression'"));
    }
    check_id_and_description("expression", obj, &label, false, &mut report);

    if non_empty_str(obj.get("expression")).is_none() {
        report.error(label.msg("expression.expression must be a non-empty string"));
    }

    warn_unknown_fields(obj, &["expression"], &label, &mut report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exit_defaults_are_valid() {
        assert!(validate_exit_node(&json!({"type": "exit"})).is_valid());
    }

    #[test]
    fn exit_ranges() {
        let r = validate_exit_node(&json!({
            "type": "exit", "exit_type": "trailing", "qty_percent": 150, "threshold": -0.1
        }));
        assert_eq!(r.errors.len(), 3, "{r}");
    }

    #[test]
    fn expression_must_be_non_empty() {
        assert!(validate_expression_node(&json!({"type": "expression", "expression": "rsi_spy_14 < 30"})).is_valid());
        let r = validate_expression_node(&json!({"type": "expression", "expression": "  "}));
        assert!(!r.is_valid());
    }

    #[test]
    fn unknown_fields_warn() {
        let r = validate_exit_node(&json!({"type": "exit", "when": "now"}));
        assert!(r.is_valid());
        assert_eq!(r.warnings, vec!["For exit '<no id>', unknown field 'when' is ignored"]);
    }
}
