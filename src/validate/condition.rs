//! Condition nodes: comparison operands, operators and else-branch placement.

use serde_json::{Map, Value};

use super::group::check_children;
use super::metric::{check_metric, SymbolRule, CONDITION_PERIOD_METRICS};
use super::{check_id_and_description, warn_unknown_fields, NodeLabel, ValidationContext, ValidationReport};
use crate::spec::value::{children_of, parse_enum};
use crate::spec::ComparisonOp;

const KNOWN_FIELDS: &[&str] = &["lhs", "operator", "rhs", "children"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandShape {
    Metric,
    Literal,
    Absent,
    Invalid,
}

fn check_operand(
    value: Option<&Value>,
    side: &str,
    ctx: &ValidationContext,
    label: &NodeLabel,
    report: &mut ValidationReport,
) -> OperandShape {
    match value {
        None => OperandShape::Absent,
        Some(Value::Object(metric)) => {
            let rule = if ctx.options.require_symbol_for_metrics {
                SymbolRule::Required
            } else {
                SymbolRule::Optional
            };
            check_metric(
                metric,
                &format!("condition.{side}"),
                rule,
                CONDITION_PERIOD_METRICS,
                ctx,
                label,
                report,
            );
            OperandShape::Metric
        }
        Some(Value::Number(_)) => OperandShape::Literal,
        Some(_) => {
            report.error(label.msg(format!(
                "condition.{side} operand must be a metric object or a numeric literal"
            )));
            OperandShape::Invalid
        }
    }
}

fn is_else_group(child: &Value, else_label: &str) -> bool {
    let Some(obj) = child.as_object() else {
        return false;
    };
    obj.get("type").and_then(Value::as_str) == Some("group")
        && obj
            .get("description")
            .and_then(Value::as_str)
            .is_some_and(|d| d.trim().to_lowercase() == else_label)
}

/// At most one else group, placed last when configured, with children when
/// configured.
fn check_else_branch(children: &[&Value], ctx: &ValidationContext, label: &NodeLabel, report: &mut ValidationReport) {
    let opts = &ctx.options;
    let else_label = opts.else_label_normalized();
    let shown = opts.else_label.trim();
    let else_idx: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, c)| is_else_group(c, &else_label))
        .map(|(i, _)| i)
        .collect();

    if else_idx.len() > 1 {
        report.error(label.msg(format!("multiple {shown} groups; only one is allowed")));
    }
    let Some(&idx) = else_idx.first() else {
        if opts.else_required {
            report.error(label.msg(format!(
                "condition requires an {shown} group but none was found"
            )));
        }
        return;
    };

    if opts.else_must_be_last && idx + 1 != children.len() {
        report.error(label.msg(format!(
            "{shown} must be the last direct child of the condition"
        )));
    }
    if let Some(else_obj) = children[idx].as_object() {
        match children_of(else_obj) {
            None => report.error(label.msg(format!("{shown} 'children' must be an array"))),
            Some(items) if items.is_empty() && opts.else_require_children => {
                report.error(label.msg(format!("{shown} must contain at least one child")))
            }
            Some(_) => {}
        }
    }
    if children.len() == else_idx.len() {
        report.error(label.msg(
            "Condition must have at least one non-Else child as the THEN branch",
        ));
    }
}

/// `lhs` and `operator` come together. Crossings need two metrics, every other
/// operator at least one.
fn check_comparison(obj: &Map<String, Value>, ctx: &ValidationContext, label: &NodeLabel, report: &mut ValidationReport) {
    let has_lhs = obj.contains_key("lhs");
    let has_op = obj.contains_key("operator");
    if has_lhs != has_op {
        report.error(label.msg("condition.lhs and condition.operator must be provided together"));
    }

    let operator = match obj.get("operator") {
        None => None,
        Some(v @ Value::String(_)) => {
            let op = parse_enum::<ComparisonOp>(v);
            if op.is_none() {
                report.error(label.msg(format!(
                    "condition.operator must be one of [{}]",
                    ComparisonOp::NAMES.join(", ")
                )));
            }
            op
        }
        Some(_) => {
            report.error(label.msg("condition.operator must be a string"));
            None
        }
    };

    let lhs = check_operand(obj.get("lhs"), "lhs", ctx, label, report);
    let rhs = check_operand(obj.get("rhs"), "rhs", ctx, label, report);

    let Some(op) = operator else {
        return;
    };
    let op_name = obj.get("operator").and_then(Value::as_str).unwrap_or_default();
    if op.is_crossing() {
        if lhs != OperandShape::Metric || rhs != OperandShape::Metric {
            report.error(label.msg(format!(
                "condition.operator '{op_name}' requires both lhs and rhs to be metrics (no literals)"
            )));
        }
    } else if lhs != OperandShape::Metric && rhs != OperandShape::Metric
        && (lhs == OperandShape::Literal || rhs == OperandShape::Literal)
    {
        report.error(label.msg(format!(
            "condition.operator '{op_name}' requires at least one operand to be a metric"
        )));
    }
}

/// Validate a condition node and the else branch among its direct children.
pub fn validate_condition_node(node: &Value, ctx: &ValidationContext) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("condition node must be a dict");
        return report;
    };
    let label = NodeLabel::new("condition", obj);

    if obj.get("type").and_then(Value::as_str) != Some("condition") {
        report.error(label.msg("node.type must be 'condition'"));
    }
    check_id_and_description("condition", obj, &label, false, &mut report);

    let is_comparison = ["lhs", "operator", "rhs"].iter().any(|f| obj.contains_key(*f));
    if is_comparison {
        check_comparison(obj, ctx, &label, &mut report);
    }

    match children_of(obj) {
        None => report.error(label.msg("condition.children must be an array when provided")),
        Some(children) => {
            if !is_comparison && children.is_empty() {
                report.error(label.msg(
                    "condition must define a comparison (lhs, operator) or contain children",
                ));
            }
            check_children("condition", &children, &label, &mut report);
            if ctx.options.validate_else && !children.is_empty() {
                check_else_branch(&children, ctx, &label, &mut report);
            }
        }
    }

    warn_unknown_fields(obj, KNOWN_FIELDS, &label, &mut report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorOptions;
    use serde_json::json;

    fn ctx() -> ValidationContext {
        ValidationContext::with_options(["SPY", "TQQQ"], ValidatorOptions::default())
    }

    fn then_group() -> Value {
        json!({"type": "group", "description": "Then", "children": [{"type": "exit"}]})
    }

    fn else_group() -> Value {
        json!({"type": "group", "description": "Else branch", "children": [{"type": "exit"}]})
    }

    #[test]
    fn metric_vs_literal() {
        let r = validate_condition_node(
            &json!({
                "type": "condition",
                "lhs": {"name": "rsi", "symbol": "SPY", "args": {"period": 14}},
                "operator": "lt",
                "rhs": 30
            }),
            &ctx(),
        );
        assert!(r.is_valid(), "{r}");
    }

    #[test]
    fn crossing_rejects_literals() {
        let r = validate_condition_node(
            &json!({
                "type": "condition",
                "operator": "crosses_above",
                "lhs": {"name": "current-price", "symbol": "SPY"},
                "rhs": 100.0
            }),
            &ctx(),
        );
        assert!(!r.is_valid());
        assert!(r.errors[0].contains("requires both lhs and rhs to be metrics"));
    }

    #[test]
    fn two_literals_rejected() {
        let r = validate_condition_node(
            &json!({"type": "condition", "lhs": 1, "operator": "gt", "rhs": 2}),
            &ctx(),
        );
        assert!(r.errors.iter().any(|e| e.contains("at least one operand to be a metric")));
    }

    #[test]
    fn lhs_without_operator() {
        let r = validate_condition_node(
            &json!({"type": "condition", "lhs": {"name": "month"}, "children": [{"type": "exit"}]}),
            &ctx(),
        );
        assert!(r.errors.iter().any(|e| e.contains("must be provided together")));
    }

    #[test]
    fn unknown_operator_and_metric_problems() {
        let r = validate_condition_node(
            &json!({
                "type": "condition",
                "lhs": {"name": "rsi", "symbol": "QQQ"},
                "operator": "above",
                "rhs": {"name": "macd", "symbol": "SPY"}
            }),
            &ctx(),
        );
        let all = r.errors.join("\n");
        assert!(all.contains("condition.operator must be one of"));
        assert!(all.contains("symbol 'QQQ' is not in allowed_symbols"));
        assert!(all.contains("'rsi' requires args.period as positive int"));
        assert!(all.contains("'macd' is not in allowed_metrics"));
    }

    #[test]
    fn symbol_required_except_time_metrics() {
        let r = validate_condition_node(
            &json!({"type": "condition", "lhs": {"name": "current-price"}, "operator": "gt", "rhs": 1}),
            &ctx(),
        );
        assert!(r.errors.iter().any(|e| e.contains("symbol is required")));

        let r = validate_condition_node(
            &json!({"type": "condition", "lhs": {"name": "month"}, "operator": "eq", "rhs": 1}),
            &ctx(),
        );
        assert!(r.is_valid(), "{r}");
    }

    #[test]
    fn else_must_be_last() {
        let base = json!({"name": "current-price", "symbol": "SPY"});
        let ok = json!({
            "type": "condition", "lhs": base, "operator": "gt", "rhs": 1,
            "children": [then_group(), else_group()]
        });
        assert!(validate_condition_node(&ok, &ctx()).is_valid());

        let reversed = json!({
            "type": "condition", "lhs": base, "operator": "gt", "rhs": 1,
            "children": [else_group(), then_group()]
        });
        let r = validate_condition_node(&reversed, &ctx());
        assert!(r.errors.iter().any(|e| e.contains("Else branch must be the last direct child")));
    }

    #[test]
    fn multiple_and_required_else() {
        let r = validate_condition_node(
            &json!({"type": "condition", "children": [then_group(), else_group(), else_group()]}),
            &ctx(),
        );
        assert!(r.errors.iter().any(|e| e.contains("multiple Else branch groups")));

        let strict = ValidationContext::with_options(
            ["SPY"],
            ValidatorOptions {
                else_required: true,
                ..ValidatorOptions::default()
            },
        );
        let r = validate_condition_node(&json!({"type": "condition", "children": [then_group()]}), &strict);
        assert!(r.errors.iter().any(|e| e.contains("requires an Else branch group")));
    }

    #[test]
    fn else_only_has_no_then_branch() {
        let r = validate_condition_node(&json!({"type": "condition", "children": [else_group()]}), &ctx());
        assert!(r.errors.iter().any(|e| e.contains("at least one non-Else child")));
    }

    #[test]
    fn empty_else_rejected() {
        let r = validate_condition_node(
            &json!({"type": "condition", "children": [
                then_group(),
                {"type": "group", "description": "ELSE BRANCH", "children": []}
            ]}),
            &ctx(),
        );
        assert!(r.errors.iter().any(|e| e.contains("Else branch must contain at least one child")));
    }

    #[test]
    fn custom_else_label() {
        let c = ValidationContext::with_options(
            ["SPY"],
            ValidatorOptions {
                else_label: "Otherwise".to_string(),
                ..ValidatorOptions::default()
            },
        );
        let r = validate_condition_node(
            &json!({"type": "condition", "children": [
                {"type": "group", "description": "otherwise", "children": [{"type": "exit"}]},
                then_group()
            ]}),
            &c,
        );
        assert!(r.errors.iter().any(|e| e.contains("Otherwise must be the last direct child")));
    }
}
