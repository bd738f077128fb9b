use serde_json::Value;

use super::{check_id_and_description, warn_unknown_fields, NodeLabel, ValidationReport};
use crate::config::ValidatorOptions;
use crate::spec::value::children_of;
use crate::spec::NodeKind;

/// Node types a container may hold, sorted for messages.
pub(crate) fn allowed_child_types() -> String {
    let names: Vec<String> = NodeKind::ALL.iter().map(|k| format!("'{}'", k.as_str())).collect();
    format!("[{}]", names.join(", "))
}

/// Check each child is an object with a known `type`.
pub(crate) fn check_children(
    kind: &str,
    children: &[&Value],
    label: &NodeLabel,
    report: &mut ValidationReport,
) {
    for (idx, child) in children.iter().enumerate() {
        let Some(obj) = child.as_object() else {
            report.error(label.msg(format!("{kind}.child[{idx}] must be an object")));
            continue;
        };
        match obj.get("type") {
            Some(Value::String(t)) if NodeKind::parse(t).is_some() => {}
            Some(Value::String(t)) => report.error(label.msg(format!(
                "{kind}.child[{idx}].type '{t}' is not allowed here (allowed: {})",
                allowed_child_types()
            ))),
            _ => report.error(label.msg(format!("{kind}.child[{idx}].type must be a string"))),
        }
    }
}

/// Validate a group node and the shape of its direct children. Children are
/// validated recursively by [`super::validate_node`].
pub fn validate_group_node(node: &Value, options: &ValidatorOptions) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("group node must be a dict");
        return report;
    };
    let label = NodeLabel::new("group", obj);

    if obj.get("type").and_then(Value::as_str) != Some("group") {
        report.error(label.msg("node.type must be 'group'"));
    }
    check_id_and_description("group", obj, &label, options.require_description, &mut report);

    let Some(children) = children_of(obj) else {
        report.error(label.msg("group.children must be an array when provided"));
        return report;
    };
    if options.require_children && children.is_empty() {
        report.error(label.msg("group must contain at least one child"));
    }
    check_children("group", &children, &label, &mut report);

    warn_unknown_fields(obj, &["children"], &label, &mut report);
    report
}
