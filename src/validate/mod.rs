//! Strict validation of specification documents.
//!
//! Validators work on raw JSON so shape errors can be reported precisely.
//! They never fail: every problem becomes a message in a [`ValidationReport`],
//! and traversal keeps going to collect as much as possible in one pass.

pub mod condition;
pub mod filter;
pub mod group;
pub mod meta;
pub mod metric;
pub mod misc;
pub mod order;
pub mod settings;
pub mod universe;
pub mod weight;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ValidatorOptions;
use crate::spec::value::children_of;
use crate::spec::NodeKind;

pub use condition::validate_condition_node;
pub use filter::validate_filter_node;
pub use group::validate_group_node;
pub use meta::validate_meta;
pub use misc::{validate_exit_node, validate_expression_node};
pub use order::validate_order_node;
pub use settings::validate_settings;
pub use universe::{allowed_symbols, validate_universe};
pub use weight::validate_weight_node;

/// Errors and warnings accumulated by a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valid when no errors were recorded; warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Append another report's errors and warnings.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return write!(f, "OK");
        }
        let mut first = true;
        for (label, items) in [("Error", &self.errors), ("Warning", &self.warnings)] {
            for item in items {
                if !first {
                    writeln!(f)?;
                }
                write!(f, "{label}: {item}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// What a logic tree may reference, plus validator switches.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub allowed_symbols: BTreeSet<String>,
    pub allowed_metrics: BTreeSet<String>,
    pub options: ValidatorOptions,
}

impl ValidationContext {
    pub fn new<S, M>(allowed_symbols: S, allowed_metrics: M, options: ValidatorOptions) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        Self {
            allowed_symbols: allowed_symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .collect(),
            allowed_metrics: allowed_metrics
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .collect(),
            options,
        }
    }

    /// Context using the option's own metric vocabulary.
    pub fn with_options<S>(allowed_symbols: S, options: ValidatorOptions) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let metrics = options.allowed_metrics.clone();
        Self::new(allowed_symbols, metrics, options)
    }

    /// Case-insensitive membership in the allowed symbols.
    pub fn symbol_allowed(&self, symbol: &str) -> bool {
        self.allowed_symbols.contains(&symbol.trim().to_uppercase())
    }

    pub fn metric_allowed(&self, name: &str) -> bool {
        self.allowed_metrics.contains(&name.trim().to_lowercase())
    }
}

/// Message prefix naming the node being validated.
pub(crate) struct NodeLabel {
    prefix: String,
}

impl NodeLabel {
    pub(crate) fn new(kind: &str, node: &Map<String, Value>) -> Self {
        let id = match node.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "<no id>".to_string(),
            Some(other) => other.to_string(),
        };
        Self {
            prefix: format!("For {kind} '{id}', "),
        }
    }

    pub(crate) fn msg(&self, text: impl AsRef<str>) -> String {
        format!("{}{}", self.prefix, text.as_ref())
    }
}

/// Shared `id`/`description` type checks.
pub(crate) fn check_id_and_description(
    kind: &str,
    node: &Map<String, Value>,
    label: &NodeLabel,
    require_description: bool,
    report: &mut ValidationReport,
) {
    if !matches!(node.get("id"), None | Some(Value::Null) | Some(Value::String(_))) {
        report.error(label.msg(format!("{kind}.id must be a string when provided")));
    }
    let desc = node.get("description");
    if require_description {
        if crate::spec::value::non_empty_str(desc).is_none() {
            report.error(label.msg(format!(
                "{kind}.description is required and must be a non-empty string"
            )));
        }
    } else if !matches!(desc, None | Some(Value::Null) | Some(Value::String(_))) {
        report.error(label.msg(format!("{kind}.description must be a string when provided")));
    }
}

/// Warn about fields a node kind does not understand.
pub(crate) fn warn_unknown_fields(
    node: &Map<String, Value>,
    known: &[&str],
    label: &NodeLabel,
    report: &mut ValidationReport,
) {
    for key in node.keys() {
        if key != "type" && key != "id" && key != "description" && !known.contains(&key.as_str()) {
            report.warn(label.msg(format!("unknown field '{key}' is ignored")));
        }
    }
}

/// Validate one node by its `type`, without descending into children.
pub fn validate_node(node: &Value, ctx: &ValidationContext) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = node.as_object() else {
        report.error("logic node must be an object");
        return report;
    };
    let kind = match obj.get("type") {
        Some(Value::String(t)) => NodeKind::parse(t),
        _ => None,
    };
    match kind {
        Some(NodeKind::Order) => validate_order_node(node, ctx),
        Some(NodeKind::Group) => validate_group_node(node, &ctx.options),
        Some(NodeKind::Condition) => validate_condition_node(node, ctx),
        Some(NodeKind::Filter) => validate_filter_node(node, ctx),
        Some(NodeKind::Weight) => validate_weight_node(node, ctx),
        Some(NodeKind::Exit) => validate_exit_node(node),
        Some(NodeKind::Expression) => validate_expression_node(node),
        None => {
            let shown = match obj.get("type") {
                Some(Value::String(t)) => t.clone(),
                Some(other) => other.to_string(),
                None => "<missing>".to_string(),
            };
            report.error(format!("Unknown node type: {shown}"));
            report
        }
    }
}

/// Validate a whole logic tree. The root may be one node or an array; groups,
/// conditions and weights are descended into.
pub fn validate_logic(logic: &Value, ctx: &ValidationContext) -> ValidationReport {
    let mut report = ValidationReport::new();
    match logic {
        Value::Array(nodes) => {
            if nodes.is_empty() {
                report.error("logic must contain at least one node");
            }
            for node in nodes {
                walk(node, ctx, &mut report);
            }
        }
        Value::Null => report.error("logic is required"),
        node => walk(node, ctx, &mut report),
    }
    report
}

/// Validate `node`, then recurse into the children of containers and conditions.
fn walk(node: &Value, ctx: &ValidationContext, report: &mut ValidationReport) {
    report.merge(validate_node(node, ctx));
    let Some(obj) = node.as_object() else {
        return;
    };
    let descends = matches!(
        obj.get("type").and_then(Value::as_str).and_then(NodeKind::parse),
        Some(NodeKind::Group | NodeKind::Condition | NodeKind::Weight)
    );
    if !descends {
        return;
    }
    for child in children_of(obj).unwrap_or_default() {
        if child.is_object() {
            walk(child, ctx, report);
        }
    }
}
