//! Permissive conversion from raw JSON into the typed logic tree.
//!
//! Nothing here fails: missing fields take their defaults, malformed values are
//! dropped, and unrecognized node types become `LogicNode::Unknown`. Rejecting
//! bad input is the validator's job.

use serde_json::{Map, Value};

use crate::spec::types::*;
use crate::spec::value::{as_number, children_of, parse_enum_loose, positive_int};

impl LogicNode {
    pub fn from_value(value: &Value) -> LogicNode {
        let Some(node) = value.as_object() else {
            return LogicNode::Invalid;
        };
        let node_type = match node.get("type") {
            Some(Value::String(s)) => s.trim().to_lowercase(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let Some(kind) = NodeKind::parse(&node_type) else {
            return LogicNode::Unknown { node_type };
        };

        let id = string_field(node, "id");
        let description = string_field(node, "description");

        match kind {
            NodeKind::Group => LogicNode::Group(GroupNode {
                id,
                description,
                children: parse_children(node),
            }),
            NodeKind::Condition => LogicNode::Condition(ConditionNode {
                id,
                description,
                comparison: parse_comparison(node),
                children: parse_children(node),
            }),
            NodeKind::Order => LogicNode::Order(OrderNode {
                id,
                description,
                side: match node.get("side").and_then(parse_enum_loose) {
                    Some(Side::Short) => Side::Short,
                    _ => Side::Long,
                },
                size_type: defaulted_enum(node, "size_type", SizeType::PercentEquity),
                size: number_field(node, "size").unwrap_or(100.0),
                allocation: defaulted_enum(node, "allocation", Allocation::Equal),
                weights: parse_weights(node.get("weights")),
                symbol_filter: node
                    .get("symbol_filter")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty()),
            }),
            NodeKind::Filter => LogicNode::Filter(FilterNode {
                id,
                description,
                universe: normalize_universe(node.get("universe")),
                select: node
                    .get("select")
                    .and_then(parse_enum_loose)
                    .unwrap_or(match node.get("select") {
                        None => SelectMode::Top,
                        Some(_) => SelectMode::Middle,
                    }),
                n: node
                    .get("selection")
                    .and_then(|s| s.get("n"))
                    .and_then(positive_int)
                    .map(|n| n as usize)
                    .unwrap_or(1),
                metric: node.get("metric").and_then(Metric::from_value),
                allocation: defaulted_enum(node, "allocation", Allocation::Equal),
                size: number_field(node, "size").unwrap_or(100.0),
                weights: parse_weights(node.get("weights")),
            }),
            NodeKind::Exit => LogicNode::Exit(ExitNode {
                id,
                description,
                exit_type: defaulted_enum(node, "exit_type", ExitType::SignalBased),
                qty_percent: number_field(node, "qty_percent").unwrap_or(100.0),
                threshold: number_field(node, "threshold"),
            }),
            NodeKind::Expression => LogicNode::Expression(ExpressionNode {
                id,
                description,
                expression: string_field(node, "expression").unwrap_or_default(),
            }),
            NodeKind::Weight => LogicNode::Weight(WeightNode {
                id,
                description,
                allocation_method: node.get("allocation_method").and_then(parse_enum_loose),
                weights: parse_weights(node.get("weights")),
                children: parse_children(node),
            }),
        }
    }

    /// Parse a logic root, which is either one node or an array of nodes.
    pub fn from_root(value: &Value) -> Vec<LogicNode> {
        match value {
            Value::Array(items) => items.iter().map(LogicNode::from_value).collect(),
            other => vec![LogicNode::from_value(other)],
        }
    }
}

impl Metric {
    /// Any object is read as a metric reference; names are lowercased and
    /// symbols uppercased.
    pub fn from_value(value: &Value) -> Option<Metric> {
        let obj = value.as_object()?;
        Some(Metric {
            name: obj
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default(),
            symbol: obj
                .get("symbol")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty()),
            args: obj
                .get("args")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

impl Operand {
    pub fn from_value(value: Option<&Value>) -> Operand {
        match value {
            None | Some(Value::Null) => Operand::Missing,
            Some(Value::Number(n)) => Operand::Number(n.clone()),
            Some(Value::Bool(b)) => Operand::Bool(*b),
            Some(Value::String(s)) => Operand::Text(s.clone()),
            Some(v @ Value::Object(_)) => Metric::from_value(v).map_or(Operand::Unsupported, Operand::Metric),
            Some(Value::Array(_)) => Operand::Unsupported,
        }
    }
}

/// `Some` when either `lhs` or `operator` is present.
fn parse_comparison(node: &Map<String, Value>) -> Option<Comparison> {
    if !["lhs", "operator", "rhs"].iter().any(|f| node.contains_key(*f)) {
        return None;
    }
    let raw_operator = match node.get("operator") {
        None => "gt".to_string(),
        Some(Value::String(s)) => s.trim().to_lowercase(),
        Some(other) => other.to_string(),
    };
    Some(Comparison {
        lhs: Operand::from_value(node.get("lhs")),
        rhs: Operand::from_value(node.get("rhs")),
        operator: parse_enum_loose(&Value::String(raw_operator.clone())),
        raw_operator,
    })
}

fn parse_children(node: &Map<String, Value>) -> Vec<LogicNode> {
    children_of(node)
        .unwrap_or_default()
        .into_iter()
        .map(LogicNode::from_value)
        .collect()
}

/// Absent field takes the default; a present but unrecognized value is `None`.
fn defaulted_enum<T: serde::de::DeserializeOwned>(
    node: &Map<String, Value>,
    key: &str,
    default: T,
) -> Option<T> {
    match node.get(key) {
        None => Some(default),
        Some(v) => parse_enum_loose(v),
    }
}

fn string_field(node: &Map<String, Value>, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).map(str::to_string)
}

fn number_field(node: &Map<String, Value>, key: &str) -> Option<f64> {
    node.get(key).and_then(as_number)
}

/// Numeric weights keyed by uppercased symbol, in document order.
fn parse_weights(value: Option<&Value>) -> Vec<(String, f64)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(sym, w)| as_number(w).map(|w| (sym.trim().to_uppercase(), w)))
        .collect()
}

/// Uppercased, de-duplicated, order-preserving symbol list.
pub fn normalize_universe(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for sym in items.iter().filter_map(Value::as_str) {
        let sym = sym.trim().to_uppercase();
        if !sym.is_empty() && !out.contains(&sym) {
            out.push(sym);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_and_invalid_nodes() {
        assert_eq!(
            LogicNode::from_value(&json!({"type": "portfolio"})),
            LogicNode::Unknown { node_type: "portfolio".to_string() }
        );
        assert_eq!(LogicNode::from_value(&json!(42)), LogicNode::Invalid);
    }

    #[test]
    fn order_defaults() {
        let node = LogicNode::from_value(&json!({"type": "order", "weights": {"spy": 1}}));
        let LogicNode::Order(order) = node else { panic!("expected order") };
        assert_eq!(order.side, Side::Long);
        assert_eq!(order.size_type, Some(SizeType::PercentEquity));
        assert_eq!(order.allocation, Some(Allocation::Equal));
        assert_eq!(order.size, 100.0);
        assert_eq!(order.weights, vec![("SPY".to_string(), 1.0)]);
    }

    #[test]
    fn single_child_object_is_normalized() {
        let node = LogicNode::from_value(&json!({
            "type": "group",
            "children": {"type": "exit"}
        }));
        let LogicNode::Group(group) = node else { panic!("expected group") };
        assert_eq!(group.children.len(), 1);
        assert_eq!(group.children[0].kind(), Some(NodeKind::Exit));
    }

    #[test]
    fn comparison_detected_from_any_field() {
        let node = LogicNode::from_value(&json!({
            "type": "condition",
            "lhs": {"name": "RSI", "symbol": "spy", "args": {"period": 14}},
            "rhs": 30
        }));
        let LogicNode::Condition(cond) = node else { panic!("expected condition") };
        let cmp = cond.comparison.unwrap();
        assert_eq!(cmp.operator, Some(ComparisonOp::Gt));
        let Operand::Metric(m) = cmp.lhs else { panic!("expected metric") };
        assert_eq!(m.name, "rsi");
        assert_eq!(m.symbol.as_deref(), Some("SPY"));
    }

    #[test]
    fn filter_universe_dedup_and_select_fallback() {
        let node = LogicNode::from_value(&json!({
            "type": "filter",
            "universe": ["spy", "SPY", "tqqq"],
            "select": "median",
            "selection": {"n": 2}
        }));
        let LogicNode::Filter(filter) = node else { panic!("expected filter") };
        assert_eq!(filter.universe, vec!["SPY", "TQQQ"]);
        assert_eq!(filter.select, SelectMode::Middle);
        assert_eq!(filter.n, 2);
    }
}
