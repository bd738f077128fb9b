use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A whole strategy specification document. Sections stay as raw JSON so the
/// validators can report shape errors instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyDocument {
    pub meta: Value,
    pub settings: Value,
    pub universe: Value,
    pub logic: Value,
}

/// One entry of the `universe` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseAsset {
    pub symbol: String,
    #[serde(rename = "assetClass", default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Node kinds a logic tree may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Group,
    Condition,
    Filter,
    Order,
    Exit,
    Expression,
    Weight,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Condition,
        NodeKind::Exit,
        NodeKind::Expression,
        NodeKind::Filter,
        NodeKind::Group,
        NodeKind::Order,
        NodeKind::Weight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Condition => "condition",
            NodeKind::Filter => "filter",
            NodeKind::Order => "order",
            NodeKind::Exit => "exit",
            NodeKind::Expression => "expression",
            NodeKind::Weight => "weight",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        NodeKind::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Comparison operators accepted by condition nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
    CrossesAbove,
    CrossesBelow,
}

impl ComparisonOp {
    pub const NAMES: [&'static str; 8] = [
        "crosses_above",
        "crosses_below",
        "eq",
        "gt",
        "gte",
        "lt",
        "lte",
        "neq",
    ];

    pub fn is_crossing(&self) -> bool {
        matches!(self, ComparisonOp::CrossesAbove | ComparisonOp::CrossesBelow)
    }

    /// Inline operator for plain comparisons, helper method name for crossings.
    pub fn code(&self) -> &'static str {
        match self {
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Eq => "==",
            ComparisonOp::Neq => "!=",
            ComparisonOp::CrossesAbove => "_crosses_above",
            ComparisonOp::CrossesBelow => "_crosses_below",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

/// How `OrderNode::size` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeType {
    PercentEquity,
    FixedQty,
    FixedValue,
    RiskBased,
}

impl SizeType {
    pub const NAMES: [&'static str; 4] = ["percent_equity", "fixed_qty", "fixed_value", "risk_based"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    Equal,
    Weighted,
    Custom,
}

impl Allocation {
    pub const NAMES: [&'static str; 3] = ["equal", "weighted", "custom"];
}

/// Which end of the ranking a filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    Top,
    Bottom,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitType {
    SignalBased,
    StopLoss,
    TakeProfit,
}

impl ExitType {
    pub const NAMES: [&'static str; 3] = ["signal_based", "stop_loss", "take_profit"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    ExplicitWeights,
    InverseVolatility,
}

impl AllocationMethod {
    pub const NAMES: [&'static str; 2] = ["explicit_weights", "inverse_volatility"];
}

/// Reference to a named metric, optionally bound to a symbol.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl Metric {
    pub fn new(name: &str, symbol: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.map(str::to_string),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    /// Same metric bound to another symbol.
    pub fn for_symbol(&self, symbol: &str) -> Self {
        Self {
            name: self.name.clone(),
            symbol: Some(symbol.to_string()),
            args: self.args.clone(),
        }
    }
}

/// Comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(Number),
    Bool(bool),
    Text(String),
    Metric(Metric),
    Missing,
    Unsupported,
}

/// `lhs operator rhs` of a comparison condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub lhs: Operand,
    pub rhs: Operand,
    /// `None` when the operator is not recognized; `raw_operator` keeps the text.
    pub operator: Option<ComparisonOp>,
    pub raw_operator: String,
}

/// Plain container; children run in order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub id: Option<String>,
    pub description: Option<String>,
    pub children: Vec<LogicNode>,
}

/// Either a comparison guarding its children or, without a comparison, a plain
/// container.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionNode {
    pub id: Option<String>,
    pub description: Option<String>,
    pub comparison: Option<Comparison>,
    pub children: Vec<LogicNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderNode {
    pub id: Option<String>,
    pub description: Option<String>,
    pub side: Side,
    pub size_type: Option<SizeType>,
    /// Percent of equity, share count or dollar value depending on `size_type`.
    pub size: f64,
    pub allocation: Option<Allocation>,
    pub weights: Vec<(String, f64)>,
    /// Restricts the order to one symbol, taking precedence over `weights`.
    pub symbol_filter: Option<String>,
}

/// Rank `universe` by `metric` and allocate to the selected `n` symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub id: Option<String>,
    pub description: Option<String>,
    /// Normalized: trimmed, uppercased, de-duplicated, order kept.
    pub universe: Vec<String>,
    pub select: SelectMode,
    /// How many symbols to select.
    pub n: usize,
    pub metric: Option<Metric>,
    pub allocation: Option<Allocation>,
    pub size: f64,
    pub weights: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitNode {
    pub id: Option<String>,
    pub description: Option<String>,
    pub exit_type: Option<ExitType>,
    /// Share of each position to close for signal exits; 100 closes everything.
    pub qty_percent: f64,
    /// Unrealized P&L fraction for stop-loss and take-profit exits.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    pub id: Option<String>,
    pub description: Option<String>,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightNode {
    pub id: Option<String>,
    pub description: Option<String>,
    pub allocation_method: Option<AllocationMethod>,
    pub weights: Vec<(String, f64)>,
    pub children: Vec<LogicNode>,
}

/// One node of a logic tree. `Unknown` and `Invalid` carry input the
/// generator degrades to an inert comment.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicNode {
    Group(GroupNode),
    Condition(ConditionNode),
    Order(OrderNode),
    Filter(FilterNode),
    Exit(ExitNode),
    Expression(ExpressionNode),
    Weight(WeightNode),
    Unknown { node_type: String },
    Invalid,
}

impl LogicNode {
    /// `None` for unknown and invalid nodes.
    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            LogicNode::Group(_) => Some(NodeKind::Group),
            LogicNode::Condition(_) => Some(NodeKind::Condition),
            LogicNode::Order(_) => Some(NodeKind::Order),
            LogicNode::Filter(_) => Some(NodeKind::Filter),
            LogicNode::Exit(_) => Some(NodeKind::Exit),
            LogicNode::Expression(_) => Some(NodeKind::Expression),
            LogicNode::Weight(_) => Some(NodeKind::Weight),
            LogicNode::Unknown { .. } | LogicNode::Invalid => None,
        }
    }

    /// True for a group whose description matches the (normalized) else label.
    pub fn is_else_group(&self, else_label: &str) -> bool {
        match self {
            LogicNode::Group(g) => g
                .description
                .as_deref()
                .is_some_and(|d| d.trim().to_lowercase() == else_label),
            _ => false,
        }
    }
}
