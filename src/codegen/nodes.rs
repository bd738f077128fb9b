//! Per-node code emission.
//!
//! Generation is permissive: anything the validator would reject degrades to
//! an inert comment here instead of failing.

use super::context::GenContext;
use super::emit::{py_float, py_number, py_str, Block};
use super::expression::process_expression;
use crate::spec::*;

/// Group descriptions that carry no information worth a comment.
const BOILERPLATE_GROUP_DESCRIPTIONS: [&str; 6] = [
    "else branch",
    "group logic",
    "group: wt-cash-equal",
    "conditional logic",
    "group:",
    "alternative branch",
];

const READY_CHECK: &str = "self._is_security_ready_for_trading";

/// Generate one node at `depth`.
pub fn generate_node(node: &LogicNode, depth: usize, ctx: &mut GenContext) -> Block {
    match node {
        LogicNode::Condition(n) => condition(n, depth, ctx),
        LogicNode::Filter(n) => filter(n, depth, ctx),
        LogicNode::Order(n) => order(n, depth, ctx),
        LogicNode::Exit(n) => exit(n, depth),
        LogicNode::Expression(n) => expression(n, depth),
        LogicNode::Weight(n) => weight(n, depth, ctx),
        LogicNode::Group(n) => group(n, depth, ctx),
        LogicNode::Unknown { node_type } => {
            let mut out = Block::new();
            out.comment(depth, format!("Unknown node type: {node_type}"));
            out
        }
        LogicNode::Invalid => {
            let mut out = Block::new();
            out.comment(depth, "Invalid node structure");
            out
        }
    }
}

/// Generate sibling nodes, separated by blank lines.
pub fn generate_nodes(nodes: &[LogicNode], depth: usize, ctx: &mut GenContext) -> Block {
    let blocks: Vec<Block> = nodes.iter().map(|n| generate_node(n, depth, ctx)).collect();
    Block::join(blocks)
}

/// Python for one comparison operand. Metric operands register their indicator.
fn operand_code(operand: &Operand, ctx: &mut GenContext) -> String {
    match operand {
        Operand::Number(n) => py_number(n),
        Operand::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        Operand::Text(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Operand::Metric(metric) => {
            if let Some(sym) = &metric.symbol {
                ctx.reference_symbol(sym);
            }
            ctx.registry.value_expression(metric)
        }
        Operand::Missing | Operand::Unsupported => "0".to_string(),
    }
}

fn condition(node: &ConditionNode, depth: usize, ctx: &mut GenContext) -> Block {
    ctx.condition_counter += 1;
    let id = ctx.condition_counter;
    let mut out = Block::new();

    if let Some(cmp) = &node.comparison {
        out.comment(depth, node.description.as_deref().unwrap_or("Condition comparison"));
        let lhs = operand_code(&cmp.lhs, ctx);
        let rhs = operand_code(&cmp.rhs, ctx);
        let expr = match cmp.operator {
            Some(op) if op.is_crossing() => {
                let key = ctx.track_crossing(id, lhs, rhs);
                ctx.need_helper(op.code());
                format!("self.{}({})", op.code(), py_str(&key))
            }
            Some(op) => format!("{lhs} {} {rhs}", op.code()),
            None => {
                out.comment(depth, format!("Unknown operator '{}', defaulting to >", cmp.raw_operator));
                format!("{lhs} > {rhs}")
            }
        };

        let else_pos = node.children.iter().position(|c| c.is_else_group(&ctx.else_label));
        let then_children: Vec<LogicNode> = node
            .children
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != else_pos)
            .map(|(_, c)| c.clone())
            .collect();

        let body = if then_children.is_empty() {
            let mut b = Block::new();
            b.comment(depth + 1, "No action defined for true condition");
            b
        } else {
            generate_nodes(&then_children, depth + 1, ctx)
        };
        out.suite(depth, format!("if {expr}:"), body);

        if let Some(else_node) = else_pos.and_then(|i| node.children.get(i)) {
            let else_body = generate_node(else_node, depth + 1, ctx);
            out.suite(depth, "else:", else_body);
        }
        return out;
    }

    if node.children.is_empty() {
        out.comment(depth, "Invalid condition node - no comparison fields or children");
        return out;
    }

    if let Some(desc) = node.description.as_deref() {
        let lower = desc.to_lowercase();
        if !(lower.contains("conditional logic") && lower.contains("container")) {
            out.comment(depth, desc);
        }
    }

    let label = ctx.else_label.clone();
    match node.children.as_slice() {
        [only] => {
            out.append(generate_node(only, depth, ctx));
        }
        [LogicNode::Condition(first), else_group, rest @ ..]
            if first.comparison.is_some()
                && else_group.is_else_group(&label)
                && !first.children.iter().any(|c| c.is_else_group(&label)) =>
        {
            // The else group becomes the else suite of the leading comparison.
            let mut paired = first.clone();
            paired.children.push(else_group.clone());
            let mut blocks = vec![condition(&paired, depth, ctx)];
            blocks.extend(rest.iter().map(|c| container_child(c, depth, ctx)));
            out.append(Block::join(blocks));
        }
        children => {
            let blocks: Vec<Block> = children.iter().map(|c| container_child(c, depth, ctx)).collect();
            out.append(Block::join(blocks));
        }
    }
    out
}

/// A child of a container condition emitted in sequence. An else group with
/// no comparison to attach to runs unconditionally.
fn container_child(child: &LogicNode, depth: usize, ctx: &mut GenContext) -> Block {
    let mut out = Block::new();
    if child.is_else_group(&ctx.else_label) {
        out.comment(depth, "Else branch without a preceding comparison; runs unconditionally");
    }
    out.append(generate_node(child, depth, ctx));
    out
}

/// Score every universe member, pick `n` of them, then allocate.
///
/// Counter-suffixed variable names keep several filters in one `OnData` apart.
fn filter(node: &FilterNode, depth: usize, ctx: &mut GenContext) -> Block {
    ctx.filter_counter += 1;
    let k = ctx.filter_counter;
    let scores = format!("symbol_scores_{k}");
    let selected = format!("selected_symbols_{k}");
    let mut out = Block::new();

    out.comment(depth, node.description.as_deref().unwrap_or("Filter selection"));
    out.line(depth, format!("{scores} = {{}}"));
    ctx.create_variable(&scores);

    for sym in &node.universe {
        ctx.reference_symbol(sym);
    }
    match &node.metric {
        Some(metric) => {
            for sym in &node.universe {
                let value = ctx.registry.value_expression(&metric.for_symbol(sym));
                let quoted = py_str(sym);
                let mut body = Block::new();
                body.line(depth + 1, format!("{scores}[{quoted}] = {value}"));
                out.suite(depth, format!("if {quoted} in self.Securities:"), body);
            }
        }
        None => {
            out.comment(depth, "Filter has no metric; no symbols scored");
        }
    }

    let n = node.n;
    match node.select {
        SelectMode::Top => {
            out.line(
                depth,
                format!("{selected} = sorted({scores}.items(), key=lambda x: x[1], reverse=True)[:{n}]"),
            );
        }
        SelectMode::Bottom => {
            out.line(
                depth,
                format!("{selected} = sorted({scores}.items(), key=lambda x: x[1])[:{n}]"),
            );
        }
        SelectMode::Middle => {
            let ranked = format!("sorted_symbols_{k}");
            let start = format!("mid_start_{k}");
            out.line(depth, format!("{ranked} = sorted({scores}.items(), key=lambda x: x[1])"));
            out.line(depth, format!("{start} = max(0, len({ranked}) // 2 - {n} // 2)"));
            out.line(depth, format!("{selected} = {ranked}[{start}:{start} + {n}]"));
            ctx.create_variable(&ranked);
            ctx.create_variable(&start);
        }
    }
    ctx.create_variable(&selected);

    let total = node.size / 100.0;
    match node.allocation {
        Some(Allocation::Equal) => {
            let mut ready = Block::new();
            ready.line(depth + 3, "self.SetHoldings(symbol, weight_per_symbol)");
            let mut each = Block::new();
            each.suite(depth + 2, format!("if {READY_CHECK}(symbol):"), ready);
            let mut body = Block::new();
            body.line(depth + 1, format!("weight_per_symbol = {} / len({selected})", py_float(total)));
            body.suite(depth + 1, format!("for symbol, score in {selected}:"), each);
            out.suite(depth, format!("if {selected}:"), body);
            ctx.create_variable("weight_per_symbol");
        }
        Some(Allocation::Weighted) => {
            let sum: f64 = node.weights.iter().map(|(_, w)| *w).sum();
            if node.weights.is_empty() || sum <= 0.0 {
                out.comment(depth, "Weighted allocation requires positive weights; no orders placed");
                return out;
            }
            let weights_var = format!("filter_weights_{k}");
            let entries: Vec<String> = node
                .weights
                .iter()
                .map(|(sym, w)| format!("{}: {}", py_str(sym), py_float(w / sum * total)))
                .collect();
            out.line(depth, format!("{weights_var} = {{{}}}", entries.join(", ")));
            ctx.create_variable(&weights_var);

            let mut ready = Block::new();
            ready.line(depth + 2, "self.SetHoldings(symbol, weight)");
            let mut each = Block::new();
            each.line(depth + 1, format!("weight = {weights_var}.get(symbol, 0)"));
            each.suite(depth + 1, format!("if weight > 0 and {READY_CHECK}(symbol):"), ready);
            out.suite(depth, format!("for symbol, score in {selected}:"), each);
        }
        Some(Allocation::Custom) => {
            out.comment(depth, "Custom allocation is not supported for filters; no orders placed");
        }
        None => {
            out.comment(depth, "Unsupported filter allocation; no orders placed");
        }
    }
    out
}

/// Targets come from `symbol_filter`, then `weights`, then the universe.
fn order(node: &OrderNode, depth: usize, ctx: &mut GenContext) -> Block {
    ctx.order_counter += 1;
    let mut out = Block::new();
    out.comment(depth, node.description.as_deref().unwrap_or("Order execution"));

    let targets: Vec<String> = if let Some(sym) = &node.symbol_filter {
        vec![sym.clone()]
    } else if !node.weights.is_empty() {
        node.weights.iter().map(|(s, _)| s.clone()).collect()
    } else {
        ctx.universe_symbols.clone()
    };
    if targets.is_empty() {
        out.comment(depth, "No target symbols for order");
        return out;
    }
    for sym in &targets {
        ctx.reference_symbol(sym);
    }
    let sign = match node.side {
        Side::Long => "",
        Side::Short => "-",
    };

    match node.size_type {
        Some(SizeType::PercentEquity) => percent_equity_order(node, &targets, sign, depth, ctx, &mut out),
        Some(SizeType::FixedQty) => {
            out.line(depth, format!("target_quantity = {}", node.size.trunc() as i64));
            ctx.create_variable("target_quantity");
            for sym in &targets {
                let mut body = Block::new();
                body.line(depth + 1, format!("self.MarketOrder({}, {sign}target_quantity)", py_str(sym)));
                out.suite(depth, format!("if {READY_CHECK}({}):", py_str(sym)), body);
            }
        }
        Some(SizeType::FixedValue) => {
            out.line(depth, format!("target_value = {}", py_float(node.size)));
            ctx.create_variable("target_value");
            for sym in &targets {
                let quoted = py_str(sym);
                let mut place = Block::new();
                place.line(
                    depth + 2,
                    format!("self.MarketOrder({quoted}, {sign}int(target_value / current_price))"),
                );
                let mut body = Block::new();
                body.line(depth + 1, format!("current_price = self.Securities[{quoted}].Price"));
                body.suite(depth + 1, "if current_price > 0:", place);
                out.suite(depth, format!("if {READY_CHECK}({quoted}):"), body);
            }
            ctx.create_variable("current_price");
        }
        Some(SizeType::RiskBased) => {
            out.comment(depth, "risk_based sizing is not generated; order skipped");
        }
        None => {
            out.comment(depth, "Unsupported size type; order skipped");
        }
    }
    out
}

fn percent_equity_order(
    node: &OrderNode,
    targets: &[String],
    sign: &str,
    depth: usize,
    ctx: &mut GenContext,
    out: &mut Block,
) {
    let total = node.size / 100.0;
    let target_weights: Vec<(&str, f64)> = node
        .weights
        .iter()
        .filter(|(s, _)| targets.contains(s))
        .map(|(s, w)| (s.as_str(), *w))
        .collect();

    let holdings: Vec<(&str, String)> = match node.allocation {
        Some(Allocation::Equal) => {
            out.line(depth, format!("target_weight = {}", py_float(total / targets.len() as f64)));
            ctx.create_variable("target_weight");
            targets.iter().map(|s| (s.as_str(), format!("{sign}target_weight"))).collect()
        }
        Some(Allocation::Weighted) => {
            let sum: f64 = target_weights.iter().map(|(_, w)| w).sum();
            if sum <= 0.0 {
                out.comment(depth, "Weighted allocation requires positive weights; order skipped");
                return;
            }
            target_weights
                .iter()
                .map(|(s, w)| (*s, format!("{sign}{}", py_float(w / sum * total))))
                .collect()
        }
        Some(Allocation::Custom) => target_weights
            .iter()
            .map(|(s, w)| (*s, format!("{sign}{}", py_float(w * total))))
            .collect(),
        None => {
            out.comment(depth, "Unsupported allocation; order skipped");
            return;
        }
    };

    for (sym, weight) in holdings {
        let quoted = py_str(sym);
        let mut body = Block::new();
        body.line(depth + 1, format!("self.SetHoldings({quoted}, {weight})"));
        out.suite(depth, format!("if {READY_CHECK}({quoted}):"), body);
    }
}

fn exit(node: &ExitNode, depth: usize) -> Block {
    let mut out = Block::new();
    out.comment(depth, node.description.as_deref().unwrap_or("Exit positions"));

    let (threshold, op) = match node.exit_type {
        Some(ExitType::SignalBased) => {
            if node.qty_percent >= 100.0 {
                out.line(depth, "self.Liquidate()");
                return out;
            }
            let factor = node.qty_percent / 100.0;
            let mut place = Block::new();
            place.line(depth + 3, "self.MarketOrder(symbol, -exit_quantity)");
            let mut invested = Block::new();
            invested.line(
                depth + 2,
                format!("exit_quantity = int(holding.Quantity * {})", py_float(factor)),
            );
            invested.suite(depth + 2, "if exit_quantity != 0:", place);
            let mut each = Block::new();
            each.line(depth + 1, "holding = self.Portfolio[symbol]");
            each.suite(depth + 1, "if holding.Invested:", invested);
            out.suite(depth, "for symbol in list(self.Portfolio.Keys):", each);
            return out;
        }
        Some(ExitType::StopLoss) => (node.threshold.unwrap_or(0.05), "<"),
        Some(ExitType::TakeProfit) => (node.threshold.unwrap_or(0.10), ">"),
        None => {
            out.comment(depth, "Unsupported exit type; no positions closed");
            return out;
        }
    };

    let bound = if op == "<" {
        format!("-{}", py_float(threshold))
    } else {
        py_float(threshold)
    };
    let mut liquidate = Block::new();
    liquidate.line(depth + 2, "self.Liquidate(symbol)");
    let mut each = Block::new();
    each.line(depth + 1, "holding = self.Portfolio[symbol]");
    each.suite(
        depth + 1,
        format!("if holding.Invested and holding.UnrealizedProfitPercent {op} {bound}:"),
        liquidate,
    );
    out.suite(depth, "for symbol in list(self.Portfolio.Keys):", each);
    out
}

fn expression(node: &ExpressionNode, depth: usize) -> Block {
    let mut out = Block::new();
    if node.expression.trim().is_empty() {
        out.comment(depth, "Empty expression");
        return out;
    }
    out.comment(depth, node.description.as_deref().unwrap_or("Expression evaluation"));
    let mut body = Block::new();
    body.comment(depth + 1, "Expression condition is true");
    body.line(depth + 1, "pass");
    out.suite(depth, format!("if {}:", process_expression(node.expression.trim())), body);
    out
}

fn weight(node: &WeightNode, depth: usize, ctx: &mut GenContext) -> Block {
    let mut out = Block::new();
    out.comment(depth, node.description.as_deref().unwrap_or("Portfolio weighting"));
    if node.weights.is_empty() && node.allocation_method == Some(AllocationMethod::InverseVolatility) {
        out.comment(depth, "Inverse-volatility weights are not generated");
    }
    for (sym, w) in &node.weights {
        ctx.reference_symbol(sym);
        let quoted = py_str(sym);
        let mut body = Block::new();
        body.line(depth + 1, format!("self.SetHoldings({quoted}, {})", py_float(*w)));
        out.suite(depth, format!("if {quoted} in self.Securities:"), body);
    }
    if !node.children.is_empty() {
        out.blank();
        out.append(generate_nodes(&node.children, depth, ctx));
    }
    out
}

fn is_boilerplate(description: &str, else_label: &str) -> bool {
    let lower = description.trim().to_lowercase();
    BOILERPLATE_GROUP_DESCRIPTIONS.contains(&lower.as_str())
        || lower == else_label
        || lower.starts_with("group:")
        || lower.starts_with("conditional logic")
}

/// Optional comment, then the children in order.
fn group(node: &GroupNode, depth: usize, ctx: &mut GenContext) -> Block {
    let mut out = Block::new();
    if let Some(desc) = node.description.as_deref() {
        if !desc.trim().is_empty() && !is_boilerplate(desc, &ctx.else_label) {
            out.comment(depth, desc.trim());
        }
    }
    out.append(generate_nodes(&node.children, depth, ctx));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gen(value: serde_json::Value) -> String {
        let mut ctx = GenContext::new(&["SPY".to_string(), "TQQQ".to_string()], "Else branch");
        generate_node(&LogicNode::from_value(&value), 0, &mut ctx).render()
    }

    #[test]
    fn unknown_and_invalid_nodes_are_inert() {
        assert_eq!(gen(json!({"type": "loop"})), "        # Unknown node type: loop");
        assert_eq!(gen(json!(null)), "        # Invalid node structure");
    }

    #[test]
    fn boilerplate_group_descriptions_suppressed() {
        assert!(is_boilerplate("Group: wt-cash-equal", "else branch"));
        assert!(is_boilerplate("Conditional logic for X", "else branch"));
        assert!(!is_boilerplate("Risk-on allocation", "else branch"));
    }

    #[test]
    fn liquidate_all() {
        assert_eq!(
            gen(json!({"type": "exit"})),
            "        # Exit positions\n        self.Liquidate()"
        );
    }

    #[test]
    fn stop_loss_threshold() {
        let code = gen(json!({"type": "exit", "exit_type": "stop_loss"}));
        assert!(code.contains("holding.UnrealizedProfitPercent < -0.05:"));
        let code = gen(json!({"type": "exit", "exit_type": "take_profit", "threshold": 0.2}));
        assert!(code.contains("holding.UnrealizedProfitPercent > 0.2:"));
    }

    #[test]
    fn short_equal_order() {
        let code = gen(json!({"type": "order", "side": "short", "size": 50, "weights": {"SPY": 1, "TQQQ": 1}}));
        assert!(code.contains("target_weight = 0.25"));
        assert!(code.contains("self.SetHoldings('TQQQ', -target_weight)"));
    }

    #[test]
    fn order_falls_back_to_universe() {
        let code = gen(json!({"type": "order", "side": "long"}));
        assert!(code.contains("self.SetHoldings('SPY', target_weight)"));
        assert!(code.contains("self.SetHoldings('TQQQ', target_weight)"));
    }

    #[test]
    fn weighted_order_normalizes() {
        let code = gen(json!({
            "type": "order", "side": "long", "allocation": "weighted",
            "weights": {"SPY": 3, "TQQQ": 1}
        }));
        assert!(code.contains("self.SetHoldings('SPY', 0.75)"));
        assert!(code.contains("self.SetHoldings('TQQQ', 0.25)"));
    }

    #[test]
    fn fixed_value_order_guards_price() {
        let code = gen(json!({"type": "order", "side": "long", "size_type": "fixed_value", "size": 5000, "symbol_filter": "spy"}));
        assert!(code.contains("target_value = 5000.0"));
        assert!(code.contains("if current_price > 0:"));
        assert!(code.contains("self.MarketOrder('SPY', int(target_value / current_price))"));
    }

    #[test]
    fn risk_based_is_inert() {
        let code = gen(json!({"type": "order", "side": "long", "size_type": "risk_based", "weights": {"SPY": 1}}));
        assert!(!code.contains("SetHoldings"));
    }
}
