#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use spec_compiler::codegen::{generate_logic_code, LogicGenerator};

    fn universe() -> Vec<String> {
        vec!["SPY".to_string(), "TQQQ".to_string(), "BIL".to_string()]
    }

    fn body_of(main: &str) -> String {
        main.lines().skip(3).collect::<Vec<_>>().join("\n")
    }

    fn rsi_condition_with_else() -> Value {
        json!({
            "type": "condition",
            "description": "SPY oversold",
            "lhs": {"name": "rsi", "symbol": "SPY", "args": {"period": 10}},
            "operator": "lt",
            "rhs": 30,
            "children": [
                {"type": "order", "side": "long", "weights": {"TQQQ": 1}},
                {"type": "group", "description": "Else branch", "children": [
                    {"type": "order", "side": "long", "weights": {"BIL": 1}}
                ]}
            ]
        })
    }

    #[test]
    fn test_condition_with_else_golden() {
        let out = generate_logic_code(&rsi_condition_with_else(), &universe());
        let expected = [
            "",
            "        # SPY oversold",
            "        if (self.spy_rsi_10.current.value) < 30:",
            "            # Order execution",
            "            target_weight = 1.0",
            "            if self._is_security_ready_for_trading('TQQQ'):",
            "                self.SetHoldings('TQQQ', target_weight)",
            "        else:",
            "            # Order execution",
            "            target_weight = 1.0",
            "            if self._is_security_ready_for_trading('BIL'):",
            "                self.SetHoldings('BIL', target_weight)",
        ]
        .join("\n");
        assert_eq!(body_of(&out.main_logic_code), expected);
        assert_eq!(out.indicators_used, vec!["rsi_SPY_10"]);
        assert_eq!(out.symbols_referenced, vec!["SPY", "TQQQ", "BIL"]);
        assert_eq!(out.variables_created, vec!["target_weight"]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let logic = json!([
            rsi_condition_with_else(),
            {"type": "filter", "universe": ["TQQQ", "SPY", "BIL"], "select": "middle",
             "selection": {"n": 1}, "metric": {"name": "moving-avg-return", "args": {"period": 5}}},
            {"type": "weight", "allocation_method": "explicit_weights", "weights": {"SPY": 0.6, "BIL": 0.4}}
        ]);
        let generator = LogicGenerator::default();
        let first = generator.generate_logic_code(&logic, &universe());
        let second = generator.generate_logic_code(&logic, &universe());
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_top_equal() {
        let logic = json!({
            "type": "filter",
            "universe": ["SPY", "TQQQ"],
            "select": "top",
            "selection": {"n": 1},
            "metric": {"name": "rsi", "args": {"period": 14}}
        });
        let out = generate_logic_code(&logic, &universe());
        let body = body_of(&out.main_logic_code);
        let expected = [
            "",
            "        # Filter selection",
            "        symbol_scores_1 = {}",
            "        if 'SPY' in self.Securities:",
            "            symbol_scores_1['SPY'] = (self.spy_rsi_14.current.value)",
            "        if 'TQQQ' in self.Securities:",
            "            symbol_scores_1['TQQQ'] = (self.tqqq_rsi_14.current.value)",
            "        selected_symbols_1 = sorted(symbol_scores_1.items(), key=lambda x: x[1], reverse=True)[:1]",
            "        if selected_symbols_1:",
            "            weight_per_symbol = 1.0 / len(selected_symbols_1)",
            "            for symbol, score in selected_symbols_1:",
            "                if self._is_security_ready_for_trading(symbol):",
            "                    self.SetHoldings(symbol, weight_per_symbol)",
        ]
        .join("\n");
        assert_eq!(body, expected);
        assert_eq!(out.indicators_used, vec!["rsi_SPY_14", "rsi_TQQQ_14"]);
    }

    #[test]
    fn test_filter_middle_and_bottom() {
        let middle = generate_logic_code(
            &json!({"type": "filter", "universe": ["SPY", "TQQQ", "BIL"], "select": "middle",
                    "selection": {"n": 1}, "metric": {"name": "current-price"}}),
            &universe(),
        );
        assert!(middle
            .main_logic_code
            .contains("mid_start_1 = max(0, len(sorted_symbols_1) // 2 - 1 // 2)"));
        assert!(middle.indicators_used.is_empty());

        let bottom = generate_logic_code(
            &json!({"type": "filter", "universe": ["SPY"], "select": "bottom",
                    "selection": {"n": 1}, "metric": {"name": "drawdown", "args": {"period": 60}}}),
            &universe(),
        );
        assert!(bottom
            .main_logic_code
            .contains("selected_symbols_1 = sorted(symbol_scores_1.items(), key=lambda x: x[1])[:1]"));
    }

    #[test]
    fn test_filter_weighted_allocation() {
        let out = generate_logic_code(
            &json!({"type": "filter", "universe": ["SPY", "TQQQ"], "select": "top",
                    "selection": {"n": 2}, "metric": {"name": "rsi", "args": {"period": 14}},
                    "allocation": "weighted", "size": 50, "weights": {"SPY": 1, "TQQQ": 3}}),
            &universe(),
        );
        assert!(out
            .main_logic_code
            .contains("filter_weights_1 = {'SPY': 0.125, 'TQQQ': 0.375}"));
    }

    #[test]
    fn test_container_condition_inlines_single_child() {
        let out = generate_logic_code(
            &json!({"type": "condition", "description": "Conditional logic container",
                    "children": [{"type": "exit"}]}),
            &universe(),
        );
        assert_eq!(
            body_of(&out.main_logic_code),
            "\n        # Exit positions\n        self.Liquidate()"
        );
    }

    #[test]
    fn test_container_condition_pairs_else_with_leading_comparison() {
        let out = generate_logic_code(
            &json!({"type": "condition", "description": "Conditional logic container", "children": [
                {"type": "condition", "description": "SPY above trend",
                 "lhs": {"name": "current-price", "symbol": "SPY"}, "operator": "gt",
                 "rhs": {"name": "sma", "symbol": "SPY", "args": {"period": 200}},
                 "children": [{"type": "exit", "description": "first"}]},
                {"type": "group", "description": "Else branch", "children": [{"type": "exit", "description": "second"}]}
            ]}),
            &universe(),
        );
        assert_eq!(
            body_of(&out.main_logic_code),
            [
                "",
                "        # SPY above trend",
                "        if self.securities['SPY'].price > (self.spy_sma_200.current.value):",
                "            # first",
                "            self.Liquidate()",
                "        else:",
                "            # second",
                "            self.Liquidate()",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_container_else_after_exit_runs_in_sequence() {
        let out = generate_logic_code(
            &json!({"type": "condition", "children": [
                {"type": "exit", "description": "first"},
                {"type": "group", "description": "Else branch", "children": [{"type": "exit", "description": "second"}]}
            ]}),
            &universe(),
        );
        assert_eq!(
            body_of(&out.main_logic_code),
            [
                "",
                "        # first",
                "        self.Liquidate()",
                "",
                "        # Else branch without a preceding comparison; runs unconditionally",
                "        # second",
                "        self.Liquidate()",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_container_else_never_attaches_to_order_guard() {
        let out = generate_logic_code(
            &json!({"type": "condition", "children": [
                {"type": "order", "side": "long", "weights": {"SPY": 1}},
                {"type": "group", "description": "Else branch", "children": [
                    {"type": "order", "side": "long", "weights": {"TQQQ": 1}}
                ]}
            ]}),
            &universe(),
        );
        let main = &out.main_logic_code;
        assert!(!main.contains("else:"));
        assert!(main.contains("        # Else branch without a preceding comparison; runs unconditionally"));
        assert!(main.contains("        if self._is_security_ready_for_trading('TQQQ'):"));
    }

    #[test]
    fn test_container_else_not_paired_when_condition_has_own_else() {
        let out = generate_logic_code(
            &json!({"type": "condition", "children": [
                {"type": "condition", "lhs": {"name": "month"}, "operator": "eq", "rhs": 1,
                 "children": [
                    {"type": "exit", "description": "january"},
                    {"type": "group", "description": "Else branch", "children": [{"type": "exit", "description": "inner"}]}
                 ]},
                {"type": "group", "description": "Else branch", "children": [{"type": "exit", "description": "outer"}]}
            ]}),
            &universe(),
        );
        let main = &out.main_logic_code;
        assert_eq!(main.matches("else:").count(), 1);
        let inner = main.find("# inner").unwrap();
        let outer = main.find("        # Else branch without a preceding comparison").unwrap();
        assert!(inner < outer);
        assert!(main.contains("\n        # outer\n        self.Liquidate()"));
    }

    #[test]
    fn test_share_classes_compare_distinct_instances() {
        let out = generate_logic_code(
            &json!({"type": "condition",
                    "lhs": {"name": "rsi", "symbol": "BRK.B", "args": {"period": 14}},
                    "operator": "lt",
                    "rhs": {"name": "rsi", "symbol": "BRK-B", "args": {"period": 14}},
                    "children": [{"type": "exit"}]}),
            &["BRK.B".to_string(), "BRK-B".to_string()],
        );
        assert!(out
            .main_logic_code
            .contains("if (self.brk_b_rsi_14.current.value) < (self.brk_b_rsi_14_2.current.value):"));
        assert_eq!(out.indicators_used, vec!["rsi_BRK.B_14", "rsi_BRK-B_14"]);
    }

    #[test]
    fn test_condition_without_children_gets_pass() {
        let out = generate_logic_code(
            &json!({"type": "condition", "lhs": {"name": "month"}, "operator": "eq", "rhs": 1}),
            &universe(),
        );
        assert!(out.main_logic_code.contains(
            "        if self.time.month == 1:\n            # No action defined for true condition\n            pass"
        ));
    }

    #[test]
    fn test_expression_node() {
        let out = generate_logic_code(
            &json!({"type": "expression", "expression": "rsi_spy_14 < 30 AND sma_spy_50 > 0"}),
            &universe(),
        );
        assert!(out
            .main_logic_code
            .contains("if self.spy_rsi_14 < 30 and self.spy_sma_50 > 0:"));
    }

    #[test]
    fn test_partial_signal_exit() {
        let out = generate_logic_code(&json!({"type": "exit", "qty_percent": 50}), &universe());
        assert!(out.main_logic_code.contains("exit_quantity = int(holding.Quantity * 0.5)"));
        assert!(out.main_logic_code.contains("self.MarketOrder(symbol, -exit_quantity)"));
    }

    #[test]
    fn test_weight_node_then_children() {
        let out = generate_logic_code(
            &json!({"type": "weight", "allocation_method": "explicit_weights",
                    "weights": {"SPY": 0.6, "BIL": 0.4}, "children": [{"type": "exit", "exit_type": "take_profit"}]}),
            &universe(),
        );
        let main = &out.main_logic_code;
        let spy = main.find("self.SetHoldings('SPY', 0.6)").unwrap();
        let bil = main.find("self.SetHoldings('BIL', 0.4)").unwrap();
        let exit = main.find("UnrealizedProfitPercent > 0.1").unwrap();
        assert!(spy < bil && bil < exit);
    }

    #[test]
    fn test_malformed_nodes_do_not_abort() {
        let out = generate_logic_code(
            &json!([{"type": "mystery"}, 7, {"type": "condition"}]),
            &universe(),
        );
        let main = &out.main_logic_code;
        assert!(main.contains("# Unknown node type: mystery"));
        assert!(main.contains("# Invalid node structure"));
        assert!(main.contains("# Invalid condition node - no comparison fields or children"));
    }

    #[test]
    fn test_custom_indicators_updated_before_logic() {
        let out = generate_logic_code(
            &json!({"type": "condition", "lhs": {"name": "max-drawdown", "symbol": "SPY", "args": {"period": 126}},
                    "operator": "gt", "rhs": 0.2, "children": [{"type": "exit"}]}),
            &universe(),
        );
        let main = &out.main_logic_code;
        let update = main.find("self.spy_max_drawdown_126.update(self.securities['SPY'].price)").unwrap();
        let check = main.find("if (self.spy_max_drawdown_126.current.value) > 0.2:").unwrap();
        assert!(update < check);
        assert!(out.indicator_initialization_code.contains("self.spy_max_drawdown_126 = MaxDrawdownIndicator(126)"));
        assert!(out.embedded_indicator_class_source.contains("class MaxDrawdownIndicator:"));
    }

    #[test]
    fn test_serialized_field_names() {
        let out = generate_logic_code(&json!([]), &universe());
        let value = serde_json::to_value(&out).unwrap();
        for field in [
            "mainLogicCode",
            "indicatorInitializationCode",
            "indicatorsUsed",
            "symbolsReferenced",
            "variablesCreated",
            "securityCheckHelperSource",
            "embeddedIndicatorClassSource",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
