#[cfg(test)]
mod tests {
    use crate::indicators::*;
    use crate::spec::Metric;

    fn feed(kind: IndicatorKind, period: usize, prices: &[f64]) -> Box<dyn CustomIndicator> {
        let mut ind = create_custom_indicator(kind, period).unwrap();
        for p in prices {
            ind.update(*p);
        }
        ind
    }

    #[test]
    fn test_max_drawdown() {
        let ind = feed(IndicatorKind::MaxDrawdown, 252, &[100.0, 120.0, 90.0]);
        assert!(ind.is_ready());
        assert!((ind.value() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_peak_to_last() {
        let ind = feed(IndicatorKind::Drawdown, 252, &[100.0, 120.0, 90.0]);
        assert!((ind.value() - 0.25).abs() < 1e-12);

        let recovered = feed(IndicatorKind::Drawdown, 252, &[100.0, 120.0, 90.0, 130.0]);
        assert_eq!(recovered.value(), 0.0);
    }

    #[test]
    fn test_max_drawdown_remembers_earlier_trough() {
        let ind = feed(IndicatorKind::MaxDrawdown, 252, &[100.0, 50.0, 120.0, 110.0]);
        assert!((ind.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_window_eviction() {
        // Peak 120 falls out of a 2-wide window.
        let ind = feed(IndicatorKind::Drawdown, 2, &[120.0, 100.0, 90.0]);
        assert!((ind.value() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_not_ready_is_zero() {
        let ind = feed(IndicatorKind::MaxDrawdown, 252, &[100.0]);
        assert!(!ind.is_ready());
        assert_eq!(ind.value(), 0.0);

        let mar = feed(IndicatorKind::MovingAvgReturn, 20, &[100.0]);
        assert!(!mar.is_ready());
        assert_eq!(mar.value(), 0.0);
    }

    #[test]
    fn test_moving_avg_return() {
        let ind = feed(IndicatorKind::MovingAvgReturn, 20, &[100.0, 110.0, 99.0]);
        // (0.10 + -0.10) / 2
        assert!(ind.value().abs() < 1e-12);

        let capped = feed(IndicatorKind::MovingAvgReturn, 1, &[100.0, 110.0, 121.0]);
        assert!((capped.value() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_moving_avg_return_skips_non_positive_prev() {
        let ind = feed(IndicatorKind::MovingAvgReturn, 20, &[0.0, 100.0, 105.0]);
        assert!((ind.value() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut ind = feed(IndicatorKind::Drawdown, 252, &[100.0, 80.0]);
        ind.reset();
        assert!(!ind.is_ready());
        assert_eq!(ind.value(), 0.0);
    }

    #[test]
    fn test_native_kinds_have_no_unit() {
        assert!(create_custom_indicator(IndicatorKind::Rsi, 14).is_none());
    }

    #[test]
    fn test_alias_resolution() {
        assert_eq!(IndicatorKind::from_name("sma"), Some(IndicatorKind::MovingAveragePrice));
        assert_eq!(IndicatorKind::from_name("volatility"), Some(IndicatorKind::StandardDeviationPrice));
        assert_eq!(IndicatorKind::from_name("returns"), Some(IndicatorKind::CumulativeReturn));
        assert_eq!(IndicatorKind::from_name("vix"), None);
    }

    #[test]
    fn test_canonical_key_fills_default_period() {
        let bare = Metric::new("rsi", Some("SPY"));
        let explicit = Metric::new("rsi", Some("SPY")).with_arg("period", 14);
        assert_eq!(canonical_key(&bare), "rsi_SPY_14");
        assert_eq!(canonical_key(&bare), canonical_key(&explicit));
    }

    #[test]
    fn test_canonical_key_ordering() {
        let m = Metric::new("sma", Some("spy"))
            .with_arg("slow", 26)
            .with_arg("fast", 12)
            .with_arg("smoothing", 3)
            .with_arg("period", 50);
        assert_eq!(canonical_key(&m), "moving-average-price_SPY_50_s3_12_26");
    }

    #[test]
    fn test_register_native_and_custom() {
        let mut reg = IndicatorRegistry::new();
        reg.register(&Metric::new("sma", Some("SPY")).with_arg("period", 50));
        reg.register(&Metric::new("max-drawdown", Some("QQQ")));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.entries()[0].init_code, "self.spy_sma_50 = self.sma('SPY', 50)");
        assert_eq!(reg.entries()[1].init_code, "self.qqq_max_drawdown_252 = MaxDrawdownIndicator(252)");
        assert_eq!(reg.custom_kinds_used(), vec![IndicatorKind::MaxDrawdown]);
    }

    #[test]
    fn test_derived_metrics_not_registered() {
        let mut reg = IndicatorRegistry::new();
        assert_eq!(reg.value_expression(&Metric::new("month", None)), "self.time.month");
        assert_eq!(
            reg.value_expression(&Metric::new("current-price", Some("SPY"))),
            "self.securities['SPY'].price"
        );
        assert!(reg.is_empty());
        assert_eq!(reg.initialization_code(), "        # No indicators needed");
    }

    #[test]
    fn test_missing_symbol_yields_zero() {
        let mut reg = IndicatorRegistry::new();
        assert_eq!(reg.value_expression(&Metric::new("rsi", None)), "0");
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unknown_metric_fallback() {
        let mut reg = IndicatorRegistry::new();
        let expr = reg.value_expression(&Metric::new("vix", Some("SPY")).with_arg("period", 10));
        assert_eq!(expr, "(self.spy_vix_10.current.value)");
        assert!(reg.is_empty());
    }

    #[test]
    fn test_update_code_only_for_custom() {
        let mut reg = IndicatorRegistry::new();
        reg.register(&Metric::new("rsi", Some("SPY")));
        assert!(reg.update_code(0).is_empty());

        reg.register(&Metric::new("drawdown", Some("SPY")));
        let code = reg.update_code(0).render();
        assert!(code.contains("self.spy_drawdown_252.update(self.securities['SPY'].price)"));
    }

    #[test]
    fn test_embedded_source_lists_used_classes() {
        let mut reg = IndicatorRegistry::new();
        assert_eq!(reg.embedded_class_source(), "");
        reg.register(&Metric::new("moving-avg-return", Some("SPY")));
        let src = reg.embedded_class_source();
        assert!(src.starts_with("# Custom Indicator Classes"));
        assert!(src.contains("class IndicatorDataPoint:"));
        assert!(src.contains("class MovingAvgReturnIndicator:"));
        assert!(!src.contains("class DrawdownIndicator:"));
    }

    #[test]
    fn test_reset_clears_registry() {
        let mut reg = IndicatorRegistry::new();
        reg.register(&Metric::new("ema", Some("SPY")));
        reg.reset();
        assert_eq!(reg.len(), 0);
        assert!(reg.indicators_used().is_empty());
    }
}
