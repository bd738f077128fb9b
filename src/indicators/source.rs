//! Runtime source for custom indicator classes embedded into generated files.
//!
//! The Python classes mirror the Rust units in [`super::impls`]; tests pin the
//! numeric behaviour on the Rust side.

use super::registry::IndicatorKind;

/// First line of the embedded source block.
pub const EMBEDDED_HEADER: &str = "# Custom Indicator Classes";

/// Holder giving custom indicators the `current.value` shape native ones have.
pub const INDICATOR_DATA_POINT: &str = r#"class IndicatorDataPoint:
    """Value holder matching the runtime's `indicator.current.value` access."""

    def __init__(self, value: float):
        self.value = value"#;

pub const MAX_DRAWDOWN: &str = r#"class MaxDrawdownIndicator:
    """Largest peak-to-trough decline inside a rolling price window."""

    def __init__(self, period: int = 252):
        self.period = period
        self.price_history = []
        self.is_ready = False

    def update(self, price: float) -> None:
        self.price_history.append(price)
        if len(self.price_history) > self.period:
            self.price_history.pop(0)
        if len(self.price_history) >= 2:
            self.is_ready = True

    @property
    def current(self):
        return IndicatorDataPoint(self.value)

    @property
    def value(self) -> float:
        if not self.is_ready or len(self.price_history) < 2:
            return 0.0
        peak = self.price_history[0]
        max_drawdown = 0.0
        for price in self.price_history[1:]:
            if price > peak:
                peak = price
            elif peak > 0:
                max_drawdown = max(max_drawdown, (peak - price) / peak)
        return max_drawdown"#;

pub const DRAWDOWN: &str = r#"class DrawdownIndicator:
    """Decline of the latest price from the highest price in the window."""

    def __init__(self, period: int = 252):
        self.period = period
        self.price_history = []
        self.is_ready = False

    def update(self, price: float) -> None:
        self.price_history.append(price)
        if len(self.price_history) > self.period:
            self.price_history.pop(0)
        if len(self.price_history) >= 2:
            self.is_ready = True

    @property
    def current(self):
        return IndicatorDataPoint(self.value)

    @property
    def value(self) -> float:
        if not self.is_ready or len(self.price_history) < 2:
            return 0.0
        peak = max(self.price_history)
        if peak <= 0:
            return 0.0
        return (peak - self.price_history[-1]) / peak"#;

pub const MOVING_AVG_RETURN: &str = r#"class MovingAvgReturnIndicator:
    """Mean of single-step percentage returns over a rolling window."""

    def __init__(self, period: int = 20):
        self.period = period
        self.last_price = None
        self.return_history = []
        self.is_ready = False

    def update(self, price: float) -> None:
        if self.last_price is not None and self.last_price > 0:
            self.return_history.append((price - self.last_price) / self.last_price)
            if len(self.return_history) > self.period:
                self.return_history.pop(0)
        self.last_price = price
        if len(self.return_history) >= 1:
            self.is_ready = True

    @property
    def current(self):
        return IndicatorDataPoint(self.value)

    @property
    def value(self) -> float:
        if not self.is_ready or not self.return_history:
            return 0.0
        return sum(self.return_history) / len(self.return_history)"#;

/// Class source for a custom indicator kind, `None` for runtime-native kinds.
pub fn class_source(kind: IndicatorKind) -> Option<&'static str> {
    match kind {
        IndicatorKind::MaxDrawdown => Some(MAX_DRAWDOWN),
        IndicatorKind::Drawdown => Some(DRAWDOWN),
        IndicatorKind::MovingAvgReturn => Some(MOVING_AVG_RETURN),
        _ => None,
    }
}

/// Header, the shared data point class, then each class once in the given order.
pub fn embedded_classes(kinds: &[IndicatorKind]) -> String {
    let classes: Vec<&str> = kinds.iter().filter_map(|k| class_source(*k)).collect();
    if classes.is_empty() {
        return String::new();
    }
    let mut parts = vec![EMBEDDED_HEADER, INDICATOR_DATA_POINT];
    parts.extend(classes);
    let mut out = parts.join("\n\n\n");
    out.push('\n');
    out
}
