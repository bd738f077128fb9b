use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codegen::emit::{arg_token, py_ident, py_str, Block};
use crate::indicators::impls::*;
use crate::indicators::source;
use crate::spec::Metric;

/// Every indicator the generator knows how to emit, after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorKind {
    CurrentPrice,
    MovingAveragePrice,
    ExponentialMovingAveragePrice,
    Rsi,
    StandardDeviationPrice,
    StandardDeviationReturn,
    CumulativeReturn,
    MaxDrawdown,
    Drawdown,
    MovingAvgReturn,
    Month,
    DayOfWeek,
    DayOfMonth,
    DayOfYear,
}

/// How an indicator comes into existence in the generated algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorFamily {
    /// Built into the runtime, one constructor call.
    Native,
    /// Embedded class fed by an explicit per-bar `update(price)`.
    Custom,
    /// Read straight from the current bar or clock.
    Derived,
}

impl IndicatorKind {
    /// Resolve a metric name or alias, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_lowercase().as_str() {
            "current-price" => IndicatorKind::CurrentPrice,
            "moving-average-price" | "moving-avg-price" | "sma" => IndicatorKind::MovingAveragePrice,
            "exponential-moving-average-price" | "ema" => IndicatorKind::ExponentialMovingAveragePrice,
            "rsi" => IndicatorKind::Rsi,
            "standard-deviation-price" | "std-dev-price" | "volatility" => IndicatorKind::StandardDeviationPrice,
            "standard-deviation-return" | "std-dev-return" => IndicatorKind::StandardDeviationReturn,
            "cumulative-return" | "returns" => IndicatorKind::CumulativeReturn,
            "max-drawdown" => IndicatorKind::MaxDrawdown,
            "drawdown" => IndicatorKind::Drawdown,
            "moving-average-return" | "moving-avg-return" => IndicatorKind::MovingAvgReturn,
            "month" => IndicatorKind::Month,
            "day-of-week" => IndicatorKind::DayOfWeek,
            "day-of-month" => IndicatorKind::DayOfMonth,
            "day-of-year" => IndicatorKind::DayOfYear,
            _ => return None,
        };
        Some(kind)
    }

    /// Name used in canonical keys, whatever alias the metric used.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            IndicatorKind::CurrentPrice => "current-price",
            IndicatorKind::MovingAveragePrice => "moving-average-price",
            IndicatorKind::ExponentialMovingAveragePrice => "exponential-moving-average-price",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::StandardDeviationPrice => "standard-deviation-price",
            IndicatorKind::StandardDeviationReturn => "standard-deviation-return",
            IndicatorKind::CumulativeReturn => "cumulative-return",
            IndicatorKind::MaxDrawdown => "max-drawdown",
            IndicatorKind::Drawdown => "drawdown",
            IndicatorKind::MovingAvgReturn => "moving-average-return",
            IndicatorKind::Month => "month",
            IndicatorKind::DayOfWeek => "day-of-week",
            IndicatorKind::DayOfMonth => "day-of-month",
            IndicatorKind::DayOfYear => "day-of-year",
        }
    }

    pub fn family(&self) -> IndicatorFamily {
        match self {
            IndicatorKind::MaxDrawdown | IndicatorKind::Drawdown | IndicatorKind::MovingAvgReturn => {
                IndicatorFamily::Custom
            }
            IndicatorKind::CurrentPrice
            | IndicatorKind::Month
            | IndicatorKind::DayOfWeek
            | IndicatorKind::DayOfMonth
            | IndicatorKind::DayOfYear => IndicatorFamily::Derived,
            _ => IndicatorFamily::Native,
        }
    }

    /// Period used when a metric carries none. Derived kinds have no period.
    pub fn default_period(&self) -> Option<u64> {
        match self {
            IndicatorKind::MovingAveragePrice | IndicatorKind::ExponentialMovingAveragePrice => Some(20),
            IndicatorKind::Rsi => Some(14),
            IndicatorKind::StandardDeviationPrice | IndicatorKind::StandardDeviationReturn => Some(30),
            IndicatorKind::CumulativeReturn => Some(1),
            IndicatorKind::MaxDrawdown | IndicatorKind::Drawdown => Some(252),
            IndicatorKind::MovingAvgReturn => Some(20),
            _ => None,
        }
    }

    /// Attribute stem: `self.<symbol>_<stem>_<period>`.
    fn var_stem(&self) -> &'static str {
        match self {
            IndicatorKind::MovingAveragePrice => "sma",
            IndicatorKind::ExponentialMovingAveragePrice => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::StandardDeviationPrice => "std",
            IndicatorKind::StandardDeviationReturn => "std_dev_return",
            IndicatorKind::CumulativeReturn => "roc",
            IndicatorKind::MaxDrawdown => "max_drawdown",
            IndicatorKind::Drawdown => "drawdown",
            IndicatorKind::MovingAvgReturn => "moving_avg_return",
            IndicatorKind::CurrentPrice => "price",
            IndicatorKind::Month => "month",
            IndicatorKind::DayOfWeek => "day_of_week",
            IndicatorKind::DayOfMonth => "day_of_month",
            IndicatorKind::DayOfYear => "day_of_year",
        }
    }

    fn class_name(&self) -> Option<&'static str> {
        match self {
            IndicatorKind::MaxDrawdown => Some("MaxDrawdownIndicator"),
            IndicatorKind::Drawdown => Some("DrawdownIndicator"),
            IndicatorKind::MovingAvgReturn => Some("MovingAvgReturnIndicator"),
            _ => None,
        }
    }

    /// Right-hand side of the initialization assignment.
    fn constructor(&self, symbol: &str, period: u64) -> Option<String> {
        let sym = py_str(symbol);
        let code = match self {
            IndicatorKind::MovingAveragePrice => format!("self.sma({sym}, {period})"),
            IndicatorKind::ExponentialMovingAveragePrice => format!("self.ema({sym}, {period})"),
            IndicatorKind::Rsi => format!("self.rsi({sym}, {period})"),
            IndicatorKind::StandardDeviationPrice => format!("self.std({sym}, {period})"),
            IndicatorKind::StandardDeviationReturn => {
                format!("IndicatorExtensions.of(StandardDeviation({period}), self.roc({sym}, 1))")
            }
            IndicatorKind::CumulativeReturn => format!("self.roc({sym}, {period})"),
            custom => format!("{}({period})", custom.class_name()?),
        };
        Some(code)
    }

    /// Value expression for kinds read directly from the bar or clock.
    fn derived_value(&self, symbol: Option<&str>) -> Option<String> {
        let code = match self {
            IndicatorKind::CurrentPrice => format!("self.securities[{}].price", py_str(symbol?)),
            IndicatorKind::Month => "self.time.month".to_string(),
            IndicatorKind::DayOfWeek => "self.time.weekday()".to_string(),
            IndicatorKind::DayOfMonth => "self.time.day".to_string(),
            IndicatorKind::DayOfYear => "self.time.timetuple().tm_yday".to_string(),
            _ => return None,
        };
        Some(code)
    }

    fn requires_symbol(&self) -> bool {
        !matches!(
            self,
            IndicatorKind::Month | IndicatorKind::DayOfWeek | IndicatorKind::DayOfMonth | IndicatorKind::DayOfYear
        )
    }
}

/// Period used for a metric reference: an explicit positive integer (or an
/// integral float) wins, otherwise the kind's default.
pub fn effective_period(kind: IndicatorKind, metric: &Metric) -> Option<u64> {
    let explicit = match metric.args.get("period") {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0 && f.fract() == 0.0).map(|f| f as u64))
            .filter(|p| *p > 0),
        _ => None,
    };
    explicit.or_else(|| kind.default_period())
}

/// Deterministic identity of one indicator instance:
/// `name_SYMBOL[_period][_s{smoothing}][_{fast}_{slow}]`.
pub fn canonical_key(metric: &Metric) -> String {
    let kind = IndicatorKind::from_name(&metric.name);
    let name = kind.map_or(metric.name.as_str(), |k| k.canonical_name());
    let symbol = metric.symbol.as_deref().unwrap_or_default().to_uppercase();

    let mut parts = vec![format!("{name}_{symbol}")];
    let period = kind
        .and_then(|k| k.default_period().and(effective_period(k, metric)))
        .map(|p| p.to_string())
        .or_else(|| metric.args.get("period").map(arg_token));
    parts.extend(period);
    if let Some(smoothing) = metric.args.get("smoothing") {
        parts.push(format!("s{}", arg_token(smoothing)));
    }
    if let (Some(fast), Some(slow)) = (metric.args.get("fast"), metric.args.get("slow")) {
        parts.push(format!("{}_{}", arg_token(fast), arg_token(slow)));
    }
    parts.join("_")
}

/// Preferred attribute name: `<symbol>_<stem>_<period>` plus the same
/// significant-args suffixes the canonical key carries.
fn attribute_name(kind: IndicatorKind, symbol: &str, period: u64, metric: &Metric) -> String {
    let mut name = format!("{}_{}_{}", py_ident(symbol), kind.var_stem(), period);
    if let Some(smoothing) = metric.args.get("smoothing") {
        name.push_str(&format!("_s{}", py_ident(&arg_token(smoothing))));
    }
    if let (Some(fast), Some(slow)) = (metric.args.get("fast"), metric.args.get("slow")) {
        name.push_str(&format!("_{}_{}", py_ident(&arg_token(fast)), py_ident(&arg_token(slow))));
    }
    name
}

/// One registered indicator instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRegistration {
    /// Canonical key, see [`canonical_key`].
    pub key: String,
    pub kind: IndicatorKind,
    /// Uppercased symbol.
    pub symbol: String,
    pub period: u64,
    /// Attribute name on the algorithm, without `self.`.
    pub variable: String,
    /// Full assignment statement, `self.<variable> = ...`.
    pub init_code: String,
}

/// Deduplicating table of indicator instances for one compilation.
///
/// Insertion order is kept so emitted initialization code is stable for a
/// given input.
#[derive(Debug, Default)]
pub struct IndicatorRegistry {
    entries: Vec<IndicatorRegistration>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the instance a metric refers to. Re-registering the same key
    /// is a no-op; derived and unknown metrics are never registered.
    pub fn register(&mut self, metric: &Metric) -> Option<&IndicatorRegistration> {
        let Some(kind) = IndicatorKind::from_name(&metric.name) else {
            warn!(metric = %metric.name, "unsupported metric, no indicator registered");
            return None;
        };
        if kind.family() == IndicatorFamily::Derived {
            return None;
        }
        let Some(symbol) = metric.symbol.as_deref().filter(|s| !s.is_empty()) else {
            warn!(metric = %metric.name, "metric has no symbol, no indicator registered");
            return None;
        };

        let key = canonical_key(metric);
        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            return self.entries.get(pos);
        }

        let period = effective_period(kind, metric).unwrap_or(1);
        let variable = self.unique_variable(attribute_name(kind, symbol, period, metric));
        let init_code = kind
            .constructor(symbol, period)
            .map(|rhs| format!("self.{variable} = {rhs}"))?;

        debug!(key = %key, variable = %variable, "registered indicator");
        self.entries.push(IndicatorRegistration {
            key,
            kind,
            symbol: symbol.to_uppercase(),
            period,
            variable,
            init_code,
        });
        self.entries.last()
    }

    /// `base`, or `base_2`, `base_3`, ... when another key already owns it.
    /// Symbols such as `BRK.B` and `BRK-B` flatten to the same identifier.
    fn unique_variable(&self, base: String) -> String {
        let taken = |name: &str| self.entries.iter().any(|e| e.variable == name);
        if !taken(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Expression for the current value of a metric, registering its
    /// indicator on first use.
    pub fn value_expression(&mut self, metric: &Metric) -> String {
        let kind = IndicatorKind::from_name(&metric.name);
        let symbol = metric.symbol.as_deref().filter(|s| !s.is_empty());

        match kind {
            Some(k) if k.family() == IndicatorFamily::Derived => {
                if let Some(code) = k.derived_value(symbol) {
                    return code;
                }
                warn!(metric = %metric.name, "metric requires a symbol");
                "0".to_string()
            }
            Some(k) => {
                if k.requires_symbol() && symbol.is_none() {
                    warn!(metric = %metric.name, "metric requires a symbol");
                    return "0".to_string();
                }
                match self.register(metric) {
                    Some(entry) => format!("(self.{}.current.value)", entry.variable),
                    None => "0".to_string(),
                }
            }
            None => {
                let Some(symbol) = symbol else {
                    warn!(metric = %metric.name, "unsupported metric without symbol");
                    return "0".to_string();
                };
                let mut variable = format!("{}_{}", py_ident(symbol), py_ident(&metric.name));
                if let Some(period) = metric.args.get("period") {
                    variable.push('_');
                    variable.push_str(&py_ident(&arg_token(period)));
                }
                format!("(self.{variable}.current.value)")
            }
        }
    }

    /// Initialization block for the algorithm's `initialize` method, already
    /// indented for a method body.
    pub fn initialization_code(&self) -> String {
        let mut block = Block::new();
        if self.entries.is_empty() {
            block.comment(0, "No indicators needed");
            return block.render();
        }
        block
            .comment(0, "Initialize indicators with automatic warm-up support")
            .line(0, "self.settings.automatic_indicator_warm_up = True")
            .blank();
        for entry in &self.entries {
            block.line(0, entry.init_code.as_str());
        }
        block.render()
    }

    /// Per-bar `update(price)` calls for custom indicators.
    pub fn update_code(&self, depth: usize) -> Block {
        let mut block = Block::new();
        let custom: Vec<&IndicatorRegistration> = self
            .entries
            .iter()
            .filter(|e| e.kind.family() == IndicatorFamily::Custom)
            .collect();
        if custom.is_empty() {
            return block;
        }
        block.comment(depth, "Update custom indicators with the latest prices");
        for entry in custom {
            let sym = py_str(&entry.symbol);
            let mut body = Block::new();
            body.line(
                depth + 1,
                format!("self.{}.update(self.securities[{sym}].price)", entry.variable),
            );
            block.suite(
                depth,
                format!("if {sym} in self.securities and self.securities[{sym}].price > 0:"),
                body,
            );
        }
        block
    }

    /// Number of distinct indicator instances registered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an instance with this canonical key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Registrations in first-use order.
    pub fn entries(&self) -> &[IndicatorRegistration] {
        &self.entries
    }

    /// Canonical keys in registration order.
    pub fn indicators_used(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// Custom kinds in first-use order, each once.
    pub fn custom_kinds_used(&self) -> Vec<IndicatorKind> {
        let mut kinds = Vec::new();
        for entry in &self.entries {
            if entry.kind.family() == IndicatorFamily::Custom && !kinds.contains(&entry.kind) {
                kinds.push(entry.kind);
            }
        }
        kinds
    }

    /// Python source of the custom indicator classes in use, empty when none are.
    pub fn embedded_class_source(&self) -> String {
        source::embedded_classes(&self.custom_kinds_used())
    }

    /// Forget every registration.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Rust counterpart of an embedded custom indicator class.
pub fn create_custom_indicator(kind: IndicatorKind, period: usize) -> Option<Box<dyn CustomIndicator>> {
    match kind {
        IndicatorKind::MaxDrawdown => Some(Box::new(MaxDrawdownIndicator::new(period))),
        IndicatorKind::Drawdown => Some(Box::new(DrawdownIndicator::new(period))),
        IndicatorKind::MovingAvgReturn => Some(Box::new(MovingAvgReturnIndicator::new(period))),
        _ => None,
    }
}
