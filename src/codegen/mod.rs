pub mod context;
pub mod emit;
pub mod expression;
pub mod helpers;
pub mod nodes;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub use context::GenContext;
pub use emit::Block;
pub use nodes::{generate_node, generate_nodes};

use crate::config::DEFAULT_ELSE_LABEL;
use crate::spec::LogicNode;

const ON_DATA_HEADER: &str = "    def OnData(self, data: Slice) -> None:\n        '''Main algorithm logic executed on each data point'''\n        self.current_slice = data";

/// Everything the file assembly stage needs from one generation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLogic {
    /// Complete `OnData` method, header included.
    pub main_logic_code: String,
    /// Statements for `Initialize`, already indented for a method body.
    pub indicator_initialization_code: String,
    /// Canonical indicator keys in first-use order.
    pub indicators_used: Vec<String>,
    pub symbols_referenced: Vec<String>,
    pub variables_created: Vec<String>,
    pub security_check_helper_source: String,
    /// Python classes for custom indicators; empty when embedding is off.
    pub embedded_indicator_class_source: String,
    pub helper_methods_source: String,
}

/// Turns logic trees into algorithm source. Holds configuration only; all
/// per-run state lives in a fresh [`GenContext`].
#[derive(Debug, Clone)]
pub struct LogicGenerator {
    else_label: String,
    embed_custom_indicators: bool,
}

impl Default for LogicGenerator {
    fn default() -> Self {
        Self {
            else_label: DEFAULT_ELSE_LABEL.to_string(),
            embed_custom_indicators: true,
        }
    }
}

impl LogicGenerator {
    pub fn new(else_label: &str, embed_custom_indicators: bool) -> Self {
        Self {
            else_label: else_label.to_string(),
            embed_custom_indicators,
        }
    }

    /// Generate from a raw logic root (one node or an array of nodes).
    pub fn generate_logic_code(&self, logic: &Value, universe_symbols: &[String]) -> GeneratedLogic {
        self.generate(&LogicNode::from_root(logic), universe_symbols)
    }

    /// Generate from already parsed nodes.
    ///
    /// Counters, referenced symbols and the indicator registry start empty on every
    /// call, so two calls with the same input produce identical output. Custom
    /// indicator updates and crossing bookkeeping are emitted ahead of the logic
    /// body so they run on every bar.
    pub fn generate(&self, nodes: &[LogicNode], universe_symbols: &[String]) -> GeneratedLogic {
        let mut ctx = GenContext::new(universe_symbols, &self.else_label);
        let body = generate_nodes(nodes, 0, &mut ctx);

        let mut main = ON_DATA_HEADER.to_string();
        for prelude in [ctx.registry.update_code(0), ctx.crossing_tracking_code(0)] {
            if !prelude.is_empty() {
                main.push_str("\n\n");
                main.push_str(&prelude.render());
            }
        }
        if !body.is_empty() {
            main.push_str("\n\n");
            main.push_str(&body.render());
        }

        debug!(
            conditions = ctx.condition_counter,
            filters = ctx.filter_counter,
            orders = ctx.order_counter,
            indicators = ctx.registry.len(),
            "generated logic"
        );

        let embedded = if self.embed_custom_indicators {
            ctx.registry.embedded_class_source()
        } else {
            String::new()
        };

        GeneratedLogic {
            main_logic_code: main,
            indicator_initialization_code: ctx.registry.initialization_code(),
            indicators_used: ctx.registry.indicators_used(),
            symbols_referenced: ctx.symbols_referenced,
            variables_created: ctx.variables_created,
            security_check_helper_source: helpers::SECURITY_CHECK_HELPER.to_string(),
            embedded_indicator_class_source: embedded,
            helper_methods_source: helpers::helpers_source(&ctx.helper_methods_needed),
        }
    }
}

/// Generate with default settings.
pub fn generate_logic_code(logic: &Value, universe_symbols: &[String]) -> GeneratedLogic {
    LogicGenerator::default().generate_logic_code(logic, universe_symbols)
}
