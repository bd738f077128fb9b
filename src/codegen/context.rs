use super::emit::{py_str, Block};
use super::helpers;
use crate::indicators::IndicatorRegistry;

/// Operands of one crossing comparison. They are recorded at the top of
/// every bar so the comparison sees the previous bar even when its branch
/// did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedCrossing {
    pub key: String,
    pub lhs: String,
    pub rhs: String,
}

/// Mutable state of one generation pass, threaded through the recursion.
#[derive(Debug, Default)]
pub struct GenContext {
    pub registry: IndicatorRegistry,
    pub condition_counter: usize,
    pub filter_counter: usize,
    pub order_counter: usize,
    pub symbols_referenced: Vec<String>,
    pub variables_created: Vec<String>,
    pub helper_methods_needed: Vec<String>,
    pub crossings: Vec<TrackedCrossing>,
    /// Symbols an order falls back to when it names none itself.
    pub universe_symbols: Vec<String>,
    /// Else label, trimmed and lowercased.
    pub else_label: String,
}

impl GenContext {
    /// Fresh state for one pass over a logic tree.
    pub fn new(universe_symbols: &[String], else_label: &str) -> Self {
        Self {
            universe_symbols: universe_symbols.iter().map(|s| s.trim().to_uppercase()).collect(),
            else_label: else_label.trim().to_lowercase(),
            ..Self::default()
        }
    }

    /// Note a symbol the generated code touches, uppercased, first use wins.
    pub fn reference_symbol(&mut self, symbol: &str) {
        push_unique(&mut self.symbols_referenced, symbol.to_uppercase());
    }

    pub fn create_variable(&mut self, name: &str) {
        push_unique(&mut self.variables_created, name.to_string());
    }

    /// Request a helper method by name; see [`super::helpers::helper_source`].
    pub fn need_helper(&mut self, name: &str) {
        push_unique(&mut self.helper_methods_needed, name.to_string());
    }

    /// Record a crossing comparison and return the key its helper reads.
    pub fn track_crossing(&mut self, id: usize, lhs: String, rhs: String) -> String {
        let key = format!("condition_{id}");
        self.need_helper(helpers::TRACK_CROSS);
        self.crossings.push(TrackedCrossing {
            key: key.clone(),
            lhs,
            rhs,
        });
        key
    }

    /// `_track_cross` calls for every crossing, emitted ahead of the logic body.
    pub fn crossing_tracking_code(&self, depth: usize) -> Block {
        let mut block = Block::new();
        if self.crossings.is_empty() {
            return block;
        }
        block.comment(depth, "Record crossing operands for this bar");
        for c in &self.crossings {
            block.line(
                depth,
                format!("self.{}({}, {}, {})", helpers::TRACK_CROSS, py_str(&c.key), c.lhs, c.rhs),
            );
        }
        block
    }
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}
