//! Universe section: the source of every symbol the logic may reference.

use std::collections::HashSet;

use serde_json::Value;

use super::ValidationReport;
use crate::spec::value::type_name;

/// Accepted values of `assetClass`.
pub const ASSET_CLASSES: [&str; 8] = [
    "BOND", "COMMODITY", "CRYPTO", "EQUITY", "ETF", "FOREX", "FUTURE", "OPTION",
];

const ASSET_FIELDS: [&str; 3] = ["symbol", "name", "assetClass"];
const MAX_SYMBOL_LEN: usize = 20;

/// `^[A-Za-z0-9/.:-]{1,20}$`
fn symbol_matches_pattern(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | ':' | '-'))
}

/// Validate the `universe` section: a non-empty array of asset objects.
pub fn validate_universe(universe: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();
    let assets = match universe {
        Value::Array(items) => items,
        other => {
            report.error(format!("Universe must be an array, got {}", type_name(other)));
            return report;
        }
    };
    if assets.is_empty() {
        report.error("Universe must contain at least one asset");
        return report;
    }

    let mut seen = HashSet::new();
    for (i, asset) in assets.iter().enumerate() {
        let path = format!("universe[{i}]");
        let Some(obj) = asset.as_object() else {
            report.error(format!("{path}: Asset must be an object, got {}", type_name(asset)));
            continue;
        };

        match obj.get("symbol") {
            None => report.error(format!("{path}: Missing required field 'symbol'")),
            Some(Value::String(sym)) => {
                if sym.is_empty() {
                    report.error(format!("{path}: symbol cannot be empty"));
                } else if !symbol_matches_pattern(sym) {
                    report.error(format!(
                        "{path}: symbol '{sym}' does not match required pattern ^[A-Za-z0-9/.:-]{{1,20}}$"
                    ));
                }
                if !sym.is_empty() && !seen.insert(sym.to_uppercase()) {
                    report.warn(format!("{path}: Duplicate symbol '{sym}' found in universe"));
                }
            }
            Some(other) => report.error(format!("{path}: symbol must be a string, got {}", type_name(other))),
        }

        if let Some(name) = obj.get("name") {
            if !name.is_string() {
                report.error(format!("{path}: name must be a string, got {}", type_name(name)));
            }
        }

        match obj.get("assetClass") {
            None => {}
            Some(Value::String(class)) if ASSET_CLASSES.contains(&class.as_str()) => {}
            Some(Value::String(class)) => report.error(format!(
                "{path}: Invalid assetClass '{class}'. Valid options: {}",
                ASSET_CLASSES.join(", ")
            )),
            Some(other) => report.error(format!(
                "{path}: assetClass must be a string, got {}",
                type_name(other)
            )),
        }

        for key in obj.keys().filter(|k| !ASSET_FIELDS.contains(&k.as_str())) {
            report.warn(format!("{path}: Unknown field '{key}' in asset"));
        }
    }
    report
}

/// Uppercased, de-duplicated symbols of a universe section, in document order.
pub fn allowed_symbols(universe: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for asset in universe.as_array().into_iter().flatten() {
        let Some(sym) = asset.get("symbol").and_then(Value::as_str) else {
            continue;
        };
        let sym = sym.trim().to_uppercase();
        if !sym.is_empty() && !out.contains(&sym) {
            out.push(sym);
        }
    }
    out
}
