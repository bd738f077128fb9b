use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tracing::{debug, info};

use crate::codegen::emit::{py_float, py_str, Block};
use crate::codegen::{GeneratedLogic, LogicGenerator};
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::spec::{StrategyDocument, UniverseAsset};
use crate::validate::{
    allowed_symbols, validate_logic, validate_meta, validate_settings, validate_universe, ValidationContext,
    ValidationReport,
};

const FALLBACK_CLASS_NAME: &str = "GeneratedStrategy";

/// One compiled document.
#[derive(Debug, Clone)]
pub struct CompiledStrategy {
    /// Algorithm class name derived from `meta.name`.
    pub class_name: String,
    /// The assembled Python file.
    pub source: String,
    pub logic: GeneratedLogic,
    /// Warnings collected while validating; errors are always empty here.
    pub report: ValidationReport,
}

/// Document-level driver: validate each section, then generate and assemble.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn context_for(&self, doc: &StrategyDocument) -> ValidationContext {
        ValidationContext::with_options(allowed_symbols(&doc.universe), self.config.validator.clone())
    }

    /// Validate every section and return everything found.
    pub fn validate_document(&self, doc: &StrategyDocument) -> ValidationReport {
        let mut report = validate_universe(&doc.universe);
        report.merge(validate_meta(&doc.meta));
        report.merge(validate_settings(&doc.settings));
        report.merge(validate_logic(&doc.logic, &self.context_for(doc)));
        report
    }

    /// Validate universe, meta, settings and logic in that order, then generate
    /// and assemble the algorithm file.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidDocument`] naming the first section with
    /// errors; later sections are not validated.
    pub fn compile_document(&self, doc: &StrategyDocument) -> Result<CompiledStrategy> {
        let mut warnings = ValidationReport::new();
        let stages: [(&str, ValidationReport); 3] = [
            ("universe", validate_universe(&doc.universe)),
            ("meta", validate_meta(&doc.meta)),
            ("settings", validate_settings(&doc.settings)),
        ];
        for (section, report) in stages {
            debug!(section, errors = report.errors.len(), warnings = report.warnings.len(), "validated section");
            check_section(section, report, &mut warnings)?;
        }
        let logic_report = validate_logic(&doc.logic, &self.context_for(doc));
        check_section("logic", logic_report, &mut warnings)?;

        let symbols = allowed_symbols(&doc.universe);
        let generator = LogicGenerator::new(&self.config.validator.else_label, self.config.embed_custom_indicators);
        let logic = generator.generate_logic_code(&doc.logic, &symbols);

        let class_name = class_name(&doc.meta);
        let source = assemble(doc, &class_name, &symbols, &logic);
        info!(
            class = %class_name,
            indicators = logic.indicators_used.len(),
            warnings = warnings.warnings.len(),
            "compiled strategy"
        );
        Ok(CompiledStrategy {
            class_name,
            source,
            logic,
            report: warnings,
        })
    }

    /// Parse a JSON document and compile it.
    pub fn compile_str(&self, json: &str) -> Result<CompiledStrategy> {
        let doc: StrategyDocument = serde_json::from_str(json)?;
        self.compile_document(&doc)
    }

    pub fn compile_file(&self, path: &Path) -> Result<CompiledStrategy> {
        info!(path = %path.display(), "compiling");
        self.compile_document(&load_document(path)?)
    }
}

/// Read a specification document from disk.
pub fn load_document(path: &Path) -> Result<StrategyDocument> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Fail on errors; otherwise keep the section's warnings.
fn check_section(section: &str, report: ValidationReport, warnings: &mut ValidationReport) -> Result<()> {
    if !report.is_valid() {
        return Err(CompileError::InvalidDocument {
            section: section.to_string(),
            report,
        });
    }
    warnings.merge(report);
    Ok(())
}

/// PascalCase class name from `meta.name`.
pub fn class_name(meta: &Value) -> String {
    let name = meta.get("name").and_then(Value::as_str).unwrap_or_default();
    let mut out = String::new();
    for word in name.split(|c: char| !c.is_ascii_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    match out.chars().next() {
        None => FALLBACK_CLASS_NAME.to_string(),
        Some(c) if c.is_ascii_digit() => format!("Strategy{out}"),
        Some(_) => out,
    }
}

fn settings_block(settings: &Value) -> Block {
    let mut block = Block::new();
    for (field, method) in [("start", "SetStartDate"), ("end", "SetEndDate")] {
        let date = settings
            .get(field)
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        if let Some(d) = date {
            block.line(0, format!("self.{method}({}, {}, {})", d.year(), d.month(), d.day()));
        }
    }
    if let Some(capital) = settings.get("capital").and_then(Value::as_f64) {
        block.line(0, format!("self.SetCash({})", py_float(capital)));
    }
    if let Some(currency) = settings.get("currency").and_then(Value::as_str) {
        block.line(0, format!("self.SetAccountCurrency({})", py_str(currency)));
    }
    if let Some(benchmark) = settings.get("benchmark").and_then(Value::as_str) {
        block.line(0, format!("self.SetBenchmark({})", py_str(&benchmark.trim().to_uppercase())));
    }
    block
}

fn subscription_call(asset_class: Option<&str>) -> &'static str {
    match asset_class {
        Some("CRYPTO") => "AddCrypto",
        Some("FOREX") => "AddForex",
        Some("FUTURE") => "AddFuture",
        _ => "AddEquity",
    }
}

/// Symbol list plus one daily subscription per symbol, by asset class.
fn universe_block(universe: &Value, symbols: &[String]) -> Block {
    let assets: Vec<UniverseAsset> = universe
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|a| serde_json::from_value(a.clone()).ok())
        .collect();

    let mut block = Block::new();
    let quoted: Vec<String> = symbols.iter().map(|s| py_str(s)).collect();
    block.line(0, format!("self.symbols = [{}]", quoted.join(", ")));
    for sym in symbols {
        let class = assets
            .iter()
            .find(|a| a.symbol.trim().eq_ignore_ascii_case(sym))
            .and_then(|a| a.asset_class.as_deref());
        block.line(
            0,
            format!("self.{}({}, Resolution.Daily)", subscription_call(class), py_str(sym)),
        );
    }
    block
}

/// Imports, embedded indicator classes, then the algorithm class with
/// `Initialize`, `OnData` and the helper methods.
fn assemble(doc: &StrategyDocument, class_name: &str, symbols: &[String], logic: &GeneratedLogic) -> String {
    let description = doc
        .meta
        .get("description")
        .and_then(Value::as_str)
        .map(|d| d.replace("'''", "\"\"\""))
        .unwrap_or_else(|| "Strategy compiled from a specification document".to_string());

    let mut sections: Vec<String> = vec!["from AlgorithmImports import *".to_string()];
    if !logic.embedded_indicator_class_source.is_empty() {
        sections.push(logic.embedded_indicator_class_source.trim_end().to_string());
    }

    let mut init = Block::new();
    init.append(settings_block(&doc.settings));
    if !init.is_empty() {
        init.blank();
    }
    init.append(universe_block(&doc.universe, symbols));

    let class_source = [
        format!("class {class_name}(QCAlgorithm):"),
        format!("    '''{}'''", description.trim()),
        String::new(),
        "    def Initialize(self) -> None:".to_string(),
        "        '''Set up dates, cash, subscriptions and indicators'''".to_string(),
        init.render(),
        String::new(),
        logic.indicator_initialization_code.clone(),
        String::new(),
        logic.main_logic_code.clone(),
        String::new(),
        logic.security_check_helper_source.clone(),
    ]
    .join("\n");
    sections.push(class_source);

    let mut source = sections.join("\n\n\n");
    if !logic.helper_methods_source.is_empty() {
        source.push_str("\n\n");
        source.push_str(&logic.helper_methods_source);
    }
    source.push('\n');
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_names() {
        assert_eq!(class_name(&json!({"name": "rsi mean-reversion v2"})), "RsiMeanReversionV2");
        assert_eq!(class_name(&json!({"name": "60/40"})), "Strategy6040");
        assert_eq!(class_name(&json!({})), FALLBACK_CLASS_NAME);
    }

    #[test]
    fn settings_lines() {
        let block = settings_block(&json!({"start": "2020-01-02", "end": "2021-12-31", "capital": 50000}));
        assert_eq!(
            block.render(),
            "        self.SetStartDate(2020, 1, 2)\n        self.SetEndDate(2021, 12, 31)\n        self.SetCash(50000.0)"
        );
    }

    #[test]
    fn currency_and_benchmark_lines() {
        let block = settings_block(&json!({"currency": "EUR", "benchmark": "spy", "fees": {"perOrder": 1}}));
        assert_eq!(
            block.render(),
            "        self.SetAccountCurrency('EUR')\n        self.SetBenchmark('SPY')"
        );
    }

    #[test]
    fn subscriptions_follow_asset_class() {
        let universe = json!([{"symbol": "BTCUSD", "assetClass": "CRYPTO"}, {"symbol": "SPY"}]);
        let code = universe_block(&universe, &["BTCUSD".to_string(), "SPY".to_string()]).render();
        assert!(code.contains("self.AddCrypto('BTCUSD', Resolution.Daily)"));
        assert!(code.contains("self.AddEquity('SPY', Resolution.Daily)"));
    }
}
