use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CompileError, Result};

/// Metric names a specification may reference.
pub const DEFAULT_ALLOWED_METRICS: &[&str] = &[
    "current-price",
    "sma",
    "ema",
    "rsi",
    "cumulative-return",
    "moving-avg-price",
    "moving-avg-return",
    "std-dev-price",
    "std-dev-return",
    "max-drawdown",
    "volatility",
    "returns",
    "drawdown",
    "vix",
    "month",
    "day-of-week",
    "day-of-month",
    "day-of-year",
    "moving-average-price",
    "exponential-moving-average-price",
    "standard-deviation-price",
];

/// Group description marking an else branch when no config overrides it.
pub const DEFAULT_ELSE_LABEL: &str = "Else branch";

/// Knobs for the logic validator. Every field has a default so a config file
/// only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Groups and container conditions must have children.
    pub require_children: bool,
    pub require_description: bool,
    /// Non-calendar metric operands must name a symbol.
    pub require_symbol_for_metrics: bool,
    /// Apply else-branch placement rules to condition children.
    pub validate_else: bool,
    pub else_required: bool,
    /// Description that marks a group as an else branch, compared
    /// case-insensitively after trimming.
    pub else_label: String,
    pub else_must_be_last: bool,
    pub else_require_children: bool,
    pub require_universe_nonempty: bool,
    /// Metric names operands and filters may use.
    pub allowed_metrics: Vec<String>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            require_children: true,
            require_description: false,
            require_symbol_for_metrics: true,
            validate_else: true,
            else_required: false,
            else_label: DEFAULT_ELSE_LABEL.to_string(),
            else_must_be_last: true,
            else_require_children: true,
            require_universe_nonempty: true,
            allowed_metrics: DEFAULT_ALLOWED_METRICS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl ValidatorOptions {
    /// Else label in the form used for comparisons.
    pub fn else_label_normalized(&self) -> String {
        self.else_label.trim().to_lowercase()
    }
}

/// Top-level compiler configuration, usually loaded with [`CompilerConfig::from_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub validator: ValidatorOptions,
    /// Embed the source of custom indicator classes into the generated file.
    pub embed_custom_indicators: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorOptions::default(),
            embed_custom_indicators: true,
        }
    }
}

impl CompilerConfig {
    /// Load from a JSON file. Missing fields keep their defaults; an empty else
    /// label is rejected.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: CompilerConfig = serde_json::from_str(&raw)
            .map_err(|e| CompileError::Config(format!("{}: {}", path.display(), e)))?;
        if config.validator.else_label.trim().is_empty() {
            return Err(CompileError::Config(format!(
                "{}: validator.else_label must not be empty",
                path.display()
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: CompilerConfig =
            serde_json::from_str(r#"{"validator": {"else_label": "otherwise"}}"#).unwrap();
        assert_eq!(config.validator.else_label, "otherwise");
        assert!(config.validator.else_must_be_last);
        assert!(config.embed_custom_indicators);
        assert_eq!(config.validator.allowed_metrics.len(), DEFAULT_ALLOWED_METRICS.len());
    }

    #[test]
    fn empty_else_label_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"validator": {"else_label": "  "}}"#).unwrap();
        assert!(matches!(CompilerConfig::from_file(&path), Err(CompileError::Config(_))));
    }
}
