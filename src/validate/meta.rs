use serde_json::Value;

use super::ValidationReport;
use crate::spec::value::type_name;

pub const CATEGORIES: [&str; 9] = [
    "arbitrage",
    "buy_hold",
    "long_short",
    "market_neutral",
    "mean_reversion",
    "momentum",
    "other",
    "tactical",
    "trend_following",
];

const MAX_NAME_LEN: usize = 500;
const MAX_DESCRIPTION_LEN: usize = 5000;

const SCHEMA_FIELDS: [&str; 4] = ["name", "description", "version", "category"];
const EXPECTED_EXTRA_FIELDS: [&str; 6] = [
    "source",
    "source_id",
    "source_url",
    "complexity_score",
    "created_at",
    "updated_at",
];

/// `^\d+\.\d+(\.\d+)?$`
fn version_matches(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    (2..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Validate the `meta` section: `name` and `version` are required.
pub fn validate_meta(meta: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(obj) = meta.as_object() else {
        report.error(format!("meta must be an object, got {}", type_name(meta)));
        return report;
    };

    match obj.get("name") {
        None => report.error("Missing required field 'name' in meta"),
        Some(Value::String(name)) if name.is_empty() => report.error("meta.name cannot be empty"),
        Some(Value::String(name)) if name.chars().count() > MAX_NAME_LEN => {
            report.error(format!("meta.name exceeds maximum length of {MAX_NAME_LEN} characters"))
        }
        Some(Value::String(_)) => {}
        Some(other) => report.error(format!("meta.name must be a string, got {}", type_name(other))),
    }

    match obj.get("version") {
        None => report.error("Missing required field 'version' in meta"),
        Some(Value::String(v)) if version_matches(v) => {}
        Some(Value::String(v)) => report.error(format!(
            "meta.version '{v}' does not match required pattern (e.g. '1.0', '1.2.3')"
        )),
        Some(other) => report.error(format!("meta.version must be a string, got {}", type_name(other))),
    }

    match obj.get("description") {
        None | Some(Value::Null) => {}
        Some(Value::String(d)) if d.chars().count() > MAX_DESCRIPTION_LEN => report.error(format!(
            "meta.description exceeds maximum length of {MAX_DESCRIPTION_LEN} characters"
        )),
        Some(Value::String(_)) => {}
        Some(other) => report.error(format!("meta.description must be a string, got {}", type_name(other))),
    }

    match obj.get("category") {
        None | Some(Value::Null) => {}
        Some(Value::String(c)) if CATEGORIES.contains(&c.as_str()) => {}
        Some(Value::String(c)) => report.error(format!(
            "meta.category '{c}' is not a valid category. Valid options: {}",
            CATEGORIES.join(", ")
        )),
        Some(other) => report.error(format!("meta.category must be a string, got {}", type_name(other))),
    }

    for key in obj
        .keys()
        .filter(|k| !SCHEMA_FIELDS.contains(&k.as_str()) && !EXPECTED_EXTRA_FIELDS.contains(&k.as_str()))
    {
        report.warn(format!("Unexpected additional property 'meta.{key}' found"));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_meta() {
        let r = validate_meta(&json!({"name": "Dip buyer", "version": "1.2.3", "category": "mean_reversion", "source": "x"}));
        assert!(r.is_valid(), "{r}");
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn required_fields() {
        let r = validate_meta(&json!({}));
        assert_eq!(r.errors.len(), 2, "{r}");
        assert!(!validate_meta(&json!(null)).is_valid());
    }

    #[test]
    fn version_pattern() {
        assert!(version_matches("1.0"));
        assert!(version_matches("10.2.33"));
        assert!(!version_matches("1"));
        assert!(!version_matches("1.0.0.0"));
        assert!(!version_matches("1.x"));
        assert!(!version_matches("1..0"));
    }

    #[test]
    fn category_and_extra_fields() {
        let r = validate_meta(&json!({"name": "a", "version": "1.0", "category": "scalping", "owner": "me"}));
        assert_eq!(r.errors.len(), 1, "{r}");
        assert_eq!(r.warnings, vec!["Unexpected additional property 'meta.owner' found"]);
    }
}
