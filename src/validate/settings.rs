use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::ValidationReport;
use crate::spec::value::{as_number, type_name};

pub const REBALANCE_VALUES: [&str; 7] = ["daily", "intraday", "monthly", "none", "quarterly", "weekly", "yearly"];
pub const SLIPPAGE_MODELS: [&str; 3] = ["fixed", "percentage", "volumeImpact"];

const KNOWN_FIELDS: [&str; 8] = [
    "capital",
    "start",
    "end",
    "rebalance",
    "currency",
    "benchmark",
    "fees",
    "slippage",
];
const FEE_FIELDS: [&str; 3] = ["perOrder", "perShare", "percentage"];
const SLIPPAGE_FIELDS: [&str; 2] = ["model", "value"];

/// Sorted keys of `obj` outside `known`, comma separated.
fn unknown_keys(obj: &Map<String, Value>, known: &[&str]) -> Option<String> {
    let mut unknown: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|k| !known.contains(k))
        .collect();
    if unknown.is_empty() {
        return None;
    }
    unknown.sort_unstable();
    Some(unknown.join(", "))
}

fn non_negative(value: &Value, field: &str, report: &mut ValidationReport) -> Option<f64> {
    match as_number(value) {
        None => {
            report.error(format!("{field} must be a number"));
            None
        }
        Some(v) if v < 0.0 => {
            report.error(format!("{field} must be >= 0"));
            None
        }
        Some(v) => Some(v),
    }
}

/// `fees`: `perOrder` and `perShare` >= 0, `percentage` in [0, 1], nothing else.
fn validate_fees(fees: &Value, report: &mut ValidationReport) {
    let Some(obj) = fees.as_object() else {
        report.error(format!("settings.fees must be an object, got {}", type_name(fees)));
        return;
    };
    for field in ["perOrder", "perShare"] {
        if let Some(v) = obj.get(field) {
            non_negative(v, &format!("settings.fees.{field}"), report);
        }
    }
    if let Some(v) = obj.get("percentage") {
        if non_negative(v, "settings.fees.percentage", report).is_some_and(|p| p > 1.0) {
            report.error("settings.fees.percentage must be <= 1");
        }
    }
    if let Some(unknown) = unknown_keys(obj, &FEE_FIELDS) {
        report.error(format!("Unknown fee fields: {unknown}"));
    }
}

fn validate_slippage(slippage: &Value, report: &mut ValidationReport) {
    let Some(obj) = slippage.as_object() else {
        report.error(format!("settings.slippage must be an object, got {}", type_name(slippage)));
        return;
    };
    match obj.get("model") {
        None => {}
        Some(Value::String(m)) if SLIPPAGE_MODELS.contains(&m.as_str()) => {}
        Some(Value::String(_)) => report.error(format!(
            "settings.slippage.model must be one of: {}",
            SLIPPAGE_MODELS.join(", ")
        )),
        Some(other) => report.error(format!(
            "settings.slippage.model must be a string, got {}",
            type_name(other)
        )),
    }
    if let Some(v) = obj.get("value") {
        non_negative(v, "settings.slippage.value", report);
    }
    if let Some(unknown) = unknown_keys(obj, &SLIPPAGE_FIELDS) {
        report.error(format!("Unknown slippage fields: {unknown}"));
    }
}

fn parse_date(settings: &Map<String, Value>, field: &str, report: &mut ValidationReport) -> Option<NaiveDate> {
    match settings.get(field)? {
        Value::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) if s.len() == 10 => Some(d),
            _ => {
                report.error(format!("settings.{field} date must be in YYYY-MM-DD format"));
                None
            }
        },
        other => {
            report.error(format!("settings.{field} date must be a string, got {}", type_name(other)));
            None
        }
    }
}

/// Checks on the `settings` section. Absent settings are valid; every field
/// is optional, unknown top-level keys only warn.
pub fn validate_settings(settings: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();
    let obj = match settings {
        Value::Null => return report,
        Value::Object(obj) => obj,
        other => {
            report.error(format!("settings must be an object, got {}", type_name(other)));
            return report;
        }
    };

    if let Some(capital) = obj.get("capital") {
        if !as_number(capital).is_some_and(|c| c > 0.0) {
            report.error("settings.capital must be a positive number");
        }
    }

    let start = parse_date(obj, "start", &mut report);
    let end = parse_date(obj, "end", &mut report);
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            report.error("settings.start must be on or before settings.end");
        }
    }

    if let Some(rebalance) = obj.get("rebalance") {
        if !rebalance.as_str().is_some_and(|r| REBALANCE_VALUES.contains(&r)) {
            report.error(format!(
                "settings.rebalance must be one of: {}",
                REBALANCE_VALUES.join(", ")
            ));
        }
    }

    if let Some(currency) = obj.get("currency") {
        let ok = currency
            .as_str()
            .is_some_and(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_uppercase()));
        if !ok {
            report.error("settings.currency must be a 3-letter uppercase code");
        }
    }

    if let Some(benchmark) = obj.get("benchmark") {
        if !benchmark.is_string() {
            report.error(format!("settings.benchmark must be a string, got {}", type_name(benchmark)));
        }
    }
    if let Some(fees) = obj.get("fees") {
        validate_fees(fees, &mut report);
    }
    if let Some(slippage) = obj.get("slippage") {
        validate_slippage(slippage, &mut report);
    }

    for key in obj.keys().filter(|k| !KNOWN_FIELDS.contains(&k.as_str())) {
        report.warn(format!("Unexpected settings property 'settings.{key}' ignored"));
    }
    report
}
