//! Per-column type coercion of raw CSV values.
//!
//! Coercion is a total, deterministic function: every input maps to exactly
//! one output and nothing throws. Failures downgrade to a safe fallback —
//! unparseable numerics and dates pass the original string through, list
//! parse failures wrap the original value — because shape problems were
//! already the validator's job.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Value};

use crate::schema::{Coercion, TargetSchema};

/// Coerce one record according to the schema's column table.
///
/// Same key set as the input; blank strings become JSON null, numeric
/// columns become numbers, list columns become arrays of strings, date
/// columns become RFC 3339 strings, everything else passes through.
///
/// Only string values are coerced. Records arriving from row edits carry
/// already-typed JSON (numbers, arrays, nulls); those keep their value
/// as-is.
pub fn coerce_record(record: &Value, schema: &TargetSchema) -> Value {
    let mut out = Map::new();
    if let Some(obj) = record.as_object() {
        for (name, value) in obj {
            let coerced = match value {
                Value::String(raw) => coerce_value(raw, schema.coercion_for(name)),
                other => other.clone(),
            };
            out.insert(name.clone(), coerced);
        }
    }
    Value::Object(out)
}

/// Coerce a single raw value.
pub fn coerce_value(raw: &str, coercion: Coercion) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        // Absent-value marker; never coerced further.
        return Value::Null;
    }

    match coercion {
        Coercion::Text => json!(trimmed),
        Coercion::Numeric => coerce_numeric(trimmed),
        Coercion::List => coerce_list(trimmed),
        Coercion::Date => coerce_date(trimmed),
    }
}

fn coerce_numeric(value: &str) -> Value {
    if let Ok(n) = value.parse::<i64>() {
        return json!(n);
    }
    match value.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        // Shape problems were caught by the validator; pass through so a
        // skipped validation still cannot make coercion fail.
        None => json!(value),
    }
}

/// Comma splitting drops segments that trim to empty, so "a,,b" and
/// "a,b," both yield two elements: stray separators are not data.
fn coerce_list(value: &str) -> Value {
    if value.starts_with('[') && value.ends_with(']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(value) {
            let strings: Vec<Value> = items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => json!(s.trim()),
                    other => json!(other.to_string()),
                })
                .collect();
            return Value::Array(strings);
        }
        // Looked bracketed but did not parse: one-element fallback.
        return json!([value]);
    }

    if value.contains(',') {
        let items: Vec<Value> = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| json!(s))
            .collect();
        return Value::Array(items);
    }

    json!([value])
}

fn coerce_date(value: &str) -> Value {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return json!(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return json!(to_utc_string(naive));
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return json!(to_utc_string(date.and_hms_opt(0, 0, 0).expect("midnight")));
        }
    }
    // Not a recognizable instant: pass through unchanged.
    json!(value)
}

fn to_utc_string(naive: NaiveDateTime) -> String {
    Utc.from_utc_datetime(&naive)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Stamp the created-timestamp column with the current time when the
/// coerced record carries no value for it.
pub fn stamp_created(record: &mut Value, schema: &TargetSchema) {
    if let Some(obj) = record.as_object_mut() {
        let missing = match obj.get(schema.created_column) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            obj.insert(
                schema.created_column.to_string(),
                json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }
    }
}
