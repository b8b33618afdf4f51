//! Shape validation against an entity's field table.
//!
//! Runs before anything is persisted. Every problem found is reported in one
//! `ValidationError`, prefixed with the offending field path.

use crate::core::document::{Document, RESERVED_KEYS};
use crate::core::error::LrsError;
use crate::core::model::{EntityDef, FieldDef, FieldKind};
use serde_json::{Map, Value as JsonValue};

/// Fill declared numeric defaults for fields the document does not carry.
pub fn apply_defaults(def: &EntityDef, doc: &mut Document) {
    for field in def.fields {
        if let Some(default) = field.default_number
            && doc.get(field.name).is_none_or(JsonValue::is_null)
            && let Some(n) = serde_json::Number::from_f64(default)
        {
            doc.set(field.name, JsonValue::Number(n));
        }
    }
}

pub fn validate_document(def: &EntityDef, doc: &Document) -> Result<(), LrsError> {
    let mut problems = Vec::new();

    for (name, value) in &doc.fields {
        match def.field(name) {
            Some(field) => check_value(field, value, &mut problems),
            None => problems.push(format!("`{}`: not a field of {}", name, def.name)),
        }
    }

    if !doc.deleted {
        for field in def.fields.iter().filter(|f| f.required) {
            let missing = match doc.get(field.name) {
                None | Some(JsonValue::Null) => true,
                Some(JsonValue::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                problems.push(format!("`{}`: is required", field.name));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(LrsError::ValidationError(format!(
            "{} validation failed: {}",
            def.name,
            problems.join("; ")
        )))
    }
}

/// Reject caller-supplied keys the engine owns: envelope keys other than `_id` and
/// `organisation` and every relation pointer.
pub fn check_writable_input(def: &EntityDef, input: &Map<String, JsonValue>) -> Result<(), LrsError> {
    let mut problems = Vec::new();
    for key in input.keys() {
        if matches!(key.as_str(), "_id" | "organisation" | "deleted") {
            continue;
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            problems.push(format!("`{}`: is managed by the store", key));
        } else if def.field(key).is_some_and(|f| f.kind.is_relation()) {
            problems.push(format!("`{}`: relation pointers are maintained automatically", key));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(LrsError::ValidationError(problems.join("; ")))
    }
}

fn check_value(field: &FieldDef, value: &JsonValue, problems: &mut Vec<String>) {
    if value.is_null() {
        return;
    }
    let name = field.name;
    match field.kind {
        FieldKind::Text => {
            let Some(s) = value.as_str() else {
                problems.push(format!("`{}`: expected a string", name));
                return;
            };
            if let Some(max) = field.max_len
                && s.chars().count() > max
            {
                problems.push(format!("`{}`: longer than {} characters", name, max));
            }
            if let Some(allowed) = field.one_of
                && !s.is_empty()
                && !allowed.contains(&s)
            {
                problems.push(format!("`{}`: `{}` is not an allowed value", name, s));
            }
        }
        FieldKind::Number => {
            let Some(n) = value.as_f64() else {
                problems.push(format!("`{}`: expected a number", name));
                return;
            };
            if let Some((min, max)) = field.range
                && (n < min || n > max)
            {
                problems.push(format!("`{}`: {} is outside {}..={}", name, n, min, max));
            }
        }
        FieldKind::Date => match value.as_str() {
            Some(s) if is_date(s) => {}
            _ => problems.push(format!("`{}`: expected a YYYY-MM-DD or RFC 3339 date", name)),
        },
        FieldKind::Reference => {
            if !value.is_string() {
                problems.push(format!("`{}`: expected a document id", name));
            }
        }
        FieldKind::ReferenceList => {
            let ok = value
                .as_array()
                .is_some_and(|items| items.iter().all(JsonValue::is_string));
            if !ok {
                problems.push(format!("`{}`: expected a list of document ids", name));
            }
        }
    }
}

fn is_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::DateTime::parse_from_rfc3339(s).is_ok()
}
