//! Soft deletes: mark, stamp and scrub instead of removing.

use crate::core::document::Document;
use crate::core::model::{EntityDef, FieldKind};
use serde_json::Value as JsonValue;

pub fn is_deleted(doc: &Document) -> bool {
    doc.deleted
}

/// Set the delete marker and scrub every field outside the keep set.
///
/// Text fields become `""`; numbers, dates and relation pointers are dropped. Marking a
/// document that is already deleted only refreshes `deletedAt`.
pub fn mark_deleted(def: &EntityDef, doc: &mut Document, now: &str) {
    doc.deleted = true;
    doc.deleted_at = Some(now.to_string());

    let names: Vec<String> = doc.fields.keys().cloned().collect();
    for name in names {
        if def.keeps(&name) {
            continue;
        }
        match def.field(&name).map(|f| f.kind) {
            Some(FieldKind::Text) => doc.set(&name, JsonValue::String(String::new())),
            _ => {
                doc.clear(&name);
            }
        }
    }
}

/// Fields still carrying a value after a soft delete.
pub fn retained_fields(doc: &Document) -> Vec<&str> {
    doc.fields
        .iter()
        .filter(|(_, v)| match v {
            JsonValue::Null => false,
            JsonValue::String(s) => !s.is_empty(),
            _ => true,
        })
        .map(|(k, _)| k.as_str())
        .collect()
}
