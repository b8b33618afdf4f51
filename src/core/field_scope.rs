//! Field-level read filtering and entity-level write authorization.
//!
//! Pure functions over the entity tables and a document. Nothing here touches the
//! store; filtering runs on the value handed back to the caller, never on stored data.

use crate::core::document::Document;
use crate::core::error::LrsError;
use crate::core::model::EntityDef;
use crate::core::scope::ScopeSet;
use serde_json::{Map, Value as JsonValue};

/// Envelope keys every caller may see.
pub const ALWAYS_VISIBLE: &[&str] = &[
    "_id",
    "organisation",
    "deleted",
    "deletedAt",
    "CREATED_AT",
    "UPDATED_AT",
];

pub fn can_read_field(def: &EntityDef, field: &str, scopes: &ScopeSet) -> bool {
    if ALWAYS_VISIBLE.contains(&field) || scopes.is_universal() {
        return true;
    }
    def.field(field)
        .map(|f| scopes.intersects(f.read))
        .unwrap_or(false)
}

/// Project `doc` down to the fields `scopes` may read.
pub fn filter_read(def: &EntityDef, doc: &Document, scopes: &ScopeSet) -> Map<String, JsonValue> {
    let full = match doc.to_json() {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    };
    full.into_iter()
        .filter(|(key, _)| can_read_field(def, key, scopes))
        .collect()
}

pub fn authorize_write(def: &EntityDef, scopes: &ScopeSet) -> Result<(), LrsError> {
    if scopes.intersects(def.write_scopes) {
        Ok(())
    } else {
        Err(LrsError::AuthorizationError(format!(
            "scopes [{}] may not write {}",
            scopes.to_list(),
            def.name
        )))
    }
}

pub fn authorize_read(def: &EntityDef, scopes: &ScopeSet) -> Result<(), LrsError> {
    if scopes.intersects(def.read_scopes) {
        Ok(())
    } else {
        Err(LrsError::AuthorizationError(format!(
            "scopes [{}] may not read {}",
            scopes.to_list(),
            def.name
        )))
    }
}
