//! The stored document shape shared by every entity collection.

use crate::core::error::LrsError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Keys managed by the document envelope rather than the entity's field table.
pub const RESERVED_KEYS: &[&str] = &[
    "_id",
    "organisation",
    "deleted",
    "deletedAt",
    "CREATED_AT",
    "UPDATED_AT",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip)]
    pub collection: String,
    #[serde(default)]
    pub organisation: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(rename = "CREATED_AT", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "UPDATED_AT", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl Document {
    pub fn new(collection: &str, id: &str, organisation: &str) -> Self {
        Self {
            id: id.to_string(),
            collection: collection.to_string(),
            organisation: organisation.to_string(),
            ..Default::default()
        }
    }

    /// Rebuild a document from its stored JSON body.
    pub fn from_body(collection: &str, body: &str) -> Result<Self, LrsError> {
        let mut doc: Document = serde_json::from_str(body)?;
        doc.collection = collection.to_string();
        Ok(doc)
    }

    pub fn to_body(&self) -> Result<String, LrsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: &str, value: JsonValue) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn clear(&mut self, field: &str) -> bool {
        self.fields.remove(field).is_some()
    }

    /// Value usable as a matching-key component. Absent, null and empty strings are not.
    pub fn key_value(&self, field: &str) -> Option<&JsonValue> {
        match self.fields.get(field) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        }
    }

    /// Ids held by a relation field, whether it is singular or multiple.
    pub fn references(&self, field: &str) -> Vec<String> {
        match self.fields.get(field) {
            Some(JsonValue::String(id)) if !id.is_empty() => vec![id.clone()],
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn references_id(&self, field: &str, id: &str) -> bool {
        self.references(field).iter().any(|r| r == id)
    }

    /// Point a singular relation at `id`. Returns whether the document changed.
    pub fn set_reference(&mut self, field: &str, id: &str) -> bool {
        if self.fields.get(field).and_then(|v| v.as_str()) == Some(id) {
            return false;
        }
        self.set(field, JsonValue::String(id.to_string()));
        true
    }

    /// Clear a singular relation, but only while it still points at `id`.
    pub fn clear_reference(&mut self, field: &str, id: &str) -> bool {
        if self.fields.get(field).and_then(|v| v.as_str()) == Some(id) {
            self.clear(field)
        } else {
            false
        }
    }

    /// Add `id` to a multiple relation unless already present.
    pub fn add_reference(&mut self, field: &str, id: &str) -> bool {
        let mut ids = self.references(field);
        let present = ids.iter().any(|r| r == id);
        if present && matches!(self.fields.get(field), Some(JsonValue::Array(_))) {
            return false;
        }
        if !present {
            ids.push(id.to_string());
        }
        self.set(field, id_array(ids));
        true
    }

    /// Filter `id` out of a multiple relation.
    pub fn remove_reference(&mut self, field: &str, id: &str) -> bool {
        let ids = self.references(field);
        if !ids.iter().any(|r| r == id) {
            return false;
        }
        let kept = ids.into_iter().filter(|r| r != id).collect();
        self.set(field, id_array(kept));
        true
    }
}

pub fn id_array(ids: Vec<String>) -> JsonValue {
    JsonValue::Array(ids.into_iter().map(JsonValue::String).collect())
}
