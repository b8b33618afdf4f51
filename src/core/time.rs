//! Clock and identifier helpers shared by documents, the audit log and CLI output.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue, json};
use ulid::Ulid;

/// Unix seconds with a `Z` suffix, e.g. `1771220592Z`. Audit lines use this form.
pub fn now_epoch_z() -> String {
    format!("{}Z", Utc::now().timestamp())
}

/// `CREATED_AT`, `UPDATED_AT` and `deletedAt` values.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Storage id for a new document. ULIDs sort by creation time.
pub fn new_document_id() -> String {
    Ulid::new().to_string()
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Wrap a CLI result: fixed header keys, then the keys of `extra`.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut out = Map::new();
    out.insert("envelope_version".into(), json!("1.0.0"));
    out.insert("ts".into(), json!(now_epoch_z()));
    out.insert("event_id".into(), json!(new_event_id()));
    out.insert("cmd".into(), json!(cmd));
    out.insert("status".into(), json!(status));
    if let JsonValue::Object(extra) = extra {
        out.extend(extra);
    }
    JsonValue::Object(out)
}
