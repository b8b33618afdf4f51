//! Tenant partitioning: every read carries the caller's organisation and every write is
//! stamped with it.

use crate::core::document::Document;
use crate::core::error::LrsError;
use crate::core::scope::CallerContext;
use crate::core::store::Filter;

/// Base read predicate for a caller.
pub fn read_filter(caller: &CallerContext, include_deleted: bool) -> Filter {
    Filter::tenant(&caller.organisation).with_deleted(include_deleted)
}

/// Stamp `organisation` on an incoming write.
///
/// Empty organisation is filled from the caller. A foreign organisation, or an attempt
/// to move an existing document to a different organisation, is a validation failure.
pub fn stamp(
    caller: &CallerContext,
    doc: &mut Document,
    existing: Option<&Document>,
) -> Result<(), LrsError> {
    if caller.organisation.trim().is_empty() {
        return Err(LrsError::ValidationError(
            "caller has no organisation".to_string(),
        ));
    }
    if doc.organisation.is_empty() {
        doc.organisation = caller.organisation.clone();
    }
    if doc.organisation != caller.organisation {
        return Err(LrsError::ValidationError(format!(
            "organisation '{}' does not match caller organisation '{}'",
            doc.organisation, caller.organisation
        )));
    }
    if let Some(prev) = existing
        && prev.organisation != doc.organisation
    {
        return Err(LrsError::ValidationError(format!(
            "organisation of {} cannot be reassigned",
            prev.id
        )));
    }
    Ok(())
}

/// Reject a write whose id is already taken by another tenant's document.
pub fn check_owner(doc: &Document, owner: Option<&str>) -> Result<(), LrsError> {
    match owner {
        Some(org) if org != doc.organisation => Err(LrsError::ValidationError(format!(
            "document {} belongs to another organisation",
            doc.id
        ))),
        _ => Ok(()),
    }
}
