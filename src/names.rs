//! Reconciliation of an edited group/subject list against the stored names.
//!
//! Names compare trimmed and lower-cased; the original spelling is kept for the
//! actual create/delete calls.

use crate::error::{HourError, HourResult};
use crate::model::NameKind;
use crate::store;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn key_set(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .map(|n| key(n))
        .filter(|k| !k.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDelta {
    pub to_delete: BTreeSet<String>,
    pub to_add: BTreeSet<String>,
}

/// `to_delete = stored - edited`, `to_add = edited - stored`, on lower-cased keys.
pub fn sync_delta(edited: &[String], stored: &[String]) -> SyncDelta {
    let edited_keys = key_set(edited);
    let stored_keys = key_set(stored);
    SyncDelta {
        to_delete: stored_keys.difference(&edited_keys).cloned().collect(),
        to_add: edited_keys.difference(&stored_keys).cloned().collect(),
    }
}

fn stored_spelling<'a>(stored: &'a [String], k: &str) -> Option<&'a str> {
    stored.iter().map(String::as_str).find(|n| key(n) == k)
}

fn edited_spelling<'a>(edited: &'a [String], k: &str) -> Option<&'a str> {
    edited.iter().map(|n| n.trim()).find(|n| key(n) == k)
}

/// Storage seam used by [`apply_sync`].
pub trait NameStore {
    fn stored_names(&self) -> HourResult<Vec<String>>;
    /// Returns false when nothing was stored under `name`.
    fn delete(&mut self, name: &str) -> HourResult<bool>;
    fn create(&mut self, name: &str) -> HourResult<()>;
}

pub struct SqliteNames<'a> {
    pub conn: &'a Connection,
    pub kind: NameKind,
}

impl NameStore for SqliteNames<'_> {
    fn stored_names(&self) -> HourResult<Vec<String>> {
        store::list_names(self.conn, self.kind)
    }

    fn delete(&mut self, name: &str) -> HourResult<bool> {
        store::delete_name(self.conn, self.kind, name)
    }

    fn create(&mut self, name: &str) -> HourResult<()> {
        store::create_name(self.conn, self.kind, name).map(|_| ())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    #[serde(flatten)]
    pub delta: SyncDelta,
    pub deleted: Vec<String>,
    pub added: Vec<String>,
    pub errors: Vec<String>,
}

/// Applies the delta name by name. A failing name is recorded in `errors` and
/// the remaining names are still processed; each success commits on its own.
pub fn apply_sync<S: NameStore>(store: &mut S, edited: &[String]) -> HourResult<SyncSummary> {
    let stored = store.stored_names()?;
    let delta = sync_delta(edited, &stored);
    let mut summary = SyncSummary::default();

    for k in &delta.to_delete {
        let Some(original) = stored_spelling(&stored, k) else {
            continue;
        };
        match store.delete(original) {
            Ok(true) => summary.deleted.push(original.to_string()),
            Ok(false) => warn!(name = original, "already gone, nothing to delete"),
            Err(e) => {
                warn!(name = original, error = %e, "delete failed");
                summary
                    .errors
                    .push(format!("failed to delete '{}': {}", original, e));
            }
        }
    }

    for k in &delta.to_add {
        let Some(original) = edited_spelling(edited, k) else {
            continue;
        };
        match store.create(original) {
            Ok(()) => summary.added.push(original.to_string()),
            Err(e) => {
                warn!(name = original, error = %e, "create failed");
                summary
                    .errors
                    .push(format!("failed to create '{}': {}", original, e));
            }
        }
    }

    info!(
        deleted = summary.deleted.len(),
        added = summary.added.len(),
        errors = summary.errors.len(),
        "name list synchronized"
    );
    summary.delta = delta;
    Ok(summary)
}

/// Live check for a freshly typed or renamed list entry.
///
/// Returns the trimmed value to keep, or `Ok(None)` when the entry is blank.
/// A value whose key collides with another entry of the editable list or the
/// paired lookup list is rejected so the edit can be reverted.
pub fn check_list_edit(
    candidate: &str,
    other_entries: &[String],
    lookup_entries: &[String],
) -> HourResult<Option<String>> {
    let value = candidate.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let k = key(value);
    if other_entries.iter().any(|n| key(n) == k) {
        return Err(HourError::validation(format!(
            "'{}' already exists in the list (case-insensitive)",
            value
        )));
    }
    if lookup_entries.iter().any(|n| key(n) == k) {
        return Err(HourError::validation(format!(
            "'{}' already exists in the selection list (case-insensitive)",
            value
        )));
    }
    Ok(Some(value.to_string()))
}
