use crate::ipc::response::ok;
use crate::ipc::helpers::{get_required_str, get_string_list, to_json, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::NameKind;
use crate::names::{self, SqliteNames};
use crate::store;
use rusqlite::Connection;
use serde_json::json;

fn list(conn: &Connection, kind: NameKind) -> Result<serde_json::Value, HandlerErr> {
    let names = store::list_names(conn, kind)?;
    Ok(json!({ "names": names }))
}

fn search(
    conn: &Connection,
    kind: NameKind,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let query = get_required_str(params, "query")?;
    let names = store::search_names(conn, kind, &query)?;
    Ok(json!({ "names": names }))
}

fn create(
    conn: &Connection,
    kind: NameKind,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let created = store::create_name(conn, kind, &name)?;
    Ok(json!({ "name": created }))
}

fn delete(
    conn: &Connection,
    kind: NameKind,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let deleted = store::delete_name(conn, kind, &name)?;
    Ok(json!({ "deleted": deleted }))
}

fn rename(
    conn: &Connection,
    kind: NameKind,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let old_name = get_required_str(params, "oldName")?;
    let new_name = get_required_str(params, "newName")?;
    let outcome = store::rename_name(conn, kind, &old_name, &new_name)?;
    Ok(json!({
        "name": new_name.trim(),
        "curriculumsUpdated": outcome.curriculums,
        "workDaysUpdated": outcome.work_days,
    }))
}

fn sync(
    conn: &Connection,
    kind: NameKind,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let edited = get_string_list(params, "names")?;
    let mut target = SqliteNames { conn, kind };
    let summary = names::apply_sync(&mut target, &edited)?;
    to_json(&summary)
}

fn check_edit(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let candidate = get_required_str(params, "candidate")?;
    let list_names = get_string_list(params, "listNames")?;
    let lookup_names = get_string_list(params, "lookupNames")?;
    match names::check_list_edit(&candidate, &list_names, &lookup_names) {
        Ok(value) => Ok(json!({ "accepted": true, "value": value })),
        Err(e) => Ok(json!({ "accepted": false, "value": null, "message": e.to_string() })),
    }
}

fn split_method(method: &str) -> Option<(NameKind, &str)> {
    let (prefix, action) = method.split_once('.')?;
    let kind = match prefix {
        "groups" => NameKind::Group,
        "subjects" => NameKind::Subject,
        _ => return None,
    };
    Some((kind, action))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (kind, action) = split_method(&req.method)?;
    let resp = match action {
        "list" => with_db(state, req, |conn, _| list(conn, kind)),
        "search" => with_db(state, req, |conn, p| search(conn, kind, p)),
        "create" => with_db(state, req, |conn, p| create(conn, kind, p)),
        "delete" => with_db(state, req, |conn, p| delete(conn, kind, p)),
        "rename" => with_db(state, req, |conn, p| rename(conn, kind, p)),
        "sync" => with_db(state, req, |conn, p| sync(conn, kind, p)),
        // Pure check over the lists the client is editing.
        "checkEdit" => match check_edit(&req.params) {
            Ok(v) => ok(&req.id, v),
            Err(e) => e.response(&req.id),
        },
        _ => return None,
    };
    Some(resp)
}
