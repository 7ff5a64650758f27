use crate::curriculum;
use crate::ipc::helpers::{
    get_half, get_optional_half, get_required_i64, get_required_str, to_json, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::NameKind;
use crate::store;
use rusqlite::Connection;
use serde_json::{json, Value};
use tracing::info;

fn list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let semester = get_optional_half(params)?.map(|h| h.semester());
    let entries = store::list_curriculums(conn, semester)?;
    Ok(json!({ "entries": entries }))
}

fn hierarchy(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let half = get_half(params)?;
    let entries = store::list_curriculums(conn, Some(half.semester()))?;
    Ok(json!({
        "semester": half.semester(),
        "groups": curriculum::build_hierarchy(&entries),
    }))
}

fn for_group(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let group_name = get_required_str(params, "groupName")?;
    let half = get_half(params)?;
    let entries = store::list_curriculums_for_group(conn, group_name.trim(), half.semester())?;
    let subjects = store::list_names(conn, NameKind::Subject)?;
    Ok(json!({
        "entries": entries,
        "availableSubjects": curriculum::available_subjects(&subjects, &entries),
    }))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let half = get_half(params)?;
    let total_hour = get_required_i64(params, "totalHour")?;
    let group_name = get_required_str(params, "groupName")?;
    let subject_name = get_required_str(params, "subjectName")?;
    let entry = curriculum::create_entry(conn, half, total_hour, &group_name, &subject_name)?;
    to_json(&entry)
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = get_required_i64(params, "id")?;
    let existing = store::get_curriculum(conn, id)?;
    let deleted = store::delete_curriculum(conn, id)?;
    if let Some(entry) = existing.filter(|_| deleted) {
        info!(
            id,
            group = %entry.group_name,
            subject = %entry.subject_name,
            "plan entry deleted"
        );
    }
    Ok(json!({ "deleted": deleted }))
}

/// Hours may arrive as typed text or as a JSON number.
fn plan_rows(params: &Value) -> Result<Vec<(String, String)>, HandlerErr> {
    let Some(rows) = params.get("rows").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("rows must be an array"));
    };
    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            return Err(HandlerErr {
                code: "bad_params",
                message: "each row must be an object".to_string(),
                details: Some(json!({ "row": idx })),
            });
        };
        let subject = obj
            .get("subjectName")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let hours = match obj.get("hours") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        out.push((subject, hours));
    }
    Ok(out)
}

fn replace_plan(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let group_name = get_required_str(params, "groupName")?;
    let half = get_half(params)?;
    let rows = plan_rows(params)?;
    let outcome = curriculum::replace_plan(conn, &group_name, half, &rows)?;
    to_json(&outcome)
}

fn filter_options(conn: &Connection) -> Result<Value, HandlerErr> {
    let entries = store::list_curriculums(conn, None)?;
    to_json(&curriculum::filter_options(&entries))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "curriculum.list" => Some(with_db(state, req, list)),
        "curriculum.hierarchy" => Some(with_db(state, req, hierarchy)),
        "curriculum.forGroup" => Some(with_db(state, req, for_group)),
        "curriculum.create" => Some(with_db(state, req, create)),
        "curriculum.delete" => Some(with_db(state, req, delete)),
        "curriculum.replacePlan" => Some(with_db(state, req, replace_plan)),
        "curriculum.filterOptions" => Some(with_db(state, req, |conn, _| filter_options(conn))),
        _ => None,
    }
}
