use super::setup::default_report_half;
use crate::calendar::HalfYear;
use crate::curriculum::{self, ReportFilters, ReportRow};
use crate::ipc::helpers::{get_optional_half, get_string_list, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn report_half(conn: &Connection, params: &Value) -> Result<HalfYear, HandlerErr> {
    if let Some(half) = get_optional_half(params)? {
        return Ok(half);
    }
    let saved = default_report_half(conn).map_err(|e| HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
        details: None,
    })?;
    Ok(HalfYear::parse(&saved)?)
}

fn load_report(conn: &Connection, params: &Value) -> Result<(HalfYear, Vec<ReportRow>), HandlerErr> {
    let half = report_half(conn, params)?;
    let filters = ReportFilters {
        groups: get_string_list(params, "groups")?.into_iter().collect(),
        subjects: get_string_list(params, "subjects")?.into_iter().collect(),
    };
    let curricula = store::list_curriculums(conn, Some(half.semester()))?;
    let logs = store::list_work_days(conn, Some(half.semester()), None)?;
    let rows = curriculum::build_report(&curricula, &logs, half.semester(), &filters);
    Ok((half, rows))
}

fn row_json(row: &ReportRow) -> Value {
    json!({
        "groupName": row.group_name,
        "subjectName": row.subject_name,
        "plannedHours": row.planned_hours,
        "loggedHours": row.logged_hours,
        "remainingHours": row.remaining_hours(),
    })
}

fn hours(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let (half, rows) = load_report(conn, params)?;
    Ok(json!({
        "half": half.as_str(),
        "semester": half.semester(),
        "rows": rows.iter().map(row_json).collect::<Vec<_>>(),
    }))
}

fn render_csv(rows: &[ReportRow]) -> String {
    let mut out = String::from("group,subject,planned,logged,remaining\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_quote(&row.group_name),
            csv_quote(&row.subject_name),
            row.planned_hours,
            curriculum::format_hours(row.logged_hours),
            curriculum::format_hours(row.remaining_hours()),
        ));
    }
    out
}

fn export_csv(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let out_path = match params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return Err(HandlerErr::bad_params("missing outPath")),
    };
    let (half, rows) = load_report(conn, params)?;
    let io_failed = |e: std::io::Error| HandlerErr {
        code: "io_failed",
        message: e.to_string(),
        details: Some(json!({ "path": out_path })),
    };

    let path = PathBuf::from(&out_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_failed)?;
    }
    let mut file = std::fs::File::create(&path).map_err(io_failed)?;
    file.write_all(render_csv(&rows).as_bytes())
        .map_err(io_failed)?;

    info!(path = %out_path, rows = rows.len(), semester = half.semester(), "report exported");
    Ok(json!({
        "path": out_path,
        "rowCount": rows.len(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.hours" => Some(with_db(state, req, hours)),
        "reports.exportCsv" => Some(with_db(state, req, export_csv)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group: &str, subject: &str, planned: i64, logged: f64) -> ReportRow {
        ReportRow {
            group_name: group.to_string(),
            subject_name: subject.to_string(),
            planned_hours: planned,
            logged_hours: logged,
        }
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        assert_eq!(csv_quote("Math"), "Math");
        assert_eq!(csv_quote("Art, Design"), "\"Art, Design\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_has_header_and_remaining_column() {
        let text = render_csv(&[row("G1", "S1", 10, 4.5), row("G 2, evening", "S1", 2, 3.0)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "group,subject,planned,logged,remaining");
        assert_eq!(lines[1], "G1,S1,10,4.5,5.5");
        assert_eq!(lines[2], "\"G 2, evening\",S1,2,3.0,-1.0");
    }
}
