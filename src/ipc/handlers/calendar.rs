use super::setup::resolve_base_year;
use crate::calendar;
use crate::curriculum::{self, ReportFilters};
use crate::ipc::response::ok;
use crate::ipc::helpers::{
    get_half, get_optional_str, get_required_i64, get_string_list, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, DATE_FORMAT};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

fn format_dates(dates: &[NaiveDate]) -> Vec<String> {
    dates
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect()
}

fn get_month(params: &serde_json::Value) -> Result<u32, HandlerErr> {
    let month = get_required_i64(params, "month")?;
    u32::try_from(month).map_err(|_| HandlerErr::bad_params("month must be between 1 and 12"))
}

fn get_year(params: &serde_json::Value) -> Result<i32, HandlerErr> {
    let year = get_required_i64(params, "year")?;
    i32::try_from(year).map_err(|_| HandlerErr::bad_params("year out of range"))
}

fn base_year(conn: Option<&Connection>, params: &serde_json::Value) -> Result<i32, HandlerErr> {
    resolve_base_year(conn, params).map_err(HandlerErr::bad_params)
}

fn month_view(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let year = get_year(params)?;
    let month = get_month(params)?;
    let dates = calendar::teaching_days(year, month)?;
    Ok(json!({
        "year": year,
        "month": month,
        "dates": format_dates(&dates),
        "headers": calendar::grid_headers(&dates),
    }))
}

fn half_year_view(
    conn: Option<&Connection>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let half = get_half(params)?;
    let base = base_year(conn, params)?;
    let year = half.calendar_year(base);
    let mut months = Vec::with_capacity(half.months().len());
    for &month in half.months() {
        let dates = calendar::teaching_days(year, month)?;
        months.push(json!({
            "year": year,
            "month": month,
            "teachingDays": dates.len(),
            "dates": format_dates(&dates),
        }));
    }
    let (start, end) = calendar::half_year_date_range(half, base)?;
    Ok(json!({
        "half": half.as_str(),
        "semester": half.semester(),
        "otherHalf": half.toggled().as_str(),
        "baseYear": base,
        "months": months,
        "startDate": start.format(DATE_FORMAT).to_string(),
        "endDate": end.format(DATE_FORMAT).to_string(),
        "sundayCount": calendar::sundays_in_half_year(half, base)?,
    }))
}

fn grid_view(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let half = get_half(params)?;
    let month = get_month(params)?;
    if !half.contains_month(month) {
        return Err(HandlerErr::bad_params(format!(
            "month {} is not part of the {} half-year",
            month,
            half.as_str()
        )));
    }
    let year = half.calendar_year(base_year(Some(conn), params)?);
    let dates = calendar::teaching_days(year, month)?;

    let filters = ReportFilters {
        groups: get_string_list(params, "groups")?.into_iter().collect(),
        subjects: get_string_list(params, "subjects")?.into_iter().collect(),
    };
    let curricula = store::list_curriculums(conn, Some(half.semester()))?;
    let logs = store::list_work_days(conn, Some(half.semester()), None)?;
    let search = get_optional_str(params, "search").unwrap_or_default();

    let rows: Vec<_> =
        curriculum::build_month_grid(&filters.apply(&curricula), &logs, &dates, half.semester())
            .into_iter()
            .filter(|row| curriculum::row_matches_search(row, &search))
            .collect();

    Ok(json!({
        "half": half.as_str(),
        "semester": half.semester(),
        "year": year,
        "month": month,
        "dates": format_dates(&dates),
        "headers": calendar::grid_headers(&dates),
        "rows": rows,
    }))
}

fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calendar.month" => Some(respond(req, month_view(&req.params))),
        // The saved base year is used when a workspace is open.
        "calendar.halfYear" => Some(respond(req, half_year_view(state.db.as_ref(), &req.params))),
        "calendar.grid" => Some(with_db(state, req, grid_view)),
        _ => None,
    }
}
