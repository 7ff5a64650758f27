use super::setup::resolve_base_year;
use crate::calendar::{self, HalfYear};
use crate::ipc::helpers::{
    get_date, get_half, get_optional_half, get_optional_i64, get_required_i64, get_required_str,
    to_json, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store;
use crate::worklog::{self, CellEdit};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::{json, Value};

fn list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let semester = get_optional_half(params)?.map(|h| h.semester());
    let date = match params.get("date") {
        Some(v) if !v.is_null() => Some(get_date(params, "date")?),
        _ => None,
    };
    let logs = store::list_work_days(conn, semester, date)?;
    Ok(json!({ "workDays": logs }))
}

fn has_date(params: &Value) -> bool {
    params.get("date").is_some_and(|v| !v.is_null())
}

/// A cell is addressed either by `date` or by the grid position
/// (`year`, `month`, `column`). Grid months must belong to `half`.
fn cell_date(params: &Value, half: HalfYear) -> Result<NaiveDate, HandlerErr> {
    if has_date(params) {
        return get_date(params, "date");
    }
    let year = i32::try_from(get_required_i64(params, "year")?)
        .map_err(|_| HandlerErr::bad_params("year out of range"))?;
    let month = u32::try_from(get_required_i64(params, "month")?)
        .map_err(|_| HandlerErr::bad_params("month must be between 1 and 12"))?;
    if !half.contains_month(month) {
        return Err(HandlerErr::bad_params(format!(
            "month {} is not part of the {} half-year",
            month,
            half.as_str()
        )));
    }
    let column = get_optional_i64(params, "column")?
        .ok_or_else(|| HandlerErr::bad_params("missing date or column"))?;
    let dates = calendar::teaching_days(year, month)?;
    usize::try_from(column)
        .ok()
        .and_then(|c| calendar::date_for_column(&dates, c))
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: "column is not a day column".to_string(),
            details: Some(json!({ "column": column, "dayColumns": dates.len() })),
        })
}

fn apply_cell_edit(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let half = get_half(params)?;
    let mut params = params.clone();
    // Grid positions without a year are relative to the half-year.
    if !has_date(&params) && params.get("year").map_or(true, |v| v.is_null()) {
        let base = resolve_base_year(Some(conn), &params).map_err(HandlerErr::bad_params)?;
        params["year"] = json!(half.calendar_year(base));
    }
    let date = cell_date(&params, half)?;
    let group_name = get_required_str(&params, "groupName")?;
    let subject_name = get_required_str(&params, "subjectName")?;
    let text = get_required_str(&params, "text")?;
    let outcome = worklog::apply_cell_edit(
        conn,
        &CellEdit {
            date,
            group_name: &group_name,
            subject_name: &subject_name,
            half,
            raw_text: &text,
        },
    )?;
    to_json(&outcome)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "workDays.list" => Some(with_db(state, req, list)),
        "workDays.applyCellEdit" => Some(with_db(state, req, apply_cell_edit)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NameKind;

    #[test]
    fn cell_date_from_explicit_date() {
        let d = cell_date(&json!({ "date": "2024-09-03" }), HalfYear::First)
            .ok()
            .expect("date");
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 9, 3).expect("date"));
    }

    #[test]
    fn cell_date_from_grid_column() {
        // Sep 2024: column 2 is Mon 2nd, column 7 is Sat 7th, column 8 skips Sunday.
        let at = |column: i64| {
            cell_date(&json!({ "year": 2024, "month": 9, "column": column }), HalfYear::First)
                .ok()
                .expect("column date")
        };
        assert_eq!(at(2), NaiveDate::from_ymd_opt(2024, 9, 2).expect("date"));
        assert_eq!(at(7), NaiveDate::from_ymd_opt(2024, 9, 7).expect("date"));
        assert_eq!(at(8), NaiveDate::from_ymd_opt(2024, 9, 9).expect("date"));
    }

    #[test]
    fn label_and_out_of_range_columns_are_rejected() {
        for column in [0, 1, 27, -3] {
            let Err(e) = cell_date(
                &json!({ "year": 2024, "month": 9, "column": column }),
                HalfYear::First,
            ) else {
                panic!("column {} accepted", column);
            };
            assert_eq!(e.code, "bad_params");
        }
    }

    #[test]
    fn grid_month_outside_the_half_is_rejected() {
        let Err(e) = cell_date(
            &json!({ "year": 2025, "month": 9, "column": 2 }),
            HalfYear::Second,
        ) else {
            panic!("September accepted for the second half");
        };
        assert_eq!(e.code, "bad_params");
        // An explicit date is taken as given.
        assert!(cell_date(&json!({ "date": "2024-09-03" }), HalfYear::Second).is_ok());
    }

    #[test]
    fn null_date_uses_the_grid_position_and_base_year() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        crate::db::init_schema(&conn).expect("schema");
        store::create_name(&conn, NameKind::Group, "G1").expect("group");
        store::create_name(&conn, NameKind::Subject, "S1").expect("subject");

        let v = apply_cell_edit(
            &conn,
            &json!({
                "half": "second",
                "baseYear": 2024,
                "date": null,
                "year": null,
                "month": 1,
                "column": 2,
                "groupName": "G1",
                "subjectName": "S1",
                "text": "2"
            }),
        )
        .ok()
        .expect("cell edit");
        assert_eq!(v["action"], json!("inserted"));

        let logs = store::list_work_days(&conn, Some(2), None).expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"));

        let Err(e) = apply_cell_edit(
            &conn,
            &json!({
                "half": "second",
                "baseYear": 2024,
                "date": null,
                "month": 9,
                "column": 2,
                "groupName": "G1",
                "subjectName": "S1",
                "text": "2"
            }),
        ) else {
            panic!("September edit accepted for the second half");
        };
        assert_eq!(e.code, "bad_params");
    }
}
