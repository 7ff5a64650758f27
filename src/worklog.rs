use crate::calendar::HalfYear;
use crate::error::{HourError, HourResult};
use crate::model::NameKind;
use crate::store;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

/// One edited calendar cell.
#[derive(Debug, Clone)]
pub struct CellEdit<'a> {
    pub date: NaiveDate,
    pub group_name: &'a str,
    pub subject_name: &'a str,
    pub half: HalfYear,
    pub raw_text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CellOutcome {
    Inserted { id: i64, hours: f64 },
    Updated { id: i64, hours: f64 },
    Deleted { id: i64 },
    Unchanged,
}

/// Blank means "nothing taught" (`None`), which is not the same as zero.
pub fn parse_hours(raw: &str) -> HourResult<Option<f64>> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    let v: f64 = t
        .parse()
        .map_err(|_| HourError::validation("hours must be numeric"))?;
    if !v.is_finite() {
        return Err(HourError::validation("hours must be numeric"));
    }
    if v < 0.0 {
        return Err(HourError::validation("hours cannot be negative"));
    }
    Ok(Some(v))
}

/// Applies a cell edit with at most one storage mutation. Re-applying the same
/// edit touches the same row, so the operation is idempotent.
pub fn apply_cell_edit(conn: &Connection, edit: &CellEdit<'_>) -> HourResult<CellOutcome> {
    let group_name = edit.group_name.trim();
    let subject_name = edit.subject_name.trim();
    if group_name.is_empty() || subject_name.is_empty() {
        return Err(HourError::validation("group and subject are required"));
    }
    let semester = edit.half.semester();

    let hours = parse_hours(edit.raw_text)?;
    let existing = store::find_work_day(conn, edit.date, group_name, subject_name, semester)?;

    let Some(hours) = hours else {
        return match existing {
            Some(row) => {
                store::delete_work_day(conn, row.id)?;
                info!(id = row.id, date = %edit.date, group = group_name, subject = subject_name, "hours cleared");
                Ok(CellOutcome::Deleted { id: row.id })
            }
            None => {
                debug!(date = %edit.date, group = group_name, subject = subject_name, "empty cell, nothing stored");
                Ok(CellOutcome::Unchanged)
            }
        };
    };

    match existing {
        Some(row) => {
            store::update_work_day_hours(conn, row.id, hours)?;
            info!(id = row.id, hours, date = %edit.date, "hours updated");
            Ok(CellOutcome::Updated { id: row.id, hours })
        }
        None => {
            if !store::name_exists(conn, NameKind::Group, group_name)? {
                return Err(HourError::validation(format!("unknown group '{}'", group_name)));
            }
            if !store::name_exists(conn, NameKind::Subject, subject_name)? {
                return Err(HourError::validation(format!(
                    "unknown subject '{}'",
                    subject_name
                )));
            }
            let id = store::insert_work_day(conn, edit.date, group_name, subject_name, semester, hours)?;
            info!(id, hours, date = %edit.date, group = group_name, subject = subject_name, "hours logged");
            Ok(CellOutcome::Inserted { id, hours })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::init_schema(&conn).expect("schema");
        store::create_name(&conn, NameKind::Group, "G1").expect("group");
        store::create_name(&conn, NameKind::Subject, "S1").expect("subject");
        conn
    }

    fn edit<'a>(day: u32, text: &'a str) -> CellEdit<'a> {
        CellEdit {
            date: NaiveDate::from_ymd_opt(2024, 9, day).expect("date"),
            group_name: "G1",
            subject_name: "S1",
            half: HalfYear::First,
            raw_text: text,
        }
    }

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM workDays", [], |r| r.get(0))
            .expect("count")
    }

    #[test]
    fn parse_hours_rules() {
        assert_eq!(parse_hours("  ").expect("blank"), None);
        assert_eq!(parse_hours(" 3.5 ").expect("number"), Some(3.5));
        assert_eq!(parse_hours("0").expect("zero"), Some(0.0));
        let e = parse_hours("abc").expect_err("text");
        assert_eq!(e.to_string(), "hours must be numeric");
        let e = parse_hours("-1").expect_err("negative");
        assert_eq!(e.to_string(), "hours cannot be negative");
        assert!(parse_hours("NaN").is_err());
        assert!(parse_hours("inf").is_err());
    }

    #[test]
    fn same_value_twice_updates_one_row() {
        let conn = open();
        let first = apply_cell_edit(&conn, &edit(2, "2")).expect("insert");
        let CellOutcome::Inserted { id, .. } = first else {
            panic!("expected insert, got {:?}", first);
        };
        let again = apply_cell_edit(&conn, &edit(2, "2")).expect("update");
        assert_eq!(again, CellOutcome::Updated { id, hours: 2.0 });
        let changed = apply_cell_edit(&conn, &edit(2, "3.5")).expect("update");
        assert_eq!(changed, CellOutcome::Updated { id, hours: 3.5 });
        assert_eq!(row_count(&conn), 1);
    }

    #[test]
    fn clearing_deletes_then_is_a_noop() {
        let conn = open();
        apply_cell_edit(&conn, &edit(3, "3.5")).expect("insert");
        let cleared = apply_cell_edit(&conn, &edit(3, "")).expect("clear");
        assert!(matches!(cleared, CellOutcome::Deleted { .. }));
        assert_eq!(row_count(&conn), 0);
        assert_eq!(
            apply_cell_edit(&conn, &edit(3, "  ")).expect("clear again"),
            CellOutcome::Unchanged
        );
    }

    #[test]
    fn invalid_text_never_touches_storage() {
        let conn = open();
        apply_cell_edit(&conn, &edit(4, "1")).expect("insert");
        for bad in ["abc", "-2", "1,5"] {
            let e = apply_cell_edit(&conn, &edit(4, bad)).expect_err("rejected");
            assert_eq!(e.code(), "validation_failed");
        }
        let row = store::find_work_day(&conn, edit(4, "").date, "G1", "S1", 1)
            .expect("find")
            .expect("still there");
        assert_eq!(row.hours, 1.0);
    }

    #[test]
    fn cells_are_keyed_by_semester_and_date() {
        let conn = open();
        apply_cell_edit(&conn, &edit(5, "1")).expect("insert");
        apply_cell_edit(&conn, &edit(6, "1")).expect("insert other day");
        let mut other_half = edit(5, "4");
        other_half.half = HalfYear::Second;
        let out = apply_cell_edit(&conn, &other_half).expect("separate row");
        assert!(matches!(out, CellOutcome::Inserted { .. }));
        assert_eq!(row_count(&conn), 3);
    }

    #[test]
    fn unknown_names_are_rejected_on_insert() {
        let conn = open();
        let mut e = edit(7, "2");
        e.group_name = "Ghost";
        let err = apply_cell_edit(&conn, &e).expect_err("orphan");
        assert_eq!(err.code(), "validation_failed");
        assert_eq!(row_count(&conn), 0);
    }
}
