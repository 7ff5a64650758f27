use crate::error::{HourError, HourResult};
use crate::model::{CurriculumEntry, NameKind, WorkDayLog};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---- groups / subjects ----

pub fn list_names(conn: &Connection, kind: NameKind) -> HourResult<Vec<String>> {
    let sql = format!("SELECT name FROM {} ORDER BY rowid", kind.table());
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Case-insensitive substring search (`LIKE` folds ASCII case). `%` and `_`
/// in the query match literally.
pub fn search_names(conn: &Connection, kind: NameKind, query: &str) -> HourResult<Vec<String>> {
    let sql = format!(
        "SELECT name FROM {} WHERE name LIKE ? ESCAPE '\\' ORDER BY rowid",
        kind.table()
    );
    let pattern = format!("%{}%", escape_like(query.trim()));
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map([pattern], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

pub fn name_exists(conn: &Connection, kind: NameKind, name: &str) -> HourResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE name = ?", kind.table());
    let found = conn
        .query_row(&sql, [name], |r| r.get::<_, i64>(0))
        .optional()?;
    Ok(found.is_some())
}

/// Stored spelling of `name`, compared trimmed and case-insensitively.
pub fn find_name_ci(conn: &Connection, kind: NameKind, name: &str) -> HourResult<Option<String>> {
    let key = name.trim().to_lowercase();
    Ok(list_names(conn, kind)?
        .into_iter()
        .find(|n| n.trim().to_lowercase() == key))
}

pub fn create_name(conn: &Connection, kind: NameKind, name: &str) -> HourResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HourError::validation(format!(
            "{} name must not be empty",
            kind.entity()
        )));
    }
    if let Some(existing) = find_name_ci(conn, kind, name)? {
        return Err(HourError::validation(format!(
            "{} '{}' already exists as '{}'",
            kind.entity(),
            name,
            existing
        )));
    }
    let sql = format!("INSERT INTO {}(name) VALUES(?)", kind.table());
    conn.execute(&sql, [name])?;
    info!(kind = kind.entity(), name, "created");
    Ok(name.to_string())
}

/// Deletes the name together with every curriculum and work-day row that
/// references it. Returns false when the name was not stored.
pub fn delete_name(conn: &Connection, kind: NameKind, name: &str) -> HourResult<bool> {
    let tx = conn.unchecked_transaction()?;
    let curriculums = tx.execute(
        &format!("DELETE FROM curriculums WHERE {} = ?", kind.ref_column()),
        [name],
    )?;
    let work_days = tx.execute(
        &format!("DELETE FROM workDays WHERE {} = ?", kind.ref_column()),
        [name],
    )?;
    let removed = tx.execute(
        &format!("DELETE FROM {} WHERE name = ?", kind.table()),
        [name],
    )?;
    tx.commit()?;

    if removed > 0 {
        info!(
            kind = kind.entity(),
            name, curriculums, work_days, "deleted with dependent rows"
        );
    }
    Ok(removed > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameOutcome {
    pub curriculums: usize,
    pub work_days: usize,
}

/// Renames a group/subject and rewrites every row that references the old name.
pub fn rename_name(
    conn: &Connection,
    kind: NameKind,
    old_name: &str,
    new_name: &str,
) -> HourResult<RenameOutcome> {
    let old_name = old_name.trim();
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(HourError::validation(format!(
            "new {} name must not be empty",
            kind.entity()
        )));
    }
    if !name_exists(conn, kind, old_name)? {
        return Err(HourError::NotFound {
            entity: kind.entity(),
            key: old_name.to_string(),
        });
    }
    if new_name.to_lowercase() == old_name.to_lowercase() {
        return Err(HourError::validation("new name matches the old name"));
    }
    if let Some(existing) = find_name_ci(conn, kind, new_name)? {
        return Err(HourError::validation(format!(
            "{} '{}' already exists as '{}'",
            kind.entity(),
            new_name,
            existing
        )));
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        &format!("UPDATE {} SET name = ? WHERE name = ?", kind.table()),
        [new_name, old_name],
    )?;
    let curriculums = tx.execute(
        &format!(
            "UPDATE curriculums SET {col} = ? WHERE {col} = ?",
            col = kind.ref_column()
        ),
        [new_name, old_name],
    )?;
    let work_days = tx.execute(
        &format!(
            "UPDATE workDays SET {col} = ? WHERE {col} = ?",
            col = kind.ref_column()
        ),
        [new_name, old_name],
    )?;
    tx.commit()?;

    info!(
        kind = kind.entity(),
        old_name, new_name, curriculums, work_days, "renamed"
    );
    Ok(RenameOutcome {
        curriculums,
        work_days,
    })
}

// ---- curriculums ----

fn curriculum_from_row(r: &Row<'_>) -> rusqlite::Result<CurriculumEntry> {
    Ok(CurriculumEntry {
        id: r.get(0)?,
        semester: r.get(1)?,
        total_hour: r.get(2)?,
        group_name: r.get(3)?,
        subject_name: r.get(4)?,
    })
}

pub fn list_curriculums(conn: &Connection, semester: Option<i64>) -> HourResult<Vec<CurriculumEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, semester, total_hour, group_name, subject_name
         FROM curriculums
         WHERE (?1 IS NULL OR semester = ?1)
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map([semester], curriculum_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_curriculums_for_group(
    conn: &Connection,
    group_name: &str,
    semester: i64,
) -> HourResult<Vec<CurriculumEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, semester, total_hour, group_name, subject_name
         FROM curriculums
         WHERE group_name = ? AND semester = ?
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map((group_name, semester), curriculum_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_curriculum(conn: &Connection, id: i64) -> HourResult<Option<CurriculumEntry>> {
    let row = conn
        .query_row(
            "SELECT id, semester, total_hour, group_name, subject_name
             FROM curriculums WHERE id = ?",
            [id],
            curriculum_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn insert_curriculum(
    conn: &Connection,
    semester: i64,
    total_hour: i64,
    group_name: &str,
    subject_name: &str,
) -> HourResult<CurriculumEntry> {
    conn.execute(
        "INSERT INTO curriculums(semester, total_hour, group_name, subject_name)
         VALUES(?, ?, ?, ?)",
        (semester, total_hour, group_name, subject_name),
    )?;
    Ok(CurriculumEntry {
        id: conn.last_insert_rowid(),
        semester,
        total_hour,
        group_name: group_name.to_string(),
        subject_name: subject_name.to_string(),
    })
}

pub fn delete_curriculum(conn: &Connection, id: i64) -> HourResult<bool> {
    let n = conn.execute("DELETE FROM curriculums WHERE id = ?", [id])?;
    Ok(n > 0)
}

/// Replaces the whole plan of (group, semester) in one transaction.
/// Returns (deleted, inserted).
pub fn replace_curriculum_rows(
    conn: &Connection,
    group_name: &str,
    semester: i64,
    rows: &[(String, i64)],
) -> HourResult<(usize, usize)> {
    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute(
        "DELETE FROM curriculums WHERE group_name = ? AND semester = ?",
        (group_name, semester),
    )?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO curriculums(semester, total_hour, group_name, subject_name)
             VALUES(?, ?, ?, ?)",
        )?;
        for (subject_name, total_hour) in rows {
            insert.execute((semester, *total_hour, group_name, subject_name))?;
        }
    }
    tx.commit()?;
    Ok((deleted, rows.len()))
}

// ---- work days ----

fn work_day_from_row(r: &Row<'_>) -> rusqlite::Result<WorkDayLog> {
    let raw_date: String = r.get(1)?;
    let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(WorkDayLog {
        id: r.get(0)?,
        date,
        subject_name: r.get(2)?,
        group_name: r.get(3)?,
        semester: r.get(4)?,
        hours: r.get(5)?,
    })
}

pub fn list_work_days(
    conn: &Connection,
    semester: Option<i64>,
    date: Option<NaiveDate>,
) -> HourResult<Vec<WorkDayLog>> {
    let date = date.map(|d| d.format(DATE_FORMAT).to_string());
    let mut stmt = conn.prepare(
        "SELECT id, date, subject_name, group_name, semester, hours
         FROM workDays
         WHERE (?1 IS NULL OR semester = ?1)
           AND (?2 IS NULL OR date = ?2)
         ORDER BY date, id",
    )?;
    let rows = stmt
        .query_map((semester, date), work_day_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_work_day(
    conn: &Connection,
    date: NaiveDate,
    group_name: &str,
    subject_name: &str,
    semester: i64,
) -> HourResult<Option<WorkDayLog>> {
    let row = conn
        .query_row(
            "SELECT id, date, subject_name, group_name, semester, hours
             FROM workDays
             WHERE date = ? AND group_name = ? AND subject_name = ? AND semester = ?
             ORDER BY id
             LIMIT 1",
            (
                date.format(DATE_FORMAT).to_string(),
                group_name,
                subject_name,
                semester,
            ),
            work_day_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn insert_work_day(
    conn: &Connection,
    date: NaiveDate,
    group_name: &str,
    subject_name: &str,
    semester: i64,
    hours: f64,
) -> HourResult<i64> {
    conn.execute(
        "INSERT INTO workDays(date, subject_name, group_name, semester, hours)
         VALUES(?, ?, ?, ?, ?)",
        (
            date.format(DATE_FORMAT).to_string(),
            subject_name,
            group_name,
            semester,
            hours,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_work_day_hours(conn: &Connection, id: i64, hours: f64) -> HourResult<bool> {
    let n = conn.execute("UPDATE workDays SET hours = ? WHERE id = ?", (hours, id))?;
    Ok(n > 0)
}

pub fn delete_work_day(conn: &Connection, id: i64) -> HourResult<bool> {
    let n = conn.execute("DELETE FROM workDays WHERE id = ?", [id])?;
    Ok(n > 0)
}
