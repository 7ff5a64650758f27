use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "hour_track.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS groups(
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    // group_name/subject_name reference groups/subjects by name only; integrity
    // is kept by the store (cascading rename/delete), not by the engine.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS curriculums(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            semester INTEGER NOT NULL,
            total_hour INTEGER NOT NULL,
            group_name TEXT NOT NULL,
            subject_name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_curriculums_group_semester
         ON curriculums(group_name, semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS workDays(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            subject_name TEXT NOT NULL,
            group_name TEXT NOT NULL,
            semester INTEGER NOT NULL,
            hours REAL NOT NULL
        )",
        [],
    )?;
    ensure_work_days_semester(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_work_days_cell
         ON workDays(date, group_name, subject_name, semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn ensure_work_days_semester(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "workDays", "semester")? {
        return Ok(());
    }

    // Early databases logged hours without a semester. Derive it from the
    // month: September..December belong to the first half-year.
    conn.execute(
        "ALTER TABLE workDays ADD COLUMN semester INTEGER NOT NULL DEFAULT 2",
        [],
    )?;
    conn.execute(
        "UPDATE workDays
         SET semester = 1
         WHERE CAST(substr(date, 6, 2) AS INTEGER) >= 9",
        [],
    )?;
    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
