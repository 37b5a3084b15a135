use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const INTENTION_YES: &str = "SIM";
pub const INTENTION_NO: &str = "NAO";

pub fn open_db(data_dir: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(data_dir)?;
    let conn = Connection::open(crate::config::db_path_in(data_dir))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates the three persistent stores. Factored out of open_db so tests can
/// run against an in-memory connection.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            student_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            class_code TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS responses(
            student_id TEXT NOT NULL,
            lunch_date TEXT NOT NULL,
            name TEXT NOT NULL,
            class_code TEXT NOT NULL,
            intention TEXT NOT NULL CHECK (intention IN ('SIM', 'NAO')),
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY(student_id, lunch_date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_responses_date ON responses(lunch_date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_responses_class_date ON responses(class_code, lunch_date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS imported_headcount(
            class_code TEXT NOT NULL,
            lunch_date TEXT NOT NULL,
            yes_count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY(class_code, lunch_date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_imported_headcount_date ON imported_headcount(lunch_date)",
        [],
    )?;

    Ok(())
}

/// Latest write wins per student identifier.
pub fn upsert_student(
    conn: &Connection,
    student_id: &str,
    name: &str,
    class_code: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO students(student_id, name, class_code)
         VALUES(?, ?, ?)
         ON CONFLICT(student_id) DO UPDATE SET
           name = excluded.name,
           class_code = excluded.class_code,
           updated_at = CURRENT_TIMESTAMP",
        (student_id, name, class_code),
    )?;
    Ok(())
}

/// Full-row replace keyed by (student, date); name and class refresh too.
pub fn upsert_response(
    conn: &Connection,
    student_id: &str,
    lunch_date: NaiveDate,
    name: &str,
    class_code: &str,
    attending: bool,
) -> anyhow::Result<()> {
    let intention = if attending { INTENTION_YES } else { INTENTION_NO };
    conn.execute(
        "INSERT INTO responses(student_id, lunch_date, name, class_code, intention)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(student_id, lunch_date) DO UPDATE SET
           name = excluded.name,
           class_code = excluded.class_code,
           intention = excluded.intention,
           updated_at = CURRENT_TIMESTAMP",
        (
            student_id,
            lunch_date.to_string(),
            name,
            class_code,
            intention,
        ),
    )?;
    Ok(())
}

/// Replaces the asserted headcount for (class, date). Counts are clamped to
/// zero so the store never holds a negative value.
pub fn upsert_headcount(
    conn: &Connection,
    class_code: &str,
    lunch_date: NaiveDate,
    yes_count: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO imported_headcount(class_code, lunch_date, yes_count)
         VALUES(?, ?, ?)
         ON CONFLICT(class_code, lunch_date) DO UPDATE SET
           yes_count = excluded.yes_count,
           updated_at = CURRENT_TIMESTAMP",
        (class_code, lunch_date.to_string(), yes_count.max(0)),
    )?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StudentRow {
    pub student_id: String,
    pub name: String,
    pub class_code: String,
}

pub fn find_student(conn: &Connection, student_id: &str) -> anyhow::Result<Option<StudentRow>> {
    let row = conn
        .query_row(
            "SELECT student_id, name, class_code FROM students WHERE student_id = ?",
            [student_id],
            |r| {
                Ok(StudentRow {
                    student_id: r.get(0)?,
                    name: r.get(1)?,
                    class_code: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn students_in_class(conn: &Connection, class_code: &str) -> anyhow::Result<Vec<StudentRow>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, name, class_code
         FROM students
         WHERE class_code = ?
         ORDER BY name",
    )?;
    let rows = stmt
        .query_map([class_code], |r| {
            Ok(StudentRow {
                student_id: r.get(0)?,
                name: r.get(1)?,
                class_code: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
