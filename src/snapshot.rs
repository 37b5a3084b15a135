use crate::calendar;
use crate::classes;
use crate::config::Config;
use crate::db;
use crate::imports;
use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const SNAPSHOT_FORMAT: &str = "almoco-snapshot-v1";
const MANIFEST_ENTRY: &str = "manifest.json";
const STUDENTS_ENTRY: &str = "sheets/students.csv";
const RESPONSES_ENTRY: &str = "sheets/responses.csv";
const HEADCOUNT_ENTRY: &str = "sheets/imported_headcount.csv";

const FILE_PREFIX: &str = "almoco_snapshot_";
const FILE_SUFFIX: &str = ".zip";

// Restored sheets may be hand-edited, so the header is discovered by
// candidate names rather than fixed positions.
const CLASS_KEYS: [&str; 2] = ["class_code", "turma"];
const DATE_KEYS: [&str; 3] = ["lunch_date", "data_almoco", "data"];
const COUNT_KEYS: [&str; 2] = ["yes_count", "sim"];

/// Serializes the full contents of all three stores into one dated zip
/// archive. One archive per calendar day; a same-day write replaces it.
pub fn write_snapshot(conn: &Connection, config: &Config) -> anyhow::Result<PathBuf> {
    let dir = config.snapshot_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;

    let today = chrono::Local::now().date_naive();
    let path = dir.join(format!("{}{}{}", FILE_PREFIX, today, FILE_SUFFIX));

    let out = File::create(&path)
        .with_context(|| format!("failed to create snapshot file {}", path.display()))?;
    let mut zip = ZipWriter::new(out);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": SNAPSHOT_FORMAT,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "writtenAt": chrono::Local::now().to_rfc3339(),
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())
        .context("failed to write manifest entry")?;

    zip.start_file(STUDENTS_ENTRY, opts)
        .context("failed to start students entry")?;
    zip.write_all(dump_students(conn)?.as_bytes())?;

    zip.start_file(RESPONSES_ENTRY, opts)
        .context("failed to start responses entry")?;
    zip.write_all(dump_responses(conn)?.as_bytes())?;

    zip.start_file(HEADCOUNT_ENTRY, opts)
        .context("failed to start headcount entry")?;
    zip.write_all(dump_headcount(conn)?.as_bytes())?;

    zip.finish().context("failed to finalize snapshot")?;

    prune_old_snapshots(&dir, config.snapshot_retention);
    Ok(path)
}

fn dump_students(conn: &Connection) -> anyhow::Result<String> {
    let mut csv = String::from("student_id,name,class_code,updated_at\n");
    let mut stmt = conn.prepare(
        "SELECT student_id, name, class_code, updated_at
         FROM students ORDER BY class_code, name",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            imports::csv_quote(&row.get::<_, String>(0)?),
            imports::csv_quote(&row.get::<_, String>(1)?),
            imports::csv_quote(&row.get::<_, String>(2)?),
            imports::csv_quote(&row.get::<_, String>(3)?),
        ));
    }
    Ok(csv)
}

fn dump_responses(conn: &Connection) -> anyhow::Result<String> {
    let mut csv = String::from("student_id,lunch_date,name,class_code,intention,updated_at\n");
    let mut stmt = conn.prepare(
        "SELECT student_id, lunch_date, name, class_code, intention, updated_at
         FROM responses ORDER BY lunch_date, class_code, name",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            imports::csv_quote(&row.get::<_, String>(0)?),
            imports::csv_quote(&row.get::<_, String>(1)?),
            imports::csv_quote(&row.get::<_, String>(2)?),
            imports::csv_quote(&row.get::<_, String>(3)?),
            imports::csv_quote(&row.get::<_, String>(4)?),
            imports::csv_quote(&row.get::<_, String>(5)?),
        ));
    }
    Ok(csv)
}

fn dump_headcount(conn: &Connection) -> anyhow::Result<String> {
    let mut csv = String::from("class_code,lunch_date,yes_count,updated_at\n");
    let mut stmt = conn.prepare(
        "SELECT class_code, lunch_date, yes_count, updated_at
         FROM imported_headcount ORDER BY lunch_date, class_code",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            imports::csv_quote(&row.get::<_, String>(0)?),
            imports::csv_quote(&row.get::<_, String>(1)?),
            row.get::<_, i64>(2)?,
            imports::csv_quote(&row.get::<_, String>(3)?),
        ));
    }
    Ok(csv)
}

/// Keeps the `retain` most recent archives. Best-effort: listing and
/// deletion failures are swallowed.
pub fn prune_old_snapshots(dir: &Path, retain: usize) {
    if retain == 0 {
        return;
    }
    for stale in snapshot_files_newest_first(dir).into_iter().skip(retain) {
        let _ = std::fs::remove_file(stale);
    }
}

/// Archive paths sorted newest first by (mtime, name). Names embed the
/// snapshot date, so the name breaks mtime ties deterministically.
pub fn snapshot_files_newest_first(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<(SystemTime, String, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(FILE_PREFIX) || !name.ends_with(FILE_SUFFIX) {
            continue;
        }
        let mtime = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((mtime, name.to_string(), path));
    }
    files.sort_by(|a, b| (&b.0, &b.1).cmp(&(&a.0, &a.1)));
    files.into_iter().map(|(_, _, path)| path).collect()
}

#[derive(Debug, Clone)]
pub struct RestoreSummary {
    pub file_name: String,
    pub rows_restored: usize,
}

/// Re-populates the imported-headcount store for the week starting at
/// `monday` from the most recent archive holding rows in that window.
///
/// Archives are tried newest first; the first one yielding at least one
/// matching row wins and older archives are not consulted. Rows are
/// upserted as-is, last row wins on a duplicate key; summing only applies
/// to live sheet imports, not restores.
pub fn restore_week(
    conn: &Connection,
    config: &Config,
    monday: NaiveDate,
) -> anyhow::Result<Option<RestoreSummary>> {
    for path in snapshot_files_newest_first(&config.snapshot_dir()) {
        let Some(rows) = headcount_rows_in_week(&path, monday) else {
            continue;
        };
        if rows.is_empty() {
            continue;
        }

        let tx = conn.unchecked_transaction()?;
        for (class_code, date, count) in &rows {
            db::upsert_headcount(&tx, class_code, *date, *count)?;
        }
        tx.commit()?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(Some(RestoreSummary {
            file_name,
            rows_restored: rows.len(),
        }));
    }
    Ok(None)
}

/// Extracts (class, date, count) rows for the target week from one archive.
/// Returns None when the archive is unreadable or lacks a usable headcount
/// sheet, so the scan moves on to the next file.
fn headcount_rows_in_week(
    path: &Path,
    monday: NaiveDate,
) -> Option<Vec<(&'static str, NaiveDate, i64)>> {
    let file = File::open(path).ok()?;
    let mut archive = ZipArchive::new(file).ok()?;
    let mut text = String::new();
    archive
        .by_name(HEADCOUNT_ENTRY)
        .ok()?
        .read_to_string(&mut text)
        .ok()?;

    let rows = imports::read_rows(&text);
    let header: Vec<String> = rows
        .first()?
        .iter()
        .map(|c| classes::normalize_label(c))
        .collect();
    let find = |candidates: &[&str]| {
        candidates
            .iter()
            .find_map(|key| header.iter().position(|h| h == key))
    };
    let class_col = find(&CLASS_KEYS)?;
    let date_col = find(&DATE_KEYS)?;
    let count_col = find(&COUNT_KEYS)?;

    let mut matched = Vec::new();
    for row in &rows[1..] {
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");
        let Some(class_code) = classes::resolve_class(cell(class_col)) else {
            continue;
        };
        let Some(date) = calendar::parse_iso_date(cell(date_col)) else {
            continue;
        };
        if calendar::weekday_slot(monday, date).is_none() {
            continue;
        }
        matched.push((class_code, date, imports::parse_count(cell(count_col))));
    }
    Some(matched)
}
