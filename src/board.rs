use crate::calendar;
use crate::classes;
use crate::db;
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use std::collections::HashMap;

/// One class line of the weekly board, in display order.
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub order: usize,
    pub class_code: &'static str,
    pub class_label: &'static str,
    pub days: [i64; 5],
    pub total: i64,
}

/// Reconciled weekly grid. Derived on every read, never persisted.
#[derive(Debug, Clone)]
pub struct WeekBoard {
    pub monday: NaiveDate,
    pub friday: NaiveDate,
    pub rows: Vec<BoardRow>,
    pub day_totals: [i64; 5],
    pub grand_total: i64,
}

/// Builds the reconciled board for the week starting at `monday`.
///
/// Each cell is max(confirmed responses, imported headcount): the imported
/// number is an administratively asserted floor that digital opt-ins may
/// exceed but never undercut. Rows outside the Monday-Friday window are
/// dropped by explicit weekday lookup.
pub fn aggregate_week(conn: &Connection, monday: NaiveDate) -> anyhow::Result<WeekBoard> {
    let friday = monday + Duration::days(4);

    let mut cells: HashMap<&'static str, [i64; 5]> = classes::CLASS_CODES
        .iter()
        .map(|code| (*code, [0i64; 5]))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT class_code,
                lunch_date,
                SUM(CASE WHEN intention = 'SIM' THEN 1 ELSE 0 END) AS yes
         FROM responses
         WHERE lunch_date BETWEEN ? AND ?
         GROUP BY class_code, lunch_date",
    )?;
    let response_rows = stmt
        .query_map([monday.to_string(), friday.to_string()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (class_code, date_text, yes) in response_rows {
        let Some(date) = calendar::parse_iso_date(&date_text) else {
            continue;
        };
        let Some(slot) = calendar::weekday_slot(monday, date) else {
            continue;
        };
        if let Some(days) = canonical_entry(&mut cells, &class_code) {
            days[slot] = yes;
        }
    }

    let mut stmt = conn.prepare(
        "SELECT class_code, lunch_date, yes_count
         FROM imported_headcount
         WHERE lunch_date BETWEEN ? AND ?",
    )?;
    let imported_rows = stmt
        .query_map([monday.to_string(), friday.to_string()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (class_code, date_text, imported) in imported_rows {
        let Some(date) = calendar::parse_iso_date(&date_text) else {
            continue;
        };
        let Some(slot) = calendar::weekday_slot(monday, date) else {
            continue;
        };
        if let Some(days) = canonical_entry(&mut cells, &class_code) {
            days[slot] = days[slot].max(imported.max(0));
        }
    }

    let mut day_totals = [0i64; 5];
    let mut rows = Vec::with_capacity(classes::DISPLAY_ORDER.len());
    for (idx, code) in classes::DISPLAY_ORDER.iter().enumerate() {
        let days = cells.get(code).copied().unwrap_or_default();
        let total: i64 = days.iter().sum();
        for (slot, value) in days.iter().enumerate() {
            day_totals[slot] += value;
        }
        rows.push(BoardRow {
            order: idx + 1,
            class_code: code,
            class_label: classes::class_label(code),
            days,
            total,
        });
    }
    let grand_total: i64 = day_totals.iter().sum();

    Ok(WeekBoard {
        monday,
        friday,
        rows,
        day_totals,
        grand_total,
    })
}

fn canonical_entry<'a>(
    cells: &'a mut HashMap<&'static str, [i64; 5]>,
    class_code: &str,
) -> Option<&'a mut [i64; 5]> {
    let code = classes::CLASS_CODES
        .iter()
        .find(|c| **c == class_code)
        .copied()?;
    cells.get_mut(code)
}

/// SIM/NAO counts per class for a single day.
pub fn day_summary(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<(String, i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT class_code,
                SUM(CASE WHEN intention = 'SIM' THEN 1 ELSE 0 END) AS yes,
                SUM(CASE WHEN intention = 'NAO' THEN 1 ELSE 0 END) AS no
         FROM responses
         WHERE lunch_date = ?
         GROUP BY class_code
         ORDER BY class_code",
    )?;
    let rows = stmt
        .query_map([date.to_string()], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?, r.get::<_, i64>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct PeriodDay {
    pub date: String,
    pub yes: i64,
    pub no: i64,
}

/// Per-date SIM/NAO counts over an inclusive date range.
pub fn period_report(
    conn: &Connection,
    first: NaiveDate,
    last: NaiveDate,
) -> anyhow::Result<Vec<PeriodDay>> {
    let mut stmt = conn.prepare(
        "SELECT lunch_date,
                SUM(CASE WHEN intention = 'SIM' THEN 1 ELSE 0 END) AS yes,
                SUM(CASE WHEN intention = 'NAO' THEN 1 ELSE 0 END) AS no
         FROM responses
         WHERE lunch_date BETWEEN ? AND ?
         GROUP BY lunch_date
         ORDER BY lunch_date",
    )?;
    let rows = stmt
        .query_map([first.to_string(), last.to_string()], |r| {
            Ok(PeriodDay {
                date: r.get(0)?,
                yes: r.get(1)?,
                no: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Total confirmed lunches over an inclusive date range.
pub fn attending_total(conn: &Connection, first: NaiveDate, last: NaiveDate) -> anyhow::Result<i64> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN intention = 'SIM' THEN 1 ELSE 0 END), 0)
         FROM responses
         WHERE lunch_date BETWEEN ? AND ?",
        [first.to_string(), last.to_string()],
        |r| r.get(0),
    )?;
    Ok(total)
}

/// Per-student weekday marks ("X" attending, "-" declined, "" no record)
/// for one class and week, in roster name order.
pub fn class_week_marks(
    conn: &Connection,
    class_code: &str,
    monday: NaiveDate,
) -> anyhow::Result<Vec<(db::StudentRow, [String; 5])>> {
    let friday = monday + Duration::days(4);
    let students = db::students_in_class(conn, class_code)?;

    let mut stmt = conn.prepare(
        "SELECT student_id, lunch_date, intention
         FROM responses
         WHERE class_code = ? AND lunch_date BETWEEN ? AND ?",
    )?;
    let rows = stmt
        .query_map(
            (class_code, monday.to_string(), friday.to_string()),
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let mut marks: HashMap<String, [String; 5]> = HashMap::new();
    for (student_id, date_text, intention) in rows {
        let Some(date) = calendar::parse_iso_date(&date_text) else {
            continue;
        };
        let Some(slot) = calendar::weekday_slot(monday, date) else {
            continue;
        };
        let entry = marks.entry(student_id).or_default();
        entry[slot] = if intention == db::INTENTION_YES { "X" } else { "-" }.to_string();
    }

    Ok(students
        .into_iter()
        .map(|s| {
            let m = marks.remove(&s.student_id).unwrap_or_default();
            (s, m)
        })
        .collect())
}
