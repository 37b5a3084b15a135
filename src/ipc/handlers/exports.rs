use crate::board;
use crate::calendar;
use crate::classes;
use crate::imports::csv_quote;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{date_or_today, get_required_str, open_state, require_admin, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn write_text_file(path: &str, text: &str) -> Result<(), HandlerErr> {
    std::fs::write(path, text)
        .map_err(|e| HandlerErr::new("io_failed", format!("cannot write {}: {}", path, e)))
}

/// Raw response log for one day, ordered by class then name.
fn handle_export_responses(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    let out_path = match get_required_str(&req.params, "outPath") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let date = date_or_today(&req.params);

    let rows = match day_response_rows(conn, date) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut csv = String::from("name,student_id,class_code,lunch_date,intention,updated_at\n");
    for row in &rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_quote(&row.0),
            csv_quote(&row.1),
            csv_quote(&row.2),
            csv_quote(&row.3),
            csv_quote(&row.4),
            csv_quote(&row.5),
        ));
    }
    if let Err(e) = write_text_file(&out_path, &csv) {
        return e.response(&req.id);
    }
    ok(
        &req.id,
        json!({ "rowsExported": rows.len(), "path": out_path, "date": date.to_string() }),
    )
}

type ResponseLine = (String, String, String, String, String, String);

fn day_response_rows(conn: &Connection, date: chrono::NaiveDate) -> anyhow::Result<Vec<ResponseLine>> {
    let mut stmt = conn.prepare(
        "SELECT name, student_id, class_code, lunch_date, intention, updated_at
         FROM responses
         WHERE lunch_date = ?
         ORDER BY class_code, name",
    )?;
    let rows = stmt
        .query_map([date.to_string()], |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Printable per-class week sheet: one line per student, X for attending,
/// - for declined, blank when no record. Semicolon-delimited to match the
/// institutional template.
fn handle_export_class_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    let class_raw = match get_required_str(&req.params, "classCode") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(class_code) = classes::CLASS_CODES
        .iter()
        .find(|c| **c == class_raw.trim())
        .copied()
    else {
        return err(&req.id, "invalid_input", "classCode is not a known class", None);
    };
    let out_path = match get_required_str(&req.params, "outPath") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let monday = calendar::week_start(date_or_today(&req.params));

    let lines = match board::class_week_marks(conn, class_code, monday) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut csv = format!("N;Nome;{}\n", classes::WEEKDAY_LABELS.join(";"));
    for (idx, (student, marks)) in lines.iter().enumerate() {
        csv.push_str(&format!(
            "{};{};{}\n",
            idx + 1,
            csv_quote(&student.name),
            marks.join(";"),
        ));
    }
    if let Err(e) = write_text_file(&out_path, &csv) {
        return e.response(&req.id);
    }
    ok(
        &req.id,
        json!({
            "rowsExported": lines.len(),
            "path": out_path,
            "classCode": class_code,
            "weekStart": monday.to_string(),
        }),
    )
}

/// The reconciled weekly grid with per-class and per-day totals.
fn handle_export_week_grid(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    let out_path = match get_required_str(&req.params, "outPath") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let monday = calendar::week_start(date_or_today(&req.params));

    let week = match board::aggregate_week(conn, monday) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut csv = format!("#;Turma;{};Total\n", classes::WEEKDAY_LABELS.join(";"));
    for row in &week.rows {
        let days: Vec<String> = row.days.iter().map(|v| v.to_string()).collect();
        csv.push_str(&format!(
            "{};{};{};{}\n",
            row.order,
            csv_quote(row.class_label),
            days.join(";"),
            row.total,
        ));
    }
    let totals: Vec<String> = week.day_totals.iter().map(|v| v.to_string()).collect();
    csv.push_str(&format!(
        ";Total;{};{}\n",
        totals.join(";"),
        week.grand_total
    ));

    if let Err(e) = write_text_file(&out_path, &csv) {
        return e.response(&req.id);
    }
    ok(
        &req.id,
        json!({
            "rowsExported": week.rows.len(),
            "path": out_path,
            "weekStart": week.monday.to_string(),
            "weekEnd": week.friday.to_string(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.responsesCsv" => Some(handle_export_responses(state, req)),
        "export.classWeekCsv" => Some(handle_export_class_week(state, req)),
        "export.weekGridCsv" => Some(handle_export_week_grid(state, req)),
        _ => None,
    }
}
