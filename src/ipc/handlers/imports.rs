use crate::calendar;
use crate::db;
use crate::imports;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{date_or_today, get_required_str, open_state, require_admin, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::snapshot;
use serde_json::json;

/// Tabular inputs arrive as CSV paths; spreadsheet binaries are converted
/// by the frontend before they reach the daemon.
fn read_csv_file(path: &str) -> Result<Vec<Vec<String>>, HandlerErr> {
    if path.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(HandlerErr::new(
            "import_parse_failed",
            "xlsx is not accepted here; convert the sheet to CSV first",
        ));
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        HandlerErr::new("import_parse_failed", format!("cannot read {}: {}", path, e))
    })?;
    let rows = imports::read_rows(&text);
    if rows.is_empty() {
        return Err(HandlerErr::new("import_parse_failed", "file has no rows"));
    }
    Ok(rows)
}

fn handle_import_roster(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    let path = match get_required_str(&req.params, "path") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let rows = match read_csv_file(&path) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let records = match imports::parse_roster(&rows) {
        Ok(v) => v,
        Err(e) => return err(&req.id, e.code(), e.message(), None),
    };

    let applied = (|| -> anyhow::Result<usize> {
        let tx = conn.unchecked_transaction()?;
        for record in &records {
            db::upsert_student(&tx, &record.student_id, &record.name, record.class_code)?;
        }
        tx.commit()?;
        Ok(records.len())
    })();
    let imported = match applied {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_update_failed", e.to_string(), None),
    };

    let _ = snapshot::write_snapshot(conn, config);
    ok(&req.id, json!({ "studentsImported": imported }))
}

fn handle_import_headcount(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    let path = match get_required_str(&req.params, "path") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let rows = match read_csv_file(&path) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let sheet = match imports::parse_headcount_sheet(&rows) {
        Ok(v) => v,
        Err(e) => return err(&req.id, e.code(), e.message(), None),
    };

    let monday = calendar::week_start(date_or_today(&req.params));
    let week = calendar::week_dates(monday);

    let applied = (|| -> anyhow::Result<()> {
        let tx = conn.unchecked_transaction()?;
        for (class_code, counts) in &sheet.per_class {
            for (slot, count) in counts.iter().enumerate() {
                db::upsert_headcount(&tx, class_code, week[slot], *count)?;
            }
        }
        tx.commit()?;
        Ok(())
    })();
    if let Err(e) = applied {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    let _ = snapshot::write_snapshot(conn, config);
    ok(
        &req.id,
        json!({
            "classesImported": sheet.per_class.len(),
            "grandTotal": sheet.grand_total,
            "weekStart": monday.to_string(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.roster" => Some(handle_import_roster(state, req)),
        "import.headcount" => Some(handle_import_headcount(state, req)),
        _ => None,
    }
}
