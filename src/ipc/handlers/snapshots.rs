use crate::calendar;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{date_or_today, open_state, require_admin};
use crate::ipc::types::{AppState, Request};
use crate::snapshot;
use serde_json::json;

fn handle_backup_write(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    match snapshot::write_snapshot(conn, config) {
        Ok(path) => ok(&req.id, json!({ "path": path.to_string_lossy() })),
        Err(e) => err(&req.id, "io_failed", e.to_string(), None),
    }
}

fn handle_backup_restore_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    let monday = calendar::week_start(date_or_today(&req.params));

    match snapshot::restore_week(conn, config, monday) {
        Ok(Some(summary)) => {
            // The restore mutated the headcount store, so refresh today's
            // snapshot with the restored state.
            let _ = snapshot::write_snapshot(conn, config);
            ok(
                &req.id,
                json!({
                    "fileName": summary.file_name,
                    "rowsRestored": summary.rows_restored,
                    "weekStart": monday.to_string(),
                }),
            )
        }
        Ok(None) => err(
            &req.id,
            "no_backup_found",
            "no archive holds headcount rows for the selected week",
            None,
        ),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.write" => Some(handle_backup_write(state, req)),
        "backup.restoreWeek" => Some(handle_backup_restore_week(state, req)),
        _ => None,
    }
}
