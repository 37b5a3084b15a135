use crate::config::Config;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::snapshot;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataDir": state
                .config
                .as_ref()
                .map(|c| c.data_dir.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(data_dir) = path else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let admin_token = req
        .params
        .get("adminToken")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let retention = req
        .params
        .get("snapshotRetention")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize);

    let config = Config::new(data_dir.clone(), admin_token, retention);
    match db::open_db(&config.data_dir) {
        Ok(conn) => {
            // Seed a snapshot for the day; failure must not block opening.
            let _ = snapshot::write_snapshot(&conn, &config);
            state.config = Some(config);
            state.db = Some(conn);
            ok(&req.id, json!({ "dataDir": data_dir.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
