pub mod board;
pub mod core;
pub mod exports;
pub mod imports;
pub mod snapshots;
pub mod submissions;

use crate::config::Config;
use crate::ipc::error::err;
use rusqlite::Connection;

pub(crate) struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> HandlerErr {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> HandlerErr {
        HandlerErr::new("invalid_input", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub(crate) fn get_required_str(
    params: &serde_json::Value,
    key: &str,
) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub(crate) fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Connection + config, or the standard no_workspace error.
pub(crate) fn open_state<'a>(
    db: &'a Option<Connection>,
    config: &'a Option<Config>,
) -> Result<(&'a Connection, &'a Config), HandlerErr> {
    match (db.as_ref(), config.as_ref()) {
        (Some(conn), Some(cfg)) => Ok((conn, cfg)),
        _ => Err(HandlerErr::new("no_workspace", "select a workspace first")),
    }
}

/// Admin methods require the shared token, compared by exact equality.
pub(crate) fn require_admin(config: &Config, params: &serde_json::Value) -> Result<(), HandlerErr> {
    let supplied = params.get("token").and_then(|v| v.as_str()).unwrap_or("");
    if config.token_matches(supplied) {
        Ok(())
    } else {
        Err(HandlerErr::new("forbidden", "invalid admin token"))
    }
}

/// Admin views fall back to today when the date param is absent or bad.
pub(crate) fn date_or_today(params: &serde_json::Value) -> chrono::NaiveDate {
    params
        .get("date")
        .and_then(|v| v.as_str())
        .and_then(crate::calendar::parse_iso_date)
        .unwrap_or_else(|| chrono::Local::now().date_naive())
}
