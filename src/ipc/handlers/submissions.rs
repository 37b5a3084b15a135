use crate::calendar;
use crate::classes;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{get_optional_str, get_required_str, open_state, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::snapshot;
use rusqlite::Connection;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Flattens the raw day tokens (string or array, comma/semicolon/space
/// delimited) into a lowercased list with duplicates removed, preserving
/// first occurrence.
fn parse_day_tokens(raw: &serde_json::Value) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut push_tokens = |text: &str| {
        for token in text.split([',', ';', ' ']) {
            let t = token.trim().to_ascii_lowercase();
            if !t.is_empty() && !pieces.contains(&t) {
                pieces.push(t);
            }
        }
    };
    match raw {
        serde_json::Value::String(s) => push_tokens(s),
        serde_json::Value::Array(items) => {
            for item in items {
                if let Some(s) = item.as_str() {
                    push_tokens(s);
                }
            }
        }
        _ => {}
    }
    pieces
}

/// Stable submitter identifier when the frontend supplies none: the same
/// name in the same class always maps back to the same record set.
fn derive_student_id(class_code: &str, name: &str) -> String {
    let digest = Sha256::digest(format!("{}::{}", class_code, name.to_uppercase()).as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("auto:{}", hex)
}

struct Submission {
    student_id: String,
    name: String,
    class_code: &'static str,
    monday: chrono::NaiveDate,
    selected: Vec<String>,
}

fn validate_submission(params: &serde_json::Value) -> Result<Submission, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::invalid_input("name must not be empty"));
    }

    let class_raw = get_required_str(params, "classCode")?;
    let Some(class_code) = classes::CLASS_CODES
        .iter()
        .find(|c| **c == class_raw.trim())
        .copied()
    else {
        return Err(HandlerErr::invalid_input("classCode is not a known class"));
    };

    let selected = parse_day_tokens(params.get("days").unwrap_or(&serde_json::Value::Null));
    if selected.is_empty() {
        return Err(HandlerErr::invalid_input("select at least one day"));
    }
    if let Some(bad) = selected
        .iter()
        .find(|t| !classes::WEEKDAY_CODES.contains(&t.as_str()))
    {
        return Err(HandlerErr::invalid_input(format!(
            "unknown weekday code: {}",
            bad
        )));
    }

    let reference = match get_optional_str(params, "referenceDate") {
        Some(text) => calendar::parse_iso_date(&text)
            .ok_or_else(|| HandlerErr::invalid_input("referenceDate must be YYYY-MM-DD"))?,
        None => chrono::Local::now().date_naive(),
    };

    let student_id = get_optional_str(params, "studentId")
        .unwrap_or_else(|| derive_student_id(class_code, &name));

    Ok(Submission {
        student_id,
        name,
        class_code,
        monday: calendar::week_start(reference),
        selected,
    })
}

/// Rewrites all five weekday rows of the target week in one transaction:
/// selected days as attending, the rest as explicitly not attending.
fn apply_submission(conn: &Connection, sub: &Submission) -> Result<(), HandlerErr> {
    let to_db_err = |e: anyhow::Error| HandlerErr::new("db_update_failed", e.to_string());

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    db::upsert_student(&tx, &sub.student_id, &sub.name, sub.class_code).map_err(to_db_err)?;
    for (slot, date) in calendar::week_dates(sub.monday).into_iter().enumerate() {
        let attending = sub.selected.iter().any(|t| t == classes::WEEKDAY_CODES[slot]);
        db::upsert_response(&tx, &sub.student_id, date, &sub.name, sub.class_code, attending)
            .map_err(to_db_err)?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;
    Ok(())
}

fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let sub = match validate_submission(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = apply_submission(conn, &sub) {
        return e.response(&req.id);
    }

    // Refresh the snapshot; a snapshot failure never fails the submission.
    let _ = snapshot::write_snapshot(conn, config);

    ok(
        &req.id,
        json!({
            "studentId": sub.student_id,
            "weekStart": sub.monday.to_string(),
            "weekEnd": (sub.monday + chrono::Duration::days(4)).to_string(),
            "days": sub.selected,
        }),
    )
}

fn handle_lookup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, _) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let student_id = match get_required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if student_id.trim().is_empty() {
        return err(&req.id, "invalid_input", "studentId must not be empty", None);
    }
    match db::find_student(conn, student_id.trim()) {
        Ok(Some(student)) => ok(
            &req.id,
            json!({
                "studentId": student.student_id,
                "name": student.name,
                "classCode": student.class_code,
            }),
        ),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submission.submit" => Some(handle_submit(state, req)),
        "student.lookup" => Some(handle_lookup(state, req)),
        _ => None,
    }
}
