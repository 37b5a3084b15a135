use crate::board;
use crate::calendar::{self, Period};
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{date_or_today, open_state, require_admin};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn board_to_json(board: &board::WeekBoard) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = board
        .rows
        .iter()
        .map(|row| {
            json!({
                "order": row.order,
                "classCode": row.class_code,
                "classLabel": row.class_label,
                "days": row.days,
                "total": row.total,
            })
        })
        .collect();
    json!({
        "weekStart": board.monday.to_string(),
        "weekEnd": board.friday.to_string(),
        "rows": rows,
        "dayTotals": board.day_totals,
        "grandTotal": board.grand_total,
    })
}

fn handle_board_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }
    let monday = calendar::week_start(date_or_today(&req.params));
    match board::aggregate_week(conn, monday) {
        Ok(board) => ok(&req.id, board_to_json(&board)),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_report_period(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match open_state(&state.db, &state.config) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = require_admin(config, &req.params) {
        return e.response(&req.id);
    }

    let base = date_or_today(&req.params);
    let period = Period::parse(req.params.get("period").and_then(|v| v.as_str()).unwrap_or(""));
    let (first, last, label) = calendar::period_bounds(base, period);

    let report = match report_json(conn, base, first, last) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let mut result = report;
    result["periodLabel"] = json!(label);
    result["periodStart"] = json!(first.to_string());
    result["periodEnd"] = json!(last.to_string());
    ok(&req.id, result)
}

fn report_json(
    conn: &rusqlite::Connection,
    base: chrono::NaiveDate,
    first: chrono::NaiveDate,
    last: chrono::NaiveDate,
) -> anyhow::Result<serde_json::Value> {
    let day_rows: Vec<serde_json::Value> = board::day_summary(conn, base)?
        .into_iter()
        .map(|(class_code, yes, no)| {
            json!({ "classCode": class_code, "yes": yes, "no": no, "total": yes + no })
        })
        .collect();

    let mut period_yes = 0i64;
    let mut period_no = 0i64;
    let period_days: Vec<serde_json::Value> = board::period_report(conn, first, last)?
        .into_iter()
        .map(|day| {
            period_yes += day.yes;
            period_no += day.no;
            json!({ "date": day.date, "yes": day.yes, "no": day.no, "total": day.yes + day.no })
        })
        .collect();

    let monday = calendar::week_start(base);
    let week_total = board::attending_total(conn, monday, monday + chrono::Duration::days(4))?;
    let (month_first, month_last) = calendar::month_bounds(base);
    let month_total = board::attending_total(conn, month_first, month_last)?;
    let (year_first, year_last) = calendar::year_bounds(base);
    let year_total = board::attending_total(conn, year_first, year_last)?;

    Ok(json!({
        "date": base.to_string(),
        "daySummary": day_rows,
        "periodDays": period_days,
        "periodYes": period_yes,
        "periodNo": period_no,
        "weekTotal": week_total,
        "monthTotal": month_total,
        "yearTotal": year_total,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "board.week" => Some(handle_board_week(state, req)),
        "report.period" => Some(handle_report_period(state, req)),
        _ => None,
    }
}
