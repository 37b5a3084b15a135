use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

const TOKEN: &str = "smoke-token";

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_almocod");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn almocod");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn error_code(resp: &serde_json::Value) -> &str {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn is_ok(resp: &serde_json::Value) -> bool {
    resp.get("ok").and_then(|v| v.as_bool()) == Some(true)
}

#[test]
fn full_flow_over_stdio() {
    let workspace = temp_dir("almocod-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(is_ok(&health));

    let selected = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy(), "adminToken": TOKEN }),
    );
    assert!(is_ok(&selected), "workspace.select failed: {}", selected);

    let submitted = request(
        &mut stdin,
        &mut reader,
        "3",
        "submission.submit",
        json!({
            "name": "Ana Souza",
            "classCode": "TIN I",
            "referenceDate": "2025-06-11",
            "days": "seg, qua;sex"
        }),
    );
    assert!(is_ok(&submitted), "submit failed: {}", submitted);
    let student_id = submitted["result"]["studentId"]
        .as_str()
        .expect("studentId")
        .to_string();
    assert_eq!(submitted["result"]["weekStart"], "2025-06-09");

    let found = request(
        &mut stdin,
        &mut reader,
        "4",
        "student.lookup",
        json!({ "studentId": student_id }),
    );
    assert!(is_ok(&found));
    assert_eq!(found["result"]["name"], "Ana Souza");
    assert_eq!(found["result"]["classCode"], "TIN I");

    let missing = request(
        &mut stdin,
        &mut reader,
        "5",
        "student.lookup",
        json!({ "studentId": "nope" }),
    );
    assert_eq!(error_code(&missing), "not_found");

    let denied = request(
        &mut stdin,
        &mut reader,
        "6",
        "board.week",
        json!({ "token": "wrong", "date": "2025-06-11" }),
    );
    assert_eq!(error_code(&denied), "forbidden");

    let board = request(
        &mut stdin,
        &mut reader,
        "7",
        "board.week",
        json!({ "token": TOKEN, "date": "2025-06-11" }),
    );
    assert!(is_ok(&board), "board.week failed: {}", board);
    let rows = board["result"]["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 10);
    let tin1 = rows
        .iter()
        .find(|r| r["classCode"] == "TIN I")
        .expect("TIN I row");
    assert_eq!(tin1["days"], json!([1, 0, 1, 0, 1]));
    assert_eq!(tin1["total"], 3);
    assert_eq!(board["result"]["grandTotal"], 3);

    let report = request(
        &mut stdin,
        &mut reader,
        "8",
        "report.period",
        json!({ "token": TOKEN, "date": "2025-06-11", "period": "mes" }),
    );
    assert!(is_ok(&report));
    assert_eq!(report["result"]["periodLabel"], "Mês");
    assert_eq!(report["result"]["weekTotal"], 3);

    let grid_path = workspace.join("grid.csv");
    let exported = request(
        &mut stdin,
        &mut reader,
        "9",
        "export.weekGridCsv",
        json!({
            "token": TOKEN,
            "date": "2025-06-11",
            "outPath": grid_path.to_string_lossy()
        }),
    );
    assert!(is_ok(&exported), "export failed: {}", exported);
    let grid = std::fs::read_to_string(&grid_path).expect("read grid csv");
    assert!(grid.starts_with("#;Turma;Seg;Ter;Qua;Qui;Sex;Total"));
    assert!(grid.contains("TÉCNICO EM INFORMÁTICA – 1;1;0;1;0;1;3"));
    assert!(grid.contains(";Total;1;0;1;0;1;3"));

    let class_path = workspace.join("class_week.csv");
    let class_export = request(
        &mut stdin,
        &mut reader,
        "10",
        "export.classWeekCsv",
        json!({
            "token": TOKEN,
            "classCode": "TIN I",
            "date": "2025-06-11",
            "outPath": class_path.to_string_lossy()
        }),
    );
    assert!(is_ok(&class_export));
    let class_csv = std::fs::read_to_string(&class_path).expect("read class csv");
    assert!(class_csv.contains("Ana Souza;X;-;X;-;X"));

    let responses_path = workspace.join("responses.csv");
    let responses_export = request(
        &mut stdin,
        &mut reader,
        "11",
        "export.responsesCsv",
        json!({
            "token": TOKEN,
            "date": "2025-06-09",
            "outPath": responses_path.to_string_lossy()
        }),
    );
    assert!(is_ok(&responses_export));
    assert_eq!(responses_export["result"]["rowsExported"], 1);

    let unknown = request(&mut stdin, &mut reader, "12", "nope.method", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    // Mutating requests refreshed the daily snapshot.
    let snapshots: Vec<_> = std::fs::read_dir(workspace.join("snapshots"))
        .expect("snapshot dir")
        .flatten()
        .collect();
    assert!(!snapshots.is_empty());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn invalid_submissions_are_rejected() {
    let workspace = temp_dir("almocod-invalid");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let no_workspace = request(
        &mut stdin,
        &mut reader,
        "1",
        "submission.submit",
        json!({ "name": "Ana", "classCode": "TIN I", "days": "seg" }),
    );
    assert_eq!(error_code(&no_workspace), "no_workspace");

    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy(), "adminToken": TOKEN }),
    );

    let blank_name = request(
        &mut stdin,
        &mut reader,
        "3",
        "submission.submit",
        json!({ "name": "  ", "classCode": "TIN I", "days": "seg" }),
    );
    assert_eq!(error_code(&blank_name), "invalid_input");

    let bad_class = request(
        &mut stdin,
        &mut reader,
        "4",
        "submission.submit",
        json!({ "name": "Ana", "classCode": "TIN IV", "days": "seg" }),
    );
    assert_eq!(error_code(&bad_class), "invalid_input");

    let no_days = request(
        &mut stdin,
        &mut reader,
        "5",
        "submission.submit",
        json!({ "name": "Ana", "classCode": "TIN I", "days": " ;, " }),
    );
    assert_eq!(error_code(&no_days), "invalid_input");

    let bad_day = request(
        &mut stdin,
        &mut reader,
        "6",
        "submission.submit",
        json!({ "name": "Ana", "classCode": "TIN I", "days": "seg,dom" }),
    );
    assert_eq!(error_code(&bad_day), "invalid_input");

    let bad_date = request(
        &mut stdin,
        &mut reader,
        "7",
        "submission.submit",
        json!({
            "name": "Ana",
            "classCode": "TIN I",
            "days": "seg",
            "referenceDate": "11/06/2025"
        }),
    );
    assert_eq!(error_code(&bad_date), "invalid_input");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
