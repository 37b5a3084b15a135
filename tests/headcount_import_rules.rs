#[path = "../src/classes.rs"]
mod classes;
#[path = "../src/imports.rs"]
mod imports;

use imports::{parse_headcount_sheet, parse_roster, read_rows, ImportError};

fn rows(csv: &str) -> Vec<Vec<String>> {
    read_rows(csv)
}

fn counts_for<'a>(
    sheet: &'a imports::HeadcountSheet,
    class: &str,
) -> &'a [i64; 5] {
    sheet
        .per_class
        .iter()
        .find(|(code, _)| *code == class)
        .map(|(_, days)| days)
        .expect("class present in sheet")
}

#[test]
fn header_is_found_below_decorative_rows() {
    let csv = "\
QUADRO SEMANAL,,,,,,
,,,,,,
,turma,seg,ter,qua,qui,sex
,TIN I,1,2,3,4,5
";
    let sheet = parse_headcount_sheet(&rows(csv)).expect("parse");
    assert_eq!(counts_for(&sheet, "TIN I"), &[1, 2, 3, 4, 5]);
    assert_eq!(sheet.grand_total, 15);
}

#[test]
fn header_beyond_the_scan_window_is_not_found() {
    let mut csv = String::new();
    for _ in 0..15 {
        csv.push_str("decorative,,,,,,\n");
    }
    csv.push_str("turma,seg,ter,qua,qui,sex\nTIN I,1,0,0,0,0\n");
    assert_eq!(
        parse_headcount_sheet(&rows(&csv)),
        Err(ImportError::HeaderNotFound)
    );
}

#[test]
fn missing_required_column_is_header_not_found() {
    let csv = "turma,seg,ter,qua,qui\nTIN I,1,2,3,4\n";
    assert_eq!(
        parse_headcount_sheet(&rows(csv)),
        Err(ImportError::HeaderNotFound)
    );
}

#[test]
fn duplicate_class_rows_are_summed() {
    let csv = "\
turma,seg,ter,qua,qui,sex
TAI I,2,0,1,0,0
TAI I,3,1,0,0,0
";
    let sheet = parse_headcount_sheet(&rows(csv)).expect("parse");
    assert_eq!(counts_for(&sheet, "TAI I"), &[5, 1, 1, 0, 0]);
}

#[test]
fn class_labels_resolve_and_unknowns_are_skipped() {
    let csv = "\
turma,seg,ter,qua,qui,sex
TÉCNICO EM INFORMÁTICA – 2,4,0,0,0,0
2 automacao,1,0,0,0,0
sala dos professores,9,9,9,9,9
SERVIDOR,2,0,0,0,0
";
    let sheet = parse_headcount_sheet(&rows(csv)).expect("parse");
    assert_eq!(counts_for(&sheet, "TIN II")[0], 4);
    assert_eq!(counts_for(&sheet, "TAI II")[0], 1);
    assert_eq!(counts_for(&sheet, "SERVIDORES")[0], 2);
    assert_eq!(sheet.per_class.len(), 3);
}

#[test]
fn total_row_is_skipped() {
    let csv = "\
turma,seg,ter,qua,qui,sex
TIN I,1,1,1,1,1
TOTAL,99,99,99,99,99
";
    let sheet = parse_headcount_sheet(&rows(csv)).expect("parse");
    assert_eq!(sheet.grand_total, 5);
}

#[test]
fn leading_row_number_shifts_to_the_label_cell() {
    // Some institutional sheets put a running number in the class column.
    let csv = "\
turma,seg,ter,qua,qui,sex
3,0,0,0,0,0
";
    // The bare digit shifts to the next cell, which is empty here: skipped.
    assert_eq!(parse_headcount_sheet(&rows(csv)), Err(ImportError::NoValidRows));

    let shifted = "\
num,turma,seg,ter,qua,qui,sex
1,TIN III,2,0,0,0,0
";
    let sheet = parse_headcount_sheet(&rows(shifted)).expect("parse");
    assert_eq!(counts_for(&sheet, "TIN III")[0], 2);
}

#[test]
fn all_zero_import_is_rejected() {
    let csv = "\
turma,seg,ter,qua,qui,sex
TIN I,0,0,0,0,0
TAI I,,abc,0,0,
";
    assert_eq!(parse_headcount_sheet(&rows(csv)), Err(ImportError::ZeroTotal));
}

#[test]
fn decimal_commas_parse_in_semicolon_files() {
    let csv = "\
turma;seg;ter;qua;qui;sex
TIN I;12,0;0;0;0;3
";
    let sheet = parse_headcount_sheet(&rows(csv)).expect("parse");
    assert_eq!(counts_for(&sheet, "TIN I"), &[12, 0, 0, 0, 3]);
}

#[test]
fn roster_columns_are_discovered_by_candidate_names() {
    let csv = "\
RA,Nome Completo,extra,Série
100,Ana Souza,x,TIN I
101,Bruno Lima,y,TAI II
102,,z,TIN I
103,Caio Dias,w,5o ano
";
    let records = parse_roster(&rows(csv)).expect("parse roster");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].student_id, "100");
    assert_eq!(records[0].class_code, "TIN I");
    assert_eq!(records[1].name, "Bruno Lima");
}

#[test]
fn roster_missing_columns_fails() {
    let csv = "nome,turma\nAna,TIN I\n";
    match parse_roster(&rows(csv)) {
        Err(ImportError::MissingColumns(_)) => {}
        other => panic!("expected missing columns, got {:?}", other),
    }
}
