use crate::classes;
use std::collections::HashMap;

/// Header row must appear within this many leading rows of the sheet.
const HEADER_SCAN_ROWS: usize = 15;

const REQUIRED_HEADCOUNT_COLUMNS: [&str; 6] = ["turma", "seg", "ter", "qua", "qui", "sex"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// No row in the scanned window carries the required column set.
    HeaderNotFound,
    /// Every parsed cell is zero; applying would wipe the week's headcount.
    ZeroTotal,
    /// No row survived class resolution.
    NoValidRows,
    /// The file lacks one of the mandatory roster columns.
    MissingColumns(&'static str),
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::HeaderNotFound => "header_not_found",
            ImportError::ZeroTotal => "zero_total",
            ImportError::NoValidRows => "invalid_input",
            ImportError::MissingColumns(_) => "invalid_input",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ImportError::HeaderNotFound => {
                "header row not found; expected columns: turma, seg, ter, qua, qui, sex".to_string()
            }
            ImportError::ZeroTotal => {
                "import totals zero; refusing to wipe the week's headcount".to_string()
            }
            ImportError::NoValidRows => "no resolvable class rows in file".to_string(),
            ImportError::MissingColumns(what) => {
                format!("file is missing required columns: {}", what)
            }
        }
    }
}

/// Splits CSV text into rows, sniffing the delimiter (`,` vs `;`) from the
/// first line and tolerating a UTF-8 BOM.
pub fn read_rows(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter = sniff_delimiter(text);
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_csv_record(line, delimiter))
        .collect()
}

fn sniff_delimiter(text: &str) -> char {
    let first_line = text.lines().next().unwrap_or("");
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if semicolons > commas {
        ';'
    } else {
        ','
    }
}

fn parse_csv_record(line: &str, delimiter: char) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' {
            if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                buf.push('"');
                i += 2;
                continue;
            }
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }
        if ch == delimiter && !in_quotes {
            out.push(buf);
            buf = String::new();
            i += 1;
            continue;
        }
        buf.push(ch);
        i += 1;
    }
    out.push(buf);
    out
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains(';') || s.contains('"') || s.contains('\n') || s.contains('\r')
    {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Non-negative integer from a spreadsheet cell. Decimal commas are
/// tolerated ("12,0"); anything unparseable counts as zero.
pub fn parse_count(cell: &str) -> i64 {
    let text = cell.trim().replace(',', ".");
    if text.is_empty() {
        return 0;
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => (v.round() as i64).max(0),
        _ => 0,
    }
}

/// Per-class weekday headcounts distilled from one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadcountSheet {
    /// First-appearance order; duplicate class rows have been summed.
    pub per_class: Vec<(&'static str, [i64; 5])>,
    pub grand_total: i64,
}

/// Parses an expected-headcount sheet: locates the header row, resolves
/// class labels, sums duplicate class rows and guards against an all-zero
/// import.
pub fn parse_headcount_sheet(rows: &[Vec<String>]) -> Result<HeadcountSheet, ImportError> {
    let (header_idx, header) = find_headcount_header(rows).ok_or(ImportError::HeaderNotFound)?;

    let column = |name: &str| header.iter().position(|h| h == name);
    let class_col = column("turma").ok_or(ImportError::HeaderNotFound)?;
    let day_cols: Vec<usize> = classes::WEEKDAY_CODES
        .iter()
        .map(|code| column(code).ok_or(ImportError::HeaderNotFound))
        .collect::<Result<_, _>>()?;

    let mut order: Vec<&'static str> = Vec::new();
    let mut summed: HashMap<&'static str, [i64; 5]> = HashMap::new();

    for row in &rows[header_idx + 1..] {
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");

        // Some sheets put a running row number before the class label.
        let mut class_raw = cell(class_col);
        if !class_raw.is_empty()
            && class_raw.chars().all(|c| c.is_ascii_digit())
            && class_col + 1 < row.len()
        {
            class_raw = cell(class_col + 1);
        }
        if class_raw.is_empty() || classes::normalize_label(class_raw) == "total" {
            continue;
        }
        let Some(class_code) = classes::resolve_class(class_raw) else {
            continue;
        };

        let mut counts = [0i64; 5];
        for (slot, col) in day_cols.iter().enumerate() {
            counts[slot] = parse_count(cell(*col));
        }

        match summed.get_mut(class_code) {
            Some(existing) => {
                for (slot, value) in counts.iter().enumerate() {
                    existing[slot] += value;
                }
            }
            None => {
                order.push(class_code);
                summed.insert(class_code, counts);
            }
        }
    }

    if order.is_empty() {
        return Err(ImportError::NoValidRows);
    }

    let per_class: Vec<(&'static str, [i64; 5])> = order
        .into_iter()
        .map(|code| (code, summed[code]))
        .collect();
    let grand_total: i64 = per_class
        .iter()
        .map(|(_, days)| days.iter().sum::<i64>())
        .sum();
    if grand_total == 0 {
        return Err(ImportError::ZeroTotal);
    }

    Ok(HeadcountSheet {
        per_class,
        grand_total,
    })
}

fn find_headcount_header(rows: &[Vec<String>]) -> Option<(usize, Vec<String>)> {
    for (idx, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let normalized: Vec<String> = row.iter().map(|c| classes::normalize_label(c)).collect();
        let has_all = REQUIRED_HEADCOUNT_COLUMNS
            .iter()
            .all(|required| normalized.iter().any(|cell| cell == required));
        if has_all {
            return Some((idx, normalized));
        }
    }
    None
}

/// One validated roster line.
#[derive(Debug, Clone)]
pub struct RosterRecord {
    pub student_id: String,
    pub name: String,
    pub class_code: &'static str,
}

const NAME_KEYS: [&str; 3] = ["nome", "aluno", "nome completo"];
const ID_KEYS: [&str; 3] = ["matricula", "matricula aluno", "ra"];
const CLASS_KEYS: [&str; 3] = ["turma", "serie", "classe"];

/// Parses a student roster file. Column discovery is header-driven and
/// tolerant of reordering and extra columns; rows with a missing field or a
/// non-canonical class are skipped.
pub fn parse_roster(rows: &[Vec<String>]) -> Result<Vec<RosterRecord>, ImportError> {
    let Some(header_row) = rows.first() else {
        return Err(ImportError::MissingColumns("nome, matricula, turma"));
    };
    let header: Vec<String> = header_row
        .iter()
        .map(|c| classes::normalize_label(c))
        .collect();

    let find = |candidates: &[&str]| {
        candidates
            .iter()
            .find_map(|key| header.iter().position(|h| h == key))
    };
    let name_col = find(&NAME_KEYS).ok_or(ImportError::MissingColumns("nome"))?;
    let id_col = find(&ID_KEYS).ok_or(ImportError::MissingColumns("matricula"))?;
    let class_col = find(&CLASS_KEYS).ok_or(ImportError::MissingColumns("turma"))?;

    let mut records = Vec::new();
    for row in &rows[1..] {
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");
        let name = cell(name_col);
        let student_id = cell(id_col);
        let class_raw = cell(class_col);
        if name.is_empty() || student_id.is_empty() {
            continue;
        }
        let Some(class_code) = classes::CLASS_CODES
            .iter()
            .find(|c| **c == class_raw)
            .copied()
        else {
            continue;
        };
        records.push(RosterRecord {
            student_id: student_id.to_string(),
            name: name.to_string(),
            class_code,
        });
    }

    if records.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    Ok(records)
}
