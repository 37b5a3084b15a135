use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Monday on or before the given date (ISO convention, Monday = 0).
pub fn week_start(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.weekday().num_days_from_monday() as i64)
}

/// The five tracked dates of the week starting at `monday`.
pub fn week_dates(monday: NaiveDate) -> [NaiveDate; 5] {
    [
        monday,
        monday + Duration::days(1),
        monday + Duration::days(2),
        monday + Duration::days(3),
        monday + Duration::days(4),
    ]
}

/// Slot index (0 = seg .. 4 = sex) of `date` within the week starting at
/// `monday`, by explicit lookup. Dates outside the Monday-Friday window
/// return None so stray rows never land in a board cell.
pub fn weekday_slot(monday: NaiveDate, date: NaiveDate) -> Option<usize> {
    week_dates(monday).iter().position(|d| *d == date)
}

/// First and last calendar day of the month containing `d`, inclusive.
pub fn month_bounds(d: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = d.with_day(1).unwrap_or(d);
    let next_first = if d.month() == 12 {
        NaiveDate::from_ymd_opt(d.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1)
    };
    let last = next_first
        .map(|n| n - Duration::days(1))
        .unwrap_or(first);
    (first, last)
}

/// First and last calendar day of the year containing `d`, inclusive.
pub fn year_bounds(d: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = NaiveDate::from_ymd_opt(d.year(), 1, 1).unwrap_or(d);
    let last = NaiveDate::from_ymd_opt(d.year(), 12, 31).unwrap_or(d);
    (first, last)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    /// Unrecognized tags fall back to the week view.
    pub fn parse(tag: &str) -> Period {
        match tag.trim().to_ascii_lowercase().as_str() {
            "month" | "mes" => Period::Month,
            "year" | "ano" => Period::Year,
            _ => Period::Week,
        }
    }
}

/// Inclusive bounds of the period containing `d`, plus a display label.
/// The week period covers Monday through Friday only.
pub fn period_bounds(d: NaiveDate, period: Period) -> (NaiveDate, NaiveDate, &'static str) {
    match period {
        Period::Month => {
            let (first, last) = month_bounds(d);
            (first, last, "Mês")
        }
        Period::Year => {
            let (first, last) = year_bounds(d);
            (first, last, "Ano")
        }
        Period::Week => {
            let monday = week_start(d);
            (monday, monday + Duration::days(4), "Semana")
        }
    }
}

/// Parses a strict YYYY-MM-DD date.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

pub fn is_monday(d: NaiveDate) -> bool {
    d.weekday() == Weekday::Mon
}
