/// Canonical class codes, in enumeration order.
pub const CLASS_CODES: [&str; 10] = [
    "TIN I",
    "TIN II",
    "TIN III",
    "TAI I",
    "TAI II",
    "TAI III",
    "TST I",
    "TST II",
    "TST III",
    "SERVIDORES",
];

/// Staff pseudo-class for school employees eating at the cafeteria.
pub const STAFF_CODE: &str = "SERVIDORES";

/// Board display order, distinct from enumeration order (institutional
/// convention: automation, informatics, safety, then staff).
pub const DISPLAY_ORDER: [&str; 10] = [
    "TAI I",
    "TAI II",
    "TAI III",
    "TIN I",
    "TIN II",
    "TIN III",
    "TST I",
    "TST II",
    "TST III",
    "SERVIDORES",
];

/// Weekday codes in slot order (Monday..Friday).
pub const WEEKDAY_CODES: [&str; 5] = ["seg", "ter", "qua", "qui", "sex"];

/// Column headings used by exports, matching slot order.
pub const WEEKDAY_LABELS: [&str; 5] = ["Seg", "Ter", "Qua", "Qui", "Sex"];

pub fn class_label(code: &str) -> &'static str {
    match code {
        "TAI I" => "TÉCNICO EM AUTOMAÇÃO INDUSTRIAL – 1",
        "TAI II" => "TÉCNICO EM AUTOMAÇÃO INDUSTRIAL – 2",
        "TAI III" => "TÉCNICO EM AUTOMAÇÃO INDUSTRIAL – 3",
        "TIN I" => "TÉCNICO EM INFORMÁTICA – 1",
        "TIN II" => "TÉCNICO EM INFORMÁTICA – 2",
        "TIN III" => "TÉCNICO EM INFORMÁTICA – 3",
        "TST I" => "TÉCNICO EM SEGURANÇA DO TRABALHO – 1",
        "TST II" => "TÉCNICO EM SEGURANÇA DO TRABALHO – 2",
        "TST III" => "TÉCNICO EM SEGURANÇA DO TRABALHO – 3",
        "SERVIDORES" => "SERVIDORES",
        _ => "",
    }
}

pub fn is_canonical_code(value: &str) -> bool {
    CLASS_CODES.contains(&value)
}

/// Lowercases, trims and folds the accented characters seen in institutional
/// spreadsheets to their ASCII equivalents.
pub fn normalize_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        for lowered in ch.to_lowercase() {
            out.push(match lowered {
                'á' | 'à' | 'â' | 'ã' => 'a',
                'é' | 'ê' => 'e',
                'í' => 'i',
                'ó' | 'ô' | 'õ' => 'o',
                'ú' => 'u',
                'ç' => 'c',
                other => other,
            });
        }
    }
    out
}

/// Extracts a level digit 1-3 that is not immediately followed by another
/// digit (so "12" never reads as level 1).
fn find_level_digit(normalized: &str) -> Option<char> {
    let bytes = normalized.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'1' | b'2' | b'3') {
            let next_is_digit = bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if !next_is_digit {
                return Some(*b as char);
            }
        }
    }
    None
}

fn program_code(normalized: &str, level: char) -> Option<&'static str> {
    let by_level = |one: &'static str, two: &'static str, three: &'static str| match level {
        '1' => Some(one),
        '2' => Some(two),
        '3' => Some(three),
        _ => None,
    };
    if normalized.contains("informatica") {
        return by_level("TIN I", "TIN II", "TIN III");
    }
    if normalized.contains("automacao") {
        return by_level("TAI I", "TAI II", "TAI III");
    }
    if normalized.contains("seguranca") && normalized.contains("trabalho") {
        return by_level("TST I", "TST II", "TST III");
    }
    None
}

/// Maps a free-text class label to a canonical code. Rules are tried in
/// order and the first match wins:
///   1. exact code match (case/accent-insensitive)
///   2. exact descriptive-label match
///   3. "servidor" substring -> staff pseudo-class
///   4. level digit + program keyword
/// Anything else is a no-match and the caller skips the row.
pub fn resolve_class(label: &str) -> Option<&'static str> {
    let normalized = normalize_label(label);
    if normalized.is_empty() {
        return None;
    }

    type Rule = fn(&str) -> Option<&'static str>;
    const RULES: [Rule; 4] = [
        |n| CLASS_CODES.iter().find(|c| normalize_label(c) == n).copied(),
        |n| {
            CLASS_CODES
                .iter()
                .find(|c| normalize_label(class_label(c)) == n)
                .copied()
        },
        |n| n.contains("servidor").then_some(STAFF_CODE),
        |n| find_level_digit(n).and_then(|level| program_code(n, level)),
    ];

    RULES.iter().find_map(|rule| rule(&normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_code_matches_case_insensitively() {
        assert_eq!(resolve_class("TIN I"), Some("TIN I"));
        assert_eq!(resolve_class("  tin ii "), Some("TIN II"));
        assert_eq!(resolve_class("servidores"), Some("SERVIDORES"));
    }

    #[test]
    fn full_label_matches_with_accents_folded() {
        assert_eq!(resolve_class("TÉCNICO EM INFORMÁTICA – 2"), Some("TIN II"));
        assert_eq!(
            resolve_class("técnico em segurança do trabalho – 3"),
            Some("TST III")
        );
    }

    #[test]
    fn staff_keyword_maps_to_pseudo_class() {
        assert_eq!(resolve_class("SERVIDOR"), Some("SERVIDORES"));
        assert_eq!(resolve_class("Servidores do campus"), Some("SERVIDORES"));
    }

    #[test]
    fn digit_plus_program_keyword_selects_level() {
        assert_eq!(resolve_class("2 informatica"), Some("TIN II"));
        assert_eq!(resolve_class("Automação 3"), Some("TAI III"));
        assert_eq!(resolve_class("seguranca do trabalho 1o ano"), Some("TST I"));
    }

    #[test]
    fn digit_followed_by_digit_is_not_a_level() {
        // "12" must not read as level 1; the 2 it ends with still counts.
        assert_eq!(resolve_class("sala 12 informatica"), Some("TIN II"));
        assert_eq!(resolve_class("informatica 10"), None);
    }

    #[test]
    fn unresolvable_labels_are_no_match() {
        assert_eq!(resolve_class("xyz"), None);
        assert_eq!(resolve_class(""), None);
        assert_eq!(resolve_class("2"), None);
        assert_eq!(resolve_class("informatica"), None);
    }

    #[test]
    fn resolver_is_deterministic() {
        for label in ["TIN I", "2 informatica", "SERVIDOR", "xyz"] {
            assert_eq!(resolve_class(label), resolve_class(label));
        }
    }

    #[test]
    fn display_order_is_a_permutation_of_the_enumeration() {
        let mut a = CLASS_CODES;
        let mut b = DISPLAY_ORDER;
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
}
