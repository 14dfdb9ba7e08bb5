// Utility helpers for parsing and text cleanup.
//
// This module centralizes all the "dirty" spreadsheet value handling so the
// rest of the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());
static REGION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i), ?(PT-BR|PR-BR|Brasil|Brazil)$").unwrap());

/// Parse the longest leading float prefix of a string, the way a spreadsheet
/// formula or a loose scripting runtime would.
///
/// - Skips leading whitespace.
/// - Accepts an optional sign, digits, and at most one decimal point.
/// - Stops at the first character that cannot extend the number, so
///   `"1.234,56"` parses as `1.234` and `"123 obs"` parses as `123`.
/// - Returns `None` when no digit is found at all.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => end = i + 1,
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// Currency parse used by the canonical (script endpoint) mapping.
///
/// Strips every character that is not a digit, comma, or period and then
/// takes the float prefix. The thousands-vs-decimal separator ambiguity is
/// deliberately not resolved: `"R$ 1.234,56"` becomes `"1.234,56"` and
/// parses as `1.234`. Consumers compensate downstream; do not "fix" this
/// here. Failures and negatives resolve to 0.
pub fn parse_money_naive(s: &str) -> f64 {
    let kept: String = s.chars().filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.').collect();
    parse_float_prefix(&kept).unwrap_or(0.0).max(0.0)
}

/// Currency parse used by the legacy (Sheets API) mapping.
///
/// Removes `R`, `$` and both separators outright before taking the float
/// prefix, so `"R$ 1.234,56"` parses as `123456`. Failures and negatives
/// resolve to 0.
pub fn parse_money_stripped(s: &str) -> f64 {
    let kept: String = s.chars().filter(|c| !matches!(c, 'R' | '$' | '.' | ',')).collect();
    parse_float_prefix(&kept).unwrap_or(0.0).max(0.0)
}

/// Plain numeric field (area, progress): float prefix with a 0 default,
/// clamped non-negative.
pub fn parse_number_or_zero(s: &str) -> f64 {
    parse_float_prefix(s).unwrap_or(0.0).max(0.0)
}

/// Extract the first run of exactly four digits anywhere in a date-like
/// string (`"31/12/2025"`, `"2024-06-01"`, `"dez/2023"` all work).
pub fn extract_year(s: &str) -> Option<i32> {
    YEAR_RUN.find(s).and_then(|m| m.as_str().parse().ok())
}

/// Drop a trailing country/state token (`", Brasil"`, `", PT-BR"`, ...) from
/// a locality. Applied at display and geocoding time, never at ingestion.
pub fn strip_region_suffix(s: &str) -> String {
    REGION_SUFFIX.replace(s, "").trim().to_string()
}

/// Normalize a municipality name for matching: lowercase, fold the
/// Portuguese accented set, drop everything that is not `[a-z0-9]`.
pub fn normalize_city_name(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(fold_diacritic)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Compact money label used across the dashboard: `R$ 2.5M` above one
/// million, `R$ 800 mil` below.
pub fn format_brl_compact(v: f64) -> String {
    if v >= 1_000_000.0 {
        format!("R$ {:.1}M", v / 1_000_000.0)
    } else {
        format!("R$ {:.0} mil", v / 1_000.0)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values, used for
    // counts in console messages (e.g., `1,083 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_prefix_mirrors_loose_parsing() {
        assert_eq!(parse_float_prefix("1.234,56"), Some(1.234));
        assert_eq!(parse_float_prefix("  123456"), Some(123456.0));
        assert_eq!(parse_float_prefix("-12.5 obs"), Some(-12.5));
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix(""), None);
        assert_eq!(parse_float_prefix("12."), Some(12.0));
    }

    #[test]
    fn naive_money_keeps_separators() {
        // The documented imperfect rule: separators survive the strip, the
        // prefix parse stops at the comma.
        assert_eq!(parse_money_naive("R$ 1.234,56"), 1.234);
        assert_eq!(parse_money_naive("R$ 2.500.000,00"), 2.5);
        assert_eq!(parse_money_naive("1500000"), 1_500_000.0);
        assert_eq!(parse_money_naive(""), 0.0);
        assert_eq!(parse_money_naive("a definir"), 0.0);
    }

    #[test]
    fn stripped_money_removes_separators() {
        assert_eq!(parse_money_stripped("R$ 1.234,56"), 123456.0);
        assert_eq!(parse_money_stripped("R$ 800.000"), 800000.0);
        assert_eq!(parse_money_stripped("sem valor"), 0.0);
    }

    #[test]
    fn year_extraction_finds_first_four_digit_run() {
        assert_eq!(extract_year("31/12/2025"), Some(2025));
        assert_eq!(extract_year("2024-06-01"), Some(2024));
        assert_eq!(extract_year("previsto para dez/2023"), Some(2023));
        assert_eq!(extract_year("sem data"), None);
    }

    #[test]
    fn region_suffix_is_stripped_case_insensitively() {
        assert_eq!(strip_region_suffix("Curitiba, Brazil"), "Curitiba");
        assert_eq!(strip_region_suffix("Londrina, brasil"), "Londrina");
        assert_eq!(strip_region_suffix("Maringá, PR-BR"), "Maringá");
        assert_eq!(strip_region_suffix("Toledo"), "Toledo");
    }

    #[test]
    fn city_normalization_folds_accents_and_punctuation() {
        assert_eq!(normalize_city_name("São José dos Pinhais"), "saojosedospinhais");
        assert_eq!(normalize_city_name("Foz do Iguaçu"), "fozdoiguacu");
        assert_eq!(normalize_city_name("MARINGÁ"), "maringa");
    }

    #[test]
    fn compact_money_switches_units_at_one_million() {
        assert_eq!(format_brl_compact(2_500_000.0), "R$ 2.5M");
        assert_eq!(format_brl_compact(800_000.0), "R$ 800 mil");
    }
}
