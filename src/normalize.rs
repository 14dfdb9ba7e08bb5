// Validity filter and record normalizer.
//
// Rows arrive keyed by whatever headers the sheet happens to carry, with
// casing and naming drifting over time. Each canonical field is resolved
// through an ordered candidate list (named keys first, a sheet position as
// last resort) and a field-specific parse step with a documented default.
use crate::types::{Obra, RawRow};
use crate::util::{
    extract_year, parse_float_prefix, parse_money_naive, parse_money_stripped,
    parse_number_or_zero,
};
use chrono::{Datelike, Utc};
use tracing::debug;

const PROTOCOL_KEYS: &[&str] = &["PROTOCOLO", "protocolo"];
const DESCRIPTION_KEYS: &[&str] = &["OBJETO", "objeto"];
const STATUS_KEYS: &[&str] = &["STATUS", "status"];
const AREA_KEYS: &[&str] = &["ÁREA (m²)", "area", "AREA"];
const CATEGORY_KEYS: &[&str] = &["TIPO", "tipo"];
const LOCALITY_KEYS: &[&str] =
    &["LOCALIZAÇÃO", "LOCALIZACAO", "MUNICÍPIO", "MUNICIPIO", "LOCAL", "local"];
const END_DATE_KEYS: &[&str] = &["DATA TÉRMINO", "DATA_TERMINO"];
const PLANNED_KEYS: &[&str] = &["VALOR PREVISTO", "valorprevisto"];
const CONTRACTED_KEYS: &[&str] = &["VALOR CONTRATADO", "valorcontratado"];
const FORCE_KEYS: &[&str] = &["FORÇA", "FORCA", "forca"];
const BUDGET_FLAG_KEY: &str = "LOA 2026";

// Sheet positions used when headers have been renamed: H carries the status,
// N the end date, X the geolocation column.
const STATUS_COL: usize = 7;
const END_DATE_COL: usize = 13;
const LOCALITY_COL: usize = 23;

pub const UNIDENTIFIED_FORCE: &str = "Não identificado";

/// The two row-to-record mappings observed in production.
///
/// `Script` is the canonical pipeline behind the script endpoint: keyed
/// candidates with positional fallbacks, force and budget flag read from
/// their own columns. `SheetsApi` is the legacy service mapping: purely
/// positional columns and a text heuristic for the force. They are kept as
/// named strategies rather than merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStrategy {
    Script,
    SheetsApi,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub skipped_rows: usize,
}

/// A row is worth normalizing if it has a protocol, or both a description
/// and a status. This drops blank rows and stray header/footer artifacts
/// while still admitting early-stage entries that have no protocol yet.
/// Whitespace-only cells count as empty.
pub fn is_filled_row(row: &RawRow) -> bool {
    let has_protocol = row.first_text(PROTOCOL_KEYS).is_some();
    let has_description = row.first_text(DESCRIPTION_KEYS).is_some();
    let has_status = row.first_text(STATUS_KEYS).is_some();
    has_protocol || (has_description && has_status)
}

/// Filter and normalize a full load. The synthesized `P<n>` protocol uses
/// the index within the filtered set, matching what consumers expect.
pub fn normalize_rows(
    rows: &[RawRow],
    strategy: MapStrategy,
    fallback_year: i32,
) -> (Vec<Obra>, NormalizeReport) {
    let total_rows = rows.len();
    let records: Vec<Obra> = rows
        .iter()
        .filter(|r| is_filled_row(r))
        .enumerate()
        .map(|(idx, row)| match strategy {
            MapStrategy::Script => map_script_row(row, idx, fallback_year),
            MapStrategy::SheetsApi => map_sheets_row(row, idx),
        })
        .collect();
    let report = NormalizeReport {
        total_rows,
        kept_rows: records.len(),
        skipped_rows: total_rows - records.len(),
    };
    (records, report)
}

fn map_script_row(row: &RawRow, idx: usize, fallback_year: i32) -> Obra {
    // Geolocation column first (by position, its header name is not
    // stable), generic LOCAL only as a late fallback.
    let locality = row
        .by_index(LOCALITY_COL)
        .and_then(|v| v.as_text())
        .or_else(|| row.first_text(LOCALITY_KEYS))
        .unwrap_or_else(|| "Não informado".to_string());

    // Position first here too; the end-date header drifts between exports.
    let end_date = row
        .by_index(END_DATE_COL)
        .and_then(|v| v.as_text())
        .or_else(|| row.first_text(END_DATE_KEYS));
    let target_year = match end_date.as_deref().and_then(extract_year) {
        Some(y) => y,
        None => {
            debug!(row = idx, "no 4-digit year in end date, using fallback");
            fallback_year
        }
    };

    Obra {
        protocol: row
            .first_text(PROTOCOL_KEYS)
            .unwrap_or_else(|| format!("P{}", idx + 1)),
        description: row
            .first_text(DESCRIPTION_KEYS)
            .unwrap_or_else(|| "Sem descrição".to_string()),
        locality,
        area: row
            .first_text(AREA_KEYS)
            .map(|s| parse_number_or_zero(&s))
            .unwrap_or(0.0),
        category: row
            .first_text(CATEGORY_KEYS)
            .unwrap_or_else(|| "Não definido".to_string()),
        status: row
            .first_text_or_index(STATUS_KEYS, STATUS_COL)
            .unwrap_or_else(|| "Em análise".to_string()),
        target_year,
        planned_value: row
            .first_text(PLANNED_KEYS)
            .map(|s| parse_money_naive(&s))
            .unwrap_or(0.0),
        contracted_value: row
            .first_text(CONTRACTED_KEYS)
            .map(|s| parse_money_naive(&s))
            .unwrap_or(0.0),
        // The sheet no longer tracks progress; the field stays on the record
        // for completeness.
        progress_percent: 0.0,
        force: row
            .first_text(FORCE_KEYS)
            .unwrap_or_else(|| UNIDENTIFIED_FORCE.to_string()),
        budget_flag: row
            .get(BUDGET_FLAG_KEY)
            .and_then(|v| v.as_text())
            .unwrap_or_default(),
    }
}

fn map_sheets_row(row: &RawRow, idx: usize) -> Obra {
    let text_at = |i: usize| row.by_index(i).and_then(|v| v.as_text());
    let description = text_at(1).unwrap_or_else(|| "Sem descrição".to_string());
    let locality = text_at(2).unwrap_or_else(|| "Não informado".to_string());
    let force = infer_force(&description, &locality);

    // The legacy path parsed the year as a plain integer; anything that is
    // not a 4-digit year falls back to the current cycle.
    let current_year = Utc::now().year();
    let target_year = text_at(6)
        .and_then(|s| parse_float_prefix(&s))
        .map(|f| f as i32)
        .filter(|y| (1000..=9999).contains(y))
        .unwrap_or(current_year);

    Obra {
        protocol: text_at(0).unwrap_or_else(|| format!("P{}", idx + 1)),
        description,
        locality,
        area: text_at(3).map(|s| parse_number_or_zero(&s)).unwrap_or(0.0),
        category: text_at(4).unwrap_or_else(|| "Não definido".to_string()),
        status: text_at(5).unwrap_or_else(|| "Em análise".to_string()),
        target_year,
        planned_value: text_at(7).map(|s| parse_money_stripped(&s)).unwrap_or(0.0),
        contracted_value: text_at(8).map(|s| parse_money_stripped(&s)).unwrap_or(0.0),
        progress_percent: text_at(9).map(|s| parse_number_or_zero(&s)).unwrap_or(0.0),
        force,
        budget_flag: String::new(),
    }
}

/// Legacy force inference: keyword scan over description + locality.
/// Always yields a grouping key, "Não identificado" at worst.
pub fn infer_force(description: &str, locality: &str) -> String {
    let text = format!("{} {}", description, locality).to_lowercase();
    if text.contains("bombeiro") || text.contains("cbm") {
        "Bombeiros".to_string()
    } else if text.contains("polícia militar") || text.contains("pm") {
        "Polícia Militar".to_string()
    } else if text.contains("polícia civil") || text.contains("pc") {
        "Polícia Civil".to_string()
    } else if text.contains("polícia científica") || text.contains("ic") {
        "Polícia Científica".to_string()
    } else if text.contains("casa custódia") || text.contains("penitenciária") {
        "DEPEN".to_string()
    } else {
        UNIDENTIFIED_FORCE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow {
            columns: pairs
                .iter()
                .map(|(k, v)| {
                    let cell = if v.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(v.to_string())
                    };
                    (k.to_string(), cell)
                })
                .collect(),
        }
    }

    #[test]
    fn filter_accepts_description_plus_status_without_protocol() {
        let r = row(&[("PROTOCOLO", ""), ("OBJETO", "Reforma"), ("STATUS", "Em andamento")]);
        assert!(is_filled_row(&r));
    }

    #[test]
    fn filter_rejects_blank_and_whitespace_rows() {
        assert!(!is_filled_row(&row(&[("PROTOCOLO", "  "), ("OBJETO", ""), ("STATUS", "")])));
        assert!(!is_filled_row(&row(&[("OBJETO", "Reforma"), ("STATUS", "   ")])));
        assert!(is_filled_row(&row(&[("PROTOCOLO", "123.456")])));
    }

    #[test]
    fn first_filtered_row_gets_synthesized_protocol() {
        let rows = vec![
            row(&[("PROTOCOLO", ""), ("OBJETO", ""), ("STATUS", "")]), // dropped
            row(&[("PROTOCOLO", ""), ("OBJETO", "Reforma"), ("STATUS", "Em andamento")]),
        ];
        let (records, report) = normalize_rows(&rows, MapStrategy::Script, 2024);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.kept_rows, 1);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(records[0].protocol, "P1");
        assert_eq!(records[0].description, "Reforma");
        assert_eq!(records[0].status, "Em andamento");
    }

    #[test]
    fn missing_numeric_candidates_default_to_zero() {
        let r = row(&[("PROTOCOLO", "P9")]);
        let (records, _) = normalize_rows(&[r], MapStrategy::Script, 2024);
        let obra = &records[0];
        assert_eq!(obra.area, 0.0);
        assert_eq!(obra.planned_value, 0.0);
        assert_eq!(obra.contracted_value, 0.0);
        assert_eq!(obra.progress_percent, 0.0);
        assert_eq!(obra.target_year, 2024);
        assert_eq!(obra.force, UNIDENTIFIED_FORCE);
        assert_eq!(obra.budget_flag, "");
        assert_eq!(obra.description, "Sem descrição");
        assert_eq!(obra.locality, "Não informado");
    }

    #[test]
    fn currency_fields_use_the_naive_rule() {
        let r = row(&[("PROTOCOLO", "P1"), ("VALOR PREVISTO", "R$ 1.234,56")]);
        let (records, _) = normalize_rows(&[r], MapStrategy::Script, 2024);
        // Documented imperfect behavior, not a bug to correct.
        assert_eq!(records[0].planned_value, 1.234);
    }

    #[test]
    fn year_comes_from_the_first_four_digit_run() {
        let r = row(&[("PROTOCOLO", "P1"), ("DATA TÉRMINO", "31/12/2025")]);
        let (records, _) = normalize_rows(&[r], MapStrategy::Script, 2024);
        assert_eq!(records[0].target_year, 2025);
    }

    #[test]
    fn locality_prefers_positional_geolocation_column() {
        let mut pairs: Vec<(String, CellValue)> = (0..24)
            .map(|i| (format!("col{}", i), CellValue::Empty))
            .collect();
        pairs[0] = ("PROTOCOLO".to_string(), CellValue::Text("P1".into()));
        pairs[23] = ("GEO".to_string(), CellValue::Text("Curitiba, Brasil".into()));
        let mut r = RawRow { columns: pairs };
        r.columns.push(("LOCAL".to_string(), CellValue::Text("Sede".into())));
        let (records, _) = normalize_rows(&[r], MapStrategy::Script, 2024);
        // Suffix survives normalization; it is stripped at display time.
        assert_eq!(records[0].locality, "Curitiba, Brasil");
    }

    #[test]
    fn normalizer_is_idempotent() {
        let rows = vec![row(&[
            ("PROTOCOLO", "18.456.789-0"),
            ("OBJETO", "Construção de Quartel do Corpo de Bombeiros"),
            ("STATUS", "Em andamento"),
            ("VALOR PREVISTO", "R$ 2.500.000,00"),
            ("DATA TÉRMINO", "2024-12-01"),
        ])];
        let (a, _) = normalize_rows(&rows, MapStrategy::Script, 2024);
        let (b, _) = normalize_rows(&rows, MapStrategy::Script, 2024);
        assert_eq!(a, b);
    }

    #[test]
    fn sheets_strategy_maps_positionally_and_infers_force() {
        let r = RawRow {
            columns: vec![
                ("c0".into(), CellValue::Text("P010".into())),
                ("c1".into(), CellValue::Text("Reforma de Delegacia da Polícia Civil".into())),
                ("c2".into(), CellValue::Text("Londrina".into())),
                ("c3".into(), CellValue::Text("800".into())),
                ("c4".into(), CellValue::Text("Reforma".into())),
                ("c5".into(), CellValue::Text("Em planejamento".into())),
                ("c6".into(), CellValue::Text("2026".into())),
                ("c7".into(), CellValue::Text("R$ 1.234,56".into())),
                ("c8".into(), CellValue::Text("R$ 750.000".into())),
                ("c9".into(), CellValue::Text("15".into())),
            ],
        };
        let (records, _) = normalize_rows(&[r], MapStrategy::SheetsApi, 2024);
        let obra = &records[0];
        assert_eq!(obra.protocol, "P010");
        assert_eq!(obra.force, "Polícia Civil");
        assert_eq!(obra.target_year, 2026);
        // Legacy strip removes both separators before parsing.
        assert_eq!(obra.planned_value, 123456.0);
        assert_eq!(obra.contracted_value, 750000.0);
        assert_eq!(obra.progress_percent, 15.0);
    }

    #[test]
    fn force_inference_keywords() {
        assert_eq!(infer_force("Quartel do Corpo de Bombeiros", ""), "Bombeiros");
        assert_eq!(infer_force("Sede da Polícia Militar", ""), "Polícia Militar");
        assert_eq!(infer_force("Reforma de Casa Custódia", ""), "DEPEN");
        assert_eq!(infer_force("Reforma administrativa", "Curitiba"), UNIDENTIFIED_FORCE);
    }
}
