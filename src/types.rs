use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

/// One cell of a raw spreadsheet row.
///
/// The upstream script returns whatever the sheet holds, so a cell is either
/// text, a number, or empty. Booleans are folded into text since the sheet
/// renders them as words anyway.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Empty,
            },
            Value::Bool(b) => CellValue::Text(b.to_string()),
            _ => CellValue::Empty,
        }
    }

    /// Cell rendered as trimmed text, `None` when empty or whitespace-only.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            CellValue::Number(n) => Some(trim_float(*n)),
            CellValue::Empty => None,
        }
    }
}

// Numbers come back from the sheet as `123` or `12.5`, never `123.0`.
fn trim_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A raw row keyed by the sheet's own column labels, in sheet order.
///
/// Column order carries meaning: when a header is renamed upstream we fall
/// back to addressing cells by position (column H is index 7, N is 13, X is
/// 23), so the pairs are kept as an ordered list rather than a map.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub columns: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn from_json_object(obj: &serde_json::Map<String, Value>) -> Self {
        RawRow {
            columns: obj
                .iter()
                .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                .collect(),
        }
    }

    /// Exact-label lookup.
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.columns.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Cell at a sheet position, regardless of what the header says.
    pub fn by_index(&self, idx: usize) -> Option<&CellValue> {
        self.columns.get(idx).map(|(_, v)| v)
    }

    /// First non-empty text among an ordered candidate key list.
    pub fn first_text(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .filter_map(|k| self.get(k))
            .find_map(|v| v.as_text())
    }

    /// Like `first_text`, but falls back to a positional column when every
    /// named candidate is empty.
    pub fn first_text_or_index(&self, candidates: &[&str], idx: usize) -> Option<String> {
        self.first_text(candidates)
            .or_else(|| self.by_index(idx).and_then(|v| v.as_text()))
    }
}

/// The canonical record ("obra") every downstream view consumes.
///
/// Invariants: `protocol` and `description` are never empty (placeholder
/// filled), numeric fields are non-negative and never fail to parse
/// (defaulted to 0), `target_year` is always a 4-digit integer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obra {
    pub protocol: String,
    pub description: String,
    /// Free-text place name; may carry a `", Brasil"` style suffix that is
    /// stripped at display time, not here.
    pub locality: String,
    pub area: f64,
    pub category: String,
    /// Raw status label, source of truth for bucket classification. Never
    /// normalized at ingestion; all matching lowercases downstream.
    pub status: String,
    pub target_year: i32,
    pub planned_value: f64,
    pub contracted_value: f64,
    pub progress_percent: f64,
    pub force: String,
    /// Inclusion marker for the next fiscal allocation list (`"SIM"` when
    /// set), empty string otherwise.
    pub budget_flag: String,
}

impl Obra {
    /// The per-record currency rule used by every aggregate: contracted
    /// value when non-zero, planned value otherwise.
    pub fn effective_value(&self) -> f64 {
        if self.contracted_value > 0.0 {
            self.contracted_value
        } else {
            self.planned_value
        }
    }
}

/// Summary metrics for the current record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total_obras: usize,
    /// Contracted-or-planned summed over all records.
    pub orcamento_total: f64,
    pub obras_andamento: usize,
    pub valor_obras_andamento: f64,
    pub obras_contratacao: usize,
    pub valor_obras_contratacao: f64,
    /// Planned works flagged for the next fiscal budget list.
    pub obras_planejamento_loa: usize,
    /// Completed works whose target year falls inside the 2017-2025 window.
    pub obras_concluidas: usize,
}

/// Optional record filters applied by the state container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub force: Option<String>,
    pub status: Option<String>,
    pub year: Option<i32>,
    pub municipality: Option<String>,
}

/// Where the records currently in the store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Loading,
    Script,
    SheetsApi,
    Mock,
    Error,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ObraListRow {
    #[serde(rename = "Protocolo")]
    #[tabled(rename = "Protocolo")]
    pub protocol: String,
    #[serde(rename = "Objeto")]
    #[tabled(rename = "Objeto")]
    pub description: String,
    #[serde(rename = "Local")]
    #[tabled(rename = "Local")]
    pub locality: String,
    #[serde(rename = "Forca")]
    #[tabled(rename = "Forca")]
    pub force: String,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ForceSummaryRow {
    #[serde(rename = "Forca")]
    #[tabled(rename = "Forca")]
    pub force: String,
    #[serde(rename = "Obras")]
    #[tabled(rename = "Obras")]
    pub count: usize,
    #[serde(rename = "ValorTotal")]
    #[tabled(rename = "ValorTotal")]
    pub total_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StatusBreakdownRow {
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub bucket: String,
    #[serde(rename = "Obras")]
    #[tabled(rename = "Obras")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearCompletionRow {
    #[serde(rename = "Ano")]
    #[tabled(rename = "Ano")]
    pub year: i32,
    #[serde(rename = "Concluidas")]
    #[tabled(rename = "Concluidas")]
    pub completed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_trims_and_rejects_whitespace() {
        assert_eq!(CellValue::Text("  Reforma ".into()).as_text(), Some("Reforma".into()));
        assert_eq!(CellValue::Text("   ".into()).as_text(), None);
        assert_eq!(CellValue::Empty.as_text(), None);
        assert_eq!(CellValue::Number(1200.0).as_text(), Some("1200".into()));
        assert_eq!(CellValue::Number(65.5).as_text(), Some("65.5".into()));
    }

    #[test]
    fn raw_row_prefers_candidates_in_order() {
        let row = RawRow {
            columns: vec![
                ("protocolo".into(), CellValue::Text("p-low".into())),
                ("PROTOCOLO".into(), CellValue::Text("P-UP".into())),
            ],
        };
        assert_eq!(row.first_text(&["PROTOCOLO", "protocolo"]), Some("P-UP".into()));
        assert_eq!(row.first_text(&["protocolo", "PROTOCOLO"]), Some("p-low".into()));
        assert_eq!(row.first_text(&["OUTRO"]), None);
    }

    #[test]
    fn positional_fallback_reads_sheet_order() {
        let row = RawRow {
            columns: vec![
                ("A".into(), CellValue::Text("first".into())),
                ("B".into(), CellValue::Empty),
                ("C".into(), CellValue::Text("third".into())),
            ],
        };
        assert_eq!(row.first_text_or_index(&["missing"], 2), Some("third".into()));
        assert_eq!(row.first_text_or_index(&["missing"], 1), None);
    }

    #[test]
    fn effective_value_prefers_nonzero_contracted() {
        let mut obra = sample();
        obra.contracted_value = 2_300_000.0;
        obra.planned_value = 2_500_000.0;
        assert_eq!(obra.effective_value(), 2_300_000.0);
        obra.contracted_value = 0.0;
        assert_eq!(obra.effective_value(), 2_500_000.0);
    }

    pub(crate) fn sample() -> Obra {
        Obra {
            protocol: "P001".into(),
            description: "Construção de Quartel".into(),
            locality: "Curitiba".into(),
            area: 1200.0,
            category: "Construção".into(),
            status: "Em andamento".into(),
            target_year: 2024,
            planned_value: 2_500_000.0,
            contracted_value: 2_300_000.0,
            progress_percent: 0.0,
            force: "CBMPR".into(),
            budget_flag: String::new(),
        }
    }
}
