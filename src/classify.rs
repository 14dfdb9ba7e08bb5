// Status bucket predicates.
//
// The sheet's status column is free text maintained by hand, so matching
// mixes an exact vocabulary with substring containment, always on trimmed,
// lowercased input. Predicates can overlap; `classify` resolves overlap by
// a fixed priority order.
use crate::types::Obra;

/// Inclusive target-year window a completed record must fall in to count
/// toward the completion metric.
pub const COMPLETION_WINDOW: std::ops::RangeInclusive<i32> = 2017..=2025;

/// Exact, case-sensitive marker in the budget-flag column.
pub const BUDGET_FLAG_YES: &str = "SIM";

const IN_PROGRESS_EXACT: &[&str] = &[
    "em andamento",
    "andamento",
    "em execução",
    "execução",
    "em obra",
    "iniciada",
    "em construção",
    "construção",
];

const IN_PROCUREMENT_EXACT: &[&str] = &[
    "em contratação",
    "contratação",
    "em processo de contratação",
    "processo de contratação",
];

const PLANNED_EXACT: &[&str] = &["em planejamento", "planejamento"];

const COMPLETED_CONTAINS: &[&str] =
    &["concluída", "concluida", "finalizada", "entregue", "terminada"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    InProgress,
    InProcurement,
    Planned,
    Completed,
    Other,
}

impl Bucket {
    /// Display label used by the status distribution chart.
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::InProgress => "Em andamento",
            Bucket::InProcurement => "Em contratação",
            Bucket::Planned => "Em planejamento",
            Bucket::Completed => "Concluída",
            Bucket::Other => "Outros",
        }
    }
}

fn lower(status: &str) -> String {
    status.trim().to_lowercase()
}

pub fn is_in_progress(status: &str) -> bool {
    let s = lower(status);
    IN_PROGRESS_EXACT.contains(&s.as_str())
}

/// Broad on purpose: any status containing "contrata" counts, which admits
/// variants like "aguardando contratação".
pub fn is_in_procurement(status: &str) -> bool {
    let s = lower(status);
    IN_PROCUREMENT_EXACT.contains(&s.as_str()) || s.contains("contrata")
}

pub fn is_planned(status: &str) -> bool {
    let s = lower(status);
    PLANNED_EXACT.contains(&s.as_str()) || s.contains("planejamento")
}

pub fn is_completed(status: &str) -> bool {
    let s = lower(status);
    COMPLETED_CONTAINS.iter().any(|t| s.contains(t))
}

/// Assign a status to exactly one bucket.
///
/// Predicates overlap (procurement and planned use containment), so callers
/// that need disjoint buckets rely on this fixed priority: completed, then
/// in-progress, then in-procurement, then planned, then other.
pub fn classify(status: &str) -> Bucket {
    if is_completed(status) {
        Bucket::Completed
    } else if is_in_progress(status) {
        Bucket::InProgress
    } else if is_in_procurement(status) {
        Bucket::InProcurement
    } else if is_planned(status) {
        Bucket::Planned
    } else {
        Bucket::Other
    }
}

/// Planned AND flagged for the next fiscal budget list. The flag match is
/// exact and case-sensitive: only `"SIM"` counts, not `"sim"`.
pub fn is_planned_with_budget_flag(obra: &Obra) -> bool {
    is_planned(&obra.status) && obra.budget_flag.trim() == BUDGET_FLAG_YES
}

/// Completed AND inside the fixed completion window. Records completed
/// outside the window stay out of the completion count but still feed every
/// other aggregate.
pub fn is_completed_in_window(obra: &Obra) -> bool {
    is_completed(&obra.status) && COMPLETION_WINDOW.contains(&obra.target_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Obra;

    fn obra_with(status: &str, year: i32, flag: &str) -> Obra {
        Obra {
            protocol: "P1".into(),
            description: "Reforma".into(),
            locality: "Curitiba".into(),
            area: 0.0,
            category: String::new(),
            status: status.into(),
            target_year: year,
            planned_value: 0.0,
            contracted_value: 0.0,
            progress_percent: 0.0,
            force: "Não identificado".into(),
            budget_flag: flag.into(),
        }
    }

    #[test]
    fn progress_vocabulary_matches_any_casing() {
        for s in ["Em Andamento", "andamento", "EM EXECUÇÃO", "Em Construção", "iniciada"] {
            assert_eq!(classify(s), Bucket::InProgress, "status {s:?}");
        }
        // Containment is not enough for the progress bucket.
        assert_ne!(classify("obra em andamento avançado"), Bucket::InProgress);
    }

    #[test]
    fn procurement_matches_exact_and_containment() {
        assert_eq!(classify("Em Contratação"), Bucket::InProcurement);
        assert_eq!(classify("processo de contratação"), Bucket::InProcurement);
        assert_eq!(classify("aguardando contratação"), Bucket::InProcurement);
        assert!(is_in_procurement("CONTRATAÇÃO EM CURSO"));
    }

    #[test]
    fn priority_order_resolves_overlap() {
        // "concluída" containment beats everything else.
        assert_eq!(classify("Concluída (contratação direta)"), Bucket::Completed);
        // Planned loses to procurement when both contain.
        assert_eq!(classify("planejamento da contratação"), Bucket::InProcurement);
        assert_eq!(classify("Em análise"), Bucket::Other);
        assert_eq!(classify(""), Bucket::Other);
    }

    #[test]
    fn budget_flag_is_exact_case_sensitive() {
        assert!(is_planned_with_budget_flag(&obra_with("Em planejamento", 2026, "SIM")));
        assert!(!is_planned_with_budget_flag(&obra_with("Em planejamento", 2026, "sim")));
        assert!(!is_planned_with_budget_flag(&obra_with("Em planejamento", 2026, "")));
        assert!(!is_planned_with_budget_flag(&obra_with("Em andamento", 2026, "SIM")));
    }

    #[test]
    fn completion_window_bounds_are_inclusive() {
        assert!(is_completed_in_window(&obra_with("Concluída", 2017, "")));
        assert!(is_completed_in_window(&obra_with("Concluída", 2025, "")));
        assert!(!is_completed_in_window(&obra_with("Concluída", 2016, "")));
        assert!(!is_completed_in_window(&obra_with("Concluída", 2026, "")));
        assert!(!is_completed_in_window(&obra_with("Em andamento", 2024, "")));
    }
}
