// Dashboard summary metrics.
//
// A pure reduce over the current record set: same records in, same metrics
// out. The store recomputes this on every write.
use crate::classify::{
    is_completed_in_window, is_in_procurement, is_in_progress, is_planned_with_budget_flag,
};
use crate::types::{Metrics, Obra};

pub fn compute(records: &[Obra]) -> Metrics {
    if records.is_empty() {
        return Metrics::default();
    }

    let mut m = Metrics {
        total_obras: records.len(),
        ..Metrics::default()
    };

    for obra in records {
        // Contracted-if-nonzero-else-planned, applied per record.
        m.orcamento_total += obra.effective_value();

        if is_in_progress(&obra.status) {
            m.obras_andamento += 1;
            m.valor_obras_andamento += obra.effective_value();
        }
        if is_in_procurement(&obra.status) {
            m.obras_contratacao += 1;
            m.valor_obras_contratacao += obra.effective_value();
        }
        if is_planned_with_budget_flag(obra) {
            m.obras_planejamento_loa += 1;
        }
        if is_completed_in_window(obra) {
            m.obras_concluidas += 1;
        }
    }

    m
}
