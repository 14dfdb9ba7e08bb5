// Application state container.
//
// Single writer (the load pipeline), read-only projections for everything
// else. Records are replaced wholesale on each successful load; filters and
// metrics are recomputed on every write, never lazily out of band.
use crate::metrics;
use crate::types::{DataSource, Filters, Metrics, Obra};
use chrono::{DateTime, Utc};

/// Token for one load attempt. Only the most recently issued token may
/// commit or fail, so a stale in-flight response can never overwrite the
/// result of a newer refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug)]
pub struct AppState {
    records: Vec<Obra>,
    filtered: Vec<Obra>,
    filters: Filters,
    metrics: Metrics,
    source: DataSource,
    last_update: Option<DateTime<Utc>>,
    generation: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            records: Vec::new(),
            filtered: Vec::new(),
            filters: Filters::default(),
            metrics: Metrics::default(),
            source: DataSource::Loading,
            last_update: None,
            generation: 0,
        }
    }

    /// Start a load attempt. Any ticket issued earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    fn ticket_is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Replace the record set wholesale. Returns false (and changes
    /// nothing) when a newer load has started since the ticket was issued.
    pub fn commit(&mut self, ticket: LoadTicket, records: Vec<Obra>, source: DataSource) -> bool {
        if !self.ticket_is_current(ticket) {
            return false;
        }
        self.records = records;
        self.source = source;
        self.last_update = Some(Utc::now());
        self.reproject();
        true
    }

    /// Record a failed load: the record set is cleared and the error status
    /// set. Same staleness rule as `commit`.
    pub fn fail(&mut self, ticket: LoadTicket) -> bool {
        if !self.ticket_is_current(ticket) {
            return false;
        }
        self.records.clear();
        self.source = DataSource::Error;
        self.last_update = Some(Utc::now());
        self.reproject();
        true
    }

    /// Merge partial filters in, as the UI does field by field.
    pub fn set_filters(&mut self, new: Filters) {
        if new.force.is_some() {
            self.filters.force = new.force;
        }
        if new.status.is_some() {
            self.filters.status = new.status;
        }
        if new.year.is_some() {
            self.filters.year = new.year;
        }
        if new.municipality.is_some() {
            self.filters.municipality = new.municipality;
        }
        self.reproject();
    }

    pub fn clear_filters(&mut self) {
        self.filters = Filters::default();
        self.reproject();
    }

    fn reproject(&mut self) {
        let f = &self.filters;
        self.filtered = self
            .records
            .iter()
            .filter(|o| match &f.force {
                Some(force) => &o.force == force,
                None => true,
            })
            .filter(|o| match &f.status {
                Some(s) => o.status.to_lowercase().contains(&s.to_lowercase()),
                None => true,
            })
            .filter(|o| match f.year {
                Some(y) => o.target_year == y,
                None => true,
            })
            .filter(|o| match &f.municipality {
                Some(m) => o.locality.to_lowercase().contains(&m.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();
        self.metrics = metrics::compute(&self.filtered);
    }

    pub fn records(&self) -> &[Obra] {
        &self.records
    }

    pub fn filtered(&self) -> &[Obra] {
        &self.filtered
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}
