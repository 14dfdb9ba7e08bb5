use crate::classify::{
    classify, is_completed_in_window, is_in_procurement, is_in_progress, Bucket,
};
use crate::geocode::{BatchReport, Coordinates};
use crate::types::{ForceSummaryRow, Obra, ObraListRow, StatusBreakdownRow, YearCompletionRow};
use crate::util::{format_brl_compact, strip_region_suffix};
use serde::Serialize;
use std::collections::HashMap;

// Years shown on the completions chart. Narrower than the eligibility
// window on purpose: early years are counted but not plotted.
const DISPLAY_YEARS: std::ops::RangeInclusive<i32> = 2020..=2025;

fn listing_row(obra: &Obra) -> ObraListRow {
    ObraListRow {
        protocol: obra.protocol.clone(),
        description: obra.description.clone(),
        // Country/state suffixes are a display concern, stripped here.
        locality: strip_region_suffix(&obra.locality),
        force: obra.force.clone(),
        value: format_brl_compact(obra.effective_value()),
    }
}

/// Works currently executing, for the main dashboard table.
pub fn active_rows(records: &[Obra]) -> Vec<ObraListRow> {
    records
        .iter()
        .filter(|o| is_in_progress(&o.status))
        .map(listing_row)
        .collect()
}

/// Works in the procurement pipeline.
pub fn procurement_rows(records: &[Obra]) -> Vec<ObraListRow> {
    records
        .iter()
        .filter(|o| is_in_procurement(&o.status))
        .map(listing_row)
        .collect()
}

/// Per-force count and value over the executing subset, feeding the two
/// per-force charts.
pub fn force_summary(records: &[Obra]) -> Vec<ForceSummaryRow> {
    #[derive(Default)]
    struct Acc {
        count: usize,
        value: f64,
    }
    let mut map: HashMap<String, Acc> = HashMap::new();
    for o in records.iter().filter(|o| is_in_progress(&o.status)) {
        let e = map.entry(o.force.clone()).or_default();
        e.count += 1;
        e.value += o.effective_value();
    }
    let mut rows: Vec<(usize, ForceSummaryRow)> = map
        .into_iter()
        .map(|(force, acc)| {
            (
                acc.count,
                ForceSummaryRow {
                    force,
                    count: acc.count,
                    total_value: format_brl_compact(acc.value),
                },
            )
        })
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.force.cmp(&b.1.force)));
    rows.into_iter().map(|(_, row)| row).collect()
}

/// Disjoint status distribution for the status chart. Each record lands in
/// exactly one bucket via the fixed-priority classifier.
pub fn status_breakdown(records: &[Obra]) -> Vec<StatusBreakdownRow> {
    let order = [
        Bucket::Completed,
        Bucket::InProgress,
        Bucket::InProcurement,
        Bucket::Planned,
        Bucket::Other,
    ];
    let mut counts: HashMap<Bucket, usize> = HashMap::new();
    for o in records {
        *counts.entry(classify(&o.status)).or_insert(0) += 1;
    }
    order
        .iter()
        .map(|b| StatusBreakdownRow {
            bucket: b.label().to_string(),
            count: counts.get(b).copied().unwrap_or(0),
        })
        .collect()
}

/// Completions per year for the chart series. Every display year appears,
/// zero-filled, so the axis stays stable between refreshes.
pub fn completed_by_year(records: &[Obra]) -> Vec<YearCompletionRow> {
    let mut per_year: HashMap<i32, usize> = HashMap::new();
    for o in records.iter().filter(|o| is_completed_in_window(o)) {
        *per_year.entry(o.target_year).or_insert(0) += 1;
    }
    DISPLAY_YEARS
        .map(|year| YearCompletionRow {
            year,
            completed: per_year.get(&year).copied().unwrap_or(0),
        })
        .collect()
}

/// One marker on the map: a locality with coordinates and the works that
/// resolved there.
#[derive(Debug, Clone, Serialize)]
pub struct MapPoint {
    pub locality: String,
    pub lat: f64,
    pub lon: f64,
    pub count: usize,
    /// Most frequent force at this location, used for the marker color.
    pub dominant_force: String,
    pub protocols: Vec<String>,
}

/// The map feed: executing works grouped by resolved coordinates, plus the
/// explicit count of works whose locality has no coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct MapFeed {
    pub points: Vec<MapPoint>,
    pub without_coordinates: usize,
}

pub fn map_feed(records: &[Obra], geocoded: &BatchReport) -> MapFeed {
    // The map plots executing works when there are any, everything
    // otherwise.
    let active: Vec<&Obra> = records.iter().filter(|o| is_in_progress(&o.status)).collect();
    let shown: Vec<&Obra> = if active.is_empty() {
        records.iter().collect()
    } else {
        active
    };

    #[derive(Default)]
    struct Group {
        obras: Vec<usize>,
    }
    let mut groups: HashMap<String, (Coordinates, Group)> = HashMap::new();
    let mut without_coordinates = 0usize;

    for (i, obra) in shown.iter().enumerate() {
        let clean = strip_region_suffix(&obra.locality);
        match geocoded.resolved.get(&clean) {
            Some(coords) => {
                groups
                    .entry(clean)
                    .or_insert_with(|| (*coords, Group::default()))
                    .1
                    .obras
                    .push(i);
            }
            None => without_coordinates += 1,
        }
    }

    let mut points: Vec<MapPoint> = groups
        .into_iter()
        .map(|(locality, (coords, group))| {
            let mut force_counts: HashMap<&str, usize> = HashMap::new();
            for &i in &group.obras {
                *force_counts.entry(shown[i].force.as_str()).or_insert(0) += 1;
            }
            let dominant_force = force_counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(force, _)| force.to_string())
                .unwrap_or_default();
            MapPoint {
                locality,
                lat: coords.0,
                lon: coords.1,
                count: group.obras.len(),
                dominant_force,
                protocols: group.obras.iter().map(|&i| shown[i].protocol.clone()).collect(),
            }
        })
        .collect();
    points.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.locality.cmp(&b.locality)));

    MapFeed {
        points,
        without_coordinates,
    }
}
