// Locality resolution for the map feed.
//
// Most localities are Paraná municipalities and resolve against a static
// table (exact, then normalized, then substring containment). Whatever is
// left goes through one throttled, cached Nominatim lookup per refresh
// cycle, bounded so a bad sheet cannot trigger an unbounded request burst.
// Negative results are cached too, so an unresolvable name is queried once.
use crate::util::{normalize_city_name, strip_region_suffix};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub type Coordinates = (f64, f64);

/// Paraná municipalities with known coordinates.
static CITY_TABLE: Lazy<Vec<(&'static str, Coordinates)>> = Lazy::new(|| {
    vec![
        ("Curitiba", (-25.4284, -49.2733)),
        ("Londrina", (-23.3045, -51.1696)),
        ("Maringá", (-23.4205, -51.9331)),
        ("Cascavel", (-24.9558, -53.4552)),
        ("Ponta Grossa", (-25.0916, -50.1668)),
        ("Foz do Iguaçu", (-25.5478, -54.5882)),
        ("Guarapuava", (-25.3842, -51.4617)),
        ("Piraquara", (-25.4419, -49.0619)),
        ("Paranaguá", (-25.5204, -48.5077)),
        ("Campo Largo", (-25.4595, -49.5275)),
        ("São José dos Pinhais", (-25.5324, -49.2063)),
        ("Colombo", (-25.2917, -49.2242)),
        ("Araucária", (-25.5934, -49.4067)),
        ("Toledo", (-24.7136, -53.7403)),
        ("Apucarana", (-23.5501, -51.4607)),
        ("Arapongas", (-23.4180, -51.4248)),
        ("Almirante Tamandaré", (-25.3247, -49.3108)),
        ("Campo Mourão", (-24.0456, -52.3783)),
        ("Paranavaí", (-23.0730, -52.4648)),
        ("Cambé", (-23.2751, -51.2797)),
        ("Umuarama", (-23.7663, -53.3250)),
        ("Fazenda Rio Grande", (-25.6416, -49.3097)),
        ("Pinhais", (-25.4448, -49.1920)),
        ("Sarandi", (-23.4473, -51.8789)),
        ("Francisco Beltrão", (-26.0811, -53.0547)),
        ("Cianorte", (-23.6638, -52.6054)),
        ("Castro", (-24.7886, -50.0119)),
        ("Irati", (-25.4683, -50.6511)),
        ("União da Vitória", (-26.2282, -51.0858)),
        ("Telêmaco Borba", (-24.3230, -50.6156)),
        ("Rolândia", (-23.3096, -51.3706)),
        ("Cornélio Procópio", (-23.1817, -50.6476)),
        ("São Mateus do Sul", (-25.8746, -50.3837)),
        ("Lapa", (-25.7650, -49.7150)),
        ("Ibiporã", (-23.2706, -51.0403)),
        ("Prudentópolis", (-25.2130, -50.9778)),
        ("Ivaiporã", (-24.2297, -51.6794)),
        ("Dois Vizinhos", (-25.7319, -53.0569)),
    ]
});

/// Static-table resolution: exact match on the cleaned name, then both
/// names normalized, then substring containment in either direction.
/// Never touches the network.
pub fn lookup_static(locality: &str) -> Option<Coordinates> {
    let clean = strip_region_suffix(locality);
    if let Some((_, coords)) = CITY_TABLE.iter().find(|(city, _)| *city == clean) {
        return Some(*coords);
    }

    let norm = normalize_city_name(&clean);
    if norm.is_empty() {
        return None;
    }
    if let Some((_, coords)) = CITY_TABLE
        .iter()
        .find(|(city, _)| normalize_city_name(city) == norm)
    {
        return Some(*coords);
    }

    CITY_TABLE
        .iter()
        .find(|(city, _)| {
            let city_norm = normalize_city_name(city);
            norm.contains(&city_norm) || city_norm.contains(&norm)
        })
        .map(|(_, coords)| *coords)
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

/// Outcome of one batch resolution cycle.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Cleaned locality name to coordinates, for every name that resolved.
    pub resolved: HashMap<String, Coordinates>,
    /// Cleaned names with no coordinates. Surfaced as a count on the map,
    /// never silently dropped.
    pub unresolved: Vec<String>,
    pub external_calls: usize,
}

pub struct GeoResolver {
    client: reqwest::Client,
    base_url: String,
    cache: HashMap<String, Option<Coordinates>>,
    delay: Duration,
    batch_cap: usize,
}

impl GeoResolver {
    pub fn new(base_url: String, delay_ms: u64, batch_cap: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("obras-dashboard/1.0")
            .build()?;
        Ok(GeoResolver {
            client,
            base_url,
            cache: HashMap::new(),
            delay: Duration::from_millis(delay_ms),
            batch_cap,
        })
    }

    /// Resolve a batch of localities for one refresh cycle.
    ///
    /// Static and cached names are free; at most `batch_cap` names go to
    /// the external geocoder, with a fixed delay between sequential calls
    /// to respect the service's usage policy. Names past the cap stay
    /// unresolved until a later cycle.
    pub async fn resolve_batch(&mut self, localities: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut pending: Vec<String> = Vec::new();

        for locality in localities {
            let clean = strip_region_suffix(locality);
            if clean.is_empty()
                || report.resolved.contains_key(&clean)
                || report.unresolved.contains(&clean)
                || pending.contains(&clean)
            {
                continue;
            }
            if let Some(coords) = lookup_static(&clean) {
                report.resolved.insert(clean, coords);
            } else if let Some(cached) = self.cache.get(&clean) {
                match cached {
                    Some(coords) => {
                        report.resolved.insert(clean, *coords);
                    }
                    None => report.unresolved.push(clean),
                }
            } else {
                pending.push(clean);
            }
        }

        for (i, clean) in pending.iter().enumerate() {
            if report.external_calls >= self.batch_cap {
                report.unresolved.push(clean.clone());
                continue;
            }
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }
            report.external_calls += 1;
            let looked_up = self.lookup_remote(clean).await;
            self.cache.insert(clean.clone(), looked_up);
            match looked_up {
                Some(coords) => {
                    debug!(locality = %clean, ?coords, "geocoded");
                    report.resolved.insert(clean.clone(), coords);
                }
                None => report.unresolved.push(clean.clone()),
            }
        }

        report
    }

    async fn lookup_remote(&self, clean: &str) -> Option<Coordinates> {
        let query = format!("{}, Paraná, Brazil", clean);
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("limit", "1"), ("q", query.as_str())])
            .send()
            .await;

        let resp = match resp {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(locality = %clean, status = %r.status(), "geocoder rejected the query");
                return None;
            }
            Err(err) => {
                warn!(locality = %clean, %err, "geocoder unreachable");
                return None;
            }
        };

        let hits: Vec<NominatimHit> = match resp.json().await {
            Ok(h) => h,
            Err(err) => {
                warn!(locality = %clean, %err, "geocoder answered with a bad body");
                return None;
            }
        };

        let hit = hits.first()?;
        let lat = hit.lat.parse::<f64>().ok()?;
        let lon = hit.lon.parse::<f64>().ok()?;
        Some((lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_hit_after_suffix_stripping_needs_no_network() {
        // "Curitiba, Brazil" must resolve from the table alone.
        assert_eq!(lookup_static("Curitiba, Brazil"), Some((-25.4284, -49.2733)));
        assert_eq!(lookup_static("Curitiba"), Some((-25.4284, -49.2733)));
    }

    #[test]
    fn normalized_and_substring_matching_cover_messy_input() {
        assert_eq!(lookup_static("MARINGÁ"), Some((-23.4205, -51.9331)));
        assert_eq!(lookup_static("maringa, Brasil"), Some((-23.4205, -51.9331)));
        // Containment in either direction.
        assert_eq!(lookup_static("Distrito de Cascavel"), Some((-24.9558, -53.4552)));
        assert_eq!(lookup_static("Vila Rural"), None);
        assert_eq!(lookup_static(""), None);
    }

    #[tokio::test]
    async fn batch_uses_cache_and_respects_the_cap() {
        let mut resolver = GeoResolver::new("http://localhost:1".into(), 0, 0).unwrap();
        resolver.cache.insert("Cidade Gaúcha".into(), Some((-23.37, -52.94)));
        resolver.cache.insert("Lugar Nenhum".into(), None);

        let localities = vec![
            "Curitiba, Brasil".to_string(),
            "Cidade Gaúcha".to_string(),
            "Lugar Nenhum".to_string(),
            "Município Desconhecido".to_string(),
            "Curitiba".to_string(), // duplicate after cleaning
        ];
        let report = resolver.resolve_batch(&localities).await;

        // Cap of zero: nothing may reach the network.
        assert_eq!(report.external_calls, 0);
        assert_eq!(report.resolved.get("Curitiba"), Some(&(-25.4284, -49.2733)));
        assert_eq!(report.resolved.get("Cidade Gaúcha"), Some(&(-23.37, -52.94)));
        // Negative cache entry and the over-cap name both surface as
        // unresolved rather than disappearing.
        assert!(report.unresolved.contains(&"Lugar Nenhum".to_string()));
        assert!(report.unresolved.contains(&"Município Desconhecido".to_string()));
        assert_eq!(report.unresolved.len(), 2);
    }
}
