// Runtime configuration, read once at startup from the environment (a
// `.env` file is honored when present).
use std::env;

const DEFAULT_ENDPOINT: &str =
    "https://script.google.com/macros/s/AKfycbze9GAoz6swTzy4F105HMbEyCu-mOqIA_EfyPMe-JZrcMwfU9E6p2qQHfldYGRaTWOW/exec";
const DEFAULT_GEOCODER: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoint_url: String,
    pub geocoder_url: String,
    /// Auto-refresh period in watch mode.
    pub refresh_minutes: u64,
    /// Year assigned when the end-date column has no 4-digit run.
    pub fallback_year: i32,
    /// External geocoder lookups allowed per refresh cycle.
    pub geocode_batch: usize,
    /// Pause between sequential geocoder calls.
    pub geocode_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            geocoder_url: DEFAULT_GEOCODER.to_string(),
            refresh_minutes: 5,
            fallback_year: 2024,
            geocode_batch: 50,
            geocode_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut c = AppConfig::default();
        if let Ok(v) = env::var("SHEET_ENDPOINT_URL") {
            c.endpoint_url = v;
        }
        if let Ok(v) = env::var("GEOCODER_URL") {
            c.geocoder_url = v;
        }
        if let Ok(v) = env::var("REFRESH_MINUTES") {
            c.refresh_minutes = v.parse().unwrap_or(c.refresh_minutes);
        }
        if let Ok(v) = env::var("FALLBACK_YEAR") {
            c.fallback_year = v.parse().unwrap_or(c.fallback_year);
        }
        if let Ok(v) = env::var("GEOCODE_BATCH") {
            c.geocode_batch = v.parse().unwrap_or(c.geocode_batch);
        }
        if let Ok(v) = env::var("GEOCODE_DELAY_MS") {
            c.geocode_delay_ms = v.parse().unwrap_or(c.geocode_delay_ms);
        }
        c
    }
}
