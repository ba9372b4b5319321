use anyhow::{Context, Result};

use crate::types::GeoPoint;

const DEFAULT_LOCATIONIQ_BASE_URL: &str = "https://us1.locationiq.com/v1";
const DEFAULT_PRIORITY_RADIUS_KM: f64 = 10.0;
const DEFAULT_GEOCODE_DEBOUNCE_MS: u64 = 500;

/// Thiruporur, where the map opens when nothing else has been searched.
pub const DEFAULT_MAP_CENTER: GeoPoint = GeoPoint {
    lat: 12.7562,
    lng: 80.1983,
};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Data store (Supabase / PostgREST)
    pub supabase_url: String,
    pub supabase_anon_key: String,

    // Geocoding
    pub locationiq_api_key: Option<String>,
    pub locationiq_base_url: String,

    // Ranking
    pub priority_radius_km: f64,
    pub geocode_debounce_ms: u64,

    // Map
    pub map_center: GeoPoint,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} environment variable is required"))
        };

        let map_center = GeoPoint {
            lat: parse_or(&lookup, "MAP_CENTER_LAT", DEFAULT_MAP_CENTER.lat)?,
            lng: parse_or(&lookup, "MAP_CENTER_LNG", DEFAULT_MAP_CENTER.lng)?,
        };

        Ok(Self {
            supabase_url: required("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            locationiq_api_key: lookup("LOCATIONIQ_API_KEY").filter(|v| !v.is_empty()),
            locationiq_base_url: lookup("LOCATIONIQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LOCATIONIQ_BASE_URL.to_string()),
            priority_radius_km: parse_or(
                &lookup,
                "PRIORITY_RADIUS_KM",
                DEFAULT_PRIORITY_RADIUS_KM,
            )?,
            geocode_debounce_ms: parse_or(
                &lookup,
                "GEOCODE_DEBOUNCE_MS",
                DEFAULT_GEOCODE_DEBOUNCE_MS,
            )?,
            map_center,
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  SUPABASE_URL: {}", self.supabase_url);
        tracing::info!("  SUPABASE_ANON_KEY: {}", preview(&self.supabase_anon_key));
        tracing::info!("  LOCATIONIQ_API_KEY: {}", preview_opt(&self.locationiq_api_key));
        tracing::info!(
            radius_km = self.priority_radius_km,
            debounce_ms = self.geocode_debounce_ms,
            "  Ranking"
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://abc.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon-key"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://abc.supabase.co");
        assert_eq!(config.priority_radius_km, 10.0);
        assert_eq!(config.geocode_debounce_ms, 500);
        assert_eq!(config.map_center, DEFAULT_MAP_CENTER);
        assert_eq!(config.locationiq_base_url, DEFAULT_LOCATIONIQ_BASE_URL);
        assert!(config.locationiq_api_key.is_none());
    }

    #[test]
    fn missing_store_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("SUPABASE_ANON_KEY", "k")])).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon-key"),
            ("LOCATIONIQ_API_KEY", "pk.test"),
            ("PRIORITY_RADIUS_KM", "25.5"),
            ("GEOCODE_DEBOUNCE_MS", "250"),
            ("MAP_CENTER_LAT", "12.9716"),
            ("MAP_CENTER_LNG", "77.5946"),
        ]))
        .unwrap();

        assert_eq!(config.locationiq_api_key.as_deref(), Some("pk.test"));
        assert_eq!(config.priority_radius_km, 25.5);
        assert_eq!(config.geocode_debounce_ms, 250);
        assert_eq!(config.map_center.lat, 12.9716);
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon-key"),
            ("PRIORITY_RADIUS_KM", "ten"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PRIORITY_RADIUS_KM"));
    }
}
