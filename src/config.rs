use crate::pricing::serpapi::{DEFAULT_BASE_URL, DEFAULT_EXCLUDED_SOURCES};
use crate::pricing::{PriceCache, PriceSource, SerpApiPriceSource, SimulatedPriceSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub lookup_mode: LookupMode,
    pub serpapi_base_url: String,
    /// Per-lookup limit; `None` waits indefinitely.
    pub lookup_timeout: Option<Duration>,
    pub lookup_max_retry: Duration,
    pub sim_failure_rate: f64,
    pub sim_min_delay: Duration,
    pub sim_jitter: Duration,
    pub excluded_sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    Simulated,
    SerpApi,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            lookup_mode: LookupMode::Simulated,
            serpapi_base_url: DEFAULT_BASE_URL.to_string(),
            lookup_timeout: None,
            lookup_max_retry: Duration::from_millis(30_000),
            sim_failure_rate: 0.1,
            sim_min_delay: Duration::from_millis(500),
            sim_jitter: Duration::from_millis(1000),
            excluded_sources: DEFAULT_EXCLUDED_SOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = parse_or(&env_map, "PORT", defaults.port, "must be a valid u16")?;

        let lookup_mode = match env_map
            .get("LOOKUP_MODE")
            .map(|s| s.as_str())
            .unwrap_or("simulated")
        {
            "simulated" => LookupMode::Simulated,
            "serpapi" => LookupMode::SerpApi,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LOOKUP_MODE".to_string(),
                    format!("must be simulated or serpapi, got {}", other),
                ))
            }
        };

        let serpapi_base_url = env_map
            .get("SERPAPI_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.serpapi_base_url);

        let timeout_ms: u64 = parse_or(&env_map, "LOOKUP_TIMEOUT_MS", 0, "must be a valid u64")?;
        let lookup_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        let lookup_max_retry = Duration::from_millis(parse_or(
            &env_map,
            "LOOKUP_MAX_RETRY_MS",
            30_000,
            "must be a valid u64",
        )?);

        let sim_failure_rate: f64 = parse_or(
            &env_map,
            "SIM_FAILURE_RATE",
            defaults.sim_failure_rate,
            "must be a number",
        )?;
        if !(0.0..=1.0).contains(&sim_failure_rate) {
            return Err(ConfigError::InvalidValue(
                "SIM_FAILURE_RATE".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }

        let sim_min_delay = Duration::from_millis(parse_or(
            &env_map,
            "SIM_MIN_DELAY_MS",
            500,
            "must be a valid u64",
        )?);
        let sim_jitter = Duration::from_millis(parse_or(
            &env_map,
            "SIM_JITTER_MS",
            1000,
            "must be a valid u64",
        )?);

        let excluded_sources = match env_map.get("EXCLUDED_SOURCES") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.excluded_sources,
        };

        Ok(Config {
            port,
            lookup_mode,
            serpapi_base_url,
            lookup_timeout,
            lookup_max_retry,
            sim_failure_rate,
            sim_min_delay,
            sim_jitter,
            excluded_sources,
        })
    }

    /// The real SerpApi client, when that backend is selected.
    pub fn serpapi_source(&self) -> Option<SerpApiPriceSource> {
        match self.lookup_mode {
            LookupMode::SerpApi => Some(
                SerpApiPriceSource::new(self.serpapi_base_url.clone())
                    .with_excluded_sources(self.excluded_sources.clone())
                    .with_max_retry(self.lookup_max_retry),
            ),
            LookupMode::Simulated => None,
        }
    }

    pub fn price_source(&self) -> Arc<dyn PriceSource> {
        match self.serpapi_source() {
            Some(source) => Arc::new(source),
            None => Arc::new(SimulatedPriceSource::new(
                self.sim_failure_rate,
                self.sim_min_delay,
                self.sim_jitter,
            )),
        }
    }

    /// A fresh, empty cache over the configured price source.
    pub fn price_cache(&self) -> PriceCache {
        PriceCache::new(self.price_source()).with_timeout(self.lookup_timeout)
    }
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expectation: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_env() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.lookup_mode, LookupMode::Simulated);
        assert_eq!(config.lookup_timeout, None);
        assert_eq!(config.sim_failure_rate, 0.1);
        assert_eq!(config.excluded_sources.len(), 5);
        assert!(config.serpapi_source().is_none());
    }

    #[test]
    fn test_serpapi_mode_with_overrides() {
        let mut env_map = HashMap::new();
        env_map.insert("LOOKUP_MODE".to_string(), "serpapi".to_string());
        env_map.insert(
            "SERPAPI_BASE_URL".to_string(),
            "http://localhost:9999/".to_string(),
        );
        env_map.insert("LOOKUP_TIMEOUT_MS".to_string(), "2500".to_string());
        env_map.insert("EXCLUDED_SOURCES".to_string(), "eBay, Walmart,".to_string());

        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.lookup_mode, LookupMode::SerpApi);
        assert_eq!(config.serpapi_base_url, "http://localhost:9999");
        assert_eq!(config.lookup_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.excluded_sources, vec!["ebay", "walmart"]);
        assert!(config.serpapi_source().is_some());
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = HashMap::new();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_lookup_mode() {
        let mut env_map = HashMap::new();
        env_map.insert("LOOKUP_MODE".to_string(), "scrape".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "LOOKUP_MODE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_failure_rate_out_of_range() {
        let mut env_map = HashMap::new();
        env_map.insert("SIM_FAILURE_RATE".to_string(), "1.5".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SIM_FAILURE_RATE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
