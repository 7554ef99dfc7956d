//! Process-start wiring for the fire and weather services.
//!
//! # Environment Variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `FIREWX_ARCGIS_INCIDENTS_URL` | Incident point layer `/query` URL |
//! | `FIREWX_ARCGIS_PERIMETERS_URL` | Perimeter layer `/query` URL (empty disables enrichment) |
//! | `FIREWX_HTTP_TIMEOUT_MS` | Per-request timeout for every adapter |
//! | `FIREWX_NDBC_STATION` | Fixed buoy station id |
//! | `FIREWX_NDBC_CATALOG` | `station,lat,lon` CSV used when no fixed station is set |
//! | `FIREWX_NDBC_MAX_KM` | Catalog search radius around the segment start |
//! | `FIREWX_NWS_USER_AGENT` | User-Agent sent to api.weather.gov |
//!
//! Unparseable numeric values are ignored with a warning.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

use crate::adapters::arcgis::{ArcGisConfig, ArcGisRestAdapter};
use crate::adapters::in_memory::InMemoryFireAdapter;
use crate::adapters::ndbc::{
    FixedStationResolver, NdbcAdapter, StationCatalogResolver, StationResolver,
    DEFAULT_CATALOG_MAX_KM,
};
use crate::adapters::nws::{NwsAdapter, DEFAULT_USER_AGENT};
use crate::data_source::{FireDataSource, WeatherDataSource};
use crate::http_client::{HttpClient, ReqwestHttpClient, DEFAULT_TIMEOUT_MS};
use crate::routing::{AdapterGate, FailoverPolicy, IncidentRouter, WeatherRouter};
use crate::services::{FireFinderService, WeatherService};
use crate::CoreError;

pub const ENV_ARCGIS_INCIDENTS_URL: &str = "FIREWX_ARCGIS_INCIDENTS_URL";
pub const ENV_ARCGIS_PERIMETERS_URL: &str = "FIREWX_ARCGIS_PERIMETERS_URL";
pub const ENV_HTTP_TIMEOUT_MS: &str = "FIREWX_HTTP_TIMEOUT_MS";
pub const ENV_NDBC_STATION: &str = "FIREWX_NDBC_STATION";
pub const ENV_NDBC_CATALOG: &str = "FIREWX_NDBC_CATALOG";
pub const ENV_NDBC_MAX_KM: &str = "FIREWX_NDBC_MAX_KM";
pub const ENV_NWS_USER_AGENT: &str = "FIREWX_NWS_USER_AGENT";

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}

/// Builds a [`FireFinderService`] with the chain `[arcgis, seed]`, or
/// `[seed]` when offline.
#[derive(Default)]
pub struct FireFinderBuilder {
    arcgis: ArcGisConfig,
    policy: FailoverPolicy,
    offline: bool,
    seed: Option<InMemoryFireAdapter>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl FireFinderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(self) -> Self {
        self.with_env_source(process_env)
    }

    /// Applies `FIREWX_*` settings read through `lookup`.
    pub fn with_env_source(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let incidents_url = lookup(ENV_ARCGIS_INCIDENTS_URL);
        if let Some(url) = incidents_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            self.arcgis.incidents_url = url.to_owned();
        }
        if let Some(url) = lookup(ENV_ARCGIS_PERIMETERS_URL) {
            let url = url.trim();
            self.arcgis.perimeters_url = (!url.is_empty()).then(|| url.to_owned());
        }
        if let Some(timeout_ms) = parsed(&lookup, ENV_HTTP_TIMEOUT_MS) {
            self.arcgis.timeout_ms = timeout_ms;
        }
        self
    }

    pub fn with_arcgis_config(mut self, config: ArcGisConfig) -> Self {
        self.arcgis = config;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.arcgis.timeout_ms = timeout_ms;
        self
    }

    pub fn with_policy(mut self, policy: FailoverPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Skips the live feature service entirely.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Replaces the built-in seed incident list.
    pub fn with_seed(mut self, seed: InMemoryFireAdapter) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> Result<FireFinderService, CoreError> {
        let mut adapters: Vec<Arc<dyn FireDataSource>> = Vec::new();

        if !self.offline {
            let http_client = self
                .http_client
                .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
            adapters.push(Arc::new(ArcGisRestAdapter::new(http_client, self.arcgis)));
        }

        let seed = match self.seed {
            Some(seed) => seed,
            None => InMemoryFireAdapter::seeded()?,
        };
        adapters.push(Arc::new(seed));

        let router = IncidentRouter::new(adapters, self.policy)?;
        Ok(FireFinderService::new(router))
    }
}

/// Builds a [`WeatherService`] with the chain `[ndbc, nws]`.
pub struct WeatherServiceBuilder {
    timeout_ms: u64,
    ndbc_station: Option<String>,
    ndbc_catalog: Option<PathBuf>,
    ndbc_max_km: f64,
    nws_user_agent: String,
    gate: Option<Arc<dyn AdapterGate>>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl Default for WeatherServiceBuilder {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            ndbc_station: None,
            ndbc_catalog: None,
            ndbc_max_km: DEFAULT_CATALOG_MAX_KM,
            nws_user_agent: String::from(DEFAULT_USER_AGENT),
            gate: None,
            http_client: None,
        }
    }
}

impl WeatherServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(self) -> Self {
        self.with_env_source(process_env)
    }

    /// Applies `FIREWX_*` settings read through `lookup`.
    pub fn with_env_source(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(timeout_ms) = parsed(&lookup, ENV_HTTP_TIMEOUT_MS) {
            self.timeout_ms = timeout_ms;
        }
        if let Some(station) = lookup(ENV_NDBC_STATION) {
            self.ndbc_station = Some(station);
        }
        if let Some(path) = lookup(ENV_NDBC_CATALOG).filter(|path| !path.trim().is_empty()) {
            self.ndbc_catalog = Some(PathBuf::from(path.trim()));
        }
        if let Some(max_km) = parsed(&lookup, ENV_NDBC_MAX_KM) {
            self.ndbc_max_km = max_km;
        }
        if let Some(user_agent) = lookup(ENV_NWS_USER_AGENT).filter(|ua| !ua.trim().is_empty()) {
            self.nws_user_agent = user_agent;
        }
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_ndbc_station(mut self, station_id: impl Into<String>) -> Self {
        self.ndbc_station = Some(station_id.into());
        self
    }

    pub fn with_ndbc_catalog(mut self, path: impl Into<PathBuf>, max_km: f64) -> Self {
        self.ndbc_catalog = Some(path.into());
        self.ndbc_max_km = max_km;
        self
    }

    pub fn with_nws_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.nws_user_agent = user_agent.into();
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn AdapterGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    fn resolver(&self) -> Result<Arc<dyn StationResolver>, CoreError> {
        let station = self
            .ndbc_station
            .as_deref()
            .map(str::trim)
            .filter(|station| !station.is_empty());
        let (None, Some(path)) = (station, &self.ndbc_catalog) else {
            let fixed = FixedStationResolver::new(station.map(str::to_owned));
            return Ok(Arc::new(fixed));
        };

        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Arc::new(StationCatalogResolver::from_csv(&text, self.ndbc_max_km)?))
    }

    pub fn build(self) -> Result<WeatherService, CoreError> {
        let resolver = self.resolver()?;
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));

        let ndbc = NdbcAdapter::new(resolver, Arc::clone(&http_client))
            .with_timeout_ms(self.timeout_ms);
        let nws = NwsAdapter::new(http_client)
            .with_timeout_ms(self.timeout_ms)
            .with_user_agent(self.nws_user_agent);
        let adapters: Vec<Arc<dyn WeatherDataSource>> = vec![Arc::new(ndbc), Arc::new(nws)];

        let mut router = WeatherRouter::new(adapters)?;
        if let Some(gate) = self.gate {
            router = router.with_gate(gate);
        }
        Ok(WeatherService::new(router))
    }
}
