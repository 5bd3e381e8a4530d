use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub guard: GuardSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Where the school catalog lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSON file loaded into memory at startup
    File,
    /// PostgREST-style HTTP API
    Rest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            endpoint: String::new(),
            api_key: String::new(),
            table: default_table(),
            catalog_path: default_catalog_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_store_kind() -> StoreKind { StoreKind::File }
fn default_table() -> String { "school_data_general".to_string() }
fn default_catalog_path() -> String { "data/schools.json".to_string() }
fn default_request_timeout_ms() -> u64 { 10_000 }

/// Resource guard limits shared by every store call
#[derive(Debug, Clone, Deserialize)]
pub struct GuardSettings {
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    #[serde(default = "default_max_throttle_wait_ms")]
    pub max_throttle_wait_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
            max_throttle_wait_ms: default_max_throttle_wait_ms(),
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

fn default_max_concurrent_requests() -> usize { 10 }
fn default_requests_per_second() -> f64 { 50.0 }
fn default_burst_size() -> u32 { 10 }
fn default_max_throttle_wait_ms() -> u64 { 5_000 }
fn default_failure_threshold() -> u32 { 5 }
fn default_cooldown_secs() -> u64 { 60 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 1_000 }
fn default_retry_max_delay_ms() -> u64 { 10_000 }
fn default_call_timeout_ms() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,
    #[serde(default = "default_yield_every")]
    pub yield_every: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            min_overlap: default_min_overlap(),
            yield_every: default_yield_every(),
        }
    }
}

fn default_workers() -> usize { 10 }
fn default_limit() -> usize { 50 }
fn default_max_limit() -> usize { 200 }
fn default_min_overlap() -> usize { 3 }
fn default_yield_every() -> usize { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Zero disables the tier cache
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl_secs() -> u64 { 300 }
fn default_max_entries() -> u64 { 8 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with RECRUIT_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., RECRUIT__GUARD__FAILURE_THRESHOLD -> guard.failure_threshold
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("RECRUIT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_guard() {
        let guard = GuardSettings::default();
        assert_eq!(guard.max_concurrent_requests, 10);
        assert_eq!(guard.failure_threshold, 5);
        assert_eq!(guard.cooldown_secs, 60);
        assert_eq!(guard.retry_attempts, 3);
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [store]
            kind = "rest"
            endpoint = "https://catalog.example.com"

            [pipeline]
            workers = 4
            "#,
        )
        .unwrap();

        assert_eq!(settings.store.kind, StoreKind::Rest);
        assert_eq!(settings.store.table, "school_data_general");
        assert_eq!(settings.pipeline.workers, 4);
        assert_eq!(settings.pipeline.default_limit, 50);
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.cache.ttl_secs, 300);
    }
}
