//! Application configuration loaded from environment variables.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

/// Value of `SNAPSHOT_DB_PATH` that selects the in-memory store.
pub const IN_MEMORY_STORE: &str = ":memory:";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8787").
    pub bind_addr: String,

    /// Base URL of the upstream content API, without the `/api/v1` suffix.
    pub origin_base_url: String,

    /// Public base URL of the site (used in canonical links and sitemaps).
    pub site_base_url: String,

    /// Site name shown in titles and OG tags.
    pub site_name: String,

    /// Directory holding the built SPA (`index.html` + assets).
    pub static_dir: PathBuf,

    /// SQLite path for the snapshot store, or `:memory:`.
    pub snapshot_db_path: String,

    /// Stale snapshots stay servable for `ttl × retention_factor`.
    pub retention_factor: u32,

    /// Timeout for each upstream call.
    pub origin_timeout: Duration,

    /// Extra attempts after a network failure or timeout.
    pub origin_retries: u32,

    /// Minimum hours between non-forced refresh runs.
    pub refresh_interval_hours: u32,

    /// How often the in-process refresh loop fires. `None` disables it.
    pub refresh_tick: Option<Duration>,

    /// Bearer tokens accepted by the admin endpoints. Empty disables them.
    pub admin_tokens: HashSet<String>,

    /// Prometheus exporter port. `None` disables the exporter.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8787".to_string(),
            origin_base_url: "https://api.jkanimeflv.example".to_string(),
            site_base_url: "http://localhost:8787".to_string(),
            site_name: "JKAnime FLV".to_string(),
            static_dir: PathBuf::from("./dist"),
            snapshot_db_path: "./data/snapshots.db".to_string(),
            retention_factor: 7,
            origin_timeout: Duration::from_millis(10_000),
            origin_retries: 1,
            refresh_interval_hours: 6,
            refresh_tick: Some(Duration::from_secs(3600)),
            admin_tokens: HashSet::new(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - None (all have defaults for local development)
    ///
    /// Optional:
    /// - `EDGE_BIND_ADDR`: Server bind address (default: "0.0.0.0:8787")
    /// - `ORIGIN_BASE_URL`: Content API base URL (default: "https://api.jkanimeflv.example")
    /// - `SITE_BASE_URL`: Public site URL (default: "http://localhost:8787")
    /// - `SITE_NAME`: Site name (default: "JKAnime FLV")
    /// - `STATIC_DIR`: Built SPA directory (default: "./dist")
    /// - `SNAPSHOT_DB_PATH`: SQLite path or `:memory:` (default: "./data/snapshots.db")
    /// - `SNAPSHOT_RETENTION_FACTOR`: Stale retention multiplier (default: 7)
    /// - `ORIGIN_TIMEOUT_MS`: Upstream call timeout (default: 10000)
    /// - `ORIGIN_RETRIES`: Retries on network failure/timeout (default: 1)
    /// - `REFRESH_INTERVAL_HOURS`: Staleness window for refresh runs (default: 6)
    /// - `REFRESH_TICK_SECS`: In-process refresh loop period, 0 disables (default: 3600)
    /// - `EDGE_ADMIN_TOKENS`: Comma-separated bearer tokens for admin endpoints
    /// - `METRICS_PORT`: Prometheus exporter port, 0 disables (default: 0)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("EDGE_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let origin_base_url = std::env::var("ORIGIN_BASE_URL")
            .unwrap_or(defaults.origin_base_url)
            .trim_end_matches('/')
            .to_string();

        let site_base_url = std::env::var("SITE_BASE_URL")
            .unwrap_or(defaults.site_base_url)
            .trim_end_matches('/')
            .to_string();

        let site_name = std::env::var("SITE_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.site_name);

        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        let snapshot_db_path =
            std::env::var("SNAPSHOT_DB_PATH").unwrap_or(defaults.snapshot_db_path);

        let retention_factor =
            parse_var("SNAPSHOT_RETENTION_FACTOR")?.unwrap_or(defaults.retention_factor);

        let origin_timeout = parse_var::<u64>("ORIGIN_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.origin_timeout);

        let origin_retries = parse_var("ORIGIN_RETRIES")?.unwrap_or(defaults.origin_retries);

        let refresh_interval_hours =
            parse_var("REFRESH_INTERVAL_HOURS")?.unwrap_or(defaults.refresh_interval_hours);

        let refresh_tick = match parse_var::<u64>("REFRESH_TICK_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.refresh_tick,
        };

        let admin_tokens: HashSet<String> = std::env::var("EDGE_ADMIN_TOKENS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let metrics_port = parse_var::<u16>("METRICS_PORT")?.filter(|port| *port != 0);

        tracing::info!(
            bind_addr = %bind_addr,
            origin_base_url = %origin_base_url,
            site_base_url = %site_base_url,
            site_name = %site_name,
            snapshot_db = %snapshot_db_path,
            retention_factor,
            origin_timeout_ms = origin_timeout.as_millis() as u64,
            origin_retries,
            refresh_interval_hours,
            refresh_tick_secs = refresh_tick.map(|d| d.as_secs()).unwrap_or(0),
            admin_token_count = admin_tokens.len(),
            metrics_port = metrics_port.unwrap_or(0),
            "edge configuration loaded"
        );

        Ok(Self {
            bind_addr,
            origin_base_url,
            site_base_url,
            site_name,
            static_dir,
            snapshot_db_path,
            retention_factor,
            origin_timeout,
            origin_retries,
            refresh_interval_hours,
            refresh_tick,
            admin_tokens,
            metrics_port,
        })
    }

    /// Whether snapshots live only in process memory.
    pub fn uses_memory_store(&self) -> bool {
        self.snapshot_db_path == IN_MEMORY_STORE
    }
}

/// Read and parse an optional numeric variable. Empty counts as unset.
fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a non-negative integer, got '{raw}'")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "EDGE_BIND_ADDR",
        "ORIGIN_BASE_URL",
        "SITE_BASE_URL",
        "SITE_NAME",
        "STATIC_DIR",
        "SNAPSHOT_DB_PATH",
        "SNAPSHOT_RETENTION_FACTOR",
        "ORIGIN_TIMEOUT_MS",
        "ORIGIN_RETRIES",
        "REFRESH_INTERVAL_HOURS",
        "REFRESH_TICK_SECS",
        "EDGE_ADMIN_TOKENS",
        "METRICS_PORT",
    ];

    /// Helper to run config tests with isolated env vars.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: Serialized by mutex; only test code touches these vars.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: Restoring original env state.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn config_defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "0.0.0.0:8787");
            assert_eq!(config.origin_base_url, "https://api.jkanimeflv.example");
            assert_eq!(config.site_base_url, "http://localhost:8787");
            assert_eq!(config.site_name, "JKAnime FLV");
            assert_eq!(config.retention_factor, 7);
            assert_eq!(config.origin_timeout, Duration::from_secs(10));
            assert_eq!(config.origin_retries, 1);
            assert_eq!(config.refresh_interval_hours, 6);
            assert_eq!(config.refresh_tick, Some(Duration::from_secs(3600)));
            assert!(config.admin_tokens.is_empty());
            assert!(config.metrics_port.is_none());
            assert!(!config.uses_memory_store());
        });
    }

    #[test]
    fn config_custom_values() {
        with_env_vars(
            &[
                ("EDGE_BIND_ADDR", "127.0.0.1:9000"),
                ("ORIGIN_BASE_URL", "http://origin:3000"),
                ("SITE_BASE_URL", "https://jkanimeflv.example"),
                ("SITE_NAME", "Mi Anime"),
                ("SNAPSHOT_DB_PATH", ":memory:"),
                ("ORIGIN_TIMEOUT_MS", "2500"),
                ("ORIGIN_RETRIES", "3"),
                ("REFRESH_INTERVAL_HOURS", "12"),
                ("METRICS_PORT", "9091"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.bind_addr, "127.0.0.1:9000");
                assert_eq!(config.origin_base_url, "http://origin:3000");
                assert_eq!(config.site_base_url, "https://jkanimeflv.example");
                assert_eq!(config.site_name, "Mi Anime");
                assert!(config.uses_memory_store());
                assert_eq!(config.origin_timeout, Duration::from_millis(2500));
                assert_eq!(config.origin_retries, 3);
                assert_eq!(config.refresh_interval_hours, 12);
                assert_eq!(config.metrics_port, Some(9091));
            },
        );
    }

    #[test]
    fn config_trailing_slashes_stripped() {
        with_env_vars(
            &[
                ("ORIGIN_BASE_URL", "http://origin:3000//"),
                ("SITE_BASE_URL", "https://jkanimeflv.example/"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.origin_base_url, "http://origin:3000");
                assert_eq!(config.site_base_url, "https://jkanimeflv.example");
            },
        );
    }

    #[test]
    fn config_zero_disables_loop_and_metrics() {
        with_env_vars(&[("REFRESH_TICK_SECS", "0"), ("METRICS_PORT", "0")], || {
            let config = Config::from_env().unwrap();
            assert!(config.refresh_tick.is_none());
            assert!(config.metrics_port.is_none());
        });
    }

    #[test]
    fn config_admin_tokens_parsing() {
        with_env_vars(&[("EDGE_ADMIN_TOKENS", " alpha, ,beta ,")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.admin_tokens.len(), 2);
            assert!(config.admin_tokens.contains("alpha"));
            assert!(config.admin_tokens.contains("beta"));
        });
    }

    #[test]
    fn config_invalid_number_is_an_error() {
        with_env_vars(&[("ORIGIN_RETRIES", "many")], || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("ORIGIN_RETRIES"));
        });
    }

    #[test]
    fn config_blank_values_use_defaults() {
        with_env_vars(&[("SITE_NAME", "  "), ("ORIGIN_TIMEOUT_MS", "")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.site_name, "JKAnime FLV");
            assert_eq!(config.origin_timeout, Duration::from_secs(10));
        });
    }
}
