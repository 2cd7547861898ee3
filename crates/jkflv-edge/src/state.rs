//! Shared application state.

use std::sync::Arc;

use jkflv_core::{Clock, SystemClock};

use crate::config::Config;
use crate::origin::{FetchOptions, Origin, OriginClient};
use crate::refresh::Refresher;
use crate::render::{Generator, SiteInfo};
use crate::store::{SnapshotStore, open_store};

/// User-Agent sent on every upstream request.
const USER_AGENT: &str = concat!("jkflv-edge/", env!("CARGO_PKG_VERSION"));

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// HTTP client shared by the origin client and the API proxy.
    pub http: reqwest::Client,

    /// Upstream content source.
    pub origin: Arc<dyn Origin>,

    /// Snapshot store.
    pub store: Arc<dyn SnapshotStore>,

    /// Clock used for every freshness decision.
    pub clock: Arc<dyn Clock>,

    /// Snapshot generator.
    pub generator: Arc<Generator>,

    /// Section refresher.
    pub refresher: Arc<Refresher>,
}

impl AppState {
    /// Create application state from configuration, opening the store.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = open_store(&config, clock.clone())?;
        let origin: Arc<dyn Origin> =
            Arc::new(OriginClient::new(http.clone(), &config.origin_base_url));

        tracing::info!(
            origin = %config.origin_base_url,
            site = %config.site_base_url,
            static_dir = %config.static_dir.display(),
            admin_tokens = config.admin_tokens.len(),
            "application state ready"
        );

        Ok(Self::from_parts(config, http, origin, store, clock))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: Config,
        http: reqwest::Client,
        origin: Arc<dyn Origin>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let options = fetch_options(&config);
        let generator = Arc::new(Generator::new(
            origin.clone(),
            SiteInfo::new(&config.site_base_url, &config.site_name),
            options,
        ));
        let refresher = Arc::new(Refresher::new(
            origin.clone(),
            store.clone(),
            clock.clone(),
            config.refresh_interval_hours,
            options,
        ));

        Self {
            config: Arc::new(config),
            http,
            origin,
            store,
            clock,
            generator,
            refresher,
        }
    }

    /// Site identity used in rendered documents.
    pub fn site(&self) -> &SiteInfo {
        self.generator.site()
    }
}

/// Upstream call options derived from configuration.
pub fn fetch_options(config: &Config) -> FetchOptions {
    FetchOptions {
        timeout: config.origin_timeout,
        retries: config.origin_retries,
        ..FetchOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fetch_options_from_config() {
        let config = Config {
            origin_timeout: Duration::from_millis(2500),
            origin_retries: 3,
            ..Config::default()
        };
        let options = fetch_options(&config);
        assert_eq!(options.timeout, Duration::from_millis(2500));
        assert_eq!(options.retries, 3);
        assert_eq!(options.retry_delay, FetchOptions::default().retry_delay);
    }

    #[test]
    fn test_new_with_memory_store() {
        let config = Config {
            snapshot_db_path: ":memory:".to_string(),
            site_base_url: "https://jk.example/".to_string(),
            ..Config::default()
        };
        let state = AppState::new(config).unwrap();
        assert_eq!(state.site().base_url, "https://jk.example");
        assert_eq!(state.site().name, "JKAnime FLV");
    }
}
