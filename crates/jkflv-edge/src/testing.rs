//! Test fixtures: a scripted origin and a fully wired in-memory app state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jkflv_core::{Clock, ContentEnvelope, ManualClock, normalize};
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;

use crate::config::Config;
use crate::origin::{FetchOptions, Origin};
use crate::state::AppState;
use crate::store::{MemoryStore, SnapshotStore};

/// Body of the SPA entry point written into test static dirs.
pub(crate) const SPA_INDEX: &str = r#"<!doctype html><html><body><div id="root"></div></body></html>"#;

/// Admin token accepted by test states.
pub(crate) const ADMIN_TOKEN: &str = "test-admin-token";

#[derive(Clone)]
enum Scripted {
    Envelope(ContentEnvelope),
    Panic,
}

/// An [`Origin`] answering from a table of canned envelopes.
///
/// Unscripted endpoints answer like a missing upstream route.
#[derive(Default)]
pub(crate) struct FakeOrigin {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl FakeOrigin {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `endpoint` with the normalized form of a raw upstream body.
    pub(crate) fn respond(&self, endpoint: &str, raw: Value) {
        self.responses
            .lock()
            .insert(endpoint.to_string(), Scripted::Envelope(normalize(&raw)));
    }

    /// Answer `endpoint` with a failure envelope.
    pub(crate) fn fail(&self, endpoint: &str, message: &str) {
        self.responses.lock().insert(
            endpoint.to_string(),
            Scripted::Envelope(ContentEnvelope::failure(message)),
        );
    }

    /// Panic when `endpoint` is fetched.
    pub(crate) fn panic_on(&self, endpoint: &str) {
        self.responses
            .lock()
            .insert(endpoint.to_string(), Scripted::Panic);
    }

    /// Endpoints fetched so far, in call order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Origin for FakeOrigin {
    async fn fetch_json(&self, endpoint: &str, _options: FetchOptions) -> ContentEnvelope {
        self.calls.lock().push(endpoint.to_string());
        let scripted = self.responses.lock().get(endpoint).cloned();
        match scripted {
            Some(Scripted::Envelope(envelope)) => envelope,
            Some(Scripted::Panic) => panic!("scripted origin panic on {endpoint}"),
            None => ContentEnvelope::failure("upstream returned status 404"),
        }
    }
}

/// A fixed instant all test clocks start from.
pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Everything a router or dispatcher test needs to script and inspect.
pub(crate) struct TestApp {
    pub state: AppState,
    pub origin: Arc<FakeOrigin>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn SnapshotStore>,
    _static_dir: TempDir,
}

/// App state over a [`FakeOrigin`], a [`MemoryStore`] and a [`ManualClock`].
pub(crate) fn test_app() -> TestApp {
    test_app_with(|_| {})
}

/// Like [`test_app`], with a hook to adjust configuration.
pub(crate) fn test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let static_dir = TempDir::new().unwrap();
    std::fs::write(static_dir.path().join("index.html"), SPA_INDEX).unwrap();
    std::fs::create_dir_all(static_dir.path().join("assets")).unwrap();
    std::fs::write(
        static_dir.path().join("assets").join("app.js"),
        "console.log('app');",
    )
    .unwrap();

    let mut config = Config {
        site_base_url: "https://jk.example".to_string(),
        static_dir: static_dir.path().to_path_buf(),
        snapshot_db_path: ":memory:".to_string(),
        refresh_tick: None,
        admin_tokens: HashSet::from([ADMIN_TOKEN.to_string()]),
        ..Config::default()
    };
    configure(&mut config);

    let origin = Arc::new(FakeOrigin::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let store: Arc<dyn SnapshotStore> =
        Arc::new(MemoryStore::new(dyn_clock.clone(), config.retention_factor));

    let state = AppState::from_parts(
        config,
        reqwest::Client::new(),
        origin.clone(),
        store.clone(),
        dyn_clock,
    );

    TestApp {
        state,
        origin,
        clock,
        store,
        _static_dir: static_dir,
    }
}
