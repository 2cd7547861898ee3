//! Section refresh scheduler.
//!
//! A run fetches the home, genre and popular sections in parallel, stores
//! each one that succeeded, derives the sitemap when its inputs are
//! available, and records a [`RefreshLedgerEntry`] under `last-update`.
//! Sections fail independently; a failed section never blocks the others.
//!
//! Non-forced runs are skipped while the last ledger entry is younger than
//! the refresh interval, so the periodic trigger and an external cron can
//! both fire freely without hammering the origin.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use jkflv_core::metrics::{record_labelled, record_outcome};
use jkflv_core::{
    ChangeFreq, Clock, LAST_UPDATE_KEY, LAST_UPDATE_TTL, RefreshLedgerEntry,
    RouteDescriptor, RouteKind, STATIC_PAGES, Section, SitemapEntry,
};
use metrics::gauge;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;

use crate::origin::{FetchOptions, Origin};
use crate::payload;
use crate::store::{SnapshotStore, StoreError, record_store_error};

/// Most popular titles listed in the sitemap.
pub const SITEMAP_MAX_TITLES: usize = 100;

/// Most genres listed in the sitemap.
pub const SITEMAP_MAX_GENRES: usize = 20;

/// Upstream endpoint of a fetched section.
pub fn section_endpoint(section: Section) -> Option<&'static str> {
    match section {
        Section::Home => Some("anime/home"),
        Section::Genres => Some("anime/genres"),
        Section::Popular => Some("anime/list?order=popular"),
        Section::Sitemap => None,
    }
}

/// Result of [`Refresher::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The last run is recent enough; nothing was fetched.
    Skipped(RefreshLedgerEntry),
    /// A run happened and its ledger entry was written.
    Ran(RefreshLedgerEntry),
}

impl RefreshOutcome {
    /// The ledger entry describing the effective state.
    pub fn ledger(&self) -> &RefreshLedgerEntry {
        match self {
            Self::Skipped(entry) | Self::Ran(entry) => entry,
        }
    }

    pub fn into_ledger(self) -> RefreshLedgerEntry {
        match self {
            Self::Skipped(entry) | Self::Ran(entry) => entry,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

type SectionResult = Result<(), String>;

/// A fetched section and whether its aggregate was stored.
struct Refreshed {
    data: Value,
    persisted: SectionResult,
}

/// Run one section's work, reporting a panic as that section's failure.
async fn guarded<T>(work: impl Future<Output = Result<T, String>>) -> Result<T, String> {
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

/// Runs refresh cycles against an origin and a snapshot store.
pub struct Refresher {
    origin: Arc<dyn Origin>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    interval_hours: u32,
    options: FetchOptions,
    running: AtomicBool,
    stopped: AtomicBool,
    shutdown: Notify,
}

impl Refresher {
    /// Create a refresher. `interval_hours` is the staleness window for
    /// non-forced runs.
    pub fn new(
        origin: Arc<dyn Origin>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        interval_hours: u32,
        options: FetchOptions,
    ) -> Self {
        Self {
            origin,
            store,
            clock,
            interval_hours,
            options,
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// The most recent ledger entry, if any.
    pub async fn last_entry(&self) -> Result<Option<RefreshLedgerEntry>, StoreError> {
        match self.store.get(LAST_UPDATE_KEY).await? {
            Some(snapshot) => Ok(Some(RefreshLedgerEntry::from_json(&snapshot.body)?)),
            None => Ok(None),
        }
    }

    /// Run one refresh cycle.
    ///
    /// Unless `force` is set, a ledger entry younger than the interval
    /// short-circuits the run. Only a failed ledger write is an error;
    /// section failures are reported in the returned entry.
    pub async fn run(&self, force: bool) -> Result<RefreshOutcome, StoreError> {
        if !force && let Some(previous) = self.recent_entry().await {
            tracing::debug!(
                last_update = %previous.timestamp,
                interval_hours = self.interval_hours,
                "refresh skipped: last run is recent"
            );
            record_outcome("refresh_runs_total", "skipped");
            return Ok(RefreshOutcome::Skipped(previous));
        }

        let started = Instant::now();
        tracing::info!(force, "refresh run starting");

        let refreshed = futures::future::join_all(
            Section::FETCHED
                .into_iter()
                .map(|section| async move { (section, guarded(self.refresh_section(section)).await) }),
        )
        .await;

        let mut outcomes: Vec<(Section, SectionResult)> = Vec::with_capacity(Section::ALL.len());
        let mut notes = Vec::new();
        let mut home = None;
        let mut genres = None;
        let mut popular = None;

        for (section, result) in refreshed {
            let outcome = match result {
                Ok(Refreshed { data, persisted }) => {
                    if let Err(reason) = persisted {
                        notes.push((section, format!("not persisted: {reason}")));
                    }
                    match section {
                        Section::Home => home = Some(data),
                        Section::Genres => genres = Some(data),
                        Section::Popular => popular = Some(data),
                        Section::Sitemap => {}
                    }
                    Ok(())
                }
                Err(reason) => Err(reason),
            };
            outcomes.push((section, outcome));
        }

        let sitemap = match (&home, &genres) {
            (Some(home), Some(genres)) => {
                guarded(async {
                    let entries = build_sitemap(home, genres, popular.as_ref());
                    self.persist(Section::Sitemap, &entries).await
                })
                .await
            }
            _ => Err("requires home and genres".to_string()),
        };
        outcomes.push((Section::Sitemap, sitemap));

        let mut entry = RefreshLedgerEntry::from_outcomes(
            self.clock.now(),
            outcomes.iter().map(|(section, outcome)| (*section, outcome)),
        );

        for (section, outcome) in &outcomes {
            if let Err(reason) = outcome {
                tracing::warn!(section = %section, error = %reason, "refresh section failed");
                record_labelled("refresh_section_failures_total", "section", section.as_str());
            }
        }
        for (section, note) in &notes {
            tracing::warn!(section = %section, error = %note, "refreshed section not persisted");
            entry.add_note(*section, note);
        }

        let body = entry.to_json()?;
        if let Err(err) = self.store.put(LAST_UPDATE_KEY, &body, LAST_UPDATE_TTL).await {
            record_store_error("put", LAST_UPDATE_KEY, &err);
            record_outcome("refresh_runs_total", "ledger_error");
            return Err(err);
        }

        record_outcome(
            "refresh_runs_total",
            if entry.success { "success" } else { "partial" },
        );
        gauge!("refresh_last_run_timestamp_seconds").set(entry.timestamp.timestamp() as f64);
        tracing::info!(
            success = entry.success,
            home = entry.section_ok(Section::Home),
            genres = entry.section_ok(Section::Genres),
            popular = entry.section_ok(Section::Popular),
            sitemap = entry.section_ok(Section::Sitemap),
            duration_ms = started.elapsed().as_millis() as u64,
            "refresh run complete"
        );

        Ok(RefreshOutcome::Ran(entry))
    }

    /// The last ledger entry if it is younger than the interval.
    async fn recent_entry(&self) -> Option<RefreshLedgerEntry> {
        match self.last_entry().await {
            Ok(Some(entry)) if !entry.is_due(self.clock.now(), self.interval_hours) => Some(entry),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "could not read refresh ledger, refreshing anyway");
                None
            }
        }
    }

    /// Fetch one section and store its aggregate. Only a failed fetch
    /// fails the section; a failed write is carried back for the ledger.
    async fn refresh_section(&self, section: Section) -> Result<Refreshed, String> {
        let Some(endpoint) = section_endpoint(section) else {
            return Err("not a fetched section".to_string());
        };

        let data = self
            .origin
            .fetch_json(endpoint, self.options)
            .await
            .into_result()?;
        let persisted = self.persist(section, &data).await;
        Ok(Refreshed { data, persisted })
    }

    async fn persist<T: Serialize + ?Sized>(&self, section: Section, value: &T) -> SectionResult {
        let key = section.store_key();
        let body = serde_json::to_string(value).map_err(|e| e.to_string())?;
        self.store
            .put(key, &body, section.ttl_seconds())
            .await
            .map_err(|err| {
                record_store_error("put", key, &err);
                err.to_string()
            })
    }

    /// Whether [`run_periodic`](Self::run_periodic) is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the periodic loop. A pending tick wait is interrupted; a run in
    /// progress finishes first. Once stopped, the loop does not start again.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Call `run(false)` every `tick` until stopped.
    pub async fn run_periodic(&self, tick: Duration) {
        if self.stopped.load(Ordering::SeqCst) {
            tracing::debug!("periodic refresh not started: already stopped");
            return;
        }

        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            tick_secs = tick.as_secs(),
            interval_hours = self.interval_hours,
            "starting periodic refresh"
        );

        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.notified() => break,
            }
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.run(false).await {
                tracing::error!(error = %err, "scheduled refresh failed to record its ledger");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("periodic refresh stopped");
    }
}

/// Spawn the periodic refresh loop on the runtime.
pub fn spawn_refresh_loop(refresher: Arc<Refresher>, tick: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { refresher.run_periodic(tick).await })
}

/// Derive sitemap entries from refreshed sections.
///
/// Titles come from the popular list when it was refreshed, otherwise from
/// the home page sections.
pub fn build_sitemap(home: &Value, genres: &Value, popular: Option<&Value>) -> Vec<SitemapEntry> {
    let mut entries = vec![SitemapEntry::for_route(
        &RouteDescriptor::from_kind(RouteKind::Home),
        ChangeFreq::Hourly,
        1.0,
    )];

    for page in STATIC_PAGES {
        entries.push(SitemapEntry::for_route(
            &RouteDescriptor::from_kind(RouteKind::StaticInfoPage((*page).to_string())),
            ChangeFreq::Monthly,
            0.3,
        ));
    }

    let titles = match popular.map(payload::anime_list) {
        Some(list) if !list.is_empty() => list,
        _ => payload::home(home).all_items().cloned().collect(),
    };

    let mut seen = HashSet::new();
    entries.extend(
        titles
            .iter()
            .filter_map(|item| item.route())
            .map(|kind| {
                SitemapEntry::for_route(&RouteDescriptor::from_kind(kind), ChangeFreq::Daily, 0.8)
            })
            .filter(|entry| seen.insert(entry.path.clone()))
            .take(SITEMAP_MAX_TITLES),
    );

    entries.extend(
        payload::genres(genres)
            .iter()
            .filter_map(|genre| genre.route())
            .take(SITEMAP_MAX_GENRES)
            .map(|kind| {
                SitemapEntry::for_route(&RouteDescriptor::from_kind(kind), ChangeFreq::Weekly, 0.6)
            }),
    );

    entries
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
