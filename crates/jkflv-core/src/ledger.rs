//! The refresh ledger: a single overwritten record of the last refresh run.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error, GENRES_DATA_KEY, GENRES_DATA_TTL, HOME_DATA_KEY, HOME_DATA_TTL, LAST_UPDATE_KEY,
    POPULAR_DATA_KEY, POPULAR_DATA_TTL, Result, SITEMAP_DATA_KEY, SITEMAP_DATA_TTL,
};

/// An independently refreshed content category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Latest movies and series.
    Home,
    /// The genre list.
    Genres,
    /// Most popular titles.
    Popular,
    /// Derived from home + genres (+ popular); not fetched.
    Sitemap,
}

impl Section {
    /// Every section, in ledger order.
    pub const ALL: [Section; 4] = [
        Section::Home,
        Section::Genres,
        Section::Popular,
        Section::Sitemap,
    ];

    /// Sections fetched from upstream in parallel.
    pub const FETCHED: [Section; 3] = [Section::Home, Section::Genres, Section::Popular];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Genres => "genres",
            Self::Popular => "popular",
            Self::Sitemap => "sitemap",
        }
    }

    /// Store key the section's aggregate lives under.
    pub fn store_key(self) -> &'static str {
        match self {
            Self::Home => HOME_DATA_KEY,
            Self::Genres => GENRES_DATA_KEY,
            Self::Popular => POPULAR_DATA_KEY,
            Self::Sitemap => SITEMAP_DATA_KEY,
        }
    }

    /// TTL tiered by how volatile the section is.
    pub fn ttl_seconds(self) -> u64 {
        match self {
            Self::Home => HOME_DATA_TTL,
            Self::Genres => GENRES_DATA_TTL,
            Self::Popular => POPULAR_DATA_TTL,
            Self::Sitemap => SITEMAP_DATA_TTL,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome summary of one refresh run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshLedgerEntry {
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// True iff every section succeeded.
    pub success: bool,
    /// Per-section outcome. Always contains every [`Section`]. Fetched
    /// sections record whether the upstream fetch succeeded; the sitemap
    /// records whether it was derived and stored.
    pub per_section: BTreeMap<Section, bool>,
    /// Failed sections and their reasons, then any notes, `;`-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RefreshLedgerEntry {
    /// Summarize per-section outcomes into a ledger entry.
    ///
    /// Sections missing from `outcomes` are recorded as failed.
    pub fn from_outcomes<'a, I>(timestamp: DateTime<Utc>, outcomes: I) -> Self
    where
        I: IntoIterator<Item = (Section, &'a std::result::Result<(), String>)>,
    {
        let mut per_section: BTreeMap<Section, bool> =
            Section::ALL.iter().map(|s| (*s, false)).collect();
        let mut failures = BTreeMap::new();

        for (section, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    per_section.insert(section, true);
                    failures.remove(&section);
                }
                Err(reason) => {
                    per_section.insert(section, false);
                    failures.insert(section, reason.clone());
                }
            }
        }

        for (section, ok) in &per_section {
            if !ok {
                failures
                    .entry(*section)
                    .or_insert_with(|| "not attempted".to_string());
            }
        }

        let error_message = if failures.is_empty() {
            None
        } else {
            Some(
                failures
                    .iter()
                    .map(|(section, reason)| format!("{section}: {reason}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        Self {
            timestamp,
            success: per_section.values().all(|ok| *ok),
            per_section,
            error_message,
        }
    }

    /// Append a problem that did not fail its section, such as a fetched
    /// aggregate the store refused to keep.
    pub fn add_note(&mut self, section: Section, note: &str) {
        let note = format!("{section}: {note}");
        self.error_message = Some(match self.error_message.take() {
            Some(existing) => format!("{existing}; {note}"),
            None => note,
        });
    }

    /// Whether a section succeeded in this run.
    pub fn section_ok(&self, section: Section) -> bool {
        self.per_section.get(&section).copied().unwrap_or(false)
    }

    /// Whether enough time has passed since this run to refresh again.
    pub fn is_due(&self, now: DateTime<Utc>, interval_hours: u32) -> bool {
        now - self.timestamp >= Duration::hours(i64::from(interval_hours))
    }

    /// Encode for the store.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the store.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::CorruptRecord {
            key: LAST_UPDATE_KEY.to_string(),
            reason: e.to_string(),
        })
    }
}
