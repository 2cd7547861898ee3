//! Content refresh endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use jkflv_core::{RefreshLedgerEntry, Section};
use serde::Serialize;

use crate::error::EdgeError;
use crate::state::AppState;

/// Current refresh state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    /// Timestamp of the last run, if any.
    pub last_update: Option<DateTime<Utc>>,
    /// Last ledger entry.
    pub ledger: Option<RefreshLedgerEntry>,
    /// Whether each section aggregate is present in the store.
    pub cache: BTreeMap<&'static str, bool>,
}

/// `POST /api/update-content`: run a forced refresh and return its ledger.
pub async fn trigger_update(
    State(state): State<AppState>,
) -> Result<Json<RefreshLedgerEntry>, EdgeError> {
    tracing::info!("on-demand refresh requested");
    let outcome = state.refresher.run(true).await?;
    Ok(Json(outcome.into_ledger()))
}

/// `GET /api/update-content`: report the ledger and cache presence without
/// refreshing.
pub async fn update_status(State(state): State<AppState>) -> Result<Json<UpdateStatus>, EdgeError> {
    let ledger = match state.refresher.last_entry().await {
        Ok(entry) => entry,
        Err(err) => {
            tracing::warn!(error = %err, "could not read refresh ledger");
            None
        }
    };

    let mut cache = BTreeMap::new();
    for section in Section::ALL {
        let key = section.store_key();
        let present = state.store.get(key).await?.is_some();
        cache.insert(key, present);
    }

    Ok(Json(UpdateStatus {
        last_update: ledger.as_ref().map(|entry| entry.timestamp),
        ledger,
        cache,
    }))
}
