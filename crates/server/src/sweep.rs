//! Age-based removal of stale uploads.

use crate::state::AppState;
use serde::Serialize;
use shrink_core::ExtensionPolicy;
use shrink_storage::{FileStore, StorageResult};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

/// Outcome of one sweep run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Files considered (allow-listed extension).
    pub scanned: u64,
    pub deleted: u64,
    pub errors: u64,
}

/// Delete allow-listed files last modified at least `max_age` before `now`.
///
/// Per-file failures are counted and logged; only a failed listing aborts the run.
pub async fn run_sweep(
    storage: &dyn FileStore,
    policy: &ExtensionPolicy,
    max_age: Duration,
    now: OffsetDateTime,
) -> StorageResult<SweepStats> {
    let mut stats = SweepStats::default();
    // An age too large to represent means nothing can be old enough.
    let cutoff = time::Duration::try_from(max_age)
        .ok()
        .and_then(|age| now.checked_sub(age));

    for object in storage.list().await? {
        let extension = object.key.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        if !policy.allows(extension) {
            continue;
        }
        stats.scanned += 1;

        let (Some(modified), Some(cutoff)) = (object.last_modified, cutoff) else {
            continue;
        };
        if modified > cutoff {
            continue;
        }

        match storage.delete(&object.key).await {
            Ok(true) => {
                stats.deleted += 1;
                tracing::info!(filename = %object.key, "Deleted stale file");
            }
            Ok(false) => {}
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(filename = %object.key, error = %e, "Failed to delete stale file");
            }
        }
    }

    Ok(stats)
}

/// Spawn the periodic sweep if `sweep.max_age_days` is set.
pub fn spawn_sweep_task(state: AppState) -> Option<JoinHandle<()>> {
    let sweep = state.config.sweep.clone();
    if !sweep.enabled() {
        tracing::info!("Stale file sweep disabled");
        return None;
    }

    tracing::info!(
        max_age_days = sweep.max_age_days,
        interval_secs = sweep.interval_secs,
        "Stale file sweep enabled"
    );

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep.interval());
        loop {
            interval.tick().await;
            match run_sweep(
                state.storage.as_ref(),
                state.sniffer.policy(),
                sweep.max_age(),
                OffsetDateTime::now_utc(),
            )
            .await
            {
                Ok(stats) => tracing::info!(
                    scanned = stats.scanned,
                    deleted = stats.deleted,
                    errors = stats.errors,
                    "Stale file sweep finished"
                ),
                Err(e) => tracing::error!(error = %e, "Stale file sweep failed"),
            }
        }
    }))
}
