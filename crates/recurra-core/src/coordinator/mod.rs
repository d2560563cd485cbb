//! Series lifecycle: creation, scoped updates and scoped deletes.
//!
//! Every mutation runs under the series lock and inside one store transaction.
//! The transaction is committed when the operation succeeds and rolled back on
//! any error, so a failed mutation leaves the series exactly as it was.

use crate::calendar::{Calendar, DateInterval};
use crate::engine::RecurrenceEngine;
use crate::error::CoreError;
use crate::locks::SeriesLocks;
use crate::models::{Entry, MaterializationConfig, SeriesView, WorkspaceId};
use crate::rule::RecurrenceRule;
use crate::store::{EntryQuery, RecordStore, StoreTransaction};
use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};
use uuid::Uuid;

mod create;
mod delete;
mod materialize;
mod update;

/// Attempts at locking a series whose head keeps changing underneath us.
const LOCK_ATTEMPTS: usize = 3;

pub struct SeriesCoordinator<S: RecordStore> {
    store: S,
    calendar: Calendar,
    config: MaterializationConfig,
    locks: SeriesLocks,
}

impl<S: RecordStore> SeriesCoordinator<S> {
    pub fn new(store: S, calendar: Calendar, config: MaterializationConfig) -> Self {
        Self {
            store,
            calendar,
            config,
            locks: SeriesLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    pub async fn find(&self, workspace: WorkspaceId, id: Uuid) -> Result<Entry, CoreError> {
        self.store
            .find(workspace, id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Entry with id {} not found", id)))
    }

    /// The whole series `id` belongs to, whether `id` names the head or an instance.
    pub async fn series(&self, workspace: WorkspaceId, id: Uuid) -> Result<SeriesView, CoreError> {
        let entry = self.find(workspace, id).await?;
        let head = match entry.series_id() {
            None => entry,
            Some(series_id) => match self.store.find(workspace, series_id).await? {
                Some(head) if head.is_head() => head,
                _ => return Err(missing_head(&entry, series_id)),
            },
        };
        let instances = self
            .store
            .find_all(workspace, &EntryQuery::instances_of(head.id))
            .await?;
        Ok(SeriesView { head, instances })
    }

    pub async fn entries_between(&self, workspace: WorkspaceId, interval: DateInterval) -> Result<Vec<Entry>, CoreError> {
        if interval.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .find_all(workspace, &EntryQuery::new().within(interval))
            .await
    }

    /// Dates `rule` would produce from `base` inside `interval`, without touching the store.
    pub fn preview(&self, rule: &RecurrenceRule, base: NaiveDate, interval: DateInterval) -> Vec<NaiveDate> {
        RecurrenceEngine::projected_dates(rule, base, interval, &self.calendar)
    }

    /// Takes the lock of the series `id` currently belongs to.
    ///
    /// Promotion can move an instance to a new head while we wait, so the
    /// membership is checked again once the lock is held. Gives up with
    /// `InconsistentSeries` when it never settles.
    async fn lock_series(&self, workspace: WorkspaceId, id: Uuid) -> Result<OwnedMutexGuard<()>, CoreError> {
        let mut head_id = self.find(workspace, id).await?.head_id();
        for _ in 0..LOCK_ATTEMPTS {
            let guard = self.locks.acquire(head_id).await;
            let current = self.find(workspace, id).await?.head_id();
            if current == head_id {
                return Ok(guard);
            }
            debug!(entry_id = %id, from = %head_id, to = %current, "series changed while waiting for its lock");
            head_id = current;
        }
        Err(CoreError::InconsistentSeries(format!(
            "series of entry {} kept changing while waiting for its lock",
            id
        )))
    }
}

/// Commits on success, rolls back on failure. A failed rollback is logged and
/// the original error is returned.
async fn settle<T, X: StoreTransaction>(tx: X, result: Result<T, CoreError>) -> Result<T, CoreError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn load<X: StoreTransaction>(tx: &mut X, workspace: WorkspaceId, id: Uuid) -> Result<Entry, CoreError> {
    tx.find(workspace, id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Entry with id {} not found", id)))
}

/// The head of `entry`'s series. Fails when an instance points at a missing
/// head or at another instance.
async fn resolve_head<X: StoreTransaction>(tx: &mut X, workspace: WorkspaceId, entry: &Entry) -> Result<Entry, CoreError> {
    match entry.series_id() {
        None => Ok(entry.clone()),
        Some(series_id) => match tx.find(workspace, series_id).await? {
            Some(head) if head.is_head() => Ok(head),
            _ => Err(missing_head(entry, series_id)),
        },
    }
}

async fn instances_of<X: StoreTransaction>(tx: &mut X, workspace: WorkspaceId, head_id: Uuid) -> Result<Vec<Entry>, CoreError> {
    tx.find_all(workspace, &EntryQuery::instances_of(head_id)).await
}

async fn delete_entries<X: StoreTransaction>(tx: &mut X, workspace: WorkspaceId, entries: &[Entry]) -> Result<usize, CoreError> {
    for entry in entries {
        tx.delete(workspace, entry.id).await?;
    }
    Ok(entries.len())
}

fn missing_head(entry: &Entry, series_id: Uuid) -> CoreError {
    CoreError::InconsistentSeries(format!(
        "entry {} belongs to series {} which has no head",
        entry.id, series_id
    ))
}

fn check_end_date(date: NaiveDate, rule: Option<&RecurrenceRule>) -> Result<(), CoreError> {
    match rule.and_then(RecurrenceRule::end_date) {
        Some(end) if end < date => Err(CoreError::InvalidInput(format!(
            "recurrence end {} is before the first date {}",
            end, date
        ))),
        _ => Ok(()),
    }
}

fn check_amount(amount: f64) -> Result<(), CoreError> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidInput(format!("amount must be a finite number, got {}", amount)))
    }
}
