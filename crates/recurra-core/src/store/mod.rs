use crate::calendar::DateInterval;
use crate::error::CoreError;
use crate::models::{Entry, WorkspaceId};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

pub mod sqlite;

pub use sqlite::{SqliteStore, SqliteTransaction};

/// Persistence seam for entries.
///
/// Reads outside a transaction see committed data only. Every mutation goes
/// through a [`StoreTransaction`] obtained from [`RecordStore::begin`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Tx: StoreTransaction;

    async fn begin(&self) -> Result<Self::Tx, CoreError>;
    async fn find(&self, workspace: WorkspaceId, id: Uuid) -> Result<Option<Entry>, CoreError>;
    async fn find_all(&self, workspace: WorkspaceId, query: &EntryQuery) -> Result<Vec<Entry>, CoreError>;
}

/// A unit of work against the store. Dropping it without calling
/// [`StoreTransaction::commit`] discards every change made through it.
#[async_trait]
pub trait StoreTransaction: Send + Sized {
    async fn insert(&mut self, entry: &Entry) -> Result<Uuid, CoreError>;
    async fn find(&mut self, workspace: WorkspaceId, id: Uuid) -> Result<Option<Entry>, CoreError>;
    async fn find_all(&mut self, workspace: WorkspaceId, query: &EntryQuery) -> Result<Vec<Entry>, CoreError>;
    /// Fails with `NotFound` when no such entry exists in the entry's workspace.
    async fn update(&mut self, entry: &Entry) -> Result<(), CoreError>;
    async fn delete(&mut self, workspace: WorkspaceId, id: Uuid) -> Result<(), CoreError>;
    async fn commit(self) -> Result<(), CoreError>;
    async fn rollback(self) -> Result<(), CoreError>;
}

/// Predicate over entries. Unset fields do not constrain; results are ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Instances of the series headed by this id
    pub series_id: Option<Uuid>,
    pub heads_only: bool,
    /// Inclusive lower bound
    pub date_from: Option<NaiveDate>,
    /// Exclusive lower bound
    pub date_after: Option<NaiveDate>,
    /// Inclusive upper bound
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring of the label
    pub label: Option<String>,
    /// Leading hex digits of the id, hyphens ignored
    pub id_prefix: Option<String>,
}

impl EntryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances_of(series_id: Uuid) -> Self {
        Self {
            series_id: Some(series_id),
            ..Self::default()
        }
    }

    pub fn heads() -> Self {
        Self {
            heads_only: true,
            ..Self::default()
        }
    }

    pub fn on_or_after(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn after(mut self, date: NaiveDate) -> Self {
        self.date_after = Some(date);
        self
    }

    pub fn on_or_before(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    pub fn within(self, interval: DateInterval) -> Self {
        self.on_or_after(interval.start).on_or_before(interval.end)
    }

    pub fn label_contains(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id_starting_with(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }
}
