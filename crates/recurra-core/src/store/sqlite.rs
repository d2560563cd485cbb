use super::{EntryQuery, RecordStore, StoreTransaction};
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{Entry, EntryFields, EntryKind, WorkspaceId};
use crate::rule::RecurrenceRule;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Flat row shape shared by heads and instances.
#[derive(Debug, Clone, FromRow)]
struct EntryRow {
    id: Uuid,
    workspace_id: Uuid,
    series_id: Option<Uuid>,
    entry_date: NaiveDate,
    amount: f64,
    label: String,
    is_planned: bool,
    recurrence_rule: Option<String>,
    recurrence_until: Option<NaiveDate>,
    recurrence_aux_day: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for Entry {
    type Error = CoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let kind = match (row.series_id, row.recurrence_rule) {
            (Some(series_id), Some(_)) => {
                return Err(CoreError::InconsistentSeries(format!(
                    "entry {} belongs to series {} but carries a recurrence rule",
                    row.id, series_id
                )));
            }
            (Some(series_id), None) => EntryKind::Instance { series_id },
            (None, Some(text)) => {
                let aux = row.recurrence_aux_day.clamp(0, 31) as u32;
                EntryKind::Head {
                    rule: Some(RecurrenceRule::parse(&text, row.recurrence_until, aux)?),
                }
            }
            (None, None) => EntryKind::Head { rule: None },
        };

        Ok(Entry {
            id: row.id,
            workspace_id: WorkspaceId(row.workspace_id),
            kind,
            date: row.entry_date,
            fields: EntryFields {
                amount: row.amount,
                label: row.label,
                is_planned: row.is_planned,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Canonical rule columns: (text, until, auxiliary day).
fn rule_columns(entry: &Entry) -> (Option<String>, Option<NaiveDate>, i64) {
    match entry.rule() {
        Some(rule) => {
            let canonical = rule.to_canonical(entry.date);
            (
                Some(canonical.text),
                canonical.until,
                i64::from(canonical.auxiliary_day),
            )
        }
        None => (None, None, 0),
    }
}

fn select_entries(workspace: WorkspaceId, query: &EntryQuery) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT * FROM entries WHERE workspace_id = ");
    qb.push_bind(workspace.as_uuid());

    if let Some(series_id) = query.series_id {
        qb.push(" AND series_id = ").push_bind(series_id);
    }
    if query.heads_only {
        qb.push(" AND series_id IS NULL");
    }
    if let Some(from) = query.date_from {
        qb.push(" AND entry_date >= ").push_bind(from);
    }
    if let Some(after) = query.date_after {
        qb.push(" AND entry_date > ").push_bind(after);
    }
    if let Some(to) = query.date_to {
        qb.push(" AND entry_date <= ").push_bind(to);
    }
    if let Some(label) = &query.label {
        qb.push(" AND label LIKE ")
            .push_bind(format!("%{}%", escape_like(label)))
            .push(" ESCAPE '\\'");
    }
    if let Some(prefix) = &query.id_prefix {
        let digits: String = prefix.chars().filter(|c| *c != '-').collect();
        if digits.chars().all(|c| c.is_ascii_hexdigit()) {
            qb.push(" AND lower(hex(id)) LIKE ")
                .push_bind(format!("{}%", digits.to_ascii_lowercase()));
        } else {
            // Ids are all hex digits
            qb.push(" AND 0");
        }
    }

    // Heads sort ahead of instances sharing their date
    qb.push(" ORDER BY entry_date, series_id IS NOT NULL, id");
    qb
}

/// Makes `%`, `_` and the escape character itself match literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn fetch_entry<'e, E>(executor: E, workspace: WorkspaceId, id: Uuid) -> Result<Option<Entry>, CoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<EntryRow> = sqlx::query_as("SELECT * FROM entries WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(workspace.as_uuid())
        .fetch_optional(executor)
        .await?;
    row.map(Entry::try_from).transpose()
}

async fn fetch_entries<'e, E>(executor: E, workspace: WorkspaceId, query: &EntryQuery) -> Result<Vec<Entry>, CoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut qb = select_entries(workspace, query);
    let rows: Vec<EntryRow> = qb.build_query_as().fetch_all(executor).await?;
    rows.into_iter().map(Entry::try_from).collect()
}

/// SQLite implementation of [`RecordStore`]
///
/// SQLite allows a single writer per database file. Transactions are handed
/// out one at a time through `write_gate`, so writers on different series
/// queue up here instead of failing with `SQLITE_BUSY` when a deferred
/// transaction tries to upgrade its read lock.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
    write_gate: Arc<Mutex<()>>,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> Result<Self::Tx, CoreError> {
        let gate = self.write_gate.clone().lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(SqliteTransaction { tx, _gate: gate })
    }

    async fn find(&self, workspace: WorkspaceId, id: Uuid) -> Result<Option<Entry>, CoreError> {
        fetch_entry(&self.pool, workspace, id).await
    }

    async fn find_all(&self, workspace: WorkspaceId, query: &EntryQuery) -> Result<Vec<Entry>, CoreError> {
        fetch_entries(&self.pool, workspace, query).await
    }
}

/// Open SQLite transaction. sqlx rolls it back when dropped uncommitted.
///
/// Fields drop in order: the transaction ends before the gate opens.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn insert(&mut self, entry: &Entry) -> Result<Uuid, CoreError> {
        let (rule, until, aux) = rule_columns(entry);
        sqlx::query(
            r#"INSERT INTO entries (id, workspace_id, series_id, entry_date, amount, label, is_planned,
                recurrence_rule, recurrence_until, recurrence_aux_day, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(entry.id)
        .bind(entry.workspace_id.as_uuid())
        .bind(entry.series_id())
        .bind(entry.date)
        .bind(entry.fields.amount)
        .bind(&entry.fields.label)
        .bind(entry.fields.is_planned)
        .bind(rule)
        .bind(until)
        .bind(aux)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(entry.id)
    }

    async fn find(&mut self, workspace: WorkspaceId, id: Uuid) -> Result<Option<Entry>, CoreError> {
        fetch_entry(&mut *self.tx, workspace, id).await
    }

    async fn find_all(&mut self, workspace: WorkspaceId, query: &EntryQuery) -> Result<Vec<Entry>, CoreError> {
        fetch_entries(&mut *self.tx, workspace, query).await
    }

    async fn update(&mut self, entry: &Entry) -> Result<(), CoreError> {
        let (rule, until, aux) = rule_columns(entry);
        let result = sqlx::query(
            r#"UPDATE entries SET series_id = $1, entry_date = $2, amount = $3, label = $4, is_planned = $5,
                recurrence_rule = $6, recurrence_until = $7, recurrence_aux_day = $8, updated_at = $9
            WHERE id = $10 AND workspace_id = $11"#,
        )
        .bind(entry.series_id())
        .bind(entry.date)
        .bind(entry.fields.amount)
        .bind(&entry.fields.label)
        .bind(entry.fields.is_planned)
        .bind(rule)
        .bind(until)
        .bind(aux)
        .bind(Utc::now())
        .bind(entry.id)
        .bind(entry.workspace_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Entry with id {} not found", entry.id)));
        }
        Ok(())
    }

    async fn delete(&mut self, workspace: WorkspaceId, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1 AND workspace_id = $2")
            .bind(id)
            .bind(workspace.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Entry with id {} not found", id)));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), CoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), CoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
