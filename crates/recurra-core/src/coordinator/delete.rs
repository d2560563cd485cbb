use super::{delete_entries, instances_of, load, resolve_head, settle, SeriesCoordinator};
use crate::calendar::DateInterval;
use crate::error::CoreError;
use crate::models::{DeleteSummary, Entry, MutationScope, WorkspaceId};
use crate::store::{EntryQuery, RecordStore, StoreTransaction};
use tracing::{debug, info};
use uuid::Uuid;

impl<S: RecordStore> SeriesCoordinator<S> {
    pub async fn delete(&self, workspace: WorkspaceId, id: Uuid, scope: MutationScope) -> Result<DeleteSummary, CoreError> {
        let _guard = self.lock_series(workspace, id).await?;
        let mut tx = self.store.begin().await?;
        let result = self.delete_in_transaction(&mut tx, workspace, id, scope).await;
        let summary = settle(tx, result).await?;

        info!(
            workspace = %workspace,
            entry_id = %id,
            scope = %scope,
            removed = summary.removed,
            "entry deleted"
        );
        Ok(summary)
    }

    async fn delete_in_transaction(
        &self,
        tx: &mut S::Tx,
        workspace: WorkspaceId,
        id: Uuid,
        scope: MutationScope,
    ) -> Result<DeleteSummary, CoreError> {
        let target = load(tx, workspace, id).await?;
        match scope {
            MutationScope::One if target.is_head() => self.delete_head_only(tx, target).await,
            MutationScope::One => {
                tx.delete(workspace, target.id).await?;
                Ok(DeleteSummary {
                    removed: 1,
                    ..DeleteSummary::default()
                })
            }
            MutationScope::Future if !target.is_head() => self.delete_future(tx, target).await,
            MutationScope::Future | MutationScope::All => self.delete_series(tx, target).await,
        }
    }

    /// Removes a head but keeps its series alive: the earliest instance takes
    /// over the rule and the remaining instances.
    async fn delete_head_only(&self, tx: &mut S::Tx, head: Entry) -> Result<DeleteSummary, CoreError> {
        let workspace = head.workspace_id;
        let mut instances = instances_of(tx, workspace, head.id).await?;
        if instances.is_empty() {
            tx.delete(workspace, head.id).await?;
            return Ok(DeleteSummary {
                removed: 1,
                ..DeleteSummary::default()
            });
        }

        let mut promoted = instances.remove(0);
        promoted.make_head(head.rule().copied());
        tx.update(&promoted).await?;

        for instance in &mut instances {
            instance.reparent(promoted.id);
            tx.update(instance).await?;
        }
        tx.delete(workspace, head.id).await?;
        debug!(series = %head.id, promoted = %promoted.id, reparented = instances.len(), "head promoted");

        // Continue past the surviving instances only: the new head's own
        // anchor may clamp differently from the old one.
        let horizon = self.config.window_for(promoted.date, &self.calendar);
        let window = match instances.last() {
            Some(last) => DateInterval::new(last.date, horizon.end).strictly_after(last.date, &self.calendar),
            None => horizon,
        };
        self.materialize(tx, &promoted, Some(window)).await?;

        Ok(DeleteSummary {
            removed: 1,
            promoted: Some(promoted.id),
            truncated_head: None,
        })
    }

    async fn delete_future(&self, tx: &mut S::Tx, target: Entry) -> Result<DeleteSummary, CoreError> {
        let workspace = target.workspace_id;
        let mut head = resolve_head(tx, workspace, &target).await?;

        let mut doomed = tx
            .find_all(workspace, &EntryQuery::instances_of(head.id).after(target.date))
            .await?;
        doomed.push(target.clone());
        let removed = delete_entries(tx, workspace, &doomed).await?;

        head.set_recurrence_end(self.calendar.add_days(target.date, -1));
        tx.update(&head).await?;
        debug!(series = %head.id, removed, until = ?head.recurrence_end_date(), "series truncated");

        Ok(DeleteSummary {
            removed,
            promoted: None,
            truncated_head: Some(head.id),
        })
    }

    async fn delete_series(&self, tx: &mut S::Tx, target: Entry) -> Result<DeleteSummary, CoreError> {
        let workspace = target.workspace_id;
        let head = resolve_head(tx, workspace, &target).await?;
        let instances = instances_of(tx, workspace, head.id).await?;
        let removed = delete_entries(tx, workspace, &instances).await?;
        tx.delete(workspace, head.id).await?;

        Ok(DeleteSummary {
            removed: removed + 1,
            ..DeleteSummary::default()
        })
    }
}
