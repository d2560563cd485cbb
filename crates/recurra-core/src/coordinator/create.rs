use super::{check_amount, check_end_date, instances_of, settle, SeriesCoordinator};
use crate::calendar::DateInterval;
use crate::error::CoreError;
use crate::models::{Entry, NewEntryData, SeriesView, WorkspaceId};
use crate::store::{RecordStore, StoreTransaction};
use tracing::info;

impl<S: RecordStore> SeriesCoordinator<S> {
    /// Persists a new head and, when it recurs, its instances inside `window`
    /// (the configured lookahead when `None`).
    pub async fn create(
        &self,
        workspace: WorkspaceId,
        data: NewEntryData,
        window: Option<DateInterval>,
    ) -> Result<SeriesView, CoreError> {
        check_amount(data.fields.amount)?;
        let rule = data.effective_rule();
        check_end_date(data.date, rule.as_ref())?;

        let head = Entry::new_head(workspace, data.date, data.fields, rule);
        let _guard = self.locks.acquire(head.id).await;

        let mut tx = self.store.begin().await?;
        let result = self.create_in_transaction(&mut tx, head, window).await;
        let view = settle(tx, result).await?;

        info!(
            workspace = %workspace,
            entry_id = %view.head.id,
            instances = view.instances.len(),
            "entry created"
        );
        Ok(view)
    }

    async fn create_in_transaction(
        &self,
        tx: &mut S::Tx,
        head: Entry,
        window: Option<DateInterval>,
    ) -> Result<SeriesView, CoreError> {
        tx.insert(&head).await?;
        self.materialize(tx, &head, window).await?;
        let instances = instances_of(tx, head.workspace_id, head.id).await?;
        Ok(SeriesView { head, instances })
    }
}
