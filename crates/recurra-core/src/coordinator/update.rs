use super::{
    check_amount, check_end_date, delete_entries, instances_of, load, resolve_head, settle, SeriesCoordinator,
};
use crate::error::CoreError;
use crate::models::{Entry, EntryKind, MutationScope, UpdateEntryData, WorkspaceId};
use crate::rule::RecurrenceRule;
use crate::store::{EntryQuery, RecordStore, StoreTransaction};
use tracing::{debug, info};
use uuid::Uuid;

impl<S: RecordStore> SeriesCoordinator<S> {
    /// Applies `data` to the entry `id` under `scope`, returning the entry the
    /// change landed on: the target itself for `one` and `future`, the series
    /// head for `all`.
    pub async fn update(
        &self,
        workspace: WorkspaceId,
        id: Uuid,
        scope: MutationScope,
        data: UpdateEntryData,
    ) -> Result<Entry, CoreError> {
        if let Some(amount) = data.amount {
            check_amount(amount)?;
        }

        let _guard = self.lock_series(workspace, id).await?;
        let mut tx = self.store.begin().await?;
        let result = self.update_in_transaction(&mut tx, workspace, id, scope, &data).await;
        let entry = settle(tx, result).await?;

        info!(workspace = %workspace, entry_id = %id, scope = %scope, "entry updated");
        Ok(entry)
    }

    async fn update_in_transaction(
        &self,
        tx: &mut S::Tx,
        workspace: WorkspaceId,
        id: Uuid,
        scope: MutationScope,
        data: &UpdateEntryData,
    ) -> Result<Entry, CoreError> {
        let target = load(tx, workspace, id).await?;
        let updated = match (scope, target.kind) {
            (MutationScope::One, _) => self.update_one(tx, target, data).await?,
            (MutationScope::Future, EntryKind::Instance { .. }) => self.update_future(tx, target, data).await?,
            (MutationScope::Future, EntryKind::Head { rule: Some(_) }) => self.detach_head(tx, target, data).await?,
            // A one-off has no future to split off
            (MutationScope::Future, EntryKind::Head { rule: None }) | (MutationScope::All, _) => {
                self.update_all(tx, target, data).await?
            }
        };

        load(tx, workspace, updated.id).await
    }

    async fn update_one(&self, tx: &mut S::Tx, mut target: Entry, data: &UpdateEntryData) -> Result<Entry, CoreError> {
        if data.touches_recurrence() {
            return Err(CoreError::InvalidInput(
                "recurrence changes apply to a whole series; use scope future or all".to_string(),
            ));
        }

        if let Some(date) = data.date.filter(|date| *date != target.date) {
            let workspace = target.workspace_id;
            let head_id = target.head_id();
            let mut members = instances_of(tx, workspace, head_id).await?;
            if let Some(head) = tx.find(workspace, head_id).await? {
                members.push(head);
            }
            if members.iter().any(|member| member.id != target.id && member.date == date) {
                return Err(CoreError::InvalidInput(format!(
                    "another entry of this series is already dated {}",
                    date
                )));
            }
        }

        data.apply_fields(&mut target);
        tx.update(&target).await?;
        Ok(target)
    }

    /// Splits the series at an instance: the head stops the day before it,
    /// later instances go away and the target becomes a standalone head.
    async fn update_future(&self, tx: &mut S::Tx, mut target: Entry, data: &UpdateEntryData) -> Result<Entry, CoreError> {
        let workspace = target.workspace_id;
        let mut head = resolve_head(tx, workspace, &target).await?;
        let split = target.date;

        head.set_recurrence_end(self.calendar.add_days(split, -1));
        tx.update(&head).await?;

        let later = tx
            .find_all(workspace, &EntryQuery::instances_of(head.id).after(split))
            .await?;
        let removed = delete_entries(tx, workspace, &later).await?;
        debug!(series = %head.id, removed, until = ?head.recurrence_end_date(), "series truncated");

        let rule = next_rule(data, None)?;
        data.apply_fields(&mut target);
        target.make_head(rule);
        check_end_date(target.date, target.rule())?;
        tx.update(&target).await?;
        self.materialize(tx, &target, None).await?;
        Ok(target)
    }

    /// `future` on a recurring head: every instance goes away and the head
    /// itself becomes a standalone entry.
    async fn detach_head(&self, tx: &mut S::Tx, mut head: Entry, data: &UpdateEntryData) -> Result<Entry, CoreError> {
        let workspace = head.workspace_id;
        let instances = instances_of(tx, workspace, head.id).await?;
        let removed = delete_entries(tx, workspace, &instances).await?;
        debug!(series = %head.id, removed, "series detached from head");

        let rule = next_rule(data, None)?;
        data.apply_fields(&mut head);
        head.make_head(rule);
        check_end_date(head.date, head.rule())?;
        tx.update(&head).await?;
        self.materialize(tx, &head, None).await?;
        Ok(head)
    }

    /// Rewrites the head and regenerates every instance from it.
    async fn update_all(&self, tx: &mut S::Tx, target: Entry, data: &UpdateEntryData) -> Result<Entry, CoreError> {
        let workspace = target.workspace_id;
        let mut head = resolve_head(tx, workspace, &target).await?;

        let rule = next_rule(data, head.rule().copied())?;

        data.apply_fields(&mut head);
        head.make_head(rule);
        check_end_date(head.date, head.rule())?;
        tx.update(&head).await?;

        let instances = instances_of(tx, workspace, head.id).await?;
        let removed = delete_entries(tx, workspace, &instances).await?;
        let created = self.materialize(tx, &head, None).await?;
        debug!(series = %head.id, removed, created, "series regenerated");
        Ok(head)
    }
}

/// The rule the rewritten head carries. An end date on its own cannot make a
/// one-off recur.
fn next_rule(data: &UpdateEntryData, current: Option<RecurrenceRule>) -> Result<Option<RecurrenceRule>, CoreError> {
    let rule = data.resolve_rule(current);
    if rule.is_none() && matches!(data.end_date, Some(Some(_))) {
        return Err(CoreError::InvalidInput(
            "an end date needs a recurrence rule".to_string(),
        ));
    }
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn end() -> Option<Option<NaiveDate>> {
        Some(NaiveDate::from_ymd_opt(2024, 6, 30))
    }

    #[test]
    fn test_end_date_without_rule_is_rejected() {
        let data = UpdateEntryData {
            end_date: end(),
            ..Default::default()
        };
        assert!(matches!(next_rule(&data, None), Err(CoreError::InvalidInput(_))));

        let cleared = UpdateEntryData {
            rule: Some(None),
            end_date: end(),
            ..Default::default()
        };
        let monthly = RecurrenceRule::Monthly { end_date: None };
        assert!(matches!(next_rule(&cleared, Some(monthly)), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_end_date_applies_to_inherited_rule() {
        let data = UpdateEntryData {
            end_date: end(),
            ..Default::default()
        };
        let monthly = RecurrenceRule::Monthly { end_date: None };
        assert_eq!(
            next_rule(&data, Some(monthly)).unwrap(),
            Some(RecurrenceRule::Monthly {
                end_date: NaiveDate::from_ymd_opt(2024, 6, 30)
            })
        );

        // Clearing the end date is fine with or without a rule
        let open = UpdateEntryData {
            end_date: Some(None),
            ..Default::default()
        };
        assert_eq!(next_rule(&open, None).unwrap(), None);
    }
}
