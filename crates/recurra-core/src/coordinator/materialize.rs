use super::{instances_of, SeriesCoordinator};
use crate::calendar::DateInterval;
use crate::engine::RecurrenceEngine;
use crate::error::CoreError;
use crate::models::Entry;
use crate::store::{RecordStore, StoreTransaction};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

impl<S: RecordStore> SeriesCoordinator<S> {
    /// Writes the missing instances of `head` inside `window`.
    ///
    /// Dates that already have an instance are skipped, so running this twice
    /// over the same window creates nothing the second time. The window
    /// defaults to the configured lookahead from the head's date and never
    /// includes the head's own date.
    pub(super) async fn materialize(
        &self,
        tx: &mut S::Tx,
        head: &Entry,
        window: Option<DateInterval>,
    ) -> Result<usize, CoreError> {
        let Some(rule) = head.rule() else {
            return Ok(0);
        };

        let window = window.unwrap_or_else(|| self.config.window_for(head.date, &self.calendar));
        let interval = window.strictly_after(head.date, &self.calendar);
        let dates = RecurrenceEngine::projected_dates(rule, head.date, interval, &self.calendar);

        let existing: HashSet<NaiveDate> = instances_of(tx, head.workspace_id, head.id)
            .await?
            .into_iter()
            .map(|entry| entry.date)
            .collect();

        let mut created = 0;
        for date in dates {
            if existing.contains(&date) {
                continue;
            }
            if created >= self.config.max_instances {
                debug!(series = %head.id, limit = self.config.max_instances, "materialization limit reached");
                break;
            }
            tx.insert(&Entry::new_instance(head, date)).await?;
            created += 1;
        }

        debug!(series = %head.id, created, "materialized instances");
        Ok(created)
    }
}
