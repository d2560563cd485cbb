use anyhow::Result;
use chrono::NaiveDate;
use dialoguer::Select;
use owo_colors::OwoColorize;
use recurra_core::coordinator::SeriesCoordinator;
use recurra_core::models::{Entry, MutationScope, WorkspaceId};
use recurra_core::rule::RecurrenceRule;
use recurra_core::store::RecordStore;

use crate::cli::RecurrenceArgs;
use crate::parser::parse_date;
use crate::util::resolve_entry_id;

pub mod add;
pub mod delete;
pub mod edit;
pub mod list;
pub mod preview;
pub mod show;

/// What every command runs against.
pub struct Session<S: RecordStore> {
    pub coordinator: SeriesCoordinator<S>,
    pub workspace: WorkspaceId,
}

impl<S: RecordStore> Session<S> {
    pub fn new(coordinator: SeriesCoordinator<S>, workspace: WorkspaceId) -> Self {
        Self { coordinator, workspace }
    }

    pub fn today(&self) -> NaiveDate {
        self.coordinator.calendar().today()
    }

    pub fn parse_date(&self, input: &str) -> Result<NaiveDate> {
        parse_date(input, self.coordinator.calendar())
    }

    pub async fn resolve(&self, short_id: &str) -> Result<Entry> {
        let id = resolve_entry_id(self.coordinator.store(), self.workspace, short_id).await?;
        Ok(self.coordinator.find(self.workspace, id).await?)
    }
}

/// Rule for `args` anchored on `base`, or `None` when no recurrence was given.
pub fn rule_from_args(
    args: &RecurrenceArgs,
    base: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<Option<RecurrenceRule>> {
    let Some(text) = args.text() else {
        return Ok(None);
    };
    let rule = RecurrenceRule::resolve(text, base, end_date, args.second_day.unwrap_or(0))?;
    Ok(Some(rule))
}

/// Uses the given scope, or asks for one when the entry belongs to a series.
pub fn choose_scope(entry: &Entry, given: Option<MutationScope>, action: &str) -> Result<MutationScope> {
    if let Some(scope) = given {
        return Ok(scope);
    }
    if !entry.is_recurring() && entry.series_id().is_none() {
        return Ok(MutationScope::One);
    }

    let options = [
        format!("This entry only ({})", entry.date.format("%Y-%m-%d")),
        "This and future entries".to_string(),
        "Entire series".to_string(),
    ];
    println!("{}", "This entry is part of a recurring series.".yellow());
    let selection = Select::new()
        .with_prompt(format!("What would you like to {}?", action))
        .items(&options)
        .default(0)
        .interact()?;

    Ok(match selection {
        0 => MutationScope::One,
        1 => MutationScope::Future,
        _ => MutationScope::All,
    })
}
