use anyhow::{bail, Result};
use owo_colors::OwoColorize;
use recurra_core::models::{MutationScope, UpdateEntryData};
use recurra_core::store::RecordStore;

use super::{choose_scope, rule_from_args, Session};
use crate::cli::EditCommand;

pub async fn edit_entry<S: RecordStore>(session: &Session<S>, command: EditCommand) -> Result<()> {
    let entry = session.resolve(&command.id).await?;

    let date = command.date.as_deref().map(|input| session.parse_date(input)).transpose()?;
    let is_planned = match (command.planned, command.unplanned) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let end_date = if command.no_until {
        Some(None)
    } else {
        command
            .until
            .as_deref()
            .map(|input| session.parse_date(input))
            .transpose()?
            .map(Some)
    };

    let has_recurrence = command.no_recurrence || command.recurrence.text().is_some();
    if date.is_none()
        && command.amount.is_none()
        && command.label.is_none()
        && is_planned.is_none()
        && end_date.is_none()
        && !has_recurrence
    {
        bail!("Nothing to change: pass at least one field to edit");
    }

    let scope = choose_scope(&entry, command.scope, "edit")?;

    let rule = if command.no_recurrence {
        Some(None)
    } else if command.recurrence.text().is_some() {
        // Keyword cadences take their weekday or day of month from the
        // date the rewritten head will have.
        let anchor = match (date, scope) {
            (Some(date), _) => date,
            (None, MutationScope::All) => session.coordinator.series(session.workspace, entry.id).await?.head.date,
            (None, _) => entry.date,
        };
        Some(rule_from_args(&command.recurrence, anchor, None)?)
    } else {
        None
    };

    let data = UpdateEntryData {
        date,
        amount: command.amount,
        label: command.label,
        is_planned,
        rule,
        end_date,
    };

    let updated = session
        .coordinator
        .update(session.workspace, entry.id, scope, data)
        .await?;

    match scope {
        MutationScope::One => println!("Updated entry {}", updated.short_id().yellow()),
        MutationScope::Future => println!(
            "Updated this and future entries (new series head {})",
            updated.short_id().yellow()
        ),
        MutationScope::All => println!("Updated entire series (head {})", updated.short_id().yellow()),
    }
    if let Some(rule) = updated.rule() {
        println!("  Recurs {}", rule);
    }

    Ok(())
}
