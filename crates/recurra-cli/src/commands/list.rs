use anyhow::Result;
use recurra_core::calendar::DateInterval;
use recurra_core::store::{EntryQuery, RecordStore};

use super::Session;
use crate::cli::ListCommand;
use crate::parser::parse_optional_date;
use crate::views::table::display_entries;

pub async fn list_entries<S: RecordStore>(session: &Session<S>, command: ListCommand) -> Result<()> {
    let calendar = session.coordinator.calendar();
    let today = session.today();

    let interval = if command.week {
        DateInterval::week_containing(today, calendar)
    } else {
        let month = DateInterval::month_containing(today, calendar);
        let start = parse_optional_date(command.from.as_deref(), calendar)?;
        let end = parse_optional_date(command.to.as_deref(), calendar)?;
        DateInterval::new(start.unwrap_or(month.start), end.unwrap_or(month.end))
    };

    let entries = match command.label {
        Some(label) if !interval.is_empty() => {
            let query = EntryQuery::new().within(interval).label_contains(label);
            session.coordinator.store().find_all(session.workspace, &query).await?
        }
        _ => session.coordinator.entries_between(session.workspace, interval).await?,
    };

    if command.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        display_entries(&entries, today);
    }
    Ok(())
}
