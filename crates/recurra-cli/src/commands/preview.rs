use anyhow::{bail, Result};
use recurra_core::calendar::DateInterval;
use recurra_core::store::RecordStore;

use super::{rule_from_args, Session};
use crate::cli::PreviewCommand;
use crate::views::table::display_dates;

pub async fn preview_dates<S: RecordStore>(session: &Session<S>, command: PreviewCommand) -> Result<()> {
    let from = session.parse_date(&command.from)?;
    let to = session.parse_date(&command.to)?;
    let Some(rule) = rule_from_args(&command.recurrence, from, None)? else {
        bail!("preview needs --every or --rule");
    };

    println!("Preview of {} from {}", rule, from);
    let dates = session.coordinator.preview(&rule, from, DateInterval::new(from, to));
    display_dates(&dates);
    Ok(())
}
