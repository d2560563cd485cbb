use anyhow::Result;
use recurra_core::store::RecordStore;

use super::Session;
use crate::cli::ShowCommand;
use crate::views::table::display_series;

pub async fn show_series<S: RecordStore>(session: &Session<S>, command: ShowCommand) -> Result<()> {
    let entry = session.resolve(&command.id).await?;
    let series = session.coordinator.series(session.workspace, entry.id).await?;
    display_series(&series, session.today());
    Ok(())
}
