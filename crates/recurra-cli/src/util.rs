use anyhow::{anyhow, Result};
use recurra_core::error::CoreError;
use recurra_core::models::WorkspaceId;
use recurra_core::store::{EntryQuery, RecordStore};
use uuid::Uuid;

const MIN_PREFIX_LEN: usize = 2;

/// Resolves a full id or a unique id prefix to an entry id.
pub async fn resolve_entry_id(store: &impl RecordStore, workspace: WorkspaceId, short_id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(short_id) {
        return Ok(id);
    }
    if short_id.len() < MIN_PREFIX_LEN {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }

    let entries = store
        .find_all(workspace, &EntryQuery::new().id_starting_with(short_id))
        .await?;
    match entries.as_slice() {
        [entry] => Ok(entry.id),
        [] => Err(anyhow!(CoreError::NotFound(format!(
            "No entry found with ID prefix '{}'",
            short_id
        )))),
        matches => {
            let candidates = matches
                .iter()
                .map(|entry| format!("{} ({} on {})", entry.short_id(), entry.fields.label, entry.date))
                .collect::<Vec<_>>()
                .join(", ");
            Err(anyhow!(CoreError::InvalidInput(format!(
                "Ambiguous ID '{}' matches: {}",
                short_id, candidates
            ))))
        }
    }
}

/// Signed amount with two decimals.
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}
