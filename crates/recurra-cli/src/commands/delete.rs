use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use recurra_core::models::MutationScope;
use recurra_core::store::RecordStore;

use super::{choose_scope, Session};
use crate::cli::DeleteCommand;

pub async fn delete_entry<S: RecordStore>(session: &Session<S>, command: DeleteCommand) -> Result<()> {
    let entry = session.resolve(&command.id).await?;
    let scope = choose_scope(&entry, command.scope, "delete")?;

    if !command.force {
        let target = match scope {
            MutationScope::One => format!("entry '{}' on {}", entry.fields.label, entry.date),
            MutationScope::Future => format!("'{}' on {} and every later occurrence", entry.fields.label, entry.date),
            MutationScope::All => format!("the whole '{}' series", entry.fields.label),
        };
        let confirmation = Confirm::new()
            .with_prompt(format!("Are you sure you want to delete {}?", target))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let summary = session
        .coordinator
        .delete(session.workspace, entry.id, scope)
        .await?;

    println!("Deleted {} entries.", summary.removed);
    if let Some(promoted) = summary.promoted {
        println!(
            "  Series continues from {}",
            (&promoted.to_string()[..8]).yellow()
        );
    }
    if summary.truncated_head.is_some() {
        println!("  Series now ends before {}", entry.date);
    }
    Ok(())
}
