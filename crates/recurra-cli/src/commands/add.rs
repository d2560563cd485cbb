use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use recurra_core::models::{EntryFields, NewEntryData};
use recurra_core::store::RecordStore;

use super::{rule_from_args, Session};
use crate::cli::AddCommand;
use crate::util::format_amount;

pub async fn add_entry<S: RecordStore>(session: &Session<S>, command: AddCommand) -> Result<()> {
    let date = match command.date.as_deref() {
        Some(input) => session.parse_date(input)?,
        None => session.today(),
    };
    let until = command.until.as_deref().map(|input| session.parse_date(input)).transpose()?;
    let rule = rule_from_args(&command.recurrence, date, until)?;
    if rule.is_none() && until.is_some() {
        anyhow::bail!("--until needs --every or --rule");
    }

    let mut fields = EntryFields::new(command.label, command.amount);
    fields.is_planned = !command.unplanned;
    let data = NewEntryData {
        date,
        fields,
        rule,
        end_date: until,
    };

    let series = session.coordinator.create(session.workspace, data, None).await?;
    let head = &series.head;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    match head.rule() {
        Some(rule) => {
            println!(
                "{} Created recurring entry: {} ({})",
                "✓".style(success_style),
                head.fields.label.bright_white().bold(),
                rule
            );
            println!("  {} ID: {}", "→".style(info_style), head.short_id().yellow());
            println!(
                "  {} {} occurrences scheduled from {}",
                "→".style(info_style),
                series.member_count(),
                head.date
            );
        }
        None => {
            println!(
                "{} Created entry: {} {} on {}",
                "✓".style(success_style),
                head.fields.label.bright_white().bold(),
                format_amount(head.fields.amount),
                head.date
            );
            println!("  {} ID: {}", "→".style(info_style), head.short_id().yellow());
        }
    }

    Ok(())
}
