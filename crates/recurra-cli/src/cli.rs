use clap::{Args, Parser, Subcommand};
use recurra_core::models::MutationScope;

/// Recurra: recurring budget entries with calendar-correct schedules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a one-off or recurring entry
    Add(AddCommand),
    /// List entries in a date range
    List(ListCommand),
    /// Show the whole series an entry belongs to
    Show(ShowCommand),
    /// Edit an entry, its future occurrences or its whole series
    Edit(EditCommand),
    /// Delete an entry, its future occurrences or its whole series
    Delete(DeleteCommand),
    /// Show the dates a recurrence would produce without saving anything
    Preview(PreviewCommand),
}

/// Recurrence given either as a cadence keyword or as rule text.
#[derive(Args, Debug, Clone, Default)]
pub struct RecurrenceArgs {
    /// Cadence keyword: daily, weekly, biweekly, semimonthly, monthly, quarterly, yearly
    #[arg(long, conflicts_with = "rule")]
    pub every: Option<String>,
    /// Rule text such as "FREQ=MONTHLY;BYMONTHDAY=15"
    #[arg(long)]
    pub rule: Option<String>,
    /// Second day of month for semi-monthly cadences
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
    pub second_day: Option<u32>,
}

impl RecurrenceArgs {
    pub fn text(&self) -> Option<&str> {
        self.every.as_deref().or(self.rule.as_deref())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// What the entry is for
    pub label: String,
    /// Signed amount; negative for spending
    #[arg(short, long, allow_hyphen_values = true)]
    pub amount: f64,
    /// Date of the entry or of the first occurrence (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,
    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
    /// Last date the series may occur on
    #[arg(long)]
    pub until: Option<String>,
    /// Mark the entry as not planned
    #[arg(long)]
    pub unplanned: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// First date to include (defaults to the start of this month)
    #[arg(long, conflicts_with = "week")]
    pub from: Option<String>,
    /// Last date to include (defaults to the end of this month)
    #[arg(long, conflicts_with = "week")]
    pub to: Option<String>,
    /// List the current week
    #[arg(long)]
    pub week: bool,
    /// Only entries whose label contains this text
    #[arg(long)]
    pub label: Option<String>,
    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// The ID (or unique prefix) of any entry in the series
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID (or unique prefix) of the entry to edit
    pub id: String,
    /// one, future or all; asked interactively for series members when omitted
    #[arg(short, long)]
    pub scope: Option<MutationScope>,
    #[arg(short, long, allow_hyphen_values = true)]
    pub amount: Option<f64>,
    #[arg(short, long)]
    pub label: Option<String>,
    #[arg(short, long)]
    pub date: Option<String>,
    #[arg(long, conflicts_with = "unplanned")]
    pub planned: bool,
    #[arg(long)]
    pub unplanned: bool,
    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
    /// Stop recurring
    #[arg(long, conflicts_with_all = ["every", "rule", "until"])]
    pub no_recurrence: bool,
    /// New last date of the series
    #[arg(long, conflicts_with = "no_until")]
    pub until: Option<String>,
    /// Let the series run without an end date
    #[arg(long)]
    pub no_until: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID (or unique prefix) of the entry to delete
    pub id: String,
    /// one, future or all; asked interactively for series members when omitted
    #[arg(short, long)]
    pub scope: Option<MutationScope>,
    /// Force deletion without confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
    /// Anchor date and start of the range
    #[arg(long)]
    pub from: String,
    /// End of the range
    #[arg(long)]
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_amounts_and_scopes_parse() {
        let cli = Cli::parse_from(["recurra", "edit", "abcd", "--scope", "future", "--amount", "-42.5"]);
        match cli.command {
            Commands::Edit(edit) => {
                assert_eq!(edit.scope, Some(MutationScope::Future));
                assert_eq!(edit.amount, Some(-42.5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn every_conflicts_with_rule() {
        let result = Cli::try_parse_from([
            "recurra", "add", "Rent", "--amount", "-900", "--every", "monthly", "--rule", "FREQ=DAILY",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn second_day_range_is_checked() {
        let result = Cli::try_parse_from([
            "recurra", "preview", "--every", "semimonthly", "--second-day", "40", "--from", "2024-01-01", "--to",
            "2024-02-01",
        ]);
        assert!(result.is_err());
    }
}
