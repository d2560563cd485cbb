use chrono::NaiveDate;
use chrono_humanize::{Accuracy, HumanTime, Tense};
use comfy_table::{Attribute, Cell, Color, Row, Table};
use recurra_core::models::{Entry, SeriesView};

use crate::util::format_amount;

pub fn display_entries(entries: &[Entry], today: NaiveDate) {
    if entries.is_empty() {
        println!("No entries found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Label", "Amount", "Planned", "Series"]);
    for entry in entries {
        table.add_row(entry_row(entry, today));
    }
    println!("{table}");

    let total: f64 = entries.iter().map(|entry| entry.fields.amount).sum();
    println!("{} entries, net {}", entries.len(), format_amount(total));
}

pub fn display_series(series: &SeriesView, today: NaiveDate) {
    let head = &series.head;
    match head.rule() {
        Some(rule) => println!("Series {} ({})", head.short_id(), rule),
        None => println!("Entry {} (does not recur)", head.short_id()),
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Label", "Amount", "Planned", "Series"]);
    table.add_row(entry_row(head, today));
    for instance in &series.instances {
        table.add_row(entry_row(instance, today));
    }
    println!("{table}");
}

pub fn display_dates(dates: &[NaiveDate]) {
    if dates.is_empty() {
        println!("No occurrences in range.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Weekday"]);
    for (index, date) in dates.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(index + 1));
        row.add_cell(Cell::new(date.format("%Y-%m-%d")));
        row.add_cell(Cell::new(date.format("%A")));
        table.add_row(row);
    }
    println!("{table}");
    println!("{} occurrences", dates.len());
}

fn entry_row(entry: &Entry, today: NaiveDate) -> Row {
    let mut row = Row::new();
    row.add_cell(Cell::new(entry.short_id()));

    let date_text = format!("{} ({})", entry.date.format("%Y-%m-%d"), relative_day(entry.date, today));
    let date_cell = if entry.date == today {
        Cell::new(date_text).fg(Color::Yellow)
    } else {
        Cell::new(date_text)
    };
    row.add_cell(date_cell);

    let mut label_cell = Cell::new(&entry.fields.label);
    if !entry.fields.is_planned {
        label_cell = label_cell.add_attribute(Attribute::Italic).fg(Color::DarkGrey);
    }
    row.add_cell(label_cell);

    let amount_cell = Cell::new(format_amount(entry.fields.amount));
    row.add_cell(if entry.fields.amount < 0.0 {
        amount_cell.fg(Color::Red)
    } else {
        amount_cell.fg(Color::Green)
    });

    row.add_cell(Cell::new(if entry.fields.is_planned { "yes" } else { "no" }));

    let series_text = match (entry.series_id(), entry.rule()) {
        (Some(series_id), _) => format!("↳ {}", &series_id.to_string()[..8]),
        (None, Some(rule)) => format!("↻ {}", rule.keyword()),
        (None, None) => String::new(),
    };
    row.add_cell(Cell::new(series_text));
    row
}

fn relative_day(date: NaiveDate, today: NaiveDate) -> String {
    let days = date.signed_duration_since(today);
    if days.num_days() == 0 {
        return "today".to_string();
    }
    let tense = if days.num_days() > 0 { Tense::Future } else { Tense::Past };
    HumanTime::from(days).to_text_en(Accuracy::Rough, tense)
}
