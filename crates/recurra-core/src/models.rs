use crate::calendar::{Calendar, DateInterval};
use crate::rule::RecurrenceRule;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Tenant every entry belongs to. Every store call is scoped to one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub Uuid);

impl WorkspaceId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WorkspaceId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Role of an entry within its series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// Defines a series when `rule` is set, otherwise a one-off entry.
    Head { rule: Option<RecurrenceRule> },
    /// Materialized occurrence of the series headed by `series_id`.
    Instance { series_id: Uuid },
}

/// Business fields the engine copies and overrides but never interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFields {
    pub amount: f64,
    pub label: String,
    pub is_planned: bool,
}

impl EntryFields {
    pub fn new(label: impl Into<String>, amount: f64) -> Self {
        Self {
            amount,
            label: label.into(),
            is_planned: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub workspace_id: WorkspaceId,
    #[serde(flatten)]
    pub kind: EntryKind,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub fields: EntryFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn new_head(
        workspace_id: WorkspaceId,
        date: NaiveDate,
        fields: EntryFields,
        rule: Option<RecurrenceRule>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            kind: EntryKind::Head { rule },
            date,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fresh instance of `head`'s series on `date`, carrying the head's fields.
    pub fn new_instance(head: &Entry, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id: head.workspace_id,
            kind: EntryKind::Instance { series_id: head.id },
            date,
            fields: head.fields.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_head(&self) -> bool {
        matches!(self.kind, EntryKind::Head { .. })
    }

    pub fn series_id(&self) -> Option<Uuid> {
        match self.kind {
            EntryKind::Instance { series_id } => Some(series_id),
            EntryKind::Head { .. } => None,
        }
    }

    /// Id of the head of the series this entry belongs to (its own id for a head).
    pub fn head_id(&self) -> Uuid {
        self.series_id().unwrap_or(self.id)
    }

    pub fn rule(&self) -> Option<&RecurrenceRule> {
        match &self.kind {
            EntryKind::Head { rule } => rule.as_ref(),
            EntryKind::Instance { .. } => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.rule().is_some()
    }

    pub fn recurrence_end_date(&self) -> Option<NaiveDate> {
        self.rule().and_then(RecurrenceRule::end_date)
    }

    /// Turns the entry into a head carrying `rule`.
    pub fn make_head(&mut self, rule: Option<RecurrenceRule>) {
        self.kind = EntryKind::Head { rule };
    }

    /// Moves an instance to the series headed by `series_id`.
    pub fn reparent(&mut self, series_id: Uuid) {
        self.kind = EntryKind::Instance { series_id };
    }

    /// Rebounds the head's rule at `end_date`. No-op for one-offs and instances.
    pub fn set_recurrence_end(&mut self, end_date: Option<NaiveDate>) {
        if let EntryKind::Head { rule: Some(rule) } = &mut self.kind {
            *rule = rule.with_end_date(end_date);
        }
    }

    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntryData {
    pub date: NaiveDate,
    pub fields: EntryFields,
    pub rule: Option<RecurrenceRule>,
    /// Overrides the end date carried by `rule`.
    pub end_date: Option<NaiveDate>,
}

impl NewEntryData {
    pub fn one_off(date: NaiveDate, fields: EntryFields) -> Self {
        Self {
            date,
            fields,
            rule: None,
            end_date: None,
        }
    }

    pub fn recurring(date: NaiveDate, fields: EntryFields, rule: RecurrenceRule) -> Self {
        Self {
            date,
            fields,
            rule: Some(rule),
            end_date: None,
        }
    }

    /// The rule as it should be stored on the head.
    pub fn effective_rule(&self) -> Option<RecurrenceRule> {
        self.rule.map(|rule| match self.end_date {
            Some(end) => rule.with_end_date(Some(end)),
            None => rule,
        })
    }
}

/// Partial update. `Some(None)` clears an optional value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateEntryData {
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub label: Option<String>,
    pub is_planned: Option<bool>,
    pub rule: Option<Option<RecurrenceRule>>,
    pub end_date: Option<Option<NaiveDate>>,
}

impl UpdateEntryData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the update changes the recurrence rule or its end date.
    pub fn touches_recurrence(&self) -> bool {
        self.rule.is_some() || self.end_date.is_some()
    }

    /// Applies date and business fields; recurrence changes are left to the caller.
    pub fn apply_fields(&self, entry: &mut Entry) {
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(amount) = self.amount {
            entry.fields.amount = amount;
        }
        if let Some(label) = &self.label {
            entry.fields.label = label.clone();
        }
        if let Some(is_planned) = self.is_planned {
            entry.fields.is_planned = is_planned;
        }
    }

    /// The rule a head ends up with after this update, starting from `current`.
    pub fn resolve_rule(&self, current: Option<RecurrenceRule>) -> Option<RecurrenceRule> {
        let rule = match self.rule {
            Some(rule) => rule,
            None => current,
        };
        match self.end_date {
            Some(end) => rule.map(|r| r.with_end_date(end)),
            None => rule,
        }
    }
}

/// Blast radius of an update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationScope {
    /// Only the selected entry
    One,
    /// The selected entry and everything after it in its series
    Future,
    /// The whole series
    All,
}

impl fmt::Display for MutationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationScope::One => write!(f, "one"),
            MutationScope::Future => write!(f, "future"),
            MutationScope::All => write!(f, "all"),
        }
    }
}

impl FromStr for MutationScope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "one" | "this" | "occurrence" => Ok(MutationScope::One),
            "future" | "this_and_future" => Ok(MutationScope::Future),
            "all" | "series" | "entire" => Ok(MutationScope::All),
            _ => Err(ParseScopeError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid mutation scope: {0}")]
pub struct ParseScopeError(String);

/// What a delete operation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub removed: usize,
    /// Instance promoted to head when a head was deleted on its own.
    pub promoted: Option<Uuid>,
    /// Head whose recurrence end was pulled in.
    pub truncated_head: Option<Uuid>,
}

/// A head together with its materialized instances, ordered by date.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesView {
    pub head: Entry,
    pub instances: Vec<Entry>,
}

impl SeriesView {
    /// Head plus instances.
    pub fn member_count(&self) -> usize {
        1 + self.instances.len()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        std::iter::once(self.head.date)
            .chain(self.instances.iter().map(|entry| entry.date))
            .collect()
    }
}

/// Configuration for materialization behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializationConfig {
    /// Horizon in days past the head's date when the rule has no end date
    pub lookahead_days: u32,
    /// Upper bound on instances written by one materialization pass
    pub max_instances: usize,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            lookahead_days: 365,
            max_instances: 1000,
        }
    }
}

impl MaterializationConfig {
    /// `[base, base + lookahead_days]`.
    pub fn window_for(&self, base: NaiveDate, calendar: &Calendar) -> DateInterval {
        let end = calendar
            .add_days(base, i64::from(self.lookahead_days))
            .unwrap_or(NaiveDate::MAX);
        DateInterval::new(base, end)
    }
}
