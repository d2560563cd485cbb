//! # Recurra Core Library
//!
//! Calendar-correct recurrence projection and scoped series mutation for dated
//! financial entries such as paychecks and recurring bills.
//!
//! ## Features
//!
//! - **Closed Rule Set**: daily, weekly, bi-weekly, semi-monthly, monthly,
//!   quarterly and yearly cadences with a lossless canonical text encoding
//! - **Clamping Projection**: month-end and leap-day anchors never drift
//! - **Scoped Mutation**: update or delete one entry, this and future, or the
//!   whole series while heads and instances stay consistent
//! - **Pluggable Storage**: the coordinator talks to a [`store::RecordStore`];
//!   a SQLite implementation ships with the crate
//!
//! ## Core Modules
//!
//! - [`calendar`]: Date arithmetic, timezones and bounded intervals
//! - [`rule`]: Recurrence rules and their canonical encoding
//! - [`engine`]: Pure occurrence projection
//! - [`coordinator`]: Series lifecycle under one transaction per operation
//! - [`store`]: Record store traits and the SQLite implementation
//! - [`db`]: Database connection and migration management
//! - [`models`]: Entries, scopes and transfer objects
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use recurra_core::{
//!     calendar::Calendar,
//!     coordinator::SeriesCoordinator,
//!     db,
//!     models::{EntryFields, MaterializationConfig, NewEntryData, WorkspaceId},
//!     rule::RecurrenceRule,
//!     store::SqliteStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("budget.db").await?;
//!     let coordinator = SeriesCoordinator::new(
//!         SqliteStore::new(pool),
//!         Calendar::utc(),
//!         MaterializationConfig::default(),
//!     );
//!
//!     let payday = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//!     let data = NewEntryData::recurring(
//!         payday,
//!         EntryFields::new("Salary", 3200.0),
//!         RecurrenceRule::Monthly { end_date: None },
//!     );
//!
//!     let series = coordinator.create(WorkspaceId::default(), data, None).await?;
//!     println!("Created {} paydays", series.member_count());
//!
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod coordinator;
pub mod db;
pub mod engine;
pub mod error;
pub mod locks;
pub mod models;
pub mod rule;
pub mod store;
