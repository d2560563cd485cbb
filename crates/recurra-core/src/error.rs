use thiserror::Error;

use crate::rule::RuleFormatError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    RuleFormat(#[from] RuleFormatError),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Inconsistent series: {0}")]
    InconsistentSeries(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
