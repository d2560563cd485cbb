use anyhow::{anyhow, Result};
use chrono::Weekday;
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use recurra_core::calendar::Calendar;
use recurra_core::models::{MaterializationConfig, WorkspaceId};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

pub const CONFIG_FILE: &str = "recurra.toml";
pub const ENV_PREFIX: &str = "RECURRA_";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub workspace_id: WorkspaceId,
    /// IANA timezone name; detected from the system when unset
    pub timezone: Option<String>,
    pub first_weekday: String,
    pub recurrence: MaterializationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("recurra.db"),
            workspace_id: WorkspaceId::default(),
            timezone: None,
            first_weekday: "mon".to_string(),
            recurrence: MaterializationConfig::default(),
        }
    }
}

impl Config {
    /// `recurra.toml` first, then `RECURRA_*` variables. Nested keys use a
    /// double underscore, e.g. `RECURRA_RECURRENCE__LOOKAHEAD_DAYS`.
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn calendar(&self) -> Result<Calendar> {
        let timezone = match &self.timezone {
            Some(name) => name.clone(),
            None => detect_system_timezone(),
        };
        let first_weekday = Weekday::from_str(&self.first_weekday)
            .map_err(|_| anyhow!("Invalid first_weekday '{}': use a name like 'mon' or 'sunday'", self.first_weekday))?;
        Ok(Calendar::from_timezone_name(&timezone, first_weekday)?)
    }
}

/// Validates that a timezone string is a valid IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, String> {
    Tz::from_str(timezone)
        .map_err(|_| format!("Invalid timezone: '{}'. Use IANA timezone names like 'America/New_York'", timezone))
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use uuid::Uuid;

    #[test]
    fn defaults_apply_without_sources() {
        Jail::expect_with(|_jail| {
            let config = Config::new()?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                database_path = "budget.db"
                timezone = "Europe/Berlin"
                first_weekday = "sun"

                [recurrence]
                lookahead_days = 90
                "#,
            )?;
            jail.set_env("RECURRA_DATABASE_PATH", "override.db");
            jail.set_env("RECURRA_RECURRENCE__MAX_INSTANCES", "12");

            let config = Config::new()?;
            assert_eq!(config.database_path, PathBuf::from("override.db"));
            assert_eq!(config.timezone.as_deref(), Some("Europe/Berlin"));
            assert_eq!(config.recurrence.lookahead_days, 90);
            assert_eq!(config.recurrence.max_instances, 12);

            let calendar = config.calendar().expect("calendar");
            assert_eq!(calendar.first_weekday(), Weekday::Sun);
            assert_eq!(calendar.timezone(), chrono_tz::Europe::Berlin);
            Ok(())
        });
    }

    #[test]
    fn workspace_from_environment() {
        Jail::expect_with(|jail| {
            let id = Uuid::new_v4();
            jail.set_env("RECURRA_WORKSPACE_ID", id.to_string());
            let config = Config::new()?;
            assert_eq!(config.workspace_id, WorkspaceId::new(id));
            Ok(())
        });
    }

    #[test]
    fn invalid_calendar_settings() {
        let config = Config {
            timezone: Some("Mars/Olympus".to_string()),
            ..Config::default()
        };
        assert!(config.calendar().is_err());

        let config = Config {
            timezone: Some("UTC".to_string()),
            first_weekday: "someday".to_string(),
            ..Config::default()
        };
        assert!(config.calendar().is_err());
    }

    #[test]
    fn validate_timezone_names() {
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("Nowhere/Special").is_err());
    }
}
