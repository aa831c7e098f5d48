use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::UsersyncError;

pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "USERSYNC";
pub const ENVIRONMENT_VARIABLE_SEPARATOR: &str = "__";

const DEFAULT_SETTINGS_TOML: &str = include_str!("../../../usersync.toml");

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Logging {
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Consent {
    /// Default for the resolver's force-poll flag.
    #[serde(default)]
    pub always_poll_amp: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub logging: Logging,
    #[serde(default)]
    #[validate(nested)]
    pub consent: Consent,
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    level
        .parse::<LevelFilter>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_log_level"))
}

impl Settings {
    /// Loads the embedded default settings plus environment overrides.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_toml`].
    pub fn new() -> Result<Self, Report<UsersyncError>> {
        Self::from_toml(DEFAULT_SETTINGS_TOML)
    }

    /// Parses and validates settings from TOML, applying `USERSYNC__*`
    /// environment overrides on top.
    ///
    /// # Errors
    ///
    /// Returns [`UsersyncError::Configuration`] when the TOML is malformed,
    /// a required field is missing or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<UsersyncError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_VARIABLE_PREFIX)
            .separator(ENVIRONMENT_VARIABLE_SEPARATOR);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(UsersyncError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(UsersyncError::Configuration {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings
            .validate()
            .change_context(UsersyncError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        Ok(settings)
    }

    /// Configured log level; falls back to `Info` if the value does not parse.
    pub fn log_level(&self) -> LevelFilter {
        self.logging.level.parse().unwrap_or(LevelFilter::Info)
    }
}
