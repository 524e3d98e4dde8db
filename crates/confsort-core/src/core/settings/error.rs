use super::value::SettingValue;
use thiserror::Error;

/// Errors raised at the settings registry boundary.
///
/// Every variant names the scope (a stage name, or `general`) and the setting
/// that triggered it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Unknown setting '{name}' in scope '{scope}'")]
    UnknownSetting { scope: String, name: String },

    #[error("Invalid value {value} for setting '{name}' in scope '{scope}': {reason}")]
    InvalidValue {
        scope: String,
        name: String,
        value: SettingValue,
        reason: String,
    },

    #[error("Setting '{name}' in scope '{scope}' cannot be changed while a stage is running")]
    Locked { scope: String, name: String },
}
