use confsort::core::settings::value::SettingValue;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected SCOPE.KEY=VALUE (e.g., 'screening.threshold=2.5').")]
    MissingEquals(String),

    #[error("Invalid --set key '{0}'. Expected SCOPE.KEY, where SCOPE is 'general' or a stage name.")]
    MissingScope(String),

    #[error("Component '{component}' cannot be empty in '{input}'.")]
    EmptyComponent {
        component: &'static str,
        input: String,
    },
}

/// One `-S SCOPE.KEY=VALUE` override.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingOverride {
    pub scope: String,
    pub key: String,
    pub value: SettingValue,
}

pub fn parse_override(input: &str) -> Result<SettingOverride, ParseError> {
    let (path, value) = input
        .split_once('=')
        .ok_or_else(|| ParseError::MissingEquals(input.to_string()))?;
    let (scope, key) = path
        .trim()
        .split_once('.')
        .ok_or_else(|| ParseError::MissingScope(path.to_string()))?;

    for (component, text) in [("scope", scope), ("key", key), ("value", value)] {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyComponent {
                component,
                input: input.to_string(),
            });
        }
    }

    Ok(SettingOverride {
        scope: scope.trim().to_string(),
        key: key.trim().to_string(),
        value: SettingValue::parse_literal(value),
    })
}
