use super::value::{SettingKind, SettingValue};

/// The set of values a setting may take, on top of its [`SettingKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Any value of the declared kind.
    Any,
    /// Inclusive integer range.
    IntRange { min: i64, max: i64 },
    /// Inclusive float range. `max` may be `f64::INFINITY` for open-ended settings.
    FloatRange { min: f64, max: f64 },
    /// One of an enumerated set of strings (case-sensitive).
    OneOf(&'static [&'static str]),
}

/// The declaration of a single named setting.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingSpec {
    pub name: &'static str,
    pub kind: SettingKind,
    pub domain: Domain,
    pub default: SettingValue,
}

impl SettingSpec {
    pub fn boolean(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: SettingKind::Bool,
            domain: Domain::Any,
            default: SettingValue::Bool(default),
        }
    }

    pub fn int(name: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name,
            kind: SettingKind::Int,
            domain: Domain::IntRange { min, max },
            default: SettingValue::Int(default),
        }
    }

    pub fn float(name: &'static str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name,
            kind: SettingKind::Float,
            domain: Domain::FloatRange { min, max },
            default: SettingValue::Float(default),
        }
    }

    pub fn string(name: &'static str, default: &str) -> Self {
        Self {
            name,
            kind: SettingKind::Str,
            domain: Domain::Any,
            default: SettingValue::Str(default.to_string()),
        }
    }

    pub fn choice(name: &'static str, default: &str, choices: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: SettingKind::Str,
            domain: Domain::OneOf(choices),
            default: SettingValue::Str(default.to_string()),
        }
    }

    /// Checks `value` against the declared kind and domain.
    ///
    /// On success, returns the value in its stored form (integers written to a
    /// float setting are widened). On failure, returns a human-readable reason.
    pub fn validate(&self, value: SettingValue) -> Result<SettingValue, String> {
        let value = match (self.kind, value) {
            (SettingKind::Float, SettingValue::Int(i)) => SettingValue::Float(i as f64),
            (kind, value) if value.kind() == kind => value,
            (kind, value) => {
                return Err(format!("expected a {} value, got {}", kind, value.kind()));
            }
        };

        match (&self.domain, &value) {
            (Domain::Any, _) => Ok(value),
            (Domain::IntRange { min, max }, SettingValue::Int(i)) => {
                if i < min || i > max {
                    Err(format!("{} is outside the allowed range [{}, {}]", i, min, max))
                } else {
                    Ok(value)
                }
            }
            (Domain::FloatRange { min, max }, SettingValue::Float(x)) => {
                if x.is_nan() {
                    Err("NaN is not an allowed value".to_string())
                } else if x < min || x > max {
                    Err(format!("{} is outside the allowed range [{}, {}]", x, min, max))
                } else {
                    Ok(value)
                }
            }
            (Domain::OneOf(choices), SettingValue::Str(s)) => {
                if choices.contains(&s.as_str()) {
                    Ok(value)
                } else {
                    Err(format!(
                        "\"{}\" is not one of the allowed values: {}",
                        s,
                        choices.join(", ")
                    ))
                }
            }
            (domain, value) => Err(format!(
                "domain {:?} cannot hold a {} value",
                domain,
                value.kind()
            )),
        }
    }
}
