use super::error::SettingsError;
use super::schema::SettingSpec;
use super::value::SettingValue;
use std::collections::BTreeMap;
use tracing::debug;

/// A mapping of setting names to values, as supplied by a user or a file.
pub type SettingsMap = BTreeMap<String, SettingValue>;

/// A validated store of named, typed, bounded settings for one scope.
///
/// Every value held by the registry has passed its [`SettingSpec`]; a rejected
/// write leaves the previous value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsRegistry {
    /// The scope name used in error messages (`general` or a stage name).
    scope: String,
    /// Declarations, keyed by setting name.
    specs: BTreeMap<&'static str, SettingSpec>,
    /// Current values; always contains exactly the declared names.
    values: BTreeMap<&'static str, SettingValue>,
}

impl SettingsRegistry {
    /// Creates a registry populated with the declared defaults.
    ///
    /// # Arguments
    ///
    /// * `scope` - The name of the scope, reported in errors.
    /// * `specs` - The setting declarations. A later declaration with the same
    ///   name replaces an earlier one.
    pub fn new(scope: impl Into<String>, specs: impl IntoIterator<Item = SettingSpec>) -> Self {
        let mut spec_map = BTreeMap::new();
        let mut values = BTreeMap::new();
        for spec in specs {
            values.insert(spec.name, spec.default.clone());
            spec_map.insert(spec.name, spec);
        }
        Self {
            scope: scope.into(),
            specs: spec_map,
            values,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn spec(&self, name: &str) -> Option<&SettingSpec> {
        self.specs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.keys().copied()
    }

    /// Returns the current value of a setting.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownSetting`] if `name` is not declared in this scope.
    pub fn get(&self, name: &str) -> Result<&SettingValue, SettingsError> {
        self.values.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Validates and stores a single value.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownSetting`] for undeclared names and
    /// [`SettingsError::InvalidValue`] for a wrong type or an out-of-domain value.
    /// The stored value is unchanged on error.
    pub fn set(&mut self, name: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        let (key, value) = self.validate(name, value.into())?;
        debug!(scope = %self.scope, setting = key, value = %value, "Setting updated.");
        self.values.insert(key, value);
        Ok(())
    }

    /// Applies several values in one step.
    ///
    /// All entries are validated before anything is written, so a single bad
    /// entry rejects the whole update. With `complete = true` every setting not
    /// present in `mapping` is reset to its default; with `complete = false`
    /// only the keys present in `mapping` change.
    pub fn set_many(&mut self, mapping: &SettingsMap, complete: bool) -> Result<(), SettingsError> {
        let staged = mapping
            .iter()
            .map(|(name, value)| self.validate(name, value.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        if complete {
            self.reset();
        }
        for (key, value) in staged {
            self.values.insert(key, value);
        }
        debug!(
            scope = %self.scope,
            updated = mapping.len(),
            complete,
            "Applied settings mapping."
        );
        Ok(())
    }

    /// Resets every setting to its declared default.
    pub fn reset(&mut self) {
        for (name, spec) in &self.specs {
            self.values.insert(*name, spec.default.clone());
        }
    }

    /// Returns the current values as an owned map.
    pub fn to_map(&self) -> SettingsMap {
        self.values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    pub fn float(&self, name: &str) -> Result<f64, SettingsError> {
        let value = self.get(name)?;
        value
            .as_float()
            .ok_or_else(|| self.wrong_read(name, value, "float"))
    }

    pub fn int(&self, name: &str) -> Result<i64, SettingsError> {
        let value = self.get(name)?;
        value
            .as_int()
            .ok_or_else(|| self.wrong_read(name, value, "int"))
    }

    pub fn boolean(&self, name: &str) -> Result<bool, SettingsError> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| self.wrong_read(name, value, "bool"))
    }

    pub fn string(&self, name: &str) -> Result<&str, SettingsError> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| self.wrong_read(name, value, "string"))
    }

    fn validate(
        &self,
        name: &str,
        value: SettingValue,
    ) -> Result<(&'static str, SettingValue), SettingsError> {
        let (key, spec) = self
            .specs
            .get_key_value(name)
            .ok_or_else(|| self.unknown(name))?;
        let stored = spec
            .validate(value.clone())
            .map_err(|reason| SettingsError::InvalidValue {
                scope: self.scope.clone(),
                name: name.to_string(),
                value,
                reason,
            })?;
        Ok((*key, stored))
    }

    fn unknown(&self, name: &str) -> SettingsError {
        SettingsError::UnknownSetting {
            scope: self.scope.clone(),
            name: name.to_string(),
        }
    }

    fn wrong_read(&self, name: &str, value: &SettingValue, wanted: &str) -> SettingsError {
        SettingsError::InvalidValue {
            scope: self.scope.clone(),
            name: name.to_string(),
            value: value.clone(),
            reason: format!("stored as {}, read as {}", value.kind(), wanted),
        }
    }
}
