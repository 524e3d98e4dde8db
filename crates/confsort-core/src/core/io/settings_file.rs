use crate::core::io::traits::EnsembleFile;
use crate::core::settings::catalog::GENERAL_SCOPE;
use crate::core::settings::registry::SettingsMap;
use crate::core::settings::value::SettingValue;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Top-level key '{0}' must be a table named after a stage or 'general'")]
    NotATable(String),
    #[error("Setting '{key}' in section '{section}' must be a boolean, integer, float or string")]
    UnsupportedValue { section: String, key: String },
}

/// Settings overrides loaded from a TOML file.
///
/// The `[general]` table holds general settings; every other table is named
/// after a stage and holds that stage's local settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsDocument {
    pub general: SettingsMap,
    pub stages: BTreeMap<String, SettingsMap>,
}

impl SettingsDocument {
    pub fn stage(&self, name: &str) -> Option<&SettingsMap> {
        self.stages.get(name)
    }
}

pub struct SettingsFile;

fn to_setting(section: &str, key: &str, value: toml::Value) -> Result<SettingValue, SettingsFileError> {
    match value {
        toml::Value::Boolean(b) => Ok(SettingValue::Bool(b)),
        toml::Value::Integer(i) => Ok(SettingValue::Int(i)),
        toml::Value::Float(x) => Ok(SettingValue::Float(x)),
        toml::Value::String(s) => Ok(SettingValue::Str(s)),
        _ => Err(SettingsFileError::UnsupportedValue {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn to_toml(value: &SettingValue) -> toml::Value {
    match value {
        SettingValue::Bool(b) => toml::Value::Boolean(*b),
        SettingValue::Int(i) => toml::Value::Integer(*i),
        SettingValue::Float(x) => toml::Value::Float(*x),
        SettingValue::Str(s) => toml::Value::String(s.clone()),
    }
}

fn section_table(map: &SettingsMap) -> toml::Table {
    map.iter()
        .map(|(key, value)| (key.clone(), to_toml(value)))
        .collect()
}

impl EnsembleFile for SettingsFile {
    type Content = SettingsDocument;
    type Error = SettingsFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Content, Self::Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let root: toml::Table = toml::from_str(&text)?;

        let mut document = SettingsDocument::default();
        for (section, entry) in root {
            let toml::Value::Table(table) = entry else {
                return Err(SettingsFileError::NotATable(section));
            };
            let mut values = SettingsMap::new();
            for (key, value) in table {
                let setting = to_setting(&section, &key, value)?;
                values.insert(key, setting);
            }
            if section == GENERAL_SCOPE {
                document.general = values;
            } else {
                document.stages.insert(section, values);
            }
        }
        Ok(document)
    }

    fn write_to(content: &Self::Content, writer: &mut impl Write) -> Result<(), Self::Error> {
        let mut root = toml::Table::new();
        root.insert(
            GENERAL_SCOPE.to_string(),
            toml::Value::Table(section_table(&content.general)),
        );
        for (stage, values) in &content.stages {
            root.insert(stage.clone(), toml::Value::Table(section_table(values)));
        }
        writer.write_all(toml::to_string(&root)?.as_bytes())?;
        Ok(())
    }
}
