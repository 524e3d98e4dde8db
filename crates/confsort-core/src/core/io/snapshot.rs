use crate::core::io::traits::EnsembleFile;
use crate::core::models::ids::ConformerId;
use crate::core::models::results::{Category, StageRecord};
use crate::core::settings::registry::SettingsMap;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The settings a stage run read, split by scope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotSettings {
    pub stage: SettingsMap,
    pub general: SettingsMap,
}

/// A conformer that passed the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivorEntry {
    pub id: ConformerId,
    pub pass: bool,
    #[serde(flatten)]
    pub record: StageRecord,
}

/// A conformer the stage computed successfully but removed by its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub id: ConformerId,
    pub gtot: f64,
    pub relative_energy: f64,
    pub threshold: f64,
}

/// A conformer whose compute call failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub id: ConformerId,
    pub category: Category,
    pub message: String,
}

/// Durable record of one stage run, written as pretty-printed JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub stage: String,
    pub elapsed_seconds: f64,
    pub settings: SnapshotSettings,
    /// Survivors in ranked order.
    pub conformers: Vec<SurvivorEntry>,
    #[serde(default)]
    pub rejected: Vec<RejectedEntry>,
    #[serde(default)]
    pub failures: Vec<FailureEntry>,
}

impl StageSnapshot {
    pub fn survivor(&self, id: &str) -> Option<&SurvivorEntry> {
        self.conformers.iter().find(|entry| entry.id.as_str() == id)
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        SnapshotFile::read_from_path(path)
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        SnapshotFile::write_to_path(self, path)
    }
}

pub struct SnapshotFile;

impl EnsembleFile for SnapshotFile {
    type Content = StageSnapshot;
    type Error = SnapshotError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Content, Self::Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    fn write_to(content: &Self::Content, writer: &mut impl Write) -> Result<(), Self::Error> {
        serde_json::to_writer_pretty(&mut *writer, content)?;
        writeln!(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::results::Field;
    use crate::core::settings::value::SettingValue;

    fn snapshot() -> StageSnapshot {
        let mut record = StageRecord {
            gtot: -76.4,
            rank: 1,
            boltzmann_weight: 1.0,
            ..StageRecord::default()
        };
        record
            .properties
            .entry(Category::SinglePoint)
            .or_default()
            .insert(Field::Energy, -76.4);

        let mut settings = SnapshotSettings::default();
        settings
            .stage
            .insert("threshold".to_string(), SettingValue::Float(4.0));
        settings
            .general
            .insert("solvent".to_string(), SettingValue::from("h2o"));

        StageSnapshot {
            stage: "prescreening".to_string(),
            elapsed_seconds: 0.25,
            settings,
            conformers: vec![SurvivorEntry {
                id: ConformerId::new("CONF1"),
                pass: true,
                record,
            }],
            rejected: vec![RejectedEntry {
                id: ConformerId::new("CONF2"),
                gtot: -76.3,
                relative_energy: 62.7,
                threshold: 4.0,
            }],
            failures: vec![FailureEntry {
                id: ConformerId::new("CONF3"),
                category: Category::Solvation,
                message: "SCF did not converge".to_string(),
            }],
        }
    }

    #[test]
    fn survivor_fields_are_flattened_into_the_entry() {
        let mut buffer = Vec::new();
        SnapshotFile::write_to(&snapshot(), &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        let entry = &value["conformers"][0];
        assert_eq!(entry["id"], "CONF1");
        assert_eq!(entry["pass"], true);
        assert_eq!(entry["rank"], 1);
        assert_eq!(entry["properties"]["sp"]["energy"], -76.4);
        assert_eq!(value["failures"][0]["category"], "gsolv");
        assert_eq!(value["settings"]["general"]["solvent"], "h2o");
    }

    #[test]
    fn snapshot_file_reads_back_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prescreening.json");
        let original = snapshot();
        original.write_to_path(&path).unwrap();

        let reread = StageSnapshot::read_from_path(&path).unwrap();
        assert_eq!(reread, original);
        assert!(reread.survivor("CONF1").is_some());
        assert!(reread.survivor("CONF2").is_none());
    }

    #[test]
    fn infinite_threshold_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prescreening.json");
        let mut original = snapshot();
        original
            .settings
            .stage
            .insert("threshold".to_string(), SettingValue::Float(f64::INFINITY));
        original.rejected.clear();
        original.write_to_path(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""threshold": "inf""#));
        let reread = StageSnapshot::read_from_path(&path).unwrap();
        assert_eq!(
            reread.settings.stage["threshold"],
            SettingValue::Float(f64::INFINITY)
        );
        assert_eq!(reread, original);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = SnapshotFile::read_from(&mut "{ not json".as_bytes()).unwrap_err();
        assert!(matches!(err, SnapshotError::Json(_)));
    }
}
