use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of calculation a property came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Single-point electronic energy.
    #[serde(rename = "sp")]
    SinglePoint,
    /// Solvation free energy contribution.
    #[serde(rename = "gsolv")]
    Solvation,
    /// Rigid-rotor/harmonic-oscillator thermal contribution.
    #[serde(rename = "rrho")]
    Rrho,
    /// Geometry optimization; its energy is the final energy of the optimized geometry.
    #[serde(rename = "opt")]
    Optimization,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::SinglePoint,
        Category::Solvation,
        Category::Rrho,
        Category::Optimization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SinglePoint => "sp",
            Category::Solvation => "gsolv",
            Category::Rrho => "rrho",
            Category::Optimization => "opt",
        }
    }

    /// The field that contributes this category's share of a stage's total free energy.
    pub fn target_field(&self) -> Field {
        match self {
            Category::SinglePoint | Category::Optimization => Field::Energy,
            Category::Solvation => Field::Gsolv,
            Category::Rrho => Field::Grrho,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named numeric field inside a property category. All energies are in Hartree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Energy,
    Gsolv,
    Grrho,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Energy, Field::Gsolv, Field::Grrho];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Energy => "energy",
            Field::Gsolv => "gsolv",
            Field::Grrho => "grrho",
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type PropertyFields = BTreeMap<Field, f64>;

/// Everything one stage recorded for one surviving conformer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageRecord {
    /// Raw fields returned by the compute collaborator, per category.
    pub properties: BTreeMap<Category, PropertyFields>,
    /// Sum of the target field of every category the stage computed (Hartree).
    pub gtot: f64,
    /// `gtot` relative to the stage's population minimum (kcal/mol).
    pub relative_energy: f64,
    /// Boltzmann population among the survivors at the configured temperature.
    pub boltzmann_weight: f64,
    /// 1-based position in the stage's ranking.
    pub rank: usize,
}

impl StageRecord {
    pub fn value(&self, category: Category, field: Field) -> Option<f64> {
        self.properties
            .get(&category)
            .and_then(|fields| fields.get(&field))
            .copied()
    }

    pub fn fields(&self, category: Category) -> Option<&PropertyFields> {
        self.properties.get(&category)
    }
}

/// Per-stage results of one conformer, keyed by stage name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConformerResults {
    stages: BTreeMap<String, StageRecord>,
}

impl ConformerResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, stage: &str) -> Option<&StageRecord> {
        self.stages.get(stage)
    }

    /// Looks up `stage → category → field`.
    pub fn value(&self, stage: &str, category: Category, field: Field) -> Option<f64> {
        self.stage(stage)
            .and_then(|record| record.value(category, field))
    }

    pub fn stages(&self) -> impl Iterator<Item = (&str, &StageRecord)> {
        self.stages.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stores a stage's record, returning the record it replaced, if any.
    pub(crate) fn insert(&mut self, stage: &str, record: StageRecord) -> Option<StageRecord> {
        self.stages.insert(stage.to_string(), record)
    }
}
