use super::conformer::Conformer;
use super::error::ModelError;
use super::geometry::Geometry;
use super::ids::ConformerId;
use super::results::{Category, StageRecord};
use crate::core::io::traits::EnsembleFile;
use crate::core::io::xyz::XyzFile;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

/// Why a stage removed a conformer from the active population.
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalReason {
    /// Its relative energy exceeded the stage threshold (both in kcal/mol).
    AboveThreshold { relative_energy: f64, threshold: f64 },
    /// The compute collaborator failed for one of the stage's categories.
    ComputeFailed { category: Category, message: String },
}

/// A conformer that left the active population, with the results it had at that point.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedConformer {
    pub conformer: Conformer,
    pub stage: String,
    pub reason: RemovalReason,
}

/// The new state of one surviving conformer after a stage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SurvivorUpdate {
    pub id: ConformerId,
    pub record: StageRecord,
    pub geometry: Option<Geometry>,
}

/// The complete outcome of a stage, applied to the ensemble in one step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StageCommit {
    pub stage: String,
    /// Survivors in ranked order.
    pub survivors: Vec<SurvivorUpdate>,
    pub removed: Vec<(ConformerId, RemovalReason)>,
}

/// The ordered conformer population of one molecule plus run metadata.
///
/// The ensemble is created once per run and shared by reference with every
/// stage. Stages never mutate it directly; they hand a [`StageCommit`] back,
/// which is validated in full before anything changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    /// Directory that stage outputs and snapshots are written to.
    workdir: PathBuf,
    /// Molecular charge shared by all conformers.
    charge: i32,
    /// Number of unpaired electrons shared by all conformers.
    unpaired: u32,
    /// The active population, in the order left by the last stage.
    conformers: Vec<Conformer>,
    /// Conformers removed by stages, in removal order.
    removed: Vec<RemovedConformer>,
    /// The settings file most recently applied to this run, if any.
    settings_file: Option<PathBuf>,
}

impl Ensemble {
    /// Creates an empty ensemble.
    ///
    /// # Arguments
    ///
    /// * `workdir` - Directory for stage outputs.
    /// * `charge` - Molecular charge.
    /// * `unpaired` - Number of unpaired electrons.
    pub fn new(workdir: impl Into<PathBuf>, charge: i32, unpaired: u32) -> Self {
        Self {
            workdir: workdir.into(),
            charge,
            unpaired,
            conformers: Vec::new(),
            removed: Vec::new(),
            settings_file: None,
        }
    }

    /// Creates an ensemble from geometries, naming them `CONF1`, `CONF2`, ….
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NoConformers`] for an empty input and
    /// [`ModelError::TopologyMismatch`] if the geometries describe different molecules.
    pub fn from_geometries(
        workdir: impl Into<PathBuf>,
        geometries: Vec<Geometry>,
        charge: i32,
        unpaired: u32,
    ) -> Result<Self, ModelError> {
        if geometries.is_empty() {
            return Err(ModelError::NoConformers);
        }
        let mut ensemble = Self::new(workdir, charge, unpaired);
        for (index, geometry) in geometries.into_iter().enumerate() {
            ensemble.add_conformer(ConformerId::from_index(index), geometry)?;
        }
        Ok(ensemble)
    }

    /// Reads a multi-frame XYZ file into a new ensemble.
    ///
    /// # Arguments
    ///
    /// * `workdir` - Directory for stage outputs.
    /// * `path` - The XYZ file holding one frame per conformer.
    /// * `charge` - Molecular charge.
    /// * `unpaired` - Number of unpaired electrons.
    /// * `nconf` - If set, only the first `nconf` frames are used.
    pub fn read_input(
        workdir: impl Into<PathBuf>,
        path: &Path,
        charge: i32,
        unpaired: u32,
        nconf: Option<usize>,
    ) -> Result<Self, ModelError> {
        let mut geometries = XyzFile::read_from_path(path)?;
        if let Some(limit) = nconf {
            geometries.truncate(limit);
        }
        let ensemble = Self::from_geometries(workdir, geometries, charge, unpaired)?;
        info!(
            path = %path.display(),
            conformers = ensemble.len(),
            charge,
            unpaired,
            "Read input ensemble."
        );
        Ok(ensemble)
    }

    /// Adds a conformer with the ensemble's charge and unpaired-electron count.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateConformer`] if the identifier is taken
    /// (by an active or a removed conformer) and [`ModelError::TopologyMismatch`]
    /// if the geometry's element sequence differs from the existing members.
    pub fn add_conformer(
        &mut self,
        id: impl Into<ConformerId>,
        geometry: Geometry,
    ) -> Result<&Conformer, ModelError> {
        let id = id.into();
        if self.find_any(id.as_str()).is_some() {
            return Err(ModelError::DuplicateConformer { id });
        }
        if let Some(reference) = self.reference_geometry() {
            if !reference.same_topology(&geometry) {
                return Err(ModelError::TopologyMismatch {
                    expected: reference.len(),
                    found: geometry.len(),
                    id,
                });
            }
        }
        self.conformers
            .push(Conformer::new(id, self.charge, self.unpaired, geometry));
        Ok(&self.conformers[self.conformers.len() - 1])
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn unpaired(&self) -> u32 {
        self.unpaired
    }

    pub fn settings_file(&self) -> Option<&Path> {
        self.settings_file.as_deref()
    }

    pub(crate) fn set_settings_file(&mut self, path: PathBuf) {
        self.settings_file = Some(path);
    }

    pub fn len(&self) -> usize {
        self.conformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conformers.is_empty()
    }

    /// The active population in its current order.
    pub fn conformers(&self) -> &[Conformer] {
        &self.conformers
    }

    pub fn ids(&self) -> Vec<ConformerId> {
        self.conformers.iter().map(|c| c.id().clone()).collect()
    }

    /// Finds an active conformer by identifier.
    pub fn get(&self, id: &str) -> Option<&Conformer> {
        self.conformers.iter().find(|c| c.id().as_str() == id)
    }

    /// Finds a conformer by identifier among active and removed conformers.
    pub fn find_any(&self, id: &str) -> Option<&Conformer> {
        self.get(id).or_else(|| {
            self.removed
                .iter()
                .map(|r| &r.conformer)
                .find(|c| c.id().as_str() == id)
        })
    }

    /// Conformers removed by stages, oldest first.
    pub fn removed(&self) -> &[RemovedConformer] {
        &self.removed
    }

    fn reference_geometry(&self) -> Option<&Geometry> {
        self.conformers
            .first()
            .or_else(|| self.removed.first().map(|r| &r.conformer))
            .map(|c| c.geometry())
    }

    /// Applies a stage outcome atomically.
    ///
    /// The commit must mention every active conformer exactly once, either as a
    /// survivor or as removed. It is validated completely before the ensemble
    /// is touched, so on error nothing changes.
    pub(crate) fn commit(&mut self, commit: StageCommit) -> Result<(), ModelError> {
        let index: HashMap<&str, usize> = self
            .conformers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id().as_str(), i))
            .collect();

        let mut seen = HashSet::with_capacity(index.len());
        let mentioned = commit
            .survivors
            .iter()
            .map(|s| &s.id)
            .chain(commit.removed.iter().map(|(id, _)| id));
        for id in mentioned {
            if !index.contains_key(id.as_str()) {
                return Err(ModelError::UnknownConformer { id: id.clone() });
            }
            if !seen.insert(id.as_str()) {
                return Err(ModelError::DuplicateConformer { id: id.clone() });
            }
        }
        if let Some(missing) = self
            .conformers
            .iter()
            .find(|c| !seen.contains(c.id().as_str()))
        {
            return Err(ModelError::IncompleteCommit {
                stage: commit.stage,
                id: missing.id().clone(),
            });
        }

        let positions: HashMap<ConformerId, usize> = index
            .into_iter()
            .map(|(id, i)| (ConformerId::new(id), i))
            .collect();
        let mut slots: Vec<Option<Conformer>> = std::mem::take(&mut self.conformers)
            .into_iter()
            .map(Some)
            .collect();

        for update in commit.survivors {
            if let Some(mut conformer) = slots[positions[&update.id]].take() {
                conformer.results_mut().insert(&commit.stage, update.record);
                if let Some(geometry) = update.geometry {
                    conformer.replace_geometry(geometry);
                }
                self.conformers.push(conformer);
            }
        }
        for (id, reason) in commit.removed {
            if let Some(conformer) = slots[positions[&id]].take() {
                self.removed.push(RemovedConformer {
                    conformer,
                    stage: commit.stage.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::geometry::GeometryAtom;
    use crate::core::models::results::Field;
    use nalgebra::Point3;

    fn geometry(x: f64) -> Geometry {
        Geometry::from_atoms(
            vec![
                GeometryAtom::new("C", Point3::new(x, 0.0, 0.0)),
                GeometryAtom::new("O", Point3::new(x + 1.2, 0.0, 0.0)),
            ],
            "",
        )
    }

    fn ensemble(ids: &[&str]) -> Ensemble {
        let mut ensemble = Ensemble::new("/tmp/work", 0, 0);
        for (i, id) in ids.iter().enumerate() {
            ensemble.add_conformer(*id, geometry(i as f64)).unwrap();
        }
        ensemble
    }

    fn survivor(id: &str, energy: f64) -> SurvivorUpdate {
        let mut record = StageRecord::default();
        record
            .properties
            .entry(Category::SinglePoint)
            .or_default()
            .insert(Field::Energy, energy);
        SurvivorUpdate {
            id: ConformerId::new(id),
            record,
            geometry: None,
        }
    }

    #[test]
    fn every_conformer_carries_the_ensemble_charge_and_unpaired_count() {
        for (charge, unpaired) in [(0, 0), (-1, 0), (2, 1), (1, 2)] {
            let ensemble = Ensemble::from_geometries(
                "/tmp",
                vec![geometry(0.0), geometry(1.0), geometry(2.0)],
                charge,
                unpaired,
            )
            .unwrap();
            assert!(ensemble
                .conformers()
                .iter()
                .all(|c| c.charge() == charge && c.unpaired() == unpaired));
        }
    }

    #[test]
    fn from_geometries_names_conformers_in_order() {
        let ensemble =
            Ensemble::from_geometries("/tmp", vec![geometry(0.0), geometry(1.0)], 0, 0).unwrap();
        let ids: Vec<_> = ensemble.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["CONF1", "CONF2"]);
    }

    #[test]
    fn from_geometries_rejects_empty_input() {
        assert!(matches!(
            Ensemble::from_geometries("/tmp", vec![], 0, 0),
            Err(ModelError::NoConformers)
        ));
    }

    #[test]
    fn add_conformer_rejects_duplicate_ids() {
        let mut ensemble = ensemble(&["a"]);
        assert!(matches!(
            ensemble.add_conformer("a", geometry(3.0)),
            Err(ModelError::DuplicateConformer { .. })
        ));
        assert_eq!(ensemble.len(), 1);
    }

    #[test]
    fn add_conformer_rejects_different_topology() {
        let mut ensemble = ensemble(&["a"]);
        let mut other = geometry(0.0);
        other.push(GeometryAtom::new("H", Point3::origin()));
        assert!(matches!(
            ensemble.add_conformer("b", other),
            Err(ModelError::TopologyMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn commit_reorders_survivors_and_moves_removed_to_history() {
        let mut ensemble = ensemble(&["a", "b", "c"]);
        ensemble
            .commit(StageCommit {
                stage: "prescreening".to_string(),
                survivors: vec![survivor("c", -2.0), survivor("a", -1.0)],
                removed: vec![(
                    ConformerId::new("b"),
                    RemovalReason::AboveThreshold {
                        relative_energy: 5.0,
                        threshold: 4.0,
                    },
                )],
            })
            .unwrap();

        let ids: Vec<_> = ensemble.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(ensemble.get("b").is_none());
        assert_eq!(ensemble.removed().len(), 1);
        assert_eq!(ensemble.removed()[0].stage, "prescreening");
        assert!(ensemble.find_any("b").is_some());
        assert_eq!(
            ensemble.get("c").unwrap().results().value(
                "prescreening",
                Category::SinglePoint,
                Field::Energy
            ),
            Some(-2.0)
        );
    }

    #[test]
    fn commit_with_unknown_conformer_changes_nothing() {
        let mut ensemble = ensemble(&["a", "b"]);
        let before = ensemble.clone();
        let result = ensemble.commit(StageCommit {
            stage: "screening".to_string(),
            survivors: vec![survivor("a", -1.0), survivor("z", -1.0)],
            removed: vec![],
        });
        assert!(matches!(result, Err(ModelError::UnknownConformer { .. })));
        assert_eq!(ensemble, before);
    }

    #[test]
    fn commit_listing_a_conformer_twice_is_a_duplicate() {
        let mut ensemble = ensemble(&["a", "b"]);
        let before = ensemble.clone();
        let result = ensemble.commit(StageCommit {
            stage: "screening".to_string(),
            survivors: vec![survivor("a", -1.0), survivor("b", -1.0)],
            removed: vec![(
                ConformerId::new("a"),
                RemovalReason::AboveThreshold {
                    relative_energy: 5.0,
                    threshold: 4.0,
                },
            )],
        });
        assert!(matches!(
            result,
            Err(ModelError::DuplicateConformer { ref id }) if id.as_str() == "a"
        ));
        assert_eq!(ensemble, before);
    }

    #[test]
    fn commit_that_omits_a_conformer_changes_nothing() {
        let mut ensemble = ensemble(&["a", "b"]);
        let before = ensemble.clone();
        let result = ensemble.commit(StageCommit {
            stage: "screening".to_string(),
            survivors: vec![survivor("a", -1.0)],
            removed: vec![],
        });
        assert!(matches!(result, Err(ModelError::IncompleteCommit { .. })));
        assert_eq!(ensemble, before);
    }

    #[test]
    fn commit_replaces_geometry_of_optimized_survivors() {
        let mut ensemble = ensemble(&["a"]);
        let mut update = survivor("a", -1.0);
        update.geometry = Some(geometry(9.0));
        ensemble
            .commit(StageCommit {
                stage: "optimization".to_string(),
                survivors: vec![update],
                removed: vec![],
            })
            .unwrap();
        assert_eq!(
            ensemble.get("a").unwrap().geometry().atoms()[0].position,
            Point3::new(9.0, 0.0, 0.0)
        );
    }
}
