use super::catalog;
use super::error::SettingsError;
use super::registry::{SettingsMap, SettingsRegistry};
use super::value::SettingValue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

#[derive(Debug)]
struct SharedStore {
    registry: RwLock<SettingsRegistry>,
    active_runs: AtomicUsize,
}

/// Handle to the single, shared store of general settings.
///
/// Cloning the handle shares the store: a value written through one stage's
/// handle is visible to every other stage holding a clone. Writes are rejected
/// with [`SettingsError::Locked`] while any stage run holds a [`RunLock`].
#[derive(Debug, Clone)]
pub struct GeneralSettings {
    inner: Arc<SharedStore>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralSettings {
    /// Creates a store holding the default general settings.
    pub fn new() -> Self {
        Self::with_registry(catalog::general_registry())
    }

    pub fn with_registry(registry: SettingsRegistry) -> Self {
        Self {
            inner: Arc::new(SharedStore {
                registry: RwLock::new(registry),
                active_runs: AtomicUsize::new(0),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Result<SettingValue, SettingsError> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains(name)
    }

    pub fn set(&self, name: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        self.write_with(name, |registry| registry.set(name, value))
    }

    pub fn set_many(&self, mapping: &SettingsMap, complete: bool) -> Result<(), SettingsError> {
        let first = mapping.keys().next().map(String::as_str).unwrap_or("*");
        self.write_with(first, |registry| registry.set_many(mapping, complete))
    }

    pub fn to_map(&self) -> SettingsMap {
        self.read().to_map()
    }

    /// Returns an owned copy of the current registry.
    pub fn registry(&self) -> SettingsRegistry {
        self.read().clone()
    }

    /// Whether two handles refer to the same backing store.
    pub fn shares_store_with(&self, other: &GeneralSettings) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.active_runs.load(Ordering::SeqCst) > 0
    }

    /// Marks the store read-only until the returned guard is dropped.
    pub fn lock_for_run(&self) -> RunLock {
        self.inner.active_runs.fetch_add(1, Ordering::SeqCst);
        RunLock {
            inner: Arc::clone(&self.inner),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SettingsRegistry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_with<F>(&self, name: &str, action: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut SettingsRegistry) -> Result<(), SettingsError>,
    {
        let mut registry = self
            .inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_locked() {
            return Err(SettingsError::Locked {
                scope: registry.scope().to_string(),
                name: name.to_string(),
            });
        }
        action(&mut registry)
    }
}

/// Guard returned by [`GeneralSettings::lock_for_run`].
#[derive(Debug)]
pub struct RunLock {
    inner: Arc<SharedStore>,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        self.inner.active_runs.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The settings visible to one stage: its own registry plus the shared general store.
#[derive(Debug, Clone)]
pub struct StageSettings {
    local: SettingsRegistry,
    general: GeneralSettings,
}

impl StageSettings {
    pub fn new(local: SettingsRegistry, general: GeneralSettings) -> Self {
        Self { local, general }
    }

    pub fn local(&self) -> &SettingsRegistry {
        &self.local
    }

    pub fn general(&self) -> &GeneralSettings {
        &self.general
    }

    /// Looks a name up in the stage scope first, then in the general scope.
    pub fn get(&self, name: &str) -> Result<SettingValue, SettingsError> {
        if self.local.contains(name) {
            return self.local.get(name).cloned();
        }
        if self.general.contains(name) {
            return self.general.get(name);
        }
        Err(SettingsError::UnknownSetting {
            scope: self.local.scope().to_string(),
            name: name.to_string(),
        })
    }

    pub fn set(&mut self, name: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        self.local.set(name, value)
    }

    pub fn set_general(&self, name: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        self.general.set(name, value)
    }

    pub fn set_many(&mut self, mapping: &SettingsMap, complete: bool) -> Result<(), SettingsError> {
        self.local.set_many(mapping, complete)
    }

    /// Freezes the current stage and general values for a run.
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            stage: self.local.clone(),
            general: self.general.registry(),
        }
    }
}

/// An immutable copy of a stage's settings, taken at the start of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    stage: SettingsRegistry,
    general: SettingsRegistry,
}

impl SettingsSnapshot {
    pub fn new(stage: SettingsRegistry, general: SettingsRegistry) -> Self {
        Self { stage, general }
    }

    pub fn stage_name(&self) -> &str {
        self.stage.scope()
    }

    pub fn stage_values(&self) -> SettingsMap {
        self.stage.to_map()
    }

    pub fn general_values(&self) -> SettingsMap {
        self.general.to_map()
    }

    pub fn get(&self, name: &str) -> Result<&SettingValue, SettingsError> {
        self.scope_for(name)?.get(name)
    }

    pub fn float(&self, name: &str) -> Result<f64, SettingsError> {
        self.scope_for(name)?.float(name)
    }

    pub fn int(&self, name: &str) -> Result<i64, SettingsError> {
        self.scope_for(name)?.int(name)
    }

    pub fn boolean(&self, name: &str) -> Result<bool, SettingsError> {
        self.scope_for(name)?.boolean(name)
    }

    pub fn string(&self, name: &str) -> Result<&str, SettingsError> {
        self.scope_for(name)?.string(name)
    }

    /// Iterates every visible setting, stage values shadowing general ones.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SettingValue)> + '_ {
        let general = self
            .general
            .names()
            .filter(move |name| !self.stage.contains(name));
        self.stage
            .names()
            .chain(general)
            .filter_map(move |name| self.get(name).ok().map(|value| (name, value)))
    }

    fn scope_for(&self, name: &str) -> Result<&SettingsRegistry, SettingsError> {
        if self.stage.contains(name) {
            Ok(&self.stage)
        } else if self.general.contains(name) {
            Ok(&self.general)
        } else {
            Err(SettingsError::UnknownSetting {
                scope: self.stage.scope().to_string(),
                name: name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::catalog::keys;
    use crate::core::settings::schema::SettingSpec;

    fn stage(general: &GeneralSettings) -> StageSettings {
        StageSettings::new(
            SettingsRegistry::new(
                "prescreening",
                [SettingSpec::float("threshold", 4.0, 0.0, f64::INFINITY)],
            ),
            general.clone(),
        )
    }

    #[test]
    fn general_setting_written_from_one_stage_is_visible_from_another() {
        let general = GeneralSettings::new();
        let first = stage(&general);
        let second = stage(&general);

        first.set_general(keys::SOLVENT, "dmso").unwrap();

        assert_eq!(second.get(keys::SOLVENT).unwrap(), SettingValue::from("dmso"));
        assert!(first.general().shares_store_with(second.general()));
    }

    #[test]
    fn stage_local_settings_are_isolated_per_instance() {
        let general = GeneralSettings::new();
        let mut first = stage(&general);
        let second = stage(&general);

        first.set("threshold", 1.0).unwrap();

        assert_eq!(first.get("threshold").unwrap(), SettingValue::Float(1.0));
        assert_eq!(second.get("threshold").unwrap(), SettingValue::Float(4.0));
    }

    #[test]
    fn unknown_name_is_reported_against_the_stage_scope() {
        let general = GeneralSettings::new();
        let settings = stage(&general);
        assert_eq!(
            settings.get("nope").unwrap_err(),
            SettingsError::UnknownSetting {
                scope: "prescreening".to_string(),
                name: "nope".to_string(),
            }
        );
    }

    #[test]
    fn general_writes_are_rejected_while_a_run_holds_the_lock() {
        let general = GeneralSettings::new();
        let guard = general.lock_for_run();

        let err = general.set(keys::TEMPERATURE, 310.0).unwrap_err();
        assert!(matches!(err, SettingsError::Locked { .. }));
        assert_eq!(general.get(keys::TEMPERATURE).unwrap(), SettingValue::Float(298.15));

        drop(guard);
        general.set(keys::TEMPERATURE, 310.0).unwrap();
        assert_eq!(general.get(keys::TEMPERATURE).unwrap(), SettingValue::Float(310.0));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let general = GeneralSettings::new();
        let mut settings = stage(&general);
        let snapshot = settings.snapshot();

        settings.set("threshold", 0.5).unwrap();
        general.set(keys::GAS_PHASE, true).unwrap();

        assert_eq!(snapshot.float("threshold").unwrap(), 4.0);
        assert!(!snapshot.boolean(keys::GAS_PHASE).unwrap());
        assert_eq!(snapshot.stage_name(), "prescreening");
    }

    #[test]
    fn snapshot_iter_lists_stage_and_general_settings_once() {
        let general = GeneralSettings::new();
        let snapshot = stage(&general).snapshot();
        let names: Vec<_> = snapshot.iter().map(|(name, _)| name).collect();
        assert!(names.contains(&"threshold"));
        assert!(names.contains(&keys::SOLVENT));
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }
}
