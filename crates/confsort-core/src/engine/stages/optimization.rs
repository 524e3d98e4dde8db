use crate::core::models::results::Category;
use crate::core::settings::catalog::{FUNCTIONALS, OPT_LEVELS, PROGRAMS, keys};
use crate::core::settings::error::SettingsError;
use crate::core::settings::registry::SettingsRegistry;
use crate::core::settings::schema::SettingSpec;
use crate::core::settings::scope::{GeneralSettings, SettingsSnapshot, StageSettings};
use crate::engine::stage::Stage;

/// Geometry optimization of the remaining conformers.
///
/// The `opt` result carries the final energy and the optimized geometry, which
/// replaces the conformer's geometry when it survives.
#[derive(Debug, Clone)]
pub struct Optimization {
    settings: StageSettings,
}

impl Optimization {
    pub const NAME: &'static str = "optimization";

    pub fn specs() -> Vec<SettingSpec> {
        vec![
            SettingSpec::float(keys::THRESHOLD, 1.5, 0.0, f64::INFINITY),
            SettingSpec::choice(keys::FUNC, "r2scan-3c", FUNCTIONALS),
            SettingSpec::string(keys::BASIS, "def2-TZVP"),
            SettingSpec::choice(keys::PROG, "orca", PROGRAMS),
            SettingSpec::int(keys::OPTCYCLES, 8, 1, 100),
            SettingSpec::int(keys::MAXCYC, 200, 10, 10_000),
            SettingSpec::choice(keys::OPTLEVEL, "normal", OPT_LEVELS),
            SettingSpec::float(keys::GRADTHR, 0.01, 0.0, f64::INFINITY),
            SettingSpec::float(keys::HLOW, 0.01, 0.0, f64::INFINITY),
        ]
    }

    pub fn new(general: &GeneralSettings) -> Self {
        Self {
            settings: StageSettings::new(
                SettingsRegistry::new(Self::NAME, Self::specs()),
                general.clone(),
            ),
        }
    }
}

impl Stage for Optimization {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn settings(&self) -> &StageSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut StageSettings {
        &mut self.settings
    }

    fn jobs(&self, settings: &SettingsSnapshot) -> Result<Vec<Category>, SettingsError> {
        let mut jobs = vec![Category::Optimization];
        if settings.boolean(keys::EVALUATE_RRHO)? {
            jobs.push(Category::Rrho);
        }
        Ok(jobs)
    }
}
