use crate::core::models::results::Category;
use crate::core::settings::catalog::{FUNCTIONALS, GFN_VERSIONS, PROGRAMS, keys};
use crate::core::settings::error::SettingsError;
use crate::core::settings::registry::SettingsRegistry;
use crate::core::settings::schema::SettingSpec;
use crate::core::settings::scope::{GeneralSettings, SettingsSnapshot, StageSettings};
use crate::engine::stage::Stage;

/// Cheap first pass over the whole input: single points with a small basis,
/// plus a solvation contribution unless running in the gas phase.
#[derive(Debug, Clone)]
pub struct Prescreening {
    settings: StageSettings,
}

impl Prescreening {
    pub const NAME: &'static str = "prescreening";

    pub fn specs() -> Vec<SettingSpec> {
        vec![
            SettingSpec::float(keys::THRESHOLD, 4.0, 0.0, f64::INFINITY),
            SettingSpec::choice(keys::FUNC, "pbe-d4", FUNCTIONALS),
            SettingSpec::string(keys::BASIS, "def2-SV(P)"),
            SettingSpec::choice(keys::PROG, "orca", PROGRAMS),
            SettingSpec::choice(keys::GFNV, "gfn2", GFN_VERSIONS),
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

impl Stage for Prescreening {
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
        let mut jobs = vec![Category::SinglePoint];
        if !settings.boolean(keys::GAS_PHASE)? {
            jobs.push(Category::Solvation);
        }
        Ok(jobs)
    }
}
