use crate::core::models::results::Category;
use crate::core::settings::catalog::{FUNCTIONALS, GFN_VERSIONS, PROGRAMS, SOLVATION_MODELS, keys};
use crate::core::settings::error::SettingsError;
use crate::core::settings::registry::SettingsRegistry;
use crate::core::settings::schema::SettingSpec;
use crate::core::settings::scope::{GeneralSettings, SettingsSnapshot, StageSettings};
use crate::engine::stage::Stage;

/// Single points at a larger basis on the prescreening survivors.
///
/// With `implicit` set, solvation is folded into the single point by the
/// program and no separate `gsolv` calculation is requested.
#[derive(Debug, Clone)]
pub struct Screening {
    settings: StageSettings,
}

impl Screening {
    pub const NAME: &'static str = "screening";

    pub fn specs() -> Vec<SettingSpec> {
        vec![
            SettingSpec::float(keys::THRESHOLD, 3.5, 0.0, f64::INFINITY),
            SettingSpec::choice(keys::FUNC, "r2scan-3c", FUNCTIONALS),
            SettingSpec::string(keys::BASIS, "def2-TZVP"),
            SettingSpec::choice(keys::PROG, "orca", PROGRAMS),
            SettingSpec::boolean(keys::IMPLICIT, true),
            SettingSpec::choice(keys::SM, "smd", SOLVATION_MODELS),
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

impl Stage for Screening {
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
        if !settings.boolean(keys::GAS_PHASE)? && !settings.boolean(keys::IMPLICIT)? {
            jobs.push(Category::Solvation);
        }
        if settings.boolean(keys::EVALUATE_RRHO)? {
            jobs.push(Category::Rrho);
        }
        Ok(jobs)
    }
}
