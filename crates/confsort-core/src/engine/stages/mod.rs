//! The concrete stages shipped with the library.
//!
//! Each stage owns its local settings registry and holds a handle to the
//! shared [`GeneralSettings`]. Additional stages only need to implement
//! [`Stage`].

pub mod optimization;
pub mod prescreening;
pub mod screening;

pub use optimization::Optimization;
pub use prescreening::Prescreening;
pub use screening::Screening;

use crate::core::settings::scope::GeneralSettings;
use crate::engine::stage::Stage;

/// Names of the built-in stages in their usual order.
pub const STAGE_NAMES: [&str; 3] = [Prescreening::NAME, Screening::NAME, Optimization::NAME];

/// Creates a built-in stage by name.
pub fn by_name(name: &str, general: &GeneralSettings) -> Option<Box<dyn Stage>> {
    match name {
        Prescreening::NAME => Some(Box::new(Prescreening::new(general))),
        Screening::NAME => Some(Box::new(Screening::new(general))),
        Optimization::NAME => Some(Box::new(Optimization::new(general))),
        _ => None,
    }
}

/// All built-in stages, in order, sharing `general`.
pub fn default_pipeline(general: &GeneralSettings) -> Vec<Box<dyn Stage>> {
    STAGE_NAMES
        .iter()
        .filter_map(|name| by_name(name, general))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::results::Category;
    use crate::core::settings::catalog::keys;
    use crate::core::settings::error::SettingsError;
    use crate::core::settings::registry::SettingsMap;
    use crate::core::settings::value::SettingValue;

    fn jobs(stage: &dyn Stage) -> Vec<Category> {
        stage.jobs(&stage.settings().snapshot()).unwrap()
    }

    #[test]
    fn prescreening_drops_solvation_in_gas_phase() {
        let general = GeneralSettings::new();
        let stage = Prescreening::new(&general);
        assert_eq!(jobs(&stage), vec![Category::SinglePoint, Category::Solvation]);

        stage
            .set_general_setting(keys::GAS_PHASE, SettingValue::Bool(true))
            .unwrap();
        assert_eq!(jobs(&stage), vec![Category::SinglePoint]);
    }

    #[test]
    fn screening_requests_gsolv_only_without_implicit_solvation() {
        let general = GeneralSettings::new();
        let mut stage = Screening::new(&general);
        assert_eq!(jobs(&stage), vec![Category::SinglePoint]);

        stage
            .set_setting(keys::IMPLICIT, SettingValue::Bool(false))
            .unwrap();
        stage
            .set_general_setting(keys::EVALUATE_RRHO, SettingValue::Bool(true))
            .unwrap();
        assert_eq!(
            jobs(&stage),
            vec![Category::SinglePoint, Category::Solvation, Category::Rrho]
        );
    }

    #[test]
    fn optimization_always_optimizes() {
        let general = GeneralSettings::new();
        let stage = Optimization::new(&general);
        assert_eq!(jobs(&stage), vec![Category::Optimization]);
    }

    #[test]
    fn thresholds_are_independent_per_stage_but_general_settings_are_shared() {
        let general = GeneralSettings::new();
        let mut pre = Prescreening::new(&general);
        let scr = Screening::new(&general);

        pre.set_setting(keys::THRESHOLD, SettingValue::Float(1.0))
            .unwrap();
        pre.set_general_setting(keys::SOLVENT, SettingValue::from("thf"))
            .unwrap();

        assert_eq!(scr.settings().get(keys::THRESHOLD).unwrap(), SettingValue::Float(3.5));
        assert_eq!(scr.settings().get(keys::SOLVENT).unwrap(), SettingValue::from("thf"));
    }

    #[test]
    fn stage_local_names_are_not_visible_to_other_stages() {
        let general = GeneralSettings::new();
        let mut pre = Prescreening::new(&general);
        assert!(matches!(
            pre.set_setting(keys::OPTCYCLES, SettingValue::Int(5)),
            Err(SettingsError::UnknownSetting { ref scope, .. }) if scope == "prescreening"
        ));
    }

    #[test]
    fn complete_update_resets_unmentioned_settings() {
        let general = GeneralSettings::new();
        let mut opt = Optimization::new(&general);
        opt.set_setting(keys::OPTCYCLES, SettingValue::Int(20)).unwrap();

        let mut mapping = SettingsMap::new();
        mapping.insert(keys::MAXCYC.to_string(), SettingValue::Int(500));
        opt.set_settings(&mapping, true).unwrap();

        assert_eq!(opt.settings().get(keys::OPTCYCLES).unwrap(), SettingValue::Int(8));
        assert_eq!(opt.settings().get(keys::MAXCYC).unwrap(), SettingValue::Int(500));

        opt.set_settings(&SettingsMap::new(), false).unwrap();
        assert_eq!(opt.settings().get(keys::MAXCYC).unwrap(), SettingValue::Int(500));

        opt.set_settings(&SettingsMap::new(), true).unwrap();
        assert_eq!(opt.settings().get(keys::MAXCYC).unwrap(), SettingValue::Int(200));
    }

    #[test]
    fn by_name_knows_every_built_in_stage() {
        let general = GeneralSettings::new();
        for name in STAGE_NAMES {
            assert_eq!(by_name(name, &general).unwrap().name(), name);
        }
        assert!(by_name("refinement", &general).is_none());
        assert_eq!(default_pipeline(&general).len(), 3);
    }
}
