use super::registry::SettingsRegistry;
use super::schema::SettingSpec;

/// Scope name of the general settings.
pub const GENERAL_SCOPE: &str = "general";

/// Names of the general settings.
pub mod keys {
    pub const MAXCORES: &str = "maxcores";
    pub const TEMPERATURE: &str = "temperature";
    pub const SOLVENT: &str = "solvent";
    pub const GAS_PHASE: &str = "gas_phase";
    pub const EVALUATE_RRHO: &str = "evaluate_rrho";
    pub const SM_RRHO: &str = "sm_rrho";
    pub const SNAPSHOT_POLICY: &str = "snapshot_policy";

    pub const THRESHOLD: &str = "threshold";
    pub const FUNC: &str = "func";
    pub const BASIS: &str = "basis";
    pub const PROG: &str = "prog";
    pub const GFNV: &str = "gfnv";
    pub const IMPLICIT: &str = "implicit";
    pub const SM: &str = "sm";
    pub const OPTCYCLES: &str = "optcycles";
    pub const MAXCYC: &str = "maxcyc";
    pub const OPTLEVEL: &str = "optlevel";
    pub const GRADTHR: &str = "gradthr";
    pub const HLOW: &str = "hlow";
}

pub const SOLVENTS: &[&str] = &[
    "acetone",
    "acetonitrile",
    "aniline",
    "benzaldehyde",
    "benzene",
    "ch2cl2",
    "chcl3",
    "cs2",
    "dioxane",
    "dmf",
    "dmso",
    "ether",
    "ethylacetate",
    "furane",
    "h2o",
    "hexadecane",
    "hexane",
    "methanol",
    "nitromethane",
    "octanol",
    "phenol",
    "thf",
    "toluene",
];

pub const SNAPSHOT_POLICIES: &[&str] = &["overwrite", "version"];
pub const SM_RRHO_MODELS: &[&str] = &["alpb", "gbsa"];
pub const PROGRAMS: &[&str] = &["orca", "tm"];
pub const GFN_VERSIONS: &[&str] = &["gfn1", "gfn2", "gfnff"];
pub const FUNCTIONALS: &[&str] = &[
    "pbe-d4",
    "pbe-d3",
    "b97-d3",
    "tpss-d4",
    "r2scan-3c",
    "b97-3c",
    "pbeh-3c",
    "pbe0-d4",
    "wb97x-d4",
    "wb97x-v",
    "dsd-blyp-d3",
];
pub const SOLVATION_MODELS: &[&str] = &["cpcm", "smd", "cosmors", "dcosmors"];
pub const OPT_LEVELS: &[&str] = &[
    "crude", "sloppy", "loose", "lax", "normal", "tight", "vtight", "extreme",
];

/// Number of logical cores available to this process, at least one.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Declarations of the general settings shared by every stage.
pub fn general_specs() -> Vec<SettingSpec> {
    let host = host_parallelism() as i64;
    vec![
        SettingSpec::int(keys::MAXCORES, host, 1, host),
        SettingSpec::float(keys::TEMPERATURE, 298.15, 1e-5, 2000.0),
        SettingSpec::choice(keys::SOLVENT, "h2o", SOLVENTS),
        SettingSpec::boolean(keys::GAS_PHASE, false),
        SettingSpec::boolean(keys::EVALUATE_RRHO, false),
        SettingSpec::choice(keys::SM_RRHO, "alpb", SM_RRHO_MODELS),
        SettingSpec::choice(keys::SNAPSHOT_POLICY, "overwrite", SNAPSHOT_POLICIES),
    ]
}

pub fn general_registry() -> SettingsRegistry {
    SettingsRegistry::new(GENERAL_SCOPE, general_specs())
}
