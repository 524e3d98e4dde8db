//! Validated, scoped configuration values.
//!
//! Every setting is declared with a [`SettingKind`](value::SettingKind), a
//! [`Domain`](schema::Domain) and a default. Values are checked eagerly at the
//! registry boundary on every write; an out-of-domain write is rejected and the
//! previous value kept.
//!
//! There are two scopes:
//!
//! - **general** settings live in one shared store ([`GeneralSettings`](scope::GeneralSettings))
//!   that every stage holds a handle to;
//! - **stage-local** settings live in a [`SettingsRegistry`](registry::SettingsRegistry)
//!   owned by a single stage instance.
//!
//! [`StageSettings`](scope::StageSettings) combines both, and a run reads from
//! an immutable [`SettingsSnapshot`](scope::SettingsSnapshot).

pub mod catalog;
pub mod error;
pub mod registry;
pub mod schema;
pub mod scope;
pub mod value;
