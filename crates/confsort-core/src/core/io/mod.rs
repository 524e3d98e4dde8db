//! Reading and writing the files a run consumes and produces.
//!
//! - [`xyz`]: multi-frame XYZ geometry files, the input ensemble format.
//! - [`settings_file`]: TOML settings overrides, one table per scope.
//! - [`snapshot`]: the JSON record each stage run leaves behind.
//!
//! All formats share the [`EnsembleFile`](traits::EnsembleFile) interface.

pub mod settings_file;
pub mod snapshot;
pub mod traits;
pub mod xyz;
