//! Configuration loading, validation, and env substitution.
//!
//! Config files: `pineapple.toml`, `pineapple.yaml`, or `pineapple.json`
//! Searched in `./` then `~/.config/pineapple/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        clear_config_dir, clear_data_dir, config_dir, data_dir, discover_and_load,
        find_config_file, load_config, load_config_value, set_config_dir, set_data_dir,
    },
    schema::{ChannelsConfig, DataConfig, PineappleConfig, ReplyConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
