//! Configuration: catalog location, navigator toggles and logging level.

mod settings;

pub use settings::{
    expand_env_vars, LoggingSettings, Settings, SettingsError, WarehouseSettings, CONFIG_ENV,
};
