//! Config - runtime tunables
//!
//! - `settings.rs` - `CrewSettings` (defaults, TOML file, `CREW_*` env overrides)

mod settings;

pub use settings::{
    default_store_path, ContextSettings, CrewSettings, StoreKind, StoreSettings,
    CREW_CONFIG_FILE, DEFAULT_DELEGATION_TIMEOUT,
};
