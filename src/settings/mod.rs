//! Engine settings loaded from TOML.

pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, SettingsError};
pub use schema::{Settings, DEFAULT_CONFDIR, DEFAULT_SAVEDIR};
