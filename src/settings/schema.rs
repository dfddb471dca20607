use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_CONFDIR: &str = "/etc/config";
pub const DEFAULT_SAVEDIR: &str = "/tmp/.uci";

/// Where packages live and how they are read and written.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory holding the canonical package files.
    pub confdir: PathBuf,
    /// Directory for staged history, written by `save`.
    pub savedir: PathBuf,
    /// Extra read-only history directories, replayed before `savedir`.
    pub history_paths: Vec<PathBuf>,
    /// Escalate parse errors instead of skipping the offending line.
    pub strict: bool,
    /// Export generated names of anonymous sections.
    pub export_names: bool,
    /// Replay staged history when loading a package.
    pub load_history: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confdir: PathBuf::from(DEFAULT_CONFDIR),
            savedir: PathBuf::from(DEFAULT_SAVEDIR),
            history_paths: Vec::new(),
            strict: true,
            export_names: false,
            load_history: true,
        }
    }
}

impl Settings {
    /// Apply `UCI_CONFDIR` and `UCI_SAVEDIR` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os("UCI_CONFDIR") {
            self.confdir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os("UCI_SAVEDIR") {
            self.savedir = PathBuf::from(dir);
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.confdir.as_os_str().is_empty() {
            return Err("confdir must not be empty".to_string());
        }
        if self.savedir.as_os_str().is_empty() {
            return Err("savedir must not be empty".to_string());
        }
        if self.savedir == self.confdir {
            return Err("savedir must differ from confdir".to_string());
        }
        Ok(())
    }
}
