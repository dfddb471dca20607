//! Reading [`Settings`] from TOML text or a file.

use crate::settings::schema::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot open settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("settings{} are not valid TOML: {source}", origin(.path))]
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    #[error("settings{} rejected: {message}", origin(.path))]
    Validation {
        path: Option<PathBuf>,
        message: String,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" in {}", path.display()))
        .unwrap_or_default()
}

impl SettingsError {
    /// Name the file a text-level error came from.
    fn in_file(self, file: &Path) -> Self {
        match self {
            SettingsError::Toml { path: None, source } => SettingsError::Toml {
                path: Some(file.to_path_buf()),
                source,
            },
            SettingsError::Validation {
                path: None,
                message,
            } => SettingsError::Validation {
                path: Some(file.to_path_buf()),
                message,
            },
            other => other,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = toml_edit::de::from_str(input)
        .map_err(|source| SettingsError::Toml { path: None, source })?;
    settings
        .validate()
        .map_err(|message| SettingsError::Validation { path: None, message })?;
    Ok(settings)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.in_file(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_SAVEDIR;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings = load_from_str("confdir = \"/srv/config\"\n").unwrap();
        assert_eq!(settings.confdir, PathBuf::from("/srv/config"));
        assert_eq!(settings.savedir, PathBuf::from(DEFAULT_SAVEDIR));
        assert!(settings.strict);
        assert!(settings.load_history);
        assert!(!settings.export_names);
    }

    #[test]
    fn test_full_settings() {
        let settings = load_from_str(
            r#"
confdir = "/a"
savedir = "/b"
history_paths = ["/c", "/d"]
strict = false
export_names = true
load_history = false
"#,
        )
        .unwrap();
        assert_eq!(settings.history_paths.len(), 2);
        assert!(!settings.strict);
        assert!(settings.export_names);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_from_str("confdirr = \"/x\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Toml { path: None, .. }));
    }

    #[test]
    fn test_validation_failure() {
        let err = load_from_str("confdir = \"/x\"\nsavedir = \"/x\"\n").unwrap_err();
        assert!(err.to_string().contains("savedir must differ"));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uci.toml");
        fs::write(&path, "strict = 3\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Toml { path: Some(_), .. }));
        assert!(err.to_string().contains("uci.toml"));

        let err = load_from_path(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
