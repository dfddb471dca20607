use crate::parse::ParseError;
use crate::settings::SettingsError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the engine reports.
///
/// Callers that only care about the category use [`UciError::kind`]; the
/// variants carry the context needed for diagnostics.
#[derive(Error, Debug)]
pub enum UciError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("entry not found: {what}")]
    NotFound { what: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("duplicate package: {name}")]
    DuplicatePackage { name: String },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Stable error category, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfMemory,
    InvalidArgument,
    NotFound,
    Io,
    Parse,
    DuplicatePackage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::OutOfMemory => "Out of memory",
            ErrorKind::InvalidArgument => "Invalid argument",
            ErrorKind::NotFound => "Entry not found",
            ErrorKind::Io => "I/O error",
            ErrorKind::Parse => "Parse error",
            ErrorKind::DuplicatePackage => "Duplicate entry",
        };
        f.write_str(text)
    }
}

impl UciError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        UciError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        UciError::NotFound { what: what.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UciError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UciError::OutOfMemory => ErrorKind::OutOfMemory,
            UciError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            UciError::NotFound { .. } => ErrorKind::NotFound,
            UciError::Io { .. } => ErrorKind::Io,
            UciError::Parse(_) => ErrorKind::Parse,
            UciError::DuplicatePackage { .. } => ErrorKind::DuplicatePackage,
            UciError::Settings(SettingsError::Io { .. }) => ErrorKind::Io,
            UciError::Settings(SettingsError::Toml { .. }) => ErrorKind::Parse,
            UciError::Settings(SettingsError::Validation { .. }) => ErrorKind::InvalidArgument,
        }
    }

    /// Render the error the way the command line front-end prints it:
    /// `prefix: Kind (reason) at line N, byte M`.
    pub fn render(&self, prefix: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(prefix) = prefix {
            out.push_str(prefix);
            out.push_str(": ");
        }
        out.push_str(&self.kind().to_string());
        match self {
            UciError::Parse(err) => {
                out.push_str(&format!(
                    " ({}) at line {}, byte {}",
                    err.reason, err.line, err.byte
                ));
            }
            UciError::InvalidArgument { message } => {
                out.push_str(&format!(" ({message})"));
            }
            UciError::NotFound { what } => {
                out.push_str(&format!(" ({what})"));
            }
            UciError::Io { path, source } => {
                out.push_str(&format!(" ({}: {source})", path.display()));
            }
            UciError::DuplicatePackage { name } => {
                out.push_str(&format!(" ({name})"));
            }
            UciError::Settings(err) => {
                out.push_str(&format!(" ({err})"));
            }
            UciError::OutOfMemory => {}
        }
        out
    }
}

impl From<std::collections::TryReserveError> for UciError {
    fn from(_: std::collections::TryReserveError) -> Self {
        UciError::OutOfMemory
    }
}
