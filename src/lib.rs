//! ucikit: a configuration store for the UCI text format
//!
//! Config files live one package per file in a config directory. Each file
//! holds typed sections carrying scalar and list options:
//!
//! ```text
//! config interface 'lan'
//!     option proto 'static'
//!     list dns '1.1.1.1'
//! ```
//!
//! # Architecture
//!
//! - [`parse`] tokenizes the dialect and feeds statements into a sink that
//!   either builds fresh packages or merges into a loaded one.
//! - [`model`] is the in-memory tree; [`edit`] adds validated mutations
//!   that journal every change.
//! - [`journal`] stages changes in history files between processes, and
//!   [`Context::commit`] reconciles them with the canonical file under an
//!   exclusive lock before rewriting it.
//! - [`export`] writes the tree back out.
//!
//! # Example
//!
//! ```no_run
//! use ucikit::Context;
//!
//! let mut ctx = Context::new();
//! ctx.set_path("network.lan.proto=dhcp")?;
//! ctx.save("network")?;
//! ctx.commit("network", false)?;
//! # Ok::<(), ucikit::UciError>(())
//! ```

pub mod address;
pub mod context;
pub mod edit;
pub mod error;
pub mod export;
pub mod journal;
pub mod model;
pub mod parse;
pub mod settings;
mod stream;
pub mod validate;

// Re-exports
pub use address::{SectionRef, Target, UciPath};
pub use context::{Context, DuplicatePolicy};
pub use edit::Journaling;
pub use error::{ErrorKind, UciError};
pub use export::{escape, ExportOptions};
pub use journal::{Change, ChangeKind};
pub use model::{Element, Package, Section, UciOption, Value};
pub use parse::{parse_package, parse_packages, ParseError};
pub use settings::{Settings, SettingsError};
pub use validate::{is_valid_name, is_valid_package, is_valid_text, is_valid_type};
