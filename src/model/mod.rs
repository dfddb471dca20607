//! In-memory document tree: packages own sections, sections own options.

pub mod naming;
mod package;
mod section;

pub use package::{Element, Package};
pub use section::{Section, UciOption, Value};
