//! Change journal: the record of edits made since the last commit, and the
//! line-oriented history files that stage them between processes.

mod change;
pub mod history;

pub use change::{Change, ChangeKind};
