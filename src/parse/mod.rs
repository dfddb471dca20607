//! Reading the config dialect: tokenizer and statement importer.

mod errors;
mod importer;
mod scanner;

pub use errors::ParseError;
pub use importer::{
    merge_into, parse_package, parse_packages, BuildSink, Importer, MergeSink, StatementSink,
};
pub use scanner::{parse_token, Scanner, LINE_BUF_INITIAL, LINE_BUF_MAX};
