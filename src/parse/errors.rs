use thiserror::Error;

/// Syntax error in a config stream, with its position in the logical line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error ({reason}) at line {line}, byte {byte}")]
pub struct ParseError {
    /// Physical line number (1-based) of the last line read.
    pub line: usize,
    /// Byte offset into the logical line buffer.
    pub byte: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(line: usize, byte: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            byte,
            reason: reason.into(),
        }
    }
}
