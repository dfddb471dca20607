//! Line reader and tokenizer for the config dialect.
//!
//! The scanner holds one logical line at a time. Physical lines are appended
//! to it whenever the tokenizer runs into a backslash at the very end of the
//! buffer, so continuations are invisible to the statement parser.

use crate::error::UciError;
use crate::parse::errors::ParseError;
use std::io::{BufRead, Read};

/// Initial logical size of the line buffer.
pub const LINE_BUF_INITIAL: usize = 32;
/// Hard ceiling for one logical line, terminator included.
pub const LINE_BUF_MAX: usize = 4096;

pub struct Scanner<R> {
    reader: R,
    buf: Vec<u8>,
    capacity: usize,
    pos: usize,
    line: usize,
}

impl<R: BufRead> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            capacity: LINE_BUF_INITIAL,
            pos: 0,
            line: 0,
        }
    }

    /// Physical line number of the most recently read line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Start a new logical line. Returns `false` at end of stream.
    pub fn next_line(&mut self) -> Result<bool, UciError> {
        self.buf.clear();
        self.pos = 0;
        self.fetch()
    }

    /// Append the next physical line to the buffer.
    fn fetch(&mut self) -> Result<bool, UciError> {
        if self.buf.capacity() < self.capacity {
            self.buf.try_reserve(self.capacity - self.buf.len())?;
        }

        let limit = LINE_BUF_MAX.saturating_sub(self.buf.len());
        let start = self.buf.len();
        let read = (&mut self.reader)
            .take(limit as u64)
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| UciError::io("<stream>", source))?;
        if read == 0 {
            return Ok(false);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        } else if read == limit {
            return Err(ParseError::new(self.line + 1, start, "line too long").into());
        }
        self.line += 1;

        while self.capacity <= self.buf.len() {
            self.capacity *= 2;
        }
        Ok(true)
    }

    pub fn error(&self, reason: &str) -> UciError {
        self.error_at(self.pos, reason)
    }

    pub fn error_at(&self, byte: usize, reason: &str) -> UciError {
        ParseError::new(self.line, byte, reason).into()
    }

    /// Current byte offset in the logical line.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Drop whatever is left of the logical line.
    pub fn skip_line(&mut self) {
        self.pos = self.buf.len();
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Consume a backslash. Returns the escaped byte, or `None` when the
    /// backslash ended the buffer and the next physical line was pulled in.
    fn backslash(&mut self) -> Result<Option<u8>, UciError> {
        self.pos += 1;
        match self.peek() {
            Some(byte) => {
                self.pos += 1;
                Ok(Some(byte))
            }
            None => {
                self.fetch()?;
                Ok(None)
            }
        }
    }

    fn skip_whitespace(&mut self) -> Result<(), UciError> {
        loop {
            while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.peek() == Some(b'\\') && self.pos + 1 == self.buf.len() {
                self.pos += 1;
                if !self.fetch()? {
                    return Ok(());
                }
                continue;
            }
            return Ok(());
        }
    }

    /// Read the next argument of the current statement.
    ///
    /// Returns `None` at the end of the statement: end of line, a comment or
    /// a `;` separator (which is left for [`Scanner::end_statement`]).
    pub fn next_word(&mut self) -> Result<Option<String>, UciError> {
        self.skip_whitespace()?;
        match self.peek() {
            None | Some(b';') => return Ok(None),
            Some(b'#') => {
                self.skip_line();
                return Ok(None);
            }
            Some(_) => {}
        }

        let start = self.pos;
        let mut word = Vec::new();
        loop {
            match self.peek() {
                None | Some(b';') => break,
                Some(byte) if byte.is_ascii_whitespace() => break,
                Some(b'#') => {
                    self.skip_line();
                    break;
                }
                Some(b'\'') => self.single_quoted(&mut word)?,
                Some(b'"') => self.double_quoted(&mut word)?,
                Some(b'\\') => {
                    if let Some(byte) = self.backslash()? {
                        word.push(byte);
                    }
                }
                Some(byte) => {
                    word.push(byte);
                    self.pos += 1;
                }
            }
        }

        String::from_utf8(word)
            .map(Some)
            .map_err(|_| self.error_at(start, "invalid UTF-8"))
    }

    fn single_quoted(&mut self, word: &mut Vec<u8>) -> Result<(), UciError> {
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated '")),
                Some(b'\'') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(byte) => {
                    word.push(byte);
                    self.pos += 1;
                }
            }
        }
    }

    fn double_quoted(&mut self, word: &mut Vec<u8>) -> Result<(), UciError> {
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated \"")),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'\\') => {
                    if let Some(byte) = self.backslash()? {
                        word.push(byte);
                    }
                }
                Some(byte) => {
                    word.push(byte);
                    self.pos += 1;
                }
            }
        }
    }

    /// Move past the end of the current statement. Returns `true` if a `;`
    /// separator was consumed and another statement may follow on this line.
    pub fn end_statement(&mut self) -> Result<bool, UciError> {
        self.skip_whitespace()?;
        if self.peek() == Some(b';') {
            self.pos += 1;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Decode a single token of the config dialect, e.g. a history value.
pub fn parse_token(text: &str) -> Result<String, UciError> {
    let mut scanner = Scanner::new(text.as_bytes());
    if !scanner.next_line()? {
        return Ok(String::new());
    }
    let word = scanner.next_word()?.unwrap_or_default();
    if scanner.next_word()?.is_some() || scanner.end_statement()? {
        return Err(scanner.error("too many arguments"));
    }
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str) -> Vec<String> {
        let mut scanner = Scanner::new(input.as_bytes());
        let mut out = Vec::new();
        while scanner.next_line().unwrap() {
            loop {
                while let Some(word) = scanner.next_word().unwrap() {
                    out.push(word);
                }
                if !scanner.end_statement().unwrap() {
                    break;
                }
            }
        }
        out
    }

    #[test]
    fn test_bare_and_quoted_words() {
        assert_eq!(
            words("option 'name' \"two words\" bare"),
            vec!["option", "name", "two words", "bare"]
        );
    }

    #[test]
    fn test_adjacent_spans_join() {
        assert_eq!(words(r"'it'\''s'"), vec!["it's"]);
    }

    #[test]
    fn test_single_quotes_keep_backslash() {
        assert_eq!(words(r"'a\nb'"), vec![r"a\nb"]);
    }

    #[test]
    fn test_double_quotes_escape_next_char() {
        assert_eq!(words(r#""say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_comment_truncates_line() {
        assert_eq!(words("option a b # trailing words"), vec!["option", "a", "b"]);
        assert_eq!(words("# only a comment"), Vec::<String>::new());
        assert_eq!(words("'#not a comment'"), vec!["#not a comment"]);
    }

    #[test]
    fn test_backslash_continuation() {
        assert_eq!(
            words("option name \\\n  value\nnext"),
            vec!["option", "name", "value", "next"]
        );
    }

    #[test]
    fn test_continuation_inside_double_quotes() {
        assert_eq!(words("\"first \\\nsecond\""), vec!["first second"]);
    }

    #[test]
    fn test_semicolon_separates_statements() {
        assert_eq!(words("a b; c 'd;e'"), vec!["a", "b", "c", "d;e"]);
    }

    #[test]
    fn test_unterminated_single_quote() {
        let mut scanner = Scanner::new(&b"option a 'oops"[..]);
        scanner.next_line().unwrap();
        scanner.next_word().unwrap();
        scanner.next_word().unwrap();
        let err = scanner.next_word().unwrap_err();
        match err {
            UciError::Parse(err) => {
                assert_eq!(err.reason, "unterminated '");
                assert_eq!(err.line, 1);
                assert_eq!(err.byte, 14);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_line_too_long() {
        let long = format!("option a '{}'\n", "x".repeat(LINE_BUF_MAX));
        let mut scanner = Scanner::new(long.as_bytes());
        let err = scanner.next_line().unwrap_err();
        assert!(matches!(err, UciError::Parse(ref e) if e.reason == "line too long"));
    }

    #[test]
    fn test_line_just_under_limit() {
        let line = format!("{}\n", "x".repeat(LINE_BUF_MAX - 1));
        let mut scanner = Scanner::new(line.as_bytes());
        assert!(scanner.next_line().unwrap());
        assert_eq!(scanner.next_word().unwrap().unwrap().len(), LINE_BUF_MAX - 1);
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(words("a b\r\nc\r\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(parse_token("'a b'").unwrap(), "a b");
        assert_eq!(parse_token("bare").unwrap(), "bare");
        assert_eq!(parse_token("''").unwrap(), "");
        assert!(parse_token("a b").is_err());
    }
}
