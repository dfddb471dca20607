//! Syntactic checks for names, types and values.
//!
//! Three validators cover everything the engine accepts:
//!
//! - [`is_valid_name`]: section and option names. ASCII alphanumerics and `_`
//!   only, so names survive unquoted in shell scripts and dotted addresses.
//! - [`is_valid_type`]: section types. Any printable, non-space ASCII.
//! - [`is_valid_text`]: option values. Anything except line breaks and
//!   control characters (TAB is allowed).
//!
//! Package names use [`is_valid_package`], the type rules minus `.` and `/`
//! because a package name is both an address component and a file name.

use crate::error::UciError;

/// Check a section or option name.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

/// Check a section type.
pub fn is_valid_type(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| (33..=126).contains(&byte))
}

/// Check a package name.
pub fn is_valid_package(name: &str) -> bool {
    is_valid_type(name) && !name.contains(['.', '/'])
}

/// Check an option value or list item.
pub fn is_valid_text(value: &str) -> bool {
    value.chars().all(|c| c == '\t' || !c.is_control())
}

pub(crate) fn require_name(what: &str, name: &str) -> Result<(), UciError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(UciError::invalid(format!("invalid {what} name '{name}'")))
    }
}

pub(crate) fn require_type(value: &str) -> Result<(), UciError> {
    if is_valid_type(value) {
        Ok(())
    } else {
        Err(UciError::invalid(format!("invalid section type '{value}'")))
    }
}

pub(crate) fn require_package(name: &str) -> Result<(), UciError> {
    if is_valid_package(name) {
        Ok(())
    } else {
        Err(UciError::invalid(format!("invalid package name '{name}'")))
    }
}

pub(crate) fn require_text(value: &str) -> Result<(), UciError> {
    if is_valid_text(value) {
        Ok(())
    } else {
        Err(UciError::invalid(
            "value contains line breaks or control characters",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_alphanumeric_and_underscore() {
        assert!(is_valid_name("lan"));
        assert!(is_valid_name("wan_6"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("wan-6"));
        assert!(!is_valid_name("@interface[0]"));
        assert!(!is_valid_name("a.b"));
    }

    #[test]
    fn test_types_allow_punctuation() {
        assert!(is_valid_type("switch-vlan"));
        assert!(is_valid_type("a.b"));
        assert!(!is_valid_type("with space"));
        assert!(!is_valid_type(""));
        assert!(!is_valid_type("tab\there"));
    }

    #[test]
    fn test_package_rejects_dot_and_slash() {
        assert!(is_valid_package("network"));
        assert!(is_valid_package("my-pkg"));
        assert!(!is_valid_package("../etc"));
        assert!(!is_valid_package("a.b"));
    }

    #[test]
    fn test_text_rejects_line_breaks() {
        assert!(is_valid_text("hello world"));
        assert!(is_valid_text("tab\tseparated"));
        assert!(is_valid_text(""));
        assert!(is_valid_text("quote ' and \\ backslash"));
        assert!(!is_valid_text("two\nlines"));
        assert!(!is_valid_text("del\u{7f}"));
        assert!(!is_valid_text("c1\u{85}control"));
        assert!(is_valid_text("caf\u{e9}"));
        assert!(!is_valid_text("carriage\rreturn"));
        assert!(!is_valid_text("bell\u{7}"));
    }
}
