//! Address strings: `package[.section[.option]][=value]`.
//!
//! The section component may be an extended reference, `@type[index]` or
//! `@[index]`, which picks a section by position instead of by name.

use crate::error::UciError;
use crate::validate::{is_valid_name, is_valid_package, is_valid_text, is_valid_type};
use std::fmt;

/// What an address points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Package,
    Section,
    Option,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciPath {
    package: String,
    section: Option<String>,
    option: Option<String>,
    value: Option<String>,
}

impl UciPath {
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let invalid = |message: &str| UciError::invalid(format!("{message} in '{input}'"));

        let (path, value) = match input.split_once('=') {
            Some((path, value)) => (path, Some(value.to_string())),
            None => (input, None),
        };

        let parts: Vec<&str> = path.split('.').collect();
        if parts.len() > 3 {
            return Err(invalid("too many path components"));
        }
        if parts.iter().any(|part| part.is_empty()) {
            return Err(invalid("empty path component"));
        }

        let package = parts[0];
        if !is_valid_package(package) {
            return Err(invalid("invalid package name"));
        }

        let section = parts.get(1).copied();
        if let Some(section) = section {
            if !is_valid_name(section) {
                SectionRef::parse(section)?;
            }
        }

        let option = parts.get(2).copied();
        if option.is_some_and(|option| !is_valid_name(option)) {
            return Err(invalid("invalid option name"));
        }

        if value.as_deref().is_some_and(|value| !is_valid_text(value)) {
            return Err(invalid("invalid value"));
        }

        Ok(Self {
            package: package.to_string(),
            section: section.map(str::to_string),
            option: option.map(str::to_string),
            value,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    pub fn option(&self) -> Option<&str> {
        self.option.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn target(&self) -> Target {
        match (&self.section, &self.option) {
            (None, _) => Target::Package,
            (Some(_), None) => Target::Section,
            (Some(_), Some(_)) => Target::Option,
        }
    }

    /// Whether the section component uses `@type[index]` syntax.
    pub fn is_extended(&self) -> bool {
        self.section
            .as_deref()
            .is_some_and(|section| !is_valid_name(section))
    }
}

impl fmt::Display for UciPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package)?;
        if let Some(section) = &self.section {
            write!(f, ".{section}")?;
        }
        if let Some(option) = &self.option {
            write!(f, ".{option}")?;
        }
        if let Some(value) = &self.value {
            write!(f, "={value}")?;
        }
        Ok(())
    }
}

/// A section named literally or by position among sections of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionRef {
    Named(String),
    Indexed {
        section_type: Option<String>,
        index: i64,
    },
}

impl SectionRef {
    pub fn parse(input: &str) -> Result<Self, UciError> {
        if is_valid_name(input) {
            return Ok(SectionRef::Named(input.to_string()));
        }

        let invalid = || UciError::invalid(format!("invalid section reference '{input}'"));
        let body = input.strip_prefix('@').ok_or_else(invalid)?;
        let (section_type, rest) = body.split_once('[').ok_or_else(invalid)?;
        let index = rest.strip_suffix(']').ok_or_else(invalid)?;
        let index: i64 = index.trim().parse().map_err(|_| invalid())?;

        let section_type = if section_type.is_empty() {
            None
        } else if is_valid_type(section_type) {
            Some(section_type.to_string())
        } else {
            return Err(invalid());
        };

        Ok(SectionRef::Indexed {
            section_type,
            index,
        })
    }
}

impl fmt::Display for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionRef::Named(name) => write!(f, "{name}"),
            SectionRef::Indexed {
                section_type,
                index,
            } => write!(f, "@{}[{index}]", section_type.as_deref().unwrap_or("")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_full_path_with_value() {
        let path = UciPath::parse("network.lan.ipaddr=192.168.1.1").unwrap();
        assert_eq!(path.package(), "network");
        assert_eq!(path.section(), Some("lan"));
        assert_eq!(path.option(), Some("ipaddr"));
        assert_eq!(path.value(), Some("192.168.1.1"));
        assert_eq!(path.target(), Target::Option);
        assert!(!path.is_extended());
    }

    #[test]
    fn test_parse_package_only() {
        let path = UciPath::parse("network").unwrap();
        assert_eq!(path.target(), Target::Package);
        assert_eq!(path.to_string(), "network");
    }

    #[test]
    fn test_value_may_contain_equals_and_dots() {
        let path = UciPath::parse("p.s.o=a=b.c").unwrap();
        assert_eq!(path.option(), Some("o"));
        assert_eq!(path.value(), Some("a=b.c"));
    }

    #[test]
    fn test_extended_section() {
        let path = UciPath::parse("network.@interface[-1].proto").unwrap();
        assert!(path.is_extended());
        assert_eq!(path.section(), Some("@interface[-1]"));
    }

    #[test]
    fn test_rejects_bad_paths() {
        for input in [
            "a.b.c.d",
            "a..c",
            "net/work.lan",
            "network.l-an",
            "network.lan.ip-addr",
            "network.@interface",
            "network.@interface[x]",
        ] {
            let err = UciPath::parse(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{input}");
        }
    }

    #[test]
    fn test_section_ref_display() {
        let parsed = SectionRef::parse("@[2]").unwrap();
        assert_eq!(
            parsed,
            SectionRef::Indexed {
                section_type: None,
                index: 2
            }
        );
        assert_eq!(parsed.to_string(), "@[2]");
        assert_eq!(SectionRef::parse("lan").unwrap().to_string(), "lan");
    }
}
