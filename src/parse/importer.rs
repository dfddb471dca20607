//! Statement parser: turns scanner words into packages.
//!
//! Statements go to a [`StatementSink`]. [`BuildSink`] assembles fresh
//! packages; [`MergeSink`] routes every statement through the mutation API
//! of a package that is already loaded.

use crate::edit::Journaling;
use crate::error::UciError;
use crate::model::{Package, Value};
use crate::parse::scanner::Scanner;
use crate::validate::{is_valid_name, is_valid_package, is_valid_type};
use std::io::BufRead;
use tracing::warn;

/// Receiver for parsed statements.
pub trait StatementSink {
    fn package(&mut self, name: &str) -> Result<(), UciError>;
    fn section(&mut self, section_type: &str, name: Option<&str>) -> Result<(), UciError>;
    fn option(&mut self, name: &str, value: &str) -> Result<(), UciError>;
    fn list_item(&mut self, name: &str, value: &str) -> Result<(), UciError>;

    /// Whether a `config` statement has a package to land in.
    fn has_package(&self) -> bool;
    /// Whether an `option` or `list` statement has a section to land in.
    fn has_section(&self) -> bool;
}

/// Builds new packages from scratch.
#[derive(Debug, Default)]
pub struct BuildSink {
    default_name: Option<String>,
    single: bool,
    current: Option<Package>,
    section: Option<usize>,
    done: Vec<Package>,
}

impl BuildSink {
    pub fn new(default_name: Option<&str>) -> Self {
        Self {
            default_name: default_name.map(str::to_string),
            ..Self::default()
        }
    }

    /// Build exactly one package named `name`; `package` statements in the
    /// stream are ignored.
    pub fn single(name: &str) -> Self {
        Self {
            default_name: Some(name.to_string()),
            single: true,
            ..Self::default()
        }
    }

    fn close_section(&mut self) {
        if let (Some(package), Some(index)) = (self.current.as_mut(), self.section.take()) {
            package.fixup_section(index);
        }
    }

    fn close_package(&mut self) {
        self.close_section();
        if let Some(package) = self.current.take() {
            self.done.push(package);
        }
    }

    /// Finish the last section and hand out every package built, in order.
    pub fn finish(mut self) -> Vec<Package> {
        self.close_package();
        self.done
    }
}

impl StatementSink for BuildSink {
    fn package(&mut self, name: &str) -> Result<(), UciError> {
        if self.single {
            return Ok(());
        }
        self.close_package();
        let package = match self.done.iter().position(|done| done.name() == name) {
            Some(index) => self.done.remove(index),
            None => Package::new(name),
        };
        self.current = Some(package);
        Ok(())
    }

    fn section(&mut self, section_type: &str, name: Option<&str>) -> Result<(), UciError> {
        self.close_section();
        if self.current.is_none() {
            let Some(default) = self.default_name.clone() else {
                return Err(UciError::invalid(
                    "attempting to import a file without a package name",
                ));
            };
            self.current = Some(Package::new(default));
        }
        let Some(package) = self.current.as_mut() else {
            return Ok(());
        };

        let existing = name.and_then(|name| package.section_index(name));
        let index = match existing {
            Some(index) => {
                package.section_at_mut(index).set_type(section_type);
                index
            }
            None => package.alloc_section(section_type, name),
        };
        self.section = Some(index);
        Ok(())
    }

    fn option(&mut self, name: &str, value: &str) -> Result<(), UciError> {
        if let (Some(package), Some(index)) = (self.current.as_mut(), self.section) {
            package
                .section_at_mut(index)
                .put_option(name, Value::Scalar(value.to_string()));
        }
        Ok(())
    }

    fn list_item(&mut self, name: &str, value: &str) -> Result<(), UciError> {
        if let (Some(package), Some(index)) = (self.current.as_mut(), self.section) {
            package
                .section_at_mut(index)
                .push_item(name, value.to_string());
        }
        Ok(())
    }

    fn has_package(&self) -> bool {
        self.current.is_some() || self.default_name.is_some()
    }

    fn has_section(&self) -> bool {
        self.section.is_some()
    }
}

/// Applies statements to an existing package as edits. `package`
/// statements are ignored.
pub struct MergeSink<'a> {
    package: &'a mut Package,
    journaling: Journaling,
    section: Option<String>,
}

impl<'a> MergeSink<'a> {
    pub fn new(package: &'a mut Package, journaling: Journaling) -> Self {
        Self {
            package,
            journaling,
            section: None,
        }
    }
}

impl StatementSink for MergeSink<'_> {
    fn package(&mut self, _name: &str) -> Result<(), UciError> {
        Ok(())
    }

    fn section(&mut self, section_type: &str, name: Option<&str>) -> Result<(), UciError> {
        let name = match name {
            Some(name) => {
                self.package
                    .set_with(name, None, section_type, self.journaling)?;
                name.to_string()
            }
            None => self
                .package
                .add_section_with(section_type, self.journaling)?
                .name()
                .to_string(),
        };
        self.section = Some(name);
        Ok(())
    }

    fn option(&mut self, name: &str, value: &str) -> Result<(), UciError> {
        let Some(section) = &self.section else {
            return Ok(());
        };
        self.package
            .set_with(section, Some(name), value, self.journaling)
            .map(|_| ())
    }

    fn list_item(&mut self, name: &str, value: &str) -> Result<(), UciError> {
        let Some(section) = &self.section else {
            return Ok(());
        };
        self.package
            .add_list_with(section, name, value, self.journaling)
    }

    fn has_package(&self) -> bool {
        true
    }

    fn has_section(&self) -> bool {
        self.section.is_some()
    }
}

pub struct Importer<R, S> {
    scanner: Scanner<R>,
    sink: S,
    strict: bool,
}

impl<R: BufRead, S: StatementSink> Importer<R, S> {
    pub fn new(reader: R, sink: S, strict: bool) -> Self {
        Self {
            scanner: Scanner::new(reader),
            sink,
            strict,
        }
    }

    /// Parse the whole stream and return the sink.
    pub fn run(mut self) -> Result<S, UciError> {
        while self.scanner.next_line()? {
            loop {
                match self.statement() {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(UciError::Parse(err)) if !self.strict => {
                        warn!(line = err.line, byte = err.byte, reason = %err.reason, "skipping statement");
                        self.scanner.skip_line();
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(self.sink)
    }

    /// Parse one statement. Returns `true` when a `;` separator follows.
    fn statement(&mut self) -> Result<bool, UciError> {
        let Some(keyword) = self.scanner.next_word()? else {
            return self.scanner.end_statement();
        };

        match keyword.as_str() {
            "package" | "p" => {
                let name = self.argument()?;
                if !is_valid_package(&name) {
                    return Err(self.scanner.error("invalid character in field"));
                }
                self.finish_arguments()?;
                self.sink.package(&name)?;
            }
            "config" | "c" => {
                if !self.sink.has_package() {
                    return Err(self
                        .scanner
                        .error("attempting to import a file without a package name"));
                }
                let section_type = self.argument()?;
                if !is_valid_type(&section_type) {
                    return Err(self.scanner.error("invalid character in field"));
                }
                let name = self.scanner.next_word()?;
                if name.as_deref().is_some_and(|name| !is_valid_name(name)) {
                    return Err(self.scanner.error("invalid character in field"));
                }
                self.finish_arguments()?;
                self.sink.section(&section_type, name.as_deref())?;
            }
            "option" | "o" | "list" | "l" => {
                if !self.sink.has_section() {
                    return Err(self
                        .scanner
                        .error("option command found before the first section"));
                }
                let name = self.argument()?;
                if !is_valid_name(&name) {
                    return Err(self.scanner.error("invalid character in field"));
                }
                let value = self.argument()?;
                self.finish_arguments()?;
                if keyword.starts_with('o') {
                    self.sink.option(&name, &value)?;
                } else {
                    self.sink.list_item(&name, &value)?;
                }
            }
            _ => return Err(self.scanner.error("invalid command")),
        }

        self.scanner.end_statement()
    }

    fn argument(&mut self) -> Result<String, UciError> {
        self.scanner
            .next_word()?
            .ok_or_else(|| self.scanner.error("insufficient arguments"))
    }

    fn finish_arguments(&mut self) -> Result<(), UciError> {
        if self.scanner.next_word()?.is_none() {
            return Ok(());
        }
        if self.strict {
            return Err(self.scanner.error("too many arguments"));
        }
        while self.scanner.next_word()?.is_some() {}
        Ok(())
    }
}

/// Parse a stream into fresh packages. `default_name` names the package for
/// statements that precede any `package` line.
pub fn parse_packages<R: BufRead>(
    reader: R,
    default_name: Option<&str>,
    strict: bool,
) -> Result<Vec<Package>, UciError> {
    let sink = Importer::new(reader, BuildSink::new(default_name), strict).run()?;
    Ok(sink.finish())
}

/// Parse a stream that backs a single package, such as a file under the
/// config directory. `package` lines do not switch packages.
pub fn parse_package<R: BufRead>(reader: R, name: &str, strict: bool) -> Result<Package, UciError> {
    let sink = Importer::new(reader, BuildSink::single(name), strict).run()?;
    Ok(sink
        .finish()
        .pop()
        .unwrap_or_else(|| Package::new(name)))
}

/// Parse a stream as edits against an existing package.
pub fn merge_into<R: BufRead>(
    reader: R,
    package: &mut Package,
    journaling: Journaling,
    strict: bool,
) -> Result<(), UciError> {
    Importer::new(reader, MergeSink::new(package, journaling), strict).run()?;
    Ok(())
}
