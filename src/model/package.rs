use crate::address::SectionRef;
use crate::error::UciError;
use crate::journal::Change;
use crate::model::naming::{anonymous_name, section_hash};
use crate::model::section::{Section, UciOption, Value};
use crate::validate::{is_valid_name, require_name};
use std::path::{Path, PathBuf};

/// A named config document, usually backed by one file.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    sections: Vec<Section>,
    path: Option<PathBuf>,
    journaled: bool,
    pending: Vec<Change>,
    saved: Vec<Change>,
    section_counter: u32,
}

/// A node found by [`Package::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element<'a> {
    Section(&'a Section),
    Option {
        section: &'a Section,
        option: &'a UciOption,
    },
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Element::Section(section) => section.name(),
            Element::Option { option, .. } => option.name(),
        }
    }

    /// The section type for a section, the value for an option.
    pub fn value(&self) -> Value {
        match self {
            Element::Section(section) => Value::Scalar(section.section_type().to_string()),
            Element::Option { option, .. } => option.value().clone(),
        }
    }
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
            path: None,
            journaled: false,
            pending: Vec::new(),
            saved: Vec::new(),
            section_counter: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing file, if the package was loaded from or committed to one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Whether `save` stages changes in the history directory. Packages loaded
    /// from arbitrary paths are written back directly instead.
    pub fn is_journaled(&self) -> bool {
        self.journaled
    }

    pub(crate) fn set_journaled(&mut self, journaled: bool) {
        self.journaled = journaled;
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_of_type<'a>(
        &'a self,
        section_type: &'a str,
    ) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections
            .iter()
            .filter(move |section| section.section_type() == section_type)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name() == name)
    }

    pub(crate) fn section_index(&self, name: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.name() == name)
    }

    pub(crate) fn section_at_mut(&mut self, index: usize) -> &mut Section {
        &mut self.sections[index]
    }

    /// Changes recorded in memory and not yet written to the history file.
    pub fn pending(&self) -> &[Change] {
        &self.pending
    }

    /// Changes already staged in history files when the package was loaded
    /// or saved.
    pub fn saved(&self) -> &[Change] {
        &self.saved
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn record(&mut self, change: Change) {
        self.pending.push(change);
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn retain_pending(&mut self, keep: impl FnMut(&Change) -> bool) {
        self.pending.retain(keep);
    }

    pub(crate) fn mark_saved(&mut self, changes: Vec<Change>) {
        self.saved.extend(changes);
    }

    pub(crate) fn clear_history(&mut self) {
        self.pending.clear();
        self.saved.clear();
    }

    /// Append a section at the tail. Anonymous sections get a placeholder
    /// name until [`Package::fixup_section`] runs.
    pub(crate) fn alloc_section(&mut self, section_type: &str, name: Option<&str>) -> usize {
        self.section_counter += 1;
        let section = match name {
            Some(name) => Section::new(section_type, name, false),
            None => Section::new(section_type, "", true),
        };
        self.sections.push(section);
        self.sections.len() - 1
    }

    /// Name an anonymous section from its current content. Must run once,
    /// after all of the section's options are attached.
    pub(crate) fn fixup_section(&mut self, index: usize) {
        let ordinal = self.section_counter;
        let section = &mut self.sections[index];
        if !section.name().is_empty() {
            return;
        }
        let name = anonymous_name(ordinal, section_hash(section));
        section.set_name(name);
    }

    pub(crate) fn remove_section(&mut self, name: &str) -> Option<Section> {
        let index = self.section_index(name)?;
        Some(self.sections.remove(index))
    }

    /// Turn a section reference into a concrete section name.
    ///
    /// Plain names are returned as-is without checking that they exist;
    /// `@type[index]` references are resolved against declaration order.
    pub fn resolve_section<'a>(&'a self, reference: &'a str) -> Result<&'a str, UciError> {
        if is_valid_name(reference) {
            return Ok(reference);
        }
        if !reference.starts_with('@') {
            return Err(UciError::invalid(format!(
                "invalid section name '{reference}'"
            )));
        }

        let SectionRef::Indexed {
            section_type,
            index,
        } = SectionRef::parse(reference)?
        else {
            return Ok(reference);
        };

        let candidates: Vec<&Section> = self
            .sections
            .iter()
            .filter(|section| {
                section_type
                    .as_deref()
                    .is_none_or(|wanted| section.section_type() == wanted)
            })
            .collect();

        let position = if index < 0 {
            index
                .checked_neg()
                .and_then(|back| usize::try_from(back).ok())
                .and_then(|back| candidates.len().checked_sub(back))
        } else {
            usize::try_from(index)
                .ok()
                .filter(|&index| index < candidates.len())
        };

        position
            .map(|position| candidates[position].name())
            .ok_or_else(|| UciError::not_found(format!("{}.{reference}", self.name)))
    }

    /// Find a section or option by name. Section references may use the
    /// extended `@type[index]` form.
    pub fn lookup(&self, section: &str, option: Option<&str>) -> Result<Element<'_>, UciError> {
        if let Some(option) = option {
            require_name("option", option)?;
        }
        let name = self.resolve_section(section)?;
        let found = self
            .section(name)
            .ok_or_else(|| UciError::not_found(format!("{}.{name}", self.name)))?;

        match option {
            None => Ok(Element::Section(found)),
            Some(option) => {
                let entry = found.option(option).ok_or_else(|| {
                    UciError::not_found(format!("{}.{name}.{option}", self.name))
                })?;
                Ok(Element::Option {
                    section: found,
                    option: entry,
                })
            }
        }
    }

    /// Scalar value of an option, `None` when missing or a list.
    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.section(section).and_then(|section| section.get(option))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interfaces() -> Package {
        let mut package = Package::new("network");
        for (name, ty) in [
            ("loopback", "interface"),
            ("globals", "globals"),
            ("lan", "interface"),
            ("wan", "interface"),
        ] {
            package.alloc_section(ty, Some(name));
        }
        package
    }

    #[test]
    fn test_indexed_lookup() {
        let package = interfaces();
        assert_eq!(package.resolve_section("@interface[0]").unwrap(), "loopback");
        assert_eq!(package.resolve_section("@interface[1]").unwrap(), "lan");
        assert_eq!(package.resolve_section("@interface[-1]").unwrap(), "wan");
        assert_eq!(package.resolve_section("@[1]").unwrap(), "globals");
        assert_eq!(package.resolve_section("@globals[0]").unwrap(), "globals");
    }

    #[test]
    fn test_sections_of_type_keeps_order() {
        let package = interfaces();
        let names: Vec<_> = package
            .sections_of_type("interface")
            .map(Section::name)
            .collect();
        assert_eq!(names, vec!["loopback", "lan", "wan"]);
        assert_eq!(package.sections_of_type("route").count(), 0);
    }

    #[test]
    fn test_indexed_lookup_out_of_range() {
        let package = interfaces();
        let err = package.resolve_section("@interface[3]").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
        let err = package.resolve_section("@interface[-4]").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn test_invalid_section_reference() {
        let package = interfaces();
        let err = package.resolve_section("bad-name").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        let err = package.resolve_section("@interface").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_lookup_missing() {
        let package = interfaces();
        assert!(package.lookup("lan", None).is_ok());
        let err = package.lookup("dmz", None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
        let err = package.lookup("lan", Some("proto")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
        let err = package.lookup("lan", Some("pro-to")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_fixup_uses_creation_ordinal() {
        let mut package = Package::new("p");
        let first = package.alloc_section("iface", None);
        package.fixup_section(first);
        let second = package.alloc_section("iface", None);
        package.fixup_section(second);

        let names: Vec<_> = package.sections().iter().map(Section::name).collect();
        assert!(names[0].starts_with("cfg01"));
        assert!(names[1].starts_with("cfg02"));
        assert_eq!(names[0][5..], names[1][5..]);
    }
}
