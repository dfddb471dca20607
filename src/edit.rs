//! Mutation API: structural edits on a loaded package.
//!
//! Every operation validates all of its arguments before touching the tree,
//! so a failed call leaves the package exactly as it was. Successful edits
//! append a [`Change`] to the package's pending journal unless the caller
//! runs in [`Journaling::Suppress`] mode (history replay does).

use crate::error::UciError;
use crate::journal::Change;
use crate::model::{Package, Section, Value};
use crate::validate::{require_name, require_text, require_type};

/// Whether an edit is recorded in the pending journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Journaling {
    Record,
    Suppress,
}

impl Package {
    fn journal(&mut self, journaling: Journaling, change: Change) {
        if journaling == Journaling::Record {
            self.record(change);
        }
    }

    fn missing(&self, section: &str, option: Option<&str>) -> UciError {
        match option {
            Some(option) => UciError::not_found(format!("{}.{section}.{option}", self.name())),
            None => UciError::not_found(format!("{}.{section}", self.name())),
        }
    }

    fn require_section(&self, section: &str) -> Result<usize, UciError> {
        self.section_index(section)
            .ok_or_else(|| self.missing(section, None))
    }

    /// Append a new anonymous section of the given type.
    pub fn add_section(&mut self, section_type: &str) -> Result<&Section, UciError> {
        self.add_section_with(section_type, Journaling::Record)
    }

    pub(crate) fn add_section_with(
        &mut self,
        section_type: &str,
        journaling: Journaling,
    ) -> Result<&Section, UciError> {
        require_type(section_type)?;

        let index = self.alloc_section(section_type, None);
        self.fixup_section(index);
        let name = self.sections()[index].name().to_string();
        self.journal(journaling, Change::add(name, section_type));
        Ok(&self.sections()[index])
    }

    /// Set a section's type (creating the section) or an option's value
    /// (creating the option, collapsing a list). Returns `false` when the
    /// value was already in place and nothing was recorded.
    pub fn set(&mut self, section: &str, option: Option<&str>, value: &str) -> Result<bool, UciError> {
        self.set_with(section, option, value, Journaling::Record)
    }

    pub(crate) fn set_with(
        &mut self,
        section: &str,
        option: Option<&str>,
        value: &str,
        journaling: Journaling,
    ) -> Result<bool, UciError> {
        require_name("section", section)?;
        match option {
            None => {
                require_type(value)?;
                match self.section_index(section) {
                    Some(index) => {
                        let target = self.section_at_mut(index);
                        if target.section_type() == value {
                            return Ok(false);
                        }
                        target.set_type(value);
                    }
                    None => {
                        self.alloc_section(value, Some(section));
                    }
                }
            }
            Some(option) => {
                require_name("option", option)?;
                require_text(value)?;
                let index = self.require_section(section)?;
                let target = self.section_at_mut(index);
                if target.get(option) == Some(value) {
                    return Ok(false);
                }
                target.put_option(option, Value::Scalar(value.to_string()));
            }
        }

        self.journal(journaling, Change::change(section, option, value));
        Ok(true)
    }

    /// Append an item to a list option, converting a scalar option into a
    /// list that keeps the old value as its first item.
    pub fn add_list(&mut self, section: &str, option: &str, value: &str) -> Result<(), UciError> {
        self.add_list_with(section, option, value, Journaling::Record)
    }

    pub(crate) fn add_list_with(
        &mut self,
        section: &str,
        option: &str,
        value: &str,
        journaling: Journaling,
    ) -> Result<(), UciError> {
        require_name("section", section)?;
        require_name("option", option)?;
        require_text(value)?;

        let index = self.require_section(section)?;
        self.section_at_mut(index)
            .push_item(option, value.to_string());
        self.journal(journaling, Change::list_add(section, option, value));
        Ok(())
    }

    /// Remove an option, or a whole section with all of its options.
    pub fn delete(&mut self, section: &str, option: Option<&str>) -> Result<(), UciError> {
        self.delete_with(section, option, Journaling::Record)
    }

    pub(crate) fn delete_with(
        &mut self,
        section: &str,
        option: Option<&str>,
        journaling: Journaling,
    ) -> Result<(), UciError> {
        require_name("section", section)?;
        if let Some(option) = option {
            require_name("option", option)?;
        }

        let index = self.require_section(section)?;
        match option {
            Some(name) => {
                if self.section_at_mut(index).remove_option(name).is_none() {
                    return Err(self.missing(section, option));
                }
            }
            None => {
                self.remove_section(section);
            }
        }

        self.journal(journaling, Change::remove(section, option));
        Ok(())
    }

    /// Rename a section or option in place.
    ///
    /// The generated name of an anonymous section is not recomputed; once
    /// renamed the section counts as explicitly named.
    pub fn rename(&mut self, section: &str, option: Option<&str>, name: &str) -> Result<(), UciError> {
        self.rename_with(section, option, name, Journaling::Record)
    }

    pub(crate) fn rename_with(
        &mut self,
        section: &str,
        option: Option<&str>,
        name: &str,
        journaling: Journaling,
    ) -> Result<(), UciError> {
        require_name("section", section)?;
        if let Some(option) = option {
            require_name("option", option)?;
        }
        require_name("new", name)?;

        let index = self.require_section(section)?;
        match option {
            None => {
                if section == name {
                    return Ok(());
                }
                if self.section(name).is_some() {
                    return Err(UciError::invalid(format!(
                        "section '{name}' already exists in {}",
                        self.name()
                    )));
                }
                let target = self.section_at_mut(index);
                target.set_name(name);
                target.set_anonymous(false);
            }
            Some(option) => {
                if self.sections()[index].option(option).is_none() {
                    return Err(self.missing(section, Some(option)));
                }
                if option == name {
                    return Ok(());
                }
                let package = self.name().to_string();
                let target = self.section_at_mut(index);
                if target.option(name).is_some() {
                    return Err(UciError::invalid(format!(
                        "option '{name}' already exists in {package}.{section}"
                    )));
                }
                if let Some(entry) = target.option_mut(option) {
                    entry.rename(name);
                }
            }
        }

        self.journal(journaling, Change::rename(section, option, name));
        Ok(())
    }
}
