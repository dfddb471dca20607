//! The engine entry point: a set of loaded packages plus the settings that
//! say where their files and histories live.

use crate::address::{Target, UciPath};
use crate::edit::Journaling;
use crate::error::UciError;
use crate::export::{self, ExportOptions};
use crate::journal::{history, Change};
use crate::model::{Package, Section, Value};
use crate::parse::{merge_into, parse_package, parse_packages};
use crate::settings::Settings;
use crate::stream::LockedFile;
use crate::validate::{is_valid_package, require_name, require_package};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What to do when an import produces a package that is already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Replace,
}

/// Where a package comes from on disk.
struct Source {
    name: String,
    path: PathBuf,
    journaled: bool,
}

#[derive(Debug, Default)]
pub struct Context {
    settings: Settings,
    packages: Vec<Package>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            packages: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_confdir(&mut self, dir: impl Into<PathBuf>) {
        self.settings.confdir = dir.into();
    }

    pub fn set_savedir(&mut self, dir: impl Into<PathBuf>) {
        self.settings.savedir = dir.into();
    }

    /// Add a read-only history directory, replayed before the save directory.
    pub fn add_history_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.settings.history_paths.contains(&dir) {
            self.settings.history_paths.push(dir);
        }
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.settings.strict = strict;
    }

    pub fn set_export_names(&mut self, names: bool) {
        self.settings.export_names = names;
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|package| package.name() == name)
    }

    pub fn package_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.packages
            .iter_mut()
            .find(|package| package.name() == name)
    }

    fn index_of(&self, name: &str) -> Result<usize, UciError> {
        self.packages
            .iter()
            .position(|package| package.name() == name)
            .ok_or_else(|| UciError::not_found(name.to_string()))
    }

    fn history_file(&self, name: &str) -> PathBuf {
        self.settings.savedir.join(name)
    }

    /// Package names available under the config directory, sorted.
    pub fn list_configs(&self) -> Result<Vec<String>, UciError> {
        let confdir = &self.settings.confdir;
        if !confdir.is_dir() {
            return Err(UciError::not_found(confdir.display().to_string()));
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(confdir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(confdir.as_path()).to_path_buf();
                UciError::io(path, err.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_valid_package(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn source(&self, name: &str) -> Result<Source, UciError> {
        if name.starts_with('/') || name.starts_with("./") {
            let path = PathBuf::from(name);
            let file_name = path
                .file_name()
                .and_then(|file_name| file_name.to_str())
                .ok_or_else(|| UciError::invalid(format!("invalid package path '{name}'")))?;
            require_package(file_name)?;
            return Ok(Source {
                name: file_name.to_string(),
                path,
                journaled: false,
            });
        }

        if name.starts_with('.') {
            return Err(UciError::not_found(name.to_string()));
        }
        require_package(name)?;
        Ok(Source {
            name: name.to_string(),
            path: self.settings.confdir.join(name),
            journaled: true,
        })
    }

    /// Load a package by name from the config directory, or from an
    /// arbitrary file when the name starts with `/` or `./`.
    pub fn load(&mut self, name: &str) -> Result<&mut Package, UciError> {
        let source = self.source(name)?;
        if self.package(&source.name).is_some() {
            return Err(UciError::DuplicatePackage { name: source.name });
        }
        let package = self.read_package(&source)?;
        self.packages.push(package);
        let index = self.packages.len() - 1;
        Ok(&mut self.packages[index])
    }

    fn read_package(&self, source: &Source) -> Result<Package, UciError> {
        let mut file = LockedFile::open_shared(&source.path)?;
        let mut package = parse_package(file.reader()?, &source.name, self.settings.strict)?;
        drop(file);
        package.set_path(&source.path);
        package.set_journaled(source.journaled);

        if source.journaled && self.settings.load_history {
            let mut saved = Vec::new();
            for dir in &self.settings.history_paths {
                saved.extend(history::replay_file(&mut package, &dir.join(&source.name))?);
            }
            saved.extend(history::replay_file(
                &mut package,
                &self.history_file(&source.name),
            )?);
            package.mark_saved(saved);
        }

        debug!(
            package = %source.name,
            path = %source.path.display(),
            sections = package.sections().len(),
            saved = package.saved().len(),
            "loaded package"
        );
        Ok(package)
    }

    /// Unload and load again, discarding unsaved changes. On failure the
    /// previously loaded package stays in place.
    pub fn reload(&mut self, name: &str) -> Result<&mut Package, UciError> {
        let index = self.index_of(name)?;
        let current = &self.packages[index];
        let source = match current.path() {
            Some(path) => Source {
                name: name.to_string(),
                path: path.to_path_buf(),
                journaled: current.is_journaled(),
            },
            None => self.source(name)?,
        };
        self.packages[index] = self.read_package(&source)?;
        Ok(&mut self.packages[index])
    }

    pub fn unload(&mut self, name: &str) -> Result<Package, UciError> {
        let index = self.index_of(name)?;
        Ok(self.packages.remove(index))
    }

    /// The loaded package, loading it by name first when needed.
    pub fn autoload(&mut self, name: &str) -> Result<&mut Package, UciError> {
        let index = self.ensure_loaded(name)?;
        Ok(&mut self.packages[index])
    }

    fn ensure_loaded(&mut self, name: &str) -> Result<usize, UciError> {
        if let Ok(index) = self.index_of(name) {
            return Ok(index);
        }
        self.load(name)?;
        self.index_of(name)
    }

    /// Parse a stream into packages and attach them. Nothing is attached
    /// unless the whole stream parses. Returns the imported package names.
    pub fn import<R: BufRead>(
        &mut self,
        reader: R,
        name: Option<&str>,
        policy: DuplicatePolicy,
    ) -> Result<Vec<String>, UciError> {
        if let Some(name) = name {
            require_package(name)?;
        }
        let packages = parse_packages(reader, name, self.settings.strict)?;

        if policy == DuplicatePolicy::Reject {
            if let Some(existing) = packages
                .iter()
                .find(|package| self.package(package.name()).is_some())
            {
                return Err(UciError::DuplicatePackage {
                    name: existing.name().to_string(),
                });
            }
        }

        let mut names = Vec::with_capacity(packages.len());
        for package in packages {
            names.push(package.name().to_string());
            match self.index_of(package.name()) {
                Ok(index) => self.packages[index] = package,
                Err(_) => self.packages.push(package),
            }
        }
        Ok(names)
    }

    /// Apply a stream as edits to a loaded package, journaling each one.
    pub fn import_merge<R: BufRead>(&mut self, reader: R, name: &str) -> Result<(), UciError> {
        let index = self.ensure_loaded(name)?;
        let mut staged = self.packages[index].clone();
        merge_into(reader, &mut staged, Journaling::Record, self.settings.strict)?;
        self.packages[index] = staged;
        Ok(())
    }

    /// Export one loaded package, or all of them in load order.
    pub fn export<W: Write>(
        &self,
        writer: &mut W,
        name: Option<&str>,
        header: bool,
    ) -> Result<(), UciError> {
        let options = ExportOptions {
            header,
            names: self.settings.export_names,
        };
        let selected: Vec<&Package> = match name {
            Some(name) => vec![&self.packages[self.index_of(name)?]],
            None => self.packages.iter().collect(),
        };
        for package in selected {
            export::write_package(writer, package, options)
                .map_err(|err| UciError::io("<export>", err))?;
        }
        Ok(())
    }

    /// Append pending changes to the package's history file. Packages
    /// without a history are committed directly.
    pub fn save(&mut self, name: &str) -> Result<(), UciError> {
        let index = self.index_of(name)?;
        if !self.packages[index].is_journaled() {
            return self.commit(name, false);
        }
        if !self.packages[index].is_dirty() {
            return Ok(());
        }

        let path = self.history_file(name);
        history::append(&path, name, self.packages[index].pending())?;
        let package = &mut self.packages[index];
        let changes = package.take_pending();
        debug!(package = name, count = changes.len(), path = %path.display(), "saved changes");
        package.mark_saved(changes);
        Ok(())
    }

    /// Write the package to its canonical file. A package with no file
    /// (one built by `import`) is only written with `overwrite`, which
    /// creates `<confdir>/<name>`.
    ///
    /// Unless `overwrite` is set, the file is re-read under an exclusive lock
    /// and all staged history is replayed onto it first, so edits saved by
    /// other processes survive. The history is cleared afterwards.
    pub fn commit(&mut self, name: &str, overwrite: bool) -> Result<(), UciError> {
        let index = self.index_of(name)?;
        let journaled = self.packages[index].is_journaled();
        let path = match self.packages[index].path() {
            Some(path) => path.to_path_buf(),
            None if overwrite => {
                require_package(name)?;
                self.settings.confdir.join(name)
            }
            None => {
                return Err(UciError::invalid(format!(
                    "package {name} has no backing file; commit with overwrite to create one"
                )))
            }
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| UciError::io(parent, err))?;
        }

        let mut canonical = LockedFile::open_exclusive(&path)?;
        let mut history_file = None;

        let mut result = if journaled && !overwrite {
            self.save(name)?;
            let mut fresh = self.reread(&mut canonical, name)?;
            for dir in &self.settings.history_paths {
                history::replay_file(&mut fresh, &dir.join(name))?;
            }
            let history_path = self.history_file(name);
            if history_path.is_file() {
                let mut file = LockedFile::open_exclusive(&history_path)?;
                history::replay(&mut fresh, &history_path, file.reader()?)?;
                history_file = Some(file);
            }
            fresh
        } else {
            let history_path = self.history_file(name);
            if journaled && history_path.is_file() {
                history_file = Some(LockedFile::open_exclusive(&history_path)?);
            }
            self.packages[index].clone()
        };

        let options = ExportOptions {
            header: false,
            names: self.settings.export_names,
        };
        canonical.replace_contents(export::to_string(&result, options).as_bytes())?;
        if let Some(file) = history_file.as_mut() {
            file.truncate()?;
        }
        drop(canonical);

        result.clear_history();
        result.set_path(path.clone());
        result.set_journaled(journaled);
        debug!(package = name, path = %path.display(), overwrite, "committed package");
        self.packages[index] = result;
        Ok(())
    }

    fn reread(&self, canonical: &mut LockedFile, name: &str) -> Result<Package, UciError> {
        let mut package = parse_package(canonical.reader()?, name, self.settings.strict)?;
        package.set_path(canonical.path());
        package.set_journaled(true);
        Ok(package)
    }

    /// Discard saved and pending changes for a whole package, one section,
    /// or one option. Unrelated unsaved edits are kept.
    pub fn revert(
        &mut self,
        name: &str,
        section: Option<&str>,
        option: Option<&str>,
    ) -> Result<(), UciError> {
        let index = self.ensure_loaded(name)?;
        let section = match section {
            Some(section) => Some(
                self.packages[index]
                    .resolve_section(section)?
                    .to_string(),
            ),
            None => None,
        };
        if let Some(option) = option {
            require_name("option", option)?;
        }
        let section = section.as_deref();

        let package = &mut self.packages[index];
        package.retain_pending(|change| !change.targets(section, option));
        let remaining = package.take_pending();
        let journaled = package.is_journaled();

        if journaled {
            let dropped =
                history::filter_file(&self.history_file(name), name, |change| {
                    change.targets(section, option)
                })?;
            debug!(package = name, dropped, "reverted history lines");
        }

        let package = self.reload(name)?;
        for change in &remaining {
            if let Err(err) = history::apply(package, change, Journaling::Record) {
                warn!(package = name, error = %err, "dropping pending change after revert");
            }
        }
        Ok(())
    }

    /// Saved history followed by pending changes.
    pub fn changes(&mut self, name: &str) -> Result<Vec<Change>, UciError> {
        let index = self.ensure_loaded(name)?;
        let package = &self.packages[index];
        Ok(package
            .saved()
            .iter()
            .chain(package.pending())
            .cloned()
            .collect())
    }

    /// Append a new anonymous section and return its generated name.
    pub fn add_section(&mut self, name: &str, section_type: &str) -> Result<String, UciError> {
        let index = self.ensure_loaded(name)?;
        let section = self.packages[index].add_section(section_type)?;
        Ok(section.name().to_string())
    }

    fn resolve(&mut self, path: &UciPath) -> Result<(usize, Option<String>), UciError> {
        let index = self.ensure_loaded(path.package())?;
        let section = match path.section() {
            Some(section) => Some(
                self.packages[index]
                    .resolve_section(section)?
                    .to_string(),
            ),
            None => None,
        };
        Ok((index, section))
    }

    /// Value at an address: a section's type or an option's value.
    pub fn get(&mut self, address: &str) -> Result<Value, UciError> {
        let path = UciPath::parse(address)?;
        let (index, section) = self.resolve(&path)?;
        let section = section.ok_or_else(|| {
            UciError::invalid(format!("'{address}' does not name a section or option"))
        })?;
        let element = self.packages[index].lookup(&section, path.option())?;
        Ok(element.value())
    }

    /// Section at an address, for `show`-style listings.
    pub fn section_at(&mut self, address: &str) -> Result<&Section, UciError> {
        let path = UciPath::parse(address)?;
        let (index, section) = self.resolve(&path)?;
        let section = section
            .ok_or_else(|| UciError::invalid(format!("'{address}' does not name a section")))?;
        self.packages[index]
            .section(&section)
            .ok_or_else(|| UciError::not_found(format!("{}.{section}", path.package())))
    }

    /// `pkg.section=type` or `pkg.section.option=value`.
    pub fn set_path(&mut self, address: &str) -> Result<(), UciError> {
        let path = UciPath::parse(address)?;
        let value = required_value(&path)?;
        let (index, section) = self.resolve(&path)?;
        let section = addressed_section(&path, section)?;
        self.packages[index].set(&section, path.option(), value)?;
        Ok(())
    }

    /// `pkg.section.option=item`.
    pub fn add_list_path(&mut self, address: &str) -> Result<(), UciError> {
        let path = UciPath::parse(address)?;
        let value = required_value(&path)?;
        if path.target() != Target::Option {
            return Err(UciError::invalid(format!("'{address}' does not name an option")));
        }
        let (index, section) = self.resolve(&path)?;
        let section = addressed_section(&path, section)?;
        let option = path.option().unwrap_or_default();
        self.packages[index].add_list(&section, option, value)
    }

    /// `pkg.section` or `pkg.section.option`.
    pub fn delete_path(&mut self, address: &str) -> Result<(), UciError> {
        let path = UciPath::parse(address)?;
        let (index, section) = self.resolve(&path)?;
        let section = addressed_section(&path, section)?;
        self.packages[index].delete(&section, path.option())
    }

    /// `pkg.section=newname` or `pkg.section.option=newname`.
    pub fn rename_path(&mut self, address: &str) -> Result<(), UciError> {
        let path = UciPath::parse(address)?;
        let value = required_value(&path)?;
        let (index, section) = self.resolve(&path)?;
        let section = addressed_section(&path, section)?;
        self.packages[index].rename(&section, path.option(), value)
    }
}

fn required_value(path: &UciPath) -> Result<&str, UciError> {
    path.value()
        .ok_or_else(|| UciError::invalid(format!("'{path}' has no value")))
}

fn addressed_section(path: &UciPath, section: Option<String>) -> Result<String, UciError> {
    section.ok_or_else(|| UciError::invalid(format!("'{path}' does not name a section")))
}
