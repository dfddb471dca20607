//! History file format.
//!
//! One change per line, prefixed by its kind:
//!
//! ```text
//! pkg.section[.option]='value'
//! +pkg.section='type'
//! |pkg.section.option='item'
//! -pkg.section[.option]
//! @pkg.section[.option]='newname'
//! ```

use crate::edit::Journaling;
use crate::error::UciError;
use crate::export::quote;
use crate::journal::{Change, ChangeKind};
use crate::model::Package;
use crate::parse::parse_token;
use crate::stream::LockedFile;
use crate::validate::{require_name, require_text, require_type};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, warn};

/// Render one change as a history line, without the newline.
pub fn encode(package: &str, change: &Change) -> String {
    let prefix = match change.kind {
        ChangeKind::Change => "",
        ChangeKind::Add => "+",
        ChangeKind::ListAdd => "|",
        ChangeKind::Remove => "-",
        ChangeKind::Rename => "@",
    };
    let mut line = format!("{prefix}{package}.{}", change.section);
    if let Some(option) = &change.option {
        line.push('.');
        line.push_str(option);
    }
    if change.kind != ChangeKind::Remove {
        if let Some(value) = &change.value {
            line.push('=');
            line.push_str(&quote(value));
        }
    }
    line
}

/// Parse one history line written for `package`.
pub fn decode(package: &str, line: &str) -> Result<Change, UciError> {
    let (kind, rest) = match line.as_bytes().first() {
        Some(b'+') => (ChangeKind::Add, &line[1..]),
        Some(b'|') => (ChangeKind::ListAdd, &line[1..]),
        Some(b'-') => (ChangeKind::Remove, &line[1..]),
        Some(b'@') => (ChangeKind::Rename, &line[1..]),
        _ => (ChangeKind::Change, line),
    };

    let (path, raw) = match rest.split_once('=') {
        Some((path, raw)) => (path, Some(raw)),
        None => (rest, None),
    };

    let mut parts = path.split('.');
    let owner = parts.next().unwrap_or_default();
    if owner != package {
        return Err(UciError::invalid(format!(
            "history line for package '{owner}' in {package}"
        )));
    }
    let section = parts
        .next()
        .ok_or_else(|| UciError::invalid("history line without a section"))?;
    let option = parts.next();
    if parts.next().is_some() {
        return Err(UciError::invalid("too many path components"));
    }
    require_name("section", section)?;
    if let Some(option) = option {
        require_name("option", option)?;
    }

    let value = raw.map(parse_token).transpose()?;
    let value = match (kind, value) {
        (ChangeKind::Remove, _) => None,
        (_, None) => {
            return Err(UciError::invalid(format!(
                "history line for {package}.{section} without a value"
            )))
        }
        (_, Some(value)) => Some(value),
    };

    match (kind, option, value.as_deref()) {
        (ChangeKind::Add, Some(_), _) => {
            return Err(UciError::invalid("section add names an option"));
        }
        (ChangeKind::ListAdd, None, _) => {
            return Err(UciError::invalid("list append without an option"));
        }
        (ChangeKind::Add, None, Some(value)) | (ChangeKind::Change, None, Some(value)) => {
            require_type(value)?
        }
        (ChangeKind::Rename, _, Some(value)) => require_name("new", value)?,
        (_, Some(_), Some(value)) => require_text(value)?,
        _ => {}
    }

    Ok(Change {
        kind,
        section: section.to_string(),
        option: option.map(str::to_string),
        value,
    })
}

/// Apply one change to a package through the mutation API.
pub(crate) fn apply(
    package: &mut Package,
    change: &Change,
    journaling: Journaling,
) -> Result<(), UciError> {
    let section = change.section.as_str();
    let option = change.option.as_deref();
    let value = change.value.as_deref().unwrap_or_default();
    match change.kind {
        ChangeKind::Add => {
            package.set_with(section, None, value, journaling)?;
            if let Some(index) = package.section_index(section) {
                package.section_at_mut(index).set_anonymous(true);
            }
        }
        ChangeKind::Change => {
            package.set_with(section, option, value, journaling)?;
        }
        ChangeKind::ListAdd => {
            let option = option.unwrap_or_default();
            package.add_list_with(section, option, value, journaling)?;
        }
        ChangeKind::Remove => package.delete_with(section, option, journaling)?,
        ChangeKind::Rename => package.rename_with(section, option, value, journaling)?,
    }
    Ok(())
}

/// Replay history lines onto a package without journaling them. Lines that
/// fail to parse or apply are skipped. Returns the changes that applied.
pub(crate) fn replay<R: BufRead>(
    package: &mut Package,
    source: &Path,
    reader: R,
) -> Result<Vec<Change>, UciError> {
    let mut applied = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| UciError::io(source, err))?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let outcome = decode(package.name(), line)
            .and_then(|change| apply(package, &change, Journaling::Suppress).map(|()| change));
        match outcome {
            Ok(change) => applied.push(change),
            Err(err) => warn!(
                path = %source.display(),
                line = number + 1,
                error = %err,
                "skipping history line"
            ),
        }
    }
    Ok(applied)
}

/// Replay a history file if it exists, holding a shared lock while reading.
pub(crate) fn replay_file(package: &mut Package, path: &Path) -> Result<Vec<Change>, UciError> {
    let mut file = match LockedFile::open_shared(path) {
        Ok(file) => file,
        Err(UciError::NotFound { .. }) => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let reader = file.reader()?;
    let applied = replay(package, path, reader)?;
    debug!(path = %path.display(), count = applied.len(), "replayed history");
    Ok(applied)
}

/// Append changes to a history file, creating it and its directory.
pub(crate) fn append(path: &Path, package: &str, changes: &[Change]) -> Result<(), UciError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| UciError::io(parent, err))?;
    }
    let mut text = String::new();
    for change in changes {
        text.push_str(&encode(package, change));
        text.push('\n');
    }
    let mut file = LockedFile::open_exclusive(path)?;
    file.append(text.as_bytes())
}

/// Drop history lines that `discard` matches. Lines that do not parse are
/// kept untouched.
pub(crate) fn filter_file(
    path: &Path,
    package: &str,
    mut discard: impl FnMut(&Change) -> bool,
) -> Result<usize, UciError> {
    if !path.is_file() {
        return Ok(0);
    }
    let mut file = LockedFile::open_exclusive(path)?;
    let text = file.read_to_string()?;

    let mut kept = String::with_capacity(text.len());
    let mut dropped = 0;
    for line in text.lines() {
        if decode(package, line).is_ok_and(|change| discard(&change)) {
            dropped += 1;
            continue;
        }
        kept.push_str(line);
        kept.push('\n');
    }
    if dropped > 0 {
        file.replace_contents(kept.as_bytes())?;
    }
    Ok(dropped)
}
