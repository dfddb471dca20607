//! Advisory-locked file handles.
//!
//! Readers take a shared lock, writers an exclusive one. Locks are released
//! when the handle drops. Filesystems without lock support are used unlocked.

use crate::error::UciError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

pub(crate) struct LockedFile {
    file: File,
    path: PathBuf,
}

fn tolerate_unsupported(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::Unsupported => Ok(()),
        other => other,
    }
}

impl LockedFile {
    /// Open an existing regular file for reading.
    pub fn open_shared(path: &Path) -> Result<Self, UciError> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(UciError::not_found(path.display().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(UciError::not_found(path.display().to_string()))
            }
            Err(err) => return Err(UciError::io(path, err)),
        }

        let file = File::open(path).map_err(|err| UciError::io(path, err))?;
        tolerate_unsupported(file.lock_shared()).map_err(|err| UciError::io(path, err))?;
        trace!(path = %path.display(), "shared lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open a file for reading and writing, creating it when missing.
    pub fn open_exclusive(path: &Path) -> Result<Self, UciError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| UciError::io(path, err))?;
        tolerate_unsupported(file.lock()).map_err(|err| UciError::io(path, err))?;
        trace!(path = %path.display(), "exclusive lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io(&self, err: io::Error) -> UciError {
        UciError::io(&self.path, err)
    }

    /// Buffered reader over the whole file, from the start.
    pub fn reader(&mut self) -> Result<BufReader<&File>, UciError> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|err| self.io(err))?;
        Ok(BufReader::new(&self.file))
    }

    pub fn read_to_string(&mut self) -> Result<String, UciError> {
        let mut text = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut text))
            .map_err(|err| self.io(err))?;
        Ok(text)
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<(), UciError> {
        self.file
            .seek(SeekFrom::End(0))
            .and_then(|_| self.file.write_all(bytes))
            .and_then(|()| self.file.sync_data())
            .map_err(|err| self.io(err))
    }

    /// Replace the file's contents in place, keeping the lock held.
    pub fn replace_contents(&mut self, bytes: &[u8]) -> Result<(), UciError> {
        self.file
            .set_len(0)
            .and_then(|()| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| self.file.write_all(bytes))
            .and_then(|()| self.file.sync_all())
            .map_err(|err| self.io(err))
    }

    pub fn truncate(&mut self) -> Result<(), UciError> {
        self.replace_contents(&[])
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
