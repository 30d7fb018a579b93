// Single-blob JSON file backend

use super::{Backend, RawRecord, SETTINGS_KEY, TASKS_KEY, decode_settings, decode_tasks, encode_settings, encode_tasks};
use crate::error::StorageError;
use crate::settings::Settings;
use crate::task::Task;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Stores the whole task array in `{dir}/tasks.json` and settings in `{dir}/settings.json`
///
/// Writers serialize on `tasks.lock` / `settings.lock` and swap the data file in
/// with a rename, so readers see either the old blob or the new one.
#[derive(Debug, Clone)]
pub struct BlobBackend {
    dir: PathBuf,
}

impl BlobBackend {
    /// Open a blob store in `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", TASKS_KEY))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", SETTINGS_KEY))
    }
}

impl Backend for BlobBackend {
    fn persist(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let data = encode_tasks(tasks)?;
        let path = self.tasks_path();
        self.replace_file(&path, |file| file.write_all(data.as_bytes()))?;
        debug!(file = ?path, count = tasks.len(), "Wrote tasks blob");
        Ok(())
    }

    fn restore(&self) -> Result<Vec<RawRecord>, StorageError> {
        match self.read_file(&self.tasks_path())? {
            Some(data) => decode_tasks(&data),
            None => Ok(Vec::new()),
        }
    }

    fn persist_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        let data = encode_settings(settings)?;
        self.replace_file(&self.settings_path(), |file| file.write_all(data.as_bytes()))
    }

    fn restore_settings(&self) -> Result<Option<RawRecord>, StorageError> {
        match self.read_file(&self.settings_path())? {
            Some(data) => decode_settings(&data),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("blob:{}", self.dir.display())
    }
}

impl BlobBackend {
    /// Replace `path` atomically: `write` fills a temp file in the same directory,
    /// which is synced and renamed over `path`. On any failure `path` keeps its
    /// previous contents and the temp file is removed.
    fn replace_file<F>(&self, path: &Path, write: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let _lock = lock_for(path, LockMode::Exclusive)?;

        let mut temp = NamedTempFile::new_in(self.dir()).map_err(|e| StorageError::io(self.dir(), e))?;
        write(temp.as_file_mut()).map_err(|e| StorageError::io(temp.path(), e))?;
        temp.as_file().sync_all().map_err(|e| StorageError::io(temp.path(), e))?;
        temp.persist(path).map_err(|e| StorageError::io(path, e.error))?;

        // Lock is released when _lock is dropped
        Ok(())
    }

    /// Read `path` under a shared lock; a missing file reads as `None`
    fn read_file(&self, path: &Path) -> Result<Option<String>, StorageError> {
        if !path.exists() {
            return Ok(None);
        }

        let _lock = lock_for(path, LockMode::Shared)?;
        match fs::read_to_string(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

enum LockMode {
    Shared,
    Exclusive,
}

/// Take a lock on the `.lock` sibling of `path`, held until the file is dropped
///
/// The data file itself is swapped by rename, so it cannot carry the lock.
fn lock_for(path: &Path, mode: LockMode) -> Result<File, StorageError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| StorageError::io(&lock_path, e))?;

    let locked = match mode {
        LockMode::Shared => FileExt::lock_shared(&file),
        LockMode::Exclusive => FileExt::lock_exclusive(&file),
    };
    locked.map_err(|source| StorageError::Lock { path: lock_path, source })?;
    Ok(file)
}
