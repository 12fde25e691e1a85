//! Task persistence
//!
//! There is at most one task per project. The abort request is kept apart
//! from the task document so a runner saving its progress cannot overwrite a
//! request made while an operation was running.
//!
//! Running a task requires the store's [`RunLock`]. For the file store that
//! is an exclusive lock on `.stager/task.lock`, so a second process finds the
//! task taken instead of mistaking an `active` task for an interrupted one.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fs2::FileExt;
use tempfile::NamedTempFile;

use super::task::Task;
use crate::configs::manager::STATE_DIR;
use crate::types::{StagerError, StagerResult};

pub const TASK_FILE: &str = "task.json";
pub const ABORT_FILE: &str = "task.abort";
pub const LOCK_FILE: &str = "task.lock";

/// Exclusive right to run the stored task, released on drop
#[must_use = "the lock is released as soon as it is dropped"]
#[derive(Debug)]
pub struct RunLock {
    held: Held,
}

#[derive(Debug)]
enum Held {
    /// The lock file stays in place; only the OS lock is released
    File(File),
    Flag(Arc<AtomicBool>),
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match &self.held {
            Held::File(file) => {
                if let Err(e) = FileExt::unlock(file) {
                    tracing::warn!(error = %e, "failed to release task lock");
                }
            }
            Held::Flag(flag) => flag.store(false, Ordering::SeqCst),
        }
    }
}

/// Storage of the project's single task
pub trait TaskStore: Send + Sync {
    /// The stored task, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored document cannot be read or parsed.
    fn load(&self) -> StagerResult<Option<Task>>;

    /// Replace the stored task.
    fn save(&self, task: &Task) -> StagerResult<()>;

    /// Remove the stored task and any pending abort request.
    fn delete(&self) -> StagerResult<()>;

    fn request_abort(&self) -> StagerResult<()>;

    fn abort_requested(&self) -> StagerResult<bool>;

    fn clear_abort(&self) -> StagerResult<()>;

    /// Take the run lock, or `None` when someone else holds it.
    fn try_lock(&self) -> StagerResult<Option<RunLock>>;
}

/// Stores the task as JSON below the project's state directory
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    dir: PathBuf,
}

impl FileTaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in `<project_dir>/.stager`
    pub fn for_project(project_dir: &Path) -> Self {
        Self::new(project_dir.join(STATE_DIR))
    }

    pub fn task_file(&self) -> PathBuf {
        self.dir.join(TASK_FILE)
    }

    pub fn abort_file(&self) -> PathBuf {
        self.dir.join(ABORT_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }
}

fn remove_if_exists(path: &Path) -> StagerResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl TaskStore for FileTaskStore {
    fn load(&self) -> StagerResult<Option<Task>> {
        let path = self.task_file();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let task = serde_json::from_str(&content).map_err(|e| {
            StagerError::Task(format!(
                "Failed to parse task document {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(task))
    }

    fn save(&self, task: &Task) -> StagerResult<()> {
        std::fs::create_dir_all(&self.dir)?;

        let mut file = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut file, task)?;
        file.write_all(b"\n")?;
        file.persist(self.task_file()).map_err(|e| e.error)?;

        tracing::trace!(task = %task.id, status = task.status.as_str(), "task saved");
        Ok(())
    }

    fn delete(&self) -> StagerResult<()> {
        remove_if_exists(&self.task_file())?;
        remove_if_exists(&self.abort_file())
    }

    fn request_abort(&self) -> StagerResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.abort_file(), b"")?;
        Ok(())
    }

    fn abort_requested(&self) -> StagerResult<bool> {
        Ok(self.abort_file().exists())
    }

    fn clear_abort(&self) -> StagerResult<()> {
        remove_if_exists(&self.abort_file())
    }

    fn try_lock(&self) -> StagerResult<Option<RunLock>> {
        std::fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_file())?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(RunLock {
                held: Held::File(file),
            })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                tracing::debug!(path = %self.lock_file().display(), "task lock is held elsewhere");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the task in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    task: Mutex<Option<Task>>,
    abort: AtomicBool,
    running: Arc<AtomicBool>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for MemoryTaskStore {
    fn load(&self) -> StagerResult<Option<Task>> {
        Ok(self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, task: &Task) -> StagerResult<()> {
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task.clone());
        Ok(())
    }

    fn delete(&self) -> StagerResult<()> {
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.abort.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn request_abort(&self) -> StagerResult<()> {
        self.abort.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn abort_requested(&self) -> StagerResult<bool> {
        Ok(self.abort.load(Ordering::SeqCst))
    }

    fn clear_abort(&self) -> StagerResult<()> {
        self.abort.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn try_lock(&self) -> StagerResult<Option<RunLock>> {
        let taken = self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        Ok(taken.then(|| RunLock {
            held: Held::Flag(self.running.clone()),
        }))
    }
}
