//! High-level project management interface
//!
//! This module provides the [`TaskManager`] which serves as the primary
//! interface for everything done to one project: the status check, and the
//! lifecycle of the project's single task.
//!
//! The TaskManager takes care of:
//! - Loading the manager configuration and the stored task
//! - Refusing work that would interfere with an active task
//! - Building a task's operations from its configuration
//! - Running the task on a blocking worker while its consoles stay readable
//!
//! ## Example
//!
//! ```rust,no_run
//! use stager_core::task_manager::{TaskManager, TaskManagerConfig};
//! use stager_operation_protocol::TaskConfig;
//! use std::path::PathBuf;
//!
//! # async fn example() -> stager_core::types::StagerResult<()> {
//! let manager = TaskManager::new(TaskManagerConfig {
//!     project_dir: PathBuf::from("."),
//! })?;
//!
//! // Inspect the project
//! let state = manager.composer_status()?;
//!
//! // Create and run a task
//! manager.create_task(TaskConfig::new("composer/install"))?;
//! let task = manager.run_task().await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use stager_operation_protocol::{ConsoleRead, TaskConfig, TaskStatus};

use crate::configs::manager::{load_manager_config, ManagerConfig};
use crate::environment::{Environment, ServerInfo};
use crate::execution::runner::TaskRunner;
use crate::i18n::{Catalog, Translator};
use crate::results::{ComposerState, TaskInfo};
use crate::status::StatusCheck;
use crate::tasks::build_operations;
use crate::tasks::store::{FileTaskStore, RunLock, TaskStore};
use crate::tasks::task::Task;
use crate::types::{StagerError, StagerResult};

/// Configuration for initializing a task manager
pub struct TaskManagerConfig {
    pub project_dir: PathBuf,
}

/// Entry point for one project
pub struct TaskManager {
    environment: Environment,
    server_info: ServerInfo,
    config: ManagerConfig,
    store: Arc<dyn TaskStore>,
    translator: Arc<dyn Translator>,
    /// Task being run by this manager; shares its console handles with the runner
    live: Mutex<Option<Task>>,
}

impl TaskManager {
    /// Open the project at `config.project_dir` with its file-backed task store
    pub fn new(config: TaskManagerConfig) -> StagerResult<Self> {
        let manager_config = load_manager_config(&config.project_dir)?;
        let locale = std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_default();

        Ok(Self::with_store(
            config.project_dir.clone(),
            manager_config,
            Arc::new(FileTaskStore::for_project(&config.project_dir)),
        )
        .with_translator(Arc::new(Catalog::for_locale(&locale))))
    }

    pub fn with_store(
        project_dir: PathBuf,
        config: ManagerConfig,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            environment: Environment::from_config(&project_dir, &config),
            server_info: ServerInfo::from_config(&config),
            config,
            store,
            translator: Arc::new(Catalog::default()),
            live: Mutex::new(None),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Inspect the project's manifest, lockfile and vendor directory
    pub fn composer_status(&self) -> StagerResult<ComposerState> {
        if let Some(task) = self.store.load()? {
            if task.is_active() {
                return Err(StagerError::TaskActive(format!(
                    "'{}' is running",
                    task.config.name()
                )));
            }
        }

        StatusCheck::new(&self.environment, &self.server_info, &*self.translator).run()
    }

    /// Create a new pending task, replacing a finished one
    pub fn create_task(&self, config: TaskConfig) -> StagerResult<TaskInfo> {
        // Configuration errors surface before anything is stored
        let operations = build_operations(&config, &self.environment, &self.config)?;

        if let Some(existing) = self.current_task()? {
            if !existing.status.is_terminal() {
                return Err(StagerError::TaskActive(format!(
                    "'{}' is {}",
                    existing.config.name(),
                    existing.status.as_str()
                )));
            }
        }

        self.store.clear_abort()?;
        let task = Task::new(config, &operations);
        self.store.save(&task)?;
        tracing::info!(task = %task.id, name = task.config.name(), "task created");
        Ok(TaskInfo::from(&task))
    }

    /// Run or resume the stored task until it reaches a terminal status
    ///
    /// The runner works on a blocking worker thread and holds the store's
    /// run lock until it finishes. While it runs, [`TaskManager::read_console`]
    /// on the same manager sees output as it is produced. Another run, here or
    /// in another process, is refused with [`StagerError::TaskActive`].
    pub async fn run_task(&self) -> StagerResult<TaskInfo> {
        let (lock, task) = self.claim("There is no task to run")?;
        self.run_claimed(lock, task).await
    }

    /// Reset a failed task and run it again from the failed operation
    pub async fn retry_task(&self) -> StagerResult<TaskInfo> {
        let (lock, mut task) = self.claim("There is no task to retry")?;
        task.prepare_retry()?;
        self.store.save(&task)?;
        tracing::info!(task = %task.id, "task reset for retry");

        self.run_claimed(lock, task).await
    }

    /// Take the run lock and load the task it guards
    ///
    /// With the lock held, an `active` task was left behind by a run that
    /// died and may be resumed.
    fn claim(&self, missing: &str) -> StagerResult<(RunLock, Task)> {
        let lock = self.store.try_lock()?;
        let task = self
            .store
            .load()?
            .ok_or_else(|| StagerError::Task(missing.to_string()))?;

        match lock {
            Some(lock) => Ok((lock, task)),
            None => Err(StagerError::TaskActive(format!(
                "'{}' is already running",
                task.config.name()
            ))),
        }
    }

    async fn run_claimed(&self, lock: RunLock, mut task: Task) -> StagerResult<TaskInfo> {
        let operations = build_operations(&task.config, &self.environment, &self.config)?;
        self.set_live(Some(task.clone()));

        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _lock = lock;
            TaskRunner::new(&*store).run(&mut task, operations).map(|_| task)
        })
        .await;
        self.set_live(None);

        let task = result
            .map_err(|e| StagerError::Task(format!("Task runner stopped unexpectedly: {}", e)))??;
        Ok(TaskInfo::from(&task))
    }

    /// Stop the task at the next operation boundary
    ///
    /// A task that has not started yet is aborted right away.
    pub fn abort_task(&self) -> StagerResult<TaskInfo> {
        let mut task = self
            .store
            .load()?
            .ok_or_else(|| StagerError::Task("There is no task to abort".to_string()))?;

        match task.status {
            TaskStatus::Pending => {
                task.skip_remaining();
                task.status = TaskStatus::Aborted;
                task.touch();
                self.store.save(&task)?;
                tracing::info!(task = %task.id, "pending task aborted");
            }
            TaskStatus::Active => {
                self.store.request_abort()?;
                tracing::info!(task = %task.id, "abort requested");
            }
            status => {
                return Err(StagerError::Task(format!(
                    "Task is already {}",
                    status.as_str()
                )))
            }
        }

        Ok(TaskInfo::from(&task))
    }

    /// Remove the stored task. Refused while it is active.
    pub fn delete_task(&self) -> StagerResult<()> {
        if let Some(task) = self.store.load()? {
            if task.is_active() {
                return Err(StagerError::TaskActive(format!(
                    "'{}' cannot be deleted while it is running",
                    task.config.name()
                )));
            }
            tracing::info!(task = %task.id, "task deleted");
        }
        self.store.delete()
    }

    /// The stored task, with live console handles while it runs here
    ///
    /// A finished task older than the retention window is removed instead.
    pub fn current_task(&self) -> StagerResult<Option<Task>> {
        let Some(mut task) = self.store.load()? else {
            return Ok(None);
        };

        if task.status.is_terminal() {
            let expired = (Utc::now() - task.updated_at)
                .to_std()
                .map(|age| age > self.config.task_retention())
                .unwrap_or(false);
            if expired {
                tracing::debug!(task = %task.id, "pruning expired task");
                self.store.delete()?;
                return Ok(None);
            }
        }

        if let Some(live) = self.live_task() {
            if live.id == task.id {
                for (stored, running) in task.operations.iter_mut().zip(live.operations) {
                    stored.console = running.console;
                }
            }
        }

        Ok(Some(task))
    }

    pub fn task_info(&self) -> StagerResult<Option<TaskInfo>> {
        Ok(self.current_task()?.as_ref().map(TaskInfo::from))
    }

    /// Console chunks of operation `index` from `cursor` on
    pub fn read_console(&self, index: usize, cursor: usize) -> StagerResult<ConsoleRead> {
        let task = self
            .current_task()?
            .ok_or_else(|| StagerError::Task("There is no task".to_string()))?;
        let operation = task.operations.get(index).ok_or_else(|| {
            StagerError::Task(format!(
                "Task has {} operations, there is no operation {}",
                task.operations.len(),
                index
            ))
        })?;
        Ok(operation.console.read_from(cursor))
    }

    fn live_task(&self) -> Option<Task> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_live(&self, task: Option<Task>) {
        *self.live.lock().unwrap_or_else(PoisonError::into_inner) = task;
    }
}
