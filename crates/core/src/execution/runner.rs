//! Sequential task runner
//!
//! The runner drives one task through its operations in order and persists
//! every status transition before moving on. It can pick up a task at any
//! point: terminal operations are skipped and an operation left `running` by
//! an interrupted run is started again.

use stager_operation_protocol::{Operation, OperationStatus, TaskStatus};

use crate::tasks::store::TaskStore;
use crate::tasks::task::Task;
use crate::types::StagerResult;

/// Runs a task's operations against a store
pub struct TaskRunner<'a> {
    store: &'a dyn TaskStore,
}

impl<'a> TaskRunner<'a> {
    pub fn new(store: &'a dyn TaskStore) -> Self {
        Self { store }
    }

    /// Run or resume `task` to a terminal status
    ///
    /// `operations` must be the operations built for the task's
    /// configuration. Operation failures do not make this return `Err`; they
    /// end in [`TaskStatus::Failed`]. Errors are reserved for the store and
    /// for operations that do not match the task.
    pub fn run(
        &self,
        task: &mut Task,
        mut operations: Vec<Box<dyn Operation>>,
    ) -> StagerResult<TaskStatus> {
        task.matches(&operations)?;

        if task.status.is_terminal() {
            tracing::debug!(task = %task.id, status = task.status.as_str(), "task already finished");
            return Ok(task.status);
        }

        if task.reset_interrupted() {
            tracing::warn!(task = %task.id, "resuming interrupted operation");
        }

        task.status = TaskStatus::Active;
        self.flush(task)?;
        tracing::info!(task = %task.id, name = task.config.name(), "task started");

        for (index, operation) in operations.iter_mut().enumerate() {
            if task.operations[index].status.is_terminal() {
                continue;
            }

            if self.store.abort_requested()? {
                return self.abort(task);
            }

            task.operations[index].status = OperationStatus::Running;
            self.flush(task)?;
            tracing::info!(task = %task.id, operation = operation.name(), "operation started");

            let console = task.operations[index].console.clone();
            match operation.run(&console) {
                Ok(()) => {
                    task.operations[index].status = OperationStatus::Complete;
                    self.flush(task)?;
                    tracing::info!(task = %task.id, operation = operation.name(), "operation complete");
                }
                Err(error) => {
                    console.append(format!("{:#}\n", error));
                    task.operations[index].status = OperationStatus::Error;
                    task.status = TaskStatus::Failed;
                    self.finish(task)?;
                    tracing::warn!(
                        task = %task.id,
                        operation = operation.name(),
                        error = %format!("{:#}", error),
                        "operation failed"
                    );
                    return Ok(task.status);
                }
            }
        }

        task.status = TaskStatus::Complete;
        self.finish(task)?;
        tracing::info!(task = %task.id, "task complete");
        Ok(task.status)
    }

    fn abort(&self, task: &mut Task) -> StagerResult<TaskStatus> {
        task.skip_remaining();
        task.status = TaskStatus::Aborted;
        self.finish(task)?;
        tracing::info!(task = %task.id, "task aborted");
        Ok(task.status)
    }

    /// Persist a terminal status and drop any abort request
    ///
    /// A request that arrived during the last operation has nothing left to
    /// stop; kept around it would abort the next run or retry at once.
    fn finish(&self, task: &mut Task) -> StagerResult<()> {
        self.flush(task)?;
        self.store.clear_abort()
    }

    fn flush(&self, task: &mut Task) -> StagerResult<()> {
        task.touch();
        self.store.save(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::store::MemoryTaskStore;
    use stager_operation_protocol::{ConsoleOutput, OperationKind, TaskConfig};
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records its runs and the status the store held for it at that moment
    struct Step {
        name: &'static str,
        fail: bool,
        journal: Journal,
        store: Option<Arc<MemoryTaskStore>>,
        abort_after: bool,
    }

    impl Operation for Step {
        fn name(&self) -> &str {
            self.name
        }

        fn summary(&self) -> String {
            format!("step {}", self.name)
        }

        fn kind(&self) -> OperationKind {
            OperationKind::InProcess
        }

        fn run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()> {
            let stored = self
                .store
                .as_ref()
                .and_then(|store| store.load().unwrap())
                .and_then(|task| {
                    task.operations
                        .iter()
                        .find(|op| op.name == self.name)
                        .map(|op| op.status.as_str().to_string())
                })
                .unwrap_or_default();
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, stored));
            console.append(format!("ran {}\n", self.name));

            if self.abort_after {
                if let Some(store) = &self.store {
                    store.request_abort().unwrap();
                }
            }
            if self.fail {
                anyhow::bail!("{} broke", self.name);
            }
            Ok(())
        }
    }

    fn step(name: &'static str, journal: &Journal) -> Step {
        Step {
            name,
            fail: false,
            journal: journal.clone(),
            store: None,
            abort_after: false,
        }
    }

    fn boxed(steps: Vec<Step>) -> Vec<Box<dyn Operation>> {
        steps
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn Operation>)
            .collect()
    }

    fn shared_store() -> Arc<MemoryTaskStore> {
        Arc::new(MemoryTaskStore::new())
    }

    fn statuses(task: &Task) -> Vec<OperationStatus> {
        task.operations.iter().map(|op| op.status).collect()
    }

    #[test]
    fn test_runs_in_order_and_flushes_running_state() {
        let store = shared_store();
        let journal = Journal::default();
        let ops = || {
            vec![
                Step { store: Some(store.clone()), ..step("a", &journal) },
                Step { store: Some(store.clone()), ..step("b", &journal) },
            ]
        };
        let mut task = Task::new(TaskConfig::new("test"), &boxed(ops()));

        let status = TaskRunner::new(&*store).run(&mut task, boxed(ops())).unwrap();

        assert_eq!(status, TaskStatus::Complete);
        // Each operation saw itself persisted as running before it ran
        assert_eq!(*journal.lock().unwrap(), vec!["a:running", "b:running"]);
        assert_eq!(statuses(&task), vec![OperationStatus::Complete; 2]);
        assert_eq!(store.load().unwrap().unwrap(), task);
    }

    #[test]
    fn test_failure_stops_task_and_keeps_rest_pending() {
        let store = shared_store();
        let journal = Journal::default();
        let ops = || {
            vec![
                step("a", &journal),
                Step { fail: true, ..step("b", &journal) },
                step("c", &journal),
            ]
        };
        let mut task = Task::new(TaskConfig::new("test"), &boxed(ops()));

        let status = TaskRunner::new(&*store).run(&mut task, boxed(ops())).unwrap();

        assert_eq!(status, TaskStatus::Failed);
        assert_eq!(
            statuses(&task),
            vec![
                OperationStatus::Complete,
                OperationStatus::Error,
                OperationStatus::Pending
            ]
        );
        assert_eq!(
            task.operations[1].console.snapshot(),
            vec!["ran b\n", "b broke\n"]
        );
        assert_eq!(*journal.lock().unwrap(), vec!["a:", "b:"]);
    }

    #[test]
    fn test_retry_resumes_after_completed_operations() {
        let store = shared_store();
        let journal = Journal::default();
        let failing = || {
            vec![
                step("a", &journal),
                Step { fail: true, ..step("b", &journal) },
            ]
        };
        let mut task = Task::new(TaskConfig::new("test"), &boxed(failing()));
        TaskRunner::new(&*store).run(&mut task, boxed(failing())).unwrap();

        task.prepare_retry().unwrap();
        let fixed = vec![step("a", &journal), step("b", &journal)];
        let status = TaskRunner::new(&*store).run(&mut task, boxed(fixed)).unwrap();

        assert_eq!(status, TaskStatus::Complete);
        assert_eq!(*journal.lock().unwrap(), vec!["a:", "b:", "b:"]);
    }

    #[test]
    fn test_abort_between_operations_skips_the_rest() {
        let store = shared_store();
        let journal = Journal::default();
        let ops = || {
            vec![
                Step { store: Some(store.clone()), abort_after: true, ..step("a", &journal) },
                step("b", &journal),
                step("c", &journal),
            ]
        };
        let mut task = Task::new(TaskConfig::new("test"), &boxed(ops()));

        let status = TaskRunner::new(&*store).run(&mut task, boxed(ops())).unwrap();

        assert_eq!(status, TaskStatus::Aborted);
        assert_eq!(
            statuses(&task),
            vec![
                OperationStatus::Complete,
                OperationStatus::Skipped,
                OperationStatus::Skipped
            ]
        );
        assert_eq!(journal.lock().unwrap().len(), 1);
        assert!(!store.abort_requested().unwrap());
    }

    #[test]
    fn test_abort_during_last_operation_does_not_outlive_the_run() {
        let store = shared_store();
        let journal = Journal::default();
        let failing = || {
            vec![
                step("a", &journal),
                Step {
                    store: Some(store.clone()),
                    abort_after: true,
                    fail: true,
                    ..step("b", &journal)
                },
            ]
        };
        let mut task = Task::new(TaskConfig::new("test"), &boxed(failing()));

        let status = TaskRunner::new(&*store).run(&mut task, boxed(failing())).unwrap();
        assert_eq!(status, TaskStatus::Failed);
        assert!(!store.abort_requested().unwrap());

        task.prepare_retry().unwrap();
        let fixed = vec![step("a", &journal), step("b", &journal)];
        let status = TaskRunner::new(&*store).run(&mut task, boxed(fixed)).unwrap();

        assert_eq!(status, TaskStatus::Complete);
        assert_eq!(statuses(&task), vec![OperationStatus::Complete; 2]);
    }

    #[test]
    fn test_abort_during_last_operation_of_completed_task_is_dropped() {
        let store = shared_store();
        let journal = Journal::default();
        let ops = || {
            vec![Step {
                store: Some(store.clone()),
                abort_after: true,
                ..step("a", &journal)
            }]
        };
        let mut task = Task::new(TaskConfig::new("test"), &boxed(ops()));

        let status = TaskRunner::new(&*store).run(&mut task, boxed(ops())).unwrap();

        assert_eq!(status, TaskStatus::Complete);
        assert!(!store.abort_requested().unwrap());
    }

    #[test]
    fn test_abort_before_start_runs_nothing() {
        let store = shared_store();
        let journal = Journal::default();
        let ops = || vec![step("a", &journal)];
        let mut task = Task::new(TaskConfig::new("test"), &boxed(ops()));
        store.request_abort().unwrap();

        let status = TaskRunner::new(&*store).run(&mut task, boxed(ops())).unwrap();

        assert_eq!(status, TaskStatus::Aborted);
        assert_eq!(statuses(&task), vec![OperationStatus::Skipped]);
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_interrupted_operation_is_rerun() {
        let store = shared_store();
        let journal = Journal::default();
        let ops = || vec![step("a", &journal), step("b", &journal)];
        let mut task = Task::new(TaskConfig::new("test"), &boxed(ops()));
        task.status = TaskStatus::Active;
        task.operations[0].status = OperationStatus::Complete;
        task.operations[1].status = OperationStatus::Running;

        let status = TaskRunner::new(&*store).run(&mut task, boxed(ops())).unwrap();

        assert_eq!(status, TaskStatus::Complete);
        assert_eq!(*journal.lock().unwrap(), vec!["b:"]);
    }

    #[test]
    fn test_terminal_task_is_not_rerun() {
        let store = shared_store();
        let journal = Journal::default();
        let ops = || vec![step("a", &journal)];
        let mut task = Task::new(TaskConfig::new("test"), &boxed(ops()));
        task.status = TaskStatus::Complete;

        let status = TaskRunner::new(&*store).run(&mut task, boxed(ops())).unwrap();

        assert_eq!(status, TaskStatus::Complete);
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_operations_are_rejected() {
        let store = shared_store();
        let journal = Journal::default();
        let mut task = Task::new(TaskConfig::new("test"), &boxed(vec![step("a", &journal)]));

        let result = TaskRunner::new(&*store).run(&mut task, boxed(vec![step("z", &journal)]));

        assert!(result.is_err());
        assert_eq!(task.status, TaskStatus::Pending);
    }
}
