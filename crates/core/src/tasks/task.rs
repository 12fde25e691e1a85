//! Persisted task state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stager_operation_protocol::{
    ConsoleOutput, Operation, OperationKind, OperationStatus, TaskConfig, TaskStatus,
};
use uuid::Uuid;

use crate::types::{StagerError, StagerResult};

/// Stored progress of one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationState {
    pub name: String,
    pub summary: String,
    pub kind: OperationKind,
    pub status: OperationStatus,
    #[serde(default)]
    pub console: ConsoleOutput,
}

impl OperationState {
    pub fn pending(operation: &dyn Operation) -> Self {
        Self {
            name: operation.name().to_string(),
            summary: operation.summary(),
            kind: operation.kind(),
            status: OperationStatus::Pending,
            console: ConsoleOutput::new(),
        }
    }
}

/// A task and the progress of its operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub config: TaskConfig,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub operations: Vec<OperationState>,
}

impl Task {
    /// A new pending task for already built operations
    pub fn new(config: TaskConfig, operations: &[Box<dyn Operation>]) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            config,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            operations: operations
                .iter()
                .map(|op| OperationState::pending(op.as_ref()))
                .collect(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }

    /// Reset operations left `running` by an interrupted run
    ///
    /// Returns whether anything changed.
    pub fn reset_interrupted(&mut self) -> bool {
        let mut changed = false;
        for operation in &mut self.operations {
            if operation.status == OperationStatus::Running {
                operation.status = OperationStatus::Pending;
                changed = true;
            }
        }
        changed
    }

    /// Make a failed task runnable again
    ///
    /// Operations in `error` go back to `pending`; completed ones are kept.
    pub fn prepare_retry(&mut self) -> StagerResult<()> {
        if self.status != TaskStatus::Failed {
            return Err(StagerError::Task(format!(
                "Only failed tasks can be retried, task is {}",
                self.status.as_str()
            )));
        }

        for operation in &mut self.operations {
            if operation.status == OperationStatus::Error {
                operation.status = OperationStatus::Pending;
            }
        }
        self.reset_interrupted();
        self.status = TaskStatus::Pending;
        self.touch();
        Ok(())
    }

    /// Mark every operation that has not finished as skipped
    pub fn skip_remaining(&mut self) {
        for operation in &mut self.operations {
            if !operation.status.is_terminal() {
                operation.status = OperationStatus::Skipped;
            }
        }
    }

    /// Check that `operations` were built for this task
    pub fn matches(&self, operations: &[Box<dyn Operation>]) -> StagerResult<()> {
        if operations.len() != self.operations.len() {
            return Err(StagerError::Task(format!(
                "Task {} has {} stored operations but {} were built",
                self.id,
                self.operations.len(),
                operations.len()
            )));
        }

        for (index, (state, operation)) in self.operations.iter().zip(operations).enumerate() {
            if state.name != operation.name() {
                return Err(StagerError::Task(format!(
                    "Operation {} of task {} is '{}' but '{}' was built",
                    index,
                    self.id,
                    state.name,
                    operation.name()
                )));
            }
        }

        Ok(())
    }
}
