//! Core traits for implementing operations.
//!
//! This module defines the capability the task runner depends on:
//! - [`Operation`] - One step of a task with a name, a summary and a run method
//! - [`InlineOperation`] - Steps that execute synchronously in-process
//! - [`InProcess`] - Adapter that turns an [`InlineOperation`] into an [`Operation`]

use crate::console::ConsoleOutput;
use serde::{Deserialize, Serialize};

/// How an operation does its work.
///
/// **Purpose**: Informational only. The runner treats both kinds the same way;
/// the kind is persisted so the console feed can show whether output came from
/// an external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Executes inside the orchestrator process and returns without suspending.
    InProcess,
    /// Spawns an external process and drains its output.
    Subprocess,
}

/// One step of a task.
///
/// **Purpose**: The runner sequences values of `Box<dyn Operation>` and only
/// uses this trait. It records the status transitions and persists them;
/// implementations only do the work and write to the console.
///
/// **Contract**:
/// - `run` is called at most once per attempt, never after the operation
///   reached a terminal status
/// - Output goes to `console` as it is produced, not in one batch at the end
/// - Returning `Err` marks the operation `error` and fails the task; the
///   rendered error is appended to the console by the runner
/// - Implementations must not retry on their own
///
/// # Example
///
/// ```rust
/// use stager_operation_protocol::{ConsoleOutput, Operation, OperationKind};
///
/// struct Noop;
///
/// impl Operation for Noop {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     fn summary(&self) -> String {
///         "true".to_string()
///     }
///
///     fn kind(&self) -> OperationKind {
///         OperationKind::InProcess
///     }
///
///     fn run(&mut self, _console: &ConsoleOutput) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// let mut noop = Noop;
/// assert!(noop.run(&ConsoleOutput::new()).is_ok());
/// ```
pub trait Operation: Send {
    /// Stable identifier, e.g. `create-project` or `composer-install`.
    ///
    /// Persisted with the task and used to match stored progress against the
    /// operations rebuilt after a restart.
    fn name(&self) -> &str;

    /// Human-readable description of the equivalent command line.
    ///
    /// **Purpose**: Displayed in the console feed and kept for auditing. It is
    /// not necessarily what gets executed: an in-process operation describes
    /// the package-manager call it replaces.
    fn summary(&self) -> String;

    /// Whether the operation runs in-process or spawns a subprocess.
    fn kind(&self) -> OperationKind;

    /// Do the work.
    ///
    /// # Errors
    ///
    /// Any failure of the step. The runner records it and stops the task.
    fn run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()>;
}

/// An operation that completes synchronously in the orchestrator's process.
///
/// **Purpose**: Most work is delegated to the package manager binary, but some
/// steps are cheaper and safer to do directly, such as writing a generated
/// manifest. Implement this trait for those and wrap the value in
/// [`InProcess`] to hand it to the runner.
pub trait InlineOperation: Send {
    /// Stable identifier, see [`Operation::name`].
    fn name(&self) -> &str;

    /// Description of the equivalent command line, see [`Operation::summary`].
    fn summary(&self) -> String;

    /// Do the work. Must return promptly; no suspension, no subprocesses.
    ///
    /// # Errors
    ///
    /// Any failure of the step.
    fn do_run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()>;
}

/// Adapter running an [`InlineOperation`] through the [`Operation`] contract.
#[derive(Debug)]
pub struct InProcess<T> {
    inner: T,
}

impl<T: InlineOperation> InProcess<T> {
    /// Wrap an inline operation.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Access the wrapped operation.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: InlineOperation> Operation for InProcess<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn summary(&self) -> String {
        self.inner.summary()
    }

    fn kind(&self) -> OperationKind {
        OperationKind::InProcess
    }

    fn run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()> {
        self.inner.do_run(console)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        runs: usize,
        fail: bool,
    }

    impl InlineOperation for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn summary(&self) -> String {
            format!("count --fail={}", self.fail)
        }

        fn do_run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()> {
            self.runs += 1;
            console.append(format!("run {}", self.runs));
            if self.fail {
                anyhow::bail!("counter failed");
            }
            Ok(())
        }
    }

    #[test]
    fn test_in_process_delegates_to_inline_operation() {
        let console = ConsoleOutput::new();
        let mut operation = InProcess::new(Counter {
            runs: 0,
            fail: false,
        });

        assert_eq!(operation.name(), "counter");
        assert_eq!(operation.summary(), "count --fail=false");
        assert_eq!(operation.kind(), OperationKind::InProcess);

        operation.run(&console).unwrap();
        assert_eq!(operation.inner().runs, 1);
        assert_eq!(console.snapshot(), vec!["run 1".to_string()]);
    }

    #[test]
    fn test_in_process_propagates_errors() {
        let console = ConsoleOutput::new();
        let mut operation: Box<dyn Operation> = Box::new(InProcess::new(Counter {
            runs: 0,
            fail: true,
        }));

        let err = operation.run(&console).unwrap_err();
        assert_eq!(err.to_string(), "counter failed");
        assert_eq!(console.len(), 1);
    }
}
