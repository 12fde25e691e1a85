//! Lifecycle states for operations and tasks.

use serde::{Deserialize, Serialize};

/// Status of a single operation.
///
/// ## Lifecycle
///
/// ```text
/// pending ──► running ──► complete
///                    └──► error
/// pending ──────────────► skipped   (task aborted before the operation started)
/// ```
///
/// `complete`, `error` and `skipped` are terminal: the runner never runs a
/// terminal operation again. Only an explicit retry moves `error` back to
/// `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Not started yet.
    Pending,
    /// Currently executing. Seen after a restart only if the process died mid-operation.
    Running,
    /// Finished successfully.
    Complete,
    /// Finished with a failure.
    Error,
    /// Never started because the task was aborted.
    Skipped,
}

impl OperationStatus {
    /// Whether the operation has reached a final state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Skipped)
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

/// Overall status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, no operation started.
    Pending,
    /// The runner is working through the operations.
    Active,
    /// All operations completed.
    Complete,
    /// An operation failed; later operations were not started.
    Failed,
    /// An abort request was observed between operations.
    Aborted,
}

impl TaskStatus {
    /// Whether the task has reached a final state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Aborted)
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_operation_states() {
        assert!(!OperationStatus::Pending.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
        assert!(OperationStatus::Complete.is_terminal());
        assert!(OperationStatus::Error.is_terminal());
        assert!(OperationStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_terminal_task_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Active.is_terminal());
        assert!(TaskStatus::Complete.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Aborted.is_terminal());
    }

    #[test]
    fn test_serialized_names_match_as_str() {
        let encoded = serde_json::to_string(&OperationStatus::Skipped).unwrap();
        assert_eq!(encoded, format!("\"{}\"", OperationStatus::Skipped.as_str()));
        let encoded = serde_json::to_string(&TaskStatus::Aborted).unwrap();
        assert_eq!(encoded, format!("\"{}\"", TaskStatus::Aborted.as_str()));
    }
}
