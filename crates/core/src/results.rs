//! Result types for manager operations
//!
//! This module contains the read models returned by the status check and the
//! task views handed to presentation layers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stager_operation_protocol::{OperationKind, OperationStatus, TaskStatus};

use crate::tasks::task::Task;

/// Manifest part of the status report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestStatus {
    pub found: bool,
    pub valid: bool,
    pub error: Option<String>,
}

/// Lockfile part of the status report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    pub found: bool,
    pub fresh: bool,
}

/// Vendor directory part of the status report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VendorStatus {
    pub found: bool,
}

/// Snapshot of the project's dependency state, recomputed on every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposerState {
    pub json: ManifestStatus,
    pub lock: LockStatus,
    pub vendor: VendorStatus,
}

/// Information about one operation of a task
#[derive(Debug, Clone, Serialize)]
pub struct OperationInfo {
    pub index: usize,
    pub name: String,
    pub summary: String,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub console_lines: usize,
}

/// Information about the stored task
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub operations: Vec<OperationInfo>,
}

impl From<&Task> for TaskInfo {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            name: task.config.name().to_string(),
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
            operations: task
                .operations
                .iter()
                .enumerate()
                .map(|(index, op)| OperationInfo {
                    index,
                    name: op.name.clone(),
                    summary: op.summary.clone(),
                    kind: op.kind,
                    status: op.status,
                    console_lines: op.console.len(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_state_serializes_in_response_shape() {
        let encoded = serde_json::to_value(ComposerState::default()).unwrap();
        assert_eq!(
            encoded,
            json!({
                "json": {"found": false, "valid": false, "error": null},
                "lock": {"found": false, "fresh": false},
                "vendor": {"found": false}
            })
        );
    }
}
