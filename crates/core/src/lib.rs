//! Stager Core Library
//!
//! This is the core library for the stager installer. It provides all the
//! business logic for inspecting a PHP project's dependency state and for
//! running durable, resumable tasks that change it.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`task_manager`] - High-level interface for one project
//! - [`status`] - Manifest, lockfile and vendor directory inspection
//! - [`tasks`] - Task model, persistence and the catalog of task names
//! - [`execution`] - Sequential runner and subprocess execution
//! - [`operations`] - The operations tasks are made of
//! - [`environment`] - Paths and read-only queries of the target project
//! - [`locker`] - Lockfile freshness
//! - [`schema`] - Manifest schema validation
//! - [`configs`] - Manager configuration
//! - [`results`] - Result types handed to presentation layers
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! The primary entry point is the [`TaskManager`]:
//!
//! ```rust,no_run
//! use stager_core::task_manager::{TaskManager, TaskManagerConfig};
//! use std::path::PathBuf;
//!
//! # fn example() -> stager_core::types::StagerResult<()> {
//! let manager = TaskManager::new(TaskManagerConfig {
//!     project_dir: PathBuf::from("."),
//! })?;
//!
//! let state = manager.composer_status()?;
//! println!("manifest found: {}", state.json.found);
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod environment;
pub mod execution;
pub mod i18n;
pub mod locker;
pub mod operations;
pub mod results;
pub mod schema;
pub mod status;
pub mod task_manager;
pub mod tasks;
pub mod types;

// Re-export the main types for easier usage
pub use task_manager::{TaskManager, TaskManagerConfig};
pub use types::{StagerError, StagerResult};
