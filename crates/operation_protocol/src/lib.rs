//! # Stager Operation Protocol
//!
//! This crate defines the contract between the stager task runner and the
//! operations it sequences. An operation is one step of a task: scaffolding a
//! manifest, running `composer install`, dumping the autoloader, and so on.
//!
//! ## Overview
//!
//! - [`TaskConfig`] - The immutable request a task was created from
//! - [`ConsoleOutput`] - Append-only console buffer with a polling cursor
//! - [`OperationStatus`] / [`TaskStatus`] - Lifecycle states
//! - [`Operation`] - The capability the runner depends on
//! - [`InlineOperation`] / [`InProcess`] - Operations that run inside the
//!   orchestrator's own process
//!
//! The runner never looks past the [`Operation`] trait: whether a step spawns
//! a subprocess or runs in-process is an implementation detail of the step.
//!
//! ## Quick Start
//!
//! ```rust
//! use stager_operation_protocol::{ConsoleOutput, InProcess, InlineOperation, Operation};
//!
//! struct Greet;
//!
//! impl InlineOperation for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!
//!     fn summary(&self) -> String {
//!         "echo hello".to_string()
//!     }
//!
//!     fn do_run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()> {
//!         console.append("hello");
//!         Ok(())
//!     }
//! }
//!
//! let console = ConsoleOutput::new();
//! let mut operation = InProcess::new(Greet);
//! operation.run(&console).unwrap();
//! assert_eq!(console.read_from(0).chunks, vec!["hello".to_string()]);
//! ```

mod config;
mod console;
mod status;
mod traits;

pub use config::TaskConfig;
pub use console::{ConsoleOutput, ConsoleRead};
pub use status::{OperationStatus, TaskStatus};
pub use traits::{InProcess, InlineOperation, Operation, OperationKind};
