//! Task execution
//!
//! This module runs tasks: [`runner`] sequences a task's operations and
//! persists their progress, [`command`] runs the external processes that
//! subprocess operations delegate to.

pub mod command;
pub mod runner;

pub use command::{ProcessSpec, SubprocessOperation};
pub use runner::TaskRunner;
