//! Operations the task runner can sequence
//!
//! - [`create_project`] - Inline operation writing a fresh manifest
//! - [`composer`] - Package-manager invocations run as subprocesses
//! - [`bootstrap`] - Version-dependent bootstrap conventions for generated manifests

pub mod bootstrap;
pub mod composer;
pub mod create_project;

pub use create_project::CreateProjectOperation;
