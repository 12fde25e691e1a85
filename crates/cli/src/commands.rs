//! Presentation of core results, one module per top-level command

pub mod config;
pub mod status;
pub mod task;
