//! Configuration files read by stager
//!
//! Every config struct derives [`schemars::JsonSchema`] so editors can be
//! given a schema for `.stager/config.yml`.

pub mod manager;
