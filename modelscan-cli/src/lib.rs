//! modelscan command-line interface
//!
//! The binary entry point lives in `main.rs`; the modules are exposed as a
//! library so integration tests can drive command handlers directly.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
