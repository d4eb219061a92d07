//! External script execution.
//!
//! Provides executor types for running the analysis script either through
//! an interpreter or directly as an executable, plus [`ScriptLauncher`],
//! which selects between them from configuration. All subprocess management
//! is pure (no HTTP concerns) and lives in the `core` crate for isolation
//! and testability.

pub mod binary;
pub mod executor;
pub mod interpreter;
pub mod launcher;
pub mod subprocess;

pub use launcher::ScriptLauncher;
