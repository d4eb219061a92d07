//! Domain logic for the MaAsLin job runner.
//!
//! Everything here is free of HTTP concerns: parameter handling, scratch
//! directory management, external script execution and the job runner that
//! ties them together.

pub mod error;
pub mod params;
pub mod runner;
pub mod scratch;
pub mod scripting;
pub mod types;
